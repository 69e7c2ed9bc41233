//! # Inbound Ports
//!
//! API trait defining what the wallet session can do. This is the surface
//! the UI layer drives.

use crate::domain::{
    ChainId, ConnectError, SessionState, SignError, SwitchError, SwitchOutcome, VerifyError,
};
use async_trait::async_trait;

/// Wallet session API - inbound port.
///
/// Every failing operation also writes the session's `last_error`, except
/// for `Superseded` results which concern a handle that no longer exists.
#[async_trait]
pub trait WalletSessionApi: Send + Sync {
    /// Open a provider and populate account and network.
    async fn connect(&self) -> Result<SessionState, ConnectError>;

    /// Reconnect on startup if the factory remembers a wallet.
    async fn try_resume(&self) -> Result<Option<SessionState>, ConnectError>;

    /// Forget the wallet, drop event handlers and reset the session.
    fn disconnect(&self);

    /// Select the target network. No provider call.
    fn select_network(&self, target: ChainId);

    /// Ask the wallet to switch to the selected network.
    async fn switch_network(&self) -> Result<SwitchOutcome, SwitchError>;

    /// Replace the message awaiting signature.
    fn set_pending_message(&self, text: String);

    /// Sign the pending message with the active account.
    async fn sign(&self) -> Result<String, SignError>;

    /// Recover the signer of the last signature and compare it to the
    /// active account.
    async fn verify(&self) -> Result<bool, VerifyError>;

    /// Snapshot of the session.
    fn state(&self) -> SessionState;
}
