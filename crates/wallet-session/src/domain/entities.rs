//! # Domain Entities
//!
//! The session record and the error record it carries.

use super::value_objects::{Address, ChainId, ConnectionStatus, SessionOperation};
use serde::{Deserialize, Serialize};

/// Last failure surfaced to the UI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Operation that failed.
    pub operation: SessionOperation,
    /// Provider code, when the provider rejected a request.
    pub code: Option<i64>,
    /// Description.
    pub message: String,
}

impl ErrorRecord {
    /// Create an error record.
    pub fn new(operation: SessionOperation, code: Option<i64>, message: impl Into<String>) -> Self {
        Self {
            operation,
            code,
            message: message.into(),
        }
    }
}

/// Mutable session record.
///
/// Fields are private; every mutator keeps the invariants in
/// [`super::invariants`]:
/// - the signed message and signature are only ever written as a pair
/// - the verification result is dropped whenever the account, the signed
///   pair or the pending message changes
/// - account and chain id only exist while connected
/// - the desired chain never leaks into the active chain
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    connection: ConnectionStatus,
    account: Option<Address>,
    chain_id: Option<ChainId>,
    desired_chain_id: Option<ChainId>,
    pending_message: Option<String>,
    last_signed_message: Option<String>,
    last_signature: Option<String>,
    verification_result: Option<bool>,
    last_error: Option<ErrorRecord>,
}

impl SessionState {
    /// Empty session, disconnected.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Connection status.
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    /// Whether a provider handle is installed.
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionStatus::Connected
    }

    /// Active account.
    pub fn account(&self) -> Option<&Address> {
        self.account.as_ref()
    }

    /// Active chain, as last confirmed by the provider.
    pub fn chain_id(&self) -> Option<ChainId> {
        self.chain_id
    }

    /// User-selected target chain.
    pub fn desired_chain_id(&self) -> Option<ChainId> {
        self.desired_chain_id
    }

    /// Message awaiting signature.
    pub fn pending_message(&self) -> Option<&str> {
        self.pending_message.as_deref()
    }

    /// Message of the last successful signature.
    pub fn last_signed_message(&self) -> Option<&str> {
        self.last_signed_message.as_deref()
    }

    /// Signature of the last successful signature.
    pub fn last_signature(&self) -> Option<&str> {
        self.last_signature.as_deref()
    }

    /// Outcome of the last verification, unset until one completes.
    pub fn verification_result(&self) -> Option<bool> {
        self.verification_result
    }

    /// Last surfaced error.
    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.last_error.as_ref()
    }

    /// The "Switch Network" action is available.
    pub fn can_switch_network(&self) -> bool {
        self.is_connected() && self.desired_chain_id.is_some()
    }

    /// The "Sign Message" action is available.
    pub fn can_sign(&self) -> bool {
        self.is_connected()
            && self.account.is_some()
            && self.pending_message.as_deref().is_some_and(|m| !m.is_empty())
    }

    /// The "Verify Message" action is available.
    pub fn can_verify(&self) -> bool {
        self.account.is_some() && self.last_signature.is_some()
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Enter `Connecting`. Account and chain of any previous connection are
    /// dropped so no stale account survives a reconnect.
    pub fn begin_connecting(&mut self) {
        self.transition(ConnectionStatus::Connecting);
        self.replace_account(None);
        self.chain_id = None;
    }

    /// Enter `Connected` with the provider's first account and network.
    pub fn mark_connected(&mut self, account: Option<Address>, chain_id: ChainId) {
        self.transition(ConnectionStatus::Connected);
        self.replace_account(account);
        self.chain_id = Some(chain_id);
    }

    /// Connect failed. Back to `Disconnected` without account, chain or
    /// signed pair; user input (pending message, desired chain) survives.
    pub fn mark_connect_failed(&mut self) {
        self.transition(ConnectionStatus::Disconnected);
        self.replace_account(None);
        self.chain_id = None;
        self.last_signed_message = None;
        self.last_signature = None;
        self.verification_result = None;
    }

    /// Reset to the empty form. `last_error` is kept for post-mortem display.
    pub fn reset(&mut self) {
        self.transition(ConnectionStatus::Disconnected);
        let last_error = self.last_error.take();
        *self = Self {
            last_error,
            ..Self::default()
        };
    }

    // =========================================================================
    // Event-driven updates
    // =========================================================================

    /// Apply an accounts-changed notification.
    ///
    /// Returns `false` (and changes nothing) when not connected.
    pub fn set_account(&mut self, account: Option<Address>) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.replace_account(account);
        true
    }

    /// Apply a chain-changed notification or confirmed switch.
    ///
    /// Returns `false` (and changes nothing) when not connected.
    pub fn set_chain_id(&mut self, chain_id: ChainId) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.chain_id = Some(chain_id);
        true
    }

    // =========================================================================
    // User input and results
    // =========================================================================

    /// Select the target network.
    pub fn set_desired_chain(&mut self, chain_id: ChainId) {
        self.desired_chain_id = Some(chain_id);
    }

    /// Replace the message awaiting signature.
    pub fn set_pending_message(&mut self, message: impl Into<String>) {
        self.pending_message = Some(message.into());
        self.verification_result = None;
    }

    /// Store the result of a successful signature. Both fields move together.
    pub fn record_signature(&mut self, message: String, signature: String) {
        self.last_signed_message = Some(message);
        self.last_signature = Some(signature);
        self.verification_result = None;
    }

    /// Store a verification outcome.
    pub fn record_verification(&mut self, verified: bool) {
        self.verification_result = Some(verified);
    }

    /// Surface an error.
    pub fn record_error(&mut self, record: ErrorRecord) {
        self.last_error = Some(record);
    }

    /// Dismiss the surfaced error.
    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    fn transition(&mut self, next: ConnectionStatus) {
        debug_assert!(
            self.connection.can_transition_to(next),
            "invalid connection transition {:?} -> {:?}",
            self.connection,
            next
        );
        self.connection = next;
    }

    fn replace_account(&mut self, account: Option<Address>) {
        if self.account != account {
            self.account = account;
            self.verification_result = None;
        }
    }
}
