//! Provider Handle
//!
//! Wraps a [`WalletProvider`] for one connection generation: typed requests,
//! event decoding, subscription bookkeeping and the in-flight guard.
//!
//! This is the only place where provider wire formats (hex chain ids, JSON
//! arrays of strings) are converted to domain types.

use crate::domain::{Address, ChainId, ChainParams, RequestError};
use crate::ports::outbound::{
    EventHandler, ProviderCapabilities, ProviderEventKind, SubscriptionId, WalletProvider,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Provider methods consumed by the session.
pub mod methods {
    /// Active accounts.
    pub const GET_ACCOUNTS: &str = "eth_accounts";
    /// Active network.
    pub const GET_CHAIN_ID: &str = "eth_chainId";
    /// Switch network (EIP-3326).
    pub const SWITCH_CHAIN: &str = "wallet_switchEthereumChain";
    /// Add network (EIP-3085).
    pub const ADD_CHAIN: &str = "wallet_addEthereumChain";
    /// Sign an arbitrary message.
    pub const PERSONAL_SIGN: &str = "personal_sign";
    /// Recover the signer of a personal-sign signature.
    pub const RECOVER_SIGNER: &str = "personal_ecRecover";
}

/// Decoded provider event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// New account list, first entry is the active account.
    AccountsChanged(Vec<Address>),
    /// New active chain.
    ChainChanged(ChainId),
    /// Provider lost its connection.
    Disconnected,
}

impl SessionEvent {
    /// Decode a raw payload. `None` if the payload is unusable.
    pub fn decode(kind: ProviderEventKind, payload: &Value) -> Option<Self> {
        match kind {
            ProviderEventKind::AccountsChanged => {
                let accounts = match payload {
                    Value::Null => Vec::new(),
                    other => decode_accounts(other)?,
                };
                Some(Self::AccountsChanged(accounts))
            }
            ProviderEventKind::ChainChanged => decode_chain_id(payload).map(Self::ChainChanged),
            ProviderEventKind::Disconnect => Some(Self::Disconnected),
        }
    }
}

/// Chain id payloads come as hex strings, decimal strings or numbers
/// depending on the wallet.
pub fn decode_chain_id(value: &Value) -> Option<ChainId> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(ChainId),
        _ => None,
    }
}

fn decode_accounts(value: &Value) -> Option<Vec<Address>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(Address::new))
        .collect()
}

fn decode_string(method: &'static str, value: Value) -> Result<String, RequestError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(RequestError::MalformedResponse {
            method,
            detail: format!("expected string, got {other}"),
        }),
    }
}

/// Handle to a provider for a single connection generation.
///
/// Requests are serialized through one async mutex; events are subscribed
/// through the handle so they can all be dropped together.
pub struct ProviderHandle {
    provider: Arc<dyn WalletProvider>,
    generation: u64,
    in_flight: tokio::sync::Mutex<()>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl ProviderHandle {
    /// Wrap a provider for `generation`.
    pub fn new(provider: Arc<dyn WalletProvider>, generation: u64) -> Self {
        Self {
            provider,
            generation,
            in_flight: tokio::sync::Mutex::new(()),
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Connection generation this handle belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Provider capabilities.
    pub fn capabilities(&self) -> ProviderCapabilities {
        self.provider.capabilities()
    }

    /// Wallet name.
    pub fn name(&self) -> &str {
        self.provider.name()
    }

    /// Raw request, serialized with every other request on this handle.
    pub async fn request(&self, method: &'static str, params: Value) -> Result<Value, RequestError> {
        let _guard = self.in_flight.lock().await;
        debug!(
            generation = self.generation,
            method,
            "[wallet-session] Provider request"
        );
        self.provider
            .request(method, params)
            .await
            .map_err(RequestError::from)
    }

    /// `eth_accounts`.
    pub async fn accounts(&self) -> Result<Vec<Address>, RequestError> {
        let value = self.request(methods::GET_ACCOUNTS, json!([])).await?;
        match value {
            Value::Null => Ok(Vec::new()),
            other => decode_accounts(&other).ok_or_else(|| RequestError::MalformedResponse {
                method: methods::GET_ACCOUNTS,
                detail: format!("expected array of strings, got {other}"),
            }),
        }
    }

    /// `eth_chainId`.
    pub async fn chain_id(&self) -> Result<ChainId, RequestError> {
        let value = self.request(methods::GET_CHAIN_ID, json!([])).await?;
        decode_chain_id(&value).ok_or_else(|| RequestError::MalformedResponse {
            method: methods::GET_CHAIN_ID,
            detail: format!("expected chain id, got {value}"),
        })
    }

    /// `wallet_switchEthereumChain`.
    pub async fn switch_chain(&self, chain_id: ChainId) -> Result<(), RequestError> {
        self.request(
            methods::SWITCH_CHAIN,
            json!([{ "chainId": chain_id.to_hex() }]),
        )
        .await
        .map(|_| ())
    }

    /// `wallet_addEthereumChain`.
    pub async fn add_chain(&self, params: &ChainParams) -> Result<(), RequestError> {
        let body = serde_json::to_value(params).map_err(|e| RequestError::MalformedResponse {
            method: methods::ADD_CHAIN,
            detail: e.to_string(),
        })?;
        self.request(methods::ADD_CHAIN, Value::Array(vec![body]))
            .await
            .map(|_| ())
    }

    /// `personal_sign` with `[message, account]`.
    pub async fn personal_sign(
        &self,
        message: &str,
        account: &Address,
    ) -> Result<String, RequestError> {
        let value = self
            .request(methods::PERSONAL_SIGN, json!([message, account.as_str()]))
            .await?;
        decode_string(methods::PERSONAL_SIGN, value)
    }

    /// `personal_ecRecover` with `[message, signature]`.
    pub async fn recover_signer(
        &self,
        message: &str,
        signature: &str,
    ) -> Result<Address, RequestError> {
        let value = self
            .request(methods::RECOVER_SIGNER, json!([message, signature]))
            .await?;
        decode_string(methods::RECOVER_SIGNER, value).map(Address::new)
    }

    /// Register a handler. Returns `false` if the provider has no events.
    pub fn subscribe(&self, kind: ProviderEventKind, handler: EventHandler) -> bool {
        if !self.capabilities().events {
            return false;
        }
        let id = self.provider.subscribe(kind, handler);
        self.subscriptions.lock().push(id);
        debug!(
            generation = self.generation,
            event = kind.as_str(),
            id,
            "[wallet-session] Subscribed"
        );
        true
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Drop every subscription made through this handle. Idempotent.
    ///
    /// Providers without `remove_listener` keep their handlers; those
    /// handlers are filtered out by generation on the session side.
    pub fn unsubscribe_all(&self) -> usize {
        let ids: Vec<SubscriptionId> = std::mem::take(&mut *self.subscriptions.lock());
        if ids.is_empty() {
            return 0;
        }
        if !self.capabilities().remove_listener {
            warn!(
                generation = self.generation,
                count = ids.len(),
                "[wallet-session] Provider cannot remove listeners; relying on generation guard"
            );
            return 0;
        }
        for id in &ids {
            self.provider.unsubscribe(*id);
        }
        ids.len()
    }
}

impl Drop for ProviderHandle {
    fn drop(&mut self) {
        self.unsubscribe_all();
    }
}
