//! # Outbound Ports
//!
//! Traits for the external collaborators: the wallet provider and the
//! factory (wallet-selection modal) that opens it.

use crate::domain::{FactoryError, ProviderError};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Identifier returned by [`WalletProvider::subscribe`].
pub type SubscriptionId = u64;

/// Callback invoked with the raw event payload.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Provider-level event kinds the session listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    /// Payload: array of address strings.
    AccountsChanged,
    /// Payload: hex string (or number) chain id.
    ChainChanged,
    /// Payload: optional `{code, message}`.
    Disconnect,
}

impl ProviderEventKind {
    /// Every kind, in subscription order.
    pub const ALL: [ProviderEventKind; 3] = [
        ProviderEventKind::AccountsChanged,
        ProviderEventKind::ChainChanged,
        ProviderEventKind::Disconnect,
    ];

    /// Event name as used by injected providers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Disconnect => "disconnect",
        }
    }
}

/// Optional parts of the provider surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProviderCapabilities {
    /// Provider can emit events (`on`).
    pub events: bool,
    /// Provider can drop handlers (`removeListener`).
    pub remove_listener: bool,
}

impl ProviderCapabilities {
    /// Requests only, no events.
    pub const fn request_only() -> Self {
        Self {
            events: false,
            remove_listener: false,
        }
    }
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            events: true,
            remove_listener: true,
        }
    }
}

/// A connected wallet - outbound port.
///
/// Implementations invoke handlers synchronously and must not hold internal
/// locks while doing so: a handler may call [`WalletProvider::unsubscribe`]
/// on the same provider. A handler may also be invoked from inside
/// [`WalletProvider::subscribe`], e.g. to replay the current value.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Issue a JSON-RPC style request.
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Register a handler for an event kind.
    fn subscribe(&self, kind: ProviderEventKind, handler: EventHandler) -> SubscriptionId;

    /// Remove a handler. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Optional capabilities.
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities::default()
    }

    /// Wallet name, for logging.
    fn name(&self) -> &str {
        "wallet"
    }
}

/// Wallet-selection modal - outbound port.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Prompt for (or silently reopen) a wallet.
    ///
    /// `Ok(None)` means the selection finished without a usable provider.
    async fn open(&self) -> Result<Option<Arc<dyn WalletProvider>>, FactoryError>;

    /// A previously chosen wallet is remembered.
    fn has_cached_identity(&self) -> bool;

    /// Forget the remembered wallet.
    fn clear_cached_identity(&self);
}

// =============================================================================
// Mock Implementations for Testing
// =============================================================================

type ScriptedResponse = Result<Value, ProviderError>;

/// Mock provider with scripted responses per method.
///
/// Queued responses (`respond`) are consumed first, then the sticky default
/// (`set_default`); anything else is rejected with code 4200.
pub struct MockProvider {
    queued: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    defaults: Mutex<HashMap<String, ScriptedResponse>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<(String, Value)>>,
    handlers: Mutex<HashMap<SubscriptionId, (ProviderEventKind, EventHandler)>>,
    next_id: AtomicU64,
    capabilities: ProviderCapabilities,
}

impl MockProvider {
    /// Empty mock with full capabilities.
    pub fn new() -> Self {
        Self::with_capabilities(ProviderCapabilities::default())
    }

    /// Empty mock with the given capabilities.
    pub fn with_capabilities(capabilities: ProviderCapabilities) -> Self {
        Self {
            queued: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            handlers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capabilities,
        }
    }

    /// Mock answering `eth_accounts` and `eth_chainId`.
    pub fn connected(accounts: &[&str], chain_hex: &str) -> Self {
        let mock = Self::new();
        mock.set_default("eth_accounts", Ok(serde_json::json!(accounts)));
        mock.set_default("eth_chainId", Ok(Value::String(chain_hex.to_string())));
        mock
    }

    /// Queue a one-shot response.
    pub fn respond(&self, method: &str, response: ScriptedResponse) {
        self.queued
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Set the response used when nothing is queued.
    pub fn set_default(&self, method: &str, response: ScriptedResponse) {
        self.defaults.lock().insert(method.to_string(), response);
    }

    /// Hold every request for `method` until the returned gate is notified.
    pub fn gate(&self, method: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(method.to_string(), gate.clone());
        gate
    }

    /// All requests seen so far.
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().clone()
    }

    /// Number of requests for a method.
    pub fn request_count(&self, method: &str) -> usize {
        self.requests.lock().iter().filter(|(m, _)| m == method).count()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Invoke every handler registered for `kind`. Returns how many ran.
    pub fn emit(&self, kind: ProviderEventKind, payload: Value) -> usize {
        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in &handlers {
            handler(&payload);
        }
        handlers.len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.requests.lock().push((method.to_string(), params));

        let gate = self.gates.lock().get(method).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if let Some(response) = self
            .queued
            .lock()
            .get_mut(method)
            .and_then(VecDeque::pop_front)
        {
            return response;
        }
        if let Some(response) = self.defaults.lock().get(method) {
            return response.clone();
        }
        Err(ProviderError::new(
            ProviderError::UNSUPPORTED_METHOD,
            format!("Mock has no response for {method}"),
        ))
    }

    fn subscribe(&self, kind: ProviderEventKind, handler: EventHandler) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers.lock().insert(id, (kind, handler));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.handlers.lock().remove(&id);
    }

    fn capabilities(&self) -> ProviderCapabilities {
        self.capabilities
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock factory handing out scripted open results in order.
#[derive(Default)]
pub struct MockProviderFactory {
    results: Mutex<VecDeque<Result<Option<Arc<dyn WalletProvider>>, FactoryError>>>,
    cached: AtomicBool,
    opens: AtomicUsize,
    clears: AtomicUsize,
}

impl MockProviderFactory {
    /// Factory with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory that opens `provider` once.
    pub fn with_provider(provider: Arc<dyn WalletProvider>) -> Self {
        let factory = Self::new();
        factory.push_provider(provider);
        factory
    }

    /// Script a successful open.
    pub fn push_provider(&self, provider: Arc<dyn WalletProvider>) {
        self.results.lock().push_back(Ok(Some(provider)));
    }

    /// Script an open result.
    pub fn push_result(&self, result: Result<Option<Arc<dyn WalletProvider>>, FactoryError>) {
        self.results.lock().push_back(result);
    }

    /// Set the cached-identity flag.
    pub fn set_cached(&self, cached: bool) {
        self.cached.store(cached, Ordering::SeqCst);
    }

    /// Number of `open` calls.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of `clear_cached_identity` calls.
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderFactory for MockProviderFactory {
    async fn open(&self) -> Result<Option<Arc<dyn WalletProvider>>, FactoryError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FactoryError::Unavailable("no provider scripted".into())))
    }

    fn has_cached_identity(&self) -> bool {
        self.cached.load(Ordering::SeqCst)
    }

    fn clear_cached_identity(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.cached.store(false, Ordering::SeqCst);
    }
}
