//! In-memory wallet adapter.
//!
//! A scripted wallet that behaves like an injected browser provider: it keeps
//! its own account list and active chain, knows a set of chains, rejects
//! switches to unknown chains with 4902 and emits events when its state
//! changes. Signatures are a reversible encoding of signer and message, not
//! real ECDSA.

use crate::adapters::provider_handle::{decode_chain_id, methods};
use crate::domain::{Address, ChainId, ChainParams, FactoryError, ProviderError};
use crate::ports::outbound::{
    EventHandler, ProviderCapabilities, ProviderEventKind, ProviderFactory, SubscriptionId,
    WalletProvider,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Address returned when a signature does not match its message.
pub const UNRELATED_SIGNER: &str = "0x0000000000000000000000000000000000000000";

const SIGNATURE_SEPARATOR: char = '\0';

struct WalletState {
    accounts: Vec<Address>,
    chain: ChainId,
    known_chains: BTreeSet<ChainId>,
    rejections: HashMap<String, VecDeque<ProviderError>>,
}

/// Scripted wallet.
pub struct InMemoryWallet {
    state: Mutex<WalletState>,
    handlers: Mutex<HashMap<SubscriptionId, (ProviderEventKind, EventHandler)>>,
    requests: Mutex<Vec<String>>,
    next_id: AtomicU64,
    capabilities: ProviderCapabilities,
}

impl InMemoryWallet {
    /// Wallet on `chain` holding `accounts`. Knows mainnet and `chain`.
    pub fn new(accounts: &[&str], chain: ChainId) -> Self {
        Self {
            state: Mutex::new(WalletState {
                accounts: accounts.iter().map(|a| Address::new(*a)).collect(),
                chain,
                known_chains: [ChainId::MAINNET, chain].into_iter().collect(),
                rejections: HashMap::new(),
            }),
            handlers: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            capabilities: ProviderCapabilities::default(),
        }
    }

    /// Override capabilities.
    pub fn with_capabilities(mut self, capabilities: ProviderCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Add chains the wallet can switch to without an add-chain request.
    pub fn with_known_chains(self, chains: impl IntoIterator<Item = ChainId>) -> Self {
        self.state.lock().known_chains.extend(chains);
        self
    }

    /// Active chain.
    pub fn active_chain(&self) -> ChainId {
        self.state.lock().chain
    }

    /// Current accounts.
    pub fn accounts(&self) -> Vec<Address> {
        self.state.lock().accounts.clone()
    }

    /// Whether the wallet can switch to `chain` directly.
    pub fn knows_chain(&self, chain: ChainId) -> bool {
        self.state.lock().known_chains.contains(&chain)
    }

    /// Methods requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    /// Reject the next call to `method` with `error`.
    pub fn reject_next(&self, method: &str, error: ProviderError) {
        self.state
            .lock()
            .rejections
            .entry(method.to_string())
            .or_default()
            .push_back(error);
    }

    /// Replace the account list and emit `accountsChanged`.
    pub fn set_accounts(&self, accounts: &[&str]) {
        let payload = json!(accounts);
        self.state.lock().accounts = accounts.iter().map(|a| Address::new(*a)).collect();
        self.emit(ProviderEventKind::AccountsChanged, &payload);
    }

    /// Switch from the wallet UI and emit `chainChanged`.
    pub fn switch_externally(&self, chain: ChainId) {
        {
            let mut state = self.state.lock();
            state.known_chains.insert(chain);
            state.chain = chain;
        }
        self.emit(ProviderEventKind::ChainChanged, &json!(chain.to_hex()));
    }

    /// Emit `disconnect`.
    pub fn emit_disconnect(&self) {
        let payload = json!({
            "code": ProviderError::DISCONNECTED,
            "message": "Provider disconnected",
        });
        self.emit(ProviderEventKind::Disconnect, &payload);
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    fn emit(&self, kind: ProviderEventKind, payload: &Value) -> usize {
        let handlers: Vec<EventHandler> = self
            .handlers
            .lock()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in &handlers {
            handler(payload);
        }
        handlers.len()
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value, ProviderError> {
        let rejection = self
            .state
            .lock()
            .rejections
            .get_mut(method)
            .and_then(VecDeque::pop_front);
        if let Some(error) = rejection {
            return Err(error);
        }

        match method {
            methods::GET_ACCOUNTS => {
                let state = self.state.lock();
                Ok(json!(state
                    .accounts
                    .iter()
                    .map(Address::as_str)
                    .collect::<Vec<_>>()))
            }
            methods::GET_CHAIN_ID => Ok(json!(self.state.lock().chain.to_hex())),
            methods::SWITCH_CHAIN => {
                let target = params
                    .get(0)
                    .and_then(|p| p.get("chainId"))
                    .and_then(decode_chain_id)
                    .ok_or_else(|| invalid_params("expected [{chainId}]"))?;
                let changed = {
                    let mut state = self.state.lock();
                    if !state.known_chains.contains(&target) {
                        return Err(ProviderError::unrecognized_chain(target));
                    }
                    let changed = state.chain != target;
                    state.chain = target;
                    changed
                };
                if changed {
                    self.emit(ProviderEventKind::ChainChanged, &json!(target.to_hex()));
                }
                Ok(Value::Null)
            }
            methods::ADD_CHAIN => {
                let chain = params
                    .get(0)
                    .cloned()
                    .and_then(|p| serde_json::from_value::<ChainParams>(p).ok())
                    .and_then(|p| p.id())
                    .ok_or_else(|| invalid_params("expected [AddEthereumChainParameter]"))?;
                self.state.lock().known_chains.insert(chain);
                Ok(Value::Null)
            }
            methods::PERSONAL_SIGN => {
                let (message, account) = string_pair(params)?;
                let signer = {
                    let state = self.state.lock();
                    state
                        .accounts
                        .iter()
                        .find(|a| a.matches(account))
                        .cloned()
                        .ok_or_else(|| {
                            ProviderError::new(
                                ProviderError::UNAUTHORIZED,
                                format!("Account {account} is not authorized"),
                            )
                        })?
                };
                Ok(json!(encode_signature(&signer, message)))
            }
            methods::RECOVER_SIGNER => {
                let (message, signature) = string_pair(params)?;
                let (signer, signed) = decode_signature(signature)
                    .ok_or_else(|| invalid_params("malformed signature"))?;
                if signed == message {
                    Ok(json!(signer))
                } else {
                    Ok(json!(UNRELATED_SIGNER))
                }
            }
            other => Err(ProviderError::new(
                ProviderError::UNSUPPORTED_METHOD,
                format!("Method {other} is not supported"),
            )),
        }
    }
}

fn invalid_params(detail: &str) -> ProviderError {
    ProviderError::new(ProviderError::INVALID_PARAMS, detail)
}

fn string_pair(params: &Value) -> Result<(&str, &str), ProviderError> {
    let first = params.get(0).and_then(Value::as_str);
    let second = params.get(1).and_then(Value::as_str);
    match (first, second) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(invalid_params("expected two string parameters")),
    }
}

fn encode_signature(signer: &Address, message: &str) -> String {
    let payload = format!("{}{SIGNATURE_SEPARATOR}{message}", signer.normalized());
    format!("0x{}", hex::encode(payload))
}

fn decode_signature(signature: &str) -> Option<(String, String)> {
    let raw = signature.strip_prefix("0x")?;
    let bytes = hex::decode(raw).ok()?;
    let payload = String::from_utf8(bytes).ok()?;
    let (signer, message) = payload.split_once(SIGNATURE_SEPARATOR)?;
    Some((signer.to_string(), message.to_string()))
}

#[async_trait]
impl WalletProvider for InMemoryWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.requests.lock().push(method.to_string());
        let result = self.handle(method, &params);
        debug!(method, ok = result.is_ok(), "[wallet-session] In-memory wallet request");
        result
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
        "in-memory"
    }
}

/// Factory that always selects the same [`InMemoryWallet`] and remembers it
/// after the first successful open.
pub struct InMemoryProviderFactory {
    wallet: Arc<InMemoryWallet>,
    cached: AtomicBool,
    refusals: Mutex<VecDeque<FactoryError>>,
}

impl InMemoryProviderFactory {
    /// Factory for `wallet`, nothing remembered yet.
    pub fn new(wallet: Arc<InMemoryWallet>) -> Self {
        Self {
            wallet,
            cached: AtomicBool::new(false),
            refusals: Mutex::new(VecDeque::new()),
        }
    }

    /// Start with the wallet already remembered.
    pub fn remembered(self) -> Self {
        self.cached.store(true, Ordering::SeqCst);
        self
    }

    /// Fail the next open with `error`.
    pub fn refuse_next(&self, error: FactoryError) {
        self.refusals.lock().push_back(error);
    }

    /// The wallet this factory opens.
    pub fn wallet(&self) -> Arc<InMemoryWallet> {
        self.wallet.clone()
    }
}

#[async_trait]
impl ProviderFactory for InMemoryProviderFactory {
    async fn open(&self) -> Result<Option<Arc<dyn WalletProvider>>, FactoryError> {
        if let Some(error) = self.refusals.lock().pop_front() {
            return Err(error);
        }
        self.cached.store(true, Ordering::SeqCst);
        Ok(Some(self.wallet.clone()))
    }

    fn has_cached_identity(&self) -> bool {
        self.cached.load(Ordering::SeqCst)
    }

    fn clear_cached_identity(&self) {
        self.cached.store(false, Ordering::SeqCst);
    }
}
