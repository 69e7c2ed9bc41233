//! # Wallet Session Service
//!
//! Application service owning the session record and the provider handle.
//!
//! ## Concurrency
//!
//! - `handle` is always locked before `state`.
//! - Every connect and disconnect advances the generation counter while
//!   holding the `handle` write lock. Responses and events carry the
//!   generation they were issued under and are discarded once it is stale.
//! - No lock is held across an `.await` or while calling into the provider.

mod connection;
mod network;
mod signing;

use crate::adapters::ProviderHandle;
use crate::config::SessionConfig;
use crate::domain::{
    ChainId, ChainTable, ConnectError, ErrorRecord, SessionOperation, SessionState, SignError,
    SwitchError, SwitchOutcome, VerifyError,
};
use crate::metrics::{MetricsSnapshot, SessionMetrics};
use crate::ports::{ProviderFactory, WalletSessionApi};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::fmt::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub(crate) struct SessionInner {
    config: SessionConfig,
    factory: Arc<dyn ProviderFactory>,
    chains: ChainTable,
    state: RwLock<SessionState>,
    handle: RwLock<Option<Arc<ProviderHandle>>>,
    generation: AtomicU64,
    metrics: SessionMetrics,
}

/// Wallet session - connection lifecycle, network switching and signing.
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<SessionInner>,
}

impl WalletSession {
    /// Create a disconnected session.
    pub fn new(config: SessionConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        let chains = config.chain_table();
        Self {
            inner: Arc::new(SessionInner {
                config,
                factory,
                chains,
                state: RwLock::new(SessionState::new()),
                handle: RwLock::new(None),
                generation: AtomicU64::new(0),
                metrics: SessionMetrics::new(),
            }),
        }
    }

    /// Snapshot of the session record.
    pub fn state(&self) -> SessionState {
        self.inner.state.read().clone()
    }

    /// Add-chain table used by the switch fallback.
    pub fn chains(&self) -> &ChainTable {
        &self.inner.chains
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Counter snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Current connection generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Dismiss the surfaced error.
    pub fn clear_error(&self) {
        self.inner.state.write().clear_error();
    }

    pub(crate) fn current_handle(&self) -> Option<Arc<ProviderHandle>> {
        self.inner.handle.read().clone()
    }

    /// Generation a request path should run under: the installed handle's,
    /// or the counter when nothing is installed.
    pub(crate) fn handle_and_generation(&self) -> (Option<Arc<ProviderHandle>>, u64) {
        let slot = self.inner.handle.read();
        let generation = slot
            .as_ref()
            .map_or_else(|| self.generation(), |h| h.generation());
        (slot.clone(), generation)
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Start a new generation: drop the installed handle, tear down its
    /// subscriptions and apply `f` to the state, atomically with respect to
    /// every generation check.
    pub(crate) fn advance_generation(&self, f: impl FnOnce(&mut SessionState)) -> u64 {
        let previous = {
            let mut slot = self.inner.handle.write();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            f(&mut self.inner.state.write());
            slot.take()
        };
        let generation = self.generation();
        if let Some(old) = previous {
            let removed = old.unsubscribe_all();
            debug!(
                old = old.generation(),
                new = generation,
                removed,
                "[wallet-session] Provider handle retired"
            );
        }
        generation
    }

    /// Apply `f` to the state if `generation` is still current.
    pub(crate) fn with_current<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&mut SessionState) -> R,
    ) -> Option<R> {
        let _slot = self.inner.handle.read();
        if !self.is_current(generation) {
            return None;
        }
        let mut state = self.inner.state.write();
        Some(f(&mut state))
    }

    pub(crate) fn note_stale(&self, generation: u64, what: &str) {
        SessionMetrics::incr(&self.inner.metrics.stale_discarded);
        debug!(
            generation,
            current = self.generation(),
            what,
            "[wallet-session] Discarded stale result"
        );
    }

    /// Surface a failure in `last_error`, unless it belongs to a retired
    /// generation, in which case it becomes `Superseded`.
    pub(crate) fn settle<T, E: OperationError>(
        &self,
        generation: u64,
        operation: SessionOperation,
        result: Result<T, E>,
    ) -> Result<T, E> {
        match result {
            Ok(value) => Ok(value),
            Err(e) if e.is_superseded() => {
                self.note_stale(generation, "response");
                Err(e)
            }
            Err(e) => {
                let record = ErrorRecord::new(operation, e.code(), e.to_string());
                if self.with_current(generation, |state| state.record_error(record)).is_none() {
                    self.note_stale(generation, "failure");
                    return Err(E::superseded());
                }
                warn!(
                    %operation,
                    code = ?e.code(),
                    "[wallet-session] Operation failed: {}",
                    e
                );
                Err(e)
            }
        }
    }
}

/// Operation errors that can be surfaced in `last_error`.
pub(crate) trait OperationError: Display {
    fn superseded() -> Self;
    fn is_superseded(&self) -> bool;
    fn code(&self) -> Option<i64>;
}

impl OperationError for ConnectError {
    fn superseded() -> Self {
        Self::Superseded
    }
    fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
    fn code(&self) -> Option<i64> {
        ConnectError::code(self)
    }
}

impl OperationError for SwitchError {
    fn superseded() -> Self {
        Self::Superseded
    }
    fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
    fn code(&self) -> Option<i64> {
        SwitchError::code(self)
    }
}

impl OperationError for SignError {
    fn superseded() -> Self {
        Self::Superseded
    }
    fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
    fn code(&self) -> Option<i64> {
        SignError::code(self)
    }
}

impl OperationError for VerifyError {
    fn superseded() -> Self {
        Self::Superseded
    }
    fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
    fn code(&self) -> Option<i64> {
        VerifyError::code(self)
    }
}

#[async_trait]
impl WalletSessionApi for WalletSession {
    async fn connect(&self) -> Result<SessionState, ConnectError> {
        WalletSession::connect(self).await
    }

    async fn try_resume(&self) -> Result<Option<SessionState>, ConnectError> {
        WalletSession::try_resume(self).await
    }

    fn disconnect(&self) {
        WalletSession::disconnect(self)
    }

    fn select_network(&self, target: ChainId) {
        WalletSession::select_network(self, target)
    }

    async fn switch_network(&self) -> Result<SwitchOutcome, SwitchError> {
        WalletSession::switch_network(self).await
    }

    fn set_pending_message(&self, text: String) {
        WalletSession::set_pending_message(self, text)
    }

    async fn sign(&self) -> Result<String, SignError> {
        WalletSession::sign(self).await
    }

    async fn verify(&self) -> Result<bool, VerifyError> {
        WalletSession::verify(self).await
    }

    fn state(&self) -> SessionState {
        WalletSession::state(self)
    }
}
