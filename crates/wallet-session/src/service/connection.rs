//! Connection lifecycle: connect, resume, disconnect and provider events.

use super::{SessionInner, WalletSession};
use crate::adapters::{ProviderHandle, SessionEvent};
use crate::domain::{ConnectError, ErrorRecord, SessionOperation, SessionState};
use crate::metrics::SessionMetrics;
use crate::ports::{EventHandler, ProviderEventKind};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

impl WalletSession {
    /// Open a provider through the factory and populate account and network.
    ///
    /// Any previous handle is retired first. On failure the session is left
    /// `Disconnected` with `last_error` set.
    pub async fn connect(&self) -> Result<SessionState, ConnectError> {
        let generation = self.advance_generation(SessionState::begin_connecting);
        info!(generation, "[wallet-session] Connecting");

        match self.open_and_install(generation).await {
            Ok(state) => {
                SessionMetrics::incr(&self.inner.metrics.connects);
                info!(
                    generation,
                    account = state.account().map(|a| a.as_str()),
                    chain_id = state.chain_id().map(|c| c.value()),
                    "[wallet-session] Connected"
                );
                Ok(state)
            }
            Err(ConnectError::Superseded) => {
                self.note_stale(generation, "connect");
                Err(ConnectError::Superseded)
            }
            Err(e) => {
                let record = ErrorRecord::new(SessionOperation::Connect, e.code(), e.to_string());
                let applied = self.with_current(generation, |state| {
                    state.mark_connect_failed();
                    state.record_error(record);
                });
                if applied.is_none() {
                    self.note_stale(generation, "connect failure");
                    return Err(ConnectError::Superseded);
                }
                SessionMetrics::incr(&self.inner.metrics.connect_failures);
                warn!(generation, "[wallet-session] Connect failed: {}", e);
                Err(e)
            }
        }
    }

    async fn open_and_install(&self, generation: u64) -> Result<SessionState, ConnectError> {
        let provider = self
            .inner
            .factory
            .open()
            .await?
            .ok_or(ConnectError::NoHandle)?;
        if !self.is_current(generation) {
            return Err(ConnectError::Superseded);
        }

        let handle = Arc::new(ProviderHandle::new(provider, generation));
        debug!(
            generation,
            wallet = handle.name(),
            "[wallet-session] Provider opened"
        );
        let accounts = handle.accounts().await?;
        let chain_id = handle.chain_id().await?;

        // Subscribe outside the slot lock: a provider may invoke a handler
        // from inside `subscribe`. Such events see `Connecting` and are
        // dropped; the values read above are installed instead.
        let weak = Arc::downgrade(&self.inner);
        for kind in ProviderEventKind::ALL {
            handle.subscribe(kind, event_handler(weak.clone(), generation, kind));
        }
        if handle.subscription_count() == 0 {
            debug!(generation, "[wallet-session] Provider has no events");
        }

        let mut slot = self.inner.handle.write();
        if !self.is_current(generation) {
            drop(slot);
            handle.unsubscribe_all();
            return Err(ConnectError::Superseded);
        }
        *slot = Some(handle);

        let mut state = self.inner.state.write();
        state.mark_connected(accounts.into_iter().next(), chain_id);
        Ok(state.clone())
    }

    /// Reconnect on startup if the factory remembers a wallet.
    ///
    /// Returns `Ok(None)` without touching the session when there is nothing
    /// to resume.
    pub async fn try_resume(&self) -> Result<Option<SessionState>, ConnectError> {
        if !self.inner.config.auto_resume {
            debug!("[wallet-session] Auto-resume disabled");
            return Ok(None);
        }
        if !self.inner.factory.has_cached_identity() {
            debug!("[wallet-session] No cached wallet to resume");
            return Ok(None);
        }
        info!("[wallet-session] Resuming cached wallet");
        self.connect().await.map(Some)
    }

    /// Forget the wallet, drop every event handler and reset the session.
    ///
    /// `last_error` survives the reset. Responses still in flight for the old
    /// handle are discarded when they arrive.
    pub fn disconnect(&self) {
        self.inner.factory.clear_cached_identity();
        if let Some(record) = self.inner.state.read().last_error() {
            debug!(
                operation = %record.operation,
                code = ?record.code,
                "[wallet-session] Disconnecting with error: {}",
                record.message
            );
        }
        let generation = self.advance_generation(SessionState::reset);
        SessionMetrics::incr(&self.inner.metrics.disconnects);
        info!(generation, "[wallet-session] Disconnected");
    }

    fn on_provider_event(&self, generation: u64, kind: ProviderEventKind, payload: &Value) {
        let Some(event) = SessionEvent::decode(kind, payload) else {
            warn!(
                generation,
                event = kind.as_str(),
                %payload,
                "[wallet-session] Ignoring malformed event"
            );
            return;
        };

        match event {
            SessionEvent::AccountsChanged(accounts) => {
                let account = accounts.into_iter().next();
                let label = account.as_ref().map(|a| a.to_string());
                match self.with_current(generation, |state| state.set_account(account)) {
                    Some(_) => debug!(
                        generation,
                        account = label.as_deref(),
                        "[wallet-session] Accounts changed"
                    ),
                    None => self.note_stale(generation, "accountsChanged"),
                }
            }
            SessionEvent::ChainChanged(chain_id) => {
                match self.with_current(generation, |state| state.set_chain_id(chain_id)) {
                    Some(_) => debug!(
                        generation,
                        chain_id = chain_id.value(),
                        "[wallet-session] Chain changed"
                    ),
                    None => self.note_stale(generation, "chainChanged"),
                }
            }
            SessionEvent::Disconnected => {
                if self.is_current(generation) {
                    info!(generation, "[wallet-session] Provider disconnected");
                    self.disconnect();
                } else {
                    self.note_stale(generation, "disconnect");
                }
            }
        }
    }
}

/// Handler bound to one generation. Holds the session weakly so the
/// provider does not keep it alive.
fn event_handler(
    session: Weak<SessionInner>,
    generation: u64,
    kind: ProviderEventKind,
) -> EventHandler {
    Arc::new(move |payload: &Value| {
        if let Some(inner) = session.upgrade() {
            WalletSession { inner }.on_provider_event(generation, kind, payload);
        }
    })
}
