//! Network selection and the switch / add-chain protocol.

use super::WalletSession;
use crate::adapters::ProviderHandle;
use crate::domain::{ChainId, ProviderError, SessionOperation, SwitchError, SwitchOutcome};
use crate::metrics::SessionMetrics;
use std::sync::Arc;
use tracing::{debug, info};

impl WalletSession {
    /// Select the target network. No provider call.
    pub fn select_network(&self, target: ChainId) {
        self.inner.state.write().set_desired_chain(target);
        debug!(chain_id = target.value(), "[wallet-session] Network selected");
    }

    /// Ask the wallet to switch to the selected network.
    ///
    /// Returns [`SwitchOutcome::Skipped`] without a provider request when not
    /// connected or no network is selected. The active chain id is never
    /// written here; it follows the wallet's `chainChanged` event. When the
    /// wallet does not know the chain, the chain is added from the chain
    /// table and the switch is sent again.
    pub async fn switch_network(&self) -> Result<SwitchOutcome, SwitchError> {
        let (handle, generation) = self.handle_and_generation();
        let target = {
            let state = self.inner.state.read();
            if state.is_connected() {
                state.desired_chain_id()
            } else {
                None
            }
        };
        let (Some(handle), Some(target)) = (handle, target) else {
            debug!("[wallet-session] Switch skipped: not connected or no network selected");
            return Ok(SwitchOutcome::Skipped);
        };

        let result = self.request_switch(&handle, target).await;
        let outcome = self.settle(generation, SessionOperation::SwitchNetwork, result)?;
        info!(
            chain_id = target.value(),
            ?outcome,
            "[wallet-session] Switch requested"
        );
        Ok(outcome)
    }

    async fn request_switch(
        &self,
        handle: &Arc<ProviderHandle>,
        target: ChainId,
    ) -> Result<SwitchOutcome, SwitchError> {
        let generation = handle.generation();
        SessionMetrics::incr(&self.inner.metrics.switch_requests);

        let source = match handle.switch_chain(target).await {
            Ok(()) => {
                self.ensure_current(generation)?;
                return Ok(SwitchOutcome::Requested(target));
            }
            Err(e) if e.code() == Some(ProviderError::UNRECOGNIZED_CHAIN) => e,
            Err(source) => {
                self.ensure_current(generation)?;
                return Err(SwitchError::Rejected {
                    chain_id: target,
                    source,
                });
            }
        };
        self.ensure_current(generation)?;

        let params = self
            .inner
            .chains
            .get(target)
            .ok_or(SwitchError::UnknownChainParams(target))?;
        debug!(
            chain_id = target.value(),
            chain_name = %params.chain_name,
            "[wallet-session] Chain unknown to wallet ({}), adding",
            source
        );
        SessionMetrics::incr(&self.inner.metrics.add_chain_fallbacks);
        let added = handle.add_chain(params).await;
        self.ensure_current(generation)?;
        added.map_err(|source| SwitchError::AddChainFailed {
            chain_id: target,
            source,
        })?;

        SessionMetrics::incr(&self.inner.metrics.switch_requests);
        let switched = handle.switch_chain(target).await;
        self.ensure_current(generation)?;
        switched.map_err(|source| SwitchError::Rejected {
            chain_id: target,
            source,
        })?;
        Ok(SwitchOutcome::AddedAndRequested(target))
    }

    fn ensure_current(&self, generation: u64) -> Result<(), SwitchError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            Err(SwitchError::Superseded)
        }
    }
}
