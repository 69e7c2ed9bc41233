//! Personal-message signing and signer verification.

use super::WalletSession;
use crate::adapters::ProviderHandle;
use crate::domain::{
    Address, RequestError, SessionOperation, SessionState, SignError, VerifyError,
};
use crate::metrics::SessionMetrics;
use std::sync::Arc;
use tracing::{debug, info};

impl WalletSession {
    /// Replace the message awaiting signature. Clears the verification
    /// result.
    pub fn set_pending_message(&self, text: impl Into<String>) {
        self.inner.state.write().set_pending_message(text);
    }

    /// Sign the pending message with the active account.
    ///
    /// On success the signed message and signature are stored together. A
    /// declined or failed request leaves the previous pair untouched.
    pub async fn sign(&self) -> Result<String, SignError> {
        let (handle, generation) = self.handle_and_generation();
        let result = self.sign_pending(handle).await;
        match &result {
            Ok(_) => SessionMetrics::incr(&self.inner.metrics.signatures),
            Err(e) if !matches!(e, SignError::Superseded) => {
                SessionMetrics::incr(&self.inner.metrics.sign_failures)
            }
            Err(_) => {}
        }
        self.settle(generation, SessionOperation::Sign, result)
    }

    async fn sign_pending(&self, handle: Option<Arc<ProviderHandle>>) -> Result<String, SignError> {
        let (message, account) = {
            let state = self.inner.state.read();
            if !state.is_connected() {
                return Err(SignError::NotConnected);
            }
            let account = state.account().cloned().ok_or(SignError::NoActiveAccount)?;
            let message = state
                .pending_message()
                .filter(|m| !m.is_empty())
                .ok_or(SignError::EmptyMessage)?
                .to_string();
            (message, account)
        };
        let handle = handle.ok_or(SignError::NotConnected)?;

        let signature = handle
            .personal_sign(&message, &account)
            .await
            .map_err(|e| match e {
                RequestError::Provider(p) if p.is_user_rejected() => SignError::Declined(p),
                other => SignError::Request(other),
            })?;

        let recorded = signature.clone();
        self.with_current(handle.generation(), |state| {
            state.record_signature(message, recorded)
        })
        .ok_or(SignError::Superseded)?;
        info!(
            account = %account,
            "[wallet-session] Message signed"
        );
        Ok(signature)
    }

    /// Recover the signer of the last signature and compare it to the active
    /// account, ignoring case.
    ///
    /// Fails with `NoActiveAccount` before any provider call when there is no
    /// account.
    pub async fn verify(&self) -> Result<bool, VerifyError> {
        let (handle, generation) = self.handle_and_generation();
        let result = self.verify_last(handle).await;
        if result.is_ok() {
            SessionMetrics::incr(&self.inner.metrics.verifications);
        }
        self.settle(generation, SessionOperation::Verify, result)
    }

    async fn verify_last(&self, handle: Option<Arc<ProviderHandle>>) -> Result<bool, VerifyError> {
        let (message, signature, account) = {
            let state = self.inner.state.read();
            let (Some(message), Some(signature)) =
                (state.last_signed_message(), state.last_signature())
            else {
                return Err(VerifyError::NothingSigned);
            };
            let account = state.account().cloned().ok_or(VerifyError::NoActiveAccount)?;
            (message.to_string(), signature.to_string(), account)
        };
        let handle = handle.ok_or(VerifyError::NotConnected)?;

        let recovered = handle
            .recover_signer(&message, &signature)
            .await
            .map_err(VerifyError::Request)?;
        let verified = account.matches(recovered.as_str());
        debug!(
            account = %account,
            recovered = %recovered,
            verified,
            "[wallet-session] Signer recovered"
        );

        let applied = self
            .with_current(handle.generation(), |state| {
                if !still_subject(state, &account, &message, &signature) {
                    return false;
                }
                state.record_verification(verified);
                true
            })
            .unwrap_or(false);
        if !applied {
            return Err(VerifyError::Superseded);
        }
        Ok(verified)
    }
}

/// The account and signed pair a verification was computed for are still
/// the ones in the session.
fn still_subject(state: &SessionState, account: &Address, message: &str, signature: &str) -> bool {
    state.account() == Some(account)
        && state.last_signed_message() == Some(message)
        && state.last_signature() == Some(signature)
}
