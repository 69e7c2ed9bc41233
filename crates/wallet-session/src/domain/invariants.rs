//! # Domain Invariants
//!
//! Rules every [`SessionState`] must satisfy between operations.

use super::entities::SessionState;
use super::value_objects::ConnectionStatus;

/// Invariant: signed message and signature exist together or not at all.
pub fn invariant_signature_pairing(state: &SessionState) -> bool {
    state.last_signed_message().is_some() == state.last_signature().is_some()
}

/// Invariant: an account or active chain implies a live connection.
pub fn invariant_account_requires_connection(state: &SessionState) -> bool {
    state.is_connected() || (state.account().is_none() && state.chain_id().is_none())
}

/// Invariant: a verification result only exists for a signed pair.
pub fn invariant_verification_has_subject(state: &SessionState) -> bool {
    state.verification_result().is_none() || state.last_signature().is_some()
}

/// Invariant: a disconnected session is in the empty form.
///
/// `last_error` is exempt.
pub fn invariant_disconnected_is_empty(state: &SessionState) -> bool {
    if state.connection() != ConnectionStatus::Disconnected {
        return true;
    }
    let mut expected = SessionState::new();
    if let Some(record) = state.last_error() {
        expected.record_error(record.clone());
    }
    // Fields the user sets before connecting are allowed.
    if let Some(chain) = state.desired_chain_id() {
        expected.set_desired_chain(chain);
    }
    if let Some(message) = state.pending_message() {
        expected.set_pending_message(message);
    }
    *state == expected
}

/// Check every invariant.
pub fn check_invariants(state: &SessionState) -> bool {
    invariant_signature_pairing(state)
        && invariant_account_requires_connection(state)
        && invariant_verification_has_subject(state)
        && invariant_disconnected_is_empty(state)
}
