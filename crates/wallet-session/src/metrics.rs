//! Session counters
//!
//! Lock-free counters for connection, network and signing activity.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for a wallet session.
#[derive(Default)]
pub struct SessionMetrics {
    /// Successful connects
    pub connects: AtomicU64,
    /// Failed connects (superseded attempts excluded)
    pub connect_failures: AtomicU64,
    /// Disconnects, explicit or provider-initiated
    pub disconnects: AtomicU64,
    /// Switch requests sent
    pub switch_requests: AtomicU64,
    /// Add-chain fallbacks attempted
    pub add_chain_fallbacks: AtomicU64,
    /// Signatures recorded
    pub signatures: AtomicU64,
    /// Failed or declined signing attempts
    pub sign_failures: AtomicU64,
    /// Verifications recorded
    pub verifications: AtomicU64,
    /// Events and responses dropped because their handle was replaced
    pub stale_discarded: AtomicU64,
}

impl SessionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            switch_requests: self.switch_requests.load(Ordering::Relaxed),
            add_chain_fallbacks: self.add_chain_fallbacks.load(Ordering::Relaxed),
            signatures: self.signatures.load(Ordering::Relaxed),
            sign_failures: self.sign_failures.load(Ordering::Relaxed),
            verifications: self.verifications.load(Ordering::Relaxed),
            stale_discarded: self.stale_discarded.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[allow(missing_docs)]
pub struct MetricsSnapshot {
    pub connects: u64,
    pub connect_failures: u64,
    pub disconnects: u64,
    pub switch_requests: u64,
    pub add_chain_fallbacks: u64,
    pub signatures: u64,
    pub sign_failures: u64,
    pub verifications: u64,
    pub stale_discarded: u64,
}
