//! # Domain Value Objects
//!
//! Immutable value types for the wallet session.

use super::errors::InvalidChainId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numeric chain identifier.
///
/// This is the only representation used inside the session. Providers speak
/// `0x`-prefixed hex strings; conversion happens at the provider boundary via
/// [`ChainId::to_hex`] and [`ChainId::from_hex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Ethereum mainnet.
    pub const MAINNET: ChainId = ChainId(1);
    /// Ropsten testnet.
    pub const ROPSTEN: ChainId = ChainId(3);
    /// Rinkeby testnet.
    pub const RINKEBY: ChainId = ChainId(4);
    /// Kovan testnet.
    pub const KOVAN: ChainId = ChainId(42);
    /// SPC network.
    pub const SPC: ChainId = ChainId(55);
    /// Celo mainnet.
    pub const CELO: ChainId = ChainId(42220);
    /// Harmony mainnet shard 0.
    pub const HARMONY: ChainId = ChainId(1_666_600_000);

    /// Create a chain id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Provider wire format: lower-case hex with `0x` prefix, no padding.
    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }

    /// Parse the provider wire format.
    pub fn from_hex(s: &str) -> Result<Self, InvalidChainId> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| InvalidChainId(s.to_string()))?;
        u64::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|_| InvalidChainId(s.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChainId {
    type Err = InvalidChainId;

    /// Accepts both decimal (`"4"`) and hex (`"0x4"`) input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            return Self::from_hex(trimmed);
        }
        trimmed
            .parse::<u64>()
            .map(Self)
            .map_err(|_| InvalidChainId(s.to_string()))
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Account address as returned by the provider.
///
/// The original casing is kept for display. Comparisons go through
/// [`Address::matches`], which lower-cases both sides.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Wrap a provider-supplied address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Address as provided.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lower-cased form.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// Case-insensitive comparison against another address string.
    pub fn matches(&self, other: &str) -> bool {
        self.normalized() == other.to_lowercase()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Session connection state machine.
///
/// ```text
/// Disconnected --connect--> Connecting --ok--> Connected
/// Connecting --failure--> Disconnected
/// Connected --disconnect--> Disconnected
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// No provider handle. Initial state.
    #[default]
    Disconnected,
    /// Provider requested, awaiting accounts and network.
    Connecting,
    /// Provider handle installed and event handlers subscribed.
    Connected,
}

impl ConnectionStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: ConnectionStatus) -> bool {
        match (self, next) {
            (Self::Disconnected, Self::Connecting) => true,
            (Self::Connected, Self::Connecting) => true, // Reconnect
            (Self::Connecting, Self::Connecting) => true, // Superseding connect
            (Self::Connecting, Self::Connected) => true,
            (Self::Connecting, Self::Disconnected) => true,
            (Self::Connected, Self::Disconnected) => true,
            (Self::Disconnected, Self::Disconnected) => true, // Idempotent reset
            _ => false,
        }
    }
}

/// Operation that produced an error record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOperation {
    /// User-triggered connect.
    Connect,
    /// Network switch (including the add-chain fallback).
    SwitchNetwork,
    /// Personal-message signing.
    Sign,
    /// Signer recovery and comparison.
    Verify,
}

impl fmt::Display for SessionOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::SwitchNetwork => "switch_network",
            Self::Sign => "sign",
            Self::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Result of a successful `switch_network` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchOutcome {
    /// Not connected or no network selected. No request was sent.
    Skipped,
    /// Switch accepted. The chain-changed event carries the new chain id.
    Requested(ChainId),
    /// Wallet did not know the chain; it was added and the switch re-sent.
    AddedAndRequested(ChainId),
}
