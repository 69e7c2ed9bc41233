//! # Wallet Session
//!
//! Client-side session manager for a browser-style wallet connection.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! Connect to an externally supplied wallet provider, track the account,
//! network and connection status, ask the wallet to switch networks, sign
//! personal messages and verify signatures against the connected account.
//! Signing and signer recovery are performed by the wallet, never locally.
//!
//! ## Guarantees
//!
//! | Guarantee | Mechanism |
//! |-----------|-----------|
//! | No stale account after disconnect | Account and chain cleared together on reset |
//! | Signed message and signature move together | Single `record_signature` mutator |
//! | No duplicate event handlers | Subscriptions torn down per handle generation |
//! | Late responses are harmless | Generation counter checked before every write |
//! | One request at a time per handle | Async in-flight guard in `ProviderHandle` |
//!
//! ## Module Structure
//!
//! ```text
//! wallet-session/
//! ├── domain/          # SessionState, value objects, errors, chain table, invariants
//! ├── ports/           # WalletSessionApi (inbound) + WalletProvider, ProviderFactory (outbound)
//! ├── adapters/        # ProviderHandle, in-memory wallet, TOML chain table
//! ├── service/         # WalletSession: connection, network, signing
//! ├── config.rs        # SessionConfig
//! └── metrics.rs       # SessionMetrics
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod metrics;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    methods, InMemoryProviderFactory, InMemoryWallet, ProviderHandle, SessionEvent,
    TomlChainTable,
};
pub use config::SessionConfig;
pub use domain::{
    builtin_chains, check_invariants, Address, ChainId, ChainParams, ChainTable, ConfigError,
    ConnectError, ConnectionStatus, ErrorRecord, FactoryError, InvalidChainId, NativeCurrency,
    ProviderError, RequestError, SessionOperation, SessionState, SignError, SwitchError,
    SwitchOutcome, VerifyError,
};
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use ports::{
    EventHandler, MockProvider, MockProviderFactory, ProviderCapabilities, ProviderEventKind,
    ProviderFactory, SubscriptionId, WalletProvider, WalletSessionApi,
};
pub use service::WalletSession;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
