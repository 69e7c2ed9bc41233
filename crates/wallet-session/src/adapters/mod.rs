//! # Adapters Module
//!
//! Provider handle, in-memory wallet and TOML chain table.

pub mod in_memory;
pub mod provider_handle;
pub mod toml_chains;

pub use in_memory::{InMemoryProviderFactory, InMemoryWallet};
pub use provider_handle::{methods, ProviderHandle, SessionEvent};
pub use toml_chains::TomlChainTable;
