//! # Session Configuration

use crate::domain::{ChainParams, ChainTable};
use serde::{Deserialize, Serialize};

/// Environment variable toggling automatic resume on startup.
pub const ENV_AUTO_RESUME: &str = "WS_AUTO_RESUME";

/// Wallet session configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Reconnect on startup when the factory remembers a wallet.
    pub auto_resume: bool,

    /// Add-chain entries on top of the built-in table. Entries with a
    /// built-in id replace the built-in entry.
    #[serde(default)]
    pub extra_chains: Vec<ChainParams>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_resume: true,
            extra_chains: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Create a config for testing.
    pub fn for_testing() -> Self {
        Self {
            auto_resume: true,
            extra_chains: Vec::new(),
        }
    }

    /// Defaults overridden by environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(ENV_AUTO_RESUME) {
            config.auto_resume = parse_flag(&value).unwrap_or(config.auto_resume);
        }
        config
    }

    /// Append add-chain entries.
    pub fn with_extra_chains(mut self, chains: impl IntoIterator<Item = ChainParams>) -> Self {
        self.extra_chains.extend(chains);
        self
    }

    /// Built-in table merged with `extra_chains`.
    pub fn chain_table(&self) -> ChainTable {
        let mut table = ChainTable::builtin();
        table.extend(self.extra_chains.iter().cloned());
        table
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
