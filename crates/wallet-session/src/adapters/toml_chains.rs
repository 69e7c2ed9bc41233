//! TOML chain table.
//!
//! Extra `wallet_addEthereumChain` entries loaded from a file. Entries
//! override built-in chains with the same id.

use crate::domain::{ChainId, ChainParams, ChainTable, ConfigError, NativeCurrency};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Configuration file structure.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    chains: Vec<ChainEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChainIdEntry {
    Number(u64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct ChainEntry {
    chain_id: ChainIdEntry,
    name: String,
    currency_name: String,
    currency_symbol: String,
    #[serde(default = "default_decimals")]
    decimals: u8,
    rpc_urls: Vec<String>,
    #[serde(default)]
    explorer_urls: Vec<String>,
}

fn default_decimals() -> u8 {
    18
}

/// Chain entries loaded from TOML.
///
/// # Config File Format
///
/// ```toml
/// [[chains]]
/// chain_id = 137            # or "0x89"
/// name = "Polygon Mainnet"
/// currency_name = "MATIC"
/// currency_symbol = "MATIC"
/// rpc_urls = ["https://polygon-rpc.com"]
/// explorer_urls = ["https://polygonscan.com"]
/// ```
#[derive(Debug, Clone, Default)]
pub struct TomlChainTable {
    chains: Vec<ChainParams>,
}

impl TomlChainTable {
    /// Load entries from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or an entry is invalid.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse entries from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        let chains = file
            .chains
            .into_iter()
            .map(Self::convert)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { chains })
    }

    fn convert(entry: ChainEntry) -> Result<ChainParams, ConfigError> {
        let chain_id = match entry.chain_id {
            ChainIdEntry::Number(n) => ChainId(n),
            ChainIdEntry::Text(s) => s
                .parse()
                .map_err(|_| ConfigError::InvalidChain(format!("{}: bad chain_id {s:?}", entry.name)))?,
        };
        if entry.rpc_urls.is_empty() {
            return Err(ConfigError::InvalidChain(format!(
                "{}: rpc_urls must not be empty",
                entry.name
            )));
        }

        Ok(ChainParams {
            chain_id: chain_id.to_hex(),
            chain_name: entry.name,
            native_currency: NativeCurrency {
                name: entry.currency_name,
                symbol: entry.currency_symbol,
                decimals: entry.decimals,
            },
            rpc_urls: entry.rpc_urls,
            block_explorer_urls: entry.explorer_urls,
        })
    }

    /// Loaded entries in file order.
    pub fn chains(&self) -> &[ChainParams] {
        &self.chains
    }

    /// Consume into entries.
    pub fn into_chains(self) -> Vec<ChainParams> {
        self.chains
    }

    /// Built-in table extended with these entries.
    pub fn merged_with_builtin(&self) -> ChainTable {
        let mut table = ChainTable::builtin();
        table.extend(self.chains.iter().cloned());
        table
    }
}
