//! # Chain Parameter Table
//!
//! `wallet_addEthereumChain` bodies (EIP-3085) keyed by hex chain id.

use super::value_objects::ChainId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Native currency of a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name.
    pub name: String,
    /// Ticker symbol (2-6 characters).
    pub symbol: String,
    /// Decimals, 18 for every EVM chain shipped here.
    pub decimals: u8,
}

impl NativeCurrency {
    fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals: 18,
        }
    }
}

/// Add-chain request body, serialized exactly as the wallet expects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainParams {
    /// Hex chain id, e.g. `"0x4"`.
    pub chain_id: String,
    /// Display name.
    pub chain_name: String,
    /// Native currency.
    pub native_currency: NativeCurrency,
    /// RPC endpoints.
    pub rpc_urls: Vec<String>,
    /// Block explorers.
    #[serde(default)]
    pub block_explorer_urls: Vec<String>,
}

impl ChainParams {
    /// Build a table entry.
    pub fn new(
        chain_id: ChainId,
        chain_name: &str,
        native_currency: NativeCurrency,
        rpc_urls: &[&str],
        block_explorer_urls: &[&str],
    ) -> Self {
        Self {
            chain_id: chain_id.to_hex(),
            chain_name: chain_name.to_string(),
            native_currency,
            rpc_urls: rpc_urls.iter().map(|s| s.to_string()).collect(),
            block_explorer_urls: block_explorer_urls.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Numeric chain id, if the hex key is well formed.
    pub fn id(&self) -> Option<ChainId> {
        ChainId::from_hex(&self.chain_id).ok()
    }
}

/// Networks surfaced to the user out of the box.
pub fn builtin_chains() -> Vec<ChainParams> {
    vec![
        ChainParams::new(
            ChainId::ROPSTEN,
            "Ropsten Test Network",
            NativeCurrency::new("Ropsten Ether", "ETH"),
            &["https://ropsten.infura.io/v3/"],
            &["https://ropsten.etherscan.io"],
        ),
        ChainParams::new(
            ChainId::RINKEBY,
            "Rinkeby Test Network",
            NativeCurrency::new("Rinkeby Ether", "ETH"),
            &["https://rinkeby.infura.io/v3/"],
            &["https://rinkeby.etherscan.io"],
        ),
        ChainParams::new(
            ChainId::KOVAN,
            "Kovan Test Network",
            NativeCurrency::new("Kovan Ether", "ETH"),
            &["https://kovan.infura.io/v3/"],
            &["https://kovan.etherscan.io"],
        ),
        ChainParams::new(
            ChainId::HARMONY,
            "Harmony Mainnet",
            NativeCurrency::new("ONE", "ONE"),
            &["https://api.harmony.one"],
            &["https://explorer.harmony.one"],
        ),
        ChainParams::new(
            ChainId::CELO,
            "Celo Mainnet",
            NativeCurrency::new("CELO", "CELO"),
            &["https://forno.celo.org"],
            &["https://explorer.celo.org"],
        ),
        ChainParams::new(
            ChainId::SPC,
            "SPC Mainnet",
            NativeCurrency::new("SPC", "SPC"),
            &["https://rpc.spc.network"],
            &["https://explorer.spc.network"],
        ),
    ]
}

/// Lookup table from hex chain id to add-chain parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainTable {
    entries: BTreeMap<String, ChainParams>,
}

impl ChainTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding [`builtin_chains`].
    pub fn builtin() -> Self {
        let mut table = Self::new();
        table.extend(builtin_chains());
        table
    }

    /// Insert or replace an entry. The key is normalized through [`ChainId`]
    /// so `"0x2A"` and `"0x2a"` land on the same slot.
    pub fn insert(&mut self, mut params: ChainParams) {
        let key = match params.id() {
            Some(id) => id.to_hex(),
            None => params.chain_id.to_lowercase(),
        };
        params.chain_id = key.clone();
        self.entries.insert(key, params);
    }

    /// Insert several entries; later entries win.
    pub fn extend(&mut self, params: impl IntoIterator<Item = ChainParams>) {
        for p in params {
            self.insert(p);
        }
    }

    /// Parameters for a chain.
    pub fn get(&self, chain_id: ChainId) -> Option<&ChainParams> {
        self.entries.get(&chain_id.to_hex())
    }

    /// Whether the chain has parameters.
    pub fn contains(&self, chain_id: ChainId) -> bool {
        self.get(chain_id).is_some()
    }

    /// Chains with parameters, ascending.
    pub fn chain_ids(&self) -> Vec<ChainId> {
        let mut ids: Vec<ChainId> = self.entries.values().filter_map(ChainParams::id).collect();
        ids.sort();
        ids
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
