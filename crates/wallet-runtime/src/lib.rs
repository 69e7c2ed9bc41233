//! # Wallet Runtime
//!
//! Wires a [`WalletSession`] to the in-memory wallet and drives it through a
//! full session: resume or connect, network switch (with the add-chain
//! fallback), sign, verify and disconnect.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`wallet-telemetry`)
//! 2. Load configuration from the environment and `WS_CHAINS_FILE`
//! 3. Build the wallet, the factory and the session
//! 4. Run the session flow and report the outcome

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use wallet_session::{
    ChainId, InMemoryProviderFactory, InMemoryWallet, MetricsSnapshot, SessionConfig,
    SessionState, SwitchOutcome, TomlChainTable, WalletSession,
};
use wallet_telemetry::{log_event, log_session_event};

/// Path of an optional TOML chain table.
pub const ENV_CHAINS_FILE: &str = "WS_CHAINS_FILE";
/// Network to switch to, decimal or `0x` hex.
pub const ENV_TARGET_CHAIN: &str = "WS_TARGET_CHAIN";
/// Message to sign.
pub const ENV_MESSAGE: &str = "WS_MESSAGE";

const COMPONENT: &str = "wallet-runtime";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Session configuration, including extra chains from the TOML table.
    pub session: SessionConfig,
    /// Account held by the in-memory wallet.
    pub account: String,
    /// Network the wallet starts on.
    pub start_chain: ChainId,
    /// Network the session switches to.
    pub target_chain: ChainId,
    /// Message to sign.
    pub message: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            account: "0xAbCdEf0123456789aBcDeF0123456789AbCdEf01".to_string(),
            start_chain: ChainId::MAINNET,
            target_chain: ChainId::CELO,
            message: "hello".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            session: SessionConfig::from_env(),
            ..Self::default()
        };

        if let Ok(path) = std::env::var(ENV_CHAINS_FILE) {
            let table = TomlChainTable::load(&path)
                .with_context(|| format!("loading chain table from {path}"))?;
            info!(path = %path, chains = table.chains().len(), "Loaded chain table");
            config.session = config.session.with_extra_chains(table.into_chains());
        }
        if let Ok(target) = std::env::var(ENV_TARGET_CHAIN) {
            config.target_chain = target
                .parse()
                .with_context(|| format!("parsing {ENV_TARGET_CHAIN}"))?;
        }
        if let Ok(message) = std::env::var(ENV_MESSAGE) {
            config.message = message;
        }
        Ok(config)
    }
}

/// Outcome of one session run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// How the switch request went.
    pub switch: SwitchOutcome,
    /// Signature returned by the wallet.
    pub signature: String,
    /// Whether the recovered signer matched the account.
    pub verified: bool,
    /// Session state right before disconnecting.
    pub connected_state: SessionState,
    /// Session state after disconnecting.
    pub final_state: SessionState,
    /// Session counters.
    pub metrics: MetricsSnapshot,
}

/// The wallet runtime.
pub struct WalletRuntime {
    config: RuntimeConfig,
    wallet: Arc<InMemoryWallet>,
    session: WalletSession,
}

impl WalletRuntime {
    /// Build wallet, factory and session.
    pub fn new(config: RuntimeConfig) -> Self {
        let wallet = Arc::new(InMemoryWallet::new(&[config.account.as_str()], config.start_chain));
        let factory = Arc::new(InMemoryProviderFactory::new(wallet.clone()));
        let session = WalletSession::new(config.session.clone(), factory);
        Self {
            config,
            wallet,
            session,
        }
    }

    /// The session under management.
    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// The wallet behind the factory.
    pub fn wallet(&self) -> &Arc<InMemoryWallet> {
        &self.wallet
    }

    /// Run the full session flow.
    pub async fn run(&self) -> Result<RunReport> {
        let state = match self.session.try_resume().await.context("resuming session")? {
            Some(state) => state,
            None => self.session.connect().await.context("connecting wallet")?,
        };
        log_session_event!(info, COMPONENT, "Session connected", state);

        self.session.select_network(self.config.target_chain);
        let switch = self
            .session
            .switch_network()
            .await
            .with_context(|| format!("switching to chain {}", self.config.target_chain))?;
        log_session_event!(
            info,
            COMPONENT,
            "Network switch requested",
            self.session.state(),
            outcome = ?switch
        );

        self.session.set_pending_message(self.config.message.clone());
        let signature = self.session.sign().await.context("signing message")?;
        let verified = self.session.verify().await.context("verifying signature")?;
        log_event!(info, COMPONENT, "Signature verified", verified);

        let connected_state = self.session.state();
        self.session.disconnect();
        let final_state = self.session.state();
        log_session_event!(info, COMPONENT, "Session closed", final_state);

        Ok(RunReport {
            switch,
            signature,
            verified,
            connected_state,
            final_state,
            metrics: self.session.metrics(),
        })
    }

    /// Render a report as JSON.
    pub fn report_json(report: &RunReport) -> Result<String> {
        let value = serde_json::json!({
            "switch": report.switch,
            "signature": report.signature,
            "verified": report.verified,
            "connected_state": report.connected_state,
            "final_state": report.final_state,
            "metrics": report.metrics,
        });
        serde_json::to_string_pretty(&value).context("serializing report")
    }
}
