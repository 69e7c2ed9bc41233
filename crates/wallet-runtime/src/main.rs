//! # Wallet Runtime
//!
//! Entry point: initialize logging, load configuration and run one wallet
//! session against the in-memory wallet.

use anyhow::{Context, Result};
use tracing::{info, Instrument};
use wallet_runtime::{RuntimeConfig, WalletRuntime};
use wallet_telemetry::{init_telemetry, session_span, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let _telemetry =
        init_telemetry(TelemetryConfig::from_env()).context("initializing telemetry")?;

    // Load configuration
    let config = RuntimeConfig::from_env()?;
    info!(
        target_chain = %config.target_chain,
        auto_resume = config.session.auto_resume,
        extra_chains = config.session.extra_chains.len(),
        "Starting wallet runtime"
    );

    let target_chain = config.target_chain;
    let runtime = WalletRuntime::new(config);
    let report = runtime
        .run()
        .instrument(session_span!("wallet_run", target_chain = %target_chain))
        .await?;

    println!("{}", WalletRuntime::report_json(&report)?);
    Ok(())
}
