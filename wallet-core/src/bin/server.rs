//! Wallet ledger server binary

use wallet_core::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting wallet ledger server");

    // Load configuration
    let config = Config::from_env()?;

    // Open ledger
    let ledger = Ledger::open(config)?;
    let stats = ledger.stats()?;
    tracing::info!(
        total_wallets = stats.total_wallets,
        total_transactions = stats.total_transactions,
        "Ledger opened successfully"
    );

    // The HTTP/API layer lives outside this crate; keep the ledger open
    // until interrupted.
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down wallet ledger server");
    Ok(())
}
