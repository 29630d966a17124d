use anyhow::{bail, Result};
use agent_proxy::{config::Config, server, store::LogStoreHandle};
use colored::Colorize;

/// Execute the probe command
///
/// Pings the configured log store and creates the log index if it is missing.
pub async fn execute(cfg: Config) -> Result<()> {
    println!(
        "{} {} ({})",
        "Probing log store".yellow(),
        cfg.log_store.endpoint,
        cfg.log_store.index
    );

    let handle = LogStoreHandle::new(cfg.log_store);
    if !server::initialize_log_store(&handle).await {
        println!("{}", "✗ Log store is not usable".red());
        bail!("log store probe failed");
    }

    println!("{}", "✓ Log store reachable and index ready".green());
    Ok(())
}
