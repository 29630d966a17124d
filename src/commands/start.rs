use anyhow::Result;
use agent_proxy::{config::Config, server};
use colored::Colorize;
use tracing::info;

/// Execute the start command (blocks until shutdown)
pub async fn execute(cfg: Config) -> Result<()> {
    println!("{}", "Starting agent proxy...".green());
    info!(
        host = %cfg.server.host,
        port = cfg.server.port,
        "Starting agent proxy in foreground mode"
    );

    server::start_server(cfg).await
}
