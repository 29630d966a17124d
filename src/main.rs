use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use agent_proxy::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let command = args.get_command();

    if let cli::Commands::Version = command {
        println!("Agent Proxy v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = config::load_config(&args.config)?;
    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    match command {
        cli::Commands::Start => commands::start::execute(cfg).await?,
        cli::Commands::Test => commands::test::execute(&args.config, &cfg)?,
        cli::Commands::Probe => commands::probe::execute(cfg).await?,
        cli::Commands::Logs(logs_args) => commands::logs::execute(cfg, logs_args).await?,
        cli::Commands::Version => {}
    }

    Ok(())
}
