use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "agent-proxy", version, about = "Agent request proxy with API audit logging")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true, env = "AGENT_PROXY_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the proxy server (default)
    Start,

    /// Test configuration file validity
    Test,

    /// Check log store connectivity and initialize the log index
    Probe,

    /// Query captured API exchanges
    Logs(crate::commands::logs::LogsArgs),

    /// Show version information
    Version,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_start() {
        let cli = Cli::try_parse_from(["agent-proxy"]).unwrap();
        assert!(matches!(cli.get_command(), Commands::Start));
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }

    #[test]
    fn test_cli_parsing_global_config() {
        let cli = Cli::try_parse_from(["agent-proxy", "probe", "--config", "/etc/proxy.toml"]).unwrap();
        assert!(matches!(cli.get_command(), Commands::Probe));
        assert_eq!(cli.config, PathBuf::from("/etc/proxy.toml"));
    }

    #[test]
    fn test_cli_parsing_logs() {
        let cli = Cli::try_parse_from([
            "agent-proxy",
            "logs",
            "--user-id",
            "u1",
            "--limit",
            "5",
            "--from",
            "2026-01-20",
        ])
        .unwrap();

        match cli.get_command() {
            Commands::Logs(args) => {
                assert_eq!(args.user_id.as_deref(), Some("u1"));
                assert_eq!(args.limit, Some(5));
                assert_eq!(args.from.as_deref(), Some("2026-01-20"));
            }
            _ => panic!("Expected Logs command"),
        }
    }
}
