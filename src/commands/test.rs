use anyhow::Result;
use agent_proxy::config::{Config, StoreBackend};
use colored::Colorize;
use std::path::Path;
use tracing::info;

/// Execute the test command
///
/// The configuration was loaded and validated before we get here; this only reports it.
pub fn execute(path: &Path, cfg: &Config) -> Result<()> {
    println!("{}", "Testing configuration...".yellow());
    println!("{}", "✓ Configuration test successful".green());
    println!();

    let source = if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not found, defaults + environment)", path.display())
    };

    println!("{}", "Configuration Summary:".bold());
    println!("  {}: {}", "Source".cyan(), source);
    println!("  {}: {}:{}", "Server".cyan(), cfg.server.host, cfg.server.port);
    println!("  {}: {}", "Log Level".cyan(), cfg.server.log_level);
    println!("  {}: {}", "Log Format".cyan(), cfg.server.log_format);
    println!();

    println!("  {}: {}", "Upstream".cyan(), cfg.upstream.url);
    println!("    Timeout: {}s", cfg.upstream.timeout_seconds);
    println!("    Forwarded headers: {}", cfg.upstream.forward_headers.join(", "));
    println!(
        "    Auth header: {}",
        if cfg.upstream.auth_header.is_some() {
            "configured".green()
        } else {
            "none".dimmed()
        }
    );
    println!();

    let backend = match cfg.log_store.backend {
        StoreBackend::Elasticsearch => "elasticsearch",
        StoreBackend::Memory => "memory",
    };
    println!("  {}: {}", "Log Store".cyan(), backend);
    if cfg.log_store.backend == StoreBackend::Elasticsearch {
        println!("    Endpoint: {}", cfg.log_store.endpoint);
        let auth = if cfg.log_store.api_key.is_some() {
            "api key"
        } else if cfg.log_store.username.is_some() {
            "basic"
        } else {
            "none"
        };
        println!("    Auth: {}", auth);
    }
    println!("    Index: {}", cfg.log_store.index);
    println!("    Captured endpoint: {}", cfg.capture.endpoint);
    println!();

    println!(
        "  {}: {}",
        "Metrics".cyan(),
        if cfg.metrics.enabled {
            "enabled".green()
        } else {
            "disabled".red()
        }
    );
    if cfg.metrics.enabled {
        println!("    Endpoint: {}", cfg.metrics.endpoint);
    }

    info!("Configuration validation completed successfully");
    Ok(())
}
