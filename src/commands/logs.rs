//! Logs query command
//!
//! Reads captured API exchanges straight from the configured log store.

use anyhow::{anyhow, Result};
use agent_proxy::config::Config;
use agent_proxy::handlers::logs::LogsParams;
use agent_proxy::store::{LogStoreHandle, ProjectedRecord, QueryService};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

/// Query and display captured exchanges
#[derive(Debug, Clone, Parser)]
pub struct LogsArgs {
    /// Show one record in full instead of listing
    #[arg(long)]
    pub id: Option<String>,

    /// Filter by user ID
    #[arg(short, long)]
    pub user_id: Option<String>,

    /// Filter by session ID
    #[arg(short, long)]
    pub session_id: Option<String>,

    /// Filter by endpoint path
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Lower time bound (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Upper time bound (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub to: Option<String>,

    /// Maximum number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Number of matching records to skip
    #[arg(long, default_value = "0")]
    pub offset: usize,

    /// Output format (text, json)
    #[arg(short = 'f', long, default_value = "text")]
    pub format: String,
}

/// Execute the logs command
pub async fn execute(cfg: Config, args: LogsArgs) -> Result<()> {
    let store = Arc::new(LogStoreHandle::new(cfg.log_store.clone()));
    let queries = QueryService::new(store, cfg.query.truncate_length);

    if let Some(id) = &args.id {
        return match queries.get(id).await? {
            Some(record) => {
                println!("{}", serde_json::to_string_pretty(&record)?);
                Ok(())
            }
            None => {
                println!("{}", format!("No record with id {}", id).yellow());
                Ok(())
            }
        };
    }

    let format = args.format.clone();
    let query = LogsParams {
        limit: args.limit,
        offset: args.offset,
        user_id: args.user_id,
        session_id: args.session_id,
        endpoint: args.endpoint,
        from: args.from,
        to: args.to,
    }
    .into_query(&cfg.query)
    .map_err(|e| anyhow!("{}", e))?;

    let records = queries.search_summaries(&query).await?;

    if records.is_empty() {
        println!("{}", "No records found matching the criteria".yellow());
        return Ok(());
    }

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&records)?),
        _ => display_records_text(&records),
    }

    Ok(())
}

fn display_records_text(records: &[ProjectedRecord]) {
    println!("{}", format!("Found {} records", records.len()).bold());
    println!();

    for record in records {
        let status = record.status_code.to_string();
        let status_colored = match record.status_code {
            200..=299 => status.green(),
            400..=499 => status.yellow(),
            500..=599 => status.red().bold(),
            _ => status.normal(),
        };

        let user = record
            .user_id
            .as_ref()
            .map(|u| format!(" user={}", u))
            .unwrap_or_default();
        let session = record
            .session_id
            .as_ref()
            .map(|s| format!(" session={}", s))
            .unwrap_or_default();

        println!(
            "{} {} {} {} {}ms{}{} {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
            record.method,
            record.endpoint.cyan(),
            status_colored,
            record.response_time,
            user.dimmed(),
            session.dimmed(),
            record.id.dimmed(),
        );
        println!("  {}", format!("request: {}", record.request_summary).dimmed());
        println!("  {}", format!("response: {}", record.response_summary).dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_args_parsing() {
        let args = LogsArgs::parse_from(["logs", "--user-id", "u1", "--limit", "20", "-f", "json"]);
        assert_eq!(args.user_id, Some("u1".to_string()));
        assert_eq!(args.limit, Some(20));
        assert_eq!(args.format, "json");
        assert_eq!(args.offset, 0);
    }
}
