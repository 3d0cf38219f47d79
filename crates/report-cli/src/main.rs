//! Command-line front end for the report service.

mod env;
mod interactive;
mod output;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use report_stream::observability::init_observability;
use report_stream::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "report-cli", version, about = "Stream market-analysis reports from the report service")]
struct Cli {
    /// Base URL of the report service (overrides REPORT_API_BASE_URL).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Report language (overrides REPORT_LANGUAGE).
    #[arg(long, global = true)]
    language: Option<String>,
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate a report and print it as it streams in.
    Generate {
        /// Natural-language question to analyse.
        query: String,
        /// Optional report date, passed through to the service.
        #[arg(long)]
        report_date: Option<String>,
        /// Also write the finished report as an HTML document.
        #[arg(long)]
        html: Option<PathBuf>,
        /// Use the non-streaming endpoint and print the report at the end.
        #[arg(long)]
        no_stream: bool,
    },
    /// Read queries from stdin, one per line; a new line supersedes the running report.
    Interactive,
    /// Check that the service is up.
    Health,
    /// Manage reports stored by the service.
    #[command(subcommand)]
    Reports(ReportsCommand),
}

#[derive(Debug, Subcommand)]
enum ReportsCommand {
    /// List stored reports.
    List,
    /// Print a stored report.
    Get {
        id: String,
        /// Write the report as an HTML document instead of printing markdown.
        #[arg(long)]
        html: Option<PathBuf>,
    },
    /// Delete a stored report.
    Delete { id: String },
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

fn apply_overrides(mut config: ClientConfig, cli: &Cli) -> ClientConfig {
    if let Some(base_url) = &cli.base_url {
        config = config.base_url(base_url.clone());
    }
    if let Some(language) = &cli.language {
        config = config.language(language.as_str());
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env::init();
    let cli = Cli::parse();
    init_observability(log_level(cli.verbose));

    let config = apply_overrides(ClientConfig::from_env()?, &cli);
    let client = ReportClient::new(config)?;

    match cli.command {
        Command::Generate {
            query,
            report_date,
            html,
            no_stream,
        } => {
            let mut query = client.query(query);
            if let Some(date) = report_date {
                query = query.report_date(date);
            }
            let report = if no_stream {
                let generated = client.generate(&query).await?;
                println!("{}", generated.report);
                generated.report
            } else {
                output::stream_to_stdout(client.into_desk()?, query.clone()).await?
            };
            if let Some(path) = html {
                output::write_html(&path, &query.query, &report)?;
            }
        }
        Command::Interactive => interactive::run(client).await?,
        Command::Health => {
            let health = client.health().await?;
            println!("{} (version {}, {})", health.status, health.version, health.timestamp);
            anyhow::ensure!(health.is_healthy(), "service reported status {}", health.status);
        }
        Command::Reports(ReportsCommand::List) => {
            let listing = client.list_reports().await?;
            println!("{} report(s)", listing.total_count);
            for summary in &listing.reports {
                println!("{}", output::summary_line(summary));
            }
        }
        Command::Reports(ReportsCommand::Get { id, html }) => {
            let stored = client
                .get_report(&id)
                .await
                .with_context(|| format!("fetching report {id}"))?;
            match html {
                Some(path) => output::write_html(&path, &stored.query, &stored.report)?,
                None => println!("{}", stored.report),
            }
        }
        Command::Reports(ReportsCommand::Delete { id }) => {
            let ack = client
                .delete_report(&id)
                .await
                .with_context(|| format!("deleting report {id}"))?;
            println!("{}", ack.message);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_with_flags() {
        let cli = Cli::try_parse_from([
            "report-cli",
            "generate",
            "بازار مسکن",
            "--report-date",
            "March 21, 2024",
            "--html",
            "out.html",
            "--language",
            "English",
            "-vv",
        ])
        .expect("parse");
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.language.as_deref(), Some("English"));
        match cli.command {
            Command::Generate {
                query,
                report_date,
                html,
                no_stream,
            } => {
                assert_eq!(query, "بازار مسکن");
                assert_eq!(report_date.as_deref(), Some("March 21, 2024"));
                assert_eq!(html, Some(PathBuf::from("out.html")));
                assert!(!no_stream);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_reports_subcommands() {
        let cli = Cli::try_parse_from(["report-cli", "reports", "delete", "r-1"]).expect("parse");
        assert!(matches!(cli.command, Command::Reports(ReportsCommand::Delete { id }) if id == "r-1"));
        assert!(Cli::try_parse_from(["report-cli", "reports"]).is_err());
    }

    #[test]
    fn flags_override_environment_config() {
        let cli = Cli::try_parse_from([
            "report-cli",
            "--base-url",
            "http://10.0.0.2:8000",
            "health",
        ])
        .expect("parse");
        let config = apply_overrides(ClientConfig::default().language("English"), &cli);
        assert_eq!(config.base_url, "http://10.0.0.2:8000");
        assert_eq!(config.language.as_str(), "English");
    }

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(log_level(0), "warn");
        assert_eq!(log_level(1), "info");
        assert_eq!(log_level(5), "debug");
    }
}
