//! jobwatch: careers page monitor
//!
//! Main binary with subcommands:
//! - `once`: run a single fetch, diff and report cycle
//! - `scheduled`: run a cycle at every configured weekly slot
//! - `next-runs`: print the upcoming trigger times
//!
//! Without a subcommand, `RUN_ONCE` picks between `once` and `scheduled`.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use miette::Result;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jobwatch_listings::{HttpFetcher, SnapshotStore};
use jobwatch_notify::{ConsoleNotifier, Notifier};

mod config;
mod cycle;
mod daemon;

use config::Config;
use cycle::Monitor;

const DEFAULT_LOG_FILTER: &str =
    "jobwatch=info,jobwatch_listings=info,jobwatch_notify=info,jobwatch_scheduler=info";

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

#[derive(Parser)]
#[command(name = "jobwatch")]
#[command(about = "Watches a careers page and reports new job postings", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, env = "JOBWATCH_CONFIG", default_value = "jobwatch.toml")]
    config: PathBuf,

    /// Run a single cycle when no subcommand is given
    #[arg(long, env = "RUN_ONCE", value_parser = parse_bool_env, default_value = "false")]
    run_once: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one cycle and exit (non-zero if the cycle failed)
    Once {
        /// Print the report instead of sending it, and keep the snapshot unchanged
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a cycle at every configured schedule slot
    Scheduled,

    /// Print the next trigger times in each slot's local time
    NextRuns {
        /// How many triggers to list
        #[arg(long, default_value = "5")]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = Config::load(&cli.config, |name| std::env::var(name).ok())
        .map_err(|e| miette::miette!("{}", e))?;

    let command = cli.command.unwrap_or(if cli.run_once {
        Commands::Once { dry_run: false }
    } else {
        Commands::Scheduled
    });

    match command {
        Commands::Once { dry_run } => run_once(&config, dry_run).await,
        Commands::Scheduled => run_scheduled(&config).await,
        Commands::NextRuns { count } => next_runs(&config, count),
    }
}

fn build_monitor(config: &Config, dry_run: bool) -> Result<Monitor> {
    let fetcher = HttpFetcher::new(config.user_agent()).map_err(|e| miette::miette!("{}", e))?;
    let extractor = config.extractor().map_err(|e| miette::miette!("{}", e))?;
    let notifier: Box<dyn Notifier> = if dry_run {
        Box::new(ConsoleNotifier)
    } else {
        config.notifier().map_err(|e| miette::miette!("{}", e))?
    };

    Ok(Monitor::new(
        Box::new(fetcher),
        extractor,
        SnapshotStore::new(&config.snapshot.path),
        notifier,
        config.report_context(),
    )
    .with_dry_run(dry_run))
}

async fn run_once(config: &Config, dry_run: bool) -> Result<()> {
    let monitor = build_monitor(config, dry_run)?;

    match monitor.run_once().await {
        Ok(summary) => {
            info!(
                current = summary.current,
                new = summary.new,
                persisted = summary.persisted,
                "cycle complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(step = %e.step(), error = %e, "cycle failed, snapshot unchanged");
            Err(miette::miette!("cycle failed at the {} step: {}", e.step(), e))
        }
    }
}

async fn run_scheduled(config: &Config) -> Result<()> {
    // Fail on a bad schedule or mail setup before the first wait.
    let schedule = config.schedule().map_err(|e| miette::miette!("{}", e))?;
    let monitor = build_monitor(config, false)?;

    daemon::run(monitor, schedule).await
}

fn next_runs(config: &Config, count: usize) -> Result<()> {
    let schedule = config.schedule().map_err(|e| miette::miette!("{}", e))?;

    for trigger in schedule.upcoming(Utc::now(), count) {
        println!(
            "{}  ({})",
            trigger.local().format("%a %Y-%m-%d %H:%M %Z"),
            trigger.slot
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_env() {
        for truthy in ["1", "true", "YES", "on", " True "] {
            assert_eq!(parse_bool_env(truthy), Ok(true), "{truthy}");
        }
        for falsy in ["0", "false", "No", "off", ""] {
            assert_eq!(parse_bool_env(falsy), Ok(false), "{falsy}");
        }
        assert!(parse_bool_env("maybe").is_err());
    }

    #[test]
    fn test_cli_subcommands() {
        let cli = Cli::try_parse_from(["jobwatch", "--config", "watch.toml", "once", "--dry-run"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("watch.toml"));
        assert!(matches!(cli.command, Some(Commands::Once { dry_run: true })));

        let cli = Cli::try_parse_from(["jobwatch", "next-runs", "--count", "3"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::NextRuns { count: 3 })));
    }

    #[test]
    fn test_cli_accepts_config_after_subcommand() {
        let cli = Cli::try_parse_from(["jobwatch", "scheduled", "--config", "a.toml"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("a.toml"));
        assert!(matches!(cli.command, Some(Commands::Scheduled)));
    }
}
