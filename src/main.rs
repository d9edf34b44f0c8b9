use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use feedcheck::{
    format_feed_list, format_report, Config, Database, FeedChecker, FeedCheckError,
    FeedRepository, FeedService, HttpFetcher,
};

/// Check subscribed RSS/Atom feeds for new items.
#[derive(Parser, Debug)]
#[command(name = "feedcheck", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List subscribed feeds
    List,
    /// Check all feeds and print new items
    Check,
    /// Subscribe to a feed
    Add {
        /// Feed URL
        url: String,
    },
    /// Unsubscribe from a feed
    Remove {
        /// Feed URL
        url: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = feedcheck::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        feedcheck::logging::init_stderr_only(&config.logging.level);
    }

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: &Path) -> feedcheck::Result<Config> {
    let mut config = match Config::load(path) {
        Ok(config) => config,
        Err(FeedCheckError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("Config file {} not found, using defaults.", path.display());
            Config::default()
        }
        Err(e) => return Err(e),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

async fn run(command: Command, config: &Config) -> feedcheck::Result<()> {
    let db = Database::open(&config.database.path).await?;
    let fetcher = HttpFetcher::new(&config.check)?;

    match command {
        Command::List => {
            let feeds = FeedService::new(&db, &fetcher).list_feeds().await?;
            print!("{}", format_feed_list(&feeds));
        }
        Command::Check => {
            let checker = FeedChecker::new(
                Arc::new(FeedRepository::new(db.pool())),
                Arc::new(fetcher),
            )
            .with_max_concurrency(config.check.max_concurrency)
            .with_progress(|_| {
                let mut stdout = std::io::stdout().lock();
                let _ = write!(stdout, ".");
                let _ = stdout.flush();
            });

            let report = checker.run().await?;
            println!();
            print!("{}", format_report(&report.result));

            let summary = &report.summary;
            info!(
                "{} of {} feed(s) checked, {} failed",
                summary.completed,
                summary.attempted,
                summary.failures.len()
            );
        }
        Command::Add { url } => {
            let feed = FeedService::new(&db, &fetcher).add_feed(&url).await?;
            println!("Added {}: {}", feed.title, feed.url);
        }
        Command::Remove { url } => {
            FeedService::new(&db, &fetcher).remove_feed(&url).await?;
            println!("Removed {}", url);
        }
    }

    Ok(())
}
