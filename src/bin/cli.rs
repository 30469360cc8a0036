//! Vacancy Crawler CLI
//!
//! Runs the crawl on the configured cron schedule until interrupted, or once
//! with `--once`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use vacancy_crawler::{
    error::Result,
    models::Config,
    pipeline::{self, CrawlJob, CrawlScheduler},
};

/// Collects Java vacancies from the sql.ru job forum
#[derive(Parser, Debug)]
#[command(name = "vacancy-crawler", version, about = "Incremental job forum crawler")]
struct Cli {
    /// Path to the TOML configuration file
    config: Option<PathBuf>,

    /// Run a single crawl cycle and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let Some(config_path) = cli.config else {
        log::error!("No configuration file given. Usage: vacancy-crawler <config.toml>");
        return ExitCode::FAILURE;
    };

    match run(config_path, cli.once).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.is_config() {
                log::error!("Startup failed: {e}");
            } else {
                log::error!("{e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config_path: PathBuf, once: bool) -> Result<()> {
    let config = Config::load(&config_path)?;
    log::info!("Loaded configuration from {}", config_path.display());

    let job = CrawlJob::from_config(&config)?;

    if once {
        pipeline::run_crawler(&job).await?;
        return Ok(());
    }

    let scheduler = CrawlScheduler::start(&config.schedule, job).await?;
    tokio::signal::ctrl_c().await?;
    log::info!("Interrupted, shutting down...");
    scheduler.shutdown().await
}
