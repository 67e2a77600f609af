//! ISS recorder utility

use std::process::ExitCode;

use clap::Parser;
use futures::TryStreamExt;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use iss_recorder::{
    cli::Args,
    config::AppConfig,
    database::DatabaseSink,
    errors::{IssRecorderError, Result},
    fetcher::PositionFetcher,
    poller::Poller,
    sink::{self, ConsoleSink},
};

#[tokio::main]
async fn main() -> ExitCode {
    #[cfg(feature = "dotenvy")]
    dotenvy::dotenv().ok();

    // Diagnostics go to stderr, stdout carries console sink output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(stage = %e.stage(), "{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load_with(args.config.as_deref(), &args.overrides())?;

    if args.list {
        return list_positions(&config).await;
    }

    let fetcher = PositionFetcher::new(&config.fetcher)?;
    info!("Polling {} in {:?} mode", fetcher.url(), config.poller.mode);

    let sink = sink::from_config(&config).await?;
    let mut poller = Poller::from_config(fetcher, sink, &config.poller);

    let result = tokio::select! {
        result = poller.run() => result.map(|summary| {
            info!("ISS recorder completed: {:?}", summary);
        }),
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal");
            Ok(())
        }
    };

    // Sink is released on success, failure and shutdown alike
    poller.close().await;
    result
}

async fn list_positions(config: &AppConfig) -> Result<()> {
    let database = DatabaseSink::connect(&config.database).await?;
    let mut console = ConsoleSink::stdout(config.sink.format);

    let result = async {
        let mut records = database.list_positions();
        while let Some(record) = records.try_next().await? {
            console.emit_record(&record)?;
        }
        Ok::<_, IssRecorderError>(())
    }
    .await;

    database.close().await;
    result
}
