use clap::Parser;
use futures::FutureExt;
use gigachads::rank::{self, RankingSnapshot};
use gigachads::refresh::{RefreshContext, Task};
use gigachads::snapshot::Source;
use gigachads::{cli, config::Config};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Logger initialization error")]
    Log(#[from] log::SetLoggerError),
    #[error("Configuration error: {0}")]
    Config(#[from] gigachads::config::Error),
    #[error("Signal handling error: {0}")]
    Signal(#[source] std::io::Error),
}

/// Loads the ranking and prints its top rows as CSV.
async fn print_ranking(source: &Source, top: usize) -> bool {
    match source.load::<RankingSnapshot>().await {
        Ok(snapshot) => {
            let rows = &snapshot.ranking[..top.min(snapshot.ranking.len())];
            log::info!(
                "Ranking generated at {} ({} members)",
                snapshot.metadata.generated_at,
                snapshot.ranking.len()
            );

            match rank::write_csv(rows, std::io::stdout()) {
                Ok(()) => true,
                Err(error) => {
                    log::error!("Unable to print ranking: {}", error);
                    false
                }
            }
        }
        Err(error) => {
            log::error!("Unable to load ranking from {}: {}", source, error);
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts: Opts = Opts::parse();
    cli::init_logging(opts.verbose)?;

    let config = Config::load(opts.config.as_ref())?;
    let source = Source::parse(&opts.ranking.unwrap_or_else(|| config.output.ranking_source()));
    let interval = opts
        .interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.refresh.interval());
    let top = opts.top;

    let task: Task = Arc::new(move || {
        let source = source.clone();
        async move { print_ranking(&source, top).await }.boxed()
    });

    let mut context = RefreshContext::new(interval);
    context.start(interval, task);
    context.refresh_now().await;

    tokio::signal::ctrl_c().await.map_err(Error::Signal)?;
    context.stop();

    if let Some(last_update) = context.last_update() {
        log::info!("Last successful refresh at {}", last_update);
    }

    log::logger().flush();

    Ok(())
}

#[derive(Parser)]
#[clap(version, author)]
struct Opts {
    /// Level of verbosity
    #[clap(short, long, parse(from_occurrences))]
    verbose: i32,
    /// TOML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,
    /// Ranking snapshot path or URL
    #[clap(short, long)]
    ranking: Option<String>,
    /// Seconds between refreshes
    #[clap(short, long)]
    interval: Option<u64>,
    /// Number of rows printed
    #[clap(short, long, default_value = "20")]
    top: usize,
}
