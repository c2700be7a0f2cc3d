use chrono::Local;
use clap::Parser;
use gigachads::gainers::{self, FeedInput, RankChanges};
use gigachads::snapshot::Source;
use gigachads::{cli, config::Config};
use serde_json::json;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Logger initialization error")]
    Log(#[from] log::SetLoggerError),
    #[error("Configuration error: {0}")]
    Config(#[from] gigachads::config::Error),
    #[error("Rank changes job failed: {0}")]
    Job(#[from] gigachads::Error),
}

async fn run(config: &Config, activities: &Source) -> gigachads::Result<RankChanges> {
    let input = activities.load::<FeedInput>().await?;
    log::info!(
        "Loaded {} vouches and {} reviews from {}",
        input.data.vouches.len(),
        input.data.reviews.len(),
        activities
    );

    let changes = gainers::compute(
        &input.data.vouches,
        &input.data.reviews,
        Local::now(),
        config.gainers.top,
    );

    for gainer in &changes.data {
        log::info!("{}: +{}pts", gainer.display_name, gainer.points);
    }

    Ok(changes)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts: Opts = Opts::parse();
    cli::init_logging(opts.verbose)?;

    let config = Config::load(opts.config.as_ref())?;
    let activities = Source::parse(
        &opts
            .activities
            .unwrap_or_else(|| config.output.activities_source()),
    );
    let output = opts.output.unwrap_or_else(|| config.output.gainers_path());

    let result = run(&config, &activities).await;
    cli::publish(&output, result, json!([]))?;

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
    /// Snapshot file to write
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Activity feed snapshot path or URL
    #[clap(short, long)]
    activities: Option<String>,
}
