use chrono::Utc;
use clap::Parser;
use gigachads::feed::{self, Feed};
use gigachads::rank::RankingSnapshot;
use gigachads::snapshot::Source;
use gigachads::{cli, config::Config, ethos::Client};
use serde_json::json;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Logger initialization error")]
    Log(#[from] log::SetLoggerError),
    #[error("Configuration error: {0}")]
    Config(#[from] gigachads::config::Error),
    #[error("Activity feed job failed: {0}")]
    Job(#[from] gigachads::Error),
}

async fn run(config: &Config, ranking: &Source) -> gigachads::Result<Feed> {
    let snapshot = ranking.load::<RankingSnapshot>().await?;
    log::info!("Loaded {} ranked members from {}", snapshot.ranking.len(), ranking);

    let client = Client::new(&config.api)?;

    feed::collect(&client, &snapshot, &config.feed, Utc::now()).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts: Opts = Opts::parse();
    cli::init_logging(opts.verbose)?;

    let mut config = Config::load(opts.config.as_ref())?;
    if let Some(users) = opts.users {
        config.feed.users = users;
    }
    let ranking = Source::parse(&opts.ranking.unwrap_or_else(|| config.output.ranking_source()));
    let output = opts.output.unwrap_or_else(|| config.output.activities_path());

    let result = run(&config, &ranking).await;
    cli::publish(&output, result, json!({ "vouches": [], "reviews": [] }))?;

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
    /// Ranking snapshot path or URL
    #[clap(short, long)]
    ranking: Option<String>,
    /// Number of top ranked members whose history is read
    #[clap(short, long)]
    users: Option<usize>,
}
