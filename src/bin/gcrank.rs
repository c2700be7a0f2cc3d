use chrono::Utc;
use clap::Parser;
use gigachads::members::MembersSnapshot;
use gigachads::rank::{self, RankingSnapshot};
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
    #[error("Ranking failed: {0}")]
    Job(#[from] gigachads::Error),
    #[error("CSV output error: {0}")]
    Csv(#[from] csv::Error),
}

async fn run(config: &Config, members: &Source) -> gigachads::Result<RankingSnapshot> {
    let snapshot = members.load::<MembersSnapshot>().await?;
    if snapshot.users.is_empty() {
        return Err(gigachads::Error::NoData("member snapshot has no users"));
    }
    log::info!("Loaded {} members from {}", snapshot.users.len(), members);

    let client = Client::new(&config.api)?;
    let scored = rank::score_members(&client, &snapshot.users, &config.ranking).await;
    let ranking = RankingSnapshot::new(snapshot.users.len(), rank::rank(scored), Utc::now());
    ranking.log_summary();

    Ok(ranking)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts: Opts = Opts::parse();
    cli::init_logging(opts.verbose)?;

    let config = Config::load(opts.config.as_ref())?;
    let members = Source::parse(&opts.members.unwrap_or_else(|| config.output.members_source()));
    let output = opts.output.unwrap_or_else(|| config.output.ranking_path());

    let result = run(&config, &members).await;
    let ranking = result
        .as_ref()
        .ok()
        .filter(|_| opts.csv)
        .map(|snapshot| snapshot.ranking.clone());

    cli::publish(&output, result, json!([]))?;

    if let Some(ranking) = ranking {
        rank::write_csv(&ranking, std::io::stdout())?;
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
    /// Snapshot file to write
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Member snapshot path or URL
    #[clap(short, long)]
    members: Option<String>,
    /// Also print the ranking as CSV
    #[clap(long)]
    csv: bool,
}
