use chrono::Utc;
use clap::Parser;
use gigachads::invitations::{self, Invitations};
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
    #[error("Invitations job failed: {0}")]
    Job(#[from] gigachads::Error),
}

async fn run(config: &Config, members: &Source) -> gigachads::Result<Invitations> {
    let client = Client::new(&config.api)?;

    invitations::collect(&client, members, &config.invitations, Utc::now()).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts: Opts = Opts::parse();
    cli::init_logging(opts.verbose)?;

    let config = Config::load(opts.config.as_ref())?;
    let members = Source::parse(&opts.members.unwrap_or_else(|| config.output.members_source()));
    let output = opts.output.unwrap_or_else(|| config.output.invitations_path());

    let result = run(&config, &members).await;
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
    /// Member snapshot path or URL
    #[clap(short, long)]
    members: Option<String>,
}
