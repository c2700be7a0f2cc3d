use chrono::Utc;
use clap::Parser;
use gigachads::{cli, config::Config, ethos::Client, members};
use serde_json::json;
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Logger initialization error")]
    Log(#[from] log::SetLoggerError),
    #[error("Configuration error: {0}")]
    Config(#[from] gigachads::config::Error),
    #[error("Member fetch failed: {0}")]
    Job(#[from] gigachads::Error),
}

async fn run(config: &Config) -> gigachads::Result<members::MembersSnapshot> {
    let client = Client::new(&config.api)?;
    let api_url = client
        .category_users_url(config.api.category_id, config.api.member_limit)?
        .to_string();

    members::collect(&client, config, api_url, Utc::now()).await
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let opts: Opts = Opts::parse();
    cli::init_logging(opts.verbose)?;

    let mut config = Config::load(opts.config.as_ref())?;
    if let Some(category_id) = opts.category {
        config.api.category_id = category_id;
    }
    let output = opts.output.unwrap_or_else(|| config.output.members_path());

    let result = run(&config).await;
    cli::publish(
        &output,
        result,
        json!({ "metadata": {}, "statistics": {}, "users": [] }),
    )?;

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
    /// Category whose members are fetched
    #[clap(long)]
    category: Option<u64>,
}
