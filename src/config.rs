use serde_derive::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to read configuration file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Job configuration. Every key is optional; the defaults describe the
/// production setup.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api: ApiConfig,
    pub recovery: RecoveryConfig,
    pub ranking: RankingConfig,
    pub invitations: InvitationsConfig,
    pub feed: FeedConfig,
    pub newcomers: NewcomersConfig,
    pub gainers: GainersConfig,
    pub refresh: RefreshConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Reads the given TOML file, or returns the defaults when no path is given.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Config, Error> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path.as_ref()).map_err(|source| Error::Read {
                    path: path.as_ref().to_path_buf(),
                    source,
                })?;

                Ok(toml::from_str::<Config>(&contents)?)
            }
            None => Ok(Config::default()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    /// Must end with a slash if it carries a path prefix.
    pub base_url: String,
    pub category_id: u64,
    pub member_limit: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: "https://api.ethos.network/".to_string(),
            category_id: 26,
            member_limit: 1000,
            timeout_secs: 30,
            user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RecoveryConfig {
    pub batch_size: usize,
    pub pause_ms: u64,
}

impl RecoveryConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        RecoveryConfig {
            batch_size: 10,
            pause_ms: 200,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RankingConfig {
    pub page_limit: usize,
    /// Maximum number of activity pages read per member.
    pub pages: usize,
    pub pause_ms: u64,
}

impl RankingConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        RankingConfig {
            page_limit: 500,
            pages: 1,
            pause_ms: 200,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct InvitationsConfig {
    pub page_limit: usize,
    pub max_profiles: usize,
    pub pause_ms: u64,
    pub top: usize,
}

impl InvitationsConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for InvitationsConfig {
    fn default() -> Self {
        InvitationsConfig {
            page_limit: 100,
            max_profiles: 1000,
            pause_ms: 200,
            top: 5,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedConfig {
    pub users: usize,
    pub batch_size: usize,
    pub page_limit: usize,
    pub pause_ms: u64,
    pub keep: usize,
}

impl FeedConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            users: 15,
            batch_size: 5,
            page_limit: 50,
            pause_ms: 500,
            keep: 20,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct NewcomersConfig {
    pub candidates: usize,
    pub keep: usize,
}

impl Default for NewcomersConfig {
    fn default() -> Self {
        NewcomersConfig {
            candidates: 15,
            keep: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GainersConfig {
    pub top: usize,
}

impl Default for GainersConfig {
    fn default() -> Self {
        GainersConfig { top: 5 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig { interval_secs: 60 }
    }
}

/// Snapshot file locations.
///
/// Each `*_source` may be a path or an `http(s)://` URL; when unset, a job
/// reads the file written by the upstream job in `dir`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub members_file: String,
    pub ranking_file: String,
    pub invitations_file: String,
    pub activities_file: String,
    pub newcomers_file: String,
    pub gainers_file: String,
    pub members_source: Option<String>,
    pub ranking_source: Option<String>,
    pub activities_source: Option<String>,
}

impl OutputConfig {
    pub fn members_path(&self) -> PathBuf {
        self.dir.join(&self.members_file)
    }

    pub fn ranking_path(&self) -> PathBuf {
        self.dir.join(&self.ranking_file)
    }

    pub fn invitations_path(&self) -> PathBuf {
        self.dir.join(&self.invitations_file)
    }

    pub fn activities_path(&self) -> PathBuf {
        self.dir.join(&self.activities_file)
    }

    pub fn newcomers_path(&self) -> PathBuf {
        self.dir.join(&self.newcomers_file)
    }

    pub fn gainers_path(&self) -> PathBuf {
        self.dir.join(&self.gainers_file)
    }

    pub fn members_source(&self) -> String {
        Self::source_or(&self.members_source, self.members_path())
    }

    pub fn ranking_source(&self) -> String {
        Self::source_or(&self.ranking_source, self.ranking_path())
    }

    pub fn activities_source(&self) -> String {
        Self::source_or(&self.activities_source, self.activities_path())
    }

    fn source_or(source: &Option<String>, path: PathBuf) -> String {
        source
            .clone()
            .unwrap_or_else(|| path.to_string_lossy().into_owned())
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            dir: PathBuf::from("."),
            members_file: "gigachads-data.json".to_string(),
            ranking_file: "gigachads-ranking.json".to_string(),
            invitations_file: "invitations-data.json".to_string(),
            activities_file: "activities-data.json".to_string(),
            newcomers_file: "new-gigachads-data.json".to_string(),
            gainers_file: "rank-changes-data.json".to_string(),
            members_source: None,
            ranking_source: None,
            activities_source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_partial_config() {
        let input = "[api]\ncategoryId = 7\n\n[recovery]\npauseMs = 0\n\n[output]\ndir = \"out\"\nrankingSource = \"https://example.com/ranking.json\"";

        let config = toml::from_str::<Config>(input).unwrap();

        assert_eq!(config.api.category_id, 7);
        assert_eq!(config.api.member_limit, 1000);
        assert_eq!(config.recovery.batch_size, 10);
        assert_eq!(config.recovery.pause(), Duration::from_millis(0));
        assert_eq!(config.output.ranking_path(), PathBuf::from("out/gigachads-ranking.json"));
        assert_eq!(
            config.output.ranking_source(),
            "https://example.com/ranking.json"
        );
        assert_eq!(
            config.output.members_source(),
            PathBuf::from("out/gigachads-data.json")
                .to_string_lossy()
                .into_owned()
        );
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(toml::from_str::<Config>("").unwrap(), Config::default());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let result = Config::load(Some("does-not-exist.toml"));

        assert!(matches!(result, Err(Error::Read { .. })));
    }

    #[test]
    fn no_config_file_means_defaults() {
        let config = Config::load::<&str>(None).unwrap();

        assert_eq!(config.refresh.interval(), Duration::from_secs(60));
        assert_eq!(config.feed.batch_size, 5);
    }
}
