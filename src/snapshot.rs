//! Reading and writing the JSON snapshot files shared with the table renderer.

use crate::util::format::iso_timestamp;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_derive::Serialize as DeriveSerialize;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Snapshot not found: {0:?}")]
    Missing(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Unexpected status {status} loading {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Where a previously written snapshot is read from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Source {
    Path(PathBuf),
    Url(Url),
}

impl Source {
    pub fn parse(input: &str) -> Source {
        match Url::parse(input) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Source::Url(url),
            _ => Source::Path(PathBuf::from(input)),
        }
    }

    pub async fn load<T: DeserializeOwned>(&self) -> Result<T> {
        match self {
            Source::Path(path) => read(path),
            Source::Url(url) => {
                let response = reqwest::get(url.clone()).await?;

                if response.status().is_success() {
                    Ok(response.json::<T>().await?)
                } else {
                    Err(Error::UnexpectedStatus {
                        status: response.status(),
                        url: url.to_string(),
                    })
                }
            }
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter) -> std::result::Result<(), std::fmt::Error> {
        match self {
            Source::Path(path) => write!(f, "{}", path.display()),
            Source::Url(url) => write!(f, "{}", url),
        }
    }
}

pub fn read<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(Error::Missing(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path)?;

    Ok(serde_json::from_str(&contents)?)
}

/// Overwrites `path` with the pretty-printed snapshot and returns its size.
pub fn write<T: Serialize, P: AsRef<Path>>(path: P, snapshot: &T) -> Result<usize> {
    let contents = serde_json::to_string_pretty(snapshot)?;
    fs::write(path.as_ref(), &contents)?;

    log::info!(
        "Saved {} ({:.2} KB)",
        path.as_ref().display(),
        contents.len() as f64 / 1024.0
    );

    Ok(contents.len())
}

/// Envelope written in place of a snapshot when a job fails, so consumers can
/// tell the data is stale.
#[derive(Clone, Debug, DeriveSerialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub success: bool,
    pub error: String,
    pub generated_at: String,
    pub data: Value,
}

impl Failure {
    pub fn new<E: Display>(error: &E, empty: Value) -> Failure {
        Failure {
            success: false,
            error: error.to_string(),
            generated_at: iso_timestamp(Utc::now()),
            data: empty,
        }
    }
}

pub fn write_failure<E: Display, P: AsRef<Path>>(path: P, error: &E, empty: Value) -> Result<()> {
    write(path, &Failure::new(error, empty)).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_sources() {
        assert_eq!(
            Source::parse("gigachads-data.json"),
            Source::Path(PathBuf::from("gigachads-data.json"))
        );
        assert!(matches!(
            Source::parse("https://raw.githubusercontent.com/x/y/main/a.json"),
            Source::Url(_)
        ));
        assert_eq!(
            Source::parse("C:\\data\\a.json"),
            Source::Path(PathBuf::from("C:\\data\\a.json"))
        );
    }

    #[test]
    fn write_then_read_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");

        write(&path, &json!({ "users": [1, 2] })).unwrap();
        let size = write(&path, &json!({ "users": [3] })).unwrap();
        let value: Value = read(&path).unwrap();

        assert_eq!(value, json!({ "users": [3] }));
        assert_eq!(size, fs::read_to_string(&path).unwrap().len());
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = read::<Value, _>(dir.path().join("absent.json"));

        assert!(matches!(result, Err(Error::Missing(_))));
    }

    #[test]
    fn failure_snapshot_marks_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activities-data.json");

        write_failure(&path, &"boom", json!({ "vouches": [], "reviews": [] })).unwrap();
        let value: Value = read(&path).unwrap();

        assert_eq!(value["success"], json!(false));
        assert_eq!(value["error"], json!("boom"));
        assert_eq!(value["data"]["vouches"], json!([]));
        assert!(value["generatedAt"].is_string());
    }

    #[tokio::test]
    async fn path_source_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.json");
        write(&path, &json!({ "ok": true })).unwrap();

        let value: Value = Source::Path(path).load().await.unwrap();

        assert_eq!(value, json!({ "ok": true }));
    }
}
