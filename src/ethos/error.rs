use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("Unexpected status {status} from {url}")]
    UnexpectedStatus { status: StatusCode, url: String },
    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: &'static str },
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
