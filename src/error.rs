use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Ethos API error: {0}")]
    Api(#[from] crate::ethos::Error),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] crate::snapshot::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::Error),
    #[error("No data available: {0}")]
    NoData(&'static str),
}
