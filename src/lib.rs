pub mod cli;
pub mod config;
pub mod dedup;
mod error;
pub mod ethos;
pub mod feed;
pub mod gainers;
pub mod invitations;
pub mod members;
pub mod newcomers;
pub mod rank;
pub mod recover;
pub mod refresh;
pub mod snapshot;
pub mod stats;
pub mod util;

pub use error::Error;

pub type Result<T> = std::result::Result<T, Error>;
