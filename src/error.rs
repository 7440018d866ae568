use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status {0}")]
    Status(u16),

    #[error("response body is empty")]
    EmptyBody,

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid summary for {path}: {reason}")]
    InvalidSummary { path: String, reason: String },

    #[error("fetch worker failed: {0}")]
    Worker(String),

    #[error("invalid chart dataset: {0}")]
    InvalidChart(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for every failure that comes out of a Data Source call.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Status(_)
                | Error::EmptyBody
                | Error::Decode(_)
                | Error::InvalidSummary { .. }
                | Error::Worker(_)
        )
    }
}
