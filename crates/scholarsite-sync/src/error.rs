use scholarsite_core::SiteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0} failed: {1}")]
    ApiError(String, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("{0} response missing {1}")]
    MissingField(String, String),

    #[error(transparent)]
    Site(#[from] SiteError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
