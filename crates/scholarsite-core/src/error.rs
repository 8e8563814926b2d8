use thiserror::Error;

/// All errors that can occur in scholarsite-core.
#[derive(Debug, Error)]
pub enum SiteError {
    #[error("{0}")]
    Config(String),

    #[error("{0} not found")]
    MissingInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SiteError>;
