use std::path::Path;

/// Errors produced by the index, catalog and download engines.
#[derive(Debug, thiserror::Error)]
pub enum JukeboxError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{0}")]
    Validation(String),

    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error("{0}")]
    NotFound(String),

    #[error("cancelled")]
    Cancelled,
}

impl JukeboxError {
    pub fn not_found(message: impl Into<String>) -> Self {
        JukeboxError::NotFound(message.into())
    }

    pub fn missing_file(path: &Path) -> Self {
        JukeboxError::NotFound(format!("Index file does not exist: {}", path.display()))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, JukeboxError::Cancelled)
    }
}

impl From<serde_json::Error> for JukeboxError {
    fn from(err: serde_json::Error) -> Self {
        JukeboxError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for JukeboxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            JukeboxError::Network(format!("request timed out: {}", err))
        } else {
            JukeboxError::Network(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, JukeboxError>;
