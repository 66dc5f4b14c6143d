use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or unusable browser binary, unreadable config file.
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CDP transport failure or a browser process that died mid-call.
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// Malformed tool arguments.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Malformed JSON-RPC traffic.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error is the caller's fault (bad arguments or framing)
    /// rather than a failure while scraping.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Protocol(_) | Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
