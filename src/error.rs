//! Error types for the indexing daemon

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown index: {0}")]
    UnknownIndex(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The request is incomplete; the caller should retry at the given location.
    #[error("Redirect to {0}")]
    Redirect(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Watch error: {0}")]
    Watch(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error was caused by the request itself rather than by the daemon.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidSelector(_)
                | Error::InvalidRequest(_)
                | Error::UnknownIndex(_)
                | Error::NotFound(_)
                | Error::Redirect(_)
        )
    }
}

impl From<mailparse::MailParseError> for Error {
    fn from(err: mailparse::MailParseError) -> Self {
        Error::Parse(err.to_string())
    }
}

impl From<notify::Error> for Error {
    fn from(err: notify::Error) -> Self {
        Error::Watch(err.to_string())
    }
}
