use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadConfig,
    NotFound,
    Conflict,
    RateLimited,
    RetryableRemote,
    PermanentRemote,
    EmbeddingFailure,
    LlmUnavailable,
    PersistenceFailure,
    Io,
    Parse,
    Internal,
}

impl ErrorKind {
    /// Whether the §7 retry policy applies to this kind at all.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::RetryableRemote | ErrorKind::PersistenceFailure)
    }
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn not_found(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::NotFound, context)
    }

    pub fn bad_config(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::BadConfig, context)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() {
            ErrorKind::RetryableRemote
        } else {
            ErrorKind::PermanentRemote
        };
        Error::new(kind, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
