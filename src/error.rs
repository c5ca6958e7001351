use std::fmt;

/// Result type for deck analysis operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at the engine boundary.
///
/// Per-card lookup failures and tag/combo fetch failures never show up here:
/// they are absorbed in-band by the resolver and the caches.
#[derive(Debug)]
pub enum Error {
    /// The `deck` field was present but was not a list of strings
    InvalidDeck,

    /// The request body could not be parsed as JSON
    MalformedRequest(serde_json::Error),

    /// The upstream HTTP client could not be constructed
    Client(anyhow::Error),

    /// The resolution worker pool could not be constructed
    WorkerPool(rayon::ThreadPoolBuildError),

    /// A blocking analysis task died before producing a result
    Worker(String),
}

impl Error {
    /// Whether the caller, rather than the service, is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidDeck)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidDeck => write!(f, "Deck must be a list of strings"),
            Error::MalformedRequest(err) => write!(f, "Malformed request body: {}", err),
            Error::Client(err) => write!(f, "HTTP client error: {}", err),
            Error::WorkerPool(err) => write!(f, "Worker pool error: {}", err),
            Error::Worker(msg) => write!(f, "Analysis worker failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MalformedRequest(err) => Some(err),
            Error::Client(err) => Some(&**err),
            Error::WorkerPool(err) => Some(err),
            Error::InvalidDeck | Error::Worker(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedRequest(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        Error::WorkerPool(err)
    }
}
