use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoryError {
    /// The local database could not be opened or migrated.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A read or write transaction against the local database aborted.
    #[error("Transaction failed: {0}")]
    TransactionFailed(#[from] rusqlite::Error),

    /// The request never produced a response (offline, timeout, DNS, TLS).
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but reported failure or had an unusable body.
    #[error("Server error: {0}")]
    Server(String),

    /// Neither the remote API nor the local cache could produce data.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Story not found: {0}")]
    NotFound(String),

    #[error("Invalid story record: {0}")]
    InvalidRecord(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for StoryError {
    fn from(err: reqwest::Error) -> Self {
        StoryError::Transport(err.to_string())
    }
}

impl StoryError {
    /// Storage-layer failures, which the read path treats like a dropped connection.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            StoryError::StorageUnavailable(_) | StoryError::TransactionFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoryError>;
