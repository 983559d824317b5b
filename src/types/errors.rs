use std::fmt;

// === StoreError ===

/// Errors related to the durable record store.
#[derive(Debug)]
pub enum StoreError {
    /// Reading, writing or renaming a store file failed.
    Io(String),
    /// The record collection could not be serialized.
    Serialization(String),
    /// The exclusive lock could not be acquired.
    Lock(String),
    /// Record with the given ID was not found.
    NotFound(u64),
    /// The submitted record fields are invalid.
    InvalidInput(String),
}

impl StoreError {
    /// Message shown at the application boundary.
    ///
    /// Storage failures collapse into a generic message; only a missing
    /// record or rejected input is reported as-is.
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotFound(_) => "not found".to_string(),
            StoreError::InvalidInput(msg) => format!("invalid input: {}", msg),
            StoreError::Io(_) | StoreError::Serialization(_) | StoreError::Lock(_) => {
                "could not save".to_string()
            }
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "Store I/O error: {}", msg),
            StoreError::Serialization(msg) => {
                write!(f, "Store serialization error: {}", msg)
            }
            StoreError::Lock(msg) => write!(f, "Store lock error: {}", msg),
            StoreError::NotFound(id) => write!(f, "Record not found: {}", id),
            StoreError::InvalidInput(msg) => write!(f, "Invalid record input: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

// === MirrorError ===

/// Errors related to the full-text search mirror.
#[derive(Debug)]
pub enum MirrorError {
    /// The index database rejected a statement.
    Database(String),
    /// The index could not be reached or opened.
    Unavailable(String),
    /// The search criteria could not be turned into a query.
    InvalidQuery(String),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MirrorError::Database(msg) => write!(f, "Search mirror database error: {}", msg),
            MirrorError::Unavailable(msg) => write!(f, "Search mirror unavailable: {}", msg),
            MirrorError::InvalidQuery(msg) => write!(f, "Invalid search query: {}", msg),
        }
    }
}

impl std::error::Error for MirrorError {}

// === FetchError ===

/// Errors related to fetching page metadata.
#[derive(Debug)]
pub enum FetchError {
    /// The page could not be reached.
    Network(String),
    /// The site refused the request (HTTP 403).
    Blocked(String),
    /// The response body could not be interpreted.
    Parse(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Network(msg) => write!(f, "Fetch network error: {}", msg),
            FetchError::Blocked(url) => write!(f, "Fetch blocked: {}", url),
            FetchError::Parse(msg) => write!(f, "Fetch parse error: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

// === ConfigError ===

/// Errors related to loading the store configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading the config file.
    Io(String),
    /// The config file is not valid JSON for `StoreConfig`.
    Parse(String),
    /// A config value is out of range.
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
