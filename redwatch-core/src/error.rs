use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}

/// Failures of the password-grant token exchange. Any of these abort
/// the whole poll cycle before sources are fetched.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("API credentials are missing or incomplete")]
    MissingCredentials,

    #[error("token exchange rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("token exchange timed out")]
    Timeout,

    #[error("malformed token response: {details}")]
    MalformedResponse { details: String },
}

/// Per-source fetch failures. Isolated to the failing source; the
/// cycle continues with the remaining sources.
#[derive(Error, Debug, Clone)]
pub enum FeedError {
    #[error("fetch failed for {source_name} with status {status}")]
    RequestFailed { source_name: String, status: u16 },

    #[error("fetch timed out for {source_name}")]
    Timeout { source_name: String },

    #[error("unauthorized fetching {source_name}")]
    Unauthorized { source_name: String },

    #[error("rate limited fetching {source_name}, retry after {retry_after} seconds")]
    RateLimited { source_name: String, retry_after: u64 },

    #[error("server error {status} from {source_name}")]
    ServerError { source_name: String, status: u16 },

    #[error("malformed listing from {source_name}: {details}")]
    MalformedListing { source_name: String, details: String },
}

/// Persistence failures. A failed write aborts the persist phase only
/// and leaves the previously committed state untouched.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to read state: {reason}")]
    Read { reason: String },

    #[error("failed to write state: {reason}")]
    Write { reason: String },

    #[error("state file is corrupt: {details}")]
    Corrupt { details: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
