use thiserror::Error;

/// Errors from repository operations (used by trait definitions in
/// flowtrace-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from manifest loading.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("manifest io error: {0}")]
    Io(String),

    #[error("manifest parse error: {0}")]
    Parse(String),
}

/// Errors from calls to the remote workflow engine.
///
/// Every variant is transient by policy: remote failures map to a
/// retryable `REMOTE_CALL_FAILED` envelope.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("remote engine returned HTTP {0}")]
    Status(u16),

    #[error("malformed remote response: {0}")]
    Malformed(String),
}
