use thiserror::Error;

use netflow_core::HttpError;

/// Errors raised by report surfaces and the sink.
#[derive(Debug, Error)]
pub enum ReportError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// I/O error (credential files, warehouse directory).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure talking to a remote surface.
    #[error("http transport error: {0}")]
    Http(#[from] HttpError),

    /// Credential loading, signing, or token exchange failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Remote surface answered with a non-success status.
    #[error("upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The surface refused the operation (unknown sheet, bad range, ...).
    #[error("operation rejected: {0}")]
    Rejected(String),

    /// A blocking warehouse task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
