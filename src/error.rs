use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Load error after {rows_committed} committed rows: {reason}")]
    Load { reason: String, rows_committed: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Incomplete join: {0}")]
    IncompleteJoin(String),

    #[error("Job cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IngestError {
    /// Wrap a transport-level failure. Connect/timeout failures are connection
    /// problems; anything else that made it to the store is a query problem.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            IngestError::Connection(err.to_string())
        } else {
            IngestError::Query(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
