use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDashError {
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Unsupported import format: {0}")]
    UnsupportedFormat(String),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Session expired")]
    SessionExpired,

    #[error("Active subscription required")]
    SubscriptionRequired,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// A fetch awaited through the in-flight coalescing map failed; every
    /// waiter observes the same underlying error.
    #[error("{0}")]
    Fetch(Arc<MarketDashError>),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "client")]
    #[error("HTTP transport error: {0}")]
    TransportError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, MarketDashError>;
