use std::time::Duration;

use thiserror::Error;

pub mod assistant;
pub mod catalog;
pub mod config;
pub mod details;
pub mod pipeline;
pub mod rows;
pub mod store;
pub mod upload;

// Re-export for convenience
pub use assistant::{AssistantClient, ChatMessage, ChatTranscript, Sender, clean_text};
pub use catalog::{
    Catalog, CatalogClient, CatalogRecord, CatalogSource, Chunk, Parameter, format_catalog,
};
pub use config::{AssistantConfig, Config, PipelineTimings, Settings, StorageConfig};
pub use details::{DtoDetails, ParamField, ParamKind};
pub use pipeline::{
    Notification, NotificationLevel, PersistenceCheck, PipelineSimulator, PipelineStatus, Stage,
    StageStatus, TimerSet,
};
pub use rows::{DisplayRow, DtoResult, LatestIngested, RowStats, map_rows};
pub use store::{CatalogState, CatalogStore};
pub use upload::{BlobStorageClient, ObjectStorage, UploadFile, UploadObserver, UploadTrigger};

#[derive(Error, Debug)]
pub enum CoreError {
    /// A required setting is missing or empty.
    #[error("{0} is not configured")]
    Configuration(String),
    #[error("config file error: {0}")]
    ConfigFile(String),
    #[error("{}", describe_failure("failed to fetch", .status, .message))]
    RemoteFetch { status: Option<u16>, message: String },
    #[error("{}", describe_failure("file upload failed", .status, .message))]
    Upload { status: Option<u16>, message: String },
    #[error("invalid file: {0}")]
    InvalidFile(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Whether the failure is a missing-setting error rather than a transient one.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::Configuration(_) | CoreError::ConfigFile(_))
    }

    pub(crate) fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        CoreError::RemoteFetch {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn upload(status: Option<u16>, message: impl Into<String>) -> Self {
        CoreError::Upload {
            status,
            message: message.into(),
        }
    }
}

/// Shared HTTP client for the catalog, storage and assistant clients.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, CoreError> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("dtodash/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()?;
    Ok(client)
}

fn describe_failure(what: &str, status: &Option<u16>, message: &str) -> String {
    match *status {
        Some(code) if message.is_empty() => format!("{what}: HTTP {code}"),
        Some(code) => format!("{what}: HTTP {code} - {message}"),
        None => format!("{what}: {message}"),
    }
}
