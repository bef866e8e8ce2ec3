use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::connections::ConnectionId;
use crate::surface::{BufferHandle, Generation};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Csv,
    Json,
}

impl SaveFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported save format `{0}`")]
pub struct UnknownSaveFormat(String);

impl FromStr for SaveFormat {
    type Err = UnknownSaveFormat;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(UnknownSaveFormat(raw.to_string())),
        }
    }
}

/// Output pushed by a backend for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultDelivery {
    pub buffer: BufferHandle,
    pub generation: Generation,
    pub lines: Vec<String>,
}

/// Channel end handed to the backend so it can stream output into the
/// results buffer after the originating call has returned.
#[derive(Debug, Clone)]
pub struct ResultSink {
    buffer: BufferHandle,
    sender: UnboundedSender<ResultDelivery>,
}

impl ResultSink {
    #[must_use]
    pub fn new(buffer: BufferHandle, sender: UnboundedSender<ResultDelivery>) -> Self {
        Self { buffer, sender }
    }

    #[must_use]
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    /// Returns `false` once the receiving session is gone.
    pub fn deliver(&self, generation: Generation, lines: Vec<String>) -> bool {
        self.sender
            .send(ResultDelivery {
                buffer: self.buffer,
                generation,
                lines,
            })
            .is_ok()
    }
}

/// The external engine that executes queries, computes pages and builds
/// layouts. Every connection-scoped call carries an id the session already
/// resolved against its registry.
#[async_trait]
pub trait ExecutionBackend {
    async fn register_connection(
        &self,
        id: &ConnectionId,
        url: &str,
        kind: &str,
    ) -> Result<(), BackendError>;

    async fn execute(
        &self,
        id: &ConnectionId,
        query: &str,
        generation: Generation,
    ) -> Result<(), BackendError>;

    /// Returns the page index actually shown, which may differ from
    /// `requested` at result-set boundaries.
    async fn page(
        &self,
        id: &ConnectionId,
        requested: i64,
        generation: Generation,
    ) -> Result<i64, BackendError>;

    async fn history(
        &self,
        id: &ConnectionId,
        history_id: &str,
        generation: Generation,
    ) -> Result<(), BackendError>;

    /// Returns the layout tree serialized as JSON.
    async fn layout(&self, id: &ConnectionId) -> Result<String, BackendError>;

    async fn save(
        &self,
        id: &ConnectionId,
        format: SaveFormat,
        destination: &Path,
    ) -> Result<(), BackendError>;

    async fn set_results_sink(&self, sink: ResultSink) -> Result<(), BackendError>;

    async fn close_results(&self) -> Result<(), BackendError>;
}
