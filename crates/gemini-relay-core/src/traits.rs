//! Core traits for completion providers.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::CompletionChunk;

/// Stream of units produced by a provider for one request.
pub type ChunkStream = BoxStream<'static, Result<CompletionChunk, ProviderError>>;

/// Provider error.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Request(String),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Stream idle for {}s", .0.as_secs())]
    IdleTimeout(Duration),
}

/// Trait for streaming text-completion services.
///
/// A provider is shared read-only across every connection, so implementations
/// hold only immutable state (HTTP client, credential, model name).
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a streaming completion for a fully rendered prompt.
    ///
    /// Dropping the returned stream must abandon the underlying request.
    async fn stream(&self, prompt: &str) -> Result<ChunkStream, ProviderError>;
}
