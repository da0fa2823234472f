//! Decoding of the `alt=sse` response body into completion units.

use std::{fmt::Display, time::Duration};

use eventsource_stream::Eventsource;
use futures::{Stream, StreamExt};
use gemini_relay_core::{ChunkStream, CompletionChunk, ProviderError};
use tokio::time::timeout;

use crate::types::{ApiError, GenerateContentResponse};

/// Turn a raw SSE byte stream into a stream of completion units.
///
/// The stream ends after the first error; a gap longer than `idle_timeout`
/// between events is reported as [`ProviderError::IdleTimeout`].
pub fn decode_stream<S, B, E>(bytes: S, idle_timeout: Duration) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::stream! {
        let events = bytes.eventsource();
        tokio::pin!(events);

        loop {
            let event = match timeout(idle_timeout, events.next()).await {
                Err(_) => {
                    tracing::warn!("Provider stream idle for {}s", idle_timeout.as_secs());
                    yield Err(ProviderError::IdleTimeout(idle_timeout));
                    return;
                }
                Ok(None) => return,
                Ok(Some(Err(e))) => {
                    yield Err(ProviderError::Request(format!("SSE stream error: {e}")));
                    return;
                }
                Ok(Some(Ok(event))) => event,
            };

            if event.data.trim().is_empty() {
                continue;
            }
            tracing::trace!("Gemini SSE: {:?}", event.data);

            match parse_payload(&event.data) {
                Ok(unit) => yield Ok(unit),
                Err(e) => {
                    tracing::error!("{e}");
                    yield Err(e);
                    return;
                }
            }
        }
    }
    .boxed()
}

/// Parse one SSE `data:` payload.
///
/// # Errors
/// Returns error if the payload is not valid JSON or carries an API error.
pub fn parse_payload(data: &str) -> Result<CompletionChunk, ProviderError> {
    let response: GenerateContentResponse = serde_json::from_str(data)
        .map_err(|e| ProviderError::Malformed(format!("{e}, data: {data}")))?;

    if let Some(error) = response.error {
        return Err(api_error(error.code.unwrap_or_default(), &error));
    }

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        tracing::warn!(block_reason = reason, "Prompt blocked by provider");
    }
    for candidate in &response.candidates {
        if let Some(reason) = candidate.finish_reason.as_deref() {
            if reason != "STOP" {
                tracing::debug!(finish_reason = reason, "Candidate finished early");
            }
        }
    }
    if let Some(usage) = response.usage_metadata {
        tracing::debug!(
            prompt_tokens = usage.prompt_token_count,
            candidate_tokens = usage.candidates_token_count,
            total_tokens = usage.total_token_count,
            "Usage"
        );
    }

    Ok(response.into())
}

/// Map an API error object to a provider error.
#[must_use]
pub fn api_error(status: u16, error: &ApiError) -> ProviderError {
    let message = match error.status.as_deref() {
        Some(kind) if !error.message.is_empty() => format!("{kind}: {}", error.message),
        Some(kind) => kind.to_string(),
        None => error.message.clone(),
    };
    ProviderError::Api { status, message }
}
