//! Gemini provider for the streaming relay.
//!
//! Provides:
//! - `GeminiProvider` - `CompletionProvider` over `streamGenerateContent`
//! - Wire types for requests, streamed responses and API errors
//! - SSE body decoding with an idle timeout

pub mod client;
pub mod sse;
pub mod types;

pub use client::{DEFAULT_BASE_URL, DEFAULT_MODEL, GeminiConfig, GeminiProvider};
