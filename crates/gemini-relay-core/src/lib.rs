//! Core abstractions for streaming completion relays.
//!
//! This crate provides the fundamental building blocks:
//! - `Relay` - Turns one message into a lazy stream of growing envelopes
//! - `Envelope` - Exchange id plus cumulative response text
//! - `PromptTemplate` - Fixed instructional prompt wrapping the user message
//! - `CompletionProvider` trait and its provider-neutral chunk model

pub mod chunk;
pub mod envelope;
pub mod prompt;
pub mod relay;
pub mod traits;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chunk::{Candidate, CompletionChunk, Part};
pub use envelope::{Accumulator, Envelope, ExchangeId};
pub use prompt::{PromptTemplate, TemplateError};
pub use relay::{EnvelopeStream, Exchange, Relay};
pub use traits::{ChunkStream, CompletionProvider, ProviderError};
