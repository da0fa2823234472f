//! Exchange identifiers, envelopes and the response accumulator.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(Uuid);

impl ExchangeId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ExchangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Snapshot of an exchange's response text at emission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Exchange identifier.
    pub id: ExchangeId,
    /// Cumulative response text so far.
    pub text: String,
}

/// Append-only response buffer for a single exchange.
///
/// Every pushed fragment yields an envelope whose text extends the previous one.
#[derive(Debug)]
pub struct Accumulator {
    id: ExchangeId,
    text: String,
    fragments: usize,
}

impl Accumulator {
    /// Create an empty accumulator for an exchange.
    #[must_use]
    pub const fn new(id: ExchangeId) -> Self {
        Self {
            id,
            text: String::new(),
            fragments: 0,
        }
    }

    /// Append a fragment and snapshot the result.
    pub fn push(&mut self, fragment: &str) -> Envelope {
        self.text.push_str(fragment);
        self.fragments += 1;
        Envelope {
            id: self.id,
            text: self.text.clone(),
        }
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of fragments pushed so far.
    #[must_use]
    pub const fn fragments(&self) -> usize {
        self.fragments
    }
}
