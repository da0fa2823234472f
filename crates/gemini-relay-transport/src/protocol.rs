//! Wire protocol for client-server communication.
//!
//! Inbound frames are the raw user message. Outbound frames are JSON objects:
//! `{"id", "text"}` for envelopes and `{"id", "error"}` when an exchange fails.

use std::{fmt, str::FromStr};

use gemini_relay_core::{Envelope, ExchangeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerFrame {
    /// Cumulative response text for an exchange.
    Envelope(Envelope),
    /// The exchange failed; no further frames carry this id.
    Error { id: ExchangeId, error: String },
}

impl ServerFrame {
    /// Encode as a JSON text frame.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<Envelope> for ServerFrame {
    fn from(envelope: Envelope) -> Self {
        Self::Envelope(envelope)
    }
}

/// What to do when the provider fails during an exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Send an error frame and keep the session open.
    #[default]
    Report,
    /// Close the connection.
    Disconnect,
}

/// Unknown error policy name.
#[derive(Debug, Error)]
#[error("Unknown error policy '{0}', expected 'report' or 'disconnect'")]
pub struct ParsePolicyError(String);

impl FromStr for ErrorPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "report" => Ok(Self::Report),
            "disconnect" => Ok(Self::Disconnect),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

impl fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report => f.write_str("report"),
            Self::Disconnect => f.write_str("disconnect"),
        }
    }
}
