//! Transport layer for the streaming relay.
//!
//! Provides:
//! - Wire protocol (JSON envelopes and error frames)
//! - WebSocket transport (feature: websocket)

pub mod protocol;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use protocol::{ErrorPolicy, ServerFrame};

#[cfg(feature = "websocket")]
pub use websocket::{MAX_PENDING, RelayState, SessionError, create_router};
