//! Wire protocol: command tables, envelopes, and the session bridge.
//!
//! | Piece | Role |
//! |-------|------|
//! | [`commands`] | static (verb, URL template) tables per generation |
//! | [`envelope`] | response decoding and typed error mapping |
//! | [`bridge`] | the session state machine and typed command surface |

mod bridge;
mod commands;
mod envelope;

pub use bridge::{Bridge, DriverCommands, SessionState, Timeouts};
pub use commands::{
    CommandSpec, LEGACY_COMMANDS, ProtocolKind, Verb, W3C_COMMANDS, WireCommand, substitute,
};
pub use envelope::{LEGACY_ELEMENT_KEY, W3C_ELEMENT_KEY, WireResponse, element_id, parse};
