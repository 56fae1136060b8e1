//! Capability and options model.
//!
//! The negotiation pipeline runs typed browser configuration through three
//! value objects:
//!
//! | Type | Role |
//! |------|------|
//! | [`BrowserOptions`] | typed, pre-wire configuration for one browser family |
//! | [`Capabilities`] | wire-serializable key/value set with overlay-wins merge |
//! | [`Proxy`] | validated structured proxy sub-object |
//!
//! Precedence across configuration sources, highest first: explicit
//! overrides passed to session creation, values set on the options object,
//! library defaults.

mod core;
mod options;
mod proxy;

pub use self::core::{Capabilities, VALID_W3C, camel_case};
pub use options::{BrowserFamily, BrowserOptions, LogLevel};
pub use proxy::{Proxy, ProxyType};
