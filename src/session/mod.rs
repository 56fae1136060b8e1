//! Session assembly and lifecycle.

mod core;
mod options;

pub use self::core::Session;
pub use options::{DeprecationLog, SessionOptions, TracingDeprecationLog};
