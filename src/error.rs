//! Error types for the WebDriver bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webdriver_bridge::{Result, Error};
//!
//! async fn example(session: &mut Session) -> Result<()> {
//!     let element = session.find_element(Locator::Css, "#submit").await?;
//!     session.click_element(&element).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Raised |
//! |----------|----------|--------|
//! | Configuration | [`Error::Config`], [`Error::UnsupportedCapability`], [`Error::InvalidArgument`], [`Error::InvalidProxy`] | synchronously, before any network or process activity |
//! | Launch | [`Error::DriverNotFound`], [`Error::ProcessLaunchFailed`], [`Error::PortUnavailable`], [`Error::ServiceLaunchTimeout`] | after the bounded readiness poll |
//! | Protocol | [`Error::NoSuchElement`], [`Error::StaleElementReference`], [`Error::UnhandledAlert`], ... | mapped one-to-one from wire error codes |
//! | Transport | [`Error::Http`], [`Error::Io`], [`Error::Json`] | surfaced as-is, except during quit |
//! | Wait | [`Error::WaitTimeout`] | by the poll-wait helper, distinct from protocol timeouts |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Protocol variants correspond one-to-one to standard wire error codes so
/// callers distinguish them by kind, never by string matching. The server's
/// message is preserved in each variant.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session or service configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Capability key not allowed by the W3C ruleset.
    ///
    /// Legacy capabilities accept arbitrary keys; W3C capabilities restrict
    /// keys to the standard set plus vendor-prefixed extensions.
    #[error("Unsupported W3C capability: {key}")]
    UnsupportedCapability {
        /// The rejected capability key.
        key: String,
    },

    /// Unrecognized or malformed caller argument.
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid argument.
        message: String,
    },

    /// Proxy value does not validate to a known shape.
    ///
    /// Raised at construction, not at serialization time.
    #[error("Invalid proxy: {message}")]
    InvalidProxy {
        /// Description of the invalid proxy shape.
        message: String,
    },

    // ========================================================================
    // Launch Errors
    // ========================================================================
    /// Driver executable not found.
    #[error("Driver executable not found at: {path}")]
    DriverNotFound {
        /// Path where the driver was expected.
        path: PathBuf,
    },

    /// Failed to spawn the driver process.
    #[error("Failed to launch driver process: {message}")]
    ProcessLaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    /// Requested port could not be bound.
    #[error("Port {port} is unavailable")]
    PortUnavailable {
        /// The port that could not be bound.
        port: u16,
    },

    /// Driver process did not become reachable within the launch timeout.
    ///
    /// Carries whatever the process wrote to stdout/stderr for diagnosis.
    #[error("Driver was not reachable after {timeout_ms}ms; process output:\n{output}")]
    ServiceLaunchTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
        /// Captured process output.
        output: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// No element matched the locator.
    #[error("No such element: {message}")]
    NoSuchElement {
        /// Server-reported message.
        message: String,
    },

    /// Window handle is no longer valid.
    #[error("No such window: {message}")]
    NoSuchWindow {
        /// Server-reported message.
        message: String,
    },

    /// Element reference is no longer attached to the DOM.
    #[error("Stale element reference: {message}")]
    StaleElementReference {
        /// Server-reported message.
        message: String,
    },

    /// A modal dialog blocked the command.
    #[error("Unhandled alert: {message}")]
    UnhandledAlert {
        /// Server-reported message, usually the alert text.
        message: String,
    },

    /// Asynchronous script did not finish in time.
    #[error("Script timeout: {message}")]
    ScriptTimeout {
        /// Server-reported message.
        message: String,
    },

    /// Server-side operation timeout (e.g. page load).
    ///
    /// Distinct from [`Error::WaitTimeout`], which is raised client-side.
    #[error("Operation timed out on the remote end: {message}")]
    ProtocolTimeout {
        /// Server-reported message.
        message: String,
    },

    /// Session id is unknown to the remote end.
    #[error("Invalid session id: {message}")]
    InvalidSessionId {
        /// Server-reported message.
        message: String,
    },

    /// Remote end refused to create the session.
    #[error("Session not created: {message}")]
    SessionNotCreated {
        /// Server-reported message.
        message: String,
    },

    /// Any other structured protocol error.
    #[error("WebDriver error [{code}]: {message}")]
    UnknownError {
        /// Wire error code (W3C string or legacy numeric status).
        code: String,
        /// Server-reported message.
        message: String,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ========================================================================
    // Wait Errors
    // ========================================================================
    /// Poll-wait deadline exceeded without a truthy result.
    ///
    /// The message includes the last ignored error, when one was seen.
    #[error("{message}")]
    WaitTimeout {
        /// Milliseconds waited before giving up.
        timeout_ms: u64,
        /// Caller-supplied or generated message.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Command issued outside the active-session state.
    #[error("Invalid session state: {message}")]
    SessionState {
        /// Description of the state violation.
        message: String,
    },
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an unsupported-capability error.
    #[inline]
    pub fn unsupported_capability(key: impl Into<String>) -> Self {
        Self::UnsupportedCapability { key: key.into() }
    }

    /// Creates an invalid-argument error.
    #[inline]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid-proxy error.
    #[inline]
    pub fn invalid_proxy(message: impl Into<String>) -> Self {
        Self::InvalidProxy {
            message: message.into(),
        }
    }

    /// Creates a driver-not-found error.
    #[inline]
    pub fn driver_not_found(path: impl Into<PathBuf>) -> Self {
        Self::DriverNotFound { path: path.into() }
    }

    /// Creates a process launch failure.
    #[inline]
    pub fn process_launch_failed(message: impl Into<String>) -> Self {
        Self::ProcessLaunchFailed {
            message: message.into(),
        }
    }

    /// Creates a service launch timeout error.
    #[inline]
    pub fn service_launch_timeout(timeout_ms: u64, output: impl Into<String>) -> Self {
        Self::ServiceLaunchTimeout {
            timeout_ms,
            output: output.into(),
        }
    }

    /// Creates a session-state error.
    #[inline]
    pub fn session_state(message: impl Into<String>) -> Self {
        Self::SessionState {
            message: message.into(),
        }
    }

    /// Creates a wait timeout error.
    #[inline]
    pub fn wait_timeout(timeout_ms: u64, message: impl Into<String>) -> Self {
        Self::WaitTimeout {
            timeout_ms,
            message: message.into(),
        }
    }
}

// ============================================================================
// Wire Code Mapping
// ============================================================================

impl Error {
    /// Maps a W3C error code to the matching typed error.
    ///
    /// Unrecognized codes become [`Error::UnknownError`] so the server's
    /// message is never lost.
    #[must_use]
    pub fn from_wire_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "no such element" => Self::NoSuchElement { message },
            "no such window" => Self::NoSuchWindow { message },
            "stale element reference" => Self::StaleElementReference { message },
            "unexpected alert open" => Self::UnhandledAlert { message },
            "script timeout" => Self::ScriptTimeout { message },
            "timeout" => Self::ProtocolTimeout { message },
            "invalid session id" => Self::InvalidSessionId { message },
            "session not created" => Self::SessionNotCreated { message },
            "invalid argument" => Self::InvalidArgument { message },
            _ => Self::UnknownError {
                code: code.to_string(),
                message,
            },
        }
    }

    /// Maps a legacy JSON Wire Protocol numeric status to the matching
    /// typed error.
    #[must_use]
    pub fn from_legacy_status(status: u64, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            7 => Self::NoSuchElement { message },
            10 => Self::StaleElementReference { message },
            21 => Self::ProtocolTimeout { message },
            23 => Self::NoSuchWindow { message },
            26 => Self::UnhandledAlert { message },
            28 => Self::ScriptTimeout { message },
            33 => Self::SessionNotCreated { message },
            _ => Self::UnknownError {
                code: status.to_string(),
                message,
            },
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a transport-level error.
    ///
    /// These are the errors quit suppresses and the readiness poll ignores:
    /// the peer process may exit or refuse connections while the request is
    /// in flight.
    #[inline]
    #[must_use]
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Io(_))
    }

    /// Returns `true` if this is any timeout error, client- or server-side.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ServiceLaunchTimeout { .. }
                | Self::ScriptTimeout { .. }
                | Self::ProtocolTimeout { .. }
                | Self::WaitTimeout { .. }
        )
    }

    /// Returns `true` if this error came from a structured wire envelope.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::NoSuchElement { .. }
                | Self::NoSuchWindow { .. }
                | Self::StaleElementReference { .. }
                | Self::UnhandledAlert { .. }
                | Self::ScriptTimeout { .. }
                | Self::ProtocolTimeout { .. }
                | Self::InvalidSessionId { .. }
                | Self::SessionNotCreated { .. }
                | Self::UnknownError { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::config("missing driver path");
        assert_eq!(err.to_string(), "Configuration error: missing driver path");
    }

    #[test]
    fn test_unsupported_capability_display() {
        let err = Error::unsupported_capability("fooBar");
        assert_eq!(err.to_string(), "Unsupported W3C capability: fooBar");
    }

    #[test]
    fn test_from_wire_code_known() {
        let err = Error::from_wire_code("no such element", "nothing matched");
        assert!(matches!(err, Error::NoSuchElement { .. }));

        let err = Error::from_wire_code("stale element reference", "gone");
        assert!(matches!(err, Error::StaleElementReference { .. }));

        let err = Error::from_wire_code("unexpected alert open", "Are you sure?");
        assert!(matches!(err, Error::UnhandledAlert { .. }));
    }

    #[test]
    fn test_from_wire_code_unknown_preserves_message() {
        let err = Error::from_wire_code("move target out of bounds", "off screen");
        match err {
            Error::UnknownError { code, message } => {
                assert_eq!(code, "move target out of bounds");
                assert_eq!(message, "off screen");
            }
            other => panic!("expected UnknownError, got {other:?}"),
        }
    }

    #[test]
    fn test_from_legacy_status() {
        assert!(matches!(
            Error::from_legacy_status(7, "x"),
            Error::NoSuchElement { .. }
        ));
        assert!(matches!(
            Error::from_legacy_status(10, "x"),
            Error::StaleElementReference { .. }
        ));
        assert!(matches!(
            Error::from_legacy_status(21, "x"),
            Error::ProtocolTimeout { .. }
        ));
        assert!(matches!(
            Error::from_legacy_status(99, "x"),
            Error::UnknownError { .. }
        ));
    }

    #[test]
    fn test_is_transport_error() {
        let io_err: Error = IoError::new(ErrorKind::ConnectionRefused, "refused").into();
        assert!(io_err.is_transport_error());
        assert!(!Error::config("x").is_transport_error());
        assert!(!Error::from_wire_code("timeout", "x").is_transport_error());
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::wait_timeout(1000, "timed out").is_timeout());
        assert!(Error::service_launch_timeout(20_000, "").is_timeout());
        assert!(Error::from_wire_code("timeout", "x").is_timeout());
        assert!(!Error::config("x").is_timeout());
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(Error::from_wire_code("no such element", "x").is_protocol_error());
        assert!(Error::from_legacy_status(42, "x").is_protocol_error());
        assert!(!Error::config("x").is_protocol_error());
        assert!(!Error::wait_timeout(1, "x").is_protocol_error());
    }

    #[test]
    fn test_service_launch_timeout_includes_output() {
        let err = Error::service_launch_timeout(5000, "chromedriver: cannot bind");
        let text = err.to_string();
        assert!(text.contains("5000ms"));
        assert!(text.contains("cannot bind"));
    }
}
