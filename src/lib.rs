//! Async WebDriver client with dual-generation protocol support.
//!
//! The crate drives a browser through a WebDriver remote end, either by
//! launching a local driver process or by targeting an already-running
//! server, and speaks both the W3C protocol and the legacy JSON wire
//! protocol behind one command surface.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`capabilities`] | typed browser options, proxy, capability merge |
//! | [`service`] | driver executable resolution and process lifecycle |
//! | [`protocol`] | command tables, envelopes, the session bridge |
//! | [`transport`] | pluggable HTTP layer |
//! | [`wait`] | poll-based waiting |
//! | [`support`] | event-firing decoration |
//! | [`session`] | top-level session assembly and teardown |
//!
//! # Example
//!
//! ```no_run
//! use webdriver_bridge::{DriverCommands, Session, SessionOptions, Wait};
//!
//! # async fn run() -> webdriver_bridge::Result<()> {
//! let options = SessionOptions::firefox();
//! let mut session = Session::create(options).await?;
//!
//! session.commands().navigate_to("https://example.com").await?;
//! let id = session
//!     .wait_for_element(&Wait::new(), "css selector", "h1")
//!     .await?;
//! let text = session.commands().element_text(&id).await?;
//! assert_eq!(text, "Example Domain");
//!
//! session.quit().await
//! # }
//! ```

pub mod capabilities;
pub mod error;
pub mod protocol;
pub mod service;
pub mod session;
pub mod support;
pub mod transport;
pub mod wait;

pub use capabilities::{BrowserFamily, BrowserOptions, Capabilities, LogLevel, Proxy, ProxyType};
pub use error::{Error, Result};
pub use protocol::{Bridge, DriverCommands, ProtocolKind, SessionState, Timeouts};
pub use service::{DriverService, ServiceConfig};
pub use session::{DeprecationLog, Session, SessionOptions, TracingDeprecationLog};
pub use support::{EventFiringBridge, EventListener};
pub use transport::{HttpClient, HttpResponse, ReqwestClient};
pub use wait::Wait;
