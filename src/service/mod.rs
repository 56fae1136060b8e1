//! Locally managed driver processes.
//!
//! [`ServiceConfig`] describes how to find and launch a driver executable;
//! [`DriverService`] is the running process with its readiness guarantee
//! and shutdown behavior.

mod config;
mod process;

pub use config::{DEFAULT_LAUNCH_TIMEOUT, DEFAULT_POLL_INTERVAL, ServiceConfig, find_in_path};
pub use process::DriverService;
