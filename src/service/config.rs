//! Driver service configuration.
//!
//! Resolution order for the driver executable, highest precedence first:
//! an explicitly configured path, the family's environment variable, a
//! `PATH` search for the well-known program name.

// ============================================================================
// Imports
// ============================================================================

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::capabilities::BrowserFamily;
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default wait for the service to accept connections.
pub const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Default pause between readiness probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ============================================================================
// ServiceConfig
// ============================================================================

/// Configuration for a locally managed driver process.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Well-known program name, e.g. `geckodriver`.
    pub(crate) program: String,

    /// Environment variable that may point at the executable.
    pub(crate) env_var: String,

    /// Explicit executable path, overriding resolution.
    pub(crate) executable: Option<PathBuf>,

    /// Fixed port; an ephemeral port is picked when unset.
    pub(crate) port: Option<u16>,

    /// Extra process arguments, appended after the port argument.
    pub(crate) args: Vec<String>,

    /// Deadline for the service to accept connections.
    pub(crate) launch_timeout: Duration,

    /// Pause between readiness probes.
    pub(crate) poll_interval: Duration,
}

// ============================================================================
// ServiceConfig - Construction
// ============================================================================

impl ServiceConfig {
    /// Configuration for the given browser family's driver.
    #[must_use]
    pub fn for_family(family: BrowserFamily) -> Self {
        let (program, env_var) = match family {
            BrowserFamily::Firefox => ("geckodriver", "GECKODRIVER"),
            BrowserFamily::Chrome => ("chromedriver", "CHROMEDRIVER"),
        };
        Self {
            program: program.to_string(),
            env_var: env_var.to_string(),
            executable: None,
            port: None,
            args: Vec::new(),
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Configuration for geckodriver.
    #[inline]
    #[must_use]
    pub fn geckodriver() -> Self {
        Self::for_family(BrowserFamily::Firefox)
    }

    /// Configuration for chromedriver.
    #[inline]
    #[must_use]
    pub fn chromedriver() -> Self {
        Self::for_family(BrowserFamily::Chrome)
    }

    /// Sets an explicit executable path.
    #[must_use]
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Pins the listening port instead of picking an ephemeral one.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Appends a process argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the launch deadline.
    #[must_use]
    pub fn with_launch_timeout(mut self, timeout: Duration) -> Self {
        self.launch_timeout = timeout;
        self
    }

    /// Sets the readiness poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

// ============================================================================
// ServiceConfig - Resolution
// ============================================================================

impl ServiceConfig {
    /// Resolves the driver executable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DriverNotFound`] naming the most specific path that
    /// was tried.
    pub fn resolve_executable(&self) -> Result<PathBuf> {
        if let Some(path) = &self.executable {
            return check_file(path);
        }
        if let Ok(path) = env::var(&self.env_var) {
            if !path.is_empty() {
                debug!(var = self.env_var, path, "driver path from environment");
                return check_file(Path::new(&path));
            }
        }
        find_in_path(&self.program, env::var_os("PATH").as_deref())
            .ok_or_else(|| Error::DriverNotFound {
                path: PathBuf::from(&self.program),
            })
    }
}

/// Accepts a candidate only if it names an existing regular file.
fn check_file(path: &Path) -> Result<PathBuf> {
    if path.is_file() {
        Ok(path.to_path_buf())
    } else {
        Err(Error::DriverNotFound {
            path: path.to_path_buf(),
        })
    }
}

/// Searches a `PATH`-style list for `program`.
#[must_use]
pub fn find_in_path(program: &str, path: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    let path = path?;
    env::split_paths(path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::ffi::OsString;
    use std::fs;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("wdb-config-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_explicit_path_missing_is_driver_not_found() {
        let config =
            ServiceConfig::geckodriver().with_executable("/nonexistent/geckodriver");

        let err = config.resolve_executable().unwrap_err();
        match err {
            Error::DriverNotFound { path } => {
                assert_eq!(path, PathBuf::from("/nonexistent/geckodriver"));
            }
            other => panic!("expected DriverNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = scratch_dir("explicit");
        let exe = touch(&dir, "mydriver");

        let config = ServiceConfig::geckodriver().with_executable(&exe);
        assert_eq!(config.resolve_executable().unwrap(), exe);
    }

    #[test]
    fn test_find_in_path_picks_first_match() {
        let first = scratch_dir("path-a");
        let second = scratch_dir("path-b");
        touch(&second, "somedriver");
        let winner = touch(&first, "somedriver");

        let joined: OsString =
            env::join_paths([first.clone(), second.clone()]).unwrap();
        assert_eq!(
            find_in_path("somedriver", Some(joined.as_os_str())),
            Some(winner)
        );
    }

    #[test]
    fn test_find_in_path_empty() {
        assert_eq!(find_in_path("nope-driver", None), None);
        let joined: OsString = env::join_paths([scratch_dir("path-empty")]).unwrap();
        assert_eq!(find_in_path("nope-driver", Some(joined.as_os_str())), None);
    }

    #[test]
    fn test_family_defaults() {
        let gecko = ServiceConfig::geckodriver();
        assert_eq!(gecko.program, "geckodriver");
        assert_eq!(gecko.env_var, "GECKODRIVER");
        assert_eq!(gecko.launch_timeout, DEFAULT_LAUNCH_TIMEOUT);

        let chrome = ServiceConfig::chromedriver();
        assert_eq!(chrome.program, "chromedriver");
        assert_eq!(chrome.env_var, "CHROMEDRIVER");
    }
}
