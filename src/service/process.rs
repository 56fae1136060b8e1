//! Driver process lifecycle.
//!
//! [`DriverService`] launches a local driver executable, waits for it to
//! accept TCP connections, and tears it down on [`DriverService::stop`].
//! Process output is captured continuously so a failed launch can report
//! what the driver actually printed.
//!
//! The service always binds the IPv4 loopback. Several drivers listen on
//! `127.0.0.1` only, so connecting by the `localhost` name can hit the
//! IPv6 loopback first and stall.

// ============================================================================
// Imports
// ============================================================================

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::wait::Wait;

use super::config::ServiceConfig;

// ============================================================================
// Constants
// ============================================================================

/// Grace period between the polite termination signal and a hard kill.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

// ============================================================================
// DriverService
// ============================================================================

/// A running, locally managed driver process.
#[derive(Debug)]
pub struct DriverService {
    child: Option<Child>,
    port: u16,
    url: Url,
    output: Arc<Mutex<String>>,
}

// ============================================================================
// DriverService - Launch
// ============================================================================

impl DriverService {
    /// Launches the driver and waits until it accepts connections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DriverNotFound`] when no executable resolves,
    /// [`Error::PortUnavailable`] when the requested port is taken,
    /// [`Error::ProcessLaunchFailed`] when the process cannot start or
    /// exits before listening, and [`Error::ServiceLaunchTimeout`] with
    /// the captured output when the deadline passes.
    pub async fn start(config: ServiceConfig) -> Result<Self> {
        let executable = config.resolve_executable()?;

        let port = match config.port {
            Some(port) => port,
            None => pick_free_port()?,
        };
        // The port may have been grabbed between the pick and the spawn,
        // or a fixed port may be taken outright.
        let probe = std::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
            .map_err(|_| Error::PortUnavailable { port })?;
        drop(probe);

        debug!(executable = %executable.display(), port, "launching driver service");
        let mut child = Command::new(&executable)
            .arg(format!("--port={port}"))
            .args(&config.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::process_launch_failed(format!("{}: {e}", executable.display()))
            })?;

        let output = Arc::new(Mutex::new(String::new()));
        capture(child.stdout.take(), output.clone());
        capture(child.stderr.take(), output.clone());

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let ready = Wait::new()
            .with_timeout(config.launch_timeout)
            .with_interval(config.poll_interval)
            .ignoring(Error::is_transport_error)
            .until(|| async move {
                let stream = TcpStream::connect(addr).await.map_err(Error::Io)?;
                drop(stream);
                Ok(Some(()))
            })
            .await;

        if ready.is_err() {
            let captured = output.lock().clone();
            if let Ok(Some(status)) = child.try_wait() {
                return Err(Error::process_launch_failed(format!(
                    "driver exited with {status} before listening: {captured}"
                )));
            }
            if let Err(e) = child.kill().await {
                warn!(error = %e, "failed to kill unresponsive driver");
            }
            return Err(Error::ServiceLaunchTimeout {
                timeout_ms: config.launch_timeout.as_millis() as u64,
                output: captured,
            });
        }

        // The URL is safe to build by hand: loopback plus a checked port.
        let url = Url::parse(&format!("http://127.0.0.1:{port}/"))
            .map_err(|e| Error::config(format!("service URL: {e}")))?;

        info!(%url, "driver service ready");
        Ok(Self {
            child: Some(child),
            port,
            url,
            output,
        })
    }
}

// ============================================================================
// DriverService - Accessors
// ============================================================================

impl DriverService {
    /// Port the service listens on.
    #[inline]
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base URL of the service.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether the process is still owned by this handle.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Everything the driver printed so far.
    #[must_use]
    pub fn output(&self) -> String {
        self.output.lock().clone()
    }
}

// ============================================================================
// DriverService - Shutdown
// ============================================================================

impl DriverService {
    /// Stops the driver process. Safe to call repeatedly.
    ///
    /// On Unix the process first gets a termination signal and a grace
    /// period to exit cleanly; only then is it killed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the hard kill itself fails.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{Signal, kill};
            use nix::unistd::Pid;

            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok()
                && tokio::time::timeout(SHUTDOWN_GRACE, child.wait())
                    .await
                    .is_ok()
            {
                debug!(pid, "driver exited on termination signal");
                return Ok(());
            }
        }

        child.kill().await?;
        debug!("driver killed");
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Picks a currently free ephemeral port on the loopback.
fn pick_free_port() -> Result<u16> {
    let listener = std::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

/// Streams a process pipe into the shared output buffer.
fn capture<R>(pipe: Option<R>, output: Arc<Mutex<String>>)
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    let Some(pipe) = pipe else { return };
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut buffer = output.lock();
            buffer.push_str(&line);
            buffer.push('\n');
        }
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    fn scratch_exe(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("wdb-service-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fakedriver");
        fs::write(&path, b"").unwrap();
        path
    }

    /// Writes an executable shell script standing in for a driver binary.
    #[cfg(unix)]
    fn scratch_script(tag: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("wdb-service-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fakedriver.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_pick_free_port_is_bindable() {
        let port = pick_free_port().unwrap();
        assert!(port > 0);
        // Still free right after the pick.
        std::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)).unwrap();
    }

    #[tokio::test]
    async fn test_taken_port_is_rejected_before_spawn() {
        let holder =
            std::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = holder.local_addr().unwrap().port();

        let config = ServiceConfig::geckodriver()
            .with_executable(scratch_exe("taken-port"))
            .with_port(port);

        let err = DriverService::start(config).await.unwrap_err();
        match err {
            Error::PortUnavailable { port: reported } => assert_eq!(reported, port),
            other => panic!("expected PortUnavailable, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_early_exit_reports_launch_failure() {
        // `sh` rejects the port option and exits immediately.
        let config = ServiceConfig::geckodriver()
            .with_executable("/bin/sh")
            .with_launch_timeout(Duration::from_millis(300))
            .with_poll_interval(Duration::from_millis(20));

        let err = DriverService::start(config).await.unwrap_err();
        assert!(
            matches!(err, Error::ProcessLaunchFailed { .. }),
            "got {err:?}"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unresponsive_driver_times_out_with_output() {
        // Stays alive but never listens, so only the deadline can end the
        // readiness poll.
        let config = ServiceConfig::geckodriver()
            .with_executable(scratch_script("never-listens", "echo starting up\nexec sleep 30"))
            .with_launch_timeout(Duration::from_millis(400))
            .with_poll_interval(Duration::from_millis(20));

        let started = std::time::Instant::now();
        let err = DriverService::start(config).await.unwrap_err();
        let elapsed = started.elapsed();

        match err {
            Error::ServiceLaunchTimeout { timeout_ms, output } => {
                assert_eq!(timeout_ms, 400);
                assert!(output.contains("starting up"), "output: {output:?}");
            }
            other => panic!("expected ServiceLaunchTimeout, got {other:?}"),
        }
        assert!(elapsed >= Duration::from_millis(400), "took {elapsed:?}");
        assert!(elapsed < Duration::from_millis(1400), "took {elapsed:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_succeeds_once_driver_listens() {
        let port = pick_free_port().unwrap();

        // The listener shows up a few poll intervals after the spawn.
        let opener = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            let listener =
                std::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::LOCALHOST, port)).unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(listener);
        });

        let config = ServiceConfig::geckodriver()
            .with_executable(scratch_script("late-listen", "exec sleep 30"))
            .with_port(port)
            .with_launch_timeout(Duration::from_secs(5))
            .with_poll_interval(Duration::from_millis(25));

        let started = std::time::Instant::now();
        let mut service = DriverService::start(config).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(150));
        assert!(service.is_running());
        assert_eq!(service.port(), port);
        assert_eq!(service.url().as_str(), format!("http://127.0.0.1:{port}/"));

        service.stop().await.unwrap();
        assert!(!service.is_running());
        opener.abort();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_without_child() {
        let mut service = DriverService {
            child: None,
            port: 4444,
            url: Url::parse("http://127.0.0.1:4444/").unwrap(),
            output: Arc::new(Mutex::new(String::new())),
        };

        service.stop().await.unwrap();
        service.stop().await.unwrap();
        assert!(!service.is_running());
    }
}
