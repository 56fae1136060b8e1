//! Poll-based waiting.
//!
//! [`Wait`] repeatedly probes an async condition until it yields a value,
//! the deadline passes, or a non-ignored error surfaces. By default the
//! missing-element error is ignored, which makes element-presence waits
//! work without ceremony:
//!
//! ```no_run
//! # async fn example() -> webdriver_bridge::Result<()> {
//! use std::time::Duration;
//! use webdriver_bridge::Wait;
//!
//! let wait = Wait::new().with_timeout(Duration::from_secs(10));
//! let value = wait.until(|| async { Ok(Some(42)) }).await?;
//! # Ok(()) }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default pause between probes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// Wait
// ============================================================================

/// A reusable polling policy.
pub struct Wait {
    timeout: Duration,
    interval: Duration,
    message: Option<String>,
    ignoring: Box<dyn Fn(&Error) -> bool + Send + Sync>,
}

impl Default for Wait {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Wait - Construction
// ============================================================================

impl Wait {
    /// Creates a wait with the default deadline, interval, and ignore set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            message: None,
            ignoring: Box::new(|err| matches!(err, Error::NoSuchElement { .. })),
        }
    }

    /// Sets the deadline.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the pause between probes.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the message reported on timeout.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Replaces the ignored-error predicate. Errors matching the predicate
    /// keep the poll alive; anything else aborts it immediately.
    #[must_use]
    pub fn ignoring(mut self, predicate: impl Fn(&Error) -> bool + Send + Sync + 'static) -> Self {
        self.ignoring = Box::new(predicate);
        self
    }
}

// ============================================================================
// Wait - Polling
// ============================================================================

impl Wait {
    /// Polls `probe` until it yields `Some`, collecting ignored errors.
    ///
    /// The probe always runs at least once, even with a zero deadline, and
    /// no sleep follows a successful probe. A probe started before the
    /// deadline is allowed to finish after it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitTimeout`] when the deadline passes, carrying
    /// the last ignored error if any; non-ignored probe errors propagate
    /// unchanged.
    pub async fn until<T, F, Fut>(&self, mut probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let start = Instant::now();
        let mut last_ignored: Option<Error> = None;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match probe().await {
                Ok(Some(value)) => {
                    trace!(attempts, "wait satisfied");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(err) if (self.ignoring)(&err) => {
                    trace!(attempts, error = %err, "ignoring probe error");
                    last_ignored = Some(err);
                }
                Err(err) => return Err(err),
            }

            if start.elapsed() >= self.timeout {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        Err(self.timeout_error(attempts, last_ignored))
    }

    /// Like [`Wait::until`], but threads a mutable context through every
    /// probe. Useful when the probe needs exclusive access to a session.
    ///
    /// # Errors
    ///
    /// Same contract as [`Wait::until`].
    pub async fn until_with<C, T, F>(&self, context: &mut C, mut probe: F) -> Result<T>
    where
        C: ?Sized,
        F: for<'a> FnMut(
            &'a mut C,
        )
            -> Pin<Box<dyn Future<Output = Result<Option<T>>> + Send + 'a>>,
    {
        let start = Instant::now();
        let mut last_ignored: Option<Error> = None;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            match probe(&mut *context).await {
                Ok(Some(value)) => {
                    trace!(attempts, "wait satisfied");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(err) if (self.ignoring)(&err) => {
                    trace!(attempts, error = %err, "ignoring probe error");
                    last_ignored = Some(err);
                }
                Err(err) => return Err(err),
            }

            if start.elapsed() >= self.timeout {
                break;
            }
            tokio::time::sleep(self.interval).await;
        }

        Err(self.timeout_error(attempts, last_ignored))
    }

    fn timeout_error(&self, attempts: u32, last_ignored: Option<Error>) -> Error {
        let mut message = match &self.message {
            Some(message) => message.clone(),
            None => format!("condition not met after {attempts} attempts"),
        };
        if let Some(err) = last_ignored {
            message.push_str(&format!("; last error: {err}"));
        }
        Error::wait_timeout(self.timeout.as_millis() as u64, message)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_wait() -> Wait {
        Wait::new()
            .with_timeout(Duration::from_millis(80))
            .with_interval(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let start = Instant::now();
        let value = fast_wait().until(|| async { Ok(Some(7)) }).await.unwrap();

        assert_eq!(value, 7);
        // No interval sleep after a successful probe.
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_succeeds_after_retries() {
        let counter = Arc::new(AtomicU32::new(0));
        let probe_counter = counter.clone();

        let value = fast_wait()
            .until(move || {
                let counter = probe_counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Ok(None)
                    } else {
                        Ok(Some("ready"))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "ready");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_with_custom_message() {
        let err = fast_wait()
            .with_message("button never appeared")
            .until(|| async { Ok(None::<u8>) })
            .await
            .unwrap_err();

        match err {
            Error::WaitTimeout { message, .. } => {
                assert!(message.contains("button never appeared"));
            }
            other => panic!("expected WaitTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_last_ignored_error_appears_in_timeout() {
        let err = fast_wait()
            .until(|| async {
                Err::<Option<u8>, _>(Error::NoSuchElement {
                    message: "no #login".into(),
                })
            })
            .await
            .unwrap_err();

        match err {
            Error::WaitTimeout { message, .. } => assert!(message.contains("no #login")),
            other => panic!("expected WaitTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_ignored_error_aborts() {
        let counter = Arc::new(AtomicU32::new(0));
        let probe_counter = counter.clone();

        let err = fast_wait()
            .until(move || {
                let counter = probe_counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<Option<u8>, _>(Error::session_state("gone"))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SessionState { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_timeout_still_probes_once() {
        let counter = Arc::new(AtomicU32::new(0));
        let probe_counter = counter.clone();

        let err = Wait::new()
            .with_timeout(Duration::ZERO)
            .until(move || {
                let counter = probe_counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(None::<u8>)
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::WaitTimeout { .. }));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_until_with_threads_context() {
        let mut countdown = 3u32;

        let value = fast_wait()
            .until_with(&mut countdown, |remaining| {
                Box::pin(async move {
                    if *remaining == 0 {
                        Ok(Some("done"))
                    } else {
                        *remaining -= 1;
                        Ok(None)
                    }
                })
            })
            .await
            .unwrap();

        assert_eq!(value, "done");
        assert_eq!(countdown, 0);
    }

    #[tokio::test]
    async fn test_custom_ignore_predicate() {
        let counter = Arc::new(AtomicU32::new(0));
        let probe_counter = counter.clone();

        let value = fast_wait()
            .ignoring(|err| matches!(err, Error::StaleElementReference { .. }))
            .until(move || {
                let counter = probe_counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::StaleElementReference {
                            message: "detached".into(),
                        })
                    } else {
                        Ok(Some(true))
                    }
                }
            })
            .await
            .unwrap();

        assert!(value);
    }
}
