//! Session configuration.
//!
//! [`SessionOptions`] collects everything session creation needs: the
//! browser options, where the remote end lives (or how to launch it), the
//! protocol generation, and explicit capability overrides. Overrides rank
//! above the options object, which ranks above library defaults.
//!
//! Older callers passed a loose bag of keyword-style entries instead of a
//! typed options object. [`SessionOptions::with_legacy_entries`] still
//! accepts the known ones, folding each into its typed home and reporting
//! it through a [`DeprecationLog`].

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::warn;
use url::Url;

use crate::capabilities::{BrowserOptions, Capabilities};
use crate::error::{Error, Result};
use crate::protocol::{ProtocolKind, Timeouts};
use crate::service::ServiceConfig;
use crate::transport::HttpClient;

// ============================================================================
// DeprecationLog
// ============================================================================

/// Sink for deprecated-option reports.
pub trait DeprecationLog: Send + Sync {
    /// Reports that `option` was used and what replaces it.
    fn deprecated(&self, option: &str, instead: &str);
}

/// Default sink, reporting through the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDeprecationLog;

impl DeprecationLog for TracingDeprecationLog {
    fn deprecated(&self, option: &str, instead: &str) {
        warn!(option, instead, "deprecated session option");
    }
}

// ============================================================================
// SessionOptions
// ============================================================================

/// Everything needed to create a session.
pub struct SessionOptions {
    pub(crate) browser: BrowserOptions,
    pub(crate) url: Option<Url>,
    pub(crate) protocol: ProtocolKind,
    pub(crate) service: Option<ServiceConfig>,
    pub(crate) overrides: Capabilities,
    pub(crate) timeouts: Option<Timeouts>,
    pub(crate) http: Option<Arc<dyn HttpClient>>,
}

impl std::fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOptions")
            .field("browser", &self.browser)
            .field("url", &self.url)
            .field("protocol", &self.protocol)
            .field("service", &self.service)
            .field("overrides", &self.overrides)
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// SessionOptions - Construction
// ============================================================================

impl SessionOptions {
    /// Options around an existing [`BrowserOptions`].
    #[must_use]
    pub fn new(browser: BrowserOptions) -> Self {
        Self {
            browser,
            url: None,
            protocol: ProtocolKind::W3c,
            service: None,
            overrides: Capabilities::new(),
            timeouts: None,
            http: None,
        }
    }

    /// Default Firefox session options.
    #[inline]
    #[must_use]
    pub fn firefox() -> Self {
        Self::new(BrowserOptions::firefox())
    }

    /// Default Chrome session options.
    #[inline]
    #[must_use]
    pub fn chrome() -> Self {
        Self::new(BrowserOptions::chrome())
    }

    /// Targets an already-running remote end instead of launching a
    /// driver.
    #[must_use]
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Selects the protocol generation. W3C is the default.
    #[must_use]
    pub fn with_protocol(mut self, protocol: ProtocolKind) -> Self {
        self.protocol = protocol;
        self
    }

    /// Customizes the launched driver service. Ignored when a URL is set.
    #[must_use]
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.service = Some(service);
        self
    }

    /// Points the launched service at a specific driver executable.
    #[must_use]
    pub fn with_driver_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.service = Some(self.service_config().with_executable(path));
        self
    }

    /// Pins the launched service's port.
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.service = Some(self.service_config().with_port(port));
        self
    }

    fn service_config(&mut self) -> ServiceConfig {
        self.service
            .take()
            .unwrap_or_else(|| ServiceConfig::for_family(self.browser.family()))
    }

    /// Sets an explicit capability override. Overrides win over every
    /// value derived from the browser options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProxy`] for a malformed `proxy` value.
    pub fn with_capability(mut self, key: impl AsRef<str>, value: Value) -> Result<Self> {
        self.overrides.set(key, value)?;
        Ok(self)
    }

    /// Applies these timeouts right after session creation.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Substitutes the HTTP transport.
    #[must_use]
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = Some(http);
        self
    }

    /// The browser options being carried.
    #[inline]
    #[must_use]
    pub fn browser(&self) -> &BrowserOptions {
        &self.browser
    }
}

// ============================================================================
// SessionOptions - Legacy Entries
// ============================================================================

impl SessionOptions {
    /// Folds a loose keyword-style entry bag into the typed options.
    ///
    /// Every accepted entry is reported to `log`; an entry outside the
    /// known set is rejected rather than silently dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for an unknown entry or a value
    /// of the wrong shape.
    pub fn with_legacy_entries(
        mut self,
        entries: &Map<String, Value>,
        log: &dyn DeprecationLog,
    ) -> Result<Self> {
        for (key, value) in entries {
            match key.as_str() {
                "desired_capabilities" | "desiredCapabilities" => {
                    let map = expect_object(key, value)?;
                    log.deprecated(key, "with_capability");
                    for (cap, cap_value) in map {
                        self.overrides.set(cap, cap_value.clone())?;
                    }
                }
                "args" | "switches" => {
                    let args = expect_string_array(key, value)?;
                    log.deprecated(key, "BrowserOptions::with_args");
                    self.browser = self.browser.with_args(args);
                }
                "profile" => {
                    let encoded = expect_string(key, value)?;
                    log.deprecated(key, "BrowserOptions::with_encoded_profile");
                    self.browser = self.browser.with_encoded_profile(encoded);
                }
                "detach" => {
                    let detach = value.as_bool().ok_or_else(|| {
                        Error::invalid_argument(format!("entry {key} must be a boolean"))
                    })?;
                    log.deprecated(key, "BrowserOptions::with_detach");
                    self.browser = self.browser.with_detach(detach);
                }
                "prefs" => {
                    let prefs = expect_object(key, value)?;
                    log.deprecated(key, "BrowserOptions::with_pref");
                    for (name, pref) in prefs {
                        self.browser = self.browser.with_pref(name, pref.clone());
                    }
                }
                other => {
                    return Err(Error::invalid_argument(format!(
                        "unknown session option {other}"
                    )));
                }
            }
        }
        Ok(self)
    }
}

fn expect_object<'a>(key: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::invalid_argument(format!("entry {key} must be an object")))
}

fn expect_string(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_argument(format!("entry {key} must be a string")))
}

fn expect_string_array(key: &str, value: &Value) -> Result<Vec<String>> {
    let array = value
        .as_array()
        .ok_or_else(|| Error::invalid_argument(format!("entry {key} must be an array")))?;
    array
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| {
                Error::invalid_argument(format!("entry {key} must contain only strings"))
            })
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct RecordingLog {
        entries: Mutex<Vec<(String, String)>>,
    }

    impl DeprecationLog for RecordingLog {
        fn deprecated(&self, option: &str, instead: &str) {
            self.entries
                .lock()
                .push((option.to_string(), instead.to_string()));
        }
    }

    fn entries(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_defaults() {
        let options = SessionOptions::firefox();
        assert_eq!(options.protocol, ProtocolKind::W3c);
        assert!(options.url.is_none());
        assert!(options.overrides.is_empty());
    }

    #[test]
    fn test_driver_path_and_port_configure_the_service() {
        let options = SessionOptions::firefox()
            .with_driver_path("/opt/geckodriver")
            .with_port(4445);

        let service = options.service.unwrap();
        assert_eq!(
            service.executable.as_deref(),
            Some(std::path::Path::new("/opt/geckodriver"))
        );
        assert_eq!(service.port, Some(4445));
        assert_eq!(service.program, "geckodriver");
    }

    #[test]
    fn test_capability_override_is_recorded() {
        let options = SessionOptions::firefox()
            .with_capability("accept_insecure_certs", json!(true))
            .unwrap();

        assert_eq!(
            options.overrides.get("acceptInsecureCerts"),
            Some(&json!(true))
        );
    }

    #[test]
    fn test_legacy_args_folded_into_browser_options() {
        let log = RecordingLog::default();
        let options = SessionOptions::firefox()
            .with_legacy_entries(&entries(json!({"args": ["-headless"]})), &log)
            .unwrap();

        assert_eq!(options.browser().args(), ["-headless"]);
        assert_eq!(log.entries.lock()[0].0, "args");
    }

    #[test]
    fn test_legacy_switches_are_args() {
        let log = RecordingLog::default();
        let options = SessionOptions::chrome()
            .with_legacy_entries(&entries(json!({"switches": ["--disable-gpu"]})), &log)
            .unwrap();

        assert_eq!(options.browser().args(), ["--disable-gpu"]);
    }

    #[test]
    fn test_legacy_desired_capabilities_become_overrides() {
        let log = RecordingLog::default();
        let options = SessionOptions::firefox()
            .with_legacy_entries(
                &entries(json!({"desired_capabilities": {"page_load_strategy": "eager"}})),
                &log,
            )
            .unwrap();

        assert_eq!(
            options.overrides.get("pageLoadStrategy"),
            Some(&json!("eager"))
        );
        assert_eq!(log.entries.lock()[0].1, "with_capability");
    }

    #[test]
    fn test_legacy_detach_and_prefs() {
        let log = RecordingLog::default();
        let options = SessionOptions::chrome()
            .with_legacy_entries(
                &entries(json!({"detach": true, "prefs": {"intl.accept_languages": "en"}})),
                &log,
            )
            .unwrap();

        let caps = options
            .browser()
            .clone()
            .to_capabilities(ProtocolKind::W3c)
            .unwrap();
        let vendor = caps.get("goog:chromeOptions").unwrap();
        assert_eq!(vendor["detach"], true);
        assert_eq!(vendor["prefs"]["intl.accept_languages"], "en");
        assert_eq!(log.entries.lock().len(), 2);
    }

    #[test]
    fn test_unknown_legacy_entry_rejected() {
        let log = RecordingLog::default();
        let err = SessionOptions::firefox()
            .with_legacy_entries(&entries(json!({"browser_profile": "x"})), &log)
            .unwrap_err();

        match err {
            Error::InvalidArgument { message } => {
                assert!(message.contains("browser_profile"));
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_legacy_entry_with_wrong_shape_rejected() {
        let log = RecordingLog::default();
        let err = SessionOptions::firefox()
            .with_legacy_entries(&entries(json!({"args": "not-an-array"})), &log)
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(log.entries.lock().is_empty());
    }
}
