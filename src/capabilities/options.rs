//! Typed, pre-wire browser options.
//!
//! [`BrowserOptions`] is the configuration a caller mutates before session
//! creation: command-line arguments, binary path, preferences, an encoded
//! profile, logging level, proxy. It is converted to [`Capabilities`]
//! exactly once, at session-creation time, and every browser-specific field
//! lands under a single vendor-prefixed sub-object key so vendor extensions
//! never collide with standard capability keys.
//!
//! # Example
//!
//! ```
//! use webdriver_bridge::{BrowserOptions, ProtocolKind};
//!
//! let options = BrowserOptions::firefox()
//!     .with_arg("-headless")
//!     .with_pref("dom.disable_beforeunload", true.into());
//!
//! let caps = options.to_capabilities(ProtocolKind::W3c).unwrap();
//! assert_eq!(caps.get("browserName").unwrap(), "firefox");
//! assert!(caps.get("moz:firefoxOptions").is_some());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value, json};

use crate::error::{Error, Result};
use crate::protocol::ProtocolKind;

use super::core::Capabilities;
use super::proxy::Proxy;

// ============================================================================
// BrowserFamily
// ============================================================================

/// Browser family an options object configures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserFamily {
    /// Firefox / geckodriver.
    Firefox,
    /// Chrome / chromedriver.
    Chrome,
}

impl BrowserFamily {
    /// Returns the `browserName` capability value.
    #[inline]
    #[must_use]
    pub fn browser_name(&self) -> &'static str {
        match self {
            Self::Firefox => "firefox",
            Self::Chrome => "chrome",
        }
    }

    /// Returns the vendor sub-object key for the given protocol generation.
    ///
    /// The legacy protocol predates vendor prefixes for Chrome.
    #[inline]
    #[must_use]
    pub fn vendor_key(&self, kind: ProtocolKind) -> &'static str {
        match (self, kind) {
            (Self::Firefox, _) => "moz:firefoxOptions",
            (Self::Chrome, ProtocolKind::W3c) => "goog:chromeOptions",
            (Self::Chrome, ProtocolKind::Legacy) => "chromeOptions",
        }
    }
}

// ============================================================================
// LogLevel
// ============================================================================

/// Driver log verbosity, serialized into the vendor options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug messages.
    Debug,
    /// Configuration messages.
    Config,
    /// Informational messages.
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
    /// Fatal errors only.
    Fatal,
}

impl LogLevel {
    /// Returns the wire string for this level.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Config => "config",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Parses a wire string into a log level.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for unrecognized levels.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "config" => Ok(Self::Config),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            other => Err(Error::invalid_argument(format!(
                "unknown log level: {other:?}"
            ))),
        }
    }
}

// ============================================================================
// BrowserOptions
// ============================================================================

/// Browser-specific configuration, the pre-image of a capability value.
///
/// Constructed once by the caller (or defaulted), mutated via the builder
/// methods before session creation, then converted with
/// [`BrowserOptions::to_capabilities`]. The bridge never mutates it after
/// that point.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserOptions {
    /// Browser family this object configures.
    family: BrowserFamily,

    /// Path to the browser binary.
    binary: Option<PathBuf>,

    /// Command-line arguments passed to the browser.
    args: Vec<String>,

    /// Preference key/value pairs.
    prefs: Map<String, Value>,

    /// Base64-encoded profile blob (opaque to this crate).
    profile: Option<String>,

    /// Driver log level.
    log_level: Option<LogLevel>,

    /// Keep the browser open after the driver exits (Chrome).
    detach: Option<bool>,

    /// Proxy configuration, serialized as a standard top-level capability.
    proxy: Option<Proxy>,

    /// Additional vendor options for capabilities added by the vendor
    /// after this crate was written.
    extra: Map<String, Value>,
}

// ============================================================================
// BrowserOptions - Constructors
// ============================================================================

impl BrowserOptions {
    /// Creates empty options for the given family.
    #[must_use]
    pub fn new(family: BrowserFamily) -> Self {
        Self {
            family,
            binary: None,
            args: Vec::new(),
            prefs: Map::new(),
            profile: None,
            log_level: None,
            detach: None,
            proxy: None,
            extra: Map::new(),
        }
    }

    /// Creates empty Firefox options.
    #[inline]
    #[must_use]
    pub fn firefox() -> Self {
        Self::new(BrowserFamily::Firefox)
    }

    /// Creates empty Chrome options.
    #[inline]
    #[must_use]
    pub fn chrome() -> Self {
        Self::new(BrowserFamily::Chrome)
    }

    /// Rebuilds options from a wire capability mapping.
    ///
    /// The inverse of [`BrowserOptions::to_capabilities`] for payloads this
    /// crate produced; used when reflecting accepted capabilities back into
    /// a typed view.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `browserName` is missing or
    /// unrecognized, or a vendor field has the wrong type.
    pub fn from_wire(kind: ProtocolKind, map: &Map<String, Value>) -> Result<Self> {
        let family = match map.get("browserName").and_then(Value::as_str) {
            Some("firefox") => BrowserFamily::Firefox,
            Some("chrome") => BrowserFamily::Chrome,
            Some(other) => {
                return Err(Error::invalid_argument(format!(
                    "unsupported browserName: {other:?}"
                )));
            }
            None => return Err(Error::invalid_argument("missing browserName")),
        };

        let mut options = Self::new(family);

        if let Some(value) = map.get("proxy") {
            options.proxy = Some(Proxy::from_json(value)?);
        }

        let Some(vendor) = map.get(family.vendor_key(kind)) else {
            return Ok(options);
        };
        let vendor = vendor
            .as_object()
            .ok_or_else(|| Error::invalid_argument("vendor options must be an object"))?;

        for (key, value) in vendor {
            match key.as_str() {
                "binary" => {
                    let path = value
                        .as_str()
                        .ok_or_else(|| Error::invalid_argument("binary must be a string"))?;
                    options.binary = Some(PathBuf::from(path));
                }
                "args" => {
                    let args = value
                        .as_array()
                        .ok_or_else(|| Error::invalid_argument("args must be an array"))?;
                    for arg in args {
                        let arg = arg
                            .as_str()
                            .ok_or_else(|| Error::invalid_argument("args must be strings"))?;
                        options.args.push(arg.to_string());
                    }
                }
                "prefs" => {
                    let prefs = value
                        .as_object()
                        .ok_or_else(|| Error::invalid_argument("prefs must be an object"))?;
                    options.prefs = prefs.clone();
                }
                "profile" => {
                    let encoded = value
                        .as_str()
                        .ok_or_else(|| Error::invalid_argument("profile must be a string"))?;
                    options.profile = Some(encoded.to_string());
                }
                "log" => {
                    let level = value
                        .get("level")
                        .and_then(Value::as_str)
                        .ok_or_else(|| Error::invalid_argument("log must contain a level"))?;
                    options.log_level = Some(LogLevel::parse(level)?);
                }
                "detach" => {
                    let detach = value
                        .as_bool()
                        .ok_or_else(|| Error::invalid_argument("detach must be a boolean"))?;
                    options.detach = Some(detach);
                }
                _ => {
                    options.extra.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(options)
    }
}

// ============================================================================
// BrowserOptions - Builder Methods
// ============================================================================

impl BrowserOptions {
    /// Sets the browser binary path.
    #[inline]
    #[must_use]
    pub fn with_binary(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary = Some(path.into());
        self
    }

    /// Adds a command-line argument.
    #[inline]
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Adds multiple command-line arguments.
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets a browser preference.
    #[inline]
    #[must_use]
    pub fn with_pref(mut self, key: impl Into<String>, value: Value) -> Self {
        self.prefs.insert(key.into(), value);
        self
    }

    /// Sets an already-encoded profile blob.
    #[inline]
    #[must_use]
    pub fn with_encoded_profile(mut self, encoded: impl Into<String>) -> Self {
        self.profile = Some(encoded.into());
        self
    }

    /// Sets the profile from raw archive bytes, encoding them for the wire.
    #[inline]
    #[must_use]
    pub fn with_profile_bytes(mut self, bytes: &[u8]) -> Self {
        self.profile = Some(BASE64.encode(bytes));
        self
    }

    /// Sets the driver log level.
    #[inline]
    #[must_use]
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    /// Keeps the browser running after the driver exits.
    #[inline]
    #[must_use]
    pub fn with_detach(mut self, detach: bool) -> Self {
        self.detach = Some(detach);
        self
    }

    /// Sets the proxy configuration.
    #[inline]
    #[must_use]
    pub fn with_proxy(mut self, proxy: Proxy) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Adds a raw vendor option, for capabilities this crate does not model.
    #[inline]
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

// ============================================================================
// BrowserOptions - Accessors
// ============================================================================

impl BrowserOptions {
    /// Returns the browser family.
    #[inline]
    #[must_use]
    pub fn family(&self) -> BrowserFamily {
        self.family
    }

    /// Returns the configured arguments.
    #[inline]
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the configured binary path.
    #[inline]
    #[must_use]
    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    /// Returns the configured proxy.
    #[inline]
    #[must_use]
    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy.as_ref()
    }
}

// ============================================================================
// BrowserOptions - Conversion
// ============================================================================

impl BrowserOptions {
    /// Converts to a capability set for the given protocol generation.
    ///
    /// Standard fields (`browserName`, `proxy`) become top-level keys;
    /// everything browser-specific is namespaced under the single vendor
    /// key. Empty collections are omitted from the wire payload.
    ///
    /// # Errors
    ///
    /// Returns an error if a capability value fails validation.
    pub fn to_capabilities(&self, kind: ProtocolKind) -> Result<Capabilities> {
        let mut caps = Capabilities::new();
        caps.set("browserName", json!(self.family.browser_name()))?;

        if let Some(proxy) = &self.proxy {
            caps.set_proxy(proxy);
        }

        let mut vendor = self.extra.clone();
        if let Some(profile) = &self.profile {
            vendor.insert("profile".into(), json!(profile));
        }
        if !self.args.is_empty() {
            vendor.insert("args".into(), json!(self.args));
        }
        if let Some(binary) = &self.binary {
            vendor.insert("binary".into(), json!(binary.display().to_string()));
        }
        if !self.prefs.is_empty() {
            vendor.insert("prefs".into(), Value::Object(self.prefs.clone()));
        }
        if let Some(level) = self.log_level {
            vendor.insert("log".into(), json!({"level": level.as_str()}));
        }
        if let Some(detach) = self.detach {
            vendor.insert("detach".into(), json!(detach));
        }

        caps.set(self.family.vendor_key(kind), Value::Object(vendor))?;
        Ok(caps)
    }
}

// ============================================================================
// Tests
// ============================================================================
