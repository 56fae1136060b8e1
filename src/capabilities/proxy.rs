//! Structured proxy capability.
//!
//! The proxy sub-object of a capability set. Loose JSON values are upgraded
//! to [`Proxy`] when they are set on capabilities or options; invalid shapes
//! fail fast with [`Error::InvalidProxy`] at construction, never at
//! serialization time.
//!
//! # Example
//!
//! ```
//! use webdriver_bridge::Proxy;
//!
//! let proxy = Proxy::manual().with_http("proxy.example.com:8080");
//! let wire = proxy.to_wire();
//! assert_eq!(wire["proxyType"], "manual");
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

// ============================================================================
// ProxyType
// ============================================================================

/// Proxy configuration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProxyType {
    /// Direct connection, no proxy.
    Direct,

    /// Manual per-scheme proxy settings.
    Manual,

    /// Proxy auto-configuration from a PAC URL.
    Pac,

    /// Proxy auto-detection (WPAD).
    AutoDetect,

    /// Use system proxy settings.
    #[default]
    System,
}

// ============================================================================
// ProxyType - Implementation
// ============================================================================

impl ProxyType {
    /// Returns the wire string for this proxy type.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Manual => "manual",
            Self::Pac => "pac",
            Self::AutoDetect => "autodetect",
            Self::System => "system",
        }
    }

    /// Parses a wire string into a proxy type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProxy`] for unrecognized types.
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "direct" => Ok(Self::Direct),
            "manual" => Ok(Self::Manual),
            "pac" => Ok(Self::Pac),
            "autodetect" => Ok(Self::AutoDetect),
            "system" => Ok(Self::System),
            other => Err(Error::invalid_proxy(format!(
                "unknown proxy type: {other:?}"
            ))),
        }
    }
}

// ============================================================================
// Proxy
// ============================================================================

/// Structured proxy descriptor.
///
/// Mirrors the standard WebDriver proxy capability: a type plus per-scheme
/// endpoints for [`ProxyType::Manual`], or a PAC URL for [`ProxyType::Pac`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Proxy {
    /// Proxy configuration type.
    pub proxy_type: ProxyType,

    /// HTTP proxy endpoint (`host:port`).
    pub http: Option<String>,

    /// TLS proxy endpoint.
    pub ssl: Option<String>,

    /// FTP proxy endpoint.
    pub ftp: Option<String>,

    /// SOCKS proxy endpoint.
    pub socks: Option<String>,

    /// SOCKS proxy username.
    pub socks_username: Option<String>,

    /// Hosts that bypass the proxy.
    pub no_proxy: Option<String>,

    /// PAC file URL for [`ProxyType::Pac`].
    pub pac_url: Option<String>,
}

// ============================================================================
// Proxy - Constructors
// ============================================================================

impl Proxy {
    /// Creates a manual proxy configuration with no endpoints set.
    #[inline]
    #[must_use]
    pub fn manual() -> Self {
        Self {
            proxy_type: ProxyType::Manual,
            ..Self::default()
        }
    }

    /// Creates a direct (no proxy) configuration.
    #[inline]
    #[must_use]
    pub fn direct() -> Self {
        Self {
            proxy_type: ProxyType::Direct,
            ..Self::default()
        }
    }

    /// Creates a PAC proxy configuration.
    #[inline]
    #[must_use]
    pub fn pac(url: impl Into<String>) -> Self {
        Self {
            proxy_type: ProxyType::Pac,
            pac_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Upgrades a loose JSON value to a validated proxy.
    ///
    /// Accepts the wire shape (`proxyType` plus per-scheme keys). Unknown
    /// keys and malformed values are rejected here so serialization can
    /// never fail later.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProxy`] if the value is not an object, the
    /// type is unrecognized, or a key is unknown.
    pub fn from_json(value: &Value) -> Result<Self> {
        let map = value
            .as_object()
            .ok_or_else(|| Error::invalid_proxy(format!("expected object, got {value}")))?;

        let mut proxy = Self::default();
        for (key, value) in map {
            let text = || -> Result<String> {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::invalid_proxy(format!("{key} must be a string")))
            };

            match key.as_str() {
                "proxyType" => proxy.proxy_type = ProxyType::parse(&text()?.to_lowercase())?,
                "httpProxy" => proxy.http = Some(text()?),
                "sslProxy" => proxy.ssl = Some(text()?),
                "ftpProxy" => proxy.ftp = Some(text()?),
                "socksProxy" => proxy.socks = Some(text()?),
                "socksUsername" => proxy.socks_username = Some(text()?),
                "noProxy" => proxy.no_proxy = Some(text()?),
                "proxyAutoconfigUrl" => proxy.pac_url = Some(text()?),
                other => {
                    return Err(Error::invalid_proxy(format!("unknown proxy key: {other:?}")));
                }
            }
        }

        Ok(proxy)
    }
}

// ============================================================================
// Proxy - Builder Methods
// ============================================================================

impl Proxy {
    /// Sets the HTTP proxy endpoint.
    #[inline]
    #[must_use]
    pub fn with_http(mut self, endpoint: impl Into<String>) -> Self {
        self.http = Some(endpoint.into());
        self
    }

    /// Sets the TLS proxy endpoint.
    #[inline]
    #[must_use]
    pub fn with_ssl(mut self, endpoint: impl Into<String>) -> Self {
        self.ssl = Some(endpoint.into());
        self
    }

    /// Sets the SOCKS proxy endpoint.
    #[inline]
    #[must_use]
    pub fn with_socks(mut self, endpoint: impl Into<String>) -> Self {
        self.socks = Some(endpoint.into());
        self
    }

    /// Sets the proxy bypass list.
    #[inline]
    #[must_use]
    pub fn with_no_proxy(mut self, hosts: impl Into<String>) -> Self {
        self.no_proxy = Some(hosts.into());
        self
    }
}

// ============================================================================
// Proxy - Conversion
// ============================================================================

impl Proxy {
    /// Serializes to the wire capability shape.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("proxyType".into(), json!(self.proxy_type.as_str()));

        let optional = [
            ("httpProxy", &self.http),
            ("sslProxy", &self.ssl),
            ("ftpProxy", &self.ftp),
            ("socksProxy", &self.socks),
            ("socksUsername", &self.socks_username),
            ("noProxy", &self.no_proxy),
            ("proxyAutoconfigUrl", &self.pac_url),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                map.insert(key.into(), json!(value));
            }
        }

        Value::Object(map)
    }
}

// ============================================================================
// Tests
// ============================================================================
