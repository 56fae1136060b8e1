//! Capability sets and merge semantics.
//!
//! A [`Capabilities`] value is the negotiated, wire-serializable description
//! of a browser session. Keys may be written in snake_case or camelCase;
//! they are normalized to the wire form (camelCase) exactly once, on
//! insertion, and two spellings of the same key always refer to a single
//! entry.
//!
//! Merging is overlay-wins and deliberately non-commutative:
//!
//! ```
//! use webdriver_bridge::Capabilities;
//! use serde_json::json;
//!
//! let mut base = Capabilities::firefox();
//! base.set("accept_insecure_certs", json!(false)).unwrap();
//!
//! let mut overlay = Capabilities::new();
//! overlay.set("acceptInsecureCerts", json!(true)).unwrap();
//!
//! let merged = base.merge(&overlay);
//! assert_eq!(merged.get("accept_insecure_certs"), Some(&json!(true)));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

use super::proxy::Proxy;

// ============================================================================
// Constants
// ============================================================================

/// Capability keys the W3C protocol accepts, in wire form.
///
/// Vendor-prefixed keys (containing `:`) are additionally allowed; anything
/// else is rejected by [`Capabilities::validate_w3c`]. The legacy protocol
/// is permissive by design and accepts arbitrary keys.
pub const VALID_W3C: &[&str] = &[
    "browserName",
    "browserVersion",
    "platformName",
    "acceptInsecureCerts",
    "pageLoadStrategy",
    "proxy",
    "setWindowRect",
    "timeouts",
    "unhandledPromptBehavior",
    "strictFileInteractability",
];

// ============================================================================
// Key Normalization
// ============================================================================

/// Converts a snake_case capability key to the camelCase wire form.
///
/// Keys that are already camelCase or vendor-prefixed pass through
/// unchanged.
#[must_use]
pub fn camel_case(key: &str) -> String {
    if !key.contains('_') {
        return key.to_string();
    }

    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// ============================================================================
// Capabilities
// ============================================================================

/// A capability set: capability key to JSON-compatible value.
///
/// Values are strings, booleans, numbers, nested mappings, or opaque blobs
/// such as an encoded profile. Proxy values are upgraded to the structured
/// [`Proxy`] shape when set, so serialization can never fail on them.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    /// Entries keyed by normalized wire key.
    entries: Map<String, Value>,
}

// ============================================================================
// Capabilities - Constructors
// ============================================================================

impl Capabilities {
    /// Creates an empty capability set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Default capabilities for a Firefox session.
    #[must_use]
    pub fn firefox() -> Self {
        let mut caps = Self::new();
        caps.entries.insert("browserName".into(), json!("firefox"));
        caps
    }

    /// Default capabilities for a Chrome session.
    #[must_use]
    pub fn chrome() -> Self {
        let mut caps = Self::new();
        caps.entries.insert("browserName".into(), json!("chrome"));
        caps
    }

    /// Builds a capability set from a wire payload.
    ///
    /// Used for the *accepted* capabilities returned by session creation.
    /// Values are recorded as-is, with none of the validation [`set`]
    /// applies on the outbound path: the remote end has already accepted
    /// them, and a server echoing a proxy object with a vendor extra must
    /// not fail a session that exists.
    ///
    /// [`set`]: Capabilities::set
    #[must_use]
    pub fn from_wire(map: &Map<String, Value>) -> Self {
        let mut caps = Self::new();
        for (key, value) in map {
            caps.entries.insert(camel_case(key), value.clone());
        }
        caps
    }
}

// ============================================================================
// Capabilities - Accessors
// ============================================================================

impl Capabilities {
    /// Sets a capability, replacing any existing entry for the same key in
    /// either spelling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidProxy`] when the key is `proxy` and the
    /// value does not validate to a known proxy shape.
    pub fn set(&mut self, key: impl AsRef<str>, value: Value) -> Result<()> {
        let key = camel_case(key.as_ref());
        let value = if key == "proxy" {
            Proxy::from_json(&value)?.to_wire()
        } else {
            value
        };
        self.entries.insert(key, value);
        Ok(())
    }

    /// Sets the proxy capability from a validated [`Proxy`].
    #[inline]
    pub fn set_proxy(&mut self, proxy: &Proxy) {
        self.entries.insert("proxy".into(), proxy.to_wire());
    }

    /// Returns the value for a key, in either spelling.
    #[inline]
    #[must_use]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&Value> {
        self.entries.get(&camel_case(key.as_ref()))
    }

    /// Returns `true` if no capabilities are set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of capabilities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ============================================================================
// Capabilities - Merge
// ============================================================================

impl Capabilities {
    /// Merges `overlay` onto this set, producing a new set.
    ///
    /// Overlay wins: every key present in `overlay` overrides the base
    /// value, keys absent from `overlay` are preserved. The operation is
    /// not commutative.
    #[must_use]
    pub fn merge(&self, overlay: &Capabilities) -> Capabilities {
        let mut merged = self.clone();
        for (key, value) in &overlay.entries {
            merged.entries.insert(key.clone(), value.clone());
        }
        merged
    }
}

// ============================================================================
// Capabilities - Validation
// ============================================================================

impl Capabilities {
    /// Validates this set against the fixed W3C key set.
    ///
    /// Vendor-prefixed keys are always allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCapability`] naming the first key that
    /// is neither standard nor vendor-prefixed.
    pub fn validate_w3c(&self) -> Result<()> {
        for key in self.entries.keys() {
            if !VALID_W3C.contains(&key.as_str()) && !key.contains(':') {
                return Err(Error::unsupported_capability(key));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Capabilities - Conversion
// ============================================================================

impl Capabilities {
    /// Serializes to the wire capability mapping.
    ///
    /// Keys are already held in wire form, so this is the single
    /// normalization point promised by the module contract.
    #[must_use]
    pub fn to_wire(&self) -> Map<String, Value> {
        self.entries.clone()
    }
}

impl PartialEq for Capabilities {
    /// Wire-shape equality: two sets are equal when they serialize to the
    /// same payload.
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for Capabilities {}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.entries.clone()))
    }
}

// ============================================================================
// Tests
// ============================================================================
