//! Wire command tables.
//!
//! A static mapping from semantic operation to (HTTP verb, URL template),
//! one table per protocol generation. Tables are process-wide, read-only,
//! and a bridge is bound to exactly one of them for its lifetime.
//!
//! URL templates use named path parameters (`:session_id`, `:id`, `:name`)
//! substituted at dispatch time:
//!
//! ```
//! use webdriver_bridge::protocol::{ProtocolKind, WireCommand, substitute};
//! use rustc_hash::FxHashMap;
//!
//! let spec = ProtocolKind::W3c.lookup(WireCommand::ClickElement).unwrap();
//! let mut params = FxHashMap::default();
//! params.insert("session_id", "s1".to_string());
//! params.insert("id", "abc123".to_string());
//!
//! let path = substitute(spec.template, &params).unwrap();
//! assert_eq!(path, "session/s1/element/abc123/click");
//! ```

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

// ============================================================================
// ProtocolKind
// ============================================================================

/// Protocol generation a bridge speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Legacy JSON Wire Protocol.
    Legacy,
    /// W3C WebDriver.
    W3c,
}

impl ProtocolKind {
    /// Returns the command table for this generation.
    #[inline]
    #[must_use]
    pub fn command_table(&self) -> &'static [CommandSpec] {
        match self {
            Self::Legacy => LEGACY_COMMANDS,
            Self::W3c => W3C_COMMANDS,
        }
    }

    /// Looks up the wire spec for a command in this generation's table.
    ///
    /// Returns `None` for commands the generation does not support.
    #[must_use]
    pub fn lookup(&self, command: WireCommand) -> Option<&'static CommandSpec> {
        self.command_table()
            .iter()
            .find(|spec| spec.command == command)
    }
}

// ============================================================================
// Verb
// ============================================================================

/// HTTP verb for a wire command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// HTTP GET.
    Get,
    /// HTTP POST.
    Post,
    /// HTTP DELETE.
    Delete,
}

impl Verb {
    /// Returns the HTTP method name.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

// ============================================================================
// WireCommand
// ============================================================================

/// Semantic operation names routed through the command tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireCommand {
    // Session
    /// Create a new session.
    NewSession,
    /// Remote end status.
    Status,
    /// End the session.
    Quit,
    /// Configure session timeouts.
    SetTimeouts,

    // Navigation
    /// Navigate to a URL.
    NavigateTo,
    /// Read the current URL.
    GetCurrentUrl,
    /// History back.
    GoBack,
    /// History forward.
    GoForward,
    /// Reload the page.
    Refresh,
    /// Read the page title.
    GetTitle,

    // Windows
    /// Current window handle.
    GetWindowHandle,
    /// All window handles.
    GetWindowHandles,
    /// Close the current window.
    CloseWindow,

    // Elements
    /// Find one element.
    FindElement,
    /// Find all matching elements.
    FindElements,
    /// Find one element below another.
    FindChildElement,
    /// Click an element.
    ClickElement,
    /// Clear an editable element.
    ClearElement,
    /// Type into an element.
    SendKeysToElement,
    /// Read an element's text.
    GetElementText,
    /// Read an element's tag name.
    GetElementTagName,
    /// Read an element attribute.
    GetElementAttribute,
    /// Whether an element is enabled.
    IsElementEnabled,

    // Script
    /// Execute synchronous script.
    ExecuteScript,
    /// Execute asynchronous script.
    ExecuteAsyncScript,

    // Alerts
    /// Read alert text.
    GetAlertText,
    /// Accept the open alert.
    AcceptAlert,
    /// Dismiss the open alert.
    DismissAlert,

    // Misc
    /// Viewport screenshot.
    TakeScreenshot,

    // W3C input pipeline
    /// Perform an actions sequence.
    PerformActions,
    /// Release all depressed inputs.
    ReleaseActions,

    // Legacy pointer/keyboard commands. Some drivers still expect these, so
    // the W3C bridge re-exposes them as shims rather than dropping them.
    /// Click at the current pointer position (legacy).
    Click,
    /// Double-click at the current pointer position (legacy).
    DoubleClick,
    /// Press the pointer button (legacy).
    ButtonDown,
    /// Release the pointer button (legacy).
    ButtonUp,
    /// Move the pointer (legacy).
    MoveTo,
    /// Type into the focused element (legacy).
    SendKeysToActiveElement,
}

impl WireCommand {
    /// Returns the semantic operation name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewSession => "newSession",
            Self::Status => "status",
            Self::Quit => "quit",
            Self::SetTimeouts => "setTimeouts",
            Self::NavigateTo => "navigateTo",
            Self::GetCurrentUrl => "getCurrentUrl",
            Self::GoBack => "goBack",
            Self::GoForward => "goForward",
            Self::Refresh => "refresh",
            Self::GetTitle => "getTitle",
            Self::GetWindowHandle => "getWindowHandle",
            Self::GetWindowHandles => "getWindowHandles",
            Self::CloseWindow => "closeWindow",
            Self::FindElement => "findElement",
            Self::FindElements => "findElements",
            Self::FindChildElement => "findChildElement",
            Self::ClickElement => "clickElement",
            Self::ClearElement => "clearElement",
            Self::SendKeysToElement => "sendKeysToElement",
            Self::GetElementText => "getElementText",
            Self::GetElementTagName => "getElementTagName",
            Self::GetElementAttribute => "getElementAttribute",
            Self::IsElementEnabled => "isElementEnabled",
            Self::ExecuteScript => "executeScript",
            Self::ExecuteAsyncScript => "executeAsyncScript",
            Self::GetAlertText => "getAlertText",
            Self::AcceptAlert => "acceptAlert",
            Self::DismissAlert => "dismissAlert",
            Self::TakeScreenshot => "takeScreenshot",
            Self::PerformActions => "performActions",
            Self::ReleaseActions => "releaseActions",
            Self::Click => "click",
            Self::DoubleClick => "doubleClick",
            Self::ButtonDown => "buttonDown",
            Self::ButtonUp => "buttonUp",
            Self::MoveTo => "moveTo",
            Self::SendKeysToActiveElement => "sendKeysToActiveElement",
        }
    }
}

// ============================================================================
// CommandSpec
// ============================================================================

/// One command table entry: semantic name, HTTP verb, URL template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    /// Semantic command.
    pub command: WireCommand,
    /// HTTP verb.
    pub verb: Verb,
    /// URL template with named path parameters.
    pub template: &'static str,
}

/// Shorthand for table construction.
const fn spec(command: WireCommand, verb: Verb, template: &'static str) -> CommandSpec {
    CommandSpec {
        command,
        verb,
        template,
    }
}

// ============================================================================
// Command Tables
// ============================================================================

use Verb::{Delete, Get, Post};
use WireCommand as C;

/// Legacy JSON Wire Protocol command table.
pub static LEGACY_COMMANDS: &[CommandSpec] = &[
    spec(C::NewSession, Post, "session"),
    spec(C::Status, Get, "status"),
    spec(C::Quit, Delete, "session/:session_id"),
    spec(C::SetTimeouts, Post, "session/:session_id/timeouts"),
    spec(C::NavigateTo, Post, "session/:session_id/url"),
    spec(C::GetCurrentUrl, Get, "session/:session_id/url"),
    spec(C::GoBack, Post, "session/:session_id/back"),
    spec(C::GoForward, Post, "session/:session_id/forward"),
    spec(C::Refresh, Post, "session/:session_id/refresh"),
    spec(C::GetTitle, Get, "session/:session_id/title"),
    spec(C::GetWindowHandle, Get, "session/:session_id/window_handle"),
    spec(C::GetWindowHandles, Get, "session/:session_id/window_handles"),
    spec(C::CloseWindow, Delete, "session/:session_id/window"),
    spec(C::FindElement, Post, "session/:session_id/element"),
    spec(C::FindElements, Post, "session/:session_id/elements"),
    spec(C::FindChildElement, Post, "session/:session_id/element/:id/element"),
    spec(C::ClickElement, Post, "session/:session_id/element/:id/click"),
    spec(C::ClearElement, Post, "session/:session_id/element/:id/clear"),
    spec(C::SendKeysToElement, Post, "session/:session_id/element/:id/value"),
    spec(C::GetElementText, Get, "session/:session_id/element/:id/text"),
    spec(C::GetElementTagName, Get, "session/:session_id/element/:id/name"),
    spec(C::GetElementAttribute, Get, "session/:session_id/element/:id/attribute/:name"),
    spec(C::IsElementEnabled, Get, "session/:session_id/element/:id/enabled"),
    spec(C::ExecuteScript, Post, "session/:session_id/execute"),
    spec(C::ExecuteAsyncScript, Post, "session/:session_id/execute_async"),
    spec(C::GetAlertText, Get, "session/:session_id/alert_text"),
    spec(C::AcceptAlert, Post, "session/:session_id/accept_alert"),
    spec(C::DismissAlert, Post, "session/:session_id/dismiss_alert"),
    spec(C::TakeScreenshot, Get, "session/:session_id/screenshot"),
    spec(C::Click, Post, "session/:session_id/click"),
    spec(C::DoubleClick, Post, "session/:session_id/doubleclick"),
    spec(C::ButtonDown, Post, "session/:session_id/buttondown"),
    spec(C::ButtonUp, Post, "session/:session_id/buttonup"),
    spec(C::MoveTo, Post, "session/:session_id/moveto"),
    spec(C::SendKeysToActiveElement, Post, "session/:session_id/keys"),
];

/// W3C WebDriver command table.
pub static W3C_COMMANDS: &[CommandSpec] = &[
    spec(C::NewSession, Post, "session"),
    spec(C::Status, Get, "status"),
    spec(C::Quit, Delete, "session/:session_id"),
    spec(C::SetTimeouts, Post, "session/:session_id/timeouts"),
    spec(C::NavigateTo, Post, "session/:session_id/url"),
    spec(C::GetCurrentUrl, Get, "session/:session_id/url"),
    spec(C::GoBack, Post, "session/:session_id/back"),
    spec(C::GoForward, Post, "session/:session_id/forward"),
    spec(C::Refresh, Post, "session/:session_id/refresh"),
    spec(C::GetTitle, Get, "session/:session_id/title"),
    spec(C::GetWindowHandle, Get, "session/:session_id/window"),
    spec(C::GetWindowHandles, Get, "session/:session_id/window/handles"),
    spec(C::CloseWindow, Delete, "session/:session_id/window"),
    spec(C::FindElement, Post, "session/:session_id/element"),
    spec(C::FindElements, Post, "session/:session_id/elements"),
    spec(C::FindChildElement, Post, "session/:session_id/element/:id/element"),
    spec(C::ClickElement, Post, "session/:session_id/element/:id/click"),
    spec(C::ClearElement, Post, "session/:session_id/element/:id/clear"),
    spec(C::SendKeysToElement, Post, "session/:session_id/element/:id/value"),
    spec(C::GetElementText, Get, "session/:session_id/element/:id/text"),
    spec(C::GetElementTagName, Get, "session/:session_id/element/:id/name"),
    spec(C::GetElementAttribute, Get, "session/:session_id/element/:id/attribute/:name"),
    spec(C::IsElementEnabled, Get, "session/:session_id/element/:id/enabled"),
    spec(C::ExecuteScript, Post, "session/:session_id/execute/sync"),
    spec(C::ExecuteAsyncScript, Post, "session/:session_id/execute/async"),
    spec(C::GetAlertText, Get, "session/:session_id/alert/text"),
    spec(C::AcceptAlert, Post, "session/:session_id/alert/accept"),
    spec(C::DismissAlert, Post, "session/:session_id/alert/dismiss"),
    spec(C::TakeScreenshot, Get, "session/:session_id/screenshot"),
    spec(C::PerformActions, Post, "session/:session_id/actions"),
    spec(C::ReleaseActions, Delete, "session/:session_id/actions"),
];

// ============================================================================
// Template Substitution
// ============================================================================

/// Substitutes named path parameters into a URL template.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] when the template references a
/// parameter missing from `params`.
pub fn substitute(template: &str, params: &FxHashMap<&str, String>) -> Result<String> {
    let mut segments = Vec::new();
    for segment in template.split('/') {
        if let Some(name) = segment.strip_prefix(':') {
            let value = params.get(name).ok_or_else(|| {
                Error::invalid_argument(format!("missing URL parameter :{name} for {template}"))
            })?;
            segments.push(value.as_str());
        } else {
            segments.push(segment);
        }
    }
    Ok(segments.join("/"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&'static str, &str)]) -> FxHashMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn test_tables_have_no_duplicate_commands() {
        for table in [LEGACY_COMMANDS, W3C_COMMANDS] {
            for (i, spec) in table.iter().enumerate() {
                assert!(
                    !table[i + 1..].iter().any(|s| s.command == spec.command),
                    "duplicate entry for {}",
                    spec.command.as_str()
                );
            }
        }
    }

    #[test]
    fn test_lookup_protocol_divergence() {
        let legacy = ProtocolKind::Legacy.lookup(WireCommand::ExecuteScript).unwrap();
        let w3c = ProtocolKind::W3c.lookup(WireCommand::ExecuteScript).unwrap();

        assert_eq!(legacy.template, "session/:session_id/execute");
        assert_eq!(w3c.template, "session/:session_id/execute/sync");
        assert_eq!(legacy.verb, Verb::Post);
        assert_eq!(w3c.verb, Verb::Post);
    }

    #[test]
    fn test_legacy_only_commands_absent_from_w3c() {
        for command in [
            WireCommand::Click,
            WireCommand::DoubleClick,
            WireCommand::ButtonDown,
            WireCommand::ButtonUp,
            WireCommand::MoveTo,
            WireCommand::SendKeysToActiveElement,
        ] {
            assert!(ProtocolKind::Legacy.lookup(command).is_some());
            assert!(ProtocolKind::W3c.lookup(command).is_none());
        }
    }

    #[test]
    fn test_actions_absent_from_legacy() {
        assert!(ProtocolKind::W3c.lookup(WireCommand::PerformActions).is_some());
        assert!(ProtocolKind::Legacy.lookup(WireCommand::PerformActions).is_none());
    }

    #[test]
    fn test_substitute_click_template() {
        let path = substitute(
            "session/:session_id/element/:id/click",
            &params(&[("session_id", "s1"), ("id", "abc123")]),
        )
        .unwrap();

        assert_eq!(path, "session/s1/element/abc123/click");
    }

    #[test]
    fn test_substitute_attribute_template() {
        let path = substitute(
            "session/:session_id/element/:id/attribute/:name",
            &params(&[("session_id", "s1"), ("id", "e9"), ("name", "href")]),
        )
        .unwrap();

        assert_eq!(path, "session/s1/element/e9/attribute/href");
    }

    #[test]
    fn test_substitute_missing_param_fails() {
        let err = substitute("session/:session_id/url", &params(&[])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert!(err.to_string().contains(":session_id"));
    }

    #[test]
    fn test_every_entry_substitutes_with_full_params() {
        let full = params(&[("session_id", "s1"), ("id", "abc123"), ("name", "href")]);
        for table in [LEGACY_COMMANDS, W3C_COMMANDS] {
            for spec in table {
                let path = substitute(spec.template, &full).unwrap();
                assert!(!path.contains(':'), "unsubstituted param in {path}");
            }
        }
    }

    #[test]
    fn test_verb_as_str() {
        assert_eq!(Verb::Get.as_str(), "GET");
        assert_eq!(Verb::Post.as_str(), "POST");
        assert_eq!(Verb::Delete.as_str(), "DELETE");
    }
}
