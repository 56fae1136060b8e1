//! Protocol bridge.
//!
//! A [`Bridge`] owns one remote session and translates typed operations
//! into wire commands through its generation's command table. It tracks a
//! three-state lifecycle:
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Unstarted` | constructed, no session on the remote end |
//! | `Active` | session created, commands may be dispatched |
//! | `Quit` | session ended locally, all commands rejected |
//!
//! The legacy generation still exposes the old pointer and keyboard
//! endpoints. On W3C those endpoints do not exist, so the same operations
//! are re-expressed as `performActions` sequences and callers never see
//! the difference.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rustc_hash::FxHashMap;
use serde_json::{Map, Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::transport::HttpClient;

use super::commands::{ProtocolKind, WireCommand};
use super::envelope::{self, WireResponse};

// ============================================================================
// SessionState
// ============================================================================

/// Lifecycle state of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session exists yet.
    Unstarted,
    /// Session is live.
    Active,
    /// Session has ended; the bridge cannot be reused.
    Quit,
}

// ============================================================================
// Timeouts
// ============================================================================

/// Session timeout configuration. Unset fields are left unchanged on the
/// remote end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    /// Implicit element-location wait, in milliseconds.
    pub implicit_ms: Option<u64>,
    /// Page load limit, in milliseconds.
    pub page_load_ms: Option<u64>,
    /// Script execution limit, in milliseconds.
    pub script_ms: Option<u64>,
}

// ============================================================================
// DriverCommands
// ============================================================================

/// The typed command surface of a session.
///
/// [`Bridge`] is the concrete implementation; decorators wrap a boxed
/// `DriverCommands` and forward every method explicitly.
#[async_trait]
pub trait DriverCommands: Send {
    /// Navigates to `url`.
    async fn navigate_to(&mut self, url: &str) -> Result<()>;
    /// Returns the current URL.
    async fn current_url(&mut self) -> Result<String>;
    /// Moves one step back in history.
    async fn back(&mut self) -> Result<()>;
    /// Moves one step forward in history.
    async fn forward(&mut self) -> Result<()>;
    /// Reloads the current page.
    async fn refresh(&mut self) -> Result<()>;
    /// Returns the page title.
    async fn title(&mut self) -> Result<String>;

    /// Returns the current window handle.
    async fn window_handle(&mut self) -> Result<String>;
    /// Returns all window handles.
    async fn window_handles(&mut self) -> Result<Vec<String>>;
    /// Closes the current window.
    async fn close_window(&mut self) -> Result<()>;

    /// Finds one element, returning its reference id.
    async fn find_element(&mut self, using: &str, value: &str) -> Result<String>;
    /// Finds all matching elements.
    async fn find_elements(&mut self, using: &str, value: &str) -> Result<Vec<String>>;
    /// Finds one element below `parent`.
    async fn find_child_element(&mut self, parent: &str, using: &str, value: &str)
    -> Result<String>;
    /// Clicks an element.
    async fn click_element(&mut self, id: &str) -> Result<()>;
    /// Clears an editable element.
    async fn clear_element(&mut self, id: &str) -> Result<()>;
    /// Types `text` into an element.
    async fn send_keys_to_element(&mut self, id: &str, text: &str) -> Result<()>;
    /// Returns an element's visible text.
    async fn element_text(&mut self, id: &str) -> Result<String>;
    /// Returns an element's tag name.
    async fn element_tag_name(&mut self, id: &str) -> Result<String>;
    /// Returns an element attribute, `None` when unset.
    async fn element_attribute(&mut self, id: &str, name: &str) -> Result<Option<String>>;
    /// Whether an element is enabled.
    async fn element_enabled(&mut self, id: &str) -> Result<bool>;

    /// Executes synchronous script with JSON arguments.
    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;
    /// Executes asynchronous script with JSON arguments.
    async fn execute_async_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value>;

    /// Returns the open alert's text.
    async fn alert_text(&mut self) -> Result<String>;
    /// Accepts the open alert.
    async fn accept_alert(&mut self) -> Result<()>;
    /// Dismisses the open alert.
    async fn dismiss_alert(&mut self) -> Result<()>;

    /// Takes a viewport screenshot, returning decoded PNG bytes.
    async fn screenshot(&mut self) -> Result<Vec<u8>>;
    /// Applies session timeouts.
    async fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<()>;

    /// Clicks at the current pointer position.
    async fn click(&mut self, button: u64) -> Result<()>;
    /// Double-clicks at the current pointer position.
    async fn double_click(&mut self) -> Result<()>;
    /// Presses the primary pointer button.
    async fn button_down(&mut self) -> Result<()>;
    /// Releases the primary pointer button.
    async fn button_up(&mut self) -> Result<()>;
    /// Moves the pointer to an element and/or offset.
    async fn move_to(&mut self, element: Option<&str>, x: i64, y: i64) -> Result<()>;
    /// Types into the focused element.
    async fn send_keys(&mut self, text: &str) -> Result<()>;

    /// Ends the session.
    async fn quit(&mut self) -> Result<()>;
}

// ============================================================================
// Bridge
// ============================================================================

/// Wire-level session handle, bound to one protocol generation.
pub struct Bridge {
    http: Arc<dyn HttpClient>,
    server_url: Url,
    kind: ProtocolKind,
    state: SessionState,
    session_id: Option<String>,
    capabilities: Capabilities,
}

// ============================================================================
// Bridge - Construction & Accessors
// ============================================================================

impl Bridge {
    /// Creates an unstarted bridge against `server_url`.
    #[must_use]
    pub fn new(server_url: Url, kind: ProtocolKind, http: Arc<dyn HttpClient>) -> Self {
        let mut server_url = server_url;
        // Template paths are joined as relative references.
        if !server_url.path().ends_with('/') {
            let path = format!("{}/", server_url.path());
            server_url.set_path(&path);
        }
        Self {
            http,
            server_url,
            kind,
            state: SessionState::Unstarted,
            session_id: None,
            capabilities: Capabilities::new(),
        }
    }

    /// Protocol generation this bridge speaks.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> ProtocolKind {
        self.kind
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Remote session id, `None` unless active.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Capabilities the remote end accepted at session creation.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Wraps an element id as a script argument in this generation's shape.
    #[must_use]
    pub fn element_arg(&self, id: &str) -> Value {
        match self.kind {
            ProtocolKind::Legacy => json!({ envelope::LEGACY_ELEMENT_KEY: id }),
            ProtocolKind::W3c => json!({ envelope::W3C_ELEMENT_KEY: id }),
        }
    }
}

// ============================================================================
// Bridge - Session Lifecycle
// ============================================================================

impl Bridge {
    /// Creates the remote session from the negotiated capabilities.
    ///
    /// The W3C generation validates the capability set against the fixed
    /// W3C key set before anything is sent; the legacy generation is
    /// permissive and forwards the set as-is.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionState`] if a session was already created on
    /// this bridge, [`Error::UnsupportedCapability`] on W3C validation
    /// failure, or the remote end's error.
    pub async fn create_session(&mut self, capabilities: &Capabilities) -> Result<()> {
        if self.state != SessionState::Unstarted {
            return Err(Error::session_state("session was already created"));
        }

        let payload = match self.kind {
            ProtocolKind::Legacy => json!({ "desiredCapabilities": capabilities.to_wire() }),
            ProtocolKind::W3c => {
                capabilities.validate_w3c()?;
                json!({ "capabilities": { "alwaysMatch": capabilities.to_wire() } })
            }
        };

        let response = self
            .dispatch(WireCommand::NewSession, &[], Some(payload))
            .await?;

        let (session_id, accepted) = match self.kind {
            ProtocolKind::Legacy => (response.session_id.clone(), response.value.clone()),
            ProtocolKind::W3c => (
                response
                    .value
                    .get("sessionId")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                response
                    .value
                    .get("capabilities")
                    .cloned()
                    .unwrap_or(Value::Null),
            ),
        };

        let Some(session_id) = session_id else {
            return Err(Error::SessionNotCreated {
                message: format!("response carried no session id: {}", response.value),
            });
        };

        if let Some(map) = accepted.as_object() {
            self.capabilities = Capabilities::from_wire(map);
        }
        debug!(session_id, protocol = ?self.kind, "session created");
        self.session_id = Some(session_id);
        self.state = SessionState::Active;
        Ok(())
    }

    /// Remote end readiness. Allowed in any lifecycle state.
    ///
    /// # Errors
    ///
    /// Returns the transport or remote error.
    pub async fn status(&self) -> Result<Value> {
        let response = self.dispatch(WireCommand::Status, &[], None).await?;
        Ok(response.value)
    }

    /// Raw command execution: looks the command up in this generation's
    /// table, substitutes `params` into the URL template, and returns the
    /// unwrapped `value`. The escape hatch for commands without a typed
    /// wrapper; requires an active session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionState`] outside the active state,
    /// [`Error::InvalidArgument`] for a command missing from this
    /// generation's table, or the remote end's error.
    pub async fn execute(
        &self,
        command: WireCommand,
        params: &[(&'static str, &str)],
        body: Option<Value>,
    ) -> Result<Value> {
        let response = self.session_dispatch(command, params, body).await?;
        Ok(response.value)
    }
}

// ============================================================================
// Bridge - Dispatch
// ============================================================================

impl Bridge {
    /// Sends one wire command and decodes its envelope.
    ///
    /// `params` supplies non-session path parameters; the session id is
    /// filled in automatically when the template needs it.
    async fn dispatch(
        &self,
        command: WireCommand,
        params: &[(&'static str, &str)],
        body: Option<Value>,
    ) -> Result<WireResponse> {
        let spec = self.kind.lookup(command).ok_or_else(|| {
            Error::invalid_argument(format!(
                "command {} is not defined for {:?}",
                command.as_str(),
                self.kind
            ))
        })?;

        let mut path_params: FxHashMap<&str, String> = FxHashMap::default();
        if let Some(id) = &self.session_id {
            path_params.insert("session_id", id.clone());
        }
        for &(name, value) in params {
            path_params.insert(name, value.to_string());
        }

        let path = super::commands::substitute(spec.template, &path_params)?;
        let url = self
            .server_url
            .join(&path)
            .map_err(|e| Error::invalid_argument(format!("bad command URL {path}: {e}")))?;

        debug!(command = command.as_str(), verb = spec.verb.as_str(), %url, "dispatch");
        let raw = self.http.call(spec.verb, url, body.as_ref()).await?;
        envelope::parse(self.kind, raw.status, raw.body)
    }

    /// Dispatch for post-creation commands; rejects non-active states.
    async fn session_dispatch(
        &self,
        command: WireCommand,
        params: &[(&'static str, &str)],
        body: Option<Value>,
    ) -> Result<WireResponse> {
        match self.state {
            SessionState::Active => self.dispatch(command, params, body).await,
            SessionState::Unstarted => Err(Error::session_state(format!(
                "cannot send {} before the session is created",
                command.as_str()
            ))),
            SessionState::Quit => Err(Error::session_state(format!(
                "cannot send {} after quit",
                command.as_str()
            ))),
        }
    }

    async fn string_value(
        &self,
        command: WireCommand,
        params: &[(&'static str, &str)],
    ) -> Result<String> {
        let response = self.session_dispatch(command, params, None).await?;
        response
            .value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::UnknownError {
                code: "invalid response".into(),
                message: format!("expected string value, got {}", response.value),
            })
    }

    /// Sends a W3C actions sequence.
    async fn perform_actions(&self, actions: Value) -> Result<()> {
        self.session_dispatch(
            WireCommand::PerformActions,
            &[],
            Some(json!({ "actions": [actions] })),
        )
        .await?;
        Ok(())
    }
}

// ============================================================================
// Bridge - Action Payloads
// ============================================================================

/// One-shot pointer sequence over the default mouse input.
fn pointer_sequence(actions: Vec<Value>) -> Value {
    json!({
        "type": "pointer",
        "id": "mouse",
        "parameters": { "pointerType": "mouse" },
        "actions": actions,
    })
}

/// Key sequence typing `text` as down/up pairs.
fn key_sequence(text: &str) -> Value {
    let mut actions = Vec::with_capacity(text.chars().count() * 2);
    for ch in text.chars() {
        let value = ch.to_string();
        actions.push(json!({ "type": "keyDown", "value": value }));
        actions.push(json!({ "type": "keyUp", "value": value }));
    }
    json!({ "type": "key", "id": "keyboard", "actions": actions })
}

// ============================================================================
// Bridge - DriverCommands
// ============================================================================

#[async_trait]
impl DriverCommands for Bridge {
    async fn navigate_to(&mut self, url: &str) -> Result<()> {
        self.session_dispatch(WireCommand::NavigateTo, &[], Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.string_value(WireCommand::GetCurrentUrl, &[]).await
    }

    async fn back(&mut self) -> Result<()> {
        self.session_dispatch(WireCommand::GoBack, &[], None).await?;
        Ok(())
    }

    async fn forward(&mut self) -> Result<()> {
        self.session_dispatch(WireCommand::GoForward, &[], None)
            .await?;
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        self.session_dispatch(WireCommand::Refresh, &[], None)
            .await?;
        Ok(())
    }

    async fn title(&mut self) -> Result<String> {
        self.string_value(WireCommand::GetTitle, &[]).await
    }

    async fn window_handle(&mut self) -> Result<String> {
        self.string_value(WireCommand::GetWindowHandle, &[]).await
    }

    async fn window_handles(&mut self) -> Result<Vec<String>> {
        let response = self
            .session_dispatch(WireCommand::GetWindowHandles, &[], None)
            .await?;
        let handles = response
            .value
            .as_array()
            .ok_or_else(|| Error::UnknownError {
                code: "invalid response".into(),
                message: format!("expected handle array, got {}", response.value),
            })?;
        Ok(handles
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect())
    }

    async fn close_window(&mut self) -> Result<()> {
        self.session_dispatch(WireCommand::CloseWindow, &[], None)
            .await?;
        Ok(())
    }

    async fn find_element(&mut self, using: &str, value: &str) -> Result<String> {
        let response = self
            .session_dispatch(
                WireCommand::FindElement,
                &[],
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        envelope::element_id(self.kind, &response.value)
    }

    async fn find_elements(&mut self, using: &str, value: &str) -> Result<Vec<String>> {
        let response = self
            .session_dispatch(
                WireCommand::FindElements,
                &[],
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        let raw = response
            .value
            .as_array()
            .ok_or_else(|| Error::UnknownError {
                code: "invalid response".into(),
                message: format!("expected element array, got {}", response.value),
            })?;
        raw.iter()
            .map(|entry| envelope::element_id(self.kind, entry))
            .collect()
    }

    async fn find_child_element(
        &mut self,
        parent: &str,
        using: &str,
        value: &str,
    ) -> Result<String> {
        let response = self
            .session_dispatch(
                WireCommand::FindChildElement,
                &[("id", parent)],
                Some(json!({ "using": using, "value": value })),
            )
            .await?;
        envelope::element_id(self.kind, &response.value)
    }

    async fn click_element(&mut self, id: &str) -> Result<()> {
        self.session_dispatch(WireCommand::ClickElement, &[("id", id)], None)
            .await?;
        Ok(())
    }

    async fn clear_element(&mut self, id: &str) -> Result<()> {
        self.session_dispatch(WireCommand::ClearElement, &[("id", id)], None)
            .await?;
        Ok(())
    }

    async fn send_keys_to_element(&mut self, id: &str, text: &str) -> Result<()> {
        let body = match self.kind {
            // Legacy drivers take the keystrokes as a character array.
            ProtocolKind::Legacy => {
                json!({ "value": text.chars().map(String::from).collect::<Vec<_>>() })
            }
            ProtocolKind::W3c => json!({ "text": text }),
        };
        self.session_dispatch(WireCommand::SendKeysToElement, &[("id", id)], Some(body))
            .await?;
        Ok(())
    }

    async fn element_text(&mut self, id: &str) -> Result<String> {
        self.string_value(WireCommand::GetElementText, &[("id", id)])
            .await
    }

    async fn element_tag_name(&mut self, id: &str) -> Result<String> {
        self.string_value(WireCommand::GetElementTagName, &[("id", id)])
            .await
    }

    async fn element_attribute(&mut self, id: &str, name: &str) -> Result<Option<String>> {
        let response = self
            .session_dispatch(
                WireCommand::GetElementAttribute,
                &[("id", id), ("name", name)],
                None,
            )
            .await?;
        Ok(response.value.as_str().map(str::to_string))
    }

    async fn element_enabled(&mut self, id: &str) -> Result<bool> {
        let response = self
            .session_dispatch(WireCommand::IsElementEnabled, &[("id", id)], None)
            .await?;
        Ok(response.value.as_bool().unwrap_or(false))
    }

    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        let response = self
            .session_dispatch(
                WireCommand::ExecuteScript,
                &[],
                Some(json!({ "script": script, "args": args })),
            )
            .await?;
        Ok(response.value)
    }

    async fn execute_async_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        let response = self
            .session_dispatch(
                WireCommand::ExecuteAsyncScript,
                &[],
                Some(json!({ "script": script, "args": args })),
            )
            .await?;
        Ok(response.value)
    }

    async fn alert_text(&mut self) -> Result<String> {
        self.string_value(WireCommand::GetAlertText, &[]).await
    }

    async fn accept_alert(&mut self) -> Result<()> {
        self.session_dispatch(WireCommand::AcceptAlert, &[], None)
            .await?;
        Ok(())
    }

    async fn dismiss_alert(&mut self) -> Result<()> {
        self.session_dispatch(WireCommand::DismissAlert, &[], None)
            .await?;
        Ok(())
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        let encoded = self.string_value(WireCommand::TakeScreenshot, &[]).await?;
        BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| Error::invalid_argument(format!("screenshot is not valid base64: {e}")))
    }

    async fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<()> {
        match self.kind {
            // Legacy takes one call per timeout kind.
            ProtocolKind::Legacy => {
                let pairs = [
                    ("implicit", timeouts.implicit_ms),
                    ("page load", timeouts.page_load_ms),
                    ("script", timeouts.script_ms),
                ];
                for (kind, ms) in pairs {
                    if let Some(ms) = ms {
                        self.session_dispatch(
                            WireCommand::SetTimeouts,
                            &[],
                            Some(json!({ "type": kind, "ms": ms })),
                        )
                        .await?;
                    }
                }
            }
            ProtocolKind::W3c => {
                let mut body = Map::new();
                if let Some(ms) = timeouts.implicit_ms {
                    body.insert("implicit".into(), json!(ms));
                }
                if let Some(ms) = timeouts.page_load_ms {
                    body.insert("pageLoad".into(), json!(ms));
                }
                if let Some(ms) = timeouts.script_ms {
                    body.insert("script".into(), json!(ms));
                }
                if !body.is_empty() {
                    self.session_dispatch(
                        WireCommand::SetTimeouts,
                        &[],
                        Some(Value::Object(body)),
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }

    async fn click(&mut self, button: u64) -> Result<()> {
        match self.kind {
            ProtocolKind::Legacy => {
                self.session_dispatch(WireCommand::Click, &[], Some(json!({ "button": button })))
                    .await?;
                Ok(())
            }
            ProtocolKind::W3c => {
                self.perform_actions(pointer_sequence(vec![
                    json!({ "type": "pointerDown", "button": button }),
                    json!({ "type": "pointerUp", "button": button }),
                ]))
                .await
            }
        }
    }

    async fn double_click(&mut self) -> Result<()> {
        match self.kind {
            ProtocolKind::Legacy => {
                self.session_dispatch(WireCommand::DoubleClick, &[], None)
                    .await?;
                Ok(())
            }
            ProtocolKind::W3c => {
                self.perform_actions(pointer_sequence(vec![
                    json!({ "type": "pointerDown", "button": 0 }),
                    json!({ "type": "pointerUp", "button": 0 }),
                    json!({ "type": "pointerDown", "button": 0 }),
                    json!({ "type": "pointerUp", "button": 0 }),
                ]))
                .await
            }
        }
    }

    async fn button_down(&mut self) -> Result<()> {
        match self.kind {
            ProtocolKind::Legacy => {
                self.session_dispatch(WireCommand::ButtonDown, &[], None)
                    .await?;
                Ok(())
            }
            ProtocolKind::W3c => {
                self.perform_actions(pointer_sequence(vec![
                    json!({ "type": "pointerDown", "button": 0 }),
                ]))
                .await
            }
        }
    }

    async fn button_up(&mut self) -> Result<()> {
        match self.kind {
            ProtocolKind::Legacy => {
                self.session_dispatch(WireCommand::ButtonUp, &[], None)
                    .await?;
                Ok(())
            }
            ProtocolKind::W3c => {
                self.perform_actions(pointer_sequence(vec![
                    json!({ "type": "pointerUp", "button": 0 }),
                ]))
                .await
            }
        }
    }

    async fn move_to(&mut self, element: Option<&str>, x: i64, y: i64) -> Result<()> {
        match self.kind {
            ProtocolKind::Legacy => {
                let mut body = Map::new();
                if let Some(id) = element {
                    body.insert("element".into(), json!(id));
                }
                body.insert("xoffset".into(), json!(x));
                body.insert("yoffset".into(), json!(y));
                self.session_dispatch(WireCommand::MoveTo, &[], Some(Value::Object(body)))
                    .await?;
                Ok(())
            }
            ProtocolKind::W3c => {
                let origin = match element {
                    Some(id) => self.element_arg(id),
                    None => json!("pointer"),
                };
                self.perform_actions(pointer_sequence(vec![json!({
                    "type": "pointerMove",
                    "duration": 100,
                    "origin": origin,
                    "x": x,
                    "y": y,
                })]))
                .await
            }
        }
    }

    async fn send_keys(&mut self, text: &str) -> Result<()> {
        match self.kind {
            ProtocolKind::Legacy => {
                self.session_dispatch(
                    WireCommand::SendKeysToActiveElement,
                    &[],
                    Some(json!({ "value": text.chars().map(String::from).collect::<Vec<_>>() })),
                )
                .await?;
                Ok(())
            }
            ProtocolKind::W3c => self.perform_actions(key_sequence(text)).await,
        }
    }

    /// Ends the session.
    ///
    /// Transport failures are swallowed: the browser may already be gone,
    /// and teardown must not mask the error that got us here. Protocol
    /// errors still propagate. Either way the bridge transitions to
    /// `Quit` and repeated calls are no-ops.
    async fn quit(&mut self) -> Result<()> {
        if self.state != SessionState::Active {
            return Ok(());
        }

        let result = self.dispatch(WireCommand::Quit, &[], None).await;
        self.state = SessionState::Quit;
        self.session_id = None;

        match result {
            Ok(_) => Ok(()),
            Err(err) if err.is_transport_error() => {
                warn!(error = %err, "ignoring transport error during quit");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;

    use parking_lot::Mutex;

    use crate::protocol::Verb;
    use crate::transport::HttpResponse;

    /// Scripted transport: records calls, replays queued responses.
    struct ScriptedClient {
        calls: Mutex<Vec<(Verb, String, Option<Value>)>>,
        replies: Mutex<VecDeque<Result<HttpResponse>>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<HttpResponse>>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies.into()),
            })
        }

        fn calls(&self) -> Vec<(Verb, String, Option<Value>)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn call(&self, verb: Verb, url: Url, body: Option<&Value>) -> Result<HttpResponse> {
            self.calls
                .lock()
                .push((verb, url.to_string(), body.cloned()));
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected request to {url}"))
        }
    }

    fn ok(body: Value) -> Result<HttpResponse> {
        Ok(HttpResponse {
            status: 200,
            body: Some(body),
        })
    }

    fn transport_err() -> Result<HttpResponse> {
        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        )))
    }

    fn base_url() -> Url {
        Url::parse("http://127.0.0.1:4444").unwrap()
    }

    fn w3c_session_reply() -> Result<HttpResponse> {
        ok(json!({
            "value": {
                "sessionId": "s1",
                "capabilities": { "browserName": "firefox", "acceptInsecureCerts": true },
            }
        }))
    }

    fn legacy_session_reply() -> Result<HttpResponse> {
        ok(json!({
            "sessionId": "s1",
            "status": 0,
            "value": { "browserName": "chrome" },
        }))
    }

    async fn active_w3c(replies: Vec<Result<HttpResponse>>) -> (Bridge, Arc<ScriptedClient>) {
        let mut all = vec![w3c_session_reply()];
        all.extend(replies);
        let client = ScriptedClient::new(all);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::W3c, client.clone());
        bridge.create_session(&Capabilities::firefox()).await.unwrap();
        (bridge, client)
    }

    async fn active_legacy(replies: Vec<Result<HttpResponse>>) -> (Bridge, Arc<ScriptedClient>) {
        let mut all = vec![legacy_session_reply()];
        all.extend(replies);
        let client = ScriptedClient::new(all);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::Legacy, client.clone());
        bridge.create_session(&Capabilities::chrome()).await.unwrap();
        (bridge, client)
    }

    #[tokio::test]
    async fn test_w3c_session_creation_payload_and_state() {
        let client = ScriptedClient::new(vec![w3c_session_reply()]);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::W3c, client.clone());
        assert_eq!(bridge.state(), SessionState::Unstarted);

        bridge.create_session(&Capabilities::firefox()).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, Verb::Post);
        assert_eq!(calls[0].1, "http://127.0.0.1:4444/session");
        assert_eq!(
            calls[0].2.as_ref().unwrap()["capabilities"]["alwaysMatch"]["browserName"],
            "firefox"
        );

        assert_eq!(bridge.state(), SessionState::Active);
        assert_eq!(bridge.session_id(), Some("s1"));
        assert_eq!(
            bridge.capabilities().get("acceptInsecureCerts"),
            Some(&json!(true))
        );
    }

    #[tokio::test]
    async fn test_legacy_session_creation_payload() {
        let client = ScriptedClient::new(vec![legacy_session_reply()]);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::Legacy, client.clone());

        bridge.create_session(&Capabilities::chrome()).await.unwrap();

        let calls = client.calls();
        assert_eq!(
            calls[0].2.as_ref().unwrap()["desiredCapabilities"]["browserName"],
            "chrome"
        );
        assert_eq!(bridge.session_id(), Some("s1"));
    }

    #[tokio::test]
    async fn test_w3c_validates_capabilities_before_sending() {
        let client = ScriptedClient::new(vec![]);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::W3c, client.clone());

        let mut caps = Capabilities::firefox();
        caps.set("javascript_enabled", json!(true)).unwrap();

        let err = bridge.create_session(&caps).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedCapability { .. }));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_forwards_nonstandard_capabilities() {
        let client = ScriptedClient::new(vec![legacy_session_reply()]);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::Legacy, client.clone());

        let mut caps = Capabilities::chrome();
        caps.set("javascript_enabled", json!(true)).unwrap();
        bridge.create_session(&caps).await.unwrap();

        let calls = client.calls();
        assert_eq!(
            calls[0].2.as_ref().unwrap()["desiredCapabilities"]["javascriptEnabled"],
            true
        );
    }

    #[tokio::test]
    async fn test_accepted_capabilities_recorded_leniently() {
        // A server may echo accepted values our outbound validation would
        // reject, like a proxy object with a vendor extra.
        let client = ScriptedClient::new(vec![ok(json!({
            "value": {
                "sessionId": "s1",
                "capabilities": {
                    "browserName": "firefox",
                    "proxy": {"proxyType": "manual", "httpProxy": "p:80", "acme:tunnel": true},
                },
            }
        }))]);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::W3c, client.clone());

        bridge.create_session(&Capabilities::firefox()).await.unwrap();

        assert_eq!(bridge.state(), SessionState::Active);
        assert_eq!(
            bridge.capabilities().get("proxy").unwrap()["acme:tunnel"],
            json!(true)
        );
    }

    #[tokio::test]
    async fn test_double_create_rejected() {
        let (mut bridge, _client) = active_w3c(vec![]).await;
        let err = bridge
            .create_session(&Capabilities::firefox())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SessionState { .. }));
    }

    #[tokio::test]
    async fn test_command_before_session_rejected() {
        let client = ScriptedClient::new(vec![]);
        let mut bridge = Bridge::new(base_url(), ProtocolKind::W3c, client.clone());

        let err = bridge.navigate_to("https://example.com").await.unwrap_err();
        assert!(matches!(err, Error::SessionState { .. }));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_navigate_posts_url() {
        let (mut bridge, client) = active_w3c(vec![ok(json!({"value": null}))]).await;
        bridge.navigate_to("https://example.com").await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[1].1, "http://127.0.0.1:4444/session/s1/url");
        assert_eq!(calls[1].2.as_ref().unwrap()["url"], "https://example.com");
    }

    #[tokio::test]
    async fn test_find_element_unwraps_w3c_ref() {
        let (mut bridge, client) = active_w3c(vec![ok(json!({
            "value": { envelope::W3C_ELEMENT_KEY: "e7" }
        }))])
        .await;

        let id = bridge.find_element("css selector", "#login").await.unwrap();
        assert_eq!(id, "e7");

        let calls = client.calls();
        assert_eq!(calls[1].2.as_ref().unwrap()["using"], "css selector");
    }

    #[tokio::test]
    async fn test_find_element_unwraps_legacy_ref() {
        let (mut bridge, _client) = active_legacy(vec![ok(json!({
            "sessionId": "s1", "status": 0,
            "value": { envelope::LEGACY_ELEMENT_KEY: "e3" }
        }))])
        .await;

        let id = bridge.find_element("css selector", "#login").await.unwrap();
        assert_eq!(id, "e3");
    }

    #[tokio::test]
    async fn test_legacy_click_hits_legacy_endpoint() {
        let (mut bridge, client) = active_legacy(vec![ok(json!({"status": 0, "value": null}))]).await;
        bridge.click(0).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[1].1, "http://127.0.0.1:4444/session/s1/click");
        assert_eq!(calls[1].2.as_ref().unwrap()["button"], 0);
    }

    #[tokio::test]
    async fn test_w3c_click_becomes_actions_sequence() {
        let (mut bridge, client) = active_w3c(vec![ok(json!({"value": null}))]).await;
        bridge.click(0).await.unwrap();

        let calls = client.calls();
        assert_eq!(calls[1].1, "http://127.0.0.1:4444/session/s1/actions");
        let sequence = &calls[1].2.as_ref().unwrap()["actions"][0];
        assert_eq!(sequence["type"], "pointer");
        assert_eq!(sequence["actions"][0]["type"], "pointerDown");
        assert_eq!(sequence["actions"][1]["type"], "pointerUp");
    }

    #[tokio::test]
    async fn test_w3c_send_keys_becomes_key_sequence() {
        let (mut bridge, client) = active_w3c(vec![ok(json!({"value": null}))]).await;
        bridge.send_keys("hi").await.unwrap();

        let calls = client.calls();
        let sequence = &calls[1].2.as_ref().unwrap()["actions"][0];
        assert_eq!(sequence["type"], "key");
        assert_eq!(sequence["actions"].as_array().unwrap().len(), 4);
        assert_eq!(sequence["actions"][0]["value"], "h");
    }

    #[tokio::test]
    async fn test_timeouts_divergence() {
        let timeouts = Timeouts {
            implicit_ms: Some(500),
            page_load_ms: None,
            script_ms: Some(30_000),
        };

        let (mut bridge, client) = active_w3c(vec![ok(json!({"value": null}))]).await;
        bridge.set_timeouts(timeouts).await.unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        let body = calls[1].2.as_ref().unwrap();
        assert_eq!(body["implicit"], 500);
        assert_eq!(body["script"], 30_000);
        assert!(body.get("pageLoad").is_none());

        let (mut bridge, client) = active_legacy(vec![
            ok(json!({"status": 0, "value": null})),
            ok(json!({"status": 0, "value": null})),
        ])
        .await;
        bridge.set_timeouts(timeouts).await.unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].2.as_ref().unwrap()["type"], "implicit");
        assert_eq!(calls[2].2.as_ref().unwrap()["type"], "script");
    }

    #[tokio::test]
    async fn test_quit_swallows_transport_error() {
        let (mut bridge, _client) = active_w3c(vec![transport_err()]).await;

        bridge.quit().await.unwrap();
        assert_eq!(bridge.state(), SessionState::Quit);
        assert!(bridge.session_id().is_none());
    }

    #[tokio::test]
    async fn test_quit_propagates_protocol_error() {
        let (mut bridge, _client) = active_w3c(vec![Ok(HttpResponse {
            status: 404,
            body: Some(json!({
                "value": { "error": "invalid session id", "message": "gone" }
            })),
        })])
        .await;

        let err = bridge.quit().await.unwrap_err();
        assert!(matches!(err, Error::InvalidSessionId { .. }));
        // State still advances so teardown cannot loop.
        assert_eq!(bridge.state(), SessionState::Quit);
    }

    #[tokio::test]
    async fn test_quit_is_idempotent() {
        let (mut bridge, client) = active_w3c(vec![ok(json!({"value": null}))]).await;

        bridge.quit().await.unwrap();
        bridge.quit().await.unwrap();
        // Session creation plus exactly one DELETE.
        assert_eq!(client.calls().len(), 2);
        assert_eq!(client.calls()[1].0, Verb::Delete);
    }

    #[tokio::test]
    async fn test_command_after_quit_rejected() {
        let (mut bridge, _client) = active_w3c(vec![ok(json!({"value": null}))]).await;
        bridge.quit().await.unwrap();

        let err = bridge.title().await.unwrap_err();
        assert!(matches!(err, Error::SessionState { .. }));
    }

    #[tokio::test]
    async fn test_raw_execute_unwraps_value() {
        let (bridge, client) = active_w3c(vec![ok(json!({"value": "Example"}))]).await;

        let value = bridge
            .execute(WireCommand::GetTitle, &[], None)
            .await
            .unwrap();
        assert_eq!(value, "Example");
        assert_eq!(client.calls()[1].1, "http://127.0.0.1:4444/session/s1/title");
    }

    #[tokio::test]
    async fn test_element_arg_shape_per_generation() {
        let client = ScriptedClient::new(vec![]);
        let legacy = Bridge::new(base_url(), ProtocolKind::Legacy, client.clone());
        let w3c = Bridge::new(base_url(), ProtocolKind::W3c, client);

        assert_eq!(
            legacy.element_arg("e1"),
            json!({ envelope::LEGACY_ELEMENT_KEY: "e1" })
        );
        assert_eq!(
            w3c.element_arg("e1"),
            json!({ envelope::W3C_ELEMENT_KEY: "e1" })
        );
    }
}
