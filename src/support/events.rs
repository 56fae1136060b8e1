//! Event-firing decoration.
//!
//! [`EventFiringBridge`] wraps any [`DriverCommands`] implementation and
//! invokes listener hooks around the interesting operations. Forwarding is
//! explicit, method by method: the decorated surface is exactly the trait,
//! and an operation without a hook pair passes straight through.
//!
//! After-hooks fire only when the operation succeeded; the operation's
//! error propagates unchanged either way.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::protocol::{DriverCommands, Timeouts};

// ============================================================================
// EventListener
// ============================================================================

/// Hooks around decorated operations. Every hook has an empty default, so
/// listeners implement only what they care about.
#[allow(unused_variables)]
pub trait EventListener: Send {
    /// Before navigating to `url`.
    fn before_navigate_to(&mut self, url: &str) {}
    /// After navigating to `url`.
    fn after_navigate_to(&mut self, url: &str) {}

    /// Before history back.
    fn before_navigate_back(&mut self) {}
    /// After history back.
    fn after_navigate_back(&mut self) {}

    /// Before history forward.
    fn before_navigate_forward(&mut self) {}
    /// After history forward.
    fn after_navigate_forward(&mut self) {}

    /// Before any element lookup.
    fn before_find(&mut self, using: &str, value: &str) {}
    /// After any element lookup.
    fn after_find(&mut self, using: &str, value: &str) {}

    /// Before clicking an element.
    fn before_click(&mut self, id: &str) {}
    /// After clicking an element.
    fn after_click(&mut self, id: &str) {}

    /// Before typing into or clearing an element.
    fn before_change_value_of(&mut self, id: &str) {}
    /// After typing into or clearing an element.
    fn after_change_value_of(&mut self, id: &str) {}

    /// Before script execution.
    fn before_execute_script(&mut self, script: &str) {}
    /// After script execution.
    fn after_execute_script(&mut self, script: &str) {}

    /// Before closing the current window.
    fn before_close(&mut self) {}
    /// After closing the current window.
    fn after_close(&mut self) {}

    /// Before ending the session.
    fn before_quit(&mut self) {}
    /// After ending the session.
    fn after_quit(&mut self) {}
}

// ============================================================================
// EventFiringBridge
// ============================================================================

/// A [`DriverCommands`] decorator that fires listener hooks.
pub struct EventFiringBridge<L: EventListener> {
    inner: Box<dyn DriverCommands>,
    listener: L,
}

impl<L: EventListener> EventFiringBridge<L> {
    /// Wraps `inner`, firing hooks on `listener`.
    #[must_use]
    pub fn new(inner: Box<dyn DriverCommands>, listener: L) -> Self {
        Self { inner, listener }
    }

    /// The wrapped command surface.
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &dyn DriverCommands {
        self.inner.as_ref()
    }

    /// The listener.
    #[inline]
    #[must_use]
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Unwraps the decorator.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn DriverCommands> {
        self.inner
    }
}

// ============================================================================
// EventFiringBridge - Forwarding
// ============================================================================

#[async_trait]
impl<L: EventListener> DriverCommands for EventFiringBridge<L> {
    async fn navigate_to(&mut self, url: &str) -> Result<()> {
        self.listener.before_navigate_to(url);
        self.inner.navigate_to(url).await?;
        self.listener.after_navigate_to(url);
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String> {
        self.inner.current_url().await
    }

    async fn back(&mut self) -> Result<()> {
        self.listener.before_navigate_back();
        self.inner.back().await?;
        self.listener.after_navigate_back();
        Ok(())
    }

    async fn forward(&mut self) -> Result<()> {
        self.listener.before_navigate_forward();
        self.inner.forward().await?;
        self.listener.after_navigate_forward();
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        self.inner.refresh().await
    }

    async fn title(&mut self) -> Result<String> {
        self.inner.title().await
    }

    async fn window_handle(&mut self) -> Result<String> {
        self.inner.window_handle().await
    }

    async fn window_handles(&mut self) -> Result<Vec<String>> {
        self.inner.window_handles().await
    }

    async fn close_window(&mut self) -> Result<()> {
        self.listener.before_close();
        self.inner.close_window().await?;
        self.listener.after_close();
        Ok(())
    }

    async fn find_element(&mut self, using: &str, value: &str) -> Result<String> {
        self.listener.before_find(using, value);
        let id = self.inner.find_element(using, value).await?;
        self.listener.after_find(using, value);
        Ok(id)
    }

    async fn find_elements(&mut self, using: &str, value: &str) -> Result<Vec<String>> {
        self.listener.before_find(using, value);
        let ids = self.inner.find_elements(using, value).await?;
        self.listener.after_find(using, value);
        Ok(ids)
    }

    async fn find_child_element(
        &mut self,
        parent: &str,
        using: &str,
        value: &str,
    ) -> Result<String> {
        self.listener.before_find(using, value);
        let id = self.inner.find_child_element(parent, using, value).await?;
        self.listener.after_find(using, value);
        Ok(id)
    }

    async fn click_element(&mut self, id: &str) -> Result<()> {
        self.listener.before_click(id);
        self.inner.click_element(id).await?;
        self.listener.after_click(id);
        Ok(())
    }

    async fn clear_element(&mut self, id: &str) -> Result<()> {
        self.listener.before_change_value_of(id);
        self.inner.clear_element(id).await?;
        self.listener.after_change_value_of(id);
        Ok(())
    }

    async fn send_keys_to_element(&mut self, id: &str, text: &str) -> Result<()> {
        self.listener.before_change_value_of(id);
        self.inner.send_keys_to_element(id, text).await?;
        self.listener.after_change_value_of(id);
        Ok(())
    }

    async fn element_text(&mut self, id: &str) -> Result<String> {
        self.inner.element_text(id).await
    }

    async fn element_tag_name(&mut self, id: &str) -> Result<String> {
        self.inner.element_tag_name(id).await
    }

    async fn element_attribute(&mut self, id: &str, name: &str) -> Result<Option<String>> {
        self.inner.element_attribute(id, name).await
    }

    async fn element_enabled(&mut self, id: &str) -> Result<bool> {
        self.inner.element_enabled(id).await
    }

    async fn execute_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.listener.before_execute_script(script);
        let value = self.inner.execute_script(script, args).await?;
        self.listener.after_execute_script(script);
        Ok(value)
    }

    async fn execute_async_script(&mut self, script: &str, args: Vec<Value>) -> Result<Value> {
        self.listener.before_execute_script(script);
        let value = self.inner.execute_async_script(script, args).await?;
        self.listener.after_execute_script(script);
        Ok(value)
    }

    async fn alert_text(&mut self) -> Result<String> {
        self.inner.alert_text().await
    }

    async fn accept_alert(&mut self) -> Result<()> {
        self.inner.accept_alert().await
    }

    async fn dismiss_alert(&mut self) -> Result<()> {
        self.inner.dismiss_alert().await
    }

    async fn screenshot(&mut self) -> Result<Vec<u8>> {
        self.inner.screenshot().await
    }

    async fn set_timeouts(&mut self, timeouts: Timeouts) -> Result<()> {
        self.inner.set_timeouts(timeouts).await
    }

    async fn click(&mut self, button: u64) -> Result<()> {
        self.inner.click(button).await
    }

    async fn double_click(&mut self) -> Result<()> {
        self.inner.double_click().await
    }

    async fn button_down(&mut self) -> Result<()> {
        self.inner.button_down().await
    }

    async fn button_up(&mut self) -> Result<()> {
        self.inner.button_up().await
    }

    async fn move_to(&mut self, element: Option<&str>, x: i64, y: i64) -> Result<()> {
        self.inner.move_to(element, x, y).await
    }

    async fn send_keys(&mut self, text: &str) -> Result<()> {
        self.inner.send_keys(text).await
    }

    async fn quit(&mut self) -> Result<()> {
        self.listener.before_quit();
        self.inner.quit().await?;
        self.listener.after_quit();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
