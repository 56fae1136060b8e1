//! Session lifecycle.
//!
//! [`Session`] is the top of the stack: it launches (or targets) a driver
//! service, negotiates capabilities through a [`Bridge`], optionally wraps
//! the command surface in an event-firing decorator, and guarantees that a
//! locally launched service is torn down with the session.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::capabilities::Capabilities;
use crate::error::{Error, Result};
use crate::protocol::{Bridge, DriverCommands, ProtocolKind};
use crate::service::{DriverService, ServiceConfig};
use crate::support::{EventFiringBridge, EventListener};
use crate::transport::{HttpClient, ReqwestClient};
use crate::wait::Wait;

use super::options::SessionOptions;

// ============================================================================
// Session
// ============================================================================

/// A live browser session.
pub struct Session {
    commands: Box<dyn DriverCommands>,
    service: Option<DriverService>,
    capabilities: Capabilities,
    session_id: String,
    server_url: Url,
    protocol: ProtocolKind,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("service", &self.service)
            .field("capabilities", &self.capabilities)
            .field("session_id", &self.session_id)
            .field("server_url", &self.server_url)
            .field("protocol", &self.protocol)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Creation
// ============================================================================

impl Session {
    /// Creates a session from `options`.
    ///
    /// Without a configured URL a driver service is launched for the
    /// browser family; with one, the remote end is used as-is. The wire
    /// capabilities are the browser options' capabilities with the
    /// explicit overrides merged on top.
    ///
    /// # Errors
    ///
    /// Propagates service launch, validation, and remote-end errors. A
    /// service launched here is stopped again if session creation fails.
    pub async fn create(options: SessionOptions) -> Result<Self> {
        Self::build(options, None::<fn(Box<dyn DriverCommands>) -> Box<dyn DriverCommands>>).await
    }

    /// Like [`Session::create`], with every command routed through an
    /// event-firing decorator around `listener`.
    ///
    /// # Errors
    ///
    /// Same contract as [`Session::create`].
    pub async fn create_with_listener<L>(options: SessionOptions, listener: L) -> Result<Self>
    where
        L: EventListener + 'static,
    {
        Self::build(
            options,
            Some(move |inner: Box<dyn DriverCommands>| {
                Box::new(EventFiringBridge::new(inner, listener)) as Box<dyn DriverCommands>
            }),
        )
        .await
    }

    async fn build<D>(options: SessionOptions, decorate: Option<D>) -> Result<Self>
    where
        D: FnOnce(Box<dyn DriverCommands>) -> Box<dyn DriverCommands>,
    {
        let capabilities = options
            .browser
            .to_capabilities(options.protocol)?
            .merge(&options.overrides);

        let (server_url, mut service) = match options.url {
            Some(url) => (url, None),
            None => {
                let config = options
                    .service
                    .unwrap_or_else(|| ServiceConfig::for_family(options.browser.family()));
                let service = DriverService::start(config).await?;
                (service.url().clone(), Some(service))
            }
        };

        let http: Arc<dyn HttpClient> = match options.http {
            Some(http) => http,
            None => Arc::new(ReqwestClient::new()?),
        };

        let mut bridge = Bridge::new(server_url.clone(), options.protocol, http);
        if let Err(err) = bridge.create_session(&capabilities).await {
            stop_abandoned(&mut service).await;
            return Err(err);
        }

        if let Some(timeouts) = options.timeouts {
            if let Err(err) = bridge.set_timeouts(timeouts).await {
                // The remote session exists by now; end it and reclaim the
                // driver process before surfacing the setup error.
                if let Err(quit_err) = bridge.quit().await {
                    warn!(error = %quit_err, "failed to quit session after setup failure");
                }
                stop_abandoned(&mut service).await;
                return Err(err);
            }
        }

        let session_id = bridge
            .session_id()
            .map(str::to_string)
            .ok_or_else(|| Error::session_state("bridge active without a session id"))?;
        let capabilities = bridge.capabilities().clone();
        let protocol = bridge.protocol();

        info!(session_id, ?protocol, %server_url, "session ready");

        let commands: Box<dyn DriverCommands> = Box::new(bridge);
        let commands = match decorate {
            Some(decorate) => decorate(commands),
            None => commands,
        };

        Ok(Self {
            commands,
            service,
            capabilities,
            session_id,
            server_url,
            protocol,
        })
    }
}

/// Best-effort teardown of a service whose session never became usable.
async fn stop_abandoned(service: &mut Option<DriverService>) {
    if let Some(mut service) = service.take() {
        if let Err(err) = service.stop().await {
            warn!(error = %err, "failed to stop service after setup failure");
        }
    }
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Remote session id.
    #[inline]
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Capabilities the remote end accepted.
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Base URL of the remote end.
    #[inline]
    #[must_use]
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    /// Protocol generation in use.
    #[inline]
    #[must_use]
    pub fn protocol(&self) -> ProtocolKind {
        self.protocol
    }

    /// Whether this session launched and owns a driver service.
    #[inline]
    #[must_use]
    pub fn owns_service(&self) -> bool {
        self.service.is_some()
    }

    /// The typed command surface.
    #[inline]
    pub fn commands(&mut self) -> &mut dyn DriverCommands {
        self.commands.as_mut()
    }
}

// ============================================================================
// Session - Waits
// ============================================================================

impl Session {
    /// Polls until an element matching the locator exists, returning its
    /// reference id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitTimeout`] when the deadline passes; other
    /// command errors propagate.
    pub async fn wait_for_element(
        &mut self,
        wait: &Wait,
        using: &str,
        value: &str,
    ) -> Result<String> {
        let using = using.to_string();
        let value = value.to_string();
        wait.until_with(self.commands.as_mut(), move |commands| {
            let using = using.clone();
            let value = value.clone();
            Box::pin(async move { commands.find_element(&using, &value).await.map(Some) })
        })
        .await
    }

    /// Polls until the page title equals `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitTimeout`] when the deadline passes; other
    /// command errors propagate.
    pub async fn wait_for_title(&mut self, wait: &Wait, expected: &str) -> Result<()> {
        let expected = expected.to_string();
        wait.until_with(self.commands.as_mut(), move |commands| {
            let expected = expected.clone();
            Box::pin(async move {
                let title = commands.title().await?;
                Ok((title == expected).then_some(()))
            })
        })
        .await
    }
}

// ============================================================================
// Session - Teardown
// ============================================================================

impl Session {
    /// Ends the session and stops an owned driver service.
    ///
    /// The service is stopped even when the quit command fails, so a
    /// protocol error cannot leak a driver process. The quit error, if
    /// any, is what the caller sees.
    ///
    /// # Errors
    ///
    /// Propagates protocol errors from the quit command. Transport errors
    /// during quit are swallowed by the bridge.
    pub async fn quit(mut self) -> Result<()> {
        let result = self.commands.quit().await;

        if let Some(mut service) = self.service.take() {
            if let Err(err) = service.stop().await {
                warn!(error = %err, "failed to stop driver service");
            }
        }

        result
    }
}

// ============================================================================
// Tests
// ============================================================================
