//! Device-root client.
//!
//! A [`Client`] talks to one agent. It owns the transport (and with it the
//! [`ConnectionRegistry`](crate::transport::ConnectionRegistry)), serves the
//! routes that need no session, and hands out [`Session`]s.
//!
//! ```no_run
//! use wdakit::{Capabilities, Client, Locator};
//!
//! # async fn example() -> wdakit::Result<()> {
//! let client = Client::connect("http://localhost:8100").await?;
//! let session = client
//!     .new_session(&Capabilities::for_app("com.apple.Preferences"))
//!     .await?;
//! session
//!     .find_element(&Locator::Name("General".into()))
//!     .await?
//!     .click()
//!     .await?;
//! session.delete().await?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::WdaConfig;
use crate::endpoint::Endpoint;
use crate::error::{Result, WdaError};
use crate::model::{AppInfo, Capabilities, SourceOptions, Status};
use crate::scope::Scope;
use crate::screenshot::Screenshot;
use crate::session::Session;
use crate::transport::Transport;
use crate::usb_tunnel::{Device, UsbLink};
use crate::wait::{wait_until, WaitDefaults};

/// Body the agent's `/health` route answers with when it is up.
const HEALTH_OK: &[u8] = b"I-AM-ALIVE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleBody<'a> {
    bundle_id: &'a str,
}

/// A handle on one agent.
///
/// Cloning is cheap; clones share the transport, the connection registry
/// and, for USB clients, the local forwarders.
#[derive(Debug, Clone)]
pub struct Client {
    endpoint: Endpoint,
    transport: Transport,
    config: WdaConfig,
    defaults: WaitDefaults,
    usb: Option<Arc<UsbLink>>,
}

impl Client {
    /// Builds a client for the agent at `url`. No request is made.
    pub fn new(url: &str, config: WdaConfig) -> Result<Self> {
        let transport = Transport::new(config.request_timeout(), config.debug)?;
        Self::with_transport(url, transport, config)
    }

    /// Builds a client that sends requests through `transport`.
    pub fn with_transport(url: &str, transport: Transport, config: WdaConfig) -> Result<Self> {
        let endpoint = Endpoint::parse(url)?;
        Ok(Self {
            endpoint,
            transport,
            defaults: WaitDefaults::from(&config),
            config,
            usb: None,
        })
    }

    /// Connects to the agent at `url` using the configuration stored in
    /// `~/.wdakit/config.json`.
    ///
    /// See [`connect_with_config`](Self::connect_with_config).
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, WdaConfig::load()).await
    }

    /// Builds a client, checks that the agent reports itself ready, then
    /// applies the configured alert button selectors.
    ///
    /// Failing to apply the selectors is logged and otherwise ignored.
    pub async fn connect_with_config(url: &str, config: WdaConfig) -> Result<Self> {
        let client = Self::new(url, config)?;
        client.ensure_ready().await?;
        Ok(client)
    }

    /// Connects to the agent on a USB-attached device.
    ///
    /// Loopback forwarders are opened to the device's agent and MJPEG ports
    /// ([`Device::ports`], falling back to `config`). An HTTP client
    /// resolving the device serial to the agent forwarder is registered for
    /// the serial. Requests then target `http://<serial>:<port>`.
    pub async fn usb(device: &Device, config: WdaConfig) -> Result<Self> {
        let link = UsbLink::open(device, &config).await?;
        let local_addr = link.agent().local_addr();
        // URL hosts are lowercased; the resolver override must match.
        let host = device.udid.to_ascii_lowercase();

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .no_proxy()
            .resolve(&host, local_addr)
            .build()
            .map_err(|source| WdaError::Request {
                action: "BuildClient",
                source,
            })?;

        let transport = Transport::new(config.request_timeout(), config.debug)?;
        transport.registry().register(device.udid.clone(), http);
        let transport = transport.bound_to(device.udid.clone());

        let url = format!("http://{}:{}", host, local_addr.port());
        info!(
            udid = %device.udid,
            %local_addr,
            mjpeg = %link.mjpeg().local_addr(),
            "usb client ready"
        );
        let mut client = Self::with_transport(&url, transport, config)?;
        client.usb = Some(Arc::new(link));
        client.ensure_ready().await?;
        Ok(client)
    }

    /// Checks `/status` for `ready`, then applies the configured alert
    /// button selectors to the session the status names, if any.
    pub async fn ensure_ready(&self) -> Result<()> {
        let url = self.endpoint.join(&["status"]);
        let env = self.transport.get("Status", &url).await?;
        let status: Status = env.value_as("Status")?;
        if !status.ready {
            return Err(WdaError::NotReady(self.endpoint.to_string()));
        }
        debug!(state = %status.state, "agent ready");

        if let Some(session_id) = env.session_id() {
            let settings = self.alert_selector_settings();
            if !settings.is_empty() {
                let session = self.attach_session(session_id);
                if let Err(e) = session.set_appium_settings(settings).await {
                    warn!(error = %e, "failed to apply alert button selectors");
                }
            }
        }
        Ok(())
    }

    fn alert_selector_settings(&self) -> Map<String, Value> {
        let mut settings = Map::new();
        if let Some(selector) = &self.config.accept_alert_selector {
            settings.insert("acceptAlertButtonSelector".into(), selector.clone().into());
        }
        if let Some(selector) = &self.config.dismiss_alert_selector {
            settings.insert("dismissAlertButtonSelector".into(), selector.clone().into());
        }
        settings
    }

    /// Sets the selector the agent uses to pick the button when accepting
    /// alerts, on the session the agent reports as current.
    pub async fn set_accept_alert_button_selector(&self, selector: &str) -> Result<()> {
        let mut settings = Map::new();
        settings.insert("acceptAlertButtonSelector".into(), selector.into());
        self.apply_settings(settings).await
    }

    /// Sets the selector the agent uses to pick the button when dismissing
    /// alerts, on the session the agent reports as current.
    pub async fn set_dismiss_alert_button_selector(&self, selector: &str) -> Result<()> {
        let mut settings = Map::new();
        settings.insert("dismissAlertButtonSelector".into(), selector.into());
        self.apply_settings(settings).await
    }

    async fn apply_settings(&self, settings: Map<String, Value>) -> Result<()> {
        let url = self.endpoint.join(&["status"]);
        let env = self.transport.get("Status", &url).await?;
        let session_id = env.require_session_id("Status")?;
        self.attach_session(session_id)
            .set_appium_settings(settings)
            .await?;
        Ok(())
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn config(&self) -> &WdaConfig {
        &self.config
    }

    /// Loopback address of the USB agent forwarder, for clients built with
    /// [`usb`](Self::usb).
    pub fn usb_local_addr(&self) -> Option<SocketAddr> {
        self.usb.as_ref().map(|link| link.agent().local_addr())
    }

    /// Where the agent's MJPEG screen stream can be read.
    ///
    /// USB clients get their loopback MJPEG forwarder. Other clients get
    /// the agent's host on [`WdaConfig::mjpeg_port`].
    pub fn mjpeg_url(&self) -> String {
        if let Some(link) = &self.usb {
            return format!("http://{}", link.mjpeg().local_addr());
        }
        let url = self.endpoint.url();
        format!(
            "{}://{}:{}",
            url.scheme(),
            url.host_str().unwrap_or("127.0.0.1"),
            self.config.mjpeg_port
        )
    }

    /// Turns request/response logging on or off.
    pub fn set_debug(&self, on: bool) {
        self.transport.set_debug(on);
    }

    fn scope(&self) -> Scope<'_> {
        Scope {
            endpoint: &self.endpoint,
            transport: &self.transport,
        }
    }

    // -----------------------------------------------------------------------
    // Agent
    // -----------------------------------------------------------------------

    pub async fn status(&self) -> Result<Status> {
        let url = self.endpoint.join(&["status"]);
        self.transport.get("Status", &url).await?.value_as("Status")
    }

    pub async fn health_check(&self) -> Result<()> {
        let url = self.endpoint.join_wda(&["healthcheck"]);
        self.transport.get("HealthCheck", &url).await?;
        Ok(())
    }

    /// Whether `/health` answers with the agent's liveness string.
    pub async fn is_healthy(&self) -> Result<bool> {
        let url = self.endpoint.join(&["health"]);
        let body = self
            .transport
            .execute("Health", reqwest::Method::GET, &url, None)
            .await?;
        Ok(body == HEALTH_OK)
    }

    /// Asks the agent process to exit.
    pub async fn shutdown(&self) -> Result<()> {
        let url = self.endpoint.join_wda(&["shutdown"]);
        self.transport.get("Shutdown", &url).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Device
    // -----------------------------------------------------------------------

    pub async fn homescreen(&self) -> Result<()> {
        let url = self.endpoint.join_wda(&["homescreen"]);
        self.transport.post_empty("Homescreen", &url).await?;
        Ok(())
    }

    /// Launches an app without attaching a session to it.
    pub async fn app_launch_unattached(&self, bundle_id: &str) -> Result<()> {
        let url = self.endpoint.join_wda(&["apps", "launchUnattached"]);
        self.transport
            .post("AppLaunchUnattached", &url, &BundleBody { bundle_id })
            .await?;
        Ok(())
    }

    pub async fn is_locked(&self) -> Result<bool> {
        self.scope().is_locked().await
    }

    pub async fn lock(&self) -> Result<()> {
        self.scope().lock().await
    }

    pub async fn unlock(&self) -> Result<()> {
        self.scope().unlock().await
    }

    pub async fn screenshot(&self) -> Result<Screenshot> {
        self.scope().screenshot().await
    }

    pub async fn source(&self, options: &SourceOptions) -> Result<String> {
        self.scope().source(options).await
    }

    pub async fn accessible_source(&self) -> Result<String> {
        self.scope().accessible_source().await
    }

    pub async fn active_app_info(&self) -> Result<AppInfo> {
        self.scope().active_app_info().await
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    /// Creates a session. The agent must answer with a `sessionId`.
    pub async fn new_session(&self, capabilities: &Capabilities) -> Result<Session> {
        let url = self.endpoint.join(&["session"]);
        let env = self
            .transport
            .post("NewSession", &url, &capabilities.request_body())
            .await?;
        let id = env.require_session_id("NewSession")?;
        info!(session_id = id, "session created");
        Ok(self.attach_session(id))
    }

    /// A handle on an existing session. No request is made.
    pub fn attach_session(&self, id: &str) -> Session {
        Session::new(id, &self.endpoint, self.transport.clone(), self.defaults)
    }

    // -----------------------------------------------------------------------
    // Waiting
    // -----------------------------------------------------------------------

    /// Polls `condition` with the configured timeout and interval.
    pub async fn wait<F, Fut>(&self, condition: F) -> Result<()>
    where
        F: FnMut(Client) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        wait_until(self, self.defaults.timeout, self.defaults.interval, condition).await
    }

    pub async fn wait_with_timeout<F, Fut>(&self, timeout: Duration, condition: F) -> Result<()>
    where
        F: FnMut(Client) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        wait_until(self, timeout, self.defaults.interval, condition).await
    }

    pub async fn wait_with_timeout_and_interval<F, Fut>(
        &self,
        timeout: Duration,
        interval: Duration,
        condition: F,
    ) -> Result<()>
    where
        F: FnMut(Client) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        wait_until(self, timeout, interval, condition).await
    }
}
