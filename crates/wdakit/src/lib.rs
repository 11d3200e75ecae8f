//! # wdakit
//!
//! Async client for WebDriverAgent, the HTTP/JSON UI-automation service that
//! runs on iOS devices and simulators.
//!
//! The crate covers the client side of the protocol: building route URLs,
//! sending requests, decoding the agent's response envelopes and error
//! payloads, encoding multi-step gestures, and polling for UI conditions.
//!
//! ## Modules
//!
//! - [`client`] - Device-root routes and session creation
//! - [`session`] - Everything scoped under `/session/{id}`
//! - [`element`] - Element handles returned by `find_element(s)`
//! - [`action`] - Legacy touch actions and W3C pointer/key actions
//! - [`wait`] - Condition polling with timeout and interval
//! - [`endpoint`] - Path-segment aware URL joining
//! - [`transport`] - HTTP execution and the per-client connection registry
//! - [`response`] - Response envelope decoding and agent error extraction
//! - [`usb_tunnel`] - usbmuxd device discovery and port forwarding
//! - [`config`] - Persistent settings in `~/.wdakit/config.json`
//!
//! ## Example
//!
//! ```no_run
//! use wdakit::action::{FingerAction, W3CActions};
//! use wdakit::{Capabilities, Client, Locator};
//!
//! # async fn example() -> wdakit::Result<()> {
//! let client = Client::connect("http://localhost:8100").await?;
//! let session = client.new_session(&Capabilities::default()).await?;
//!
//! let button = session.find_element(&Locator::AccessibilityId("login".into())).await?;
//! button.click().await?;
//!
//! let actions = W3CActions::new().finger(FingerAction::new().double_tap(100.0, 200.0, None));
//! session.perform_actions(&actions).await?;
//!
//! session
//!     .wait(|s| async move { Ok(!s.alert_text().await.unwrap_or_default().is_empty()) })
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod client;
pub mod config;
pub mod element;
pub mod endpoint;
pub mod error;
pub mod locator;
pub mod model;
pub mod response;
mod scope;
pub mod screenshot;
pub mod session;
pub mod transport;
pub mod usb_tunnel;
pub mod wait;

pub use client::Client;
pub use config::WdaConfig;
pub use element::Element;
pub use error::{Result, WdaError};
pub use locator::Locator;
pub use model::{AppLaunchOptions, Capabilities, SourceOptions};
pub use response::AgentError;
pub use screenshot::Screenshot;
pub use session::Session;
