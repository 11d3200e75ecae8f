//! Persistent configuration for wdakit.
//!
//! Stores user settings in `~/.wdakit/config.json`. Every field has a default,
//! so a missing or partial file is never an error.
//!
//! # Example
//!
//! ```no_run
//! use wdakit::config::WdaConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = WdaConfig::load();
//! println!("waiting up to {:?}", config.wait_timeout());
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const CONFIG_DIR: &str = ".wdakit";
const CONFIG_FILENAME: &str = "config.json";

/// Default timeout for [`wait`](crate::Session::wait).
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between condition evaluations.
pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(250);

/// Default timeout applied to a single HTTP request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Port WebDriverAgent listens on inside the device.
pub const DEFAULT_AGENT_PORT: u16 = 8100;

/// Port of the agent's MJPEG screen stream inside the device.
pub const DEFAULT_MJPEG_PORT: u16 = 9100;

/// Class chain used to locate "accept" buttons when alerts are auto-handled.
pub const DEFAULT_ACCEPT_ALERT_SELECTOR: &str =
    "**/XCUIElementTypeButton[`label IN {'Allow','OK','Allow While Using App','Not Now'}`]";

/// Class chain used to locate "dismiss" buttons when alerts are auto-handled.
pub const DEFAULT_DISMISS_ALERT_SELECTOR: &str =
    "**/XCUIElementTypeButton[`label IN {'Don’t Allow','Not Now'}`]";

/// Returns the wdakit data directory (`~/.wdakit`).
pub fn wdakit_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// Persistent wdakit configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WdaConfig {
    /// Log every request and response at `info` level.
    pub debug: bool,
    /// Total time a `wait` call polls before giving up, in milliseconds.
    pub wait_timeout_ms: u64,
    /// Sleep between condition evaluations, in milliseconds.
    pub wait_interval_ms: u64,
    /// Timeout for a single HTTP request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Agent port on physical devices reached through usbmuxd.
    pub agent_port: u16,
    /// MJPEG stream port on physical devices.
    pub mjpeg_port: u16,
    /// Class chain applied as `acceptAlertButtonSelector` on connect.
    /// `None` skips the setting.
    pub accept_alert_selector: Option<String>,
    /// Class chain applied as `dismissAlertButtonSelector` on connect.
    pub dismiss_alert_selector: Option<String>,
}

impl Default for WdaConfig {
    fn default() -> Self {
        Self {
            debug: false,
            wait_timeout_ms: DEFAULT_WAIT_TIMEOUT.as_millis() as u64,
            wait_interval_ms: DEFAULT_WAIT_INTERVAL.as_millis() as u64,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            agent_port: DEFAULT_AGENT_PORT,
            mjpeg_port: DEFAULT_MJPEG_PORT,
            accept_alert_selector: Some(DEFAULT_ACCEPT_ALERT_SELECTOR.to_string()),
            dismiss_alert_selector: Some(DEFAULT_DISMISS_ALERT_SELECTOR.to_string()),
        }
    }
}

impl WdaConfig {
    /// Load config from `~/.wdakit/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        let path = wdakit_dir().join(CONFIG_FILENAME);
        std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Save config to `~/.wdakit/config.json`.
    pub fn save(&self) -> std::io::Result<()> {
        let dir = wdakit_dir();
        std::fs::create_dir_all(&dir)?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(dir.join(CONFIG_FILENAME), json)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
