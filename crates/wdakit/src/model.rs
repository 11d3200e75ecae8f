//! Typed request bodies and response values.
//!
//! Request types serialize to the exact JSON the agent reads; response types
//! deserialize leniently (`#[serde(default)]`) because agent builds differ in
//! which fields they report.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Session capabilities
// ---------------------------------------------------------------------------

/// How the agent answers system alerts on its own during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Accept,
    Dismiss,
}

/// Options for launching an application.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLaunchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_wait_for_quiescence: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
}

impl AppLaunchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait_for_quiescence(mut self, wait: bool) -> Self {
        self.should_wait_for_quiescence = Some(wait);
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}

/// Body of `POST /session/{id}/wda/apps/launch`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct LaunchBody<'a> {
    pub bundle_id: &'a str,
    #[serde(flatten)]
    pub options: &'a AppLaunchOptions,
}

/// Capabilities sent with `POST /session`.
///
/// An empty value creates a session without launching anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_id: Option<String>,
    #[serde(flatten)]
    pub launch: AppLaunchOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_alert_action: Option<AlertAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_use_test_manager_for_visibility_detection: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_use_compact_responses: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_response_attributes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_typing_frequency: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_use_singleton_test_manager: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eventloop_idle_delay_sec: Option<u32>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Launches `bundle_id` with the session and waits for it to go idle.
    pub fn for_app(bundle_id: impl Into<String>) -> Self {
        Self {
            bundle_id: Some(bundle_id.into()),
            launch: AppLaunchOptions::new().wait_for_quiescence(true),
            ..Self::default()
        }
    }

    pub fn launch_options(mut self, launch: AppLaunchOptions) -> Self {
        self.launch = launch;
        self
    }

    pub fn default_alert_action(mut self, action: AlertAction) -> Self {
        self.default_alert_action = Some(action);
        self
    }

    pub fn compact_responses(mut self, on: bool) -> Self {
        self.should_use_compact_responses = Some(on);
        self
    }

    /// Comma-separated attributes returned with found elements, e.g. `type,label`.
    pub fn element_response_attributes(mut self, attrs: impl Into<String>) -> Self {
        self.element_response_attributes = Some(attrs.into());
        self
    }

    pub fn max_typing_frequency(mut self, frequency: u32) -> Self {
        self.max_typing_frequency = Some(frequency);
        self
    }

    pub fn eventloop_idle_delay_sec(mut self, seconds: u32) -> Self {
        self.eventloop_idle_delay_sec = Some(seconds);
        self
    }

    /// The `capabilities` member of the session request:
    /// `{}` when empty, `{"alwaysMatch": {...}}` otherwise.
    pub(crate) fn request_body(&self) -> serde_json::Value {
        if *self == Capabilities::default() {
            serde_json::json!({ "capabilities": {} })
        } else {
            serde_json::json!({ "capabilities": { "alwaysMatch": self } })
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xml,
    Json,
    Description,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Xml => "xml",
            SourceFormat::Json => "json",
            SourceFormat::Description => "description",
        }
    }
}

/// Query options for the page source routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    pub format: Option<SourceFormat>,
    /// Attributes left out of the tree. Only honored for XML.
    pub excluded_attributes: Vec<String>,
}

impl SourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: SourceFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn exclude(mut self, attribute: impl Into<String>) -> Self {
        self.excluded_attributes.push(attribute.into());
        self
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(format) = self.format {
            pairs.push(("format", format.as_str().to_string()));
        }
        let xml = matches!(self.format, None | Some(SourceFormat::Xml));
        if xml && !self.excluded_attributes.is_empty() {
            pairs.push(("excluded_attributes", self.excluded_attributes.join(",")));
        }
        pairs
    }

    pub(crate) fn is_json(&self) -> bool {
        self.format == Some(SourceFormat::Json)
    }
}

// ---------------------------------------------------------------------------
// Device and session information
// ---------------------------------------------------------------------------

/// Value of `GET /status`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Status {
    pub ready: bool,
    pub message: String,
    pub state: String,
    pub os: OsInfo,
    pub ios: IosInfo,
    pub build: BuildInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OsInfo {
    pub name: String,
    pub version: String,
    pub sdk_version: String,
    pub test_manager_version: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IosInfo {
    pub ip: String,
    pub simulator_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BuildInfo {
    pub time: String,
    pub product_bundle_identifier: String,
}

/// Value of `GET /session/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionInfo {
    pub session_id: String,
    pub capabilities: SessionCapabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionCapabilities {
    #[serde(rename = "CFBundleIdentifier")]
    pub bundle_id: String,
    pub browser_name: String,
    pub device: String,
    pub sdk_version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceInfo {
    pub time_zone: String,
    pub current_locale: String,
    pub model: String,
    pub uuid: String,
    pub user_interface_idiom: i64,
    pub user_interface_style: String,
    pub name: String,
    pub is_simulator: bool,
}

/// Charging state reported in [`BatteryInfo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "i64")]
pub enum BatteryState {
    #[default]
    Unknown,
    /// On battery, discharging.
    Unplugged,
    /// Plugged in, less than 100%.
    Charging,
    /// Plugged in, at 100%.
    Full,
}

impl From<i64> for BatteryState {
    fn from(v: i64) -> Self {
        match v {
            1 => BatteryState::Unplugged,
            2 => BatteryState::Charging,
            3 => BatteryState::Full,
            _ => BatteryState::Unknown,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BatteryInfo {
    /// In `[0.0, 1.0]`.
    pub level: f64,
    pub state: BatteryState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Screen {
    pub status_bar_size: Size,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppBaseInfo {
    pub pid: i64,
    pub bundle_id: String,
}

/// Value of `GET /wda/activeAppInfo`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppInfo {
    pub name: String,
    #[serde(flatten)]
    pub base: AppBaseInfo,
    pub process_arguments: ProcessArguments,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessArguments {
    pub env: BTreeMap<String, String>,
    pub args: Vec<String>,
}

/// `XCUIApplicationState` as reported by `wda/apps/state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "i64")]
pub enum AppState {
    NotRunning,
    RunningBackgroundSuspended,
    RunningBackground,
    RunningForeground,
    Unknown(i64),
}

impl From<i64> for AppState {
    fn from(v: i64) -> Self {
        match v {
            1 => AppState::NotRunning,
            2 => AppState::RunningBackgroundSuspended,
            3 => AppState::RunningBackground,
            4 => AppState::RunningForeground,
            other => AppState::Unknown(other),
        }
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppState::NotRunning => write!(f, "not running"),
            AppState::RunningBackgroundSuspended => write!(f, "running (suspended)"),
            AppState::RunningBackground => write!(f, "running (background)"),
            AppState::RunningForeground => write!(f, "running (foreground)"),
            AppState::Unknown(v) => write!(f, "unknown ({v})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Device controls
// ---------------------------------------------------------------------------

/// Hardware buttons accepted by `wda/pressButton`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceButton {
    Home,
    VolumeUp,
    VolumeDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PasteboardType {
    Plaintext,
    Image,
    Url,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "PORTRAIT")]
    Portrait,
    #[serde(rename = "LANDSCAPE")]
    LandscapeLeft,
    #[serde(rename = "UIA_DEVICE_ORIENTATION_LANDSCAPERIGHT")]
    LandscapeRight,
    #[serde(rename = "UIA_DEVICE_ORIENTATION_PORTRAIT_UPSIDEDOWN")]
    PortraitUpsideDown,
}

/// Device rotation in degrees around each axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rotation {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Privacy-protected resources whose authorization can be reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "i64")]
pub enum ProtectedResource {
    Contacts,
    Calendar,
    Reminders,
    Photos,
    Microphone,
    Camera,
    Location,
}

impl From<ProtectedResource> for i64 {
    fn from(r: ProtectedResource) -> i64 {
        match r {
            ProtectedResource::Contacts => 1,
            ProtectedResource::Calendar => 2,
            ProtectedResource::Reminders => 3,
            ProtectedResource::Photos => 4,
            ProtectedResource::Microphone => 5,
            ProtectedResource::Camera => 6,
            ProtectedResource::Location => 7,
        }
    }
}

// ---------------------------------------------------------------------------
// Element gestures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickerWheelOrder {
    Next,
    Previous,
}

/// What an element scroll should bring into view.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrollTarget {
    /// Scroll until the descendant with this name is visible.
    Name(String),
    /// Scroll until a descendant matching this predicate is visible.
    Predicate(String),
    /// Scroll the element itself into view.
    ToVisible,
    /// Scroll by `distance` (a fraction of the element's size) in a direction.
    Direction(Direction, f64),
}

/// Default fraction used by [`ScrollTarget::Direction`] helpers.
pub const DEFAULT_SCROLL_DISTANCE: f64 = 0.5;

impl ScrollTarget {
    pub(crate) fn body(&self) -> serde_json::Value {
        match self {
            ScrollTarget::Name(name) => serde_json::json!({ "name": name }),
            ScrollTarget::Predicate(p) => serde_json::json!({ "predicateString": p }),
            ScrollTarget::ToVisible => serde_json::json!({ "toVisible": true }),
            ScrollTarget::Direction(direction, distance) => {
                serde_json::json!({ "direction": direction, "distance": distance })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_capabilities_send_empty_object() {
        assert_eq!(Capabilities::new().request_body(), json!({"capabilities": {}}));
    }

    #[test]
    fn app_capabilities_use_always_match() {
        let caps = Capabilities::for_app("com.apple.Preferences")
            .default_alert_action(AlertAction::Accept);
        assert_eq!(
            caps.request_body(),
            json!({"capabilities": {"alwaysMatch": {
                "bundleId": "com.apple.Preferences",
                "shouldWaitForQuiescence": true,
                "defaultAlertAction": "accept"
            }}})
        );
    }

    #[test]
    fn launch_body_flattens_options() {
        let options = AppLaunchOptions::new().arg("-debug").env("LANG", "en");
        let body = LaunchBody {
            bundle_id: "com.example",
            options: &options,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"bundleId": "com.example", "arguments": ["-debug"], "environment": {"LANG": "en"}})
        );
    }

    #[test]
    fn excluded_attributes_only_for_xml() {
        let xml = SourceOptions::new().exclude("frame").exclude("enabled");
        assert_eq!(
            xml.query_pairs(),
            vec![("excluded_attributes", "frame,enabled".to_string())]
        );
        let json = SourceOptions::new().format(SourceFormat::Json).exclude("frame");
        assert_eq!(json.query_pairs(), vec![("format", "json".to_string())]);
        assert!(json.is_json());
    }

    #[test]
    fn app_state_and_battery_decode_from_integers() {
        let state: AppState = serde_json::from_value(json!(4)).unwrap();
        assert_eq!(state, AppState::RunningForeground);
        let battery: BatteryInfo = serde_json::from_value(json!({"level": 0.5, "state": 2})).unwrap();
        assert_eq!(battery.state, BatteryState::Charging);
    }

    #[test]
    fn active_app_info_flattens_base() {
        let info: AppInfo = serde_json::from_value(json!({
            "processArguments": {"env": {}, "args": []},
            "name": "",
            "pid": 57,
            "bundleId": "com.apple.springboard"
        }))
        .unwrap();
        assert_eq!(info.base.pid, 57);
        assert_eq!(info.base.bundle_id, "com.apple.springboard");
    }

    #[test]
    fn scroll_bodies() {
        assert_eq!(ScrollTarget::ToVisible.body(), json!({"toVisible": true}));
        assert_eq!(
            ScrollTarget::Direction(Direction::Up, DEFAULT_SCROLL_DISTANCE).body(),
            json!({"direction": "up", "distance": 0.5})
        );
    }

    #[test]
    fn enums_serialize_as_wire_names() {
        assert_eq!(serde_json::to_value(DeviceButton::VolumeUp).unwrap(), json!("volumeUp"));
        assert_eq!(serde_json::to_value(PasteboardType::Plaintext).unwrap(), json!("plaintext"));
        assert_eq!(serde_json::to_value(ProtectedResource::Camera).unwrap(), json!(6));
        assert_eq!(
            serde_json::to_value(Orientation::LandscapeRight).unwrap(),
            json!("UIA_DEVICE_ORIENTATION_LANDSCAPERIGHT")
        );
    }
}
