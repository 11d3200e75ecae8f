//! Session-scoped operations.
//!
//! A [`Session`] is created by [`Client::new_session`](crate::Client::new_session)
//! or [`Client::attach_session`](crate::Client::attach_session). Its endpoint
//! is the client's endpoint re-rooted under `/session/{id}`; every route
//! below is joined onto it.

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::action::{PressOptions, TouchActions, W3CActions};
use crate::element::{find_element, find_elements, Element};
use crate::endpoint::Endpoint;
use crate::error::{Result, WdaError};
use crate::locator::Locator;
use crate::model::{
    AppBaseInfo, AppInfo, AppLaunchOptions, AppState, BatteryInfo, DeviceButton, DeviceInfo,
    LaunchBody, Orientation, PasteboardType, ProtectedResource, Rotation, Screen, SessionInfo,
    Size, SourceOptions,
};
use crate::response::Envelope;
use crate::scope::Scope;
use crate::screenshot::Screenshot;
use crate::transport::Transport;
use crate::wait::{wait_until, WaitDefaults};

/// Default hold for touch-and-hold, drag and force touch, in seconds.
pub const DEFAULT_HOLD_SECONDS: f64 = 1.0;

/// Default typing speed in keystrokes per second.
pub const DEFAULT_TYPING_FREQUENCY: u32 = 60;

/// Shortest background time accepted by [`Session::app_deactivate`].
pub const MIN_DEACTIVATE_SECONDS: f64 = 3.0;

/// Distance, in points, that directional swipes travel on each side of the
/// window centre.
pub const SWIPE_HALF_DISTANCE: f64 = 100.0;

#[derive(Debug, Serialize)]
pub(crate) struct KeysBody {
    value: Vec<String>,
    frequency: u32,
}

/// `{"value": [one string per character], "frequency": n}`
pub(crate) fn keys_body(text: &str, frequency: Option<u32>) -> KeysBody {
    KeysBody {
        value: text.chars().map(String::from).collect(),
        frequency: frequency
            .filter(|f| *f > 0)
            .unwrap_or(DEFAULT_TYPING_FREQUENCY),
    }
}

#[derive(Debug, Serialize)]
struct ActionsBody<'a, T: Serialize> {
    actions: &'a T,
}

/// A live automation session.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    endpoint: Endpoint,
    transport: Transport,
    defaults: WaitDefaults,
}

impl Session {
    pub(crate) fn new(
        id: impl Into<String>,
        root: &Endpoint,
        transport: Transport,
        defaults: WaitDefaults,
    ) -> Self {
        let id = id.into();
        let endpoint = root.child(&["session", &id]);
        Self {
            id,
            endpoint,
            transport,
            defaults,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session endpoint, `<base>/session/{id}`.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn scope(&self) -> Scope<'_> {
        Scope {
            endpoint: &self.endpoint,
            transport: &self.transport,
        }
    }

    async fn post_wda<B: Serialize + ?Sized>(
        &self,
        action: &'static str,
        elems: &[&str],
        body: &B,
    ) -> Result<Envelope> {
        self.transport
            .post(action, &self.endpoint.join_wda(elems), body)
            .await
    }

    // -----------------------------------------------------------------------
    // Session lifecycle and device information
    // -----------------------------------------------------------------------

    pub async fn info(&self) -> Result<SessionInfo> {
        let url = self.endpoint.join(&[]);
        self.transport.get("SessionInfo", &url).await?.value_as("SessionInfo")
    }

    /// Ends the session. The handle must not be used afterwards.
    pub async fn delete(&self) -> Result<()> {
        let url = self.endpoint.join(&[]);
        self.transport.delete("DeleteSession", &url).await?;
        debug!(session = %self.id, "session deleted");
        Ok(())
    }

    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let url = self.endpoint.join_wda(&["device", "info"]);
        self.transport.get("DeviceInfo", &url).await?.value_as("DeviceInfo")
    }

    pub async fn battery_info(&self) -> Result<BatteryInfo> {
        let url = self.endpoint.join_wda(&["batteryInfo"]);
        self.transport.get("BatteryInfo", &url).await?.value_as("BatteryInfo")
    }

    pub async fn window_size(&self) -> Result<Size> {
        let url = self.endpoint.join(&["window", "size"]);
        self.transport.get("WindowSize", &url).await?.value_as("WindowSize")
    }

    pub async fn screen(&self) -> Result<Screen> {
        let url = self.endpoint.join_wda(&["screen"]);
        self.transport.get("Screen", &url).await?.value_as("Screen")
    }

    /// Points-to-pixels factor of the main screen.
    pub async fn scale(&self) -> Result<f64> {
        Ok(self.screen().await?.scale)
    }

    pub async fn status_bar_size(&self) -> Result<Size> {
        Ok(self.screen().await?.status_bar_size)
    }

    pub async fn active_app_info(&self) -> Result<AppInfo> {
        self.scope().active_app_info().await
    }

    pub async fn active_apps_list(&self) -> Result<Vec<AppBaseInfo>> {
        let url = self.endpoint.join_wda(&["apps", "list"]);
        self.transport.get("ActiveAppsList", &url).await?.value_as("ActiveAppsList")
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

    pub async fn orientation(&self) -> Result<Orientation> {
        let url = self.endpoint.join(&["orientation"]);
        self.transport.get("Orientation", &url).await?.value_as("Orientation")
    }

    pub async fn set_orientation(&self, orientation: Orientation) -> Result<()> {
        let url = self.endpoint.join(&["orientation"]);
        self.transport
            .post("SetOrientation", &url, &json!({ "orientation": orientation }))
            .await?;
        Ok(())
    }

    pub async fn rotation(&self) -> Result<Rotation> {
        let url = self.endpoint.join(&["rotation"]);
        self.transport.get("Rotation", &url).await?.value_as("Rotation")
    }

    pub async fn set_rotation(&self, rotation: Rotation) -> Result<()> {
        let url = self.endpoint.join(&["rotation"]);
        self.transport.post("SetRotation", &url, &rotation).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Applications
    // -----------------------------------------------------------------------

    /// Launches an app. Without options the call waits for the app to go idle.
    pub async fn app_launch(&self, bundle_id: &str, options: Option<AppLaunchOptions>) -> Result<()> {
        let options =
            options.unwrap_or_else(|| AppLaunchOptions::new().wait_for_quiescence(true));
        let body = LaunchBody {
            bundle_id,
            options: &options,
        };
        self.post_wda("AppLaunch", &["apps", "launch"], &body).await?;
        Ok(())
    }

    /// Terminates an app, returning whether it was running.
    pub async fn app_terminate(&self, bundle_id: &str) -> Result<bool> {
        let env = self
            .post_wda("AppTerminate", &["apps", "terminate"], &json!({ "bundleId": bundle_id }))
            .await?;
        Ok(env.value_bool())
    }

    pub async fn app_activate(&self, bundle_id: &str) -> Result<()> {
        self.post_wda("AppActivate", &["apps", "activate"], &json!({ "bundleId": bundle_id }))
            .await?;
        Ok(())
    }

    /// Sends the active app to the background, then brings it back.
    ///
    /// `seconds` shorter than [`MIN_DEACTIVATE_SECONDS`] are raised to it.
    /// `None` sends no duration and leaves the agent's own default (3 s).
    pub async fn app_deactivate(&self, seconds: Option<f64>) -> Result<()> {
        let body = match seconds {
            Some(s) => json!({ "duration": s.max(MIN_DEACTIVATE_SECONDS) }),
            None => json!({}),
        };
        self.post_wda("AppDeactivate", &["deactivateApp"], &body).await?;
        Ok(())
    }

    pub async fn app_state(&self, bundle_id: &str) -> Result<AppState> {
        self.post_wda("AppState", &["apps", "state"], &json!({ "bundleId": bundle_id }))
            .await?
            .value_as("AppState")
    }

    /// Resets the app's authorization for a protected resource.
    pub async fn app_auth_reset(&self, resource: ProtectedResource) -> Result<()> {
        self.post_wda("AppAuthReset", &["resetAppAuth"], &json!({ "resource": resource }))
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Coordinate gestures
    // -----------------------------------------------------------------------

    pub async fn tap(&self, x: f64, y: f64) -> Result<()> {
        self.post_wda("Tap", &["tap", "0"], &json!({ "x": x, "y": y })).await?;
        Ok(())
    }

    pub async fn double_tap(&self, x: f64, y: f64) -> Result<()> {
        self.post_wda("DoubleTap", &["doubleTap"], &json!({ "x": x, "y": y }))
            .await?;
        Ok(())
    }

    /// Presses at `(x, y)` for `seconds` (default 1.0).
    pub async fn touch_and_hold(&self, x: f64, y: f64, seconds: Option<f64>) -> Result<()> {
        let duration = match seconds {
            Some(s) if s > 0.0 => s,
            _ => DEFAULT_HOLD_SECONDS,
        };
        self.post_wda(
            "TouchAndHold",
            &["touchAndHold"],
            &json!({ "x": x, "y": y, "duration": duration }),
        )
        .await?;
        Ok(())
    }

    /// Drags from `from` to `to`, pressing the start point for
    /// `press_seconds` (default 1.0; zero is a swipe).
    pub async fn drag(&self, from: (f64, f64), to: (f64, f64), press_seconds: Option<f64>) -> Result<()> {
        let duration = match press_seconds {
            Some(s) if s >= 0.0 => s,
            _ => DEFAULT_HOLD_SECONDS,
        };
        let body = json!({
            "fromX": from.0,
            "fromY": from.1,
            "toX": to.0,
            "toY": to.1,
            "duration": duration,
        });
        self.post_wda("Drag", &["dragfromtoforduration"], &body).await?;
        Ok(())
    }

    pub async fn swipe(&self, from: (f64, f64), to: (f64, f64)) -> Result<()> {
        self.drag(from, to, Some(0.0)).await
    }

    async fn swipe_from_center(&self, dx: f64, dy: f64) -> Result<()> {
        let size = self.window_size().await?;
        let (cx, cy) = (size.width / 2.0, size.height / 2.0);
        self.swipe((cx - dx, cy - dy), (cx + dx, cy + dy)).await
    }

    /// Swipes upward through the window centre.
    pub async fn swipe_up(&self) -> Result<()> {
        self.swipe_from_center(0.0, -SWIPE_HALF_DISTANCE).await
    }

    pub async fn swipe_down(&self) -> Result<()> {
        self.swipe_from_center(0.0, SWIPE_HALF_DISTANCE).await
    }

    pub async fn swipe_left(&self) -> Result<()> {
        self.swipe_from_center(-SWIPE_HALF_DISTANCE, 0.0).await
    }

    pub async fn swipe_right(&self) -> Result<()> {
        self.swipe_from_center(SWIPE_HALF_DISTANCE, 0.0).await
    }

    /// Presses with `pressure` at `(x, y)` for `seconds` (default 1.0),
    /// submitted as a press / wait / release touch action list.
    pub async fn force_touch(&self, x: f64, y: f64, pressure: f64, seconds: Option<f64>) -> Result<()> {
        let hold = match seconds {
            Some(s) if s > 0.0 => s,
            _ => DEFAULT_HOLD_SECONDS,
        };
        let actions = TouchActions::new()
            .press(PressOptions::new().xy(x, y).pressure(pressure))
            .wait(hold)
            .release();
        self.perform_touch_actions(&actions).await
    }

    /// Submits a legacy touch action list in one request.
    pub async fn perform_touch_actions(&self, actions: &TouchActions) -> Result<()> {
        self.post_wda(
            "PerformTouchActions",
            &["touch", "multi", "perform"],
            &ActionsBody { actions },
        )
        .await?;
        Ok(())
    }

    /// Submits W3C input sources in one request.
    pub async fn perform_actions(&self, actions: &W3CActions) -> Result<()> {
        let url = self.endpoint.join(&["actions"]);
        self.transport
            .post("PerformActions", &url, &ActionsBody { actions })
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Keyboard, buttons and system services
    // -----------------------------------------------------------------------

    /// Types into the focused element. `frequency` defaults to 60 keys/s.
    pub async fn send_keys(&self, text: &str, frequency: Option<u32>) -> Result<()> {
        self.post_wda("SendKeys", &["keys"], &keys_body(text, frequency)).await?;
        Ok(())
    }

    pub async fn press_button(&self, button: DeviceButton) -> Result<()> {
        self.post_wda("PressButton", &["pressButton"], &json!({ "name": button }))
            .await?;
        Ok(())
    }

    /// Asks Siri to handle `text`.
    pub async fn siri_activate(&self, text: &str) -> Result<()> {
        self.post_wda("SiriActivate", &["siri", "activate"], &json!({ "text": text }))
            .await?;
        Ok(())
    }

    /// Opens a URL (or a custom scheme) on the device.
    pub async fn open_url(&self, url: &str) -> Result<()> {
        let route = self.endpoint.join(&["url"]);
        self.transport
            .post("OpenUrl", &route, &json!({ "url": url }))
            .await?;
        Ok(())
    }

    /// Simulates a matching (or non-matching) Touch ID / Face ID scan.
    pub async fn match_touch_id(&self, matches: bool) -> Result<()> {
        self.post_wda("MatchTouchID", &["touch_id"], &json!({ "match": matches }))
            .await?;
        Ok(())
    }

    /// Replaces the pasteboard contents. `content` is sent base64-encoded.
    pub async fn set_pasteboard(&self, content_type: PasteboardType, content: &[u8]) -> Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        self.post_wda(
            "SetPasteboard",
            &["setPasteboard"],
            &json!({ "contentType": content_type, "content": encoded }),
        )
        .await?;
        Ok(())
    }

    pub async fn get_pasteboard(&self, content_type: PasteboardType) -> Result<Vec<u8>> {
        self.post_wda(
            "GetPasteboard",
            &["getPasteboard"],
            &json!({ "contentType": content_type }),
        )
        .await?
        .value_base64("GetPasteboard")
    }

    // -----------------------------------------------------------------------
    // Alerts
    // -----------------------------------------------------------------------

    pub async fn alert_text(&self) -> Result<String> {
        let url = self.endpoint.join(&["alert", "text"]);
        Ok(self.transport.get("AlertText", &url).await?.value_string())
    }

    pub async fn alert_buttons(&self) -> Result<Vec<String>> {
        let url = self.endpoint.join_wda(&["alert", "buttons"]);
        self.transport.get("AlertButtons", &url).await?.value_as("AlertButtons")
    }

    /// Accepts the alert, optionally by button label.
    pub async fn alert_accept(&self, label: Option<&str>) -> Result<()> {
        let url = self.endpoint.join(&["alert", "accept"]);
        self.transport
            .post("AlertAccept", &url, &alert_body(label))
            .await?;
        Ok(())
    }

    /// Dismisses the alert, optionally by button label.
    pub async fn alert_dismiss(&self, label: Option<&str>) -> Result<()> {
        let url = self.endpoint.join(&["alert", "dismiss"]);
        self.transport
            .post("AlertDismiss", &url, &alert_body(label))
            .await?;
        Ok(())
    }

    /// Types into the alert's text field.
    pub async fn alert_send_keys(&self, text: &str) -> Result<()> {
        let url = self.endpoint.join(&["alert", "text"]);
        let value: Vec<String> = text.chars().map(String::from).collect();
        self.transport
            .post("AlertSendKeys", &url, &json!({ "value": value }))
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub async fn get_appium_settings(&self) -> Result<Map<String, Value>> {
        let url = self.endpoint.join(&["appium", "settings"]);
        self.transport
            .get("GetAppiumSettings", &url)
            .await?
            .value_as("GetAppiumSettings")
    }

    /// Updates settings and returns the full settings map afterwards.
    pub async fn set_appium_settings(&self, settings: Map<String, Value>) -> Result<Map<String, Value>> {
        let url = self.endpoint.join(&["appium", "settings"]);
        self.transport
            .post("SetAppiumSettings", &url, &json!({ "settings": settings }))
            .await?
            .value_as("SetAppiumSettings")
    }

    // -----------------------------------------------------------------------
    // Elements
    // -----------------------------------------------------------------------

    pub async fn find_element(&self, locator: &Locator) -> Result<Element> {
        let url = self.endpoint.join(&["element"]);
        find_element(&self.transport, &self.endpoint, url, locator, self.defaults).await
    }

    /// All matches for `locator`; an empty result is
    /// [`WdaError::NoSuchElement`].
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        let url = self.endpoint.join(&["elements"]);
        find_elements(&self.transport, &self.endpoint, url, locator, self.defaults).await
    }

    /// The element that currently has keyboard focus.
    pub async fn active_element(&self) -> Result<Element> {
        let url = self.endpoint.join(&["element", "active"]);
        let env = self.transport.get("ActiveElement", &url).await?;
        let id = env.element_id().ok_or(WdaError::MissingField {
            action: "ActiveElement",
            field: "ELEMENT",
        })?;
        Ok(Element::new(
            id,
            self.endpoint.clone(),
            self.transport.clone(),
            self.defaults,
        ))
    }

    // -----------------------------------------------------------------------
    // Screen contents
    // -----------------------------------------------------------------------

    pub async fn screenshot(&self) -> Result<Screenshot> {
        self.scope().screenshot().await
    }

    pub async fn source(&self, options: &SourceOptions) -> Result<String> {
        self.scope().source(options).await
    }

    pub async fn accessible_source(&self) -> Result<String> {
        self.scope().accessible_source().await
    }

    // -----------------------------------------------------------------------
    // Waiting
    // -----------------------------------------------------------------------

    /// Polls `condition` with the default timeout and interval.
    ///
    /// ```no_run
    /// # async fn example(session: wdakit::Session) -> wdakit::Result<()> {
    /// use wdakit::Locator;
    ///
    /// session
    ///     .wait(|s| async move {
    ///         Ok(s.find_elements(&Locator::Name("Done".into())).await.is_ok())
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn wait<F, Fut>(&self, condition: F) -> Result<()>
    where
        F: FnMut(Session) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        wait_until(self, self.defaults.timeout, self.defaults.interval, condition).await
    }

    pub async fn wait_with_timeout<F, Fut>(&self, timeout: Duration, condition: F) -> Result<()>
    where
        F: FnMut(Session) -> Fut,
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
        F: FnMut(Session) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        wait_until(self, timeout, interval, condition).await
    }
}

fn alert_body(label: Option<&str>) -> Value {
    match label.filter(|l| !l.is_empty()) {
        Some(name) => json!({ "name": name }),
        None => json!({}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_body_splits_characters() {
        let body = serde_json::to_value(keys_body("añ1", None)).unwrap();
        assert_eq!(body, json!({"value": ["a", "ñ", "1"], "frequency": 60}));
        let body = serde_json::to_value(keys_body("x", Some(10))).unwrap();
        assert_eq!(body["frequency"], 10);
    }

    #[test]
    fn session_endpoint_is_rerooted() {
        let root = Endpoint::parse("http://localhost:8100/").unwrap();
        let transport = Transport::new(Duration::from_secs(1), false).unwrap();
        let session = Session::new("S1", &root, transport, WaitDefaults::default());
        assert_eq!(session.endpoint().to_string(), "http://localhost:8100/session/S1");
        assert_eq!(
            session.endpoint().join_wda(&["touch", "multi", "perform"]),
            "http://localhost:8100/session/S1/wda/touch/multi/perform"
        );
        assert_eq!(root.to_string(), "http://localhost:8100/");
    }

    #[test]
    fn alert_body_omits_empty_label() {
        assert_eq!(alert_body(None), json!({}));
        assert_eq!(alert_body(Some("")), json!({}));
        assert_eq!(alert_body(Some("OK")), json!({"name": "OK"}));
    }
}
