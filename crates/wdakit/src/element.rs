//! Element handles.
//!
//! An [`Element`] is an opaque id plus the session endpoint it was found
//! under. Handles are plain values: nothing is cached, and a stale id is only
//! noticed when the agent rejects the next request that uses it.

use std::f64::consts::PI;
use std::future::Future;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use crate::action::{FingerAction, Origin, W3CActions};
use crate::endpoint::Endpoint;
use crate::error::{Result, WdaError};
use crate::locator::Locator;
use crate::model::{
    Direction, PickerWheelOrder, Rect, ScrollTarget, DEFAULT_SCROLL_DISTANCE,
};
use crate::response::NO_SUCH_ELEMENT;
use crate::screenshot::Screenshot;
use crate::session::{keys_body, DEFAULT_HOLD_SECONDS};
use crate::transport::Transport;
use crate::wait::{wait_until, WaitDefaults};

/// Largest scale accepted by [`Element::pinch_to_zoom_out_by_actions`].
pub const MAX_PINCH_ACTION_SCALE: f64 = 23.0;

/// Offset used by [`Element::picker_wheel_select`] when none is given.
pub const DEFAULT_PICKER_OFFSET: u32 = 2;

/// A UI element resolved by a find query.
#[derive(Debug, Clone)]
pub struct Element {
    id: String,
    session: Endpoint,
    transport: Transport,
    defaults: WaitDefaults,
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.session == other.session
    }
}

impl Element {
    pub(crate) fn new(
        id: impl Into<String>,
        session: Endpoint,
        transport: Transport,
        defaults: WaitDefaults,
    ) -> Self {
        Self {
            id: id.into(),
            session,
            transport,
            defaults,
        }
    }

    /// The agent-assigned element id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session endpoint this element was resolved against.
    pub fn session_endpoint(&self) -> &Endpoint {
        &self.session
    }

    fn url(&self, tail: &[&str]) -> String {
        let mut elems = vec!["element", self.id.as_str()];
        elems.extend_from_slice(tail);
        self.session.join(&elems)
    }

    fn wda_url(&self, tail: &[&str]) -> String {
        let mut elems = vec!["element", self.id.as_str()];
        elems.extend_from_slice(tail);
        self.session.join_wda(&elems)
    }

    async fn get_bool(&self, action: &'static str, url: String) -> Result<bool> {
        Ok(self.transport.get(action, &url).await?.value_bool())
    }

    async fn get_string(&self, action: &'static str, url: String) -> Result<String> {
        Ok(self.transport.get(action, &url).await?.value_string())
    }

    // -----------------------------------------------------------------------
    // Basic interaction
    // -----------------------------------------------------------------------

    pub async fn click(&self) -> Result<()> {
        self.transport.post_empty("Click", &self.url(&["click"])).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.transport.post_empty("Clear", &self.url(&["clear"])).await?;
        Ok(())
    }

    /// Types `text` into the element. `frequency` is keystrokes per second
    /// and defaults to 60.
    pub async fn send_keys(&self, text: &str, frequency: Option<u32>) -> Result<()> {
        let body = keys_body(text, frequency);
        self.transport
            .post("SendKeys", &self.url(&["value"]), &body)
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    pub async fn text(&self) -> Result<String> {
        self.get_string("Text", self.url(&["text"])).await
    }

    /// The element type, e.g. `XCUIElementTypeButton`.
    pub async fn element_type(&self) -> Result<String> {
        self.get_string("Type", self.url(&["name"])).await
    }

    pub async fn rect(&self) -> Result<Rect> {
        self.transport
            .get("Rect", &self.url(&["rect"]))
            .await?
            .value_as("Rect")
    }

    pub async fn is_enabled(&self) -> Result<bool> {
        self.get_bool("IsEnabled", self.url(&["enabled"])).await
    }

    pub async fn is_displayed(&self) -> Result<bool> {
        self.get_bool("IsDisplayed", self.url(&["displayed"])).await
    }

    pub async fn is_selected(&self) -> Result<bool> {
        self.get_bool("IsSelected", self.url(&["selected"])).await
    }

    pub async fn is_accessible(&self) -> Result<bool> {
        self.get_bool("IsAccessible", self.wda_url(&["accessible"])).await
    }

    pub async fn is_accessibility_container(&self) -> Result<bool> {
        self.get_bool(
            "IsAccessibilityContainer",
            self.wda_url(&["accessibilityContainer"]),
        )
        .await
    }

    /// Reads an attribute such as `label`, `value` or `visible`.
    pub async fn attribute(&self, name: &str) -> Result<String> {
        self.get_string("GetAttribute", self.url(&["attribute", name]))
            .await
    }

    // -----------------------------------------------------------------------
    // Gestures
    // -----------------------------------------------------------------------

    /// Taps at `(x, y)` relative to the element's top-left corner.
    pub async fn tap(&self, x: f64, y: f64) -> Result<()> {
        let url = self.session.join_wda(&["tap", &self.id]);
        self.transport
            .post("Tap", &url, &json!({ "x": x, "y": y }))
            .await?;
        Ok(())
    }

    pub async fn double_tap(&self) -> Result<()> {
        self.transport
            .post_empty("DoubleTap", &self.wda_url(&["doubleTap"]))
            .await?;
        Ok(())
    }

    /// Presses the element for `seconds` (default 1.0).
    pub async fn touch_and_hold(&self, seconds: Option<f64>) -> Result<()> {
        let duration = hold_seconds(seconds);
        self.transport
            .post(
                "TouchAndHold",
                &self.wda_url(&["touchAndHold"]),
                &json!({ "duration": duration }),
            )
            .await?;
        Ok(())
    }

    pub async fn two_finger_tap(&self) -> Result<()> {
        self.transport
            .post_empty("TwoFingerTap", &self.wda_url(&["twoFingerTap"]))
            .await?;
        Ok(())
    }

    /// Taps `taps` times (1..=10) with `touches` fingers (1..=5).
    pub async fn tap_with_number_of_taps(&self, taps: u32, touches: u32) -> Result<()> {
        validate_taps(taps, touches)?;
        self.transport
            .post(
                "TapWithNumberOfTaps",
                &self.wda_url(&["tapWithNumberOfTaps"]),
                &json!({ "numberOfTaps": taps, "numberOfTouches": touches }),
            )
            .await?;
        Ok(())
    }

    /// Presses with `pressure` for `seconds` (default 1.0).
    pub async fn force_touch(&self, pressure: f64, seconds: Option<f64>) -> Result<()> {
        let body = json!({ "pressure": pressure, "duration": hold_seconds(seconds) });
        self.transport
            .post("ForceTouch", &self.wda_url(&["forceTouch"]), &body)
            .await?;
        Ok(())
    }

    /// Like [`force_touch`](Self::force_touch), at `(x, y)` inside the element.
    pub async fn force_touch_at(
        &self,
        x: f64,
        y: f64,
        pressure: f64,
        seconds: Option<f64>,
    ) -> Result<()> {
        let body = json!({
            "x": x,
            "y": y,
            "pressure": pressure,
            "duration": hold_seconds(seconds),
        });
        self.transport
            .post("ForceTouch", &self.wda_url(&["forceTouch"]), &body)
            .await?;
        Ok(())
    }

    /// Drags between two points relative to the element, holding the first
    /// point for `press_seconds` (default 1.0).
    pub async fn drag(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        press_seconds: Option<f64>,
    ) -> Result<()> {
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
        self.transport
            .post("Drag", &self.wda_url(&["dragfromtoforduration"]), &body)
            .await?;
        Ok(())
    }

    /// Swipes across the element.
    pub async fn swipe(&self, direction: Direction) -> Result<()> {
        self.transport
            .post(
                "Swipe",
                &self.wda_url(&["swipe"]),
                &json!({ "direction": direction }),
            )
            .await?;
        Ok(())
    }

    /// Scrolls the element (or its scroll view ancestor).
    pub async fn scroll(&self, target: ScrollTarget) -> Result<()> {
        self.transport
            .post("Scroll", &self.wda_url(&["scroll"]), &target.body())
            .await?;
        Ok(())
    }

    /// Scrolls half the element's height or width in `direction`.
    pub async fn scroll_direction(&self, direction: Direction) -> Result<()> {
        self.scroll(ScrollTarget::Direction(direction, DEFAULT_SCROLL_DISTANCE))
            .await
    }

    /// Pinches with `scale` (> 0, ≠ 1) at `velocity` scale factors per
    /// second. Zooming in (`scale > 1`) needs a positive velocity, zooming
    /// out (`scale < 1`) a negative one.
    pub async fn pinch(&self, scale: f64, velocity: f64) -> Result<()> {
        validate_pinch(scale, velocity)?;
        self.transport
            .post(
                "Pinch",
                &self.wda_url(&["pinch"]),
                &json!({ "scale": scale, "velocity": velocity }),
            )
            .await?;
        Ok(())
    }

    pub async fn pinch_to_zoom_in(&self) -> Result<()> {
        self.pinch(2.0, 10.0).await
    }

    pub async fn pinch_to_zoom_out(&self) -> Result<()> {
        self.pinch(0.9, -4.5).await
    }

    /// Zooms out with two W3C fingers that start on opposite sides of the
    /// element's centre and swipe onto it.
    ///
    /// Each finger starts `scale * 2%` of the element's width and height
    /// away from the centre. `scale` defaults to 1 and is capped at
    /// [`MAX_PINCH_ACTION_SCALE`].
    pub async fn pinch_to_zoom_out_by_actions(&self, scale: Option<f64>) -> Result<()> {
        let rect = self.rect().await?;
        let (dx, dy) = pinch_offsets(rect.width, rect.height, scale);
        let origin = Origin::from(self);
        let actions = W3CActions::new()
            .finger(FingerAction::new().swipe((-dx, -dy), (0.0, 0.0), Some(origin.clone())))
            .finger(FingerAction::new().swipe((dx, dy), (0.0, 0.0), Some(origin)));
        let url = self.session.join(&["actions"]);
        self.transport
            .post("PinchToZoomOutByActions", &url, &json!({ "actions": actions }))
            .await?;
        Ok(())
    }

    /// Rotates two fingers by `rotation` radians (|rotation| ≤ 2π).
    /// `velocity` defaults to `rotation` and must share its sign.
    pub async fn rotate(&self, rotation: f64, velocity: Option<f64>) -> Result<()> {
        let velocity = validate_rotation(rotation, velocity)?;
        self.transport
            .post(
                "Rotate",
                &self.wda_url(&["rotate"]),
                &json!({ "rotation": rotation, "velocity": velocity }),
            )
            .await?;
        Ok(())
    }

    /// Turns a picker wheel by `offset` steps (1..=5, default 2) in `order`.
    pub async fn picker_wheel_select(
        &self,
        order: PickerWheelOrder,
        offset: Option<u32>,
    ) -> Result<()> {
        let offset = picker_offset(offset)?;
        let url = self
            .session
            .join_wda(&["pickerwheel", &self.id, "select"]);
        self.transport
            .post(
                "PickerWheelSelect",
                &url,
                &json!({ "order": order, "offset": offset }),
            )
            .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries scoped under this element
    // -----------------------------------------------------------------------

    /// Finds the first descendant matching `locator`.
    pub async fn find_element(&self, locator: &Locator) -> Result<Element> {
        find_element(
            &self.transport,
            &self.session,
            self.url(&["element"]),
            locator,
            self.defaults,
        )
        .await
    }

    /// Finds all descendants matching `locator`. An empty result is
    /// [`WdaError::NoSuchElement`].
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<Element>> {
        find_elements(
            &self.transport,
            &self.session,
            self.url(&["elements"]),
            locator,
            self.defaults,
        )
        .await
    }

    /// Cells of a table or collection view that are currently on screen.
    pub async fn visible_cells(&self) -> Result<Vec<Element>> {
        let env = self
            .transport
            .get("FindVisibleCells", &self.wda_url(&["getVisibleCells"]))
            .await?;
        Ok(env
            .element_ids()
            .into_iter()
            .map(|id| Element::new(id, self.session.clone(), self.transport.clone(), self.defaults))
            .collect())
    }

    /// Captures the element's frame.
    pub async fn screenshot(&self) -> Result<Screenshot> {
        let env = self
            .transport
            .get("Screenshot", &self.url(&["screenshot"]))
            .await?;
        Ok(Screenshot::new(env.value_base64("Screenshot")?))
    }

    // -----------------------------------------------------------------------
    // Waiting
    // -----------------------------------------------------------------------

    /// Polls `condition` with the default timeout and interval.
    pub async fn wait<F, Fut>(&self, condition: F) -> Result<()>
    where
        F: FnMut(Element) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        wait_until(self, self.defaults.timeout, self.defaults.interval, condition).await
    }

    pub async fn wait_with_timeout<F, Fut>(&self, timeout: Duration, condition: F) -> Result<()>
    where
        F: FnMut(Element) -> Fut,
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
        F: FnMut(Element) -> Fut,
        Fut: Future<Output = Result<bool>>,
    {
        wait_until(self, timeout, interval, condition).await
    }
}

// ---------------------------------------------------------------------------
// Find helpers shared with Session
// ---------------------------------------------------------------------------

fn not_found(locator: &Locator) -> WdaError {
    WdaError::NoSuchElement {
        using: locator.using().to_string(),
        value: locator.value().to_string(),
    }
}

fn map_not_found(err: WdaError, locator: &Locator) -> WdaError {
    match err {
        WdaError::Agent(ref agent) if agent.kind == NO_SUCH_ELEMENT => not_found(locator),
        other => other,
    }
}

pub(crate) async fn find_element(
    transport: &Transport,
    session: &Endpoint,
    url: String,
    locator: &Locator,
    wait: WaitDefaults,
) -> Result<Element> {
    let env = transport
        .post("FindElement", &url, &locator.body())
        .await
        .map_err(|e| map_not_found(e, locator))?;
    let id = env.element_id().ok_or_else(|| not_found(locator))?;
    debug!(%locator, element = %id, "element found");
    Ok(Element::new(id, session.clone(), transport.clone(), wait))
}

pub(crate) async fn find_elements(
    transport: &Transport,
    session: &Endpoint,
    url: String,
    locator: &Locator,
    wait: WaitDefaults,
) -> Result<Vec<Element>> {
    let env = transport
        .post("FindElements", &url, &locator.body())
        .await
        .map_err(|e| map_not_found(e, locator))?;
    let ids = env.element_ids();
    if ids.is_empty() {
        return Err(not_found(locator));
    }
    debug!(%locator, count = ids.len(), "elements found");
    Ok(ids
        .into_iter()
        .map(|id| Element::new(id, session.clone(), transport.clone(), wait))
        .collect())
}

// ---------------------------------------------------------------------------
// Argument validation
// ---------------------------------------------------------------------------

/// Whole-point finger offsets from the element centre for a pinch of `scale`.
fn pinch_offsets(width: f64, height: f64, scale: Option<f64>) -> (f64, f64) {
    let scale = scale.unwrap_or(1.0).min(MAX_PINCH_ACTION_SCALE);
    let ratio = scale * 2.0 / 100.0;
    ((width * ratio).trunc(), (height * ratio).trunc())
}

fn hold_seconds(seconds: Option<f64>) -> f64 {
    match seconds {
        Some(s) if s > 0.0 => s,
        _ => DEFAULT_HOLD_SECONDS,
    }
}

fn validate_taps(taps: u32, touches: u32) -> Result<()> {
    let msg = if touches == 0 {
        "'numberOfTouches' must be greater than zero"
    } else if touches > 5 {
        "'numberOfTouches' cannot be greater than 5"
    } else if taps == 0 {
        "'numberOfTaps' must be greater than zero"
    } else if taps > 10 {
        "'numberOfTaps' cannot be greater than 10"
    } else {
        return Ok(());
    };
    Err(WdaError::InvalidArgument(msg.into()))
}

fn validate_pinch(scale: f64, velocity: f64) -> Result<()> {
    let msg = if scale <= 0.0 {
        "'scale' must be greater than zero"
    } else if scale == 1.0 {
        "'scale' must be greater or less than 1"
    } else if scale < 1.0 && velocity > 0.0 {
        "'velocity' must be less than zero when 'scale' is less than 1"
    } else if scale > 1.0 && velocity <= 0.0 {
        "'velocity' must be greater than zero when 'scale' is greater than 1"
    } else {
        return Ok(());
    };
    Err(WdaError::InvalidArgument(msg.into()))
}

fn validate_rotation(rotation: f64, velocity: Option<f64>) -> Result<f64> {
    if !(-2.0 * PI..=2.0 * PI).contains(&rotation) {
        return Err(WdaError::InvalidArgument(
            "'rotation' must not be more than 2π or less than -2π".into(),
        ));
    }
    let velocity = match velocity {
        Some(v) if v != 0.0 => v,
        _ => rotation,
    };
    if (rotation > 0.0 && velocity < 0.0) || (rotation < 0.0 && velocity > 0.0) {
        return Err(WdaError::InvalidArgument(
            "'rotation' and 'velocity' must have the same sign".into(),
        ));
    }
    Ok(velocity)
}

/// Validates a picker offset and converts it to the agent's fractional form.
fn picker_offset(offset: Option<u32>) -> Result<f64> {
    let offset = offset.unwrap_or(DEFAULT_PICKER_OFFSET);
    if offset == 0 || offset > 5 {
        return Err(WdaError::InvalidArgument(format!(
            "'offset' value is expected to be in range (0, 5]. '{offset}' was given instead"
        )));
    }
    Ok(f64::from(offset) * 0.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element() -> Element {
        let transport = Transport::new(Duration::from_secs(1), false).unwrap();
        let session = Endpoint::parse("http://localhost:8100/session/S1").unwrap();
        Element::new("E1", session, transport, WaitDefaults::default())
    }

    #[test]
    fn element_routes() {
        let e = element();
        assert_eq!(e.url(&["click"]), "http://localhost:8100/session/S1/element/E1/click");
        assert_eq!(
            e.wda_url(&["doubleTap"]),
            "http://localhost:8100/session/S1/wda/element/E1/doubleTap"
        );
        assert_eq!(
            e.url(&["attribute", "label"]),
            "http://localhost:8100/session/S1/element/E1/attribute/label"
        );
    }

    #[test]
    fn tap_count_limits() {
        assert!(validate_taps(1, 1).is_ok());
        assert!(validate_taps(10, 5).is_ok());
        assert!(validate_taps(11, 1).is_err());
        assert!(validate_taps(0, 1).is_err());
        assert!(validate_taps(1, 0).is_err());
        let err = validate_taps(1, 6).unwrap_err();
        assert!(err.to_string().contains("numberOfTouches"));
    }

    #[test]
    fn pinch_action_offsets_scale_with_rect() {
        assert_eq!(pinch_offsets(300.0, 200.0, None), (6.0, 4.0));
        assert_eq!(pinch_offsets(300.0, 200.0, Some(10.0)), (60.0, 40.0));
        // capped at 23
        assert_eq!(pinch_offsets(100.0, 100.0, Some(50.0)), (46.0, 46.0));
        // whole points only
        assert_eq!(pinch_offsets(110.0, 90.0, None), (2.0, 1.0));
    }

    #[test]
    fn pinch_rules() {
        assert!(validate_pinch(2.0, 10.0).is_ok());
        assert!(validate_pinch(0.9, -4.5).is_ok());
        assert!(validate_pinch(0.0, 1.0).is_err());
        assert!(validate_pinch(1.0, 1.0).is_err());
        assert!(validate_pinch(0.5, 1.0).is_err());
        assert!(validate_pinch(2.0, 0.0).is_err());
    }

    #[test]
    fn rotation_rules() {
        assert_eq!(validate_rotation(PI, None).unwrap(), PI);
        assert_eq!(validate_rotation(-1.0, Some(0.0)).unwrap(), -1.0);
        assert_eq!(validate_rotation(1.0, Some(3.0)).unwrap(), 3.0);
        assert!(validate_rotation(7.0, None).is_err());
        assert!(validate_rotation(1.0, Some(-1.0)).is_err());
    }

    #[test]
    fn picker_offsets() {
        assert!((picker_offset(None).unwrap() - 0.2).abs() < 1e-9);
        assert!((picker_offset(Some(5)).unwrap() - 0.5).abs() < 1e-9);
        assert!(picker_offset(Some(0)).is_err());
        let err = picker_offset(Some(6)).unwrap_err();
        assert!(err.to_string().contains("'6' was given"));
    }

    #[test]
    fn hold_defaults_to_one_second() {
        assert_eq!(hold_seconds(None), 1.0);
        assert_eq!(hold_seconds(Some(-2.0)), 1.0);
        assert_eq!(hold_seconds(Some(2.5)), 2.5);
    }

    #[test]
    fn equality_ignores_transport() {
        let a = element();
        let b = element();
        assert_eq!(a, b);
    }
}
