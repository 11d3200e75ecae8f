//! Legacy (Appium-style) touch action lists.
//!
//! A [`TouchActions`] value is an ordered list of steps, each serialized as
//! `{"action": "<name>", "options": {...}}`:
//!
//! ```
//! use wdakit::action::{PressOptions, TouchActions, TouchOptions};
//!
//! let actions = TouchActions::new()
//!     .press(PressOptions::new().xy(100.0, 150.0).pressure(0.2))
//!     .wait(0.2)
//!     .move_to(TouchOptions::new().xy(300.0, 150.0))
//!     .release();
//!
//! let json = serde_json::to_value(&actions).unwrap();
//! assert_eq!(json[1], serde_json::json!({"action": "wait", "options": {"ms": 200}}));
//! ```
//!
//! A step may carry coordinates, an element, or both. When both are set the
//! element is the anchor and the coordinates are offsets from its top-left
//! corner.

use serde::Serialize;

use super::seconds_to_ms;
use crate::element::Element;

/// Default duration for [`TouchActions::wait_default`], in seconds.
pub const DEFAULT_WAIT_SECONDS: f64 = 1.0;

/// Position options shared by `tap`, `longPress` and `moveTo` steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TouchOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u32>,
}

impl TouchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn xy(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Anchors the step on an element.
    pub fn element(self, element: &Element) -> Self {
        self.element_id(element.id())
    }

    /// Anchors the step on an element id obtained elsewhere.
    pub fn element_id(mut self, id: impl Into<String>) -> Self {
        self.element = Some(id.into());
        self
    }

    /// Number of taps (only meaningful for `tap` steps).
    pub fn count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

/// Options for a `press` step.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PressOptions {
    #[serde(flatten)]
    position: TouchOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pressure: Option<f64>,
}

impl PressOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn xy(mut self, x: f64, y: f64) -> Self {
        self.position = self.position.xy(x, y);
        self
    }

    pub fn element(mut self, element: &Element) -> Self {
        self.position = self.position.element(element);
        self
    }

    pub fn element_id(mut self, id: impl Into<String>) -> Self {
        self.position = self.position.element_id(id);
        self
    }

    /// Force Touch pressure.
    pub fn pressure(mut self, pressure: f64) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

/// Options for a `wait` step. Always milliseconds on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WaitOptions {
    pub ms: u64,
}

/// One step of a legacy touch action list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", content = "options", rename_all = "camelCase")]
pub enum TouchStep {
    Tap(TouchOptions),
    Press(PressOptions),
    LongPress(TouchOptions),
    MoveTo(TouchOptions),
    Wait(WaitOptions),
    Release,
    Cancel,
}

/// An ordered legacy touch action list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TouchActions {
    steps: Vec<TouchStep>,
}

impl TouchActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[TouchStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    fn push(mut self, step: TouchStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn tap(self, opts: TouchOptions) -> Self {
        self.push(TouchStep::Tap(opts))
    }

    pub fn press(self, opts: PressOptions) -> Self {
        self.push(TouchStep::Press(opts))
    }

    pub fn long_press(self, opts: TouchOptions) -> Self {
        self.push(TouchStep::LongPress(opts))
    }

    pub fn move_to(self, opts: TouchOptions) -> Self {
        self.push(TouchStep::MoveTo(opts))
    }

    /// Pauses for `seconds`; encoded as `{"ms": seconds * 1000}`.
    pub fn wait(self, seconds: f64) -> Self {
        self.push(TouchStep::Wait(WaitOptions {
            ms: seconds_to_ms(seconds),
        }))
    }

    /// Pauses for [`DEFAULT_WAIT_SECONDS`].
    pub fn wait_default(self) -> Self {
        self.wait(DEFAULT_WAIT_SECONDS)
    }

    pub fn release(self) -> Self {
        self.push(TouchStep::Release)
    }

    pub fn cancel(self) -> Self {
        self.push(TouchStep::Cancel)
    }
}
