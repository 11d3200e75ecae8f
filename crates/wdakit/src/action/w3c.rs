//! W3C input sources.
//!
//! A [`W3CActions`] value holds one [`InputSource`] per finger or keyboard.
//! The agent runs all sources concurrently and keeps them in step only
//! through each source's own pauses, so sources that must line up need the
//! same number of ticks; padding with pauses is up to the caller.
//!
//! Finger sources get ids `finger1`, `finger2`, ... and keyboard sources
//! `keyboard1`, ... numbered by how many sources of the same kind precede
//! them.
//!
//! ```
//! use wdakit::action::{FingerAction, W3CActions};
//!
//! let actions = W3CActions::new()
//!     .finger(FingerAction::new().swipe((10.0, 400.0), (10.0, 100.0), None))
//!     .send_keys("hi");
//!
//! let json = serde_json::to_value(&actions).unwrap();
//! assert_eq!(json[0]["id"], "finger1");
//! assert_eq!(json[1]["id"], "keyboard1");
//! ```

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::seconds_to_ms;
use crate::element::Element;
use crate::response::W3C_ELEMENT_KEY;

/// Default duration for [`FingerAction::pause_default`], in seconds.
pub const DEFAULT_PAUSE_SECONDS: f64 = 0.5;

/// How long a finger stays down during a tap.
pub const TAP_HOLD_SECONDS: f64 = 0.1;

/// Gap between the two taps of a double tap.
pub const DOUBLE_TAP_GAP_SECONDS: f64 = 0.04;

/// Hold before and after the move of a swipe.
pub const SWIPE_HOLD_SECONDS: f64 = 0.25;

/// Coordinate space for a `pointerMove`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Screen coordinates (the W3C default).
    Viewport,
    /// Offset from the pointer's current position.
    Pointer,
    /// Offset from the centre of an element.
    Element(String),
}

impl From<&Element> for Origin {
    fn from(element: &Element) -> Self {
        Origin::Element(element.id().to_string())
    }
}

impl Serialize for Origin {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Origin::Viewport => serializer.serialize_str("viewport"),
            Origin::Pointer => serializer.serialize_str("pointer"),
            Origin::Element(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(W3C_ELEMENT_KEY, id)?;
                map.end()
            }
        }
    }
}

/// One primitive event of an input source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputAction {
    PointerMove {
        #[serde(skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
        x: f64,
        y: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        origin: Option<Origin>,
    },
    PointerDown {
        button: u8,
    },
    PointerUp {
        button: u8,
    },
    Pause {
        duration: u64,
    },
    KeyDown {
        value: String,
    },
    KeyUp {
        value: String,
    },
}

/// Builder for a single finger's event sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FingerAction {
    actions: Vec<InputAction>,
}

impl FingerAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[InputAction] {
        &self.actions
    }

    fn push(mut self, action: InputAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Moves the finger to `(x, y)`, relative to `origin` when given.
    pub fn move_to(self, x: f64, y: f64, origin: Option<Origin>) -> Self {
        self.push(InputAction::PointerMove {
            duration: None,
            x,
            y,
            origin,
        })
    }

    /// Moves the finger over `seconds` instead of instantly.
    pub fn move_over(self, x: f64, y: f64, seconds: f64, origin: Option<Origin>) -> Self {
        self.push(InputAction::PointerMove {
            duration: Some(seconds_to_ms(seconds)),
            x,
            y,
            origin,
        })
    }

    pub fn down(self) -> Self {
        self.push(InputAction::PointerDown { button: 0 })
    }

    pub fn up(self) -> Self {
        self.push(InputAction::PointerUp { button: 0 })
    }

    /// Holds the current state for `seconds`.
    pub fn pause(self, seconds: f64) -> Self {
        self.push(InputAction::Pause {
            duration: seconds_to_ms(seconds),
        })
    }

    /// Holds for [`DEFAULT_PAUSE_SECONDS`].
    pub fn pause_default(self) -> Self {
        self.pause(DEFAULT_PAUSE_SECONDS)
    }

    /// move → down → pause 0.1 s → up
    pub fn tap(self, x: f64, y: f64, origin: Option<Origin>) -> Self {
        self.move_to(x, y, origin)
            .down()
            .pause(TAP_HOLD_SECONDS)
            .up()
    }

    /// move → down → pause 0.1 s → up → pause 0.04 s → down → pause 0.1 s → up
    pub fn double_tap(self, x: f64, y: f64, origin: Option<Origin>) -> Self {
        self.move_to(x, y, origin)
            .down()
            .pause(TAP_HOLD_SECONDS)
            .up()
            .pause(DOUBLE_TAP_GAP_SECONDS)
            .down()
            .pause(TAP_HOLD_SECONDS)
            .up()
    }

    /// move → down → pause `seconds` → up
    pub fn press(self, x: f64, y: f64, seconds: f64, origin: Option<Origin>) -> Self {
        self.move_to(x, y, origin.clone())
            .down()
            .pause(seconds)
            .up()
    }

    /// move(from) → down → pause 0.25 s → move(to) → pause 0.25 s → up
    pub fn swipe(self, from: (f64, f64), to: (f64, f64), origin: Option<Origin>) -> Self {
        self.move_to(from.0, from.1, origin.clone())
            .down()
            .pause(SWIPE_HOLD_SECONDS)
            .move_to(to.0, to.1, origin)
            .pause(SWIPE_HOLD_SECONDS)
            .up()
    }
}

/// Builder for a keyboard's event sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyAction {
    actions: Vec<InputAction>,
}

impl KeyAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> &[InputAction] {
        &self.actions
    }

    pub fn key_down(mut self, key: impl Into<String>) -> Self {
        self.actions.push(InputAction::KeyDown { value: key.into() });
        self
    }

    pub fn key_up(mut self, key: impl Into<String>) -> Self {
        self.actions.push(InputAction::KeyUp { value: key.into() });
        self
    }

    pub fn pause(mut self, seconds: f64) -> Self {
        self.actions.push(InputAction::Pause {
            duration: seconds_to_ms(seconds),
        });
        self
    }

    /// One `keyDown`/`keyUp` pair per character of `text`.
    pub fn type_text(self, text: &str) -> Self {
        text.chars().fold(self, |acc, c| {
            let key = c.to_string();
            acc.key_down(key.clone()).key_up(key)
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Pointer,
    Key,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct PointerParameters {
    pointer_type: &'static str,
}

/// A named input source with its event sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputSource {
    #[serde(rename = "type")]
    kind: SourceKind,
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<PointerParameters>,
    actions: Vec<InputAction>,
}

impl InputSource {
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn actions(&self) -> &[InputAction] {
        &self.actions
    }
}

/// A set of input sources submitted as one atomic gesture.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct W3CActions {
    sources: Vec<InputSource>,
}

impl W3CActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sources(&self) -> &[InputSource] {
        &self.sources
    }

    fn count(&self, kind: SourceKind) -> usize {
        self.sources.iter().filter(|s| s.kind == kind).count()
    }

    /// Adds a touch pointer source.
    pub fn finger(mut self, finger: FingerAction) -> Self {
        let n = self.count(SourceKind::Pointer) + 1;
        self.sources.push(InputSource {
            kind: SourceKind::Pointer,
            id: format!("finger{n}"),
            parameters: Some(PointerParameters {
                pointer_type: "touch",
            }),
            actions: finger.actions,
        });
        self
    }

    /// Adds several touch pointer sources in order.
    pub fn fingers(self, fingers: impl IntoIterator<Item = FingerAction>) -> Self {
        fingers.into_iter().fold(self, W3CActions::finger)
    }

    /// Adds a keyboard source.
    pub fn keyboard(mut self, keys: KeyAction) -> Self {
        let n = self.count(SourceKind::Key) + 1;
        self.sources.push(InputSource {
            kind: SourceKind::Key,
            id: format!("keyboard{n}"),
            parameters: None,
            actions: keys.actions,
        });
        self
    }

    /// Adds a keyboard source typing `text`.
    pub fn send_keys(self, text: &str) -> Self {
        self.keyboard(KeyAction::new().type_text(text))
    }
}
