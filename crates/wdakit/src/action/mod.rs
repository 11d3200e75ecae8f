//! Gesture and keyboard input encoders.
//!
//! Two encoders produce the JSON the agent expects for multi-step input:
//!
//! - [`touch`] - the legacy "touch actions" list (`press`, `moveTo`,
//!   `wait`, `release`, ...) posted to `/wda/touch/multi/perform`.
//! - [`w3c`] - W3C input sources (one per finger, one per keyboard) posted
//!   together to `/actions`.
//!
//! Neither encoder performs I/O; a finished sequence is submitted with
//! [`Session::perform_touch_actions`](crate::Session::perform_touch_actions)
//! or [`Session::perform_actions`](crate::Session::perform_actions) in a
//! single request.
//!
//! Durations are accepted in seconds and always encoded in milliseconds.

pub mod touch;
pub mod w3c;

pub use touch::{PressOptions, TouchActions, TouchOptions, TouchStep};
pub use w3c::{FingerAction, InputAction, InputSource, KeyAction, Origin, W3CActions};

/// Converts seconds to whole milliseconds for the wire.
///
/// Negative and non-finite inputs encode as zero.
pub(crate) fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}
