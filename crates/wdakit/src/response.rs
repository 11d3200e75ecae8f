//! Decoding of the JSON envelope every agent response is wrapped in.
//!
//! Successful responses look like `{"value": <any>, "sessionId": "..."}`.
//! Failures keep HTTP 200 and put an error object in `value`:
//!
//! ```text
//! {
//!   "value": {
//!     "error": "unknown error",
//!     "message": "Error Domain=com.facebook.WebDriverAgent Code=1 \"Timed out\" UserInfo={NSLocalizedDescription=Timed out}",
//!     "traceback": ""
//!   },
//!   "sessionId": "215BB5C5-B189-496F-83B7-37CBBB2DC54E"
//! }
//! ```
//!
//! [`Envelope::error`] turns the second shape into an [`AgentError`] whose
//! message is the human-readable part of the agent's verbose string.

use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::{Result, WdaError};

/// Error type tag the agent uses when a find query matches nothing.
pub const NO_SUCH_ELEMENT: &str = "no such element";

/// Key under which W3C-compliant agents return element ids.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Key under which legacy (JSONWP) agents return element ids.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Matches the first `{...=...}` group, e.g. `{NSLocalizedDescription=text}`.
static USER_INFO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{.+?=(.+?)\}").expect("user info pattern is valid")
});

/// An error reported by the agent in `value.error` / `value.message`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct AgentError {
    /// The error type tag, e.g. `no such element` or `invalid session id`.
    pub kind: String,
    /// The cleaned, human-readable message.
    pub message: String,
}

/// A parsed response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    raw: Value,
}

impl Envelope {
    /// Parses raw response bytes.
    ///
    /// Bodies that are not JSON (for example the plain `I-AM-ALIVE` returned
    /// by `/health`) parse to an envelope with no value and no error.
    pub fn parse(bytes: &[u8]) -> Self {
        let raw = serde_json::from_slice(bytes).unwrap_or(Value::Null);
        Self { raw }
    }

    /// The whole decoded document.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// The `value` subtree, or `Value::Null` when absent.
    pub fn value(&self) -> &Value {
        self.raw.get("value").unwrap_or(&Value::Null)
    }

    /// The `sessionId` field, when present and non-empty.
    pub fn session_id(&self) -> Option<&str> {
        self.raw
            .get("sessionId")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// The `sessionId` field, or a [`WdaError::MissingField`] error.
    pub fn require_session_id(&self, action: &'static str) -> Result<&str> {
        self.session_id().ok_or(WdaError::MissingField {
            action,
            field: "sessionId",
        })
    }

    /// The agent-reported error, if `value.error` is non-empty.
    pub fn error(&self) -> Option<AgentError> {
        let value = self.value();
        let kind = value.get("error").and_then(Value::as_str).unwrap_or("");
        if kind.is_empty() {
            return None;
        }
        let message = value.get("message").and_then(Value::as_str).unwrap_or("");
        Some(AgentError {
            kind: kind.to_string(),
            message: clean_message(message),
        })
    }

    /// Returns `Err` with the agent error if one is present.
    pub fn check(self) -> Result<Self> {
        match self.error() {
            Some(err) => Err(err.into()),
            None => Ok(self),
        }
    }

    /// Deserializes `value` into `T`.
    pub fn value_as<T: DeserializeOwned>(&self, action: &'static str) -> Result<T> {
        T::deserialize(self.value()).map_err(|source| WdaError::Json { action, source })
    }

    /// `value` as a boolean; a missing or non-boolean value is `false`.
    pub fn value_bool(&self) -> bool {
        self.value().as_bool().unwrap_or(false)
    }

    /// `value` as a string; non-string values are rendered as JSON text.
    pub fn value_string(&self) -> String {
        match self.value() {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// `value` decoded from standard base64 (screenshots, pasteboard).
    ///
    /// A missing or non-string `value` is [`WdaError::MissingField`]; an
    /// empty string decodes to no bytes.
    pub fn value_base64(&self, action: &'static str) -> Result<Vec<u8>> {
        let encoded = self.value().as_str().ok_or(WdaError::MissingField {
            action,
            field: "value",
        })?;
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }

    /// The element id in `value`, accepting both the W3C and legacy keys.
    pub fn element_id(&self) -> Option<String> {
        element_id_of(self.value())
    }

    /// The element ids in an array `value`. Entries without an id are skipped.
    pub fn element_ids(&self) -> Vec<String> {
        self.value()
            .as_array()
            .map(|items| items.iter().filter_map(element_id_of).collect())
            .unwrap_or_default()
    }
}

fn element_id_of(value: &Value) -> Option<String> {
    [W3C_ELEMENT_KEY, LEGACY_ELEMENT_KEY]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Extracts the human-readable part of an agent error message.
///
/// Uses the value of the first `{key=value}` group when there is one
/// (`NSLocalizedDescription` in practice) and the raw message otherwise.
pub fn clean_message(message: &str) -> String {
    USER_INFO_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCKED_ERR: &str = r#"{
        "value": {
            "error": "unknown error",
            "message": "Error Domain=com.facebook.WebDriverAgent Code=1 \"Timed out while waiting\" UserInfo={NSLocalizedDescription=Timed out while waiting}",
            "traceback": ""
        },
        "sessionId": "215BB5C5-B189-496F-83B7-37CBBB2DC54E"
    }"#;

    #[test]
    fn success_envelope() {
        let env = Envelope::parse(br#"{"value":true,"sessionId":"S1"}"#);
        assert!(env.error().is_none());
        assert!(env.value_bool());
        assert_eq!(env.session_id(), Some("S1"));
    }

    #[test]
    fn error_message_is_cleaned() {
        let err = Envelope::parse(LOCKED_ERR.as_bytes()).error().unwrap();
        assert_eq!(err.kind, "unknown error");
        assert_eq!(err.message, "Timed out while waiting");
        assert!(err.to_string().ends_with("Timed out while waiting"));
    }

    #[test]
    fn unstructured_message_is_kept_verbatim() {
        let env = Envelope::parse(
            br#"{"value":{"error":"no such element","message":"unable to find an element"}}"#,
        );
        let err = env.error().unwrap();
        assert_eq!(err.to_string(), "no such element: unable to find an element");
    }

    #[test]
    fn parse_is_idempotent() {
        let a = Envelope::parse(LOCKED_ERR.as_bytes());
        let b = Envelope::parse(LOCKED_ERR.as_bytes());
        assert_eq!(a, b);
        assert_eq!(a.error(), b.error());
        assert_eq!(a.session_id(), b.session_id());
        assert_eq!(a.value(), b.value());
    }

    #[test]
    fn empty_error_field_is_success() {
        let env = Envelope::parse(br#"{"value":{"error":"","message":"x"}}"#);
        assert!(env.error().is_none());
        assert!(env.check().is_ok());
    }

    #[test]
    fn missing_session_id() {
        let env = Envelope::parse(br#"{"value":{}}"#);
        let err = env.require_session_id("NewSession").unwrap_err();
        assert!(matches!(err, WdaError::MissingField { field: "sessionId", .. }));
    }

    #[test]
    fn non_json_body_has_no_value() {
        let env = Envelope::parse(b"I-AM-ALIVE");
        assert!(env.value().is_null());
        assert!(env.error().is_none());
    }

    #[test]
    fn element_ids_accept_both_keys() {
        let env = Envelope::parse(
            br#"{"value":[{"ELEMENT":"A"},{"element-6066-11e4-a52e-4f735466cecf":"B"},{}]}"#,
        );
        assert_eq!(env.element_ids(), vec!["A".to_string(), "B".to_string()]);
        let single = Envelope::parse(br#"{"value":{"ELEMENT":"C"}}"#);
        assert_eq!(single.element_id().as_deref(), Some("C"));
    }

    #[test]
    fn base64_value() {
        let env = Envelope::parse(br#"{"value":"aGVsbG8="}"#);
        assert_eq!(env.value_base64("Screenshot").unwrap(), b"hello");
        let empty = Envelope::parse(br#"{"value":""}"#);
        assert!(empty.value_base64("GetPasteboard").unwrap().is_empty());
    }

    #[test]
    fn base64_value_must_be_present() {
        for body in [&br#"{"value":null}"#[..], br#"{"sessionId":"S"}"#, br#"{"value":{}}"#] {
            let err = Envelope::parse(body).value_base64("Screenshot").unwrap_err();
            assert!(
                matches!(err, WdaError::MissingField { action: "Screenshot", field: "value" }),
                "{err:?}"
            );
        }
    }

    #[test]
    fn typed_value() {
        #[derive(serde::Deserialize)]
        struct Size {
            width: i64,
            height: i64,
        }
        let env = Envelope::parse(br#"{"value":{"width":375,"height":812}}"#);
        let size: Size = env.value_as("WindowSize").unwrap();
        assert_eq!((size.width, size.height), (375, 812));
    }
}
