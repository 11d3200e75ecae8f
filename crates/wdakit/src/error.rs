//! Error type shared by every layer of the SDK.
//!
//! Errors fall into five groups: transport failures (the request never
//! produced a readable response), encoding failures (the body could not be
//! serialized), envelope failures (the response lacked an expected field),
//! errors reported by the agent inside the response envelope, and poll
//! timeouts raised only by [`wait`](crate::wait).

use std::time::Duration;

use thiserror::Error;

use crate::response::AgentError;
use crate::usb_tunnel::UsbTunnelError;

/// Errors returned by [`Client`](crate::Client), [`Session`](crate::Session)
/// and [`Element`](crate::Element) operations.
#[derive(Error, Debug)]
pub enum WdaError {
    /// The base URL given at construction could not be parsed.
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request body could not be serialized; no request was sent.
    #[error("{action}: invalid request body: {source}")]
    InvalidRequestBody {
        action: &'static str,
        source: serde_json::Error,
    },

    /// The request could not be built or sent.
    #[error("{action}: request failed: {source}")]
    Request {
        action: &'static str,
        source: reqwest::Error,
    },

    /// The response body could not be fully read.
    #[error("{action}: failed to read response: {source}")]
    ReadBody {
        action: &'static str,
        source: reqwest::Error,
    },

    /// The transport is bound to a target that has no registered connection.
    #[error("no transport bound for target '{0}'")]
    NoTransportBound(String),

    /// `GET /status` answered but the agent reported `ready: false`.
    #[error("agent at {0} is not ready")]
    NotReady(String),

    /// The agent reported an error inside the response envelope.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// A find query matched nothing.
    #[error("no such element: unable to find an element using '{using}', value '{value}'")]
    NoSuchElement { using: String, value: String },

    /// The response envelope lacked a field the route is expected to return.
    #[error("{action}: response has no '{field}'")]
    MissingField {
        action: &'static str,
        field: &'static str,
    },

    /// The response (or its `value`) was not the JSON shape the route returns.
    #[error("{action}: unexpected response: {source}")]
    Json {
        action: &'static str,
        source: serde_json::Error,
    },

    /// A base64 payload (screenshot, pasteboard) could not be decoded.
    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Screenshot bytes could not be decoded as an image.
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    /// A caller-supplied argument is outside the range the agent accepts.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A wait condition did not become true before the timeout.
    #[error("timeout after {elapsed:?}")]
    WaitTimeout { elapsed: Duration },

    /// A USB tunnel operation failed.
    #[error("USB tunnel error: {0}")]
    UsbTunnel(#[from] UsbTunnelError),

    /// An I/O error occurred (local forwarder, screenshot file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WdaError {
    /// Returns the agent's error type tag (e.g. `"no such element"`) when the
    /// error was reported by the agent or is a local not-found result.
    pub fn kind(&self) -> Option<&str> {
        match self {
            WdaError::Agent(err) => Some(err.kind.as_str()),
            WdaError::NoSuchElement { .. } => Some(crate::response::NO_SUCH_ELEMENT),
            _ => None,
        }
    }

    /// True if this is a poll timeout raised by the condition poller.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WdaError::WaitTimeout { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, WdaError>;
