//! Shared test helpers for wdakit integration tests.
//!
//! [`MockAgent`] wraps a [`wiremock::MockServer`] standing in for
//! WebDriverAgent. Scripted bodies are answered in order (`200 OK`, like the
//! real agent, whatever the envelope says); once the script runs out every
//! request gets a null envelope.

#![allow(dead_code)]

use serde_json::Value;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use wdakit::transport::Transport;
use wdakit::{Client, WdaConfig};

/// Reply sent once the script runs out.
const NULL_ENVELOPE: &str = r#"{"value":null,"sessionId":null}"#;

/// One request as the mock agent saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    /// Path plus query, e.g. `/session/S/source?format=xml`.
    pub path: String,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    /// The body parsed as JSON; `Null` when the request had no body.
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&self.body).unwrap()
        }
    }
}

impl From<&Request> for Recorded {
    fn from(req: &Request) -> Self {
        let header = |name: &str| {
            req.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let path = match req.url.query() {
            Some(query) => format!("{}?{}", req.url.path(), query),
            None => req.url.path().to_string(),
        };
        Self {
            method: req.method.as_str().to_string(),
            path,
            content_type: header("content-type"),
            accept: header("accept"),
            body: req.body.clone(),
        }
    }
}

pub struct MockAgent {
    server: MockServer,
}

impl MockAgent {
    /// Start a mock agent that replies with `responses` in order.
    pub async fn start<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let server = MockServer::start().await;
        // Among mocks of equal priority the first mounted wins, so each
        // one-shot reply is used up before the next one matches.
        for body in responses {
            Mock::given(any())
                .respond_with(json_reply(body.into()))
                .up_to_n_times(1)
                .mount(&server)
                .await;
        }
        Mock::given(any())
            .respond_with(json_reply(NULL_ENVELOPE.to_string()))
            .with_priority(10)
            .mount(&server)
            .await;
        Self { server }
    }

    /// Answers `verb path` with `body` ahead of the script.
    pub async fn route(&self, verb: &str, route: &str, body: impl Into<String>) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(json_reply(body.into()))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Everything received so far, in order.
    pub async fn requests(&self) -> Vec<Recorded> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(Recorded::from)
            .collect()
    }

    pub async fn request(&self, index: usize) -> Recorded {
        self.requests()
            .await
            .get(index)
            .cloned()
            .unwrap_or_else(|| panic!("no request #{index}"))
    }

    /// A client for this agent that ignores proxy settings.
    pub fn client(&self) -> Client {
        self.client_with(WdaConfig::default())
    }

    pub fn client_with(&self, config: WdaConfig) -> Client {
        Client::with_transport(&self.url(), direct_transport(), config).unwrap()
    }
}

fn json_reply(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "application/json")
}

/// A transport whose HTTP client never goes through a proxy.
pub fn direct_transport() -> Transport {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    Transport::with_http_client(http, false)
}

/// `{"value": <value>, "sessionId": <session>}` as text.
pub fn envelope(value: Value, session_id: Option<&str>) -> String {
    serde_json::json!({ "value": value, "sessionId": session_id }).to_string()
}

/// An agent-reported error envelope.
pub fn error_envelope(kind: &str, message: &str) -> String {
    envelope(serde_json::json!({ "error": kind, "message": message }), None)
}
