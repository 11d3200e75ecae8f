//! HTTP transport to the agent.
//!
//! [`Transport`] executes one request at a time: it serializes the body,
//! attaches the fixed JSON headers, sends the request and returns the raw
//! response bytes. The HTTP status is never inspected; the agent answers 200
//! for failures too and reports them inside the envelope, which
//! [`Transport::get`], [`Transport::post`] and [`Transport::delete`] check
//! before returning.
//!
//! A transport can be bound to a target id (a device serial). Bound
//! transports look the HTTP client up in the owning client's
//! [`ConnectionRegistry`] on every call and fail with
//! [`WdaError::NoTransportBound`] when nothing is registered for the target.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, debug_span, info, Instrument};

use crate::error::{Result, WdaError};
use crate::response::Envelope;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const CONTENT_TYPE_JSON: &str = "application/json;charset=UTF-8";
const ACCEPT_JSON: &str = "application/json";

/// Request bodies longer than this are truncated in debug output.
const DEBUG_BODY_LIMIT: usize = 1024;

// ---------------------------------------------------------------------------
// ConnectionRegistry
// ---------------------------------------------------------------------------

/// Maps target ids (device serials) to HTTP clients that reach them.
///
/// Registration takes a write lock; lookups only read, so already
/// registered connections can be used from any number of tasks.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: RwLock<HashMap<String, reqwest::Client>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the client used for `target`.
    pub fn register(&self, target: impl Into<String>, client: reqwest::Client) {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        clients.insert(target.into(), client);
    }

    /// Removes the client registered for `target`, returning whether one existed.
    pub fn unregister(&self, target: &str) -> bool {
        let mut clients = self.clients.write().unwrap_or_else(|e| e.into_inner());
        clients.remove(target).is_some()
    }

    /// Returns the client registered for `target`.
    pub fn get(&self, target: &str) -> Option<reqwest::Client> {
        let clients = self.clients.read().unwrap_or_else(|e| e.into_inner());
        clients.get(target).cloned()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.get(target).is_some()
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Sends requests to the agent and decodes response envelopes.
///
/// Cloning is cheap; clones share the debug switch and the registry.
#[derive(Debug, Clone)]
pub struct Transport {
    default_client: reqwest::Client,
    registry: Arc<ConnectionRegistry>,
    target: Option<String>,
    debug: Arc<AtomicBool>,
}

impl Transport {
    /// Creates an unbound transport using a default HTTP client.
    ///
    /// The client honors the `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY`
    /// environment variables.
    pub fn new(request_timeout: Duration, debug: bool) -> Result<Self> {
        let default_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| WdaError::Request {
                action: "BuildClient",
                source,
            })?;
        Ok(Self::with_http_client(default_client, debug))
    }

    /// Creates an unbound transport around a caller-built HTTP client.
    pub fn with_http_client(default_client: reqwest::Client, debug: bool) -> Self {
        Self {
            default_client,
            registry: Arc::new(ConnectionRegistry::new()),
            target: None,
            debug: Arc::new(AtomicBool::new(debug)),
        }
    }

    /// Returns a transport that routes every request through the connection
    /// registered for `target`.
    pub fn bound_to(&self, target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
            ..self.clone()
        }
    }

    /// The registry shared by this transport and its clones.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// The target this transport is bound to, if any.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Turns request/response logging on or off for this transport and all
    /// of its clones.
    pub fn set_debug(&self, on: bool) {
        self.debug.store(on, Ordering::Relaxed);
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    fn http_client(&self) -> Result<reqwest::Client> {
        match &self.target {
            None => Ok(self.default_client.clone()),
            Some(target) => self
                .registry
                .get(target)
                .ok_or_else(|| WdaError::NoTransportBound(target.clone())),
        }
    }

    /// Executes one request and returns the raw response body.
    ///
    /// `body` must already be JSON-encoded (see [`encode_body`]).
    pub async fn execute(
        &self,
        action: &'static str,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let client = self.http_client()?;
        let span = debug_span!("wda_request", action, %method);
        async {
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
            headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON));

            let mut request = client.request(method.clone(), url).headers(headers);
            if let Some(bytes) = &body {
                request = request.body(bytes.clone());
            }

            let start = Instant::now();
            let response = request
                .send()
                .await
                .map_err(|source| WdaError::Request { action, source })?;
            let bytes = response.bytes().await;
            let elapsed = start.elapsed();

            if self.is_debug() {
                self.log_exchange(action, &method, url, body.as_deref(), elapsed, bytes.as_deref().ok());
            }
            let bytes = bytes.map_err(|source| WdaError::ReadBody { action, source })?;
            debug!(response_bytes = bytes.len(), ?elapsed, "response received");
            Ok(bytes.to_vec())
        }
        .instrument(span)
        .await
    }

    /// `GET url`, returning the checked envelope.
    pub async fn get(&self, action: &'static str, url: &str) -> Result<Envelope> {
        let bytes = self.execute(action, Method::GET, url, None).await?;
        Envelope::parse(&bytes).check()
    }

    /// `POST url` with a JSON body, returning the checked envelope.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        action: &'static str,
        url: &str,
        body: &B,
    ) -> Result<Envelope> {
        let bytes = encode_body(action, body)?;
        let bytes = self.execute(action, Method::POST, url, Some(bytes)).await?;
        Envelope::parse(&bytes).check()
    }

    /// `POST url` without a body, returning the checked envelope.
    pub async fn post_empty(&self, action: &'static str, url: &str) -> Result<Envelope> {
        let bytes = self.execute(action, Method::POST, url, None).await?;
        Envelope::parse(&bytes).check()
    }

    /// `DELETE url`, returning the checked envelope.
    pub async fn delete(&self, action: &'static str, url: &str) -> Result<Envelope> {
        let bytes = self.execute(action, Method::DELETE, url, None).await?;
        Envelope::parse(&bytes).check()
    }

    fn log_exchange(
        &self,
        action: &str,
        method: &Method,
        url: &str,
        body: Option<&[u8]>,
        elapsed: Duration,
        response: Option<&[u8]>,
    ) {
        let body = body.map(|b| truncate(&String::from_utf8_lossy(b), DEBUG_BODY_LIMIT));
        let response = match response {
            Some(bytes) if is_screenshot_route(url) => format!("<screenshot, {} bytes>", bytes.len()),
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => "<unreadable>".to_string(),
        };
        info!(
            action,
            %method,
            url,
            body = body.as_deref().unwrap_or(""),
            ?elapsed,
            response = %response,
            "wda request"
        );
    }
}

/// Serializes a request body, tagging failures as [`WdaError::InvalidRequestBody`].
pub fn encode_body<B: Serialize + ?Sized>(action: &'static str, body: &B) -> Result<Vec<u8>> {
    serde_json::to_vec(body).map_err(|source| WdaError::InvalidRequestBody { action, source })
}

fn is_screenshot_route(url: &str) -> bool {
    url.split(['?', '#'])
        .next()
        .unwrap_or(url)
        .split('/')
        .any(|segment| segment == "screenshot")
}

fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
