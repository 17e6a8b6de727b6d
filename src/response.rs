//! Response emitter filled in by actions and by the dispatcher.
//!
//! The first `send_*` call wins; later ones are ignored and report `false`.
//! This replaces terminating the process after a response has been sent:
//! the caller reads the result through [`Response::snapshot`] and decides
//! what to do with it.

use std::fmt;

use parking_lot::Mutex;
use serde::Serialize;

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=UTF-8";
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=UTF-8";

/// Final response of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Body parsed as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: None,
            headers: Vec::new(),
            body: String::new(),
        }
    }
}

#[derive(Default)]
struct State {
    sent: Option<(u16, &'static str, String)>,
    headers: Vec<(String, String)>,
}

/// Response being built for the current request.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::Response;
///
/// let response = Response::new();
/// assert!(response.send_json(&serde_json::json!({"ok": true}), 201));
/// assert!(!response.send_html("<p>too late</p>"));
///
/// let sent = response.snapshot();
/// assert_eq!(sent.status, 201);
/// assert_eq!(sent.json().unwrap()["ok"], true);
/// ```
#[derive(Default)]
pub struct Response {
    state: Mutex<State>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends an HTML page with status 200.
    pub fn send_html(&self, html: impl Into<String>) -> bool {
        self.send(200, CONTENT_TYPE_HTML, html.into())
    }

    /// Sends `payload` encoded as JSON with `status`.
    pub fn send_json(&self, payload: &serde_json::Value, status: u16) -> bool {
        self.send(status, CONTENT_TYPE_JSON, payload.to_string())
    }

    /// Sends a bare status with a plain text message.
    pub fn send_http_status(&self, code: u16, message: impl Into<String>) -> bool {
        self.send(code, CONTENT_TYPE_TEXT, message.into())
    }

    /// Adds a header, replacing any previous header of the same name.
    pub fn set_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let mut state = self.state.lock();
        state.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        state.headers.push((name, value.into()));
    }

    pub fn is_sent(&self) -> bool {
        self.state.lock().sent.is_some()
    }

    pub fn status(&self) -> Option<u16> {
        self.state.lock().sent.as_ref().map(|(status, _, _)| *status)
    }

    /// Current response; an empty 200 when nothing has been sent.
    pub fn snapshot(&self) -> HttpResponse {
        let state = self.state.lock();
        match &state.sent {
            Some((status, content_type, body)) => HttpResponse {
                status: *status,
                content_type: Some(content_type.to_string()),
                headers: state.headers.clone(),
                body: body.clone(),
            },
            None => HttpResponse {
                headers: state.headers.clone(),
                ..HttpResponse::default()
            },
        }
    }

    fn send(&self, status: u16, content_type: &'static str, body: String) -> bool {
        let mut state = self.state.lock();
        if state.sent.is_some() {
            return false;
        }
        state.sent = Some((status, content_type, body));
        true
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("sent", &self.is_sent())
            .field("status", &self.status())
            .finish()
    }
}
