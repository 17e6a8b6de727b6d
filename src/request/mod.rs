//! Normalized request state handed to the dispatcher.
//!
//! A [`RequestState`] is built once per inbound request by the front
//! controller, mutated only through its setters while the request is being
//! normalized and treated as read-only from the moment dispatch begins.
//! Every `set_*` call is recorded in an ordered history log; the argument
//! mutators (`add_argument`, `remove_argument`) are not.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::RequestError;

pub mod route;
pub use route::Route;

/// Instructions describing how arguments are read from the request.
pub type Translation = BTreeMap<String, serde_json::Value>;

/// Running mode of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Cli,
    #[default]
    Web,
    Httpd,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Cli => "cli",
            Mode::Web => "web",
            Mode::Httpd => "httpd",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cli" => Ok(Mode::Cli),
            "web" => Ok(Mode::Web),
            "httpd" => Ok(Mode::Httpd),
            _ => Err(RequestError::UnknownMode(s.to_string())),
        }
    }
}

/// HTTP verb of the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Head,
    Put,
    Delete,
    Options,
    Trace,
    Connect,
}

impl Method {
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Post,
        Method::Head,
        Method::Put,
        Method::Delete,
        Method::Options,
        Method::Trace,
        Method::Connect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Head => "HEAD",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RequestError::UnknownMethod(s.to_string()))
    }
}

/// One recorded setter call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    /// Setter that was called
    pub method: &'static str,
    /// Arguments it was called with
    pub arguments: serde_json::Value,
}

/// Normalized representation of an inbound request.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Method, RequestState, Route};
///
/// let mut state = RequestState::new();
/// state
///     .set_method(Method::Post)
///     .set_url("/blog/show")
///     .set_active_route(Route::new("Blog", "show"));
///
/// assert!(state.is_post());
/// assert_eq!(state.active_route().map(Route::action), Some("show"));
/// assert_eq!(state.history().len(), 3);
/// assert_eq!(state.history()[0].method, "set_method");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    mode: Mode,
    method: Method,
    url: Option<String>,
    request_uri: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<serde_json::Value>,
    routes: serde_json::Value,
    active_route: Option<Route>,
    translation_matrix: Translation,
    rest: bool,
    protocol: Option<String>,
    ssl: bool,
    pattern: Option<String>,
    arguments: BTreeMap<String, serde_json::Value>,
    history: Vec<HistoryEntry>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, method: &'static str, arguments: serde_json::Value) {
        self.history.push(HistoryEntry { method, arguments });
    }

    pub fn set_mode(&mut self, mode: Mode) -> &mut Self {
        self.record("set_mode", json!([mode.as_str()]));
        self.mode = mode;
        self
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.record("set_method", json!([method.as_str()]));
        self.method = method;
        self
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        let url = url.into();
        self.record("set_url", json!([url]));
        self.url = Some(url);
        self
    }

    pub fn set_request_uri(&mut self, request_uri: impl Into<String>) -> &mut Self {
        let request_uri = request_uri.into();
        self.record("set_request_uri", json!([request_uri]));
        self.request_uri = Some(request_uri);
        self
    }

    /// Replaces all headers, keeping their order.
    pub fn set_headers<I, K, V>(&mut self, headers: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let headers: Vec<(String, String)> = headers
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        let recorded: Vec<serde_json::Value> = headers
            .iter()
            .map(|(name, value)| json!([name, value]))
            .collect();
        self.record("set_headers", json!([recorded]));
        self.headers = headers;
        self
    }

    pub fn set_body(&mut self, body: serde_json::Value) -> &mut Self {
        self.record("set_body", json!([body]));
        self.body = Some(body);
        self
    }

    pub fn set_routes(&mut self, routes: serde_json::Value) -> &mut Self {
        self.record("set_routes", json!([routes]));
        self.routes = routes;
        self
    }

    pub fn set_active_route(&mut self, route: Route) -> &mut Self {
        self.record(
            "set_active_route",
            json!([route.object(), route.action(), route.params()]),
        );
        self.active_route = Some(route);
        self
    }

    pub fn set_translation_matrix(&mut self, translation: Translation) -> &mut Self {
        self.record("set_translation_matrix", json!([translation]));
        self.translation_matrix = translation;
        self
    }

    pub fn set_rest(&mut self, rest: bool) -> &mut Self {
        self.record("set_rest", json!([rest]));
        self.rest = rest;
        self
    }

    pub fn set_protocol(&mut self, protocol: impl Into<String>) -> &mut Self {
        let protocol = protocol.into();
        self.record("set_protocol", json!([protocol]));
        self.protocol = Some(protocol);
        self
    }

    pub fn set_ssl(&mut self, ssl: bool) -> &mut Self {
        self.record("set_ssl", json!([ssl]));
        self.ssl = ssl;
        self
    }

    pub fn set_pattern(&mut self, pattern: impl Into<String>) -> &mut Self {
        let pattern = pattern.into();
        self.record("set_pattern", json!([pattern]));
        self.pattern = Some(pattern);
        self
    }

    /// Stores a request argument under `name`, replacing any previous value.
    /// Not recorded in the history.
    pub fn add_argument(&mut self, name: impl Into<String>, value: serde_json::Value) -> &mut Self {
        self.arguments.insert(name.into(), value);
        self
    }

    /// Removes a request argument; returns its value if it was present.
    pub fn remove_argument(&mut self, name: &str) -> Option<serde_json::Value> {
        self.arguments.remove(name)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn request_uri(&self) -> Option<&str> {
        self.request_uri.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Headers rendered one per line as `name = value`.
    pub fn headers_as_string(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{} = {}\n", name, value))
            .collect()
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    pub fn routes(&self) -> &serde_json::Value {
        &self.routes
    }

    pub fn active_route(&self) -> Option<&Route> {
        self.active_route.as_ref()
    }

    pub fn translation_matrix(&self) -> &Translation {
        &self.translation_matrix
    }

    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn arguments(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.arguments
    }

    pub fn argument(&self, name: &str) -> Option<&serde_json::Value> {
        self.arguments.get(name)
    }

    /// Setter calls in the order they were made.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn is_rest(&self) -> bool {
        self.rest
    }

    pub fn is_ssl(&self) -> bool {
        self.ssl
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::Get
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::Post
    }

    pub fn is_head(&self) -> bool {
        self.method == Method::Head
    }

    pub fn is_put(&self) -> bool {
        self.method == Method::Put
    }

    pub fn is_delete(&self) -> bool {
        self.method == Method::Delete
    }

    pub fn is_options(&self) -> bool {
        self.method == Method::Options
    }

    pub fn is_trace(&self) -> bool {
        self.method == Method::Trace
    }

    pub fn is_connect(&self) -> bool {
        self.method == Method::Connect
    }

    /// Captures the URL segments sitting under `{{name}}` placeholders of
    /// `pattern`.
    ///
    /// Placeholders past the end of a shorter URL are left out.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_dispatch::{RequestError, RequestState};
    ///
    /// let mut state = RequestState::new();
    /// assert_eq!(state.extract_pattern_variables("/{{foo}}"), Err(RequestError::MissingUrl));
    ///
    /// state.set_url("/1/2");
    /// let vars = state.extract_pattern_variables("/{{foo}}/{{bar}}").unwrap();
    /// assert_eq!(vars["foo"], "1");
    /// assert_eq!(vars["bar"], "2");
    /// ```
    pub fn extract_pattern_variables(&self, pattern: &str) -> Result<BTreeMap<String, String>, RequestError> {
        Ok(self
            .capture(pattern)?
            .into_iter()
            .filter_map(|(name, value)| value.map(|value| (name, value)))
            .collect())
    }

    /// Like [`RequestState::extract_pattern_variables`] but hands the values
    /// positionally to `callback`, one slot per placeholder, `None` for the
    /// ones the URL was too short to fill.
    pub fn extract_pattern_variables_with<R, F>(&self, pattern: &str, callback: F) -> Result<R, RequestError>
    where
        F: FnOnce(Vec<Option<String>>) -> R,
    {
        let values = self.capture(pattern)?.into_iter().map(|(_, value)| value).collect();
        Ok(callback(values))
    }

    fn capture(&self, pattern: &str) -> Result<Vec<(String, Option<String>)>, RequestError> {
        let url = self.url.as_deref().ok_or(RequestError::MissingUrl)?;
        let segments: Vec<&str> = url.split('/').skip(1).collect();

        Ok(pattern
            .trim()
            .split('/')
            .skip(1)
            .enumerate()
            .filter_map(|(index, partial)| {
                let name = partial.strip_prefix("{{")?.strip_suffix("}}")?;
                let value = segments.get(index).map(|segment| segment.to_string());
                Some((name.to_string(), value))
            })
            .collect())
    }
}
