//! Axum web framework integration.
//!
//! Serves every request through a [`Dispatcher`]:
//! - [`HttpResponse`] converts into an axum response
//! - [`request_state_from_parts`] normalizes an incoming request into a
//!   [`RequestState`], taking the route from the first two path segments
//! - [`create_app_with_dispatcher`] wires a fallback handler running the
//!   dispatcher for each request

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Router,
};

use crate::{
    Container, DispatchError, Dispatcher, HttpResponse, Method, Mode, Registry, RequestError,
    RequestState, Route,
};

/// Largest request body read into the request state.
pub const BODY_LIMIT: usize = 2 * 1024 * 1024;

impl IntoResponse for HttpResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();
        let headers = response.headers_mut();
        if let Some(content_type) = self.content_type.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
            headers.insert(header::CONTENT_TYPE, content_type);
        }
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                header::HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, value);
            }
        }
        response
    }
}

/// Application state shared by the dispatching handler.
#[derive(Clone)]
pub struct DispatchAppState {
    registry: Registry,
    container: Arc<Container>,
    debug: Option<bool>,
    connector_kind: Option<String>,
}

impl DispatchAppState {
    pub fn new(registry: Registry, container: Arc<Container>) -> Self {
        Self {
            registry,
            container,
            debug: None,
            connector_kind: None,
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn with_connector_kind(mut self, kind: impl Into<String>) -> Self {
        self.connector_kind = Some(kind.into());
        self
    }

    fn dispatcher(&self) -> Dispatcher {
        let mut dispatcher = Dispatcher::new(self.registry.clone(), self.container.clone());
        if let Some(debug) = self.debug {
            dispatcher = dispatcher.with_debug(debug);
        }
        if let Some(kind) = &self.connector_kind {
            dispatcher = dispatcher.with_connector_kind(kind.clone());
        }
        dispatcher
    }
}

impl std::fmt::Debug for DispatchAppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchAppState")
            .field("container", &self.container)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

/// Rejection for requests that cannot be dispatched
#[derive(Debug)]
pub enum DispatchRejection {
    /// The request could not be normalized
    Request(RequestError),
    /// The body could not be read or is not JSON
    Body(String),
    /// Dispatch failed outside the presenter error taxonomy
    Dispatch(DispatchError),
}

impl IntoResponse for DispatchRejection {
    fn into_response(self) -> Response {
        match self {
            DispatchRejection::Request(RequestError::UnknownMethod(verb)) => {
                (StatusCode::METHOD_NOT_ALLOWED, format!("Unsupported method {}", verb)).into_response()
            }
            DispatchRejection::Request(e) => (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
            DispatchRejection::Body(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            DispatchRejection::Dispatch(DispatchError::MissingRoute) => {
                (StatusCode::NOT_FOUND, DispatchError::MissingRoute.to_string()).into_response()
            }
            DispatchRejection::Dispatch(e) => {
                tracing::error!(error = %e, "dispatch failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

/// Normalizes request `parts` and an already parsed `body`.
///
/// Path `/blog/show/42` becomes route `blog`/`show` with parameter `42`;
/// shorter paths leave the request without an active route. Query arguments
/// and route segments are percent-decoded, `+` in the query reads as a space.
pub fn request_state_from_parts(parts: &Parts, body: Option<serde_json::Value>) -> Result<RequestState, RequestError> {
    let mut state = RequestState::new();
    state
        .set_mode(Mode::Httpd)
        .set_method(parts.method.as_str().parse::<Method>()?)
        .set_url(parts.uri.path())
        .set_request_uri(parts.uri.to_string())
        .set_protocol(format!("{:?}", parts.version))
        .set_ssl(parts.uri.scheme_str() == Some("https"))
        .set_headers(
            parts
                .headers
                .iter()
                .filter_map(|(name, value)| Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))),
        );

    if let Some(body) = body {
        state.set_body(body);
    }

    let json_requested = parts
        .headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    state.set_rest(json_requested);

    if let Some(query) = parts.uri.query() {
        for (name, value) in url::form_urlencoded::parse(query.as_bytes()).into_owned() {
            state.add_argument(name, serde_json::Value::String(value));
        }
    }

    let segments = parts
        .uri
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_segment)
        .collect::<Result<Vec<_>, _>>()?;
    if let Ok(route) = Route::from_segments(segments) {
        state.set_active_route(route);
    }
    Ok(state)
}

fn decode_segment(segment: &str) -> Result<String, RequestError> {
    percent_encoding::percent_decode_str(segment)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| RequestError::InvalidEncoding(segment.to_string()))
}

/// Handler running the dispatcher for one request.
pub async fn dispatch_handler(State(state): State<DispatchAppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match read_json_body(body).await {
        Ok(body) => body,
        Err(rejection) => return rejection.into_response(),
    };
    let request_state = match request_state_from_parts(&parts, body) {
        Ok(request_state) => request_state,
        Err(e) => return DispatchRejection::Request(e).into_response(),
    };

    let mut dispatcher = state.dispatcher();
    match dispatcher.create_from_request_state(Arc::new(request_state)) {
        Ok(response) => response.into_response(),
        Err(e) => DispatchRejection::Dispatch(e).into_response(),
    }
}

async fn read_json_body(body: Body) -> Result<Option<serde_json::Value>, DispatchRejection> {
    let bytes = axum::body::to_bytes(body, BODY_LIMIT)
        .await
        .map_err(|e| DispatchRejection::Body(e.to_string()))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| DispatchRejection::Body(format!("Request body is not JSON: {}", e)))
}

/// Builds a router dispatching every unmatched request.
///
/// ```rust,no_run
/// use ferrous_dispatch::axum_integration::create_app_with_dispatcher;
/// use ferrous_dispatch::{ClassRegistry, DependencyCollection, Registry};
/// use std::sync::Arc;
///
/// let container = Arc::new(DependencyCollection::new().build(Arc::new(ClassRegistry::new())));
/// let app = create_app_with_dispatcher(Registry::default(), container, |router| router);
/// ```
pub fn create_app_with_dispatcher<F>(registry: Registry, container: Arc<Container>, configure: F) -> Router
where
    F: FnOnce(Router<DispatchAppState>) -> Router<DispatchAppState>,
{
    let state = DispatchAppState::new(registry, container);
    configure(Router::new())
        .fallback(dispatch_handler)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_request_state_from_parts() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("http://localhost/blog/show/42?draft=1")
            .header("Accept", "application/json")
            .body(())
            .unwrap();
        let (parts, _) = request.into_parts();

        let state = request_state_from_parts(&parts, Some(serde_json::json!({"title": "x"}))).unwrap();
        assert!(state.is_post());
        assert!(state.is_rest());
        assert_eq!(state.mode(), Mode::Httpd);
        assert_eq!(state.url(), Some("/blog/show/42"));
        assert_eq!(state.argument("draft"), Some(&serde_json::json!("1")));
        let route = state.active_route().unwrap();
        assert_eq!((route.object(), route.action()), ("blog", "show"));
        assert_eq!(route.params(), ["42"]);
    }

    #[test]
    fn test_query_and_segments_are_decoded() {
        let (parts, _) = HttpRequest::builder()
            .uri("/blog/show/hello%20world?title=hello%20world&tag=a+b&na%6De=x&flag")
            .body(())
            .unwrap()
            .into_parts();

        let state = request_state_from_parts(&parts, None).unwrap();
        assert_eq!(state.argument("title"), Some(&serde_json::json!("hello world")));
        assert_eq!(state.argument("tag"), Some(&serde_json::json!("a b")));
        assert_eq!(state.argument("name"), Some(&serde_json::json!("x")));
        assert_eq!(state.argument("flag"), Some(&serde_json::json!("")));
        assert_eq!(state.active_route().unwrap().params(), ["hello world"]);
    }

    #[test]
    fn test_undecodable_segment_is_rejected() {
        let (parts, _) = HttpRequest::builder().uri("/blog/show/%FF").body(()).unwrap().into_parts();
        assert_eq!(
            request_state_from_parts(&parts, None).unwrap_err(),
            RequestError::InvalidEncoding("%FF".to_string())
        );
    }

    #[test]
    fn test_short_path_has_no_route() {
        let (parts, _) = HttpRequest::builder().uri("/blog").body(()).unwrap().into_parts();
        let state = request_state_from_parts(&parts, None).unwrap();
        assert!(state.active_route().is_none());
    }

    #[test]
    fn test_http_response_conversion() {
        let response = HttpResponse {
            status: 422,
            content_type: Some("application/json".to_string()),
            headers: vec![("X-Trace".to_string(), "abc".to_string())],
            body: "{}".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()["x-trace"], "abc");
    }
}
