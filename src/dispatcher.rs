//! Request dispatcher.
//!
//! The dispatcher turns a [`RequestState`] into an [`HttpResponse`]: it reads
//! the active route, builds the model, view and connector layers for it,
//! runs the matching action and converts presenter failures into responses.
//!
//! ```text
//! Idle -> RouteExtracted -> LayersBuilt -> Dispatched -> Responded
//!                                                     \-> Failed
//! ```
//!
//! Only the [`DispatchFailure`] kinds are answered here. Container errors and
//! [`ActionError::Other`] propagate to the caller unchanged.

use std::fmt;
use std::sync::Arc;

use serde_json::json;

use crate::layer::{Connector, LayerContext, LayerLoader, Renderer, DEFAULT_CONNECTOR};
use crate::{
    ActionError, Container, DispatchError, DispatchFailure, HttpResponse, Instance, Registry,
    RequestState, RestPresenterError, Route,
};

/// Configuration node holding the debug flag.
pub const DEBUG_NODE: &str = "debugging:enabled";

/// Lifecycle of one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,
    RouteExtracted,
    LayersBuilt,
    Dispatched,
    Responded,
    Failed,
}

/// Outcome of checking whether a connector can serve an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    /// No connector was built for the route
    BadRequest,
    /// The connector does not serve the action
    NotFound,
}

impl Validation {
    /// HTTP status of a failed validation.
    pub fn status(&self) -> Option<u16> {
        match self {
            Validation::Valid => None,
            Validation::BadRequest => Some(400),
            Validation::NotFound => Some(404),
        }
    }
}

/// Dispatches requests to the layers registered for their routes.
///
/// A dispatcher handles one request at a time; its layers live until the
/// next call to [`Dispatcher::create_from_request_state`].
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{
///     ClassRegistry, DependencyCollection, DispatchState, Dispatcher, Registry, RequestState, Route,
/// };
/// use std::sync::Arc;
///
/// let container = Arc::new(DependencyCollection::new().build(Arc::new(ClassRegistry::new())));
/// let mut dispatcher = Dispatcher::new(Registry::default(), container);
///
/// let mut request = RequestState::new();
/// request.set_active_route(Route::new("Blog", "show"));
///
/// let response = dispatcher.create_from_request_state(Arc::new(request)).unwrap();
/// assert_eq!(response.status, 400);
/// assert_eq!(dispatcher.state(), DispatchState::Failed);
/// ```
pub struct Dispatcher {
    registry: Registry,
    loader: LayerLoader,
    debug: bool,
    connector_kind: String,
    state: DispatchState,
    scope: Option<Registry>,
    request: Option<Arc<RequestState>>,
    route: Option<Route>,
    model: Option<Instance>,
    view: Option<Arc<dyn Renderer>>,
    connector: Option<Box<dyn Connector>>,
}

impl Dispatcher {
    /// Creates a dispatcher; debugging follows the `debugging:enabled`
    /// configuration node and is off when the node is missing.
    pub fn new(registry: Registry, container: Arc<Container>) -> Self {
        let debug = registry.configuration().get_bool_or(DEBUG_NODE, false);
        Self {
            registry,
            loader: LayerLoader::new(container),
            debug,
            connector_kind: DEFAULT_CONNECTOR.to_string(),
            state: DispatchState::Idle,
            scope: None,
            request: None,
            route: None,
            model: None,
            view: None,
            connector: None,
        }
    }

    /// Includes code, file, line and causes in REST error envelopes.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Layer name connectors are loaded under, `Presenter` by default.
    pub fn with_connector_kind(mut self, kind: impl Into<String>) -> Self {
        self.connector_kind = kind.into();
        self
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn connector_kind(&self) -> &str {
        &self.connector_kind
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Request being dispatched, once one was handed in.
    pub fn request_state(&self) -> Option<&Arc<RequestState>> {
        self.request.as_ref()
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn model(&self) -> Option<&Instance> {
        self.model.as_ref()
    }

    pub fn view(&self) -> Option<&Arc<dyn Renderer>> {
        self.view.as_ref()
    }

    pub fn has_connector(&self) -> bool {
        self.connector.is_some()
    }

    /// Dispatches `request` and returns the response it produced.
    ///
    /// Presenter failures and failed validations are answered with an error
    /// response and reported as `Ok`. Everything else is returned as `Err`
    /// without a response being sent.
    pub fn create_from_request_state(&mut self, request: Arc<RequestState>) -> Result<HttpResponse, DispatchError> {
        self.reset();
        let scope = self.registry.scoped();
        self.scope = Some(scope.clone());
        self.request = Some(request.clone());

        let Some(route) = request.active_route().cloned() else {
            self.transition(DispatchState::Failed);
            return Err(DispatchError::MissingRoute);
        };
        self.route = Some(route.clone());
        self.transition(DispatchState::RouteExtracted);

        if let Err(error) = self.build_layers(&scope, request, route) {
            self.transition(DispatchState::Failed);
            return Err(error);
        }
        self.transition(DispatchState::LayersBuilt);

        match self.dispatch() {
            Ok(()) => self.transition(DispatchState::Responded),
            Err(DispatchError::Failure(failure)) => {
                self.respond(&scope, &failure);
                self.transition(DispatchState::Failed);
            }
            Err(error) => {
                scope
                    .logger()
                    .error(&format!("Dispatch aborted: {}", error));
                self.transition(DispatchState::Failed);
                return Err(error);
            }
        }

        Ok(scope.response().snapshot())
    }

    /// Runs `<action>Action` of the route on the connector.
    ///
    /// Attaches the view, if any, before the action runs.
    pub fn dispatch(&mut self) -> Result<(), DispatchError> {
        let route = self.route.clone().ok_or(DispatchError::MissingRoute)?;
        let method = route.action_method();
        self.transition(DispatchState::Dispatched);

        match Self::validate_request(self.connector.as_deref(), &method) {
            Validation::BadRequest => {
                return Err(DispatchFailure::BadRequest {
                    message: format!(
                        "No connector instance to execute route (\"/{}/{}\") on. Sure it exists?",
                        route.object(),
                        route.action()
                    ),
                }
                .into());
            }
            Validation::NotFound => {
                return Err(DispatchFailure::NotFound {
                    message: format!(
                        "Method: \"{}()\" in instance of class: \"{}\" not callable. Sure it exists?",
                        method,
                        route.object()
                    ),
                }
                .into());
            }
            Validation::Valid => {}
        }

        let Some(connector) = self.connector.as_mut() else {
            return Err(DispatchError::MissingRoute);
        };
        if let Some(view) = &self.view {
            connector.attach(view.clone());
        }

        connector.invoke(&method).map_err(|error| match error {
            ActionError::Rest(e) => DispatchError::Failure(DispatchFailure::RestPresenter(e)),
            ActionError::Presenter(e) => DispatchError::Failure(DispatchFailure::Presenter(e)),
            ActionError::Other(e) => DispatchError::Action(e),
        })
    }

    /// Checks that `connector` exists and serves `method`.
    pub fn validate_request(connector: Option<&dyn Connector>, method: &str) -> Validation {
        match connector {
            None => Validation::BadRequest,
            Some(connector) if connector.responds_to(method) => Validation::Valid,
            Some(_) => Validation::NotFound,
        }
    }

    fn build_layers(&mut self, scope: &Registry, request: Arc<RequestState>, route: Route) -> Result<(), DispatchError> {
        let object = route.object().to_string();
        let context = LayerContext::new(scope.clone(), request, route);

        self.model = self.loader.init_model(&object, context.model_arguments())?;
        self.view = self.loader.init_view(&object, context.model_arguments())?;
        self.connector = self.loader.init_connector(
            &object,
            &self.connector_kind,
            context.connector_arguments(self.model.as_ref(), self.view.as_ref()),
        )?;
        Ok(())
    }

    fn respond(&self, scope: &Registry, failure: &DispatchFailure) {
        scope.logger().log(
            crate::Level::WARN,
            failure.message(),
            &json!({ "status": failure.status() }),
        );

        let response = scope.response();
        let sent = match failure {
            DispatchFailure::RestPresenter(error) => {
                response.send_json(&self.envelope(error), error.code())
            }
            other => response.send_http_status(other.status(), other.message()),
        };
        if !sent {
            scope
                .logger()
                .debug("Response was already sent; error response dropped");
        }
    }

    /// JSON body answering a REST presenter error.
    pub fn envelope(&self, error: &RestPresenterError) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert("error".to_string(), json!([error.message()]));
        if let Some(token) = error.token() {
            body.insert("security".to_string(), json!({ "token": token }));
        }
        if self.debug {
            body.insert(
                "meta".to_string(),
                json!({
                    "code": error.code(),
                    "file": error.file(),
                    "line": error.line(),
                    "previous": error.causes(),
                }),
            );
        }
        serde_json::Value::Object(body)
    }

    fn transition(&mut self, next: DispatchState) {
        let logger = self.scope.as_ref().unwrap_or(&self.registry).logger();
        logger.log(
            crate::Level::DEBUG,
            &format!("Dispatcher: {:?} -> {:?}", self.state, next),
            &json!({ "route": self.route.as_ref().map(Route::to_string) }),
        );
        self.state = next;
    }

    fn reset(&mut self) {
        self.state = DispatchState::Idle;
        self.scope = None;
        self.request = None;
        self.route = None;
        self.model = None;
        self.view = None;
        self.connector = None;
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("state", &self.state)
            .field("debug", &self.debug)
            .field("connector_kind", &self.connector_kind)
            .field("route", &self.route)
            .field("model", &self.model)
            .field("view", &self.view.is_some())
            .field("connector", &self.connector.is_some())
            .finish()
    }
}
