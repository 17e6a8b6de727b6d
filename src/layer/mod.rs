//! Model, view and connector layers assembled per route.
//!
//! Models are plain shared objects. Views implement [`Renderer`] and are
//! attached to the connector before its action runs. Connectors implement
//! [`Connector`]: they report which action methods they serve and run them by
//! name, which takes the place of calling `<action>Action()` reflectively.
//!
//! Layers receive their collaborators positionally. [`LayerContext`] and
//! [`ConnectorContext`] build and decode those argument lists so layer
//! constructors never depend on the positions themselves.

use std::fmt;
use std::sync::Arc;

use crate::request::Translation;
use crate::{
    ActionResult, Arguments, Cache, Configuration, DiError, DiResult, Instance, Registry,
    RequestState, Response, Route, Value,
};

pub mod loader;
pub use loader::{Layer, LayerLoader};

/// Name of the default connector layer.
pub const DEFAULT_CONNECTOR: &str = "Presenter";

/// Kind of layer a class is loaded as; its name prefixes the class name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerKind {
    Model,
    View,
    /// Connector layer under the given name, `Presenter` by default
    Connector(String),
}

impl LayerKind {
    pub fn presenter() -> Self {
        LayerKind::Connector(DEFAULT_CONNECTOR.to_string())
    }

    /// Class name prefix, e.g. `Model` in `Model_Blog`.
    pub fn prefix(&self) -> &str {
        match self {
            LayerKind::Model => "Model",
            LayerKind::View => "View",
            LayerKind::Connector(name) => name,
        }
    }
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A view layer: turns data pushed by a connector into a response.
pub trait Renderer: Send + Sync {
    fn render(&self, data: &serde_json::Value, response: &Response) -> ActionResult;
}

/// A connector layer (presenter): owns the route's action methods.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{ActionResult, ActionTable, Connector, Renderer, ViewSet};
/// use std::sync::Arc;
///
/// struct BlogPresenter {
///     views: ViewSet,
///     shown: u32,
/// }
///
/// impl BlogPresenter {
///     fn actions() -> ActionTable<Self> {
///         ActionTable::new().action("showAction", |p: &mut Self| {
///             p.shown += 1;
///             Ok(())
///         })
///     }
/// }
///
/// impl Connector for BlogPresenter {
///     fn responds_to(&self, method: &str) -> bool {
///         Self::actions().contains(method)
///     }
///
///     fn invoke(&mut self, method: &str) -> ActionResult {
///         Self::actions().call(self, method)
///     }
///
///     fn attach(&mut self, view: Arc<dyn Renderer>) {
///         self.views.attach(view);
///     }
/// }
///
/// let mut presenter = BlogPresenter { views: ViewSet::new(), shown: 0 };
/// assert!(presenter.responds_to("showAction"));
/// assert!(!presenter.responds_to("editAction"));
/// presenter.invoke("showAction").unwrap();
/// assert_eq!(presenter.shown, 1);
/// ```
pub trait Connector: Send {
    /// True when `method` names an action this connector can run.
    fn responds_to(&self, method: &str) -> bool;

    /// Runs action `method`.
    fn invoke(&mut self, method: &str) -> ActionResult;

    /// Registers a view to render the results of actions.
    fn attach(&mut self, view: Arc<dyn Renderer>);
}

type Action<C> = fn(&mut C) -> ActionResult;

/// Name to method table backing a [`Connector`] implementation.
pub struct ActionTable<C> {
    actions: Vec<(&'static str, Action<C>)>,
}

impl<C> ActionTable<C> {
    pub fn new() -> Self {
        Self { actions: Vec::new() }
    }

    /// Adds or replaces the action `name`.
    pub fn action(mut self, name: &'static str, action: Action<C>) -> Self {
        self.actions.retain(|(existing, _)| *existing != name);
        self.actions.push((name, action));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Action<C>> {
        self.actions
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, action)| *action)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.actions.iter().map(|(name, _)| *name)
    }

    /// Runs action `name` on `target`.
    ///
    /// Unknown names report a 404 presenter error; the dispatcher checks
    /// [`Connector::responds_to`] first, so this only happens on direct calls.
    pub fn call(&self, target: &mut C, name: &str) -> ActionResult {
        match self.get(name) {
            Some(action) => action(target),
            None => Err(crate::PresenterError::new(404, format!("Unknown action {}()", name)).into()),
        }
    }
}

impl<C> Default for ActionTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for ActionTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Views attached to a connector, notified in attach order.
#[derive(Clone, Default)]
pub struct ViewSet {
    views: Vec<Arc<dyn Renderer>>,
}

impl ViewSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, view: Arc<dyn Renderer>) {
        self.views.push(view);
    }

    /// Removes `view`; returns whether it was attached.
    pub fn detach(&mut self, view: &Arc<dyn Renderer>) -> bool {
        let before = self.views.len();
        self.views.retain(|attached| !Arc::ptr_eq(attached, view));
        self.views.len() != before
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    /// Renders `data` through every view; stops at the first error.
    pub fn notify(&self, data: &serde_json::Value, response: &Response) -> ActionResult {
        for view in &self.views {
            view.render(data, response)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ViewSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSet").field("views", &self.views.len()).finish()
    }
}

// Argument positions shared by model and view constructors
const REGISTRY: usize = 0;
const REQUEST_STATE: usize = 1;
const ROUTE: usize = 2;
const CACHE: usize = 3;
const CONFIGURATION: usize = 4;
const TRANSLATION: usize = 5;

// Argument positions of connector constructors
const CONNECTOR_CONFIGURATION: usize = 3;
const CONNECTOR_MODEL: usize = 4;
const CONNECTOR_VIEW: usize = 5;
const CONNECTOR_TRANSLATION: usize = 6;

/// Collaborators of model and view layers.
///
/// Their constructors receive `[registry, request_state, route, cache,
/// configuration, translation]`, followed by any constructor injected
/// dependencies declared for the class.
#[derive(Clone)]
pub struct LayerContext {
    pub registry: Arc<Registry>,
    pub request: Arc<RequestState>,
    pub route: Arc<Route>,
    pub cache: Arc<dyn Cache>,
    pub configuration: Arc<Configuration>,
    pub translation: Translation,
}

impl LayerContext {
    /// Context for `route`, taking cache and configuration from `registry`.
    pub fn new(registry: Registry, request: Arc<RequestState>, route: Route) -> Self {
        Self {
            cache: registry.cache().clone(),
            configuration: registry.configuration().clone(),
            translation: request.translation_matrix().clone(),
            registry: Arc::new(registry),
            request,
            route: Arc::new(route),
        }
    }

    /// Positional arguments for a model or view constructor.
    pub fn model_arguments(&self) -> Arguments {
        Arguments::new(vec![
            Instance::from_arc(self.registry.clone()).into(),
            Instance::from_arc(self.request.clone()).into(),
            Instance::from_arc(self.route.clone()).into(),
            Instance::from_trait(self.cache.clone()).into(),
            Instance::from_arc(self.configuration.clone()).into(),
            translation_value(&self.translation),
        ])
    }

    /// Positional arguments for a connector constructor.
    pub fn connector_arguments(&self, model: Option<&Instance>, view: Option<&Arc<dyn Renderer>>) -> Arguments {
        Arguments::new(vec![
            Instance::from_arc(self.registry.clone()).into(),
            Instance::from_arc(self.request.clone()).into(),
            Instance::from_arc(self.route.clone()).into(),
            Instance::from_arc(self.configuration.clone()).into(),
            model.cloned().into(),
            view.map(|view| Instance::from_trait(view.clone())).into(),
            translation_value(&self.translation),
        ])
    }

    /// Decodes the arguments a model or view constructor received.
    pub fn from_arguments(arguments: &Arguments) -> DiResult<Self> {
        Ok(Self {
            registry: arguments.instance::<Registry>(REGISTRY)?,
            request: arguments.instance::<RequestState>(REQUEST_STATE)?,
            route: arguments.instance::<Route>(ROUTE)?,
            cache: arguments.shared::<dyn Cache>(CACHE)?,
            configuration: arguments.instance::<Configuration>(CONFIGURATION)?,
            translation: decode_translation(arguments, TRANSLATION)?,
        })
    }
}

impl fmt::Debug for LayerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerContext")
            .field("route", &self.route)
            .field("translation", &self.translation)
            .finish_non_exhaustive()
    }
}

/// Collaborators of a connector layer.
///
/// Connector constructors receive `[registry, request_state, route,
/// configuration, model, view, translation]`; model and view are null when
/// the route has none.
#[derive(Clone)]
pub struct ConnectorContext {
    pub registry: Arc<Registry>,
    pub request: Arc<RequestState>,
    pub route: Arc<Route>,
    pub configuration: Arc<Configuration>,
    pub model: Option<Instance>,
    pub view: Option<Arc<dyn Renderer>>,
    pub translation: Translation,
}

impl ConnectorContext {
    pub fn from_arguments(arguments: &Arguments) -> DiResult<Self> {
        let view = match arguments.get(CONNECTOR_VIEW) {
            Some(value) if !value.is_null() => Some(arguments.shared::<dyn Renderer>(CONNECTOR_VIEW)?),
            _ => None,
        };
        Ok(Self {
            registry: arguments.instance::<Registry>(REGISTRY)?,
            request: arguments.instance::<RequestState>(REQUEST_STATE)?,
            route: arguments.instance::<Route>(ROUTE)?,
            configuration: arguments.instance::<Configuration>(CONNECTOR_CONFIGURATION)?,
            model: arguments.optional_raw(CONNECTOR_MODEL),
            view,
            translation: decode_translation(arguments, CONNECTOR_TRANSLATION)?,
        })
    }

    /// The model downcast to `T`, if there is one of that type.
    pub fn model<T: std::any::Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.model.as_ref().and_then(Instance::downcast::<T>)
    }

    /// Response of the current request.
    pub fn response(&self) -> &Arc<Response> {
        self.registry.response()
    }
}

impl fmt::Debug for ConnectorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorContext")
            .field("route", &self.route)
            .field("model", &self.model)
            .field("view", &self.view.is_some())
            .finish_non_exhaustive()
    }
}

fn translation_value(translation: &Translation) -> Value {
    Value::Scalar(serde_json::Value::Object(
        translation
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    ))
}

fn decode_translation(arguments: &Arguments, index: usize) -> DiResult<Translation> {
    match arguments.scalar(index)? {
        serde_json::Value::Null => Ok(Translation::new()),
        serde_json::Value::Object(map) => Ok(map
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()),
        other => Err(DiError::TypeMismatch {
            expected: "translation matrix",
            found: format!("scalar {}", other),
        }),
    }
}
