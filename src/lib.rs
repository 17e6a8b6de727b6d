//! # ferrous-dispatch
//!
//! Request dispatch for model/view/presenter web applications, built on a
//! small dependency injection container.
//!
//! ## Features
//!
//! - **Named classes**: a [`ClassRegistry`] maps class names to constructors,
//!   setters and layer capabilities
//! - **Dependency collections**: per-class constructor and method injection,
//!   resolved depth first in declaration order
//! - **Fluent maps**: [`DependencyMap`] builder plus a JSON map format
//! - **Convention based layers**: route `Blog` loads `Model_Blog`, `View_Blog`
//!   and `Presenter_Blog`; missing classes are simply absent layers
//! - **Typed failures**: presenter errors become JSON or plain status
//!   responses, everything else propagates
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_dispatch::{
//!     ActionResult, ActionTable, ClassDefinition, ClassRegistry, Connector, ConnectorContext,
//!     DependencyCollection, Dispatcher, Registry, Renderer, RequestState, Route, ViewSet,
//! };
//! use std::sync::Arc;
//!
//! struct BlogPresenter {
//!     context: ConnectorContext,
//!     views: ViewSet,
//! }
//!
//! impl BlogPresenter {
//!     fn actions() -> ActionTable<Self> {
//!         ActionTable::new().action("showAction", |p: &mut Self| {
//!             p.context.response().send_html("<h1>Blog</h1>");
//!             Ok(())
//!         })
//!     }
//! }
//!
//! impl Connector for BlogPresenter {
//!     fn responds_to(&self, method: &str) -> bool {
//!         Self::actions().contains(method)
//!     }
//!
//!     fn invoke(&mut self, method: &str) -> ActionResult {
//!         Self::actions().call(self, method)
//!     }
//!
//!     fn attach(&mut self, view: Arc<dyn Renderer>) {
//!         self.views.attach(view);
//!     }
//! }
//!
//! let mut classes = ClassRegistry::new();
//! classes.register(
//!     ClassDefinition::build::<BlogPresenter, _>("Presenter_Blog", |args| {
//!         Ok(BlogPresenter {
//!             context: ConnectorContext::from_arguments(args)?,
//!             views: ViewSet::new(),
//!         })
//!     })
//!     .connector(),
//! );
//!
//! let container = Arc::new(DependencyCollection::new().build(Arc::new(classes)));
//! let mut dispatcher = Dispatcher::new(Registry::default(), container);
//!
//! let mut request = RequestState::new();
//! request.set_url("/blog/show").set_active_route(Route::new("Blog", "show"));
//!
//! let response = dispatcher.create_from_request_state(Arc::new(request)).unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(response.body, "<h1>Blog</h1>");
//! ```

// Module declarations
pub mod cache;
pub mod class;
pub mod collection;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod error;
pub mod layer;
pub mod lifetime;
pub mod logging;
pub mod observer;
pub mod registry;
pub mod request;
pub mod response;
pub mod validation;
pub mod value;

#[cfg(feature = "axum-integration")]
pub mod axum_integration;

// Re-exports
pub use cache::{Cache, MemoryCache};
pub use class::{ClassBuilder, ClassDefinition, ClassRegistry};
pub use collection::{Dependency, DependencyCollection, DependencyMap, Injection};
pub use config::Configuration;
pub use container::Container;
pub use dispatcher::{DispatchState, Dispatcher, Validation};
pub use error::{
    ActionError, ActionResult, BoxError, ConfigError, DiError, DiResult, DispatchError,
    DispatchFailure, PresenterError, RequestError, RestPresenterError,
};
pub use layer::{
    ActionTable, Connector, ConnectorContext, Layer, LayerContext, LayerKind, LayerLoader,
    Renderer, ViewSet,
};
pub use lifetime::Lifetime;
pub use logging::{CompositeLogger, Level, LogEntry, Logger, MemoryLogger, TracingLogger};
pub use observer::{DiObserver, LoggingObserver};
pub use registry::Registry;
pub use request::{HistoryEntry, Method, Mode, RequestState, Route, Translation};
pub use response::{HttpResponse, Response};
pub use validation::{validate, ValidationError, ValidationResult, ValidationWarning};
pub use value::{Argument, Arguments, Instance, Value};
