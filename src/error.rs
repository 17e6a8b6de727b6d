//! Error types for the dependency injection container and the dispatch pipeline.
//!
//! Errors fall into two families. Container errors ([`DiError`]) are developer
//! facing and fatal to the request that triggered them. Dispatch errors
//! ([`DispatchError`]) separate the recoverable [`DispatchFailure`] kinds, which
//! the dispatcher turns into an HTTP response, from everything else, which
//! propagates to the caller untouched.

use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

/// Boxed error used for failures that are not part of this crate's taxonomy.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Dependency injection errors
///
/// Represents the error conditions that can occur while registering or
/// resolving classes through the container.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Container, ClassRegistry, DependencyCollection, DiError};
/// use std::sync::Arc;
///
/// let container = DependencyCollection::new().build(Arc::new(ClassRegistry::new()));
/// match container.resolve("Model_Missing") {
///     Err(DiError::UnresolvableDependency(name)) => assert_eq!(name, "Model_Missing"),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// Class name has no definition in the class registry
    UnresolvableDependency(String),
    /// Configured setter does not exist on the constructed instance
    InjectionTarget {
        /// Class that was constructed
        class: String,
        /// Setter that was requested
        method: String,
    },
    /// A dependency target was registered twice for the same class
    DuplicateTarget {
        /// Owning class
        class: String,
        /// Target identifier already in use
        target: String,
    },
    /// Constructor override names a constructor the class does not declare
    UnknownConstructor {
        /// Class being constructed
        class: String,
        /// Requested constructor
        constructor: String,
    },
    /// A value could not be downcast to the requested type
    TypeMismatch {
        /// Requested type
        expected: &'static str,
        /// Class or kind of the value that was found
        found: String,
    },
    /// A constructor asked for a positional argument that was not supplied
    MissingArgument {
        /// Class being constructed
        class: String,
        /// Zero-based argument position
        index: usize,
    },
    /// A class was loaded as a layer it was not declared as
    LayerMismatch {
        /// Class name
        class: String,
        /// Layer the caller asked for
        layer: &'static str,
    },
    /// A dependency was declared on a fluent map before any class
    DetachedDependency(String),
    /// Dependency map import or export failed
    Export(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::UnresolvableDependency(name) => {
                write!(f, "Unresolvable dependency: class {} is not registered", name)
            }
            DiError::InjectionTarget { class, method } => {
                write!(f, "Injection target {}() does not exist on {}", method, class)
            }
            DiError::DuplicateTarget { class, target } => {
                write!(f, "Duplicate target {} for class {}", target, class)
            }
            DiError::UnknownConstructor { class, constructor } => {
                write!(f, "Constructor {}() is not declared on {}", constructor, class)
            }
            DiError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {}, found {}", expected, found)
            }
            DiError::MissingArgument { class, index } => {
                write!(f, "Missing argument {} for {}", index, class)
            }
            DiError::LayerMismatch { class, layer } => {
                write!(f, "Class {} is not declared as {} layer", class, layer)
            }
            DiError::DetachedDependency(what) => {
                write!(f, "Dependency {} declared before any class", what)
            }
            DiError::Export(msg) => write!(f, "Dependency map export failed: {}", msg),
        }
    }
}

impl StdError for DiError {}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;

/// Error raised by a REST flavoured action.
///
/// The dispatcher answers it with a JSON error envelope sent with
/// [`code`](Self::code) as the HTTP status. Construction records the caller's
/// source location, which is included in the envelope when debugging is on.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::RestPresenterError;
///
/// let error = RestPresenterError::new(422, "bad input").with_token("csrf-1");
/// assert_eq!(error.code(), 422);
/// assert_eq!(error.token(), Some("csrf-1"));
/// assert!(error.file().ends_with(".rs"));
/// ```
#[derive(Debug)]
pub struct RestPresenterError {
    code: u16,
    message: String,
    token: Option<String>,
    file: &'static str,
    line: u32,
    source: Option<BoxError>,
}

impl RestPresenterError {
    /// Creates a new REST error with the given status code and message.
    #[track_caller]
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            code,
            message: message.into(),
            token: None,
            file: location.file(),
            line: location.line(),
            source: None,
        }
    }

    /// Attaches a security token that is echoed back in the envelope.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Chains the error that caused this one.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// Messages of the chained causes, outermost first.
    pub fn causes(&self) -> Vec<String> {
        cause_chain(self.source.as_deref())
    }
}

impl fmt::Display for RestPresenterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for RestPresenterError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

/// Generic error raised by a non-REST action.
///
/// Translated into a plain HTTP status response carrying the code and message.
#[derive(Debug)]
pub struct PresenterError {
    code: u16,
    message: String,
    source: Option<BoxError>,
}

impl PresenterError {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Chains the error that caused this one.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for PresenterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for PresenterError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

/// Error returned by an action method on a connector.
#[derive(Debug)]
pub enum ActionError {
    /// REST flavoured presenter error, answered with JSON
    Rest(RestPresenterError),
    /// Plain presenter error, answered with a status response
    Presenter(PresenterError),
    /// Anything else; not translated, propagates to the caller
    Other(BoxError),
}

impl ActionError {
    /// Wraps an arbitrary error that the dispatcher must not translate.
    pub fn other(error: impl Into<BoxError>) -> Self {
        ActionError::Other(error.into())
    }
}

impl From<RestPresenterError> for ActionError {
    fn from(error: RestPresenterError) -> Self {
        ActionError::Rest(error)
    }
}

impl From<PresenterError> for ActionError {
    fn from(error: PresenterError) -> Self {
        ActionError::Presenter(error)
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionError::Rest(e) => write!(f, "REST presenter error {}: {}", e.code(), e),
            ActionError::Presenter(e) => write!(f, "Presenter error {}: {}", e.code(), e),
            ActionError::Other(e) => write!(f, "{}", e),
        }
    }
}

impl StdError for ActionError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ActionError::Rest(e) => Some(e),
            ActionError::Presenter(e) => Some(e),
            ActionError::Other(e) => Some(e.as_ref()),
        }
    }
}

/// Result of invoking an action method.
pub type ActionResult = Result<(), ActionError>;

/// Failures the dispatcher recovers from by emitting an HTTP response.
#[derive(Debug)]
pub enum DispatchFailure {
    /// No connector could be built for the route (400)
    BadRequest {
        /// Diagnostic naming the missing object and action
        message: String,
    },
    /// The connector has no matching action method (404)
    NotFound {
        /// Diagnostic naming the missing method
        message: String,
    },
    /// Plain presenter error raised by the action
    Presenter(PresenterError),
    /// REST presenter error raised by the action
    RestPresenter(RestPresenterError),
}

impl DispatchFailure {
    /// HTTP status code this failure is answered with.
    pub fn status(&self) -> u16 {
        match self {
            DispatchFailure::BadRequest { .. } => 400,
            DispatchFailure::NotFound { .. } => 404,
            DispatchFailure::Presenter(e) => e.code(),
            DispatchFailure::RestPresenter(e) => e.code(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DispatchFailure::BadRequest { message } | DispatchFailure::NotFound { message } => {
                message
            }
            DispatchFailure::Presenter(e) => e.message(),
            DispatchFailure::RestPresenter(e) => e.message(),
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status(), self.message())
    }
}

impl StdError for DispatchFailure {}

/// Errors produced while dispatching a request.
#[derive(Debug)]
pub enum DispatchError {
    /// Recoverable failure, translated to a response by the dispatcher
    Failure(DispatchFailure),
    /// The request state carries no active route
    MissingRoute,
    /// Building a layer failed inside the container
    Dependency(DiError),
    /// The action failed with an error outside the presenter taxonomy
    Action(BoxError),
}

impl From<DiError> for DispatchError {
    fn from(error: DiError) -> Self {
        DispatchError::Dependency(error)
    }
}

impl From<DispatchFailure> for DispatchError {
    fn from(failure: DispatchFailure) -> Self {
        DispatchError::Failure(failure)
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Failure(failure) => write!(f, "Dispatch failed: {}", failure),
            DispatchError::MissingRoute => write!(f, "Request state has no active route"),
            DispatchError::Dependency(e) => write!(f, "{}", e),
            DispatchError::Action(e) => write!(f, "Action failed: {}", e),
        }
    }
}

impl StdError for DispatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DispatchError::Failure(e) => Some(e),
            DispatchError::MissingRoute => None,
            DispatchError::Dependency(e) => Some(e),
            DispatchError::Action(e) => Some(e.as_ref()),
        }
    }
}

/// Errors raised by [`RequestState`](crate::RequestState) operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// Pattern extraction was attempted before a URL was set
    MissingUrl,
    /// A route needs at least an object and an action
    IncompleteRoute(usize),
    /// Unrecognised HTTP verb
    UnknownMethod(String),
    /// Unrecognised running mode
    UnknownMode(String),
    /// A percent-encoded URL part does not decode to UTF-8
    InvalidEncoding(String),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::MissingUrl => write!(f, "Set an URL on the request state first"),
            RequestError::IncompleteRoute(len) => {
                write!(f, "Route needs object and action, got {} segment(s)", len)
            }
            RequestError::UnknownMethod(verb) => write!(f, "Unknown request method: {}", verb),
            RequestError::UnknownMode(mode) => write!(f, "Unknown running mode: {}", mode),
            RequestError::InvalidEncoding(part) => write!(f, "Invalid URL encoding: {}", part),
        }
    }
}

impl StdError for RequestError {}

/// Errors raised by [`Configuration`](crate::Configuration) lookups and readers.
#[derive(Debug)]
pub enum ConfigError {
    /// A node on the colon separated path does not exist
    MissingNode {
        /// Full requested path
        path: String,
        /// First node that could not be found
        node: String,
    },
    /// The node exists but holds another kind of value
    TypeMismatch {
        /// Requested path
        path: String,
        /// Expected JSON kind
        expected: &'static str,
    },
    /// Configuration source is not valid JSON
    Parse(serde_json::Error),
    /// Configuration file could not be read
    Io(std::io::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingNode { path, node } => {
                write!(f, "Configuration does not have a property: \"{}\" (path {})", node, path)
            }
            ConfigError::TypeMismatch { path, expected } => {
                write!(f, "Configuration value at {} is not a {}", path, expected)
            }
            ConfigError::Parse(e) => write!(f, "Invalid JSON configuration: {}", e),
            ConfigError::Io(e) => write!(f, "Configuration file could not be read: {}", e),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Parse(error)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(error: std::io::Error) -> Self {
        ConfigError::Io(error)
    }
}

pub(crate) fn cause_chain(first: Option<&(dyn StdError + Send + Sync + 'static)>) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current: Option<&(dyn StdError + 'static)> = first.map(|e| e as &(dyn StdError + 'static));
    while let Some(error) = current {
        causes.push(error.to_string());
        current = error.source();
    }
    causes
}
