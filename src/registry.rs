//! Process-wide collaborators, passed explicitly instead of looked up globally.

use std::fmt;
use std::sync::Arc;

use crate::{Cache, Configuration, Logger, MemoryCache, Response, TracingLogger};

/// Configuration, logger, cache and response handed to every layer.
///
/// Cloning shares all collaborators. [`Registry::scoped`] shares everything
/// but the response, which belongs to a single request.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Configuration, Registry};
/// use std::sync::Arc;
///
/// let registry = Registry::new(Arc::new(Configuration::new()));
/// let request = registry.scoped();
/// assert!(Arc::ptr_eq(registry.configuration(), request.configuration()));
/// assert!(!Arc::ptr_eq(registry.response(), request.response()));
/// ```
#[derive(Clone)]
pub struct Registry {
    configuration: Arc<Configuration>,
    logger: Arc<dyn Logger>,
    cache: Arc<dyn Cache>,
    response: Arc<Response>,
}

impl Registry {
    /// Registry logging through `tracing` with an in-memory cache.
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self {
            configuration,
            logger: Arc::new(TracingLogger),
            cache: Arc::new(MemoryCache::new()),
            response: Arc::new(Response::new()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn response(&self) -> &Arc<Response> {
        &self.response
    }

    /// Copy of the registry with a fresh response for one request.
    pub fn scoped(&self) -> Self {
        Self {
            response: Arc::new(Response::new()),
            ..self.clone()
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Arc::new(Configuration::new()))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("configuration", &self.configuration)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}
