//! Fluent builder over a [`DependencyCollection`].

use std::mem;
use std::sync::Arc;

use super::{Dependency, DependencyCollection, Injection};
use crate::{Argument, ClassRegistry, Container, DiError, DiResult, Instance, Lifetime};

/// Fluent, chainable way of declaring dependencies.
///
/// A dependency started with [`depends_on`](Self::depends_on) stays pending
/// until the next `depends_on`, [`class`](Self::class), [`wire`](Self::wire)
/// or [`store`](Self::store) call flushes it into the collection. Errors are
/// remembered and the first one is returned by `store`.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Argument, DependencyMap, Instance};
///
/// let mut map = DependencyMap::new();
/// map.class("Model_Blog")
///     .depends_on("CacheService").target("cache").instance(Instance::new(7u8))
///     .depends_on("Logger").target("logger").method("setLogger")
///     .class("Logger")
///     .depends_on("Clock").arguments(vec![Argument::value("utc")]);
///
/// let collection = map.store().unwrap();
/// assert_eq!(collection.dependencies("Model_Blog").len(), 2);
/// assert_eq!(collection.dependencies("Logger")[0].target(), "Clock");
/// ```
#[derive(Debug, Default)]
pub struct DependencyMap {
    collection: DependencyCollection,
    classname: Option<String>,
    last_classname: Option<String>,
    current: Option<Dependency>,
    error: Option<DiError>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues declaring on top of an existing collection.
    pub fn from_collection(collection: DependencyCollection) -> Self {
        Self {
            collection,
            ..Self::default()
        }
    }

    /// Selects the class subsequent dependencies are declared for.
    pub fn class(&mut self, classname: impl Into<String>) -> &mut Self {
        self.flush();
        self.classname = Some(classname.into());
        self
    }

    /// Selects a class and overrides its arguments and constructor.
    pub fn class_with(
        &mut self,
        classname: impl Into<String>,
        arguments: Option<Vec<Argument>>,
        constructor: Option<&str>,
    ) -> &mut Self {
        let classname = classname.into();
        if let Some(arguments) = arguments {
            self.collection.set_arguments(&classname, arguments);
        }
        if let Some(constructor) = constructor {
            self.collection.set_constructor(&classname, constructor);
        }
        self.class(classname)
    }

    /// Starts a new dependency on `classname`, targeted at its own name until
    /// [`target`](Self::target) says otherwise.
    pub fn depends_on(&mut self, classname: impl Into<String>) -> &mut Self {
        self.flush();
        let classname = classname.into();
        self.current = Some(Dependency::new(classname.clone(), classname));
        self
    }

    pub fn target(&mut self, target: impl Into<String>) -> &mut Self {
        let target = target.into();
        self.with_current("target", |dependency| dependency.set_target(target))
    }

    /// Alias of [`target`](Self::target).
    pub fn id(&mut self, target: impl Into<String>) -> &mut Self {
        self.target(target)
    }

    pub fn instance(&mut self, instance: Instance) -> &mut Self {
        self.with_current("instance", |dependency| dependency.set_instance(instance))
    }

    pub fn arguments(&mut self, arguments: Vec<Argument>) -> &mut Self {
        self.with_current("arguments", |dependency| dependency.set_arguments(arguments))
    }

    /// Injects the pending dependency through setter `method`.
    pub fn method(&mut self, method: impl Into<String>) -> &mut Self {
        let method = method.into();
        self.with_current("method", |dependency| {
            dependency.set_injection(Injection::Method(method))
        })
    }

    pub fn singleton(&mut self) -> &mut Self {
        self.with_current("singleton", |dependency| {
            dependency.set_lifetime(Lifetime::Singleton)
        })
    }

    /// Flushes the pending dependency.
    pub fn wire(&mut self) -> &mut Self {
        self.flush();
        self
    }

    /// Class that was selected before the most recent flush.
    pub fn last_processed_class(&self) -> Option<&str> {
        self.last_classname.as_deref()
    }

    /// Flushes and hands out the collection, resetting the map.
    pub fn store(&mut self) -> DiResult<DependencyCollection> {
        self.flush();
        self.classname = None;
        let collection = mem::take(&mut self.collection);
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(collection),
        }
    }

    /// Stores the map and builds a container from it.
    pub fn build(&mut self, classes: Arc<ClassRegistry>) -> DiResult<Container> {
        Ok(self.store()?.build(classes))
    }

    fn with_current(&mut self, what: &str, apply: impl FnOnce(&mut Dependency)) -> &mut Self {
        match self.current.as_mut() {
            Some(dependency) => apply(dependency),
            None => self.remember(DiError::DetachedDependency(what.to_string())),
        }
        self
    }

    fn flush(&mut self) {
        self.last_classname = self.classname.clone();
        let Some(dependency) = self.current.take() else {
            return;
        };
        let result = match &self.classname {
            Some(classname) => self
                .collection
                .register_dependency(classname, dependency)
                .map(|_| ()),
            None => Err(DiError::DetachedDependency(dependency.class_name().to_string())),
        };
        if let Err(error) = result {
            self.remember(error);
        }
    }

    fn remember(&mut self, error: DiError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}
