//! Dependency collection module.
//!
//! This module contains the [`DependencyCollection`] type used to declare, per
//! class, which dependencies get injected and how the class itself is
//! constructed, plus the fluent [`DependencyMap`] builder and the JSON map
//! format.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::observer::Observers;
use crate::{Argument, ClassRegistry, Container, DiError, DiObserver, DiResult, Instance, Lifetime};

pub mod export;
pub mod fluent;
pub use fluent::DependencyMap;

/// How a resolved dependency reaches the instance that declared it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Injection {
    /// Appended to the constructor's positional arguments
    #[default]
    Constructor,
    /// Passed to the named setter after construction
    Method(String),
}

/// A single injected dependency of a class.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Dependency, Injection, Instance, Lifetime};
///
/// let logger = Dependency::new("logger", "Logger").method("setLogger");
/// assert_eq!(logger.injection(), &Injection::Method("setLogger".to_string()));
///
/// let cache = Dependency::new("cache", "CacheService").instance(Instance::new(42u32));
/// assert_eq!(cache.lifetime(), Lifetime::Singleton);
/// ```
#[derive(Debug, Clone)]
pub struct Dependency {
    target: String,
    class_name: String,
    arguments: Vec<Argument>,
    instance: Option<Instance>,
    injection: Injection,
    lifetime: Lifetime,
}

impl Dependency {
    /// Creates a constructor-injected, transient dependency on `class_name`.
    pub fn new(target: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            class_name: class_name.into(),
            arguments: Vec::new(),
            instance: None,
            injection: Injection::Constructor,
            lifetime: Lifetime::Transient,
        }
    }

    /// Arguments used to construct the dependency's own class.
    pub fn arguments(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Pre-built instance injected as is; makes the dependency a singleton.
    pub fn instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self.lifetime = Lifetime::Singleton;
        self
    }

    /// Injects through setter `method` instead of the constructor.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.injection = Injection::Method(method.into());
        self
    }

    /// Constructs the dependency once per container and shares it afterwards.
    pub fn singleton(mut self) -> Self {
        self.lifetime = Lifetime::Singleton;
        self
    }

    pub(crate) fn set_target(&mut self, target: impl Into<String>) {
        self.target = target.into();
    }

    pub(crate) fn set_arguments(&mut self, arguments: Vec<Argument>) {
        self.arguments = arguments;
    }

    pub(crate) fn set_instance(&mut self, instance: Instance) {
        self.instance = Some(instance);
        self.lifetime = Lifetime::Singleton;
    }

    pub(crate) fn set_injection(&mut self, injection: Injection) {
        self.injection = injection;
    }

    pub(crate) fn set_lifetime(&mut self, lifetime: Lifetime) {
        self.lifetime = lifetime;
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn argument_list(&self) -> &[Argument] {
        &self.arguments
    }

    pub fn prebuilt(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn injection(&self) -> &Injection {
        &self.injection
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ClassEntry {
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) arguments: Option<Vec<Argument>>,
    pub(crate) constructor: Option<String>,
}

/// Per-class dependency declarations, consumed by [`DependencyCollection::build`].
///
/// Dependencies are resolved in the order they were registered. Earlier
/// dependencies must not depend on later ones and cycles are not detected at
/// resolution time; [`crate::validate`] reports them ahead of time.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Argument, Dependency, DependencyCollection, DiError};
///
/// let mut collection = DependencyCollection::new();
/// collection
///     .register_dependency("Model_Blog", Dependency::new("cache", "CacheService"))
///     .unwrap()
///     .set_arguments("CacheService", vec![Argument::value("blog")]);
///
/// let duplicate = collection.register_dependency("Model_Blog", Dependency::new("cache", "Other"));
/// assert!(matches!(duplicate, Err(DiError::DuplicateTarget { .. })));
/// assert_eq!(collection.dependencies("Model_Blog").len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct DependencyCollection {
    order: Vec<String>,
    entries: HashMap<String, ClassEntry>,
    observers: Observers,
}

impl DependencyCollection {
    /// Creates a new empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, class_name: &str) -> &mut ClassEntry {
        if !self.entries.contains_key(class_name) {
            self.order.push(class_name.to_string());
        }
        self.entries.entry(class_name.to_string()).or_default()
    }

    /// Appends a dependency to `class_name`'s list.
    ///
    /// Fails with [`DiError::DuplicateTarget`] when the class already has a
    /// dependency with the same target.
    pub fn register_dependency(&mut self, class_name: &str, dependency: Dependency) -> DiResult<&mut Self> {
        let exists = self
            .entries
            .get(class_name)
            .is_some_and(|entry| entry.dependencies.iter().any(|d| d.target == dependency.target));
        if exists {
            return Err(DiError::DuplicateTarget {
                class: class_name.to_string(),
                target: dependency.target,
            });
        }
        self.entry(class_name).dependencies.push(dependency);
        Ok(self)
    }

    /// Overrides the arguments `class_name` is constructed with.
    pub fn set_arguments(&mut self, class_name: &str, arguments: Vec<Argument>) -> &mut Self {
        self.entry(class_name).arguments = Some(arguments);
        self
    }

    /// Selects a named constructor for `class_name`.
    pub fn set_constructor(&mut self, class_name: &str, constructor: impl Into<String>) -> &mut Self {
        self.entry(class_name).constructor = Some(constructor.into());
        self
    }

    pub fn dependencies(&self, class_name: &str) -> &[Dependency] {
        self.entries
            .get(class_name)
            .map_or(&[], |entry| entry.dependencies.as_slice())
    }

    pub fn arguments(&self, class_name: &str) -> Option<&[Argument]> {
        self.entries
            .get(class_name)
            .and_then(|entry| entry.arguments.as_deref())
    }

    pub fn constructor(&self, class_name: &str) -> Option<&str> {
        self.entries
            .get(class_name)
            .and_then(|entry| entry.constructor.as_deref())
    }

    /// Class names in the order they were first declared.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.entries.contains_key(class_name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Adds an observer notified of every resolution performed by the built container.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Freezes the collection into a container backed by `classes`.
    pub fn build(self, classes: Arc<ClassRegistry>) -> Container {
        Container::new(classes, self.entries, self.observers)
    }
}

impl fmt::Debug for DependencyCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for class in &self.order {
            if let Some(entry) = self.entries.get(class) {
                map.entry(class, &entry.dependencies);
            }
        }
        map.finish()
    }
}
