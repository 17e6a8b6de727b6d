//! Dependency lifetime definitions.

use serde::{Deserialize, Serialize};

/// Lifetimes controlling how a resolved dependency is cached
///
/// A dependency that carries a pre-built instance is always treated as a
/// singleton. Without an instance the lifetime decides whether the container
/// constructs the dependency once or on every resolution.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{ClassDefinition, ClassRegistry, Dependency, DependencyCollection};
/// use std::sync::Arc;
///
/// struct Clock;
/// struct Service;
///
/// let mut classes = ClassRegistry::new();
/// classes.register(ClassDefinition::build::<Clock, _>("Clock", |_| Ok(Clock)));
/// classes.register(ClassDefinition::build::<Service, _>("Service", |_| Ok(Service)));
///
/// let mut collection = DependencyCollection::new();
/// collection
///     .register_dependency("Service", Dependency::new("clock", "Clock").singleton())
///     .unwrap();
///
/// let container = collection.build(Arc::new(classes));
/// container.resolve("Service").unwrap();
/// container.resolve("Service").unwrap();
/// assert_eq!(container.singleton_count(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifetime {
    /// Constructed once per container and shared by every resolution
    Singleton,
    /// Constructed fresh on every resolution, never cached
    #[default]
    Transient,
}

impl Lifetime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Transient => "transient",
        }
    }
}
