//! Container resolving declared dependency graphs into live instances.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::class::BoxAny;
use crate::collection::{ClassEntry, Dependency, Injection};
use crate::observer::Observers;
use crate::{Argument, Arguments, ClassRegistry, DiError, DiResult, Instance, Lifetime, Value};

/// Singletons are shared per class and declared argument list, so two
/// dependencies on one class with different arguments get distinct instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SingletonKey {
    class: String,
    arguments: Vec<ArgumentKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ArgumentKey {
    Value(String),
    Class(String),
    Instance(usize),
}

impl SingletonKey {
    fn new(dependency: &Dependency) -> Self {
        let arguments = dependency
            .argument_list()
            .iter()
            .map(|argument| match argument {
                Argument::Value(value) => ArgumentKey::Value(value.to_string()),
                Argument::Class(class_name) => ArgumentKey::Class(class_name.clone()),
                Argument::Instance(instance) => ArgumentKey::Instance(instance.address()),
            })
            .collect();
        Self {
            class: dependency.class_name().to_string(),
            arguments,
        }
    }
}

/// Read-only snapshot of a [`DependencyCollection`](crate::DependencyCollection)
/// bound to a [`ClassRegistry`].
///
/// Resolution walks the declared dependencies of a class in insertion order,
/// resolving each one recursively (depth first) before constructing the class
/// itself. Constructor injected dependencies are appended to the positional
/// arguments; method injected ones are applied through the declared setters
/// once the object exists.
///
/// The container performs no cycle detection. A class that transitively
/// depends on itself recurses until the stack is exhausted.
///
/// # Thread Safety
///
/// The container is `Send + Sync` and can be shared between request handlers.
/// Only the singleton cache is mutable; its lock is never held while a nested
/// resolution runs.
///
/// # Examples
///
/// ```
/// use ferrous_dispatch::{ClassDefinition, ClassRegistry, Dependency, DependencyCollection};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut classes = ClassRegistry::new();
/// classes
///     .register(ClassDefinition::build::<Database, _>("Database", |args| {
///         Ok(Database { url: args.str(0)?.to_string() })
///     }))
///     .register(ClassDefinition::build::<UserService, _>("UserService", |args| {
///         Ok(UserService { db: args.instance::<Database>(0)? })
///     }));
///
/// let mut collection = DependencyCollection::new();
/// collection.set_arguments("Database", vec![serde_json::json!("postgres://localhost").into()]);
/// collection.register_dependency("UserService", Dependency::new("db", "Database")).unwrap();
///
/// let container = collection.build(Arc::new(classes));
/// let users = container.resolve_as::<UserService>("UserService").unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct Container {
    classes: Arc<ClassRegistry>,
    entries: HashMap<String, ClassEntry>,
    observers: Observers,
    singletons: Mutex<HashMap<SingletonKey, Instance>>,
}

impl Container {
    pub(crate) fn new(
        classes: Arc<ClassRegistry>,
        entries: HashMap<String, ClassEntry>,
        observers: Observers,
    ) -> Self {
        Self {
            classes,
            entries,
            observers,
            singletons: Mutex::new(HashMap::new()),
        }
    }

    /// Class registry the container loads definitions from.
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// Declared dependencies of `class_name`, in resolution order.
    pub fn dependencies(&self, class_name: &str) -> &[Dependency] {
        self.entries
            .get(class_name)
            .map_or(&[], |entry| entry.dependencies.as_slice())
    }

    /// Number of lazily created singletons cached so far.
    pub fn singleton_count(&self) -> usize {
        self.singletons.lock().len()
    }

    /// Resolves `class_name` with its registered arguments.
    pub fn resolve(&self, class_name: &str) -> DiResult<Instance> {
        self.resolve_with(class_name, None)
    }

    /// Resolves `class_name`, constructing it with `arguments` when given
    /// instead of the arguments registered for the class.
    pub fn resolve_with(&self, class_name: &str, arguments: Option<&[Argument]>) -> DiResult<Instance> {
        let object = self.build_owned(class_name, arguments)?;
        Ok(Instance::from_any(class_name, Arc::from(object)))
    }

    /// Resolves `class_name` and downcasts it to `T`.
    pub fn resolve_as<T: Any + Send + Sync>(&self, class_name: &str) -> DiResult<Arc<T>> {
        self.resolve(class_name)?
            .downcast::<T>()
            .ok_or_else(|| DiError::TypeMismatch {
                expected: type_name::<T>(),
                found: class_name.to_string(),
            })
    }

    /// Like [`Container::resolve_with`] but returns the uniquely owned object.
    pub fn build_owned(&self, class_name: &str, arguments: Option<&[Argument]>) -> DiResult<Box<dyn Any + Send + Sync>> {
        self.observe(class_name, || {
            let registered = arguments.or_else(|| {
                self.entries
                    .get(class_name)
                    .and_then(|entry| entry.arguments.as_deref())
            });
            let values = match registered {
                Some(arguments) => self.resolve_arguments(arguments)?,
                None => Vec::new(),
            };
            self.assemble(class_name, Arguments::for_class(class_name, values))
        })
    }

    /// Builds `class_name` from already resolved positional values.
    ///
    /// Declared dependencies are still resolved and injected; constructor
    /// injected ones follow the given values.
    pub fn build_with_values(&self, class_name: &str, arguments: Arguments) -> DiResult<Box<dyn Any + Send + Sync>> {
        self.observe(class_name, || self.assemble(class_name, arguments))
    }

    fn observe<R>(&self, class_name: &str, resolve: impl FnOnce() -> DiResult<R>) -> DiResult<R> {
        if !self.observers.has_observers() {
            return resolve();
        }

        self.observers.resolving(class_name);
        let started = Instant::now();
        let result = resolve();
        match &result {
            Ok(_) => self.observers.resolved(class_name, started.elapsed()),
            Err(error) => self.observers.failed(class_name, error),
        }
        result
    }

    fn assemble(&self, class_name: &str, mut arguments: Arguments) -> DiResult<BoxAny> {
        arguments.set_class(class_name);
        let definition = self.classes.load(class_name)?;
        let entry = self.entries.get(class_name);

        let mut setters = Vec::new();
        if let Some(entry) = entry {
            for dependency in &entry.dependencies {
                let instance = self.resolve_dependency(dependency)?;
                match dependency.injection() {
                    Injection::Constructor => arguments.push(instance),
                    Injection::Method(method) => setters.push((method.as_str(), instance)),
                }
            }
        }

        let constructor = entry.and_then(|entry| entry.constructor.as_deref());
        let mut object = definition.construct(constructor, &arguments)?;
        for (method, instance) in setters {
            definition.inject(object.as_mut(), method, Value::Object(instance))?;
        }
        Ok(object)
    }

    fn resolve_dependency(&self, dependency: &Dependency) -> DiResult<Instance> {
        if let Some(instance) = dependency.prebuilt() {
            return Ok(instance.clone());
        }

        let arguments = Some(dependency.argument_list()).filter(|arguments| !arguments.is_empty());
        match dependency.lifetime() {
            Lifetime::Transient => self.resolve_with(dependency.class_name(), arguments),
            Lifetime::Singleton => {
                let key = SingletonKey::new(dependency);
                if let Some(existing) = self.singletons.lock().get(&key) {
                    return Ok(existing.clone());
                }
                let created = self.resolve_with(dependency.class_name(), arguments)?;
                // First writer wins if another thread raced us here
                let mut singletons = self.singletons.lock();
                Ok(singletons.entry(key).or_insert(created).clone())
            }
        }
    }

    fn resolve_arguments(&self, arguments: &[Argument]) -> DiResult<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| match argument {
                Argument::Value(value) => Ok(Value::Scalar(value.clone())),
                Argument::Instance(instance) => Ok(Value::Object(instance.clone())),
                Argument::Class(class_name) => self.resolve(class_name).map(Value::Object),
            })
            .collect()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("classes", &self.classes)
            .field("declared", &self.entries.len())
            .field("singletons", &self.singleton_count())
            .finish()
    }
}
