//! Class definitions and the registry that replaces file-based class loading.
//!
//! A [`ClassDefinition`] describes how to construct one named class: its
//! default constructor, optional named constructors, the setters available
//! for method injection and whether it can serve as a view or connector
//! layer. The [`ClassRegistry`] maps names to definitions; a name missing from
//! the registry is the equivalent of a class file that does not exist.

use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::layer::{Connector, Renderer};
use crate::value::AnyArc;
use crate::{Arguments, DiError, DiResult, Value};

pub(crate) type BoxAny = Box<dyn Any + Send + Sync>;
type Constructor = Arc<dyn Fn(&Arguments) -> DiResult<BoxAny> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut (dyn Any + Send + Sync), Value) -> DiResult<()> + Send + Sync>;
type RendererCast = Arc<dyn Fn(&AnyArc) -> Option<Arc<dyn Renderer>> + Send + Sync>;
type ConnectorCast = Arc<dyn Fn(BoxAny) -> Option<Box<dyn Connector>> + Send + Sync>;

/// Type-erased description of how to build one class.
pub struct ClassDefinition {
    name: String,
    type_name: &'static str,
    constructor: Constructor,
    constructors: HashMap<String, Constructor>,
    setters: HashMap<String, Setter>,
    renderer: Option<RendererCast>,
    connector: Option<ConnectorCast>,
    on_load: Option<Box<dyn Fn() + Send + Sync>>,
}

impl ClassDefinition {
    /// Starts a definition for class `name` backed by the Rust type `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_dispatch::{ClassDefinition, ClassRegistry};
    ///
    /// struct Mailer { sender: String }
    ///
    /// let mut classes = ClassRegistry::new();
    /// classes.register(
    ///     ClassDefinition::build::<Mailer, _>("Mailer", |args| {
    ///         Ok(Mailer { sender: args.str(0)?.to_string() })
    ///     })
    ///     .setter("setSender", |mailer: &mut Mailer, value| {
    ///         mailer.sender = value.as_scalar().and_then(|v| v.as_str()).unwrap_or_default().to_string();
    ///         Ok(())
    ///     }),
    /// );
    /// assert!(classes.contains("Mailer"));
    /// assert!(classes.get("Mailer").unwrap().has_setter("setSender"));
    /// ```
    pub fn build<T, F>(name: impl Into<String>, constructor: F) -> ClassBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        ClassBuilder {
            definition: ClassDefinition {
                name: name.into(),
                type_name: type_name::<T>(),
                constructor: erase_constructor(constructor),
                constructors: HashMap::new(),
                setters: HashMap::new(),
                renderer: None,
                connector: None,
                on_load: None,
            },
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rust type backing the class.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn has_setter(&self, method: &str) -> bool {
        self.setters.contains_key(method)
    }

    pub fn has_constructor(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn is_renderer(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn is_connector(&self) -> bool {
        self.connector.is_some()
    }

    /// Runs the default constructor, or the named one when given.
    pub(crate) fn construct(&self, constructor: Option<&str>, arguments: &Arguments) -> DiResult<BoxAny> {
        let ctor = match constructor {
            None => &self.constructor,
            Some(name) => self
                .constructors
                .get(name)
                .ok_or_else(|| DiError::UnknownConstructor {
                    class: self.name.clone(),
                    constructor: name.to_string(),
                })?,
        };
        ctor(arguments)
    }

    /// Calls setter `method` on a freshly constructed object.
    pub(crate) fn inject(&self, object: &mut (dyn Any + Send + Sync), method: &str, value: Value) -> DiResult<()> {
        let setter = self.setters.get(method).ok_or_else(|| DiError::InjectionTarget {
            class: self.name.clone(),
            method: method.to_string(),
        })?;
        setter(object, value)
    }

    pub(crate) fn as_renderer(&self, object: &AnyArc) -> Option<Arc<dyn Renderer>> {
        self.renderer.as_ref().and_then(|cast| cast(object))
    }

    pub(crate) fn into_connector(&self, object: BoxAny) -> Option<Box<dyn Connector>> {
        self.connector.as_ref().and_then(|cast| cast(object))
    }
}

impl fmt::Debug for ClassDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut setters: Vec<&String> = self.setters.keys().collect();
        setters.sort();
        f.debug_struct("ClassDefinition")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("setters", &setters)
            .field("renderer", &self.is_renderer())
            .field("connector", &self.is_connector())
            .finish()
    }
}

fn erase_constructor<T, F>(constructor: F) -> Constructor
where
    T: Any + Send + Sync,
    F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
{
    Arc::new(move |arguments: &Arguments| -> DiResult<BoxAny> {
        Ok(Box::new(constructor(arguments)?))
    })
}

/// Typed builder for a [`ClassDefinition`].
pub struct ClassBuilder<T> {
    definition: ClassDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// Declares a named constructor, selectable through a constructor override.
    pub fn constructor<F>(mut self, name: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        self.definition
            .constructors
            .insert(name.into(), erase_constructor(constructor));
        self
    }

    /// Declares a setter usable as a method injection target.
    pub fn setter<F>(mut self, method: impl Into<String>, setter: F) -> Self
    where
        F: Fn(&mut T, Value) -> DiResult<()> + Send + Sync + 'static,
    {
        let class = self.definition.name.clone();
        let erased = move |object: &mut (dyn Any + Send + Sync), value: Value| -> DiResult<()> {
            let typed = object.downcast_mut::<T>().ok_or_else(|| DiError::TypeMismatch {
                expected: type_name::<T>(),
                found: class.clone(),
            })?;
            setter(typed, value)
        };
        self.definition.setters.insert(method.into(), Arc::new(erased));
        self
    }

    /// Hook run the first time the class is loaded from a registry.
    pub fn on_load<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.definition.on_load = Some(Box::new(hook));
        self
    }

    pub fn finish(self) -> ClassDefinition {
        self.definition
    }
}

impl<T: Renderer + Any> ClassBuilder<T> {
    /// Declares the class usable as a view layer.
    pub fn renderer(mut self) -> Self {
        let cast = |object: &AnyArc| -> Option<Arc<dyn Renderer>> {
            object
                .clone()
                .downcast::<T>()
                .ok()
                .map(|typed| typed as Arc<dyn Renderer>)
        };
        self.definition.renderer = Some(Arc::new(cast));
        self
    }
}

impl<T: Connector + Any + Sync> ClassBuilder<T> {
    /// Declares the class usable as a connector layer.
    pub fn connector(mut self) -> Self {
        let cast = |object: BoxAny| -> Option<Box<dyn Connector>> {
            object
                .downcast::<T>()
                .ok()
                .map(|typed| typed as Box<dyn Connector>)
        };
        self.definition.connector = Some(Arc::new(cast));
        self
    }
}

impl<T: Any + Send + Sync> From<ClassBuilder<T>> for ClassDefinition {
    fn from(builder: ClassBuilder<T>) -> Self {
        builder.finish()
    }
}

/// Name to definition map, immutable once handed to a container.
///
/// Loading a class through [`ClassRegistry::load`] is idempotent: the
/// definition's load hook runs once per registry regardless of how many
/// resolutions reference the class.
#[derive(Default)]
pub struct ClassRegistry {
    classes: HashMap<String, ClassDefinition>,
    loaded: Mutex<HashSet<String>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a class definition.
    pub fn register(&mut self, definition: impl Into<ClassDefinition>) -> &mut Self {
        let definition = definition.into();
        self.classes.insert(definition.name.clone(), definition);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ClassDefinition> {
        self.classes.get(name)
    }

    /// Registered class names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.classes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Looks a class up and marks it loaded, running its load hook once.
    pub fn load(&self, name: &str) -> DiResult<&ClassDefinition> {
        let definition = self
            .classes
            .get(name)
            .ok_or_else(|| DiError::UnresolvableDependency(name.to_string()))?;

        let first_load = self.loaded.lock().insert(name.to_string());
        if first_load {
            if let Some(hook) = &definition.on_load {
                hook();
            }
        }
        Ok(definition)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.loaded.lock().contains(name)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.lock().len()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names())
            .field("loaded", &self.loaded_count())
            .finish()
    }
}
