//! Values flowing through registrations and constructors.
//!
//! [`Argument`] is what gets registered, [`Value`] is what a constructor or
//! setter receives after resolution, and [`Instance`] is a shared,
//! type-erased object produced by the container or supplied by the caller.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::{DiError, DiResult};

// Type-erased Arc for storage
pub(crate) type AnyArc = Arc<dyn Any + Send + Sync>;

/// A shared, type-erased object.
///
/// Cloning is cheap and yields a handle to the same object, which makes
/// singleton identity observable through [`Instance::ptr_eq`].
///
/// Trait objects are stored as `Arc<Arc<dyn Trait>>` inside the erased box so
/// they can be recovered with [`Instance::downcast_trait`].
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::Instance;
///
/// struct CacheService { hits: u32 }
///
/// let instance = Instance::new(CacheService { hits: 3 });
/// let same = instance.clone();
/// assert!(instance.ptr_eq(&same));
/// assert_eq!(instance.downcast::<CacheService>().unwrap().hits, 3);
/// assert!(instance.downcast::<String>().is_none());
/// ```
#[derive(Clone)]
pub struct Instance {
    class: Arc<str>,
    object: AnyArc,
}

impl Instance {
    /// Wraps a value; the class is reported as the Rust type name.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value without copying it.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            class: Arc::from(type_name::<T>()),
            object: value,
        }
    }

    /// Wraps a trait object.
    pub fn from_trait<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            class: Arc::from(type_name::<T>()),
            object: Arc::new(value),
        }
    }

    pub(crate) fn from_any(class: &str, object: AnyArc) -> Self {
        Self {
            class: Arc::from(class),
            object,
        }
    }

    /// Class name the instance was built for.
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn is<T: Any + Send + Sync>(&self) -> bool {
        self.object.is::<T>()
    }

    /// Returns the concrete object when it is a `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.object.clone().downcast::<T>().ok()
    }

    /// Returns the trait object stored with [`Instance::from_trait`].
    pub fn downcast_trait<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.object.downcast_ref::<Arc<T>>().cloned()
    }

    /// True when both handles point at the same object.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }

    /// Address of the shared object, stable for the instance's lifetime.
    pub(crate) fn address(&self) -> usize {
        Arc::as_ptr(&self.object) as *const () as usize
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance").field("class", &self.class).finish()
    }
}

/// A resolved positional value handed to constructors and setters.
#[derive(Clone, Debug)]
pub enum Value {
    /// Plain data
    Scalar(serde_json::Value),
    /// Shared object
    Object(Instance),
}

impl Value {
    pub fn null() -> Self {
        Value::Scalar(serde_json::Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(serde_json::Value::Null))
    }

    pub fn as_scalar(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Scalar(v) => Some(v),
            Value::Object(_) => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Object(i) => Some(i),
            Value::Scalar(_) => None,
        }
    }

    /// Downcasts an object value to `T`.
    pub fn downcast<T: Any + Send + Sync>(&self) -> DiResult<Arc<T>> {
        self.as_instance()
            .and_then(Instance::downcast::<T>)
            .ok_or_else(|| DiError::TypeMismatch {
                expected: type_name::<T>(),
                found: self.describe(),
            })
    }

    fn describe(&self) -> String {
        match self {
            Value::Object(i) => i.class().to_string(),
            Value::Scalar(v) => format!("scalar {}", v),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Scalar(value)
    }
}

impl From<Instance> for Value {
    fn from(instance: Instance) -> Self {
        Value::Object(instance)
    }
}

impl From<Option<Instance>> for Value {
    fn from(instance: Option<Instance>) -> Self {
        instance.map_or_else(Value::null, Value::Object)
    }
}

/// A registered constructor argument, resolved when the owning class is built.
#[derive(Clone, Debug)]
pub enum Argument {
    /// Passed through verbatim
    Value(serde_json::Value),
    /// Resolved recursively through the container
    Class(String),
    /// Shared as-is
    Instance(Instance),
}

impl Argument {
    pub fn value(value: impl Into<serde_json::Value>) -> Self {
        Argument::Value(value.into())
    }

    pub fn class(name: impl Into<String>) -> Self {
        Argument::Class(name.into())
    }

    pub fn instance(instance: Instance) -> Self {
        Argument::Instance(instance)
    }
}

impl From<serde_json::Value> for Argument {
    fn from(value: serde_json::Value) -> Self {
        Argument::Value(value)
    }
}

impl From<Instance> for Argument {
    fn from(instance: Instance) -> Self {
        Argument::Instance(instance)
    }
}

/// Positional arguments received by a constructor.
///
/// Accessors report [`DiError::MissingArgument`] for positions that were not
/// supplied and [`DiError::TypeMismatch`] for values of the wrong kind.
#[derive(Clone, Debug, Default)]
pub struct Arguments {
    class: String,
    values: Vec<Value>,
}

impl Arguments {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            class: String::new(),
            values,
        }
    }

    pub(crate) fn for_class(class: &str, values: Vec<Value>) -> Self {
        Self {
            class: class.to_string(),
            values,
        }
    }

    pub(crate) fn set_class(&mut self, class: &str) {
        self.class = class.to_string();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn require(&self, index: usize) -> DiResult<&Value> {
        self.values.get(index).ok_or_else(|| DiError::MissingArgument {
            class: self.class.clone(),
            index,
        })
    }

    /// Object at `index` downcast to `T`.
    pub fn instance<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Arc<T>> {
        self.require(index)?.downcast::<T>()
    }

    /// Like [`Arguments::instance`] but absent and null positions yield `None`.
    pub fn optional_instance<T: Any + Send + Sync>(&self, index: usize) -> DiResult<Option<Arc<T>>> {
        match self.values.get(index) {
            None => Ok(None),
            Some(value) if value.is_null() => Ok(None),
            Some(value) => value.downcast::<T>().map(Some),
        }
    }

    /// Raw instance at `index`, `None` for absent or null positions.
    pub fn optional_raw(&self, index: usize) -> Option<Instance> {
        self.values.get(index).and_then(Value::as_instance).cloned()
    }

    /// Trait object at `index`, stored with [`Instance::from_trait`].
    pub fn shared<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<T>> {
        let value = self.require(index)?;
        value
            .as_instance()
            .and_then(Instance::downcast_trait::<T>)
            .ok_or_else(|| DiError::TypeMismatch {
                expected: type_name::<T>(),
                found: value.describe(),
            })
    }

    /// Plain data at `index`.
    pub fn scalar(&self, index: usize) -> DiResult<&serde_json::Value> {
        let value = self.require(index)?;
        value.as_scalar().ok_or_else(|| DiError::TypeMismatch {
            expected: "scalar",
            found: value.describe(),
        })
    }

    /// String data at `index`.
    pub fn str(&self, index: usize) -> DiResult<&str> {
        let value = self.require(index)?;
        value
            .as_scalar()
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| DiError::TypeMismatch {
                expected: "string",
                found: value.describe(),
            })
    }
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Arguments::new(values)
    }
}
