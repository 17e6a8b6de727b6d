//! Convention based layer loading.
//!
//! A resource name and layer kind map to the class `<Kind>_<Resource>`, e.g.
//! `Model_Blog`. A class missing from the registry means the route simply has
//! no such layer, which is not an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Connector, LayerKind, Renderer};
use crate::value::AnyArc;
use crate::{Arguments, Container, DiError, DiResult, Instance};

/// Separator between the layer prefix and the resource in class names.
pub const CLASS_SEPARATOR: char = '_';

/// An instantiated layer.
pub enum Layer {
    Model(Instance),
    View(Arc<dyn Renderer>),
    Connector(Box<dyn Connector>),
}

impl Layer {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Layer::Model(_) => "model",
            Layer::View(_) => "view",
            Layer::Connector(_) => "connector",
        }
    }

    pub fn into_model(self) -> Option<Instance> {
        match self {
            Layer::Model(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn into_view(self) -> Option<Arc<dyn Renderer>> {
        match self {
            Layer::View(view) => Some(view),
            _ => None,
        }
    }

    pub fn into_connector(self) -> Option<Box<dyn Connector>> {
        match self {
            Layer::Connector(connector) => Some(connector),
            _ => None,
        }
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Model(instance) => f.debug_tuple("Model").field(instance).finish(),
            Layer::View(_) => f.write_str("View"),
            Layer::Connector(_) => f.write_str("Connector"),
        }
    }
}

/// Builds layers through a [`Container`].
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{Arguments, ClassDefinition, ClassRegistry, DependencyCollection, LayerLoader};
/// use std::sync::Arc;
///
/// struct Blog;
///
/// let mut classes = ClassRegistry::new();
/// classes.register(ClassDefinition::build::<Blog, _>("Model_Blog", |_| Ok(Blog)));
/// let container = Arc::new(DependencyCollection::new().build(Arc::new(classes)));
/// let loader = LayerLoader::new(container);
///
/// assert_eq!(LayerLoader::class_name("blog", &ferrous_dispatch::LayerKind::Model), "Model_Blog");
/// assert!(loader.init_model("blog", Arguments::default()).unwrap().is_some());
/// assert!(loader.init_model("news", Arguments::default()).unwrap().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct LayerLoader {
    container: Arc<Container>,
}

impl LayerLoader {
    pub fn new(container: Arc<Container>) -> Self {
        Self { container }
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    /// Class name for `resource` loaded as `kind`.
    pub fn class_name(resource: &str, kind: &LayerKind) -> String {
        format!("{}{}{}", kind.prefix(), CLASS_SEPARATOR, capitalize(resource))
    }

    /// Location a file based loader would read `class` from, for diagnostics.
    ///
    /// ```rust
    /// use ferrous_dispatch::LayerLoader;
    /// use std::path::Path;
    ///
    /// let path = LayerLoader::expected_path(Path::new("/app"), "Model_Blog");
    /// assert_eq!(path, Path::new("/app/Model/Blog.rs"));
    /// ```
    pub fn expected_path(app_root: &Path, class: &str) -> PathBuf {
        let mut path = app_root.to_path_buf();
        path.extend(class.split(CLASS_SEPARATOR));
        path.set_extension("rs");
        path
    }

    /// Instantiates `resource` as `kind`, forwarding `arguments` positionally.
    ///
    /// Returns `None` when no class is registered under the derived name.
    pub fn init_layer(&self, resource: &str, kind: &LayerKind, arguments: Arguments) -> DiResult<Option<Layer>> {
        let class = Self::class_name(resource, kind);
        let Some(definition) = self.container.classes().get(&class) else {
            tracing::debug!(%class, kind = %kind, "no layer registered");
            return Ok(None);
        };

        let layer = match kind {
            LayerKind::Model => {
                let object = self.container.build_with_values(&class, arguments)?;
                Layer::Model(Instance::from_any(&class, Arc::from(object)))
            }
            LayerKind::View => {
                if !definition.is_renderer() {
                    return Err(DiError::LayerMismatch { class, layer: "view" });
                }
                let object: AnyArc = Arc::from(self.container.build_with_values(&class, arguments)?);
                let view = definition
                    .as_renderer(&object)
                    .ok_or(DiError::LayerMismatch { class: class.clone(), layer: "view" })?;
                Layer::View(view)
            }
            LayerKind::Connector(_) => {
                if !definition.is_connector() {
                    return Err(DiError::LayerMismatch { class, layer: "connector" });
                }
                let object = self.container.build_with_values(&class, arguments)?;
                let connector = definition
                    .into_connector(object)
                    .ok_or(DiError::LayerMismatch { class: class.clone(), layer: "connector" })?;
                Layer::Connector(connector)
            }
        };

        tracing::debug!(%class, layer = layer.kind_name(), "layer loaded");
        Ok(Some(layer))
    }

    pub fn init_model(&self, resource: &str, arguments: Arguments) -> DiResult<Option<Instance>> {
        Ok(self
            .init_layer(resource, &LayerKind::Model, arguments)?
            .and_then(Layer::into_model))
    }

    pub fn init_view(&self, resource: &str, arguments: Arguments) -> DiResult<Option<Arc<dyn Renderer>>> {
        Ok(self
            .init_layer(resource, &LayerKind::View, arguments)?
            .and_then(Layer::into_view))
    }

    /// Instantiates the connector layer named `kind`, e.g. `Presenter`.
    pub fn init_connector(&self, resource: &str, kind: &str, arguments: Arguments) -> DiResult<Option<Box<dyn Connector>>> {
        Ok(self
            .init_layer(resource, &LayerKind::Connector(kind.to_string()), arguments)?
            .and_then(Layer::into_connector))
    }
}

fn capitalize(resource: &str) -> String {
    let mut chars = resource.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
