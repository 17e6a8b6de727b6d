//! JSON import and export of dependency collections.
//!
//! The file format is a single object wrapping a list of class records, one
//! per class in declaration order:
//!
//! ```json
//! {"map":[{"Foo":{"arguments":["I R Baboon!"],"dependencies":[
//!     {"target":"db","className":"Database","arguments":["foo"],"instance":null,
//!      "config":{"type":"constructor"},"lifetime":"transient"},
//!     {"target":"log","className":"Logger","instance":null,
//!      "config":{"type":"method","value":"setLogging"},"lifetime":"singleton"}]}}]}
//! ```
//!
//! Class references among arguments are written as `{"$class": "Name"}`.
//! Pre-built instances are never serialized; they are exported as `null` and
//! come back as lazily constructed singletons.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Dependency, DependencyCollection, Injection};
use crate::{Argument, DiError, DiResult, Lifetime};

const CLASS_REFERENCE: &str = "$class";

#[derive(Debug, Serialize, Deserialize)]
struct MapFile {
    map: Vec<BTreeMap<String, ClassRecord>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ClassRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arguments: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    constructor: Option<String>,
    #[serde(default)]
    dependencies: Vec<DependencyRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DependencyRecord {
    target: String,
    class_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    arguments: Vec<serde_json::Value>,
    #[serde(default)]
    instance: Option<serde_json::Value>,
    config: InjectionRecord,
    #[serde(default)]
    lifetime: Lifetime,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
enum InjectionRecord {
    Constructor,
    Method(String),
}

fn encode_argument(argument: &Argument) -> serde_json::Value {
    match argument {
        Argument::Value(value) => value.clone(),
        Argument::Class(name) => {
            let mut reference = serde_json::Map::new();
            reference.insert(CLASS_REFERENCE.to_string(), serde_json::Value::String(name.clone()));
            serde_json::Value::Object(reference)
        }
        Argument::Instance(_) => serde_json::Value::Null,
    }
}

fn decode_argument(value: serde_json::Value) -> Argument {
    if let serde_json::Value::Object(object) = &value {
        if object.len() == 1 {
            if let Some(serde_json::Value::String(name)) = object.get(CLASS_REFERENCE) {
                return Argument::Class(name.clone());
            }
        }
    }
    Argument::Value(value)
}

impl DependencyCollection {
    fn to_map_file(&self) -> MapFile {
        let mut map = Vec::with_capacity(self.len());
        for class in self.classes() {
            let record = ClassRecord {
                arguments: self
                    .arguments(class)
                    .map(|arguments| arguments.iter().map(encode_argument).collect()),
                constructor: self.constructor(class).map(str::to_string),
                dependencies: self
                    .dependencies(class)
                    .iter()
                    .map(|dependency| DependencyRecord {
                        target: dependency.target().to_string(),
                        class_name: dependency.class_name().to_string(),
                        arguments: dependency.argument_list().iter().map(encode_argument).collect(),
                        instance: None,
                        config: match dependency.injection() {
                            Injection::Constructor => InjectionRecord::Constructor,
                            Injection::Method(method) => InjectionRecord::Method(method.clone()),
                        },
                        lifetime: dependency.lifetime(),
                    })
                    .collect(),
            };
            map.push(BTreeMap::from([(class.to_string(), record)]));
        }
        MapFile { map }
    }

    /// Serializes the collection to the JSON map format.
    pub fn to_json(&self) -> DiResult<String> {
        serde_json::to_string(&self.to_map_file()).map_err(|e| DiError::Export(e.to_string()))
    }

    /// Serializes the collection to indented JSON.
    pub fn to_json_pretty(&self) -> DiResult<String> {
        serde_json::to_string_pretty(&self.to_map_file()).map_err(|e| DiError::Export(e.to_string()))
    }

    /// Writes the collection to `path`. The parent directory must exist.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> DiResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(DiError::Export(format!(
                    "Output directory \"{}\" does not exist",
                    parent.display()
                )));
            }
        }
        let json = self.to_json_pretty()?;
        fs::write(path, json).map_err(|e| DiError::Export(e.to_string()))
    }

    /// Reads a collection from the JSON map format.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ferrous_dispatch::{DependencyCollection, Injection};
    ///
    /// let json = r#"{"map":[{"Foo":{"arguments":["I R Baboon!"],"dependencies":[
    ///     {"target":"log","className":"Logger","config":{"type":"method","value":"setLogging"}}
    /// ]}}]}"#;
    ///
    /// let collection = DependencyCollection::from_json(json).unwrap();
    /// let log = &collection.dependencies("Foo")[0];
    /// assert_eq!(log.class_name(), "Logger");
    /// assert_eq!(log.injection(), &Injection::Method("setLogging".to_string()));
    /// ```
    pub fn from_json(json: &str) -> DiResult<DependencyCollection> {
        let file: MapFile = serde_json::from_str(json).map_err(|e| DiError::Export(e.to_string()))?;
        let mut collection = DependencyCollection::new();
        for classes in file.map {
            for (class, record) in classes {
                if let Some(arguments) = record.arguments {
                    collection.set_arguments(&class, arguments.into_iter().map(decode_argument).collect());
                }
                if let Some(constructor) = record.constructor {
                    collection.set_constructor(&class, constructor);
                }
                for entry in record.dependencies {
                    let mut dependency = Dependency::new(entry.target, entry.class_name)
                        .arguments(entry.arguments.into_iter().map(decode_argument).collect());
                    if let InjectionRecord::Method(method) = entry.config {
                        dependency = dependency.method(method);
                    }
                    if entry.lifetime == Lifetime::Singleton {
                        dependency = dependency.singleton();
                    }
                    collection.register_dependency(&class, dependency)?;
                }
            }
        }
        Ok(collection)
    }

    /// Reads a collection from a JSON map file.
    pub fn import_from_file(path: impl AsRef<Path>) -> DiResult<DependencyCollection> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| DiError::Export(e.to_string()))?;
        Self::from_json(&json)
    }
}
