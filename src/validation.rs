//! Static validation of a dependency collection against a class registry.
//!
//! Resolution itself performs no checks beyond what it needs to construct an
//! object, so mistakes such as a misspelled setter or a dependency cycle only
//! show up when a request first hits them. Running [`validate`] at startup
//! surfaces them early.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::collection::Injection;
use crate::{Argument, ClassRegistry, DependencyCollection};

/// Result of validating a collection.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Problems that make resolution fail
    pub errors: Vec<ValidationError>,
    /// Configurations that resolve but are likely mistakes
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// A problem that makes resolution fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A class referenced by the collection has no definition
    UnregisteredClass {
        /// Missing class
        class: String,
        /// Class that references it, if any
        required_by: Option<String>,
    },
    /// A method injection names a setter the owning class does not declare
    UndeclaredSetter {
        /// Owning class
        class: String,
        /// Setter name
        method: String,
    },
    /// A constructor override names a constructor the class does not declare
    UndeclaredConstructor {
        /// Class
        class: String,
        /// Constructor name
        constructor: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnregisteredClass { class, required_by: Some(owner) } => {
                write!(f, "{} (required by {}) is not registered", class, owner)
            }
            ValidationError::UnregisteredClass { class, required_by: None } => {
                write!(f, "{} is not registered", class)
            }
            ValidationError::UndeclaredSetter { class, method } => {
                write!(f, "{} does not declare setter {}()", class, method)
            }
            ValidationError::UndeclaredConstructor { class, constructor } => {
                write!(f, "{} does not declare constructor {}()", class, constructor)
            }
        }
    }
}

/// A configuration that resolves but is likely a mistake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationWarning {
    /// Resolving any class on the cycle recurses forever
    CircularDependency {
        /// Classes on the cycle, first one repeated at the end
        cycle: Vec<String>,
    },
    /// A dependency has both a pre-built instance and arguments; the arguments are never used
    UnusedArguments {
        /// Owning class
        class: String,
        /// Dependency target
        target: String,
    },
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationWarning::CircularDependency { cycle } => {
                write!(f, "Circular dependency: {}", cycle.join(" -> "))
            }
            ValidationWarning::UnusedArguments { class, target } => {
                write!(f, "Arguments of {}.{} are ignored because an instance is set", class, target)
            }
        }
    }
}

/// Checks every class, setter and constructor the collection references.
///
/// # Examples
///
/// ```rust
/// use ferrous_dispatch::{validate, ClassRegistry, Dependency, DependencyCollection};
///
/// let mut collection = DependencyCollection::new();
/// collection.register_dependency("A", Dependency::new("b", "B")).unwrap();
/// collection.register_dependency("B", Dependency::new("a", "A")).unwrap();
///
/// let result = validate(&collection, &ClassRegistry::new());
/// assert!(!result.is_valid());
/// assert!(result.has_warnings());
/// ```
pub fn validate(collection: &DependencyCollection, classes: &ClassRegistry) -> ValidationResult {
    let mut result = ValidationResult::default();
    let mut reported: HashSet<String> = HashSet::new();
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();

    let mut require = |class: &str, owner: Option<&str>, result: &mut ValidationResult| {
        if !classes.contains(class) && reported.insert(class.to_string()) {
            result.errors.push(ValidationError::UnregisteredClass {
                class: class.to_string(),
                required_by: owner.map(str::to_string),
            });
        }
    };

    for class in collection.classes() {
        require(class, None, &mut result);
        let edges = graph.entry(class).or_default();

        if let Some(constructor) = collection.constructor(class) {
            if classes.get(class).is_some_and(|d| !d.has_constructor(constructor)) {
                result.errors.push(ValidationError::UndeclaredConstructor {
                    class: class.to_string(),
                    constructor: constructor.to_string(),
                });
            }
        }

        for argument in collection.arguments(class).unwrap_or_default() {
            if let Argument::Class(referenced) = argument {
                require(referenced.as_str(), Some(class), &mut result);
                edges.push(referenced.as_str());
            }
        }

        for dependency in collection.dependencies(class) {
            if let Injection::Method(method) = dependency.injection() {
                if classes.get(class).is_some_and(|d| !d.has_setter(method)) {
                    result.errors.push(ValidationError::UndeclaredSetter {
                        class: class.to_string(),
                        method: method.clone(),
                    });
                }
            }

            if dependency.prebuilt().is_some() {
                if !dependency.argument_list().is_empty() {
                    result.warnings.push(ValidationWarning::UnusedArguments {
                        class: class.to_string(),
                        target: dependency.target().to_string(),
                    });
                }
                continue;
            }

            require(dependency.class_name(), Some(class), &mut result);
            edges.push(dependency.class_name());
            for argument in dependency.argument_list() {
                if let Argument::Class(referenced) = argument {
                    require(referenced.as_str(), Some(class), &mut result);
                    edges.push(referenced.as_str());
                }
            }
        }
    }

    for cycle in find_cycles(&graph) {
        result.warnings.push(ValidationWarning::CircularDependency { cycle });
    }
    result
}

fn find_cycles<'a>(graph: &HashMap<&'a str, Vec<&'a str>>) -> Vec<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }

    fn visit<'a>(
        node: &'a str,
        graph: &HashMap<&'a str, Vec<&'a str>>,
        marks: &mut HashMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
        cycles: &mut Vec<Vec<String>>,
    ) {
        match marks.get(node) {
            Some(Mark::Done) => return,
            Some(Mark::Visiting) => {
                if let Some(start) = stack.iter().position(|n| *n == node) {
                    let mut cycle: Vec<String> = stack[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(node.to_string());
                    cycles.push(cycle);
                }
                return;
            }
            None => {}
        }

        marks.insert(node, Mark::Visiting);
        stack.push(node);
        for next in graph.get(node).map(Vec::as_slice).unwrap_or_default() {
            visit(*next, graph, marks, stack, cycles);
        }
        stack.pop();
        marks.insert(node, Mark::Done);
    }

    let mut roots: Vec<&str> = graph.keys().copied().collect();
    roots.sort_unstable();

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    let mut cycles = Vec::new();
    for root in roots {
        visit(root, graph, &mut marks, &mut stack, &mut cycles);
    }
    cycles
}
