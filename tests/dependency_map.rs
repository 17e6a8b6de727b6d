use ferrous_dispatch::{
    validate, Argument, ClassDefinition, ClassRegistry, Dependency, DependencyCollection,
    DependencyMap, DiError, Injection, Instance, Lifetime, ValidationError, ValidationWarning,
};
use std::sync::Arc;

struct Logger;
struct Database {
    dsn: String,
}
struct Foo {
    label: String,
    db: Arc<Database>,
    logger: Option<Arc<Logger>>,
}

fn classes() -> ClassRegistry {
    let mut classes = ClassRegistry::new();
    classes
        .register(ClassDefinition::build::<Logger, _>("Logger", |_| Ok(Logger)))
        .register(ClassDefinition::build::<Database, _>("Database", |args| {
            Ok(Database { dsn: args.str(0)?.to_string() })
        }))
        .register(
            ClassDefinition::build::<Foo, _>("Foo", |args| {
                Ok(Foo {
                    label: args.str(0)?.to_string(),
                    db: args.instance::<Database>(1)?,
                    logger: None,
                })
            })
            .setter("setLogging", |foo: &mut Foo, value| {
                foo.logger = Some(value.downcast::<Logger>()?);
                Ok(())
            }),
        );
    classes
}

#[test]
fn test_fluent_map_builds_container() {
    let mut map = DependencyMap::new();
    map.class_with("Foo", Some(vec![Argument::value("I R Baboon!")]), None)
        .depends_on("Database")
        .id("db")
        .arguments(vec![Argument::value("sqlite::memory:")])
        .depends_on("Logger")
        .target("log")
        .method("setLogging")
        .singleton()
        .wire();

    assert_eq!(map.last_processed_class(), Some("Foo"));

    let container = map.build(Arc::new(classes())).unwrap();
    let foo = container.resolve_as::<Foo>("Foo").unwrap();
    assert_eq!(foo.label, "I R Baboon!");
    assert_eq!(foo.db.dsn, "sqlite::memory:");
    assert!(foo.logger.is_some());
}

#[test]
fn test_fluent_default_target_is_class_name() {
    let mut map = DependencyMap::new();
    map.class("Foo").depends_on("Database");
    let collection = map.store().unwrap();
    assert_eq!(collection.dependencies("Foo")[0].target(), "Database");
}

#[test]
fn test_fluent_keeps_first_error() {
    let mut map = DependencyMap::new();
    map.class("Foo")
        .depends_on("Database")
        .target("db")
        .depends_on("OtherDatabase")
        .target("db")
        .wire();

    assert_eq!(
        map.store().unwrap_err(),
        DiError::DuplicateTarget { class: "Foo".to_string(), target: "db".to_string() }
    );
}

#[test]
fn test_fluent_dependency_without_class() {
    let mut map = DependencyMap::new();
    map.target("orphan");
    assert!(matches!(map.store(), Err(DiError::DetachedDependency(_))));

    let mut map = DependencyMap::new();
    map.depends_on("Database").wire();
    assert!(matches!(map.store(), Err(DiError::DetachedDependency(_))));
}

#[test]
fn test_store_resets_map() {
    let mut map = DependencyMap::new();
    map.class("Foo").depends_on("Logger");
    assert_eq!(map.store().unwrap().len(), 1);
    assert!(map.store().unwrap().is_empty());
}

fn sample_collection() -> DependencyCollection {
    let mut collection = DependencyCollection::new();
    collection
        .set_arguments("Foo", vec![Argument::value("I R Baboon!")])
        .register_dependency(
            "Foo",
            Dependency::new("db", "Database").arguments(vec![Argument::value("sqlite::memory:")]),
        )
        .unwrap()
        .register_dependency(
            "Foo",
            Dependency::new("log", "Logger").method("setLogging").instance(Instance::new(Logger)),
        )
        .unwrap()
        .register_dependency("Bar", Dependency::new("foo", "Foo").arguments(vec![Argument::class("Foo")]))
        .unwrap()
        .set_constructor("Bar", "create");
    collection
}

#[test]
fn test_export_shape() {
    let json: serde_json::Value = serde_json::from_str(&sample_collection().to_json().unwrap()).unwrap();

    let map = json["map"].as_array().unwrap();
    assert_eq!(map.len(), 2);
    let foo = &map[0]["Foo"];
    assert_eq!(foo["arguments"], serde_json::json!(["I R Baboon!"]));
    assert_eq!(foo["dependencies"][0]["className"], "Database");
    assert_eq!(foo["dependencies"][0]["config"], serde_json::json!({"type": "constructor"}));
    assert_eq!(foo["dependencies"][1]["config"], serde_json::json!({"type": "method", "value": "setLogging"}));
    assert_eq!(foo["dependencies"][1]["instance"], serde_json::Value::Null);
    assert_eq!(foo["dependencies"][1]["lifetime"], "singleton");

    let bar = &map[1]["Bar"];
    assert_eq!(bar["constructor"], "create");
    assert_eq!(bar["dependencies"][0]["arguments"], serde_json::json!([{"$class": "Foo"}]));
}

#[test]
fn test_import_restores_declarations() {
    let json = sample_collection().to_json().unwrap();
    let collection = DependencyCollection::from_json(&json).unwrap();

    assert_eq!(collection.classes().collect::<Vec<_>>(), vec!["Foo", "Bar"]);
    let log = &collection.dependencies("Foo")[1];
    assert_eq!(log.injection(), &Injection::Method("setLogging".to_string()));
    assert_eq!(log.lifetime(), Lifetime::Singleton);
    assert!(log.prebuilt().is_none());

    assert_eq!(collection.constructor("Bar"), Some("create"));
    assert!(matches!(
        collection.dependencies("Bar")[0].argument_list(),
        [Argument::Class(name)] if name == "Foo"
    ));
}

#[test]
fn test_export_to_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("map.json");

    sample_collection().export_to_file(&path).unwrap();
    let collection = DependencyCollection::import_from_file(&path).unwrap();
    assert_eq!(collection.dependencies("Foo").len(), 2);
}

#[test]
fn test_export_to_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("map.json");

    match sample_collection().export_to_file(&path) {
        Err(DiError::Export(message)) => assert!(message.contains("does not exist")),
        other => panic!("expected export error, got {:?}", other),
    }
}

#[test]
fn test_validate_reports_problems() {
    let mut collection = DependencyCollection::new();
    collection
        .register_dependency("Foo", Dependency::new("log", "Logger").method("setLogger"))
        .unwrap()
        .register_dependency("Foo", Dependency::new("cache", "Cache"))
        .unwrap()
        .set_constructor("Database", "pooled");

    let result = validate(&collection, &classes());
    assert!(!result.is_valid());
    assert!(result.errors.contains(&ValidationError::UndeclaredSetter {
        class: "Foo".to_string(),
        method: "setLogger".to_string(),
    }));
    assert!(result.errors.contains(&ValidationError::UnregisteredClass {
        class: "Cache".to_string(),
        required_by: Some("Foo".to_string()),
    }));
    assert!(result.errors.contains(&ValidationError::UndeclaredConstructor {
        class: "Database".to_string(),
        constructor: "pooled".to_string(),
    }));
}

#[test]
fn test_validate_warns_about_cycles() {
    let mut classes = classes();
    classes.register(ClassDefinition::build::<Logger, _>("Audit", |_| Ok(Logger)));

    let mut collection = DependencyCollection::new();
    collection
        .register_dependency("Logger", Dependency::new("audit", "Audit"))
        .unwrap()
        .register_dependency("Audit", Dependency::new("logger", "Logger"))
        .unwrap();

    let result = validate(&collection, &classes);
    assert!(result.is_valid());
    assert_eq!(
        result.warnings,
        vec![ValidationWarning::CircularDependency {
            cycle: vec!["Audit".to_string(), "Logger".to_string(), "Audit".to_string()],
        }]
    );
}
