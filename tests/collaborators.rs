use ferrous_dispatch::{
    Cache, ClassDefinition, ClassRegistry, CompositeLogger, ConfigError, Configuration,
    DependencyCollection, DiError, Level, Logger, LoggingObserver, MemoryCache, MemoryLogger, Registry, Response, TracingLogger,
};
use serde_json::json;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn test_configuration_paths() {
    let config = Configuration::from_value(json!({
        "i18n": {"defaults": {"locale": "en", "fallbacks": 2}},
        "debugging": {"enabled": false},
    }));

    assert_eq!(config.get_string("i18n:defaults:locale").unwrap(), "en");
    assert_eq!(config.get_i64("i18n:defaults:fallbacks").unwrap(), 2);
    assert!(!config.get_bool("debugging:enabled").unwrap());
    assert_eq!(config.get("i18n:defaults").unwrap()["locale"], "en");

    match config.get("i18n:routes:blog") {
        Err(ConfigError::MissingNode { path, node }) => {
            assert_eq!(path, "i18n:routes:blog");
            assert_eq!(node, "routes");
        }
        other => panic!("expected missing node, got {:?}", other),
    }
    assert!(matches!(
        config.get_bool("i18n:defaults:locale"),
        Err(ConfigError::TypeMismatch { expected: "boolean", .. })
    ));
    assert_eq!(config.get_string_or("i18n:defaults:currency", "EUR"), "EUR");
    assert_eq!(config.get_i64_or("i18n:defaults:locale", 7), 7);
}

#[test]
fn test_configuration_set_creates_parents() {
    let config = Configuration::new();
    config.set("cache:blog:ttl", json!(60));
    config.set("cache:enabled", json!(true));

    assert_eq!(config.get_i64("cache:blog:ttl").unwrap(), 60);
    assert!(config.contains("cache:enabled"));
    assert_eq!(config.to_value(), json!({"cache": {"blog": {"ttl": 60}, "enabled": true}}));

    config.set("cache:enabled:flag", json!("on"));
    assert_eq!(config.get_string("cache:enabled:flag").unwrap(), "on");
}

#[test]
fn test_configuration_env_override() {
    std::env::set_var("FERROUS_TEST_DEBUGGING_ENABLED", "true");
    std::env::set_var("FERROUS_TEST_APP_NAME", "blog");

    let config = Configuration::from_value(json!({"debugging": {"enabled": false}}))
        .with_env_prefix("ferrous_test");

    assert!(config.get_bool("debugging:enabled").unwrap());
    assert_eq!(config.get_string("app:name").unwrap(), "blog");
    assert_eq!(config.to_value(), json!({"debugging": {"enabled": false}}));
}

#[test]
fn test_configuration_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"debugging":{"enabled":true}}"#).unwrap();

    let config = Configuration::from_file(&path).unwrap();
    assert!(config.get_bool("debugging:enabled").unwrap());

    assert!(matches!(
        Configuration::from_file(dir.path().join("missing.json")),
        Err(ConfigError::Io(_))
    ));

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(Configuration::from_file(&path), Err(ConfigError::Parse(_))));
}

#[test]
fn test_memory_cache() {
    let cache = MemoryCache::new();
    cache.update("blog:1", json!({"title": "Hello"}), None);
    cache.update("blog:2", json!({"title": "Bye"}), Some(Duration::from_millis(20)));

    assert_eq!(cache.len(), 2);
    assert!(cache.exists("blog:2"));
    thread::sleep(Duration::from_millis(40));
    assert!(!cache.exists("blog:2"));
    assert_eq!(cache.read("blog:1").unwrap()["title"], "Hello");

    assert!(cache.delete("blog:1"));
    assert!(!cache.delete("blog:1"));
    assert!(cache.is_empty());
}

#[test]
fn test_response_first_send_wins() {
    let response = Response::new();
    assert!(!response.is_sent());
    assert_eq!(response.snapshot().status, 200);

    response.set_header("X-Token", "a");
    response.set_header("x-token", "b");
    assert!(response.send_http_status(503, "Service Unavailable"));
    assert!(!response.send_json(&json!({"ok": true}), 200));

    let sent = response.snapshot();
    assert_eq!(sent.status, 503);
    assert_eq!(sent.body, "Service Unavailable");
    assert_eq!(sent.headers, vec![("x-token".to_string(), "b".to_string())]);
    assert_eq!(sent.header("X-TOKEN"), Some("b"));
    assert!(!sent.is_success());
}

#[test]
fn test_memory_logger() {
    let logger = MemoryLogger::new();
    logger.info("booted");
    logger.log(Level::WARN, "slow route", &json!({"route": "/blog/show"}));

    assert_eq!(logger.len(), 2);
    assert!(logger.contains("slow"));
    let entries = logger.entries();
    assert_eq!(entries[1].level, Level::WARN);
    assert_eq!(entries[1].context["route"], "/blog/show");

    let serialized = serde_json::to_value(&entries[1]).unwrap();
    assert_eq!(serialized["level"], "WARN");
    assert_eq!(serialized["message"], "slow route");

    logger.clear();
    assert!(logger.is_empty());
}

#[test]
fn test_composite_logger_fans_out_above_default_level() {
    let archive = Arc::new(MemoryLogger::new());
    let audit = Arc::new(MemoryLogger::new());
    let composite = Arc::new(CompositeLogger::new(Level::INFO));
    composite.attach("Archive", archive.clone()).attach("audit", audit.clone());

    let registry = Registry::default().with_logger(composite.clone());
    registry.logger().debug("cache miss");
    registry.logger().warn("slow route");

    assert_eq!(archive.messages(), vec!["slow route"]);
    assert_eq!(audit.messages(), vec!["slow route"]);

    composite.set_default_level(Level::DEBUG);
    composite.debug("cache miss");
    assert_eq!(composite.default_level(), Level::DEBUG);
    assert!(archive.contains("cache miss"));

    assert!(composite.logger("archive").is_some());
    assert!(composite.detach("ARCHIVE"));
    assert!(!composite.detach("archive"));
    assert_eq!(composite.names(), vec!["audit"]);

    composite.error("disk full");
    assert_eq!(archive.len(), 2);
    assert!(audit.contains("disk full"));

    composite.detach_all();
    assert!(composite.is_empty());
    composite.error("dropped");
    assert_eq!(audit.len(), 3);
}

#[test]
fn test_registry_scoping() {
    let cache = Arc::new(MemoryCache::new());
    let logger = Arc::new(MemoryLogger::new());
    let registry = Registry::default()
        .with_cache(cache.clone())
        .with_logger(logger.clone());

    let scoped = registry.scoped();
    scoped.cache().update("hits", json!(1), None);
    scoped.logger().info("scoped");
    scoped.response().send_html("<p>one</p>");

    assert_eq!(cache.read("hits"), Some(json!(1)));
    assert!(logger.contains("scoped"));
    assert!(!registry.response().is_sent());
    assert!(Arc::ptr_eq(registry.configuration(), scoped.configuration()));
}

#[test]
fn test_tracing_sinks() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();

    TracingLogger.log(Level::INFO, "dispatching", &json!({"route": "/blog/show"}));

    struct Clock;
    let mut classes = ClassRegistry::new();
    classes.register(ClassDefinition::build::<Clock, _>("Clock", |_| Ok(Clock)));
    let mut collection = DependencyCollection::new();
    collection.add_observer(Arc::new(LoggingObserver::with_prefix("[test]")));
    let container = collection.build(Arc::new(classes));

    assert!(container.resolve("Clock").is_ok());
    assert_eq!(
        container.resolve("Calendar").unwrap_err(),
        DiError::UnresolvableDependency("Calendar".to_string())
    );
}
