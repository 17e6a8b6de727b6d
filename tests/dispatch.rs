use ferrous_dispatch::{
    ActionError, ActionResult, ActionTable, ClassDefinition, ClassRegistry, Configuration,
    Connector, ConnectorContext, Dependency, DependencyCollection, DiError, DispatchError,
    DispatchState, Dispatcher, Instance, LayerContext, Level, MemoryLogger, PresenterError,
    Registry, Renderer, RequestState, Response, RestPresenterError, Route, Translation, ViewSet,
};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

type Trace = Arc<Mutex<Vec<&'static str>>>;

struct CacheService {
    name: String,
}

struct BlogModel {
    context: LayerContext,
    cache: Arc<CacheService>,
}

struct BlogView {
    trace: Trace,
}

impl Renderer for BlogView {
    fn render(&self, data: &serde_json::Value, response: &Response) -> ActionResult {
        self.trace.lock().push("render");
        response.send_html(format!("<h1>{}</h1>", data["title"].as_str().unwrap_or_default()));
        Ok(())
    }
}

struct BlogPresenter {
    context: ConnectorContext,
    views: ViewSet,
    trace: Trace,
}

impl BlogPresenter {
    fn actions() -> ActionTable<Self> {
        ActionTable::new()
            .action("showAction", |p: &mut Self| {
                p.trace.lock().push("action");
                p.views.notify(&json!({"title": "Hello"}), p.context.response())
            })
            .action("failAction", |_| Err(RestPresenterError::new(422, "bad input").into()))
            .action("secureAction", |_| {
                Err(RestPresenterError::new(403, "denied").with_token("csrf-1").into())
            })
            .action("chainAction", |_| {
                let cause = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
                Err(RestPresenterError::new(500, "could not save").with_source(cause).into())
            })
            .action("plainAction", |_| Err(PresenterError::new(409, "Conflict").into()))
            .action("crashAction", |_| Err(ActionError::other("disk on fire")))
            .action("sentThenFailAction", |p: &mut Self| {
                p.context.response().send_html("partial");
                Err(PresenterError::new(500, "too late").into())
            })
            .action("contextAction", |p: &mut Self| {
                let title = p.context.model::<BlogModel>().map(|model| model.cache.name.clone());
                p.context.response().send_json(
                    &json!({
                        "model": title,
                        "view": p.context.view.is_some(),
                        "translation": p.context.translation,
                        "route": p.context.route.to_string(),
                    }),
                    200,
                );
                Ok(())
            })
    }
}

impl Connector for BlogPresenter {
    fn responds_to(&self, method: &str) -> bool {
        Self::actions().contains(method)
    }

    fn invoke(&mut self, method: &str) -> ActionResult {
        Self::actions().call(self, method)
    }

    fn attach(&mut self, view: Arc<dyn Renderer>) {
        self.trace.lock().push("attach");
        self.views.attach(view);
    }
}

fn presenter_class(name: &str, trace: &Trace) -> ClassDefinition {
    let trace = trace.clone();
    ClassDefinition::build::<BlogPresenter, _>(name, move |args| {
        Ok(BlogPresenter {
            context: ConnectorContext::from_arguments(args)?,
            views: ViewSet::new(),
            trace: trace.clone(),
        })
    })
    .connector()
    .finish()
}

fn view_class(trace: &Trace) -> ClassDefinition {
    let trace = trace.clone();
    ClassDefinition::build::<BlogView, _>("View_Blog", move |args| {
        LayerContext::from_arguments(args)?;
        Ok(BlogView { trace: trace.clone() })
    })
    .renderer()
    .finish()
}

fn model_class() -> ClassDefinition {
    ClassDefinition::build::<BlogModel, _>("Model_Blog", |args| {
        Ok(BlogModel {
            context: LayerContext::from_arguments(args)?,
            cache: args.instance::<CacheService>(6)?,
        })
    })
    .finish()
}

struct Fixture {
    trace: Trace,
    cache: Instance,
    classes: ClassRegistry,
    collection: DependencyCollection,
}

impl Fixture {
    fn new() -> Self {
        let cache = Instance::new(CacheService { name: "blog-cache".to_string() });
        let mut collection = DependencyCollection::new();
        collection
            .register_dependency("Model_Blog", Dependency::new("cache", "CacheService").instance(cache.clone()))
            .unwrap();
        Self {
            trace: Trace::default(),
            cache,
            classes: ClassRegistry::new(),
            collection,
        }
    }

    fn full() -> Self {
        let mut fixture = Self::new();
        let presenter = presenter_class("Presenter_Blog", &fixture.trace);
        let view = view_class(&fixture.trace);
        fixture.classes.register(model_class()).register(view).register(presenter);
        fixture
    }

    fn dispatcher(self, registry: Registry) -> (Dispatcher, Trace, Instance) {
        let container = Arc::new(self.collection.build(Arc::new(self.classes)));
        (Dispatcher::new(registry, container), self.trace, self.cache)
    }
}

fn request(action: &str) -> Arc<RequestState> {
    let mut request = RequestState::new();
    request
        .set_url(format!("/blog/{}", action))
        .set_active_route(Route::new("blog", action));
    Arc::new(request)
}

#[test]
fn test_missing_connector_is_bad_request() {
    let mut fixture = Fixture::new();
    fixture.classes.register(model_class());
    let (mut dispatcher, trace, _) = fixture.dispatcher(Registry::default());

    let response = dispatcher.create_from_request_state(request("show")).unwrap();

    assert_eq!(response.status, 400);
    assert_eq!(
        response.body,
        "No connector instance to execute route (\"/blog/show\") on. Sure it exists?"
    );
    assert_eq!(dispatcher.state(), DispatchState::Failed);
    assert!(dispatcher.model().is_some());
    assert!(!dispatcher.has_connector());
    assert!(trace.lock().is_empty());
}

#[test]
fn test_unknown_action_is_not_found() {
    let (mut dispatcher, trace, _) = Fixture::full().dispatcher(Registry::default());

    let response = dispatcher.create_from_request_state(request("missing")).unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(
        response.body,
        "Method: \"missingAction()\" in instance of class: \"blog\" not callable. Sure it exists?"
    );
    assert!(trace.lock().is_empty());
}

#[test]
fn test_view_attached_before_action_runs() {
    let (mut dispatcher, trace, _) = Fixture::full().dispatcher(Registry::default());

    let response = dispatcher.create_from_request_state(request("show")).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "<h1>Hello</h1>");
    assert_eq!(*trace.lock(), vec!["attach", "action", "render"]);
    assert_eq!(dispatcher.state(), DispatchState::Responded);
}

#[test]
fn test_rest_error_envelope() {
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());

    let response = dispatcher.create_from_request_state(request("fail")).unwrap();

    assert_eq!(response.status, 422);
    assert_eq!(response.content_type.as_deref(), Some(ferrous_dispatch::response::CONTENT_TYPE_JSON));
    assert_eq!(response.json().unwrap(), json!({"error": ["bad input"]}));
    assert_eq!(dispatcher.state(), DispatchState::Failed);
}

#[test]
fn test_rest_error_envelope_in_debug_mode() {
    let (dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());
    let mut dispatcher = dispatcher.with_debug(true);

    let body = dispatcher
        .create_from_request_state(request("fail"))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(body["error"], json!(["bad input"]));
    assert_eq!(body["meta"]["code"], 422);
    assert!(body["meta"]["file"].as_str().unwrap().ends_with("dispatch.rs"));
    assert!(body["meta"]["line"].as_u64().unwrap() > 0);
    assert_eq!(body["meta"]["previous"], json!([]));

    let body = dispatcher
        .create_from_request_state(request("chain"))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(body["meta"]["previous"], json!(["disk full"]));
}

#[test]
fn test_rest_error_token_is_echoed() {
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());

    let response = dispatcher.create_from_request_state(request("secure")).unwrap();

    assert_eq!(response.status, 403);
    assert_eq!(
        response.json().unwrap(),
        json!({"error": ["denied"], "security": {"token": "csrf-1"}})
    );
}

#[test]
fn test_debug_flag_read_from_configuration() {
    let configuration = Configuration::from_value(json!({"debugging": {"enabled": true}}));
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::new(Arc::new(configuration)));
    assert!(dispatcher.is_debug());

    let body = dispatcher
        .create_from_request_state(request("fail"))
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(body["meta"]["code"], 422);

    let (dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());
    assert!(!dispatcher.is_debug());
}

#[test]
fn test_presenter_error_sends_plain_status() {
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());

    let response = dispatcher.create_from_request_state(request("plain")).unwrap();

    assert_eq!(response.status, 409);
    assert_eq!(response.body, "Conflict");
    assert_eq!(response.content_type.as_deref(), Some(ferrous_dispatch::response::CONTENT_TYPE_TEXT));
}

#[test]
fn test_first_response_wins() {
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());

    let response = dispatcher.create_from_request_state(request("sentThenFail")).unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, "partial");
    assert_eq!(dispatcher.state(), DispatchState::Failed);
}

#[test]
fn test_other_action_errors_propagate() {
    let logger = Arc::new(MemoryLogger::new());
    let registry = Registry::default().with_logger(logger.clone());
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(registry);

    match dispatcher.create_from_request_state(request("crash")) {
        Err(DispatchError::Action(error)) => assert_eq!(error.to_string(), "disk on fire"),
        other => panic!("expected action error, got {:?}", other),
    }
    assert_eq!(dispatcher.state(), DispatchState::Failed);
    assert!(logger.contains("Dispatch aborted"));
}

#[test]
fn test_missing_route() {
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());

    let result = dispatcher.create_from_request_state(Arc::new(RequestState::new()));

    assert!(matches!(result, Err(DispatchError::MissingRoute)));
    assert_eq!(dispatcher.state(), DispatchState::Failed);
}

#[test]
fn test_model_receives_context_and_injected_cache() {
    let (mut dispatcher, _, cache) = Fixture::full().dispatcher(Registry::default());
    let request = request("show");

    dispatcher.create_from_request_state(request.clone()).unwrap();

    let model = dispatcher.model().unwrap().downcast::<BlogModel>().unwrap();
    assert!(Arc::ptr_eq(&model.cache, &cache.downcast::<CacheService>().unwrap()));
    assert!(Arc::ptr_eq(&model.context.request, &request));
    assert_eq!(model.context.route.object(), "blog");
    assert!(Arc::ptr_eq(
        &model.context.configuration,
        dispatcher.registry().configuration()
    ));
}

#[test]
fn test_connector_sees_model_view_and_translation() {
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());
    let mut request = RequestState::new();
    request
        .set_translation_matrix(Translation::from([("title".to_string(), json!("Titel"))]))
        .set_active_route(Route::new("blog", "context"));

    let body = dispatcher
        .create_from_request_state(Arc::new(request))
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(
        body,
        json!({
            "model": "blog-cache",
            "view": true,
            "translation": {"title": "Titel"},
            "route": "/blog/context",
        })
    );
}

#[test]
fn test_missing_model_and_view_are_null() {
    let mut fixture = Fixture::new();
    let presenter = presenter_class("Presenter_Blog", &fixture.trace);
    fixture.classes.register(presenter);
    let (mut dispatcher, trace, _) = fixture.dispatcher(Registry::default());

    let body = dispatcher
        .create_from_request_state(request("context"))
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(body["model"], serde_json::Value::Null);
    assert_eq!(body["view"], false);
    assert!(dispatcher.model().is_none());
    assert!(dispatcher.view().is_none());
    assert!(trace.lock().is_empty());
}

#[test]
fn test_custom_connector_kind() {
    let mut fixture = Fixture::new();
    let controller = presenter_class("Controller_Blog", &fixture.trace);
    fixture.classes.register(controller);
    let (dispatcher, _, _) = fixture.dispatcher(Registry::default());

    let mut dispatcher = dispatcher.with_connector_kind("Controller");
    assert_eq!(dispatcher.connector_kind(), "Controller");
    let response = dispatcher.create_from_request_state(request("plain")).unwrap();
    assert_eq!(response.status, 409);

    let mut fixture = Fixture::new();
    let controller = presenter_class("Controller_Blog", &fixture.trace);
    fixture.classes.register(controller);
    let (mut dispatcher, _, _) = fixture.dispatcher(Registry::default());
    let response = dispatcher.create_from_request_state(request("plain")).unwrap();
    assert_eq!(response.status, 400);
}

#[test]
fn test_view_without_renderer_is_rejected() {
    let mut fixture = Fixture::new();
    fixture
        .classes
        .register(ClassDefinition::build::<CacheService, _>("View_Blog", |_| {
            Ok(CacheService { name: "not a view".to_string() })
        }));
    let (mut dispatcher, _, _) = fixture.dispatcher(Registry::default());

    match dispatcher.create_from_request_state(request("show")) {
        Err(DispatchError::Dependency(DiError::LayerMismatch { class, layer })) => {
            assert_eq!(class, "View_Blog");
            assert_eq!(layer, "view");
        }
        other => panic!("expected layer mismatch, got {:?}", other),
    }
    assert_eq!(dispatcher.state(), DispatchState::Failed);
}

#[test]
fn test_container_errors_propagate() {
    let mut fixture = Fixture::full();
    fixture
        .collection
        .register_dependency("Model_Blog", Dependency::new("ghost", "Ghost"))
        .unwrap();
    let (mut dispatcher, trace, _) = fixture.dispatcher(Registry::default());

    let result = dispatcher.create_from_request_state(request("show"));

    assert!(matches!(
        result,
        Err(DispatchError::Dependency(DiError::UnresolvableDependency(ref name))) if name == "Ghost"
    ));
    assert!(trace.lock().is_empty());
}

#[test]
fn test_each_request_gets_its_own_response() {
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(Registry::default());

    let first = dispatcher.create_from_request_state(request("show")).unwrap();
    let second = dispatcher.create_from_request_state(request("plain")).unwrap();

    assert_eq!(first.status, 200);
    assert_eq!(second.status, 409);
    assert!(!dispatcher.registry().response().is_sent());
}

#[test]
fn test_transitions_and_failures_are_logged() {
    let logger = Arc::new(MemoryLogger::new());
    let registry = Registry::default().with_logger(logger.clone());
    let (mut dispatcher, _, _) = Fixture::full().dispatcher(registry);

    dispatcher.create_from_request_state(request("show")).unwrap();
    assert_eq!(
        logger.messages(),
        vec![
            "Dispatcher: Idle -> RouteExtracted",
            "Dispatcher: RouteExtracted -> LayersBuilt",
            "Dispatcher: LayersBuilt -> Dispatched",
            "Dispatcher: Dispatched -> Responded",
        ]
    );

    logger.clear();
    dispatcher.create_from_request_state(request("plain")).unwrap();
    let warnings: Vec<_> = logger
        .entries()
        .into_iter()
        .filter(|entry| entry.level == Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "Conflict");
    assert_eq!(warnings[0].context["status"], 409);
}

#[test]
fn test_validate_request() {
    let trace = Trace::default();
    let presenter = BlogPresenter {
        context: ConnectorContext::from_arguments(
            &LayerContext::new(Registry::default(), Arc::new(RequestState::new()), Route::new("blog", "show"))
                .connector_arguments(None, None),
        )
        .unwrap(),
        views: ViewSet::new(),
        trace,
    };

    assert_eq!(Dispatcher::validate_request(None, "showAction").status(), Some(400));
    let connector: &dyn Connector = &presenter;
    assert_eq!(Dispatcher::validate_request(Some(connector), "showAction").status(), None);
    assert_eq!(Dispatcher::validate_request(Some(connector), "editAction").status(), Some(404));
}
