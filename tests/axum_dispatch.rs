#![cfg(feature = "axum-integration")]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use ferrous_dispatch::axum_integration::create_app_with_dispatcher;
use ferrous_dispatch::{
    ActionResult, ActionTable, ClassDefinition, ClassRegistry, Connector, ConnectorContext,
    DependencyCollection, Registry, Renderer, RestPresenterError, ViewSet,
};
use std::sync::Arc;
use tower::ServiceExt;

struct BlogPresenter {
    context: ConnectorContext,
    views: ViewSet,
}

impl BlogPresenter {
    fn actions() -> ActionTable<Self> {
        ActionTable::new()
            .action("showAction", |p: &mut Self| {
                let id = p.context.route.params().first().cloned().unwrap_or_default();
                p.context.response().send_html(format!("<h1>Post {}</h1>", id));
                Ok(())
            })
            .action("saveAction", |p: &mut Self| {
                let title = p.context.request.body().and_then(|body| body["title"].as_str());
                match title {
                    Some(title) => {
                        p.context.response().send_json(&serde_json::json!({"saved": title}), 201);
                        Ok(())
                    }
                    None => Err(RestPresenterError::new(422, "title missing").into()),
                }
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
        self.views.attach(view);
    }
}

fn app() -> axum::Router {
    let mut classes = ClassRegistry::new();
    classes.register(
        ClassDefinition::build::<BlogPresenter, _>("Presenter_Blog", |args| {
            Ok(BlogPresenter {
                context: ConnectorContext::from_arguments(args)?,
                views: ViewSet::new(),
            })
        })
        .connector(),
    );
    let container = Arc::new(DependencyCollection::new().build(Arc::new(classes)));
    create_app_with_dispatcher(Registry::default(), container, |router| {
        router.route("/health", get(|| async { "ok" }))
    })
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_dispatches_route_from_path() {
    let response = app()
        .oneshot(Request::builder().uri("/blog/show/42").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/html; charset=UTF-8"
    );
    assert_eq!(body_string(response).await, "<h1>Post 42</h1>");
}

#[tokio::test]
async fn test_json_body_reaches_action() {
    let response = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/blog/save")
                .header("Accept", "application/json")
                .body(Body::from(r#"{"title":"Hello"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_string(response).await, r#"{"saved":"Hello"}"#);
}

#[tokio::test]
async fn test_rest_error_becomes_envelope() {
    let response = app()
        .oneshot(Request::builder().method("POST").uri("/blog/save").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_string(response).await, r#"{"error":["title missing"]}"#);
}

#[tokio::test]
async fn test_unknown_routes() {
    let missing_action = app()
        .oneshot(Request::builder().uri("/blog/edit").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing_action.status(), StatusCode::NOT_FOUND);

    let missing_presenter = app()
        .oneshot(Request::builder().uri("/news/show").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing_presenter.status(), StatusCode::BAD_REQUEST);

    let no_route = app()
        .oneshot(Request::builder().uri("/blog").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(no_route.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_body_and_explicit_routes() {
    let invalid = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/blog/save")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

    let health = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(body_string(health).await, "ok");
}
