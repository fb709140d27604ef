//! Integration tests for common Gantry workflows.
//!
//! These run the whole pipeline: register routes on a [`Router`], match an
//! incoming request, and drive a [`RequestDispatcher`] to a terminal
//! response.

use gantry::prelude::*;
use gantry::{Dotfiles, ErrorHook, HttpError, RequestHook, UserInfo};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

fn temp_site(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("gantry-it-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(dir.join("css")).unwrap();
    std::fs::write(dir.join("css").join("site.css"), b"body{margin:0}").unwrap();
    std::fs::write(dir.join(".htpasswd"), b"nope").unwrap();
    dir
}

async fn dispatch(router: &Router, request: HttpRequest) -> HttpResponse {
    dispatch_with(router, request, DispatchConfig::default(), Hooks::default()).await
}

async fn dispatch_with(
    router: &Router,
    request: HttpRequest,
    config: DispatchConfig,
    hooks: Hooks,
) -> HttpResponse {
    let matches = router.match_request(&request);
    RequestDispatcher::new(matches, Arc::new(config), Arc::new(hooks))
        .run(request)
        .await
}

// =============================================================================
// Routing and dispatch
// =============================================================================

#[tokio::test]
async fn test_rest_style_routing() {
    let mut router = Router::new();
    router
        .get(
            "/api/users/<:id>",
            |ctx: Context| async move {
                let id = ctx.param("id").cloned().unwrap_or_default();
                let body = serde_json::json!({ "id": id });
                let response = HttpResponse::ok().with_json(&body)?;
                Ok(Flow::Respond(ctx, response))
            },
            RouteOptions::default(),
        )
        .unwrap();
    router
        .post(
            "/api/users",
            |ctx: Context| async move { Ok(Flow::Respond(ctx, HttpResponse::new(201))) },
            RouteOptions::default(),
        )
        .unwrap();

    let response = dispatch(&router, HttpRequest::new(Method::Get, "/api/users/42")).await;
    assert_eq!(response.status, 200);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["id"], "42");

    let response = dispatch(&router, HttpRequest::new(Method::Post, "/api/users")).await;
    assert_eq!(response.status, 201);

    // No route for DELETE: built-in not-found fallback
    let response = dispatch(&router, HttpRequest::new(Method::Delete, "/api/users/42")).await;
    assert_eq!(response.status, 404);
}

#[tokio::test]
async fn test_middleware_then_handler() {
    let mut router = Router::new();
    router
        .use_(
            "*",
            |mut ctx: Context| async move {
                ctx.set_cookie(Cookie::new("seen", "1"));
                Ok(Flow::Continue(ctx))
            },
            RouteOptions::default(),
        )
        .unwrap();
    router
        .get(
            "/page",
            |ctx: Context| async move { Ok(Flow::Respond(ctx, HttpResponse::ok())) },
            RouteOptions::default(),
        )
        .unwrap();

    let response = dispatch(&router, HttpRequest::new(Method::Get, "/page")).await;
    assert_eq!(response.status, 200);
    // Cookies queued by earlier entries survive onto the terminal response
    assert!(response.cookies.iter().any(|c| c.name == "seen"));
}

#[tokio::test]
async fn test_multi_placeholder_capture() {
    let mut router = Router::new();
    router
        .get(
            "/files/<:name>.<:ext>",
            |ctx: Context| async move {
                let name = ctx.param("name").cloned().unwrap_or_default();
                let ext = ctx.param("ext").cloned().unwrap_or_default();
                let body = format!("{name}/{ext}").into_bytes();
                Ok(Flow::Respond(ctx, HttpResponse::ok().with_body(body)))
            },
            RouteOptions::default(),
        )
        .unwrap();

    let response = dispatch(&router, HttpRequest::new(Method::Get, "/files/report.pdf")).await;
    assert_eq!(response.body, b"report/pdf".to_vec());
}

#[tokio::test]
async fn test_sub_domain_scoping() {
    let mut router = Router::new();
    router
        .get(
            "/health",
            |ctx: Context| async move {
                Ok(Flow::Respond(ctx, HttpResponse::ok().with_body(b"api".to_vec())))
            },
            RouteOptions::default().sub_domain("api"),
        )
        .unwrap();

    let hit = HttpRequest::new(Method::Get, "/health").with_sub_domain("api");
    assert_eq!(dispatch(&router, hit).await.status, 200);

    let miss = HttpRequest::new(Method::Get, "/health").with_sub_domain("www");
    assert_eq!(dispatch(&router, miss).await.status, 404);
}

// =============================================================================
// Static files through the dispatcher
// =============================================================================

#[tokio::test]
async fn test_static_serving_end_to_end() {
    let root = temp_site("serving");
    let mut router = Router::new();
    router
        .serve_static(&root, StaticOptions::default().path("/assets"))
        .unwrap();

    let response = dispatch(&router, HttpRequest::new(Method::Get, "/assets/css/site.css")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body, b"body{margin:0}".to_vec());
    assert_eq!(response.headers.get("Content-Type").map(String::as_str), Some("text/css"));
    assert!(response.headers.contains_key("Cache-Control"));
}

#[tokio::test]
async fn test_static_miss_falls_through_to_dynamic() {
    let root = temp_site("fallthrough");
    let mut router = Router::new();
    router
        .serve_static(&root, StaticOptions::default().path("/assets"))
        .unwrap();
    router
        .get(
            "/assets/generated.css",
            |ctx: Context| async move {
                Ok(Flow::Respond(ctx, HttpResponse::ok().with_body(b"generated".to_vec())))
            },
            RouteOptions::default(),
        )
        .unwrap();

    // Not on disk, so the static entry continues and the dynamic one answers
    let response = dispatch(&router, HttpRequest::new(Method::Get, "/assets/generated.css")).await;
    assert_eq!(response.body, b"generated".to_vec());
}

#[tokio::test]
async fn test_static_dotfile_deny_end_to_end() {
    let root = temp_site("dotdeny");
    let mut router = Router::new();
    router
        .serve_static(
            &root,
            StaticOptions::default().path("/assets").dotfiles(Dotfiles::Deny),
        )
        .unwrap();

    let response = dispatch(&router, HttpRequest::new(Method::Get, "/assets/.htpasswd")).await;
    assert_eq!(response.status, 401);
}

// =============================================================================
// Negotiation pre-routes
// =============================================================================

#[tokio::test]
async fn test_language_negotiation_full_cycle() {
    let mut router = Router::new();
    router
        .get(
            "/greet",
            |ctx: Context| async move {
                let language = ctx.language.clone();
                Ok(Flow::Respond(ctx, HttpResponse::ok().with_body(language.into_bytes())))
            },
            RouteOptions::default(),
        )
        .unwrap();
    let config = || DispatchConfig::new().with_supported_languages(["en", "de"]);

    // 1. Explicit query override: redirect with persisted cookie
    let response = dispatch_with(
        &router,
        HttpRequest::new(Method::Get, "/greet?lang=de"),
        config(),
        Hooks::default(),
    )
    .await;
    assert_eq!(response.status, 302);
    assert_eq!(response.headers.get("Location").map(String::as_str), Some("/greet"));
    assert!(response.cookies.iter().any(|c| c.name == "language" && c.value == "de"));

    // 2. Follow-up request carries the cookie and is served in German
    let response = dispatch_with(
        &router,
        HttpRequest::new(Method::Get, "/greet").with_cookie("language", "de"),
        config(),
        Hooks::default(),
    )
    .await;
    assert_eq!(response.body, b"de".to_vec());

    // 3. Nothing set: Accept-Language, then the default
    let response = dispatch_with(
        &router,
        HttpRequest::new(Method::Get, "/greet").with_header("Accept-Language", "de-CH"),
        config(),
        Hooks::default(),
    )
    .await;
    assert_eq!(response.body, b"de".to_vec());

    let response =
        dispatch_with(&router, HttpRequest::new(Method::Get, "/greet"), config(), Hooks::default())
            .await;
    assert_eq!(response.body, b"en".to_vec());
}

#[tokio::test]
async fn test_color_scheme_negotiation() {
    let mut router = Router::new();
    router
        .get(
            "/page",
            |ctx: Context| async move {
                let scheme = ctx.color_scheme.as_str();
                Ok(Flow::Respond(ctx, HttpResponse::ok().with_header("X-Scheme", scheme)))
            },
            RouteOptions::default(),
        )
        .unwrap();

    // First visit: cookie written back
    let response = dispatch(&router, HttpRequest::new(Method::Get, "/page")).await;
    assert_eq!(response.headers.get("X-Scheme").map(String::as_str), Some("Default"));
    assert!(response.cookies.iter().any(|c| c.name == "colorScheme"));

    // Returning visitor with a valid cookie keeps their scheme
    let response = dispatch(
        &router,
        HttpRequest::new(Method::Get, "/page").with_cookie("colorScheme", "Light"),
    )
    .await;
    assert_eq!(response.headers.get("X-Scheme").map(String::as_str), Some("Light"));
    assert!(!response.cookies.iter().any(|c| c.name == "colorScheme"));
}

// =============================================================================
// Error interception
// =============================================================================

struct ErrorPage {
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ErrorHook for ErrorPage {
    async fn catch(&self, error: &HttpError, ctx: Context) -> Result<Flow, gantry::Error> {
        if let Some(route) = &error.route {
            self.seen.lock().unwrap().push(format!("{} {}", route.method, route.path));
        }
        let response = HttpResponse::new(error.error.status_code())
            .with_json(&error.to_json())?;
        Ok(Flow::Respond(ctx, response))
    }
}

#[tokio::test]
async fn test_error_hook_sees_route_and_request() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut router = Router::new();
    router
        .get(
            "/users/<:id>",
            |ctx: Context| async move {
                let id = ctx.param("id").cloned().unwrap_or_default();
                Err::<Flow, _>(gantry::Error::NotFound(format!("no user {id}")))
            },
            RouteOptions::default(),
        )
        .unwrap();

    let hooks = Hooks::new().with_error_handler(ErrorPage { seen: seen.clone() });
    let response = dispatch_with(
        &router,
        HttpRequest::new(Method::Get, "/users/7"),
        DispatchConfig::default(),
        hooks,
    )
    .await;

    assert_eq!(response.status, 404);
    let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body["request"]["path"], "/users/7");
    assert!(body["message"].as_str().unwrap().contains("no user 7"));
    assert_eq!(*seen.lock().unwrap(), vec!["GET /users/<:id>"]);
}

struct PassThrough;

#[async_trait]
impl ErrorHook for PassThrough {
    async fn catch(&self, _error: &HttpError, ctx: Context) -> Result<Flow, gantry::Error> {
        Ok(Flow::Continue(ctx))
    }
}

#[tokio::test]
async fn test_error_hook_may_continue_to_later_routes() {
    let mut router = Router::new();
    router
        .get(
            "/flaky",
            |_ctx: Context| async move {
                Err::<Flow, _>(gantry::Error::Internal("first attempt".into()))
            },
            RouteOptions::default(),
        )
        .unwrap();
    router
        .get(
            "/flaky",
            |ctx: Context| async move {
                Ok(Flow::Respond(ctx, HttpResponse::ok().with_body(b"recovered".to_vec())))
            },
            RouteOptions::default(),
        )
        .unwrap();

    let hooks = Hooks::new().with_error_handler(PassThrough);
    let response = dispatch_with(
        &router,
        HttpRequest::new(Method::Get, "/flaky"),
        DispatchConfig::default(),
        hooks,
    )
    .await;
    assert_eq!(response.body, b"recovered".to_vec());
}

// =============================================================================
// Session and logging hooks
// =============================================================================

struct SessionLoader;

#[async_trait]
impl RequestHook for SessionLoader {
    async fn handle(&self, mut ctx: Context) -> Result<Flow, gantry::Error> {
        if ctx.request.cookie("session").map(String::as_str) == Some("valid") {
            ctx.request.user = Some(UserInfo {
                id: "u1".to_string(),
                language: None,
            });
        }
        Ok(Flow::Continue(ctx))
    }
}

#[tokio::test]
async fn test_session_hook_populates_user() {
    let mut router = Router::new();
    router
        .get(
            "/me",
            |ctx: Context| async move {
                let response = match &ctx.request.user {
                    Some(user) => HttpResponse::ok().with_body(user.id.clone().into_bytes()),
                    None => HttpResponse::unauthorized_page(),
                };
                Ok(Flow::Respond(ctx, response))
            },
            RouteOptions::default(),
        )
        .unwrap();

    let hooks = Hooks::new().with_sessions(SessionLoader);
    let response = dispatch_with(
        &router,
        HttpRequest::new(Method::Get, "/me").with_cookie("session", "valid"),
        DispatchConfig::default(),
        hooks,
    )
    .await;
    assert_eq!(response.body, b"u1".to_vec());

    let hooks = Hooks::new().with_sessions(SessionLoader);
    let response = dispatch_with(
        &router,
        HttpRequest::new(Method::Get, "/me"),
        DispatchConfig::default(),
        hooks,
    )
    .await;
    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn test_default_logging_assigns_request_id() {
    let mut router = Router::new();
    router
        .get(
            "/page",
            |ctx: Context| async move {
                let id = ctx.request_id.clone().unwrap_or_default();
                Ok(Flow::Respond(ctx, HttpResponse::ok().with_header("X-Request-Id", id)))
            },
            RouteOptions::default(),
        )
        .unwrap();

    let response = dispatch(&router, HttpRequest::new(Method::Get, "/page")).await;
    let id = response.headers.get("X-Request-Id").cloned().unwrap_or_default();
    assert!(!id.is_empty());
}
