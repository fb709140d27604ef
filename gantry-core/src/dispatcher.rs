// Per-request dispatch engine
//
// One dispatcher is built per incoming request. It prepends the four
// framework pre-routes (sessions, language, color scheme, logging) to the
// matched route list, then walks the combined list with a monotonic cursor.
// A handler hands control onward by returning `Flow::Continue` and
// terminates the request with `Flow::Respond`; a handler error splices a
// one-shot error entry immediately after the cursor. Cursor exhaustion ends
// the request with the built-in not-found page.

use crate::config::DispatchConfig;
use crate::context::{ColorScheme, Context};
use crate::cookie::{Cookie, Priority};
use crate::error::{HttpError, RequestSnapshot, RouteInfo};
use crate::handler::{handler, BoxedHandler, Flow};
use crate::http::{HttpRequest, HttpResponse};
use crate::router::{RouteEntry, RouteMatch};
use crate::template::PathParams;
use crate::Error;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// User-registered hook invoked as a pre-route (sessions, logging).
#[async_trait]
pub trait RequestHook: Send + Sync {
    async fn handle(&self, ctx: Context) -> Result<Flow, Error>;
}

/// User-registered handler for dispatch errors.
#[async_trait]
pub trait ErrorHook: Send + Sync {
    async fn catch(&self, error: &HttpError, ctx: Context) -> Result<Flow, Error>;
}

/// Application hooks consulted by the synthesized pre-routes and the
/// spliced error route.
#[derive(Default, Clone)]
pub struct Hooks {
    pub sessions: Option<Arc<dyn RequestHook>>,
    pub logger: Option<Arc<dyn RequestHook>>,
    pub on_http_error: Option<Arc<dyn ErrorHook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(mut self, hook: impl RequestHook + 'static) -> Self {
        self.sessions = Some(Arc::new(hook));
        self
    }

    pub fn with_logger(mut self, hook: impl RequestHook + 'static) -> Self {
        self.logger = Some(Arc::new(hook));
        self
    }

    pub fn with_error_handler(mut self, hook: impl ErrorHook + 'static) -> Self {
        self.on_http_error = Some(Arc::new(hook));
        self
    }
}

struct DispatchEntry {
    label: &'static str,
    route: Option<RouteInfo>,
    handler: BoxedHandler,
    params: PathParams,
}

impl DispatchEntry {
    fn from_match(matched: RouteMatch) -> Self {
        match matched.entry {
            RouteEntry::Dynamic(route) => Self {
                label: "route",
                route: Some(route.describe()),
                handler: route.handler(),
                params: matched.params,
            },
            RouteEntry::Static(route) => Self {
                label: "static",
                route: Some(route.describe()),
                handler: route.handler(),
                params: PathParams::new(),
            },
        }
    }
}

/// The per-request routes manager.
pub struct RequestDispatcher {
    entries: Vec<DispatchEntry>,
    cursor: usize,
    hooks: Arc<Hooks>,
}

impl RequestDispatcher {
    /// Build the request-scoped entry list: four synthesized pre-routes,
    /// then the matched routes in insertion order.
    pub fn new(matches: Vec<RouteMatch>, config: Arc<DispatchConfig>, hooks: Arc<Hooks>) -> Self {
        let mut entries = Vec::with_capacity(matches.len() + 4);
        entries.push(session_entry(hooks.clone()));
        entries.push(language_entry(config.clone()));
        entries.push(color_scheme_entry(config));
        entries.push(logging_entry(hooks.clone()));
        entries.extend(matches.into_iter().map(DispatchEntry::from_match));

        Self {
            entries,
            cursor: 0,
            hooks,
        }
    }

    /// Drive the chain to a terminal response.
    pub async fn run(mut self, request: HttpRequest) -> HttpResponse {
        let snapshot = RequestSnapshot::of(&request);
        let mut ctx = Context::new(request);

        loop {
            let Some(entry) = self.entries.get(self.cursor) else {
                debug!(
                    path = %snapshot.path,
                    entries = self.entries.len(),
                    "dispatch chain exhausted, serving not found"
                );
                return finalize(HttpResponse::not_found_page(), ctx.pending_cookies);
            };

            let invoked = entry.handler.clone();
            let route = entry.route.clone();
            let label = entry.label;
            ctx.params = entry.params.clone();

            // A failing handler takes the context down with it; keep a
            // checkpoint so accumulated state (pending cookies, negotiated
            // language, session user) survives onto the error route.
            let checkpoint = ctx.clone();

            match invoked.call(ctx).await {
                Ok(Flow::Continue(next)) => {
                    ctx = next;
                    self.cursor += 1;
                }
                Ok(Flow::Respond(done, response)) => {
                    return finalize(response, done.pending_cookies);
                }
                Err(err) => {
                    error!(
                        entry = label,
                        error = %err,
                        path = %snapshot.path,
                        "handler failed, splicing error route"
                    );
                    let http_error = HttpError::new(err, route, snapshot.clone());
                    let entry = self.error_entry(http_error);
                    self.entries.insert(self.cursor + 1, entry);
                    ctx = checkpoint;
                    self.cursor += 1;
                }
            }
        }
    }

    /// One-shot entry spliced after a handler failure. Delegates to the
    /// registered error hook, falling back to the built-in 500 page when
    /// the hook is absent or itself fails.
    fn error_entry(&self, http_error: HttpError) -> DispatchEntry {
        let http_error = Arc::new(http_error);
        let hooks = self.hooks.clone();
        let handler = handler(move |ctx: Context| {
            let http_error = http_error.clone();
            let hooks = hooks.clone();
            async move {
                match &hooks.on_http_error {
                    Some(hook) => {
                        let fallback = ctx.clone();
                        match hook.catch(&http_error, ctx).await {
                            Ok(flow) => Ok(flow),
                            Err(hook_error) => {
                                error!(
                                    error = %hook_error,
                                    original = %http_error,
                                    "error hook failed, serving built-in 500"
                                );
                                Ok(Flow::Respond(fallback, HttpResponse::server_error_page()))
                            }
                        }
                    }
                    None => Ok(Flow::Respond(ctx, HttpResponse::server_error_page())),
                }
            }
        });

        DispatchEntry {
            label: "error",
            route: None,
            handler,
            params: PathParams::new(),
        }
    }
}

/// Apply cookies queued in the context to the terminal response.
fn finalize(mut response: HttpResponse, pending: Vec<Cookie>) -> HttpResponse {
    response.cookies.extend(pending);
    response
}

fn session_entry(hooks: Arc<Hooks>) -> DispatchEntry {
    let handler = handler(move |ctx: Context| {
        let hooks = hooks.clone();
        async move {
            match &hooks.sessions {
                Some(hook) => hook.handle(ctx).await,
                None => Ok(Flow::Continue(ctx)),
            }
        }
    });
    DispatchEntry {
        label: "sessions",
        route: None,
        handler,
        params: PathParams::new(),
    }
}

fn language_entry(config: Arc<DispatchConfig>) -> DispatchEntry {
    let handler = handler(move |ctx: Context| {
        let config = config.clone();
        async move { negotiate_language(&config, ctx) }
    });
    DispatchEntry {
        label: "language",
        route: None,
        handler,
        params: PathParams::new(),
    }
}

fn color_scheme_entry(config: Arc<DispatchConfig>) -> DispatchEntry {
    let handler = handler(move |ctx: Context| {
        let config = config.clone();
        async move { negotiate_color_scheme(&config, ctx) }
    });
    DispatchEntry {
        label: "color-scheme",
        route: None,
        handler,
        params: PathParams::new(),
    }
}

fn logging_entry(hooks: Arc<Hooks>) -> DispatchEntry {
    let handler = handler(move |ctx: Context| {
        let hooks = hooks.clone();
        async move {
            match &hooks.logger {
                Some(hook) => hook.handle(ctx).await,
                None => log_request(ctx),
            }
        }
    });
    DispatchEntry {
        label: "logging",
        route: None,
        handler,
        params: PathParams::new(),
    }
}

/// Resolve the request language by source priority: the authenticated
/// user's stored preference, an explicit query override (which persists a
/// cookie and redirects, terminally), the language cookie, the
/// Accept-Language primary subtag, then the configured default. A source
/// only wins when its candidate is in the supported set.
fn negotiate_language(config: &DispatchConfig, mut ctx: Context) -> Result<Flow, Error> {
    let language = &config.language;

    if language.from_user {
        if let Some(preferred) = ctx.request.user.as_ref().and_then(|user| user.language.clone()) {
            if language.is_supported(&preferred) {
                ctx.language = preferred;
                return Ok(Flow::Continue(ctx));
            }
        }
    }

    if language.from_query {
        if let Some(requested) = ctx.request.query(&language.query_param).cloned() {
            if language.is_supported(&requested) {
                let location = strip_query_param(&ctx.request, &language.query_param);
                ctx.set_cookie(
                    Cookie::new(&language.cookie_name, &requested).with_priority(Priority::Medium),
                );
                debug!(language = %requested, location = %location, "language override, redirecting");
                return Ok(Flow::Respond(ctx, HttpResponse::redirect(location)));
            }
        }
    }

    if language.from_cookie {
        if let Some(stored) = ctx.request.cookie(&language.cookie_name).cloned() {
            if language.is_supported(&stored) {
                ctx.language = stored;
                return Ok(Flow::Continue(ctx));
            }
        }
    }

    if language.from_header {
        if let Some(primary) = ctx.request.header("accept-language").and_then(primary_subtag) {
            if language.is_supported(&primary) {
                ctx.language = primary;
                return Ok(Flow::Continue(ctx));
            }
        }
    }

    ctx.language = language.default.clone();
    Ok(Flow::Continue(ctx))
}

/// Primary language subtag of an Accept-Language header value:
/// `de-DE,de;q=0.9` yields `de`.
fn primary_subtag(header: &str) -> Option<String> {
    let first = header.split(',').next()?.trim();
    let tag = first.split(';').next()?.trim();
    let primary = tag.split('-').next()?.trim();
    if primary.is_empty() {
        None
    } else {
        Some(primary.to_string())
    }
}

/// Rebuild the request target with one query parameter removed.
fn strip_query_param(request: &HttpRequest, param: &str) -> String {
    let kept: Vec<&str> = request
        .query_string
        .as_deref()
        .unwrap_or("")
        .split('&')
        .filter(|part| !part.is_empty())
        .filter(|part| part.splitn(2, '=').next() != Some(param))
        .collect();

    if kept.is_empty() {
        request.path.clone()
    } else {
        format!("{}?{}", request.path, kept.join("&"))
    }
}

/// Adopt a valid `colorScheme` cookie; anything else (including a missing
/// cookie) writes the default value back. Always continues.
fn negotiate_color_scheme(config: &DispatchConfig, mut ctx: Context) -> Result<Flow, Error> {
    let cookie_name = &config.color_scheme_cookie.name;
    match ctx.request.cookie(cookie_name).and_then(|raw| raw.parse::<ColorScheme>().ok()) {
        Some(scheme) => {
            ctx.color_scheme = scheme;
        }
        None => {
            ctx.color_scheme = ColorScheme::default();
            ctx.set_cookie(
                Cookie::new(cookie_name, ColorScheme::default().as_str())
                    .with_priority(Priority::Medium),
            );
        }
    }
    Ok(Flow::Continue(ctx))
}

/// Default logging pre-route: assign a request id and emit the request line.
fn log_request(mut ctx: Context) -> Result<Flow, Error> {
    let request_id = Uuid::new_v4().to_string();
    info!(
        request_id = %request_id,
        method = %ctx.request.method,
        path = %ctx.request.path,
        sub_domain = %ctx.request.sub_domain,
        language = %ctx.language,
        "request received"
    );
    ctx.request_id = Some(request_id);
    Ok(Flow::Continue(ctx))
}
