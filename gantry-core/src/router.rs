// Route table: an append-only, ordered collection of routes
//
// Registration happens during setup, before traffic begins; matching is a
// read-only pass over the backing sequence and preserves insertion order.
// No priority or specificity reordering is performed.

use crate::handler::IntoHandler;
use crate::http::{HttpRequest, Method};
use crate::route::{Route, RouteOptions};
use crate::static_route::{StaticOptions, StaticRoute};
use crate::template::PathParams;
use crate::Error;
use std::path::PathBuf;
use std::sync::Arc;

/// One entry in the route table
#[derive(Clone)]
pub enum RouteEntry {
    Dynamic(Arc<Route>),
    Static(Arc<StaticRoute>),
}

/// A per-request match result. Params are owned by the result, not written
/// back onto the shared route, so concurrent requests never race on them.
#[derive(Clone)]
pub struct RouteMatch {
    pub entry: RouteEntry,
    pub params: PathParams,
}

/// The routing manager: three views over one append-only backing sequence.
#[derive(Default)]
pub struct Router {
    entries: Vec<RouteEntry>,
    dynamic: Vec<usize>,
    statics: Vec<usize>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dynamic route
    pub fn route<H, Args>(
        &mut self,
        method: Method,
        path: &str,
        handler: H,
        options: RouteOptions,
    ) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        let route = Route::new(method, path, crate::handler::handler(handler), options)?;
        self.dynamic.push(self.entries.len());
        self.entries.push(RouteEntry::Dynamic(Arc::new(route)));
        Ok(())
    }

    /// Register a static file route
    pub fn serve_static(
        &mut self,
        root: impl Into<PathBuf>,
        options: StaticOptions,
    ) -> Result<(), Error> {
        let route = StaticRoute::new(root, options)?;
        self.statics.push(self.entries.len());
        self.entries.push(RouteEntry::Static(Arc::new(route)));
        Ok(())
    }

    /// Register a wildcard-method route (mounted middleware)
    pub fn use_<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Use, path, handler, options)
    }

    pub fn get<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Get, path, handler, options)
    }

    pub fn post<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Post, path, handler, options)
    }

    pub fn put<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Put, path, handler, options)
    }

    pub fn delete<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Delete, path, handler, options)
    }

    pub fn patch<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Patch, path, handler, options)
    }

    pub fn head<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Head, path, handler, options)
    }

    pub fn options<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Options, path, handler, options)
    }

    pub fn trace<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Trace, path, handler, options)
    }

    pub fn connect<H, Args>(&mut self, path: &str, handler: H, options: RouteOptions) -> Result<(), Error>
    where
        H: IntoHandler<Args>,
    {
        self.route(Method::Connect, path, handler, options)
    }

    /// Number of registered routes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dynamic routes, in registration order
    pub fn dynamic_routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.dynamic.iter().filter_map(|&i| match &self.entries[i] {
            RouteEntry::Dynamic(route) => Some(route),
            RouteEntry::Static(_) => None,
        })
    }

    /// Static routes, in registration order
    pub fn static_routes(&self) -> impl Iterator<Item = &Arc<StaticRoute>> {
        self.statics.iter().filter_map(|&i| match &self.entries[i] {
            RouteEntry::Static(route) => Some(route),
            RouteEntry::Dynamic(_) => None,
        })
    }

    /// Collect the routes matching a request, in insertion order. Matching
    /// is total: it never fails, it only returns an empty or non-empty list.
    pub fn match_request(&self, request: &HttpRequest) -> Vec<RouteMatch> {
        let mut matches = Vec::new();
        for entry in &self.entries {
            match entry {
                RouteEntry::Dynamic(route) => {
                    if let Some(params) = route.matches(request) {
                        matches.push(RouteMatch {
                            entry: entry.clone(),
                            params,
                        });
                    }
                }
                RouteEntry::Static(route) => {
                    if route.matches(request) {
                        matches.push(RouteMatch {
                            entry: entry.clone(),
                            params: PathParams::new(),
                        });
                    }
                }
            }
        }
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::Flow;
    use crate::Context;

    fn continue_handler() -> impl Fn(Context) -> std::future::Ready<Result<Flow, Error>> + Clone {
        |ctx: Context| std::future::ready(Ok(Flow::Continue(ctx)))
    }

    fn temp_root(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gantry-router-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut router = Router::new();
        router.get("/users/<:id>", continue_handler(), RouteOptions::default()).unwrap();
        router.use_("*", continue_handler(), RouteOptions::default()).unwrap();
        router.get("/users/42", continue_handler(), RouteOptions::default()).unwrap();

        let request = HttpRequest::new(Method::Get, "/users/42");
        let matches = router.match_request(&request);
        assert_eq!(matches.len(), 3);

        let raw_paths: Vec<&str> = matches
            .iter()
            .map(|m| match &m.entry {
                RouteEntry::Dynamic(route) => route.template().raw(),
                RouteEntry::Static(_) => unreachable!(),
            })
            .collect();
        assert_eq!(raw_paths, vec!["/users/<:id>", "*", "/users/42"]);
    }

    #[test]
    fn test_method_filter_in_match() {
        let mut router = Router::new();
        router.get("/a", continue_handler(), RouteOptions::default()).unwrap();
        router.post("/a", continue_handler(), RouteOptions::default()).unwrap();

        let matches = router.match_request(&HttpRequest::new(Method::Post, "/a"));
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_params_threaded_through_match() {
        let mut router = Router::new();
        router.get("/users/<:id>", continue_handler(), RouteOptions::default()).unwrap();

        let matches = router.match_request(&HttpRequest::new(Method::Get, "/users/42"));
        assert_eq!(matches[0].params.get("id").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_match_is_idempotent() {
        let mut router = Router::new();
        router.get("/users/<:id>", continue_handler(), RouteOptions::default()).unwrap();
        router.use_("*", continue_handler(), RouteOptions::default()).unwrap();

        let request = HttpRequest::new(Method::Get, "/users/42");
        let first = router.match_request(&request);
        let second = router.match_request(&request);
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            match (&a.entry, &b.entry) {
                (RouteEntry::Dynamic(x), RouteEntry::Dynamic(y)) => {
                    assert!(Arc::ptr_eq(x, y));
                }
                _ => panic!("expected the same dynamic entries"),
            }
            assert_eq!(a.params, b.params);
        }
    }

    #[test]
    fn test_views_classify_by_kind() {
        let mut router = Router::new();
        let root = temp_root("views");
        router.get("/a", continue_handler(), RouteOptions::default()).unwrap();
        router.serve_static(&root, StaticOptions::default().path("/assets")).unwrap();
        router.get("/b", continue_handler(), RouteOptions::default()).unwrap();

        assert_eq!(router.len(), 3);
        assert_eq!(router.dynamic_routes().count(), 2);
        assert_eq!(router.static_routes().count(), 1);
    }

    #[test]
    fn test_static_match_requires_prefix() {
        let mut router = Router::new();
        let root = temp_root("static-prefix");
        router.serve_static(&root, StaticOptions::default().path("/assets")).unwrap();

        assert_eq!(
            router.match_request(&HttpRequest::new(Method::Get, "/assets/app.css")).len(),
            1
        );
        assert!(router.match_request(&HttpRequest::new(Method::Get, "/css/app.css")).is_empty());
    }

    #[test]
    fn test_no_match_returns_empty() {
        let mut router = Router::new();
        router.get("/only", continue_handler(), RouteOptions::default()).unwrap();
        assert!(router.match_request(&HttpRequest::new(Method::Get, "/other")).is_empty());
    }

    #[test]
    fn test_registration_error_propagates() {
        let mut router = Router::new();
        let result = router.get("/broken/<:id", continue_handler(), RouteOptions::default());
        assert!(result.is_err());
        assert!(router.is_empty());
    }
}
