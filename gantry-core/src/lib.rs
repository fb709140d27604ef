//! Gantry core: HTTP request routing and dispatch.
//!
//! The crate is organized around three stages:
//!
//! 1. **Registration** — [`Router`] collects [`Route`]s and
//!    [`StaticRoute`]s in order, before traffic begins.
//! 2. **Matching** — [`Router::match_request`] collects every entry that
//!    matches a request, preserving insertion order.
//! 3. **Dispatch** — a per-request [`RequestDispatcher`] prepends the
//!    framework pre-routes (sessions, language, color scheme, logging) and
//!    drives the chain to a terminal [`HttpResponse`].
//!
//! Handlers receive a [`Context`] and return [`Flow::Continue`] to pass
//! control onward or [`Flow::Respond`] to end the request.

pub mod config;
pub mod context;
pub mod cookie;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http;
pub mod logging;
pub mod route;
pub mod router;
pub mod static_route;
pub mod status;
pub mod template;

pub use config::{ColorSchemeCookie, DispatchConfig, LanguageConfig};
pub use context::{ColorScheme, Context};
pub use cookie::{Cookie, Priority};
pub use dispatcher::{ErrorHook, Hooks, RequestDispatcher, RequestHook};
pub use error::{Error, HttpError, RequestSnapshot, RouteInfo};
pub use handler::{handler, BoxedHandler, Flow, Handler, IntoHandler};
pub use http::{HttpRequest, HttpResponse, Json, Method, UserInfo};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput, Rotation};
pub use route::{Route, RouteOptions, SubDomain};
pub use router::{RouteEntry, RouteMatch, Router};
pub use static_route::{CacheStrategy, Dotfiles, StaticOptions, StaticRoute};
pub use status::HttpStatus;
pub use template::{PathParams, PathTemplate};
