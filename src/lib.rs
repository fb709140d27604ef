// Gantry - ordered HTTP request routing and dispatch
//
// This library provides an ordered route table with inferred-separator path
// templates, static file routes, and a per-request dispatcher with language
// and color-scheme negotiation and structured error interception.

// Re-export core functionality
pub use gantry_core::*;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Context,
        Cookie,
        DispatchConfig,
        Error,
        Flow,
        Hooks,
        HttpRequest,
        HttpResponse,
        Json,
        Method,
        RequestDispatcher,
        Route,
        RouteOptions,
        Router,
        StaticOptions,
        StaticRoute,
    };
}
