// Dynamic route definition and match predicates

use crate::error::RouteInfo;
use crate::handler::BoxedHandler;
use crate::http::{HttpRequest, Method};
use crate::template::{split_segments, PathParams, PathTemplate};
use crate::Error;

/// Subdomain scope of a route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubDomain {
    /// `"*"` — matches any subdomain
    Any,
    Exact(String),
}

impl SubDomain {
    pub fn parse(raw: &str) -> Self {
        if raw == "*" {
            SubDomain::Any
        } else {
            SubDomain::Exact(raw.to_string())
        }
    }

    pub fn matches(&self, requested: &str, case_sensitive: bool) -> bool {
        match self {
            SubDomain::Any => true,
            SubDomain::Exact(expected) if case_sensitive => expected == requested,
            SubDomain::Exact(expected) => expected.eq_ignore_ascii_case(requested),
        }
    }
}

impl Default for SubDomain {
    fn default() -> Self {
        SubDomain::Any
    }
}

/// Options accepted by the route registration API
#[derive(Debug, Clone)]
pub struct RouteOptions {
    pub case_sensitive: bool,
    pub sub_domain: SubDomain,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            sub_domain: SubDomain::Any,
        }
    }
}

impl RouteOptions {
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn sub_domain(mut self, sub_domain: impl Into<String>) -> Self {
        self.sub_domain = SubDomain::parse(&sub_domain.into());
        self
    }
}

/// A registered dynamic endpoint. Immutable after construction; matching
/// returns captured params by value instead of writing them back here.
pub struct Route {
    method: Method,
    template: PathTemplate,
    sub_domain: SubDomain,
    case_sensitive: bool,
    handler: BoxedHandler,
}

impl Route {
    pub fn new(
        method: Method,
        path: &str,
        handler: BoxedHandler,
        options: RouteOptions,
    ) -> Result<Self, Error> {
        let template = PathTemplate::parse(path)?;
        Ok(Self {
            method,
            template,
            sub_domain: options.sub_domain,
            case_sensitive: options.case_sensitive,
            handler,
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    pub fn handler(&self) -> BoxedHandler {
        self.handler.clone()
    }

    /// Route description for error reporting and logs
    pub fn describe(&self) -> RouteInfo {
        RouteInfo {
            method: self.method.as_str().to_string(),
            path: self.template.raw().to_string(),
        }
    }

    /// Full match predicate: method, then subdomain, then path. Returns the
    /// captured params on success.
    pub fn matches(&self, request: &HttpRequest) -> Option<PathParams> {
        if !self.method.accepts(request.method) {
            return None;
        }
        if !self
            .sub_domain
            .matches(&request.sub_domain, self.case_sensitive)
        {
            return None;
        }
        let segments = split_segments(&request.path);
        self.template.capture(&segments, self.case_sensitive)
    }
}
