// HTTP request and response types

use crate::cookie::Cookie;
use crate::HttpStatus;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// HTTP method, including the `Use` wildcard sentinel that matches any
/// request method (framework pre-routes and mounted middleware use it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Trace,
    Connect,
    Use,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
            Method::Connect => "CONNECT",
            Method::Use => "USE",
        }
    }

    /// Method filter predicate: `Use` accepts any request method.
    pub fn accepts(&self, requested: Method) -> bool {
        *self == Method::Use || *self == requested
    }
}

impl FromStr for Method {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            "CONNECT" => Ok(Method::Connect),
            "USE" => Ok(Method::Use),
            other => Err(crate::Error::BadRequest(format!(
                "unknown HTTP method: {other}"
            ))),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated user attached to a request by the session layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    /// Stored language preference, consulted first during negotiation
    pub language: Option<String>,
}

/// HTTP request wrapper.
///
/// Wire parsing happens upstream; the engine receives a fully-built request.
/// The query string is split off the target on construction and decoded into
/// `query_params`.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub sub_domain: String,
    pub headers: HashMap<String, String>,
    pub cookies: HashMap<String, String>,
    pub query_params: HashMap<String, String>,
    pub query_string: Option<String>,
    pub body: Vec<u8>,
    pub user: Option<UserInfo>,
}

impl HttpRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        let target = target.into();
        let (path, query_string) = match target.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (target, None),
        };

        let query_params = query_string
            .as_deref()
            .map(parse_query_string)
            .unwrap_or_default();

        Self {
            method,
            path,
            sub_domain: String::new(),
            headers: HashMap::new(),
            cookies: HashMap::new(),
            query_params,
            query_string,
            body: Vec::new(),
            user: None,
        }
    }

    pub fn with_sub_domain(mut self, sub_domain: impl Into<String>) -> Self {
        self.sub_domain = sub_domain.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    pub fn with_user(mut self, user: UserInfo) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Get a header by name, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&String> {
        self.query_params.get(name)
    }

    /// Get a cookie value by name
    pub fn cookie(&self, name: &str) -> Option<&String> {
        self.cookies.get(name)
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }
}

/// Parse a query string into a map of decoded parameters
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|part| !part.is_empty())
        .filter_map(|part| {
            let mut split = part.splitn(2, '=');
            let key = split.next()?;
            let value = split.next().unwrap_or("");
            let value = urlencoding::decode(value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((key.to_string(), value))
        })
        .collect()
}

/// HTTP response wrapper
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub cookies: Vec<Cookie>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            cookies: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(HttpStatus::Ok.code())
    }

    pub fn no_content() -> Self {
        Self::new(HttpStatus::NoContent.code())
    }

    /// 302 redirect to the given location
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(HttpStatus::Found.code()).with_header("Location", location.into())
    }

    /// 304 response carrying the matched ETag
    pub fn not_modified(etag: &str) -> Self {
        let response = Self::new(HttpStatus::NotModified.code());
        if etag.is_empty() {
            response
        } else {
            response.with_header("ETag", etag)
        }
    }

    /// Built-in 404 page
    pub fn not_found_page() -> Self {
        Self::html_page(HttpStatus::NotFound)
    }

    /// Built-in 500 page
    pub fn server_error_page() -> Self {
        Self::html_page(HttpStatus::InternalServerError)
    }

    /// Built-in 401 page
    pub fn unauthorized_page() -> Self {
        Self::html_page(HttpStatus::Unauthorized)
    }

    fn html_page(status: HttpStatus) -> Self {
        let body = format!(
            "<!DOCTYPE html><html><head><title>{code} {reason}</title></head>\
             <body><h1>{code} {reason}</h1></body></html>",
            code = status.code(),
            reason = status.reason(),
        );
        Self::new(status.code())
            .with_header("Content-Type", "text/html; charset=utf-8")
            .with_body(body.into_bytes())
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body =
            serde_json::to_vec(value).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Render the queued cookies as Set-Cookie header values, in order
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.cookies.iter().map(Cookie::to_header_value).collect()
    }
}

/// JSON response helper
#[derive(Debug)]
pub struct Json<T: Serialize>(pub T);

impl<T: Serialize> Json<T> {
    pub fn into_response(self) -> Result<HttpResponse, crate::Error> {
        HttpResponse::ok().with_json(&self.0)
    }
}
