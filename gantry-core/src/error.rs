// Error types for the Gantry dispatch engine

use crate::http::HttpRequest;
use crate::HttpStatus;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) => HttpStatus::BadRequest.code(),
            Error::Deserialization(_) => HttpStatus::BadRequest.code(),
            Error::Unauthorized(_) => HttpStatus::Unauthorized.code(),
            Error::Forbidden(_) => HttpStatus::Forbidden.code(),
            Error::NotFound(_) | Error::RouteNotFound(_) => HttpStatus::NotFound.code(),
            _ => HttpStatus::InternalServerError.code(),
        }
    }

    /// Get the HttpStatus enum for this error
    pub fn http_status(&self) -> HttpStatus {
        HttpStatus::from_code(self.status_code()).unwrap_or(HttpStatus::InternalServerError)
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.http_status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.http_status().is_server_error()
    }
}

/// Description of the route a dispatch error originated from.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
}

/// Serializable snapshot of a request, captured when the dispatcher starts
/// and carried by [`HttpError`] so error handlers can inspect what was being
/// processed without holding the live request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    pub sub_domain: String,
    pub headers: HashMap<String, String>,
}

impl RequestSnapshot {
    pub fn of(request: &HttpRequest) -> Self {
        Self {
            method: request.method.as_str().to_string(),
            path: request.path.clone(),
            sub_domain: request.sub_domain.clone(),
            headers: request.headers.clone(),
        }
    }

    /// Materialize a request from the snapshot, for error handlers that
    /// want one. The body is not carried by the snapshot.
    pub fn to_request(&self) -> HttpRequest {
        let mut request = HttpRequest::new(
            self.method.parse().unwrap_or(crate::http::Method::Get),
            self.path.clone(),
        );
        request.sub_domain = self.sub_domain.clone();
        request.headers = self.headers.clone();
        request
    }
}

/// Structured error handed to the registered error hook after a handler
/// fails mid-dispatch. Carries the original error, the route it came from,
/// and a snapshot of the request.
#[derive(Debug)]
pub struct HttpError {
    pub error: Error,
    pub route: Option<RouteInfo>,
    pub request: RequestSnapshot,
}

impl HttpError {
    pub fn new(error: Error, route: Option<RouteInfo>, request: RequestSnapshot) -> Self {
        Self {
            error,
            route,
            request,
        }
    }

    /// Human-readable message of the underlying error
    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// JSON rendering of the error for structured logs and error pages
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "message": self.message(),
            "status": self.error.status_code(),
            "route": self.route,
            "request": self.request,
        })
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.route {
            Some(route) => write!(
                f,
                "{} (route {} {}, request {} {})",
                self.error, route.method, route.path, self.request.method, self.request.path
            ),
            None => write!(
                f,
                "{} (request {} {})",
                self.error, self.request.method, self.request.path
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Method;

    #[test]
    fn test_status_mapping() {
        assert_eq!(Error::NotFound("x".into()).status_code(), 404);
        assert_eq!(Error::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(Error::Internal("x".into()).status_code(), 500);
        assert!(Error::BadRequest("x".into()).is_client_error());
        assert!(Error::Internal("x".into()).is_server_error());
    }

    #[test]
    fn test_http_error_display_and_json() {
        let request = HttpRequest::new(Method::Get, "/users/42");
        let err = HttpError::new(
            Error::Internal("boom".into()),
            Some(RouteInfo {
                method: "GET".into(),
                path: "/users/<:id>".into(),
            }),
            RequestSnapshot::of(&request),
        );

        let rendered = err.to_string();
        assert!(rendered.contains("boom"));
        assert!(rendered.contains("/users/<:id>"));

        let json = err.to_json();
        assert_eq!(json["status"], 500);
        assert_eq!(json["request"]["path"], "/users/42");
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut request = HttpRequest::new(Method::Post, "/submit");
        request.sub_domain = "api".to_string();
        request
            .headers
            .insert("x-request-id".to_string(), "abc".to_string());

        let snapshot = RequestSnapshot::of(&request);
        let rebuilt = snapshot.to_request();
        assert_eq!(rebuilt.method, Method::Post);
        assert_eq!(rebuilt.path, "/submit");
        assert_eq!(rebuilt.sub_domain, "api");
        assert_eq!(rebuilt.headers.get("x-request-id").map(String::as_str), Some("abc"));
    }
}
