// Per-request context threaded through the handler chain

use crate::cookie::Cookie;
use crate::http::HttpRequest;
use crate::template::PathParams;
use std::str::FromStr;

/// Color scheme negotiated from the `colorScheme` cookie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorScheme {
    #[default]
    Default,
    Light,
    Dark,
}

impl ColorScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColorScheme::Default => "Default",
            ColorScheme::Light => "Light",
            ColorScheme::Dark => "Dark",
        }
    }
}

impl FromStr for ColorScheme {
    type Err = ();

    /// Exact-match parse; anything else is treated as an invalid cookie
    /// value and replaced during negotiation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Default" => Ok(ColorScheme::Default),
            "Light" => Ok(ColorScheme::Light),
            "Dark" => Ok(ColorScheme::Dark),
            _ => Err(()),
        }
    }
}

/// Request-scoped state passed through the dispatch chain by value.
///
/// Matched path parameters are attached per entry by the dispatcher, so two
/// concurrent requests hitting the same parameterized route never share a
/// params slot.
#[derive(Debug, Clone)]
pub struct Context {
    pub request: HttpRequest,
    pub params: PathParams,
    pub language: String,
    pub color_scheme: ColorScheme,
    pub request_id: Option<String>,
    /// Cookies queued by pre-routes, applied to whichever response
    /// terminates the request
    pub pending_cookies: Vec<Cookie>,
}

impl Context {
    pub fn new(request: HttpRequest) -> Self {
        Self {
            request,
            params: PathParams::new(),
            language: String::new(),
            color_scheme: ColorScheme::default(),
            request_id: None,
            pending_cookies: Vec::new(),
        }
    }

    /// Get a captured path parameter by name
    pub fn param(&self, name: &str) -> Option<&String> {
        self.params.get(name)
    }

    /// Queue a cookie for the terminal response
    pub fn set_cookie(&mut self, cookie: Cookie) {
        self.pending_cookies.push(cookie);
    }
}
