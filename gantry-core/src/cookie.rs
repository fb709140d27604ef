// Cookie value type used by the dispatcher and response object.
//
// The engine only needs to *emit* cookies (language and color-scheme
// negotiation); parsing incoming Cookie headers belongs to the transport
// layer, which hands the engine a ready map on the request.

use std::time::Duration;

/// Cookie priority attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

/// An outgoing Set-Cookie value
#[derive(Debug, Clone, PartialEq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub max_age: Option<Duration>,
    pub http_only: bool,
    pub priority: Priority,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            max_age: None,
            http_only: false,
            priority: Priority::Medium,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Render as a Set-Cookie header value
    pub fn to_header_value(&self) -> String {
        let mut value = format!("{}={}; Path={}", self.name, self.value, self.path);

        if let Some(max_age) = self.max_age {
            value.push_str(&format!("; Max-Age={}", max_age.as_secs()));
        }

        value.push_str(&format!("; Priority={}", self.priority.as_str()));

        if self.http_only {
            value.push_str("; HttpOnly");
        }

        value
    }
}
