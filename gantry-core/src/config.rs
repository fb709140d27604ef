// Dispatcher configuration

use serde::{Deserialize, Serialize};

/// Language negotiation settings.
///
/// Each `from_*` flag enables one negotiation source; a source only wins if
/// its candidate value is in the supported set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Fallback when no source yields a supported language
    pub default: String,
    /// Languages the application can serve
    pub supported: Vec<String>,
    /// Cookie persisted on explicit query override
    pub cookie_name: String,
    /// Query parameter for explicit overrides
    pub query_param: String,
    pub from_user: bool,
    pub from_query: bool,
    pub from_cookie: bool,
    pub from_header: bool,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            default: "en".to_string(),
            supported: vec!["en".to_string()],
            cookie_name: "language".to_string(),
            query_param: "lang".to_string(),
            from_user: true,
            from_query: true,
            from_cookie: true,
            from_header: true,
        }
    }
}

impl LanguageConfig {
    pub fn is_supported(&self, language: &str) -> bool {
        self.supported
            .iter()
            .any(|supported| supported.eq_ignore_ascii_case(language))
    }
}

/// Configuration shared by every per-request dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    pub language: LanguageConfig,
    pub color_scheme_cookie: ColorSchemeCookie,
}

/// Name of the color-scheme cookie written by the dispatcher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorSchemeCookie {
    pub name: String,
}

impl Default for ColorSchemeCookie {
    fn default() -> Self {
        Self {
            name: "colorScheme".to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_language(mut self, language: impl Into<String>) -> Self {
        self.language.default = language.into();
        self
    }

    pub fn with_supported_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.language.supported = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_language_sources(
        mut self,
        from_user: bool,
        from_query: bool,
        from_cookie: bool,
        from_header: bool,
    ) -> Self {
        self.language.from_user = from_user;
        self.language.from_query = from_query;
        self.language.from_cookie = from_cookie;
        self.language.from_header = from_header;
        self
    }
}
