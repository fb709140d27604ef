// Static file routes
//
// A static route binds a URL prefix to a filesystem root. Its handler is
// synthesized at construction time; every resolution failure falls through
// to the next route instead of erroring, so a missing file simply lets the
// rest of the chain (and ultimately the not-found fallback) run.

use crate::context::Context;
use crate::error::RouteInfo;
use crate::handler::{handler, BoxedHandler, Flow};
use crate::http::{HttpRequest, HttpResponse};
use crate::route::SubDomain;
use crate::template::split_segments;
use crate::Error;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Name of the optional per-directory ETag index file
const ETAG_INDEX: &str = ".etags.json";

/// Policy for path segments beginning with `.`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dotfiles {
    /// Serve dotfiles like any other file
    Allow,
    /// Fall through to the next route (default)
    #[default]
    Ignore,
    /// Respond with an unauthorized page
    Deny,
}

impl FromStr for Dotfiles {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Dotfiles::Allow),
            "ignore" => Ok(Dotfiles::Ignore),
            "deny" => Ok(Dotfiles::Deny),
            other => Err(Error::InvalidRoute(format!(
                "unknown dotfiles policy: {other:?}"
            ))),
        }
    }
}

/// Cache strategy applied to served files
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStrategy {
    /// Cache-Control: no-cache, no-store, must-revalidate
    NoCache,
    /// Cache-Control: public, max-age=N
    Public(Duration),
    /// Cache-Control: private, max-age=N
    Private(Duration),
    /// Cache-Control: public, max-age=31536000, immutable
    Immutable,
}

impl CacheStrategy {
    pub fn to_header_value(&self) -> String {
        match self {
            CacheStrategy::NoCache => "no-cache, no-store, must-revalidate".to_string(),
            CacheStrategy::Public(duration) => format!("public, max-age={}", duration.as_secs()),
            CacheStrategy::Private(duration) => format!("private, max-age={}", duration.as_secs()),
            CacheStrategy::Immutable => "public, max-age=31536000, immutable".to_string(),
        }
    }
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::Public(Duration::from_secs(3600))
    }
}

/// Content-Type detection by file extension
fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("pdf") => "application/pdf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

/// Options accepted by the static registration API
#[derive(Debug, Clone)]
pub struct StaticOptions {
    /// URL prefix the tree is mounted under
    pub path: String,
    pub dotfiles: Dotfiles,
    pub sub_domain: SubDomain,
    pub case_sensitive: bool,
    pub cache: CacheStrategy,
}

impl Default for StaticOptions {
    fn default() -> Self {
        Self {
            path: String::new(),
            dotfiles: Dotfiles::Ignore,
            sub_domain: SubDomain::Any,
            case_sensitive: false,
            cache: CacheStrategy::default(),
        }
    }
}

impl StaticOptions {
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn dotfiles(mut self, dotfiles: Dotfiles) -> Self {
        self.dotfiles = dotfiles;
        self
    }

    pub fn sub_domain(mut self, sub_domain: impl Into<String>) -> Self {
        self.sub_domain = SubDomain::parse(&sub_domain.into());
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn cache(mut self, cache: CacheStrategy) -> Self {
        self.cache = cache;
        self
    }
}

struct StaticFiles {
    root: PathBuf,
    mount: Vec<String>,
    raw_path: String,
    dotfiles: Dotfiles,
    sub_domain: SubDomain,
    case_sensitive: bool,
    cache: CacheStrategy,
}

/// A route serving files beneath a validated filesystem root.
#[derive(Clone)]
pub struct StaticRoute {
    files: Arc<StaticFiles>,
    handler: BoxedHandler,
}

impl StaticRoute {
    /// Validate the root and synthesize the serving handler. A root that
    /// does not exist or is not a readable directory fails construction.
    pub fn new(root: impl Into<PathBuf>, options: StaticOptions) -> Result<Self, Error> {
        let root = root.into();
        let metadata = std::fs::metadata(&root).map_err(|e| {
            Error::InvalidRoute(format!("static root {root:?} is not accessible: {e}"))
        })?;
        if !metadata.is_dir() {
            return Err(Error::InvalidRoute(format!(
                "static root {root:?} is not a directory"
            )));
        }
        std::fs::read_dir(&root).map_err(|e| {
            Error::InvalidRoute(format!("static root {root:?} is not readable: {e}"))
        })?;

        let mount: Vec<String> = options
            .path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let files = Arc::new(StaticFiles {
            root,
            mount,
            raw_path: options.path,
            dotfiles: options.dotfiles,
            sub_domain: options.sub_domain,
            case_sensitive: options.case_sensitive,
            cache: options.cache,
        });

        let serving = files.clone();
        let handler = handler(move |ctx: Context| {
            let serving = serving.clone();
            async move { serving.serve(ctx).await }
        });

        Ok(Self { files, handler })
    }

    pub fn handler(&self) -> BoxedHandler {
        self.handler.clone()
    }

    pub fn describe(&self) -> RouteInfo {
        RouteInfo {
            method: "USE".to_string(),
            path: self.files.raw_path.clone(),
        }
    }

    /// Match predicate: any method, subdomain scope, then prefix comparison
    /// of the joined paths. An empty mount accepts any path with at least
    /// one segment to resolve.
    pub fn matches(&self, request: &HttpRequest) -> bool {
        let files = &*self.files;
        if !files
            .sub_domain
            .matches(&request.sub_domain, files.case_sensitive)
        {
            return false;
        }

        let segments = split_segments(&request.path);
        if segments.len() < files.mount.len() {
            return false;
        }
        if files.mount.is_empty() {
            return true;
        }

        let requested = segments.join("/");
        let mounted = files.mount.join("/");
        if files.case_sensitive {
            requested.starts_with(&mounted)
        } else {
            requested
                .to_ascii_lowercase()
                .starts_with(&mounted.to_ascii_lowercase())
        }
    }
}

impl StaticFiles {
    async fn serve(&self, ctx: Context) -> Result<Flow, Error> {
        // Segments must not borrow the context, which moves into every exit
        let path = ctx.request.path.clone();
        let segments = split_segments(&path);
        if segments.len() < self.mount.len() {
            return Ok(Flow::Continue(ctx));
        }

        let rest = &segments[self.mount.len()..];
        if rest.is_empty() {
            // The mount itself was requested; files only, no indexes
            return Ok(Flow::Continue(ctx));
        }

        for segment in rest {
            // Traversal segments never resolve
            if *segment == "." || *segment == ".." {
                return Ok(Flow::Continue(ctx));
            }
            if segment.starts_with('.') {
                match self.dotfiles {
                    Dotfiles::Allow => {}
                    Dotfiles::Ignore => return Ok(Flow::Continue(ctx)),
                    Dotfiles::Deny => {
                        return Ok(Flow::Respond(ctx, HttpResponse::unauthorized_page()))
                    }
                }
            }
        }

        let mut dir = self.root.clone();
        for segment in &rest[..rest.len() - 1] {
            dir.push(segment);
        }

        let Some(file_name) = self.locate(&dir, rest[rest.len() - 1]).await else {
            return Ok(Flow::Continue(ctx));
        };
        let file_path = dir.join(&file_name);

        let Ok(metadata) = tokio::fs::metadata(&file_path).await else {
            return Ok(Flow::Continue(ctx));
        };
        if !metadata.is_file() {
            return Ok(Flow::Continue(ctx));
        }

        let etag = self.indexed_etag(&dir, &file_name).await;

        if let Some(etag) = etag.as_deref() {
            if ctx.request.header("if-none-match") == Some(etag) {
                return Ok(Flow::Respond(ctx, HttpResponse::not_modified(etag)));
            }
        }

        let modified = metadata.modified().ok();
        if let (Some(modified), Some(since)) = (modified, ctx.request.header("if-modified-since")) {
            if let Ok(since) = httpdate::parse_http_date(since) {
                if modified <= since {
                    let response = HttpResponse::not_modified(etag.as_deref().unwrap_or(""));
                    return Ok(Flow::Respond(ctx, response));
                }
            }
        }

        let Ok(body) = tokio::fs::read(&file_path).await else {
            return Ok(Flow::Continue(ctx));
        };

        let mut response = HttpResponse::ok()
            .with_body(body)
            .with_header("Content-Type", content_type(&file_path))
            .with_header("Cache-Control", self.cache.to_header_value());

        if let Some(etag) = etag {
            response = response.with_header("ETag", etag);
        }
        if let Some(modified) = modified {
            response = response.with_header("Last-Modified", httpdate::fmt_http_date(modified));
        }

        Ok(Flow::Respond(ctx, response))
    }

    /// Locate the requested filename inside `dir`, honoring case
    /// sensitivity by scanning directory entries.
    async fn locate(&self, dir: &Path, requested: &str) -> Option<String> {
        let mut entries = tokio::fs::read_dir(dir).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let hit = if self.case_sensitive {
                name == requested
            } else {
                name.eq_ignore_ascii_case(requested)
            };
            if hit {
                return Some(name.to_string());
            }
        }
        None
    }

    /// Look up the file's ETag in the sibling index, if the directory has one
    async fn indexed_etag(&self, dir: &Path, file_name: &str) -> Option<String> {
        let raw = tokio::fs::read(dir.join(ETAG_INDEX)).await.ok()?;
        let index: HashMap<String, String> = serde_json::from_slice(&raw).ok()?;
        index.get(file_name).cloned()
    }
}
