// Logging setup
//
// Thin builder over tracing-subscriber. Defaults to JSON on stdout at INFO;
// applications that want the dispatcher's request lines somewhere else
// configure the output here once at startup.

use crate::Error;
use std::io;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use tracing::{debug, error, info, trace, warn};

/// Log level filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON (default)
    Json,
    /// Plain text
    Plain,
    /// Multi-line, colored, for development
    Pretty,
    /// Minimal single-line
    Compact,
}

/// Output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File(String),
    RollingFile {
        directory: String,
        prefix: String,
        rotation: Rotation,
    },
}

/// Rotation strategy for `LogOutput::RollingFile`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl Rotation {
    fn to_appender_rotation(self) -> tracing_appender::rolling::Rotation {
        match self {
            Rotation::Minutely => tracing_appender::rolling::Rotation::MINUTELY,
            Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
            Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
            Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
        }
    }
}

/// Logging configuration builder.
///
/// ```no_run
/// use gantry_core::logging::{LogConfig, LogFormat, LogLevel};
///
/// let _guard = LogConfig::new()
///     .level(LogLevel::Debug)
///     .format(LogFormat::Pretty)
///     .init()
///     .ok();
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Include the module path in each line
    pub targets: bool,
    /// Include file and line numbers
    pub file_line: bool,
    /// ANSI colors, for terminal formats
    pub colors: bool,
    /// Explicit filter directive, overrides `level` when set
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Json,
            output: LogOutput::Stdout,
            targets: true,
            file_line: false,
            colors: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_file_line(mut self, enable: bool) -> Self {
        self.file_line = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Filter directives like `"gantry=debug,tokio=warn"`
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Install the global subscriber. The returned guard flushes buffered
    /// lines on drop and must be held for the life of the program.
    pub fn init(self) -> Result<WorkerGuard, Error> {
        let env_filter = match &self.env_filter {
            Some(directives) => EnvFilter::try_new(directives)
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        };

        match &self.output {
            LogOutput::Stdout => {
                let (writer, guard) = tracing_appender::non_blocking(io::stdout());
                self.install(writer, env_filter);
                Ok(guard)
            }
            LogOutput::Stderr => {
                let (writer, guard) = tracing_appender::non_blocking(io::stderr());
                self.install(writer, env_filter);
                Ok(guard)
            }
            LogOutput::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                let (writer, guard) = tracing_appender::non_blocking(file);
                self.install(writer, env_filter);
                Ok(guard)
            }
            LogOutput::RollingFile {
                directory,
                prefix,
                rotation,
            } => {
                let appender = tracing_appender::rolling::RollingFileAppender::new(
                    rotation.to_appender_rotation(),
                    directory,
                    prefix,
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                self.install(writer, env_filter);
                Ok(guard)
            }
        }
    }

    fn install<W>(&self, writer: W, env_filter: EnvFilter)
    where
        W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
    {
        match self.format {
            LogFormat::Json => {
                let layer = fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_file(self.file_line)
                    .with_line_number(self.file_line);
                tracing_subscriber::registry().with(env_filter).with(layer).init();
            }
            LogFormat::Plain => {
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_file(self.file_line)
                    .with_line_number(self.file_line)
                    .with_ansi(self.colors);
                tracing_subscriber::registry().with(env_filter).with(layer).init();
            }
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_file(self.file_line)
                    .with_line_number(self.file_line)
                    .with_ansi(self.colors);
                tracing_subscriber::registry().with(env_filter).with(layer).init();
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_writer(writer)
                    .with_target(self.targets)
                    .with_ansi(self.colors);
                tracing_subscriber::registry().with(env_filter).with(layer).init();
            }
        }
    }
}
