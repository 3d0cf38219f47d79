//! Process-wide `tracing` setup driven by `REPORT_*` environment variables.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "report-stream.logs.jsonl";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSink {
    /// Compact text on stderr, leaving stdout to the report itself.
    Stderr,
    /// JSON lines appended to `dir/file_name`.
    JsonFile { dir: PathBuf, file_name: String },
}

impl LogSink {
    fn json_file(raw: &str) -> Self {
        let path = Path::new(raw);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE)
            .to_string();
        LogSink::JsonFile { dir, file_name }
    }
}

/// Logging settings resolved from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// `REPORT_OBSERVABILITY_ENABLED`; unknown values count as enabled.
    pub enabled: bool,
    /// `REPORT_LOG_LEVEL` filter directive. Falls back to `RUST_LOG`, then to
    /// the caller's default level.
    pub filter: Option<String>,
    /// `REPORT_JSON_LOG_PATH` selects a JSON file; stderr otherwise.
    pub sink: LogSink,
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            enabled: get("REPORT_OBSERVABILITY_ENABLED")
                .and_then(|v| parse_bool_env(&v))
                .unwrap_or(true),
            filter: get("REPORT_LOG_LEVEL").map(|v| v.trim().to_string()),
            sink: get("REPORT_JSON_LOG_PATH")
                .map(|raw| LogSink::json_file(raw.trim()))
                .unwrap_or(LogSink::Stderr),
        }
    }

    fn env_filter(&self, default_level: &str) -> EnvFilter {
        if let Some(filter) = self.filter.as_deref().and_then(|f| EnvFilter::try_new(f).ok()) {
            return filter;
        }
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    }

    /// Installs the global subscriber. Returns false when logging is disabled
    /// or another subscriber is already set.
    pub fn install(&self, default_level: &str) -> bool {
        if !self.enabled {
            return false;
        }
        let registry = tracing_subscriber::registry().with(self.env_filter(default_level));
        match &self.sink {
            LogSink::Stderr => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init()
                .is_ok(),
            LogSink::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                registry
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_current_span(true)
                            .with_span_list(true)
                            .with_target(false)
                            .with_writer(writer),
                    )
                    .try_init()
                    .is_ok()
            }
        }
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

/// Initialize logging once per process from [`LogSettings::from_env`].
///
/// `default_level` applies when neither `REPORT_LOG_LEVEL` nor `RUST_LOG`
/// gives a usable filter.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| {
        LogSettings::from_env().install(default_level);
    });
}
