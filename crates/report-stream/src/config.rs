use std::time::Duration;

use crate::errors::{FAILURE_MESSAGE, ReportError};
use crate::model::Language;

const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Configuration for the report service client.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the report service.
    pub base_url: String,
    /// Language used when a query does not set one.
    pub language: Language,
    /// Timeout for the non-streaming JSON endpoints.
    ///
    /// The report stream itself has no timeout; it runs until the service
    /// closes it.
    pub request_timeout: Duration,
    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,
    /// Message that replaces the report when a session fails.
    pub failure_message: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            language: Language::default(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
            failure_message: FAILURE_MESSAGE.to_string(),
        }
    }
}

impl ClientConfig {
    /// Creates a config with defaults and the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from the environment.
    ///
    /// Reads `REPORT_API_BASE_URL`, `REPORT_LANGUAGE`,
    /// `REPORT_REQUEST_TIMEOUT_SECS`, `REPORT_CONNECT_TIMEOUT_SECS` and
    /// `REPORT_FAILURE_MESSAGE`; unset or blank variables keep their default.
    pub fn from_env() -> Result<Self, ReportError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ReportError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();
        if let Some(base_url) = get("REPORT_API_BASE_URL") {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(language) = get("REPORT_LANGUAGE") {
            config.language = Language::new(language.trim());
        }
        if let Some(raw) = get("REPORT_REQUEST_TIMEOUT_SECS") {
            config.request_timeout = parse_secs("REPORT_REQUEST_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = get("REPORT_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = parse_secs("REPORT_CONNECT_TIMEOUT_SECS", &raw)?;
        }
        if let Some(message) = get("REPORT_FAILURE_MESSAGE") {
            config.failure_message = message;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the default language.
    pub fn language(mut self, language: impl Into<Language>) -> Self {
        self.language = language.into();
        self
    }

    /// Overrides the timeout of the non-streaming endpoints.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Overrides the failure message.
    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ReportError> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(ReportError::Config("base_url must not be empty".into()));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ReportError::Config(format!(
                "base_url must start with http:// or https:// (got {base})"
            )));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, ReportError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ReportError::Config(format!("invalid {key} ({raw}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = ClientConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.language.as_str(), "Persian");
        assert_eq!(config.request_timeout, Duration::from_secs(120));
        assert_eq!(config.failure_message, FAILURE_MESSAGE);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("REPORT_API_BASE_URL", "https://reports.example.com/"),
            ("REPORT_LANGUAGE", "English"),
            ("REPORT_REQUEST_TIMEOUT_SECS", "5"),
            ("REPORT_FAILURE_MESSAGE", "  "),
        ]))
        .expect("config");
        assert_eq!(config.language.as_str(), "English");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.failure_message, FAILURE_MESSAGE);
        assert_eq!(
            config.endpoint("/generate_report_stream"),
            "https://reports.example.com/generate_report_stream"
        );
    }

    #[test]
    fn rejects_bad_timeout_and_scheme() {
        let err = ClientConfig::from_lookup(lookup(&[("REPORT_CONNECT_TIMEOUT_SECS", "soon")]))
            .expect_err("bad timeout");
        assert!(matches!(err, ReportError::Config(msg) if msg.contains("REPORT_CONNECT_TIMEOUT_SECS")));

        let err = ClientConfig::from_lookup(lookup(&[("REPORT_API_BASE_URL", "localhost:8000")]))
            .expect_err("bad scheme");
        assert!(matches!(err, ReportError::Config(msg) if msg.contains("http://")));
    }
}
