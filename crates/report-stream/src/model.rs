use std::fmt;

use crate::errors::ReportError;

/// Language the service should write the report in.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Language(pub String);

impl Language {
    /// Creates a language tag from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::new("Persian")
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Body of a report request, shared by the streaming and non-streaming
/// endpoints.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportQuery {
    /// Natural-language question to analyse.
    pub query: String,
    /// Output language.
    pub language: Language,
    /// Optional report date (for example `March 21, 2024`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_date: Option<String>,
}

impl ReportQuery {
    /// Creates a query in the default language.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: Language::default(),
            report_date: None,
        }
    }

    /// Sets the output language.
    pub fn language(mut self, language: impl Into<Language>) -> Self {
        self.language = language.into();
        self
    }

    /// Sets the report date.
    pub fn report_date(mut self, date: impl Into<String>) -> Self {
        self.report_date = Some(date.into());
        self
    }

    /// Rejects blank queries and languages.
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.query.trim().is_empty() {
            return Err(ReportError::Validation("query must not be empty".into()));
        }
        if self.language.as_str().trim().is_empty() {
            return Err(ReportError::Validation("language must not be empty".into()));
        }
        Ok(())
    }
}

/// `GET /health` response.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// `POST /generate_report` response.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GeneratedReport {
    pub status: String,
    pub report_id: String,
    pub report: String,
    pub timestamp: String,
}

/// A report kept by the service, as returned by `GET /reports/{id}`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StoredReport {
    pub report_id: String,
    pub query: String,
    pub report: String,
    pub timestamp: String,
    #[serde(default)]
    pub language: Option<Language>,
}

/// One entry of `GET /reports`.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportSummary {
    pub report_id: String,
    pub query: String,
    pub timestamp: String,
    #[serde(default)]
    pub language: Option<Language>,
}

/// `GET /reports` response.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReportListing {
    pub status: String,
    pub reports: Vec<ReportSummary>,
    pub total_count: usize,
}

/// `DELETE /reports/{id}` response.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DeleteAck {
    pub status: String,
    pub message: String,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_body_omits_missing_report_date() {
        let body = serde_json::to_value(ReportQuery::new("market cycle")).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({"query": "market cycle", "language": "Persian"})
        );
    }

    #[test]
    fn query_body_includes_report_date_when_set() {
        let body = serde_json::to_value(
            ReportQuery::new("q")
                .language("English")
                .report_date("March 21, 2024"),
        )
        .expect("serialize");
        assert_eq!(body["language"], "English");
        assert_eq!(body["report_date"], "March 21, 2024");
    }

    #[test]
    fn blank_query_is_rejected() {
        let err = ReportQuery::new("   ").validate().expect_err("blank");
        assert!(matches!(err, ReportError::Validation(msg) if msg.contains("query")));
        assert!(ReportQuery::new("ok").validate().is_ok());
    }

    #[test]
    fn listing_tolerates_missing_language() {
        let listing: ReportListing = serde_json::from_value(serde_json::json!({
            "status": "success",
            "reports": [{"report_id": "r1", "query": "q", "timestamp": "t"}],
            "total_count": 1
        }))
        .expect("decode");
        assert_eq!(listing.reports[0].language, None);
    }
}
