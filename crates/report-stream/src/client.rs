use std::sync::Arc;

use futures::StreamExt as _;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ClientConfig;
use crate::desk::ReportDesk;
use crate::errors::ReportError;
use crate::model::{
    DeleteAck, GeneratedReport, HealthStatus, ReportListing, ReportQuery, StoredReport,
};
use crate::transport::{ByteStream, ReportTransport};

const STREAM_PATH: &str = "generate_report_stream";
const GENERATE_PATH: &str = "generate_report";
const HEALTH_PATH: &str = "health";
const REPORTS_PATH: &str = "reports";

/// HTTP client for the report service.
///
/// Implements [`ReportTransport`] over `POST /generate_report_stream` and
/// wraps the service's JSON endpoints.
#[derive(Clone)]
pub struct ReportClient {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ReportClient {
    /// Creates a client from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ReportError> {
        config.validate()?;
        // No overall timeout here: it would also cut off long report streams.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ReportError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a client configured from `REPORT_*` environment variables.
    pub fn from_env() -> Result<Self, ReportError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Builds a query in the configured default language.
    pub fn query(&self, text: impl Into<String>) -> ReportQuery {
        ReportQuery::new(text).language(self.config.language.clone())
    }

    /// Wraps this client in a [`ReportDesk`] using the configured failure message.
    pub fn into_desk(self) -> Result<ReportDesk, ReportError> {
        let failure_message = self.config.failure_message.clone();
        ReportDesk::builder(Arc::new(self))
            .failure_message(failure_message)
            .build()
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<HealthStatus, ReportError> {
        let request = self.client.get(self.config.endpoint(HEALTH_PATH));
        self.send_json(request).await
    }

    /// `POST /generate_report`: waits for the whole report.
    pub async fn generate(&self, query: &ReportQuery) -> Result<GeneratedReport, ReportError> {
        query.validate()?;
        let request = self
            .client
            .post(self.config.endpoint(GENERATE_PATH))
            .json(query);
        self.send_json(request).await
    }

    /// `GET /reports`.
    pub async fn list_reports(&self) -> Result<ReportListing, ReportError> {
        let request = self.client.get(self.config.endpoint(REPORTS_PATH));
        self.send_json(request).await
    }

    /// `GET /reports/{id}`.
    pub async fn get_report(&self, report_id: &str) -> Result<StoredReport, ReportError> {
        let request = self.client.get(self.report_url(report_id)?);
        self.send_json(request).await
    }

    /// `DELETE /reports/{id}`.
    pub async fn delete_report(&self, report_id: &str) -> Result<DeleteAck, ReportError> {
        let request = self.client.delete(self.report_url(report_id)?);
        self.send_json(request).await
    }

    /// `{base}/reports/{id}` with the id percent-encoded as one path segment.
    fn report_url(&self, report_id: &str) -> Result<reqwest::Url, ReportError> {
        let id = report_id.trim();
        if id.is_empty() || id == "." || id == ".." || id.contains('/') {
            return Err(ReportError::Validation(format!(
                "invalid report id: {report_id:?}"
            )));
        }
        let endpoint = self.config.endpoint(REPORTS_PATH);
        let mut url = reqwest::Url::parse(&endpoint)
            .map_err(|e| ReportError::Config(format!("invalid reports URL {endpoint}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ReportError::Config(format!("base URL cannot take a path: {endpoint}")))?
            .push(id);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ReportError> {
        let response = request
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ReportError::Transport(format!("report service request failed: {e}")))?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ReportError::Decode(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ReportTransport for ReportClient {
    async fn open_stream(&self, query: &ReportQuery) -> Result<ByteStream, ReportError> {
        let url = self.config.endpoint(STREAM_PATH);
        debug!(url = %url, language = %query.language, "opening report stream");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "text/event-stream")
            .json(query)
            .send()
            .await
            .map_err(|e| ReportError::Transport(format!("report stream request failed: {e}")))?;
        let response = check_status(response).await?;
        if response.content_length() == Some(0) {
            return Err(ReportError::NoBody);
        }
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ReportError::Stream(e.to_string())));
        Ok(Box::pin(stream))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ReportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string());
    Err(ReportError::Status {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

/// Pulls the message out of a FastAPI error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    let detail = value.get("detail").unwrap_or(&value);
    detail
        .get("message")
        .and_then(|v| v.as_str())
        .or_else(|| detail.as_str())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| body.trim().to_string())
}
