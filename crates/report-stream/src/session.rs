use std::fmt;

use crate::model::{Language, ReportQuery};

/// Lifecycle of a report session.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Created, request not issued yet.
    #[default]
    Idle,
    /// Request issued, chunks are arriving.
    Streaming,
    /// Stream ended normally.
    Complete,
    /// Transport failed or the session was cancelled.
    Failed,
}

impl SessionStatus {
    /// Returns true for `Complete` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// State of one report request as seen by the presentation layer.
///
/// The output buffer only grows while streaming; the failure transition is
/// the one place it gets replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamSession {
    id: uuid::Uuid,
    query: String,
    language: Language,
    output: String,
    status: SessionStatus,
    report_id: Option<String>,
}

impl StreamSession {
    /// Creates an idle session with an empty buffer.
    pub fn new(query: &ReportQuery) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            query: query.query.clone(),
            language: query.language.clone(),
            output: String::new(),
            status: SessionStatus::Idle,
            report_id: None,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        self.id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Markdown accumulated so far (or the failure message).
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Report id assigned by the service, once announced.
    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    /// Marks the request as issued.
    pub(crate) fn begin(&mut self) {
        self.output.clear();
        self.status = SessionStatus::Streaming;
    }

    /// Appends a content chunk. Ignored once the session is terminal.
    pub(crate) fn append(&mut self, content: &str) {
        if self.status == SessionStatus::Streaming {
            self.output.push_str(content);
        }
    }

    pub(crate) fn set_report_id(&mut self, report_id: &str) {
        self.report_id = Some(report_id.to_string());
    }

    pub(crate) fn complete(&mut self) {
        if !self.status.is_terminal() {
            self.status = SessionStatus::Complete;
        }
    }

    /// Replaces whatever was streamed with `message`.
    pub(crate) fn fail(&mut self, message: &str) {
        if !self.status.is_terminal() {
            self.output = message.to_string();
            self.status = SessionStatus::Failed;
        }
    }
}
