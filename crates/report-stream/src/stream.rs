use crate::errors::ReportError;

/// Events emitted by a `ReportRun` while its session progresses.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// First event of every run.
    Started { session_id: uuid::Uuid },
    /// The service announced the id it stores the report under.
    Metadata { report_id: String },
    /// Incremental report content, already appended to the session buffer.
    Chunk { seq: u64, text: String },
    /// Terminal success event with the full report.
    Completed {
        output: String,
        report_id: Option<String>,
    },
    /// Terminal failure event. `message` is what replaced the buffer.
    Failed { error: ReportError, message: String },
}

impl StreamEvent {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}
