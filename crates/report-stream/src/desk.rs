use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use crate::errors::{FAILURE_MESSAGE, ReportError};
use crate::model::ReportQuery;
use crate::run::{AbortHandle, ReportRun, RunSettings};
use crate::transport::ReportTransport;

const DEFAULT_STREAM_BUFFER_CAPACITY: usize = 128;

struct DeskInner {
    transport: Arc<dyn ReportTransport>,
    settings: RunSettings,
    active: Mutex<Option<AbortHandle>>,
}

/// Entry point for issuing report requests.
///
/// At most one session is live per desk: starting a new report cancels the
/// one still in flight, so stale chunks never reach the presentation layer.
#[derive(Clone)]
pub struct ReportDesk {
    inner: Arc<DeskInner>,
}

impl ReportDesk {
    /// Starts a builder around the given transport.
    pub fn builder(transport: Arc<dyn ReportTransport>) -> ReportDeskBuilder {
        ReportDeskBuilder {
            transport,
            failure_message: FAILURE_MESSAGE.to_string(),
            stream_buffer_capacity: DEFAULT_STREAM_BUFFER_CAPACITY,
        }
    }

    /// Validates `query` and starts a new session, superseding any active one.
    pub async fn start(&self, query: ReportQuery) -> Result<ReportRun, ReportError> {
        query.validate()?;
        let run = ReportRun::spawn(
            self.inner.transport.clone(),
            query,
            self.inner.settings.clone(),
        );
        let previous = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(run.abort_handle());
        if let Some(previous) = previous.filter(AbortHandle::is_live) {
            info!(session_id = %run.session_id(), "superseding in-flight report session");
            previous.abort();
        }
        Ok(run)
    }

    /// Runs a report to completion and returns its text.
    pub async fn collect(&self, query: ReportQuery) -> Result<String, ReportError> {
        self.start(query).await?.finish().await
    }

    /// Cancels the active session, if any. Returns true when one was cancelled.
    pub fn cancel_active(&self) -> bool {
        let active = self
            .inner
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match active {
            Some(handle) if handle.is_live() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    /// Message that replaces the buffer of a failed session.
    pub fn failure_message(&self) -> &str {
        &self.inner.settings.failure_message
    }
}

/// Builder for [`ReportDesk`].
pub struct ReportDeskBuilder {
    transport: Arc<dyn ReportTransport>,
    failure_message: String,
    stream_buffer_capacity: usize,
}

impl ReportDeskBuilder {
    /// Overrides the message shown when a session fails.
    pub fn failure_message(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }

    /// Sets the bounded event buffer between the run task and the consumer.
    /// While it is full, chunk text is merged into fewer `Chunk` events.
    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<ReportDesk, ReportError> {
        if self.stream_buffer_capacity == 0 {
            return Err(ReportError::Config(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        if self.failure_message.trim().is_empty() {
            return Err(ReportError::Config(
                "failure message must not be empty".into(),
            ));
        }
        Ok(ReportDesk {
            inner: Arc::new(DeskInner {
                transport: self.transport,
                settings: RunSettings {
                    failure_message: self.failure_message,
                    stream_buffer_capacity: self.stream_buffer_capacity,
                },
                active: Mutex::new(None),
            }),
        })
    }
}
