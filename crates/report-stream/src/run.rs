use std::sync::Arc;

use futures::StreamExt as _;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::aggregator::StreamAggregator;
use crate::errors::ReportError;
use crate::model::ReportQuery;
use crate::record::ReportEvent;
use crate::session::StreamSession;
use crate::stream::StreamEvent;
use crate::transport::ReportTransport;

/// Handle used to request cancellation of a running report.
#[derive(Clone)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Requests cancellation.
    ///
    /// Cancellation is best-effort and becomes visible as a terminal
    /// `StreamEvent::Failed` carrying `ReportError::Cancelled`.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }

    /// Returns true once `abort` has been called.
    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// True while the run task is still going and has not been asked to stop.
    pub(crate) fn is_live(&self) -> bool {
        !self.is_aborted() && !self.tx.is_closed()
    }
}

/// Settings a run task needs besides the query.
#[derive(Clone, Debug)]
pub(crate) struct RunSettings {
    pub failure_message: String,
    pub stream_buffer_capacity: usize,
}

/// Handle to one in-flight report session.
///
/// Consume events with `next_event()`, watch the session state with
/// `subscribe()`, and call `finish()` for the terminal result. The run never
/// waits for events to be read; a slow reader gets chunk text merged.
pub struct ReportRun {
    session_id: uuid::Uuid,
    rx: mpsc::Receiver<StreamEvent>,
    final_rx: oneshot::Receiver<Result<String, ReportError>>,
    state_rx: watch::Receiver<StreamSession>,
    abort_handle: AbortHandle,
    saw_terminal: bool,
}

impl ReportRun {
    pub(crate) fn spawn(
        transport: Arc<dyn ReportTransport>,
        query: ReportQuery,
        settings: RunSettings,
    ) -> Self {
        let session = StreamSession::new(&query);
        let session_id = session.id();
        let (tx, rx) = mpsc::channel(settings.stream_buffer_capacity);
        let (final_tx, final_rx) = oneshot::channel();
        let (state_tx, state_rx) = watch::channel(session);
        let (abort_tx, abort_rx) = watch::channel(false);

        tokio::spawn(run_task(
            transport,
            query,
            settings.failure_message,
            RunChannels::new(tx, state_tx, final_tx),
            abort_rx,
        ));

        Self {
            session_id,
            rx,
            final_rx,
            state_rx,
            abort_handle: AbortHandle { tx: abort_tx },
            saw_terminal: false,
        }
    }

    pub fn session_id(&self) -> uuid::Uuid {
        self.session_id
    }

    /// Returns a handle that can cancel the run.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Snapshot of the session state.
    pub fn session(&self) -> StreamSession {
        self.state_rx.borrow().clone()
    }

    /// Receiver notified on every session change (status or new chunk).
    pub fn subscribe(&self) -> watch::Receiver<StreamSession> {
        self.state_rx.clone()
    }

    /// Waits for and returns the next event.
    ///
    /// Returns `None` after the event channel is closed.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        let event = self.rx.recv().await;
        if event.as_ref().is_some_and(StreamEvent::is_terminal) {
            self.saw_terminal = true;
        }
        event
    }

    /// Drains remaining events and returns the full report text.
    ///
    /// Safe to call after consuming events with `next_event()`.
    pub async fn finish(mut self) -> Result<String, ReportError> {
        while !self.saw_terminal {
            match self.rx.recv().await {
                Some(event) if event.is_terminal() => self.saw_terminal = true,
                Some(_) => {}
                None => break,
            }
        }

        match self.final_rx.await {
            Ok(result) => result,
            Err(_) => Err(ReportError::protocol_msg(format!(
                "report task ended without final result (session={})",
                self.session_id
            ))),
        }
    }
}

/// Event fan-out of one run.
///
/// Chunk text never waits on the consumer: while the event channel is full
/// it collects in `backlog` and goes out merged into the next `Chunk` event
/// that fits. The `watch` session is always current, so a consumer that only
/// subscribes to state never stalls the run.
struct RunChannels {
    tx: mpsc::Sender<StreamEvent>,
    state_tx: watch::Sender<StreamSession>,
    final_tx: Option<oneshot::Sender<Result<String, ReportError>>>,
    backlog: String,
    seq: u64,
}

impl RunChannels {
    fn new(
        tx: mpsc::Sender<StreamEvent>,
        state_tx: watch::Sender<StreamSession>,
        final_tx: oneshot::Sender<Result<String, ReportError>>,
    ) -> Self {
        Self {
            tx,
            state_tx,
            final_tx: Some(final_tx),
            backlog: String::new(),
            seq: 0,
        }
    }

    /// Queues an event without waiting. Returns false once the consumer is gone.
    fn offer(&self, event: StreamEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!("event channel full, dropping event");
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Appends chunk text to the backlog and sends it if the channel has room.
    fn push_chunk(&mut self, text: &str) -> bool {
        self.backlog.push_str(text);
        self.flush_backlog()
    }

    fn flush_backlog(&mut self) -> bool {
        if self.backlog.is_empty() {
            return true;
        }
        match self.tx.try_reserve() {
            Ok(permit) => {
                permit.send(StreamEvent::Chunk {
                    seq: self.seq,
                    text: std::mem::take(&mut self.backlog),
                });
                self.seq = self.seq.saturating_add(1);
                true
            }
            Err(TrySendError::Full(())) => true,
            Err(TrySendError::Closed(())) => false,
        }
    }

    /// Sends an event the consumer has to see, waiting for room if needed.
    /// Gives up when the run is aborted while the channel is full.
    async fn deliver(&self, event: StreamEvent, abort_rx: &mut watch::Receiver<bool>) {
        let permit = match self.tx.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Closed(())) => return,
            Err(TrySendError::Full(())) => {
                let reserved = tokio::select! {
                    biased;
                    _ = wait_for_abort(abort_rx) => return,
                    reserved = self.tx.reserve() => reserved,
                };
                match reserved {
                    Ok(permit) => permit,
                    Err(_) => return,
                }
            }
        };
        permit.send(event);
    }

    /// Delivers any backlogged text followed by the terminal event.
    async fn close(&mut self, terminal: StreamEvent, abort_rx: &mut watch::Receiver<bool>) {
        if !self.backlog.is_empty() {
            let chunk = StreamEvent::Chunk {
                seq: self.seq,
                text: std::mem::take(&mut self.backlog),
            };
            self.seq = self.seq.saturating_add(1);
            self.deliver(chunk, abort_rx).await;
        }
        self.deliver(terminal, abort_rx).await;
    }

    async fn fail(
        &mut self,
        error: ReportError,
        message: &str,
        abort_rx: &mut watch::Receiver<bool>,
    ) {
        let session_id = self.state_tx.borrow().id();
        warn!(session_id = %session_id, error = %error, "report session failed");
        self.state_tx.send_modify(|s| s.fail(message));
        self.resolve(Err(error.clone()));
        self.close(
            StreamEvent::Failed {
                error,
                message: message.to_string(),
            },
            abort_rx,
        )
        .await;
    }

    fn resolve(&mut self, result: Result<String, ReportError>) {
        if let Some(final_tx) = self.final_tx.take() {
            let _ = final_tx.send(result);
        }
    }
}

async fn wait_for_abort(abort_rx: &mut watch::Receiver<bool>) {
    let closed = abort_rx.wait_for(|aborted| *aborted).await.is_err();
    if closed {
        // Every abort handle is gone; nothing can cancel this run any more.
        std::future::pending::<()>().await;
    }
}

async fn run_task(
    transport: Arc<dyn ReportTransport>,
    query: ReportQuery,
    failure_message: String,
    mut channels: RunChannels,
    mut abort_rx: watch::Receiver<bool>,
) {
    let session_id = channels.state_tx.borrow().id();
    if !channels.offer(StreamEvent::Started { session_id }) {
        channels.resolve(Err(ReportError::protocol_msg(
            "report receiver dropped before Started",
        )));
        return;
    }
    channels.state_tx.send_modify(StreamSession::begin);
    info!(session_id = %session_id, language = %query.language, "report session started");

    let aborted = *abort_rx.borrow_and_update();
    if aborted {
        channels
            .fail(ReportError::Cancelled, &failure_message, &mut abort_rx)
            .await;
        return;
    }

    let opened = tokio::select! {
        biased;
        _ = wait_for_abort(&mut abort_rx) => Err(ReportError::Cancelled),
        opened = transport.open_stream(&query) => opened,
    };
    let mut body = match opened {
        Ok(body) => body,
        Err(err) => {
            channels.fail(err, &failure_message, &mut abort_rx).await;
            return;
        }
    };

    let mut aggregator = StreamAggregator::events_only();
    loop {
        let next = tokio::select! {
            biased;
            _ = wait_for_abort(&mut abort_rx) => Err(ReportError::Cancelled),
            next = body.next() => Ok(next),
        };
        let (events, ended) = match next {
            Ok(Some(Ok(bytes))) => (aggregator.push_chunk(&bytes), false),
            Ok(None) => (aggregator.finish(), true),
            Ok(Some(Err(err))) | Err(err) => {
                channels.fail(err, &failure_message, &mut abort_rx).await;
                return;
            }
        };
        for event in events {
            if !forward(&mut channels, event) {
                channels.resolve(Err(ReportError::protocol_msg(
                    "report receiver dropped during output",
                )));
                return;
            }
        }
        if ended {
            break;
        }
    }

    channels.state_tx.send_modify(StreamSession::complete);
    let session = channels.state_tx.borrow().clone();
    info!(
        session_id = %session_id,
        bytes = session.output().len(),
        records = aggregator.records_seen(),
        skipped = aggregator.records_skipped(),
        "report session complete"
    );
    let output = session.output().to_string();
    channels.resolve(Ok(output.clone()));
    channels
        .close(
            StreamEvent::Completed {
                output,
                report_id: session.report_id().map(ToOwned::to_owned),
            },
            &mut abort_rx,
        )
        .await;
}

/// Applies one decoded event to the session and relays it to the consumer.
/// Returns false when the consumer is gone.
fn forward(channels: &mut RunChannels, event: ReportEvent) -> bool {
    match event {
        ReportEvent::Chunk { content } => {
            if content.is_empty() {
                return true;
            }
            channels.state_tx.send_modify(|s| s.append(&content));
            channels.push_chunk(&content)
        }
        ReportEvent::Metadata {
            report_id: Some(report_id),
        } => {
            channels
                .state_tx
                .send_modify(|s| s.set_report_id(&report_id));
            if !channels.flush_backlog() {
                return false;
            }
            if !channels.backlog.is_empty() {
                // Sending now would overtake earlier chunk text.
                return true;
            }
            channels.offer(StreamEvent::Metadata { report_id })
        }
        ReportEvent::Complete {
            report_id: Some(report_id),
        } => {
            channels
                .state_tx
                .send_modify(|s| s.set_report_id(&report_id));
            true
        }
        ReportEvent::Metadata { report_id: None }
        | ReportEvent::Complete { report_id: None }
        | ReportEvent::Other { .. } => true,
    }
}
