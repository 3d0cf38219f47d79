//! Folds a raw report stream into a single growing markdown buffer.

use futures::{Stream, StreamExt as _};
use tracing::{debug, warn};

use crate::errors::ReportError;
use crate::record::{DataRecord, RecordDecoder, ReportEvent, map_record_to_event};

/// Incremental decoder plus the output buffer it feeds.
///
/// Feed reads with [`StreamAggregator::push_chunk`] in arrival order and call
/// [`StreamAggregator::finish`] once the transport reports end of stream.
/// Only `chunk` records change the output; it is never truncated.
#[derive(Default)]
pub struct StreamAggregator {
    decoder: RecordDecoder,
    output: String,
    report_id: Option<String>,
    records: u64,
    skipped: u64,
    discard_output: bool,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes and counts records without keeping the text; `output()` stays
    /// empty. For callers that store chunk text themselves.
    pub(crate) fn events_only() -> Self {
        Self {
            discard_output: true,
            ..Self::default()
        }
    }

    /// Consumes one read and returns the events of every record it completed.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<ReportEvent> {
        let records = self.decoder.push_chunk(chunk);
        let mut events = Vec::with_capacity(records.len());
        for record in records {
            if let Some(event) = self.apply(&record) {
                events.push(event);
            }
        }
        events
    }

    /// Flushes a trailing record that arrived without its blank line.
    pub fn finish(&mut self) -> Vec<ReportEvent> {
        let pending = self.decoder.pending_len();
        if pending > 0 {
            debug!(bytes = pending, "flushing unterminated trailing record");
        }
        match self.decoder.finish() {
            Some(record) => self.apply(&record).into_iter().collect(),
            None => Vec::new(),
        }
    }

    fn apply(&mut self, record: &DataRecord) -> Option<ReportEvent> {
        self.records += 1;
        let event = match map_record_to_event(record) {
            Ok(event) => event,
            Err(err) => {
                self.skipped += 1;
                warn!(error = %err, "skipping malformed report record");
                return None;
            }
        };
        match &event {
            ReportEvent::Chunk { content } => {
                debug!(bytes = content.len(), "report chunk");
                if !self.discard_output {
                    self.output.push_str(content);
                }
            }
            ReportEvent::Metadata { report_id } | ReportEvent::Complete { report_id } => {
                if report_id.is_some() {
                    self.report_id.clone_from(report_id);
                }
            }
            ReportEvent::Other { kind } => {
                debug!(kind = kind.as_deref().unwrap_or("<none>"), "ignoring report record");
            }
        }
        Some(event)
    }

    /// Text accumulated so far.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Consumes the aggregator and returns the accumulated text.
    pub fn into_output(self) -> String {
        self.output
    }

    /// Report id announced by the service, if any.
    pub fn report_id(&self) -> Option<&str> {
        self.report_id.as_deref()
    }

    /// Count of `data:` records seen, including skipped ones.
    pub fn records_seen(&self) -> u64 {
        self.records
    }

    /// Count of `data:` records dropped because their payload was malformed.
    pub fn records_skipped(&self) -> u64 {
        self.skipped
    }
}

/// Drains a byte stream to its end and returns the aggregated text.
///
/// The first read error aborts the fold.
pub async fn aggregate_stream<S, B, E>(mut stream: S) -> Result<String, ReportError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut aggregator = StreamAggregator::new();
    while let Some(next) = stream.next().await {
        let chunk = next.map_err(|e| ReportError::Stream(e.to_string()))?;
        aggregator.push_chunk(chunk.as_ref());
    }
    aggregator.finish();
    Ok(aggregator.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    const HELLO: &str = "data: {\"type\":\"chunk\",\"content\":\"Hello \"}\n\n";
    const WORLD: &str = "data: {\"type\":\"chunk\",\"content\":\"World\"}\n\n";

    fn fold(reads: &[&[u8]]) -> StreamAggregator {
        let mut aggregator = StreamAggregator::new();
        for read in reads {
            aggregator.push_chunk(read);
        }
        aggregator.finish();
        aggregator
    }

    #[test]
    fn two_reads_concatenate() {
        let aggregator = fold(&[HELLO.as_bytes(), WORLD.as_bytes()]);
        assert_eq!(aggregator.output(), "Hello World");
        assert_eq!(aggregator.records_seen(), 2);
    }

    #[test]
    fn record_split_mid_json_is_appended_once() {
        let aggregator = fold(&[
            b"data: {\"typ",
            b"e\":\"chunk\",\"content\":\"X\"}\n\n",
        ]);
        assert_eq!(aggregator.output(), "X");
    }

    #[test]
    fn output_is_independent_of_read_boundaries() {
        let body = concat!(
            "data: {\"type\":\"metadata\",\"report_id\":\"r-1\",\"query\":\"q\"}\n\n",
            ": comment\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"## تحلیل\\n\"}\n\n",
            "data: not json\n\n",
            "data: {\"type\":\"chunk\",\"content\":\"بازار مسکن\"}\r\n\r\n",
            "data: {\"type\":\"status\",\"content\":\"ignored\"}\n\n",
            "data: {\"type\":\"complete\",\"report_id\":\"r-1\"}\n\n",
        )
        .as_bytes();
        let whole = fold(&[body]);
        assert_eq!(whole.output(), "## تحلیل\nبازار مسکن");

        for size in 1..body.len() {
            let reads: Vec<&[u8]> = body.chunks(size).collect();
            let split = fold(&reads);
            assert_eq!(split.output(), whole.output(), "read size {size}");
            assert_eq!(split.report_id(), Some("r-1"));
        }
    }

    #[test]
    fn non_data_records_are_ignored() {
        let aggregator = fold(&[
            b"event: chunk\n\n",
            b"id: 7\n\n",
            HELLO.as_bytes(),
        ]);
        assert_eq!(aggregator.output(), "Hello ");
        assert_eq!(aggregator.records_seen(), 1);
    }

    #[test]
    fn invalid_json_is_skipped_and_counted() {
        let aggregator = fold(&[b"data: {\"type\":\"chunk\",\n\n", WORLD.as_bytes()]);
        assert_eq!(aggregator.output(), "World");
        assert_eq!(aggregator.records_skipped(), 1);
    }

    #[test]
    fn non_chunk_types_leave_output_unchanged() {
        let mut aggregator = StreamAggregator::new();
        aggregator.push_chunk(HELLO.as_bytes());
        let events = aggregator
            .push_chunk(b"data: {\"type\":\"progress\",\"content\":\"50%\"}\n\n");
        assert_eq!(
            events,
            vec![ReportEvent::Other {
                kind: Some("progress".into())
            }]
        );
        assert_eq!(aggregator.output(), "Hello ");
    }

    #[test]
    fn trailing_record_without_delimiter_is_flushed_on_finish() {
        let mut aggregator = StreamAggregator::new();
        let events = aggregator.push_chunk(WORLD.trim_end().as_bytes());
        assert!(events.is_empty());
        assert_eq!(aggregator.output(), "");
        aggregator.finish();
        assert_eq!(aggregator.output(), "World");
    }

    #[test]
    fn events_only_returns_chunks_without_buffering_them() {
        let mut aggregator = StreamAggregator::events_only();
        let events = aggregator.push_chunk(HELLO.as_bytes());
        assert_eq!(
            events,
            vec![ReportEvent::Chunk {
                content: "Hello ".into()
            }]
        );
        assert_eq!(aggregator.output(), "");
        assert_eq!(aggregator.records_seen(), 1);
    }

    #[tokio::test]
    async fn aggregate_stream_folds_until_end() {
        let reads: Vec<Result<&[u8], String>> = vec![Ok(HELLO.as_bytes()), Ok(WORLD.as_bytes())];
        let text = aggregate_stream(stream::iter(reads)).await.expect("fold");
        assert_eq!(text, "Hello World");
    }

    #[tokio::test]
    async fn aggregate_stream_stops_on_read_error() {
        let reads: Vec<Result<&[u8], String>> =
            vec![Ok(HELLO.as_bytes()), Err("connection reset".into())];
        let err = aggregate_stream(stream::iter(reads))
            .await
            .expect_err("read error");
        assert_eq!(err, ReportError::Stream("connection reset".into()));
    }
}
