//! Wire records of the report stream.
//!
//! The body is a sequence of blank-line separated records; the relevant ones
//! start with `data:` and carry a JSON object `{ "type": .., "content": .. }`.

use crate::errors::RecordError;

const DATA_PREFIX: &str = "data:";

/// One complete `data:` record with its payload joined into a single string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DataRecord {
    pub data: String,
}

/// Incremental splitter with a carry-over buffer.
///
/// Bytes are held until a full record (terminated by a blank line) is
/// available, so records and UTF-8 sequences split across reads are
/// reassembled before they are parsed.
#[derive(Default)]
pub(crate) struct RecordDecoder {
    buf: Vec<u8>,
}

impl RecordDecoder {
    /// Appends a read and returns every record it completed, left to right.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<DataRecord> {
        // Held bytes contain no delimiter; only the last three can start one.
        let mut from = self.buf.len().saturating_sub(3);
        self.buf.extend_from_slice(chunk);
        let mut records = Vec::new();
        let mut start = 0;
        while let Some((idx, delim_len)) = find_record_delimiter(&self.buf, from) {
            if let Some(record) = parse_record(&self.buf[start..idx]) {
                records.push(record);
            }
            start = idx + delim_len;
            from = start;
        }
        self.buf.drain(..start);
        records
    }

    /// Flushes whatever is still held once the stream has ended.
    pub fn finish(&mut self) -> Option<DataRecord> {
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        parse_record(&rest)
    }

    /// Number of bytes held back waiting for a delimiter.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }
}

/// Finds the first blank-line delimiter at or after `from`.
fn find_record_delimiter(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    let mut i = from;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_record(bytes: &[u8]) -> Option<DataRecord> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches(['\r', '\n']);
    if !text.starts_with(DATA_PREFIX) {
        return None;
    }
    let data_lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(str::trim_start)
        .collect();
    Some(DataRecord {
        data: data_lines.join("\n"),
    })
}

/// Event carried by one decoded record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// First record of a stream; announces the server-side report id.
    Metadata { report_id: Option<String> },
    /// Report content to append to the buffer.
    Chunk { content: String },
    /// Last record of a successful stream.
    Complete { report_id: Option<String> },
    /// Any other record type; ignored by the aggregator.
    Other { kind: Option<String> },
}

#[derive(serde::Deserialize)]
struct RecordPayload {
    #[serde(rename = "type")]
    kind: Option<String>,
    content: Option<String>,
    report_id: Option<String>,
}

pub(crate) fn map_record_to_event(record: &DataRecord) -> Result<ReportEvent, RecordError> {
    let payload: RecordPayload =
        serde_json::from_str(&record.data).map_err(|e| RecordError::InvalidJson {
            message: e.to_string(),
            payload: record.data.clone(),
        })?;
    let event = match payload.kind.as_deref() {
        Some("chunk") => ReportEvent::Chunk {
            content: payload.content.unwrap_or_default(),
        },
        Some("metadata") => ReportEvent::Metadata {
            report_id: payload.report_id,
        },
        Some("complete") => ReportEvent::Complete {
            report_id: payload.report_id,
        },
        _ => ReportEvent::Other { kind: payload.kind },
    };
    Ok(event)
}
