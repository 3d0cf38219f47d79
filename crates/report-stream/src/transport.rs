use std::pin::Pin;

use crate::errors::ReportError;
use crate::model::ReportQuery;

/// Raw report body, delivered in reads of arbitrary size.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, ReportError>> + Send + 'static>>;

/// Source of report byte streams.
///
/// `ReportClient` implements this over HTTP; tests plug in canned streams.
#[async_trait::async_trait]
pub trait ReportTransport: Send + Sync {
    /// Issues the request for `query` and returns the response body stream.
    ///
    /// Errors returned here (and items of the stream) are transport failures
    /// and end the session.
    async fn open_stream(&self, query: &ReportQuery) -> Result<ByteStream, ReportError>;
}
