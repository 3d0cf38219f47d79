//! Streaming client for the report-generation service.
//!
//! The service answers a natural-language query with a markdown report sent
//! as a stream of blank-line separated `data:` records. This crate decodes
//! that stream incrementally, folds the `chunk` records into one growing
//! buffer, and exposes the buffer and session status to a front end.
//!
//! # Usage
//!
//! ```no_run
//! use report_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ReportError> {
//! let client = ReportClient::from_env()?;
//! let query = client.query("What drives the housing market cycle?");
//! let desk = client.into_desk()?;
//!
//! let mut run = desk.start(query).await?;
//! while let Some(event) = run.next_event().await {
//!     match event {
//!         StreamEvent::Chunk { text, .. } => print!("{text}"),
//!         StreamEvent::Failed { message, .. } => eprintln!("{message}"),
//!         _ => {}
//!     }
//! }
//! let report = run.finish().await?;
//! println!("\n{} bytes", report.len());
//! # Ok(())
//! # }
//! ```

/// Incremental decoder and chunk fold.
pub mod aggregator;
/// HTTP client for the report service.
pub mod client;
/// Client configuration.
pub mod config;
/// Session owner that supersedes stale runs.
pub mod desk;
/// Public error types.
pub mod errors;
/// Request and response types of the service.
pub mod model;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Wire record decoding.
pub mod record;
/// Markdown rendering of finished reports.
pub mod render;
/// Run handle, run task and cancellation.
pub mod run;
/// Session state exposed to observers.
pub mod session;
/// Events emitted by a run.
pub mod stream;
/// Transport contract for report byte streams.
pub mod transport;

pub use aggregator::{StreamAggregator, aggregate_stream};
pub use client::ReportClient;
pub use config::ClientConfig;
pub use desk::{ReportDesk, ReportDeskBuilder};
pub use errors::{FAILURE_MESSAGE, RecordError, ReportError};
pub use model::{
    DeleteAck, GeneratedReport, HealthStatus, Language, ReportListing, ReportQuery,
    ReportSummary, StoredReport,
};
pub use record::ReportEvent;
pub use run::{AbortHandle, ReportRun};
pub use session::{SessionStatus, StreamSession};
pub use stream::StreamEvent;
pub use transport::{ByteStream, ReportTransport};
