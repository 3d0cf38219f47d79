//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, ClientConfig, Language, ReportClient, ReportDesk, ReportError, ReportQuery,
    ReportRun, SessionStatus, StreamEvent, StreamSession,
};
