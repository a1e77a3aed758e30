//! Telemetry and structured logging for perceptor.
//!
//! Console + rolling NDJSON output, log redaction, and the pipeline event log.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogEntry, EventLogger, PipelineEvent};
pub use logger::{LoggerOptions, init_logger};
pub use redact::redact_sensitive_data;
