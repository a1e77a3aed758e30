//! Pipeline Event Logger
//!
//! Per-sentence emotion tags, per-frame results and session closes, written
//! through `tracing` on the `pipeline_events` target so the NDJSON file layer
//! picks them up.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    SentenceTagged {
        index: usize,
        sentence: String,
        emotion: String,
    },
    FrameProcessed {
        frame: u64,
        detected: Option<String>,
        latency_ms: u64,
    },
    SessionClosed {
        frames: u64,
        reason: String,
    },
}

#[derive(Debug, Serialize)]
pub struct EventLogEntry {
    pub scope: String,
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Redact free-text fields, then emit the event as one JSON line.
    pub fn log_event(scope: &str, event: PipelineEvent) -> EventLogEntry {
        let event = match event {
            PipelineEvent::SentenceTagged {
                index,
                sentence,
                emotion,
            } => PipelineEvent::SentenceTagged {
                index,
                sentence: redact_sensitive_data(&sentence),
                emotion,
            },
            PipelineEvent::SessionClosed { frames, reason } => PipelineEvent::SessionClosed {
                frames,
                reason: redact_sensitive_data(&reason),
            },
            other => other,
        };

        let entry = EventLogEntry {
            scope: scope.to_string(),
            timestamp: Utc::now(),
            event,
        };

        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "pipeline_events", event = %json, "Pipeline event");
        entry
    }
}
