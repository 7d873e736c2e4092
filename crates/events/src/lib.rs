//! Telemetry contracts for assessment sessions.
//!
//! This crate defines the records that flow to the telemetry sink and the
//! `TelemetrySink` trait used to emit them. Telemetry is fire-and-forget:
//! the `Telemetry` facade swallows every sink failure so the conversation
//! itself can never be affected by analytics.

mod sink;

pub use sink::{
    InMemoryTelemetry, NullTelemetry, RecordedTelemetry, Telemetry, TelemetrySink,
    TelemetrySinkRef, TracingTelemetry,
};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry sink unavailable")]
    Unavailable,
    #[error("telemetry write failed: {0}")]
    Write(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// A single tracked event within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentEvent {
    pub session_id: String,
    pub event_type: String,
    /// Event-specific payload. Always an object, empty when nothing was attached.
    #[serde(default)]
    pub event_data: serde_json::Value,
    /// Timestamp in milliseconds since epoch.
    #[serde(default)]
    pub ts_ms: i64,
}

impl AssessmentEvent {
    pub fn new(
        session_id: impl Into<String>,
        event_type: impl Into<String>,
        event_data: Option<serde_json::Value>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            event_type: event_type.into(),
            event_data: event_data.unwrap_or_else(|| serde_json::json!({})),
            ts_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// How far a session got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    Started,
    Completed,
    Abandoned,
}

/// Session row written once when an assessment starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub completion_status: CompletionStatus,
    pub message_count: usize,
    pub clicked_lifeline: bool,
    pub clicked_share: bool,
    pub booked_call: bool,
    pub downloaded_pdf: bool,
    pub started_at_ms: i64,
}

impl SessionRecord {
    /// A freshly started session with all counters and flags cleared.
    pub fn started(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            completion_status: CompletionStatus::Started,
            message_count: 0,
            clicked_lifeline: false,
            clicked_share: false,
            booked_call: false,
            downloaded_pdf: false,
            started_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Partial update applied to an existing session row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_status: Option<CompletionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_lifeline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_share: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_call: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloaded_pdf: Option<bool>,
}

/// Event names as constants to prevent typos.
pub mod event_names {
    /// User submitted an utterance.
    pub const MESSAGE_SENT: &str = "message_sent";
    /// Model finished streaming a reply.
    pub const AI_RESPONDED: &str = "ai_responded";
    /// Close signal detected, session is transitioning to results.
    pub const ASSESSMENT_COMPLETE: &str = "assessment_complete";
    /// Results document was shown.
    pub const RESULTS_VIEWED: &str = "results_viewed";
    /// Share text was copied.
    pub const SHARE_CLICKED: &str = "share_clicked";
    /// Strategic brief was downloaded.
    pub const PDF_DOWNLOADED: &str = "pdf_downloaded";
    /// One of the follow-up links was opened.
    pub const LIFELINE_CLICKED: &str = "lifeline_clicked";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_defaults_to_empty_object() {
        let event = AssessmentEvent::new("abc", event_names::RESULTS_VIEWED, None);
        assert_eq!(event.event_data, serde_json::json!({}));
        assert!(event.ts_ms > 0);
    }

    #[test]
    fn test_event_deserialize_minimal() {
        let json = r#"{"session_id": "s1", "event_type": "message_sent"}"#;
        let event: AssessmentEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.session_id, "s1");
        assert_eq!(event.event_data, serde_json::Value::Null);
        assert_eq!(event.ts_ms, 0);
    }

    #[test]
    fn test_started_record() {
        let record = SessionRecord::started("s1");
        assert_eq!(record.completion_status, CompletionStatus::Started);
        assert_eq!(record.message_count, 0);
        assert!(!record.clicked_share && !record.downloaded_pdf);
    }

    #[test]
    fn test_update_skips_unset_fields() {
        let update = SessionUpdate {
            message_count: Some(5),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"message_count": 5})
        );
    }
}
