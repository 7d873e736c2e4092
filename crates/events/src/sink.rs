//! Telemetry sink abstraction.
//!
//! Sinks receive session rows and events. The session runtime only talks to
//! the `Telemetry` facade, which never lets a sink failure escape.

use std::sync::{Arc, Mutex};

use crate::{AssessmentEvent, Result, SessionRecord, SessionUpdate, TelemetryError};

/// Destination for assessment telemetry.
pub trait TelemetrySink: Send + Sync {
    /// Create the session row.
    fn init_session(&self, record: &SessionRecord) -> Result<()>;

    /// Apply a partial update to an existing session row.
    fn update_session(&self, session_id: &str, update: &SessionUpdate) -> Result<()>;

    /// Append one event.
    fn record_event(&self, event: &AssessmentEvent) -> Result<()>;
}

/// Type alias for shared sink reference.
pub type TelemetrySinkRef = Arc<dyn TelemetrySink>;

/// Everything an `InMemoryTelemetry` has received.
#[derive(Debug, Clone, Default)]
pub struct RecordedTelemetry {
    pub sessions: Vec<SessionRecord>,
    pub updates: Vec<(String, SessionUpdate)>,
    pub events: Vec<AssessmentEvent>,
}

/// In-memory sink for testing.
#[derive(Default)]
pub struct InMemoryTelemetry {
    recorded: Mutex<RecordedTelemetry>,
    failing: bool,
}

impl InMemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every call fails, for exercising the swallow path.
    pub fn failing() -> Self {
        Self {
            recorded: Mutex::default(),
            failing: true,
        }
    }

    pub fn snapshot(&self) -> RecordedTelemetry {
        self.recorded.lock().unwrap().clone()
    }

    /// Events with the given type, in arrival order.
    pub fn events_named(&self, event_type: &str) -> Vec<AssessmentEvent> {
        self.recorded
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }

    fn check(&self) -> Result<()> {
        if self.failing {
            return Err(TelemetryError::Unavailable);
        }
        Ok(())
    }
}

impl TelemetrySink for InMemoryTelemetry {
    fn init_session(&self, record: &SessionRecord) -> Result<()> {
        self.check()?;
        self.recorded.lock().unwrap().sessions.push(record.clone());
        Ok(())
    }

    fn update_session(&self, session_id: &str, update: &SessionUpdate) -> Result<()> {
        self.check()?;
        self.recorded
            .lock()
            .unwrap()
            .updates
            .push((session_id.to_string(), update.clone()));
        Ok(())
    }

    fn record_event(&self, event: &AssessmentEvent) -> Result<()> {
        self.check()?;
        self.recorded.lock().unwrap().events.push(event.clone());
        Ok(())
    }
}

/// Discards everything.
pub struct NullTelemetry;

impl TelemetrySink for NullTelemetry {
    fn init_session(&self, _record: &SessionRecord) -> Result<()> {
        Ok(())
    }

    fn update_session(&self, _session_id: &str, _update: &SessionUpdate) -> Result<()> {
        Ok(())
    }

    fn record_event(&self, _event: &AssessmentEvent) -> Result<()> {
        Ok(())
    }
}

/// Writes telemetry as structured log lines under the `reflect::telemetry` target.
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn init_session(&self, record: &SessionRecord) -> Result<()> {
        tracing::info!(
            target: "reflect::telemetry",
            session_id = %record.session_id,
            status = ?record.completion_status,
            "session started"
        );
        Ok(())
    }

    fn update_session(&self, session_id: &str, update: &SessionUpdate) -> Result<()> {
        let fields =
            serde_json::to_string(update).map_err(|e| TelemetryError::Write(e.to_string()))?;
        tracing::info!(target: "reflect::telemetry", session_id, %fields, "session updated");
        Ok(())
    }

    fn record_event(&self, event: &AssessmentEvent) -> Result<()> {
        tracing::info!(
            target: "reflect::telemetry",
            session_id = %event.session_id,
            event_type = %event.event_type,
            data = %event.event_data,
            "event"
        );
        Ok(())
    }
}

/// Session-scoped, fire-and-forget telemetry handle.
///
/// Holds an optional sink; without one every call is a no-op. Sink errors are
/// logged at debug level and dropped.
#[derive(Clone)]
pub struct Telemetry {
    sink: Option<TelemetrySinkRef>,
    session_id: String,
}

impl Telemetry {
    /// Create a telemetry handle for a new session id.
    pub fn new(sink: Option<TelemetrySinkRef>) -> Self {
        Self {
            sink,
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Handle that never records anything.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn init_session(&self) {
        let Some(sink) = &self.sink else { return };
        if let Err(e) = sink.init_session(&SessionRecord::started(&self.session_id)) {
            tracing::debug!("telemetry init_session dropped: {}", e);
        }
    }

    pub fn update_session(&self, update: SessionUpdate) {
        let Some(sink) = &self.sink else { return };
        if let Err(e) = sink.update_session(&self.session_id, &update) {
            tracing::debug!("telemetry update_session dropped: {}", e);
        }
    }

    pub fn track(&self, event_type: &str, data: Option<serde_json::Value>) {
        let Some(sink) = &self.sink else { return };
        let event = AssessmentEvent::new(&self.session_id, event_type, data);
        if let Err(e) = sink.record_event(&event) {
            tracing::debug!(event_type, "telemetry event dropped: {}", e);
        }
    }
}

impl std::fmt::Debug for Telemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Telemetry")
            .field("enabled", &self.sink.is_some())
            .field("session_id", &self.session_id)
            .finish()
    }
}
