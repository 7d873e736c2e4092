use std::sync::atomic::{AtomicBool, Ordering};

use reflect_session::{Recognizer, RecognizerError, RecognizerEvent};
use tokio::sync::mpsc;

/// Stands in for a speech engine: while it is running, typed lines are
/// treated as final recognition results.
pub struct TerminalRecognizer {
    running: AtomicBool,
    events: mpsc::UnboundedSender<RecognizerEvent>,
}

impl TerminalRecognizer {
    pub fn new(events: mpsc::UnboundedSender<RecognizerEvent>) -> Self {
        Self {
            running: AtomicBool::new(false),
            events,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Report a typed line as heard speech. Returns false when not listening.
    pub fn hear(&self, line: &str) -> bool {
        if !self.is_listening() {
            return false;
        }
        let _ = self.events.send(RecognizerEvent::final_result(line));
        true
    }
}

impl Recognizer for TerminalRecognizer {
    fn start(&self, locale: &str) -> Result<(), RecognizerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RecognizerError::AlreadyStarted);
        }
        tracing::debug!(locale, "Terminal recognizer listening");
        let _ = self.events.send(RecognizerEvent::Started);
        Ok(())
    }

    fn abort(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
