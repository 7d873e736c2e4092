//! Debounced aggregation of recognizer output into utterances.

use std::time::Duration;

use tokio::time::Instant;

use crate::constants::{FINAL_DEBOUNCE, INTERIM_DEBOUNCE};

/// Collects recognizer text until the speaker goes quiet.
///
/// Holds a single silence deadline; every non-empty result replaces it.
/// The caller polls [`TranscriptAggregator::take_expired`] once the deadline
/// passes.
#[derive(Debug)]
pub struct TranscriptAggregator {
    pending: String,
    interim: String,
    deadline: Option<Instant>,
    final_debounce: Duration,
    interim_debounce: Duration,
}

impl Default for TranscriptAggregator {
    fn default() -> Self {
        Self::new(FINAL_DEBOUNCE, INTERIM_DEBOUNCE)
    }
}

impl TranscriptAggregator {
    pub fn new(final_debounce: Duration, interim_debounce: Duration) -> Self {
        Self {
            pending: String::new(),
            interim: String::new(),
            deadline: None,
            final_debounce,
            interim_debounce,
        }
    }

    /// Feed one recognizer event. Returns false if it carried no text.
    ///
    /// Final text wins over interim text from the same event.
    pub fn on_result(&mut self, interim: &str, final_text: &str, now: Instant) -> bool {
        if !final_text.is_empty() {
            self.pending = format!("{} {}", self.pending, final_text).trim().to_string();
            self.interim.clear();
            self.deadline = Some(now + self.final_debounce);
        } else if !interim.is_empty() {
            self.interim = interim.to_string();
            self.deadline = Some(now + self.interim_debounce);
        } else {
            return false;
        }
        true
    }

    /// Text to show in the input box: the live interim preview if any,
    /// otherwise the accumulated final text.
    pub fn preview(&self) -> &str {
        if self.interim.is_empty() {
            &self.pending
        } else {
            &self.interim
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// If the silence deadline has passed, take the utterance and reset.
    pub fn take_expired(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if deadline <= now => {}
            _ => return None,
        }

        let utterance = if self.interim.is_empty() {
            self.pending.clone()
        } else {
            format!("{} {}", self.pending, self.interim).trim().to_string()
        };
        self.reset();
        Some(utterance)
    }

    /// Keep `text` as pending speech without arming a deadline.
    pub fn hold(&mut self, text: &str) {
        self.pending = text.to_string();
        self.interim.clear();
        self.deadline = None;
    }

    /// Drop the deadline but keep the text.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.interim.clear();
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_final_text_submits_after_final_window() {
        let start = Instant::now();
        let mut agg = TranscriptAggregator::default();

        assert!(agg.on_result("", "We want", start));
        assert!(agg.on_result("", "faster close", start + ms(500)));
        assert_eq!(agg.preview(), "We want faster close");

        assert_eq!(agg.take_expired(start + ms(1699)), None);
        assert_eq!(
            agg.take_expired(start + ms(1700)).as_deref(),
            Some("We want faster close")
        );
        assert_eq!(agg.preview(), "");
        assert_eq!(agg.deadline(), None);
    }

    #[test]
    fn test_interim_uses_longer_window_and_appends() {
        let start = Instant::now();
        let mut agg = TranscriptAggregator::default();

        agg.on_result("", "Mostly", start);
        agg.on_result("the data te", "", start + ms(100));
        assert_eq!(agg.preview(), "the data te");
        assert_eq!(agg.deadline(), Some(start + ms(2100)));

        assert_eq!(agg.take_expired(start + ms(1300)), None);
        assert_eq!(
            agg.take_expired(start + ms(2100)).as_deref(),
            Some("Mostly the data te")
        );
    }

    #[test]
    fn test_final_clears_interim() {
        let start = Instant::now();
        let mut agg = TranscriptAggregator::default();

        agg.on_result("hel", "", start);
        agg.on_result("", "hello", start + ms(50));
        assert_eq!(agg.preview(), "hello");
        assert_eq!(agg.deadline(), Some(start + ms(1250)));
    }

    #[test]
    fn test_empty_event_is_noop() {
        let start = Instant::now();
        let mut agg = TranscriptAggregator::default();

        agg.on_result("", "hi", start);
        assert!(!agg.on_result("", "", start + ms(1000)));
        assert_eq!(agg.deadline(), Some(start + ms(1200)));
    }

    #[test]
    fn test_cancel_keeps_text() {
        let start = Instant::now();
        let mut agg = TranscriptAggregator::default();

        agg.on_result("", "keep me", start);
        agg.cancel();
        assert_eq!(agg.take_expired(start + ms(5000)), None);
        assert_eq!(agg.preview(), "keep me");
    }

    #[test]
    fn test_held_text_is_extended_by_next_result() {
        let start = Instant::now();
        let mut agg = TranscriptAggregator::default();

        agg.hold("first part");
        assert_eq!(agg.preview(), "first part");
        assert_eq!(agg.take_expired(start + ms(5000)), None);

        agg.on_result("", "second part", start);
        assert_eq!(
            agg.take_expired(start + ms(1200)).as_deref(),
            Some("first part second part")
        );
    }
}
