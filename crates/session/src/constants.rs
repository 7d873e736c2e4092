use std::time::Duration;

/// Silence after a final recognition result before the utterance is sent.
pub const FINAL_DEBOUNCE: Duration = Duration::from_millis(1200);

/// Silence after an interim recognition result before the utterance is sent.
pub const INTERIM_DEBOUNCE: Duration = Duration::from_millis(2000);

/// Delay before restarting a recognizer that stopped on its own.
pub const RECOGNIZER_RESTART_DELAY: Duration = Duration::from_millis(300);

/// Grace period for late synthesis results before speaking is declared over.
pub const SPEECH_END_GRACE: Duration = Duration::from_millis(100);

/// Delay between detecting a close signal and completing the session.
pub const CLOSE_TRANSITION_DELAY: Duration = Duration::from_millis(3000);

/// Merged sentence spans longer than this are dispatched to synthesis.
pub const SEGMENT_MERGE_CHARS: usize = 20;

/// User turns required before the manual finish becomes available.
pub const FALLBACK_EXIT_USER_TURNS: usize = 6;

/// Locale the recognizer is started with.
pub const RECOGNIZER_LOCALE: &str = "en-US";

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
