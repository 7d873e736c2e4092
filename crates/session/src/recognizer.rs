//! Speech recognizer contract.
//!
//! The host owns the actual engine. The session starts and aborts it through
//! [`Recognizer`], and the host forwards whatever the engine reports as
//! [`RecognizerEvent`]s through the session handle.

use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecognizerError {
    #[error("speech recognition not supported")]
    Unsupported,
    #[error("recognizer already started")]
    AlreadyStarted,
}

/// Continuous, interim-enabled recognizer.
pub trait Recognizer: Send + Sync {
    /// Begin listening for speech in `locale`, a BCP 47 tag such as `en-US`.
    fn start(&self, locale: &str) -> Result<(), RecognizerError>;

    /// Stop immediately, discarding pending results. Must tolerate being
    /// called when already stopped.
    fn abort(&self);
}

pub type RecognizerRef = Arc<dyn Recognizer>;

/// One hypothesis in a result event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub transcript: String,
    pub is_final: bool,
}

impl RecognitionResult {
    pub fn final_text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: true,
        }
    }

    pub fn interim(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            is_final: false,
        }
    }
}

/// Error codes reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorCode {
    NoSpeech,
    Aborted,
    NotAllowed,
    ServiceNotAllowed,
    Network,
    Other(String),
}

impl RecognitionErrorCode {
    pub fn parse(code: &str) -> Option<Self> {
        Some(match code {
            "" => return None,
            "no-speech" => Self::NoSpeech,
            "aborted" => Self::Aborted,
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "network" => Self::Network,
            other => Self::Other(other.to_string()),
        })
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NoSpeech | Self::Aborted => ErrorSeverity::Ignored,
            Self::NotAllowed | Self::ServiceNotAllowed => ErrorSeverity::Fatal,
            Self::Network => ErrorSeverity::Surfaced,
            Self::Other(_) => ErrorSeverity::Logged,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// No visible effect.
    Ignored,
    /// Shown to the user, recognizer keeps restarting.
    Surfaced,
    /// Turns voice mode off.
    Fatal,
    /// Only written to the log.
    Logged,
}

pub const MIC_BLOCKED_MESSAGE: &str = "Microphone blocked or not allowed.";
pub const NETWORK_ERROR_MESSAGE: &str = "Network error with speech recognition.";
pub const UNSUPPORTED_MESSAGE: &str = "Speech recognition not supported.";

/// Lifecycle and result events coming from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    Started,
    Result {
        results: Vec<RecognitionResult>,
        result_index: usize,
    },
    Ended,
    Error(Option<RecognitionErrorCode>),
}

impl RecognizerEvent {
    /// A result event holding a single final hypothesis.
    pub fn final_result(text: impl Into<String>) -> Self {
        Self::Result {
            results: vec![RecognitionResult::final_text(text)],
            result_index: 0,
        }
    }

    /// A result event holding a single interim hypothesis.
    pub fn interim_result(text: impl Into<String>) -> Self {
        Self::Result {
            results: vec![RecognitionResult::interim(text)],
            result_index: 0,
        }
    }

    /// `(interim, final)` text of a result event, from `result_index` onward.
    pub fn split(&self) -> Option<(String, String)> {
        let Self::Result {
            results,
            result_index,
        } = self
        else {
            return None;
        };

        let mut interim = String::new();
        let mut final_text = String::new();
        for result in results.iter().skip(*result_index) {
            if result.is_final {
                final_text.push_str(&result.transcript);
            } else {
                interim.push_str(&result.transcript);
            }
        }
        Some((interim, final_text))
    }
}
