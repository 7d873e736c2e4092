//! Conversational assessment session.
//!
//! A [`SessionRuntime`] owns the transcript and the voice loop
//! (listen → debounce → send → stream → segment → synthesize → play → listen)
//! and publishes [`SessionNotice`]s as state changes. Front ends drive it
//! through a [`SessionHandle`].

pub mod close_signal;
pub mod config;
pub mod constants;
mod controller;
mod notice;
pub mod recognizer;
mod runtime;
pub mod voice;

pub use close_signal::{contains_close_signal, CLOSE_SIGNAL_PHRASES};
pub use config::{AssessmentConfig, ConfigError, VoiceTimings};
pub use controller::{
    SessionCommand, SessionDeps, CHAT_UNAVAILABLE_MESSAGE, MIC_UNAVAILABLE_MESSAGE,
};
pub use notice::{SessionNotice, SessionSnapshot};
pub use recognizer::{
    RecognitionErrorCode, RecognitionResult, Recognizer, RecognizerError, RecognizerEvent,
    RecognizerRef,
};
pub use runtime::{SessionHandle, SessionRuntime};
pub use voice::VoiceStatus;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, SessionError>;
