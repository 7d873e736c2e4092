mod clip;
mod microphone;
mod sink;

pub use clip::{AudioClip, CHANNELS, SAMPLE_RATE};
pub use microphone::{Microphone, MicrophoneRef, NoopMicrophone};
pub use sink::{AudioSink, AudioSinkRef, SimulatedSink, WavFileSink};

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("invalid audio payload: {0}")]
    Decode(String),
    #[error("permission denied")]
    PermissionDenied,
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("playback failed: {0}")]
    Playback(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;
