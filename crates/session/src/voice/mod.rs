//! Voice pipeline building blocks.
//!
//! - `TranscriptAggregator`: recognizer results to utterances
//! - `SentenceSegmenter`: streamed reply to speakable units
//! - `PlaybackQueue` / `ClipSequencer`: synthesized units to ordered playback

mod aggregator;
mod playback;
mod segmenter;

pub use aggregator::TranscriptAggregator;
pub use playback::{ClipSequencer, PlaybackQueue};
pub use segmenter::SentenceSegmenter;

use serde::Serialize;

/// What the voice loop is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceStatus {
    #[default]
    Idle,
    Listening,
    Processing,
    Speaking,
}

impl VoiceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Listening => "listening",
            Self::Processing => "processing",
            Self::Speaking => "speaking",
        }
    }
}

impl std::fmt::Display for VoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
