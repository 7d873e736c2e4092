use reflect_transcript::ConversationTurn;
use serde::Serialize;

use crate::voice::VoiceStatus;

/// State changes published to the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotice {
    TurnAppended {
        index: usize,
        turn: ConversationTurn,
    },
    TurnUpdated {
        index: usize,
        text: String,
        is_streaming: bool,
    },
    TurnRemoved {
        index: usize,
    },
    StatusChanged(VoiceStatus),
    VoiceModeChanged(bool),
    /// Text to show in the input box while the user is speaking.
    InputPreview(String),
    /// Error banner, `None` clears it.
    Banner(Option<String>),
    Loading(bool),
    /// A close signal was detected. No further input is accepted.
    Transitioning,
    /// The conversation is over. Sent exactly once.
    Completed(Vec<ConversationTurn>),
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub turns: Vec<ConversationTurn>,
    pub status: VoiceStatus,
    pub voice_mode: bool,
    pub loading: bool,
    pub transitioning: bool,
    pub completed: bool,
    pub input_preview: String,
    pub banner: Option<String>,
    /// Whether the manual "finish now" exit is offered.
    pub fallback_available: bool,
}
