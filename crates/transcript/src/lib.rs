use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used in role-prefixed transcripts ("USER", "MODEL").
    pub fn as_prefix(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Model => "MODEL",
        }
    }

    /// Human-facing label used in the downloadable transcript.
    pub fn display_label(&self) -> &'static str {
        match self {
            Self::User => "Executive",
            Self::Model => "Reflect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    /// True while the model is still streaming into this turn.
    #[serde(default)]
    pub is_streaming: bool,
}

impl ConversationTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            is_streaming: false,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
            is_streaming: false,
        }
    }

    /// Empty model turn that stream chunks are appended to.
    pub fn streaming_model() -> Self {
        Self {
            role: Role::Model,
            text: String::new(),
            is_streaming: true,
        }
    }

    /// A model turn that has finished streaming.
    pub fn is_finalized_model(&self) -> bool {
        self.role == Role::Model && !self.is_streaming
    }
}

/// Ordered conversation history.
///
/// Append-only, except the last turn which may be mutated while it streams.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    pub turns: Vec<ConversationTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a conversation with the model's greeting as the only turn.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.push(ConversationTurn::model(greeting));
        transcript
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    /// The last turn, if it is a model turn still being streamed.
    pub fn streaming_turn_mut(&mut self) -> Option<&mut ConversationTurn> {
        self.turns
            .last_mut()
            .filter(|t| t.role == Role::Model && t.is_streaming)
    }

    /// Remove the last turn if it is an empty streaming placeholder.
    pub fn discard_empty_streaming_turn(&mut self) -> bool {
        let is_placeholder = self
            .turns
            .last()
            .map(|t| t.role == Role::Model && t.is_streaming && t.text.is_empty())
            .unwrap_or(false);
        if is_placeholder {
            self.turns.pop();
        }
        is_placeholder
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn user_turn_count(&self) -> usize {
        self.turns.iter().filter(|t| t.role == Role::User).count()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// `ROLE: text` lines, one per turn, as sent to the summary model.
    pub fn role_prefixed(&self) -> String {
        role_prefixed(&self.turns)
    }

    /// Plain-text transcript for the user to keep.
    pub fn download_text(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}:\n{}\n", t.role.display_label(), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn download_file_name(date: NaiveDate) -> String {
        format!("Reflect_Assessment_{}.txt", date.format("%Y-%m-%d"))
    }
}

/// Serialize any slice of turns as `ROLE: text` lines.
pub fn role_prefixed(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("{}: {}", t.role.as_prefix(), t.text))
        .collect::<Vec<_>>()
        .join("\n")
}
