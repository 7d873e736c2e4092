//! Contracts for the hosted generative model.
//!
//! The session core only sees these traits. `reflect-gemini` implements them
//! over HTTP; tests implement them with scripted fakes.

mod retry;

pub use retry::{synthesize_with_retry, RetryPolicy};

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Request(String),
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("empty response")]
    EmptyResponse,
}

impl LlmError {
    /// Rate-limit class errors (HTTP 429 or `RESOURCE_EXHAUSTED`) are the
    /// only ones worth retrying.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                *status == 429 || message.contains("RESOURCE_EXHAUSTED")
            }
            Self::Request(message) | Self::Decode(message) => {
                message.contains("429") || message.contains("RESOURCE_EXHAUSTED")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// Parameters fixed for the lifetime of a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
}

/// One increment of streamed model output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatChunk {
    pub text: String,
}

impl ChatChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Finite, non-restartable sequence of chunks for one turn.
pub type ChatStream = BoxStream<'static, Result<ChatChunk>>;

/// Opens chat sessions.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn create_session(&self, config: &ChatConfig) -> Result<Arc<dyn ChatSession>>;
}

/// A multi-turn conversation that remembers its own history.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Send a user message and stream back the model reply.
    ///
    /// The reply is added to the session history once the stream is drained.
    async fn send_stream(&self, text: &str) -> Result<ChatStream>;
}

/// Text-to-speech.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` into base64-encoded 24 kHz mono s16le PCM.
    async fn synthesize(&self, text: &str) -> Result<String>;
}

/// Single-shot JSON generation for the end-of-session summary.
#[async_trait]
pub trait SummaryApi: Send + Sync {
    /// Returns the raw response text, expected to hold a JSON object.
    async fn generate_summary(&self, prompt: &str) -> Result<String>;
}

pub type ChatApiRef = Arc<dyn ChatApi>;
pub type SpeechSynthesizerRef = Arc<dyn SpeechSynthesizer>;
pub type SummaryApiRef = Arc<dyn SummaryApi>;
