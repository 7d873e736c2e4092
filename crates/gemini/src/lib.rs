//! Gemini REST implementation of the `reflect-llm` contracts.

mod api;
mod chat;
mod sse;

pub use chat::GeminiChatSession;
pub use sse::SseDecoder;

use std::sync::Arc;

use async_trait::async_trait;
use reflect_llm::{
    ChatApi, ChatConfig, ChatSession, LlmError, Result, SpeechSynthesizer, SummaryApi,
};

use api::{
    Content, ErrorEnvelope, GenerateRequest, GenerateResponse, GenerationConfig,
    PrebuiltVoiceConfig, SpeechConfig, VoiceConfig,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TTS_MODEL: &str = "gemini-2.5-flash-preview-tts";
pub const DEFAULT_TTS_VOICE: &str = "Kore";
pub const DEFAULT_SUMMARY_MODEL: &str = "gemini-3-flash-preview";

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiOptions {
    pub api_key: String,
    pub base_url: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub summary_model: String,
}

impl GeminiOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DEFAULT_TTS_VOICE.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
        }
    }

    /// Read `GEMINI_API_KEY` and the optional `GEMINI_BASE_URL` override.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or(LlmError::MissingApiKey)?;
        let mut options = Self::new(api_key);
        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            options.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(options)
    }
}

/// Shared HTTP client for chat, speech and summary calls.
#[derive(Clone)]
pub struct GeminiClient {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) http: reqwest::Client,
    pub(crate) options: GeminiOptions,
}

impl GeminiClient {
    pub fn new(options: GeminiOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                options,
            }),
        }
    }

    async fn generate(&self, model: &str, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = self.inner.endpoint(model, "generateContent");
        let response = self
            .inner
            .http
            .post(&url)
            .query(&[("key", self.inner.options.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let response = check_status(response).await?;
        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))
    }
}

impl Inner {
    pub(crate) fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.options.base_url, model, method)
    }
}

/// Convert a non-success response into `LlmError::Api`.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) if !envelope.error.status.is_empty() => {
            format!("{}: {}", envelope.error.status, envelope.error.message)
        }
        Ok(envelope) => envelope.error.message,
        Err(_) => body,
    };
    Err(LlmError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ChatApi for GeminiClient {
    async fn create_session(&self, config: &ChatConfig) -> Result<Arc<dyn ChatSession>> {
        tracing::info!(model = %config.model, "Creating chat session");
        Ok(Arc::new(GeminiChatSession::new(
            Arc::clone(&self.inner),
            config.clone(),
        )))
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiClient {
    async fn synthesize(&self, text: &str) -> Result<String> {
        let options = &self.inner.options;
        let request = GenerateRequest {
            contents: vec![Content::bare(text)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: Some(vec!["AUDIO".to_string()]),
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: options.tts_voice.clone(),
                        },
                    },
                }),
                ..Default::default()
            }),
        };

        let response = self.generate(&options.tts_model, &request).await?;
        match response.inline_data() {
            Some(audio) => {
                tracing::debug!(mime = %audio.mime_type, bytes = audio.data.len(), "Synthesized speech");
                Ok(audio.data.clone())
            }
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl SummaryApi for GeminiClient {
    async fn generate_summary(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content::bare(prompt)],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                ..Default::default()
            }),
        };

        let response = self
            .generate(&self.inner.options.summary_model, &request)
            .await?;

        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!(reason, "Summary prompt was blocked");
            return Err(LlmError::EmptyResponse);
        }

        let text = response.text();
        if text.is_empty() {
            return Ok("{}".to_string());
        }
        Ok(text)
    }
}
