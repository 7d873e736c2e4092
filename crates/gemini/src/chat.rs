use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use reflect_llm::{ChatChunk, ChatConfig, ChatSession, ChatStream, LlmError, Result};

use crate::api::{Content, GenerateRequest, GenerateResponse, GenerationConfig};
use crate::sse::SseDecoder;
use crate::{check_status, Inner};

/// Chat session that keeps its own history and streams replies over SSE.
pub struct GeminiChatSession {
    inner: Arc<Inner>,
    config: ChatConfig,
    history: Arc<Mutex<Vec<Content>>>,
}

impl GeminiChatSession {
    pub(crate) fn new(inner: Arc<Inner>, config: ChatConfig) -> Self {
        Self {
            inner,
            config,
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Number of completed exchanges (user + model contents).
    pub fn history_len(&self) -> usize {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn build_request(&self, text: &str) -> GenerateRequest {
        let mut contents = self
            .history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        contents.push(Content::user(text));

        GenerateRequest {
            contents,
            system_instruction: Some(Content::bare(self.config.system_instruction.clone())),
            generation_config: Some(GenerationConfig {
                temperature: Some(self.config.temperature),
                ..Default::default()
            }),
        }
    }
}

#[async_trait]
impl ChatSession for GeminiChatSession {
    async fn send_stream(&self, text: &str) -> Result<ChatStream> {
        let request = self.build_request(text);
        let url = self
            .inner
            .endpoint(&self.config.model, "streamGenerateContent");

        let response = self
            .inner
            .http
            .post(&url)
            .query(&[("alt", "sse"), ("key", self.inner.options.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;
        let response = check_status(response).await?;

        let history = Arc::clone(&self.history);
        let user_text = text.to_string();

        let stream = async_stream::try_stream! {
            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut reply = String::new();

            while let Some(bytes) = body.next().await {
                let bytes = bytes.map_err(|e| LlmError::Request(e.to_string()))?;
                for payload in decoder.push(&bytes) {
                    let text = decode_chunk(&payload)?;
                    if !text.is_empty() {
                        reply.push_str(&text);
                        yield ChatChunk::new(text);
                    }
                }
            }
            if let Some(payload) = decoder.finish() {
                let text = decode_chunk(&payload)?;
                if !text.is_empty() {
                    reply.push_str(&text);
                    yield ChatChunk::new(text);
                }
            }

            // The exchange only enters history once the reply is complete.
            let mut history = history.lock().unwrap_or_else(|e| e.into_inner());
            history.push(Content::user(user_text));
            history.push(Content::model(reply));
        };

        Ok(stream.boxed())
    }
}

fn decode_chunk(payload: &str) -> Result<String> {
    let response: GenerateResponse =
        serde_json::from_str(payload).map_err(|e| LlmError::Decode(e.to_string()))?;
    if let Some(reason) = response.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
        if reason != "STOP" {
            tracing::debug!(reason, "Chat stream finished early");
        }
    }
    Ok(response.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GeminiOptions;

    fn session() -> GeminiChatSession {
        let inner = Arc::new(Inner {
            http: reqwest::Client::new(),
            options: GeminiOptions::new("k"),
        });
        GeminiChatSession::new(
            inner,
            ChatConfig {
                model: "m".into(),
                system_instruction: "Be Reflect.".into(),
                temperature: 0.7,
            },
        )
    }

    #[test]
    fn test_request_carries_history_and_instruction() {
        let session = session();
        session
            .history
            .lock()
            .unwrap()
            .extend([Content::user("one"), Content::model("two")]);

        let request = session.build_request("three");
        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[2], Content::user("three"));
        assert_eq!(
            request.system_instruction,
            Some(Content::bare("Be Reflect."))
        );
        assert_eq!(session.history_len(), 2);
    }

    #[test]
    fn test_decode_chunk() {
        let payload = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "}]}}]}"#;
        assert_eq!(decode_chunk(payload).unwrap(), "Hello ");
        assert!(decode_chunk("not json").is_err());
    }
}
