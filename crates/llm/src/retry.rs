use std::time::Duration;

use crate::SpeechSynthesizer;

/// Bounded exponential backoff for rate-limited synthesis calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

/// Synthesize speech, retrying on rate limits.
///
/// Returns an empty string when synthesis fails for any other reason or the
/// retries run out. An empty result means "skip this sentence".
pub async fn synthesize_with_retry(
    synth: &dyn SpeechSynthesizer,
    text: &str,
    policy: RetryPolicy,
) -> String {
    let mut retries_left = policy.max_retries;
    let mut delay = policy.initial_delay;

    loop {
        match synth.synthesize(text).await {
            Ok(audio) => return audio,
            Err(e) if e.is_rate_limited() && retries_left > 0 => {
                tracing::warn!(
                    delay_ms = delay.as_millis() as u64,
                    retries_left,
                    "Rate limit hit for TTS, retrying"
                );
                tokio::time::sleep(delay).await;
                retries_left -= 1;
                delay *= 2;
            }
            Err(e) => {
                tracing::warn!("Speech synthesis failed: {}", e);
                return String::new();
            }
        }
    }
}
