//! Assessment configuration.
//!
//! Everything a conversation needs before it starts: which model to talk to,
//! how it should behave, what it says first, and how patient the voice loop is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reflect_llm::ChatConfig;
use serde::{Deserialize, Serialize};

use crate::constants::{
    CLOSE_TRANSITION_DELAY, DEFAULT_MODEL, DEFAULT_TEMPERATURE, FINAL_DEBOUNCE, INTERIM_DEBOUNCE,
    RECOGNIZER_RESTART_DELAY, SPEECH_END_GRACE,
};

pub const DEFAULT_GREETING: &str = "Most AI conversations start with what you're building. I'd rather start with what you're hoping it does. What's the biggest thing you're hoping AI will do for your organization?";

pub const DEFAULT_SYSTEM_INSTRUCTION: &str = include_str!("../prompts/system_instruction.txt");

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Model and conversation settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    pub model_name: String,
    pub initial_greeting: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub voice: VoiceTimings,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL.to_string(),
            initial_greeting: DEFAULT_GREETING.to_string(),
            system_instruction: DEFAULT_SYSTEM_INSTRUCTION.trim_end().to_string(),
            temperature: DEFAULT_TEMPERATURE,
            voice: VoiceTimings::default(),
        }
    }
}

impl AssessmentConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(write_err)
    }

    /// Platform config path, e.g. `~/.config/reflect/config.json` on Linux.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|config| config.join("reflect").join("config.json"))
    }

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            model: self.model_name.clone(),
            system_instruction: self.system_instruction.clone(),
            temperature: self.temperature,
        }
    }
}

/// Timing of the voice loop, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceTimings {
    pub final_debounce_ms: u64,
    pub interim_debounce_ms: u64,
    pub restart_delay_ms: u64,
    pub speech_end_grace_ms: u64,
    pub close_transition_ms: u64,
}

impl Default for VoiceTimings {
    fn default() -> Self {
        Self {
            final_debounce_ms: FINAL_DEBOUNCE.as_millis() as u64,
            interim_debounce_ms: INTERIM_DEBOUNCE.as_millis() as u64,
            restart_delay_ms: RECOGNIZER_RESTART_DELAY.as_millis() as u64,
            speech_end_grace_ms: SPEECH_END_GRACE.as_millis() as u64,
            close_transition_ms: CLOSE_TRANSITION_DELAY.as_millis() as u64,
        }
    }
}

impl VoiceTimings {
    pub fn final_debounce(&self) -> Duration {
        Duration::from_millis(self.final_debounce_ms)
    }

    pub fn interim_debounce(&self) -> Duration {
        Duration::from_millis(self.interim_debounce_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn speech_end_grace(&self) -> Duration {
        Duration::from_millis(self.speech_end_grace_ms)
    }

    pub fn close_transition(&self) -> Duration {
        Duration::from_millis(self.close_transition_ms)
    }
}
