use std::time::Duration;

use base64::Engine;

use crate::{AudioError, Result};

/// Sample rate of synthesized speech.
pub const SAMPLE_RATE: u32 = 24000;

pub const CHANNELS: u16 = 1;

/// A decoded speech clip: mono signed 16-bit samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub samples: Vec<i16>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn new(samples: Vec<i16>) -> Self {
        Self {
            samples,
            sample_rate: SAMPLE_RATE,
        }
    }

    /// Decode base64 raw PCM (24 kHz, mono, s16le).
    ///
    /// A trailing odd byte is ignored.
    pub fn from_base64_pcm(data: &str) -> Result<Self> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data.trim())
            .map_err(|e| AudioError::Decode(e.to_string()))?;
        if bytes.is_empty() {
            return Err(AudioError::Decode("empty payload".into()));
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self::new(samples))
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_little_endian() {
        // 0x0001, 0xFFFF (-1), 0x7FFF
        let encoded = base64::engine::general_purpose::STANDARD.encode([
            0x01, 0x00, 0xFF, 0xFF, 0xFF, 0x7F,
        ]);
        let clip = AudioClip::from_base64_pcm(&encoded).unwrap();
        assert_eq!(clip.samples, vec![1, -1, i16::MAX]);
        assert_eq!(clip.sample_rate, 24000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(AudioClip::from_base64_pcm("not-valid-base64!!!").is_err());
        assert!(AudioClip::from_base64_pcm("").is_err());
    }

    #[test]
    fn test_duration() {
        let clip = AudioClip::new(vec![0; 12000]);
        assert_eq!(clip.duration(), Duration::from_millis(500));
        assert!(AudioClip::new(Vec::new()).is_empty());
    }
}
