use hound::{WavSpec, WavWriter};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::{AudioClip, AudioError, CHANNELS};

/// Audio output.
///
/// `play` resolves when the clip has finished. Dropping the future stops
/// playback, which is how callers interrupt a clip.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn play(&self, clip: &AudioClip) -> crate::Result<()>;
}

pub type AudioSinkRef = Arc<dyn AudioSink>;

/// Plays nothing, but takes as long as the clip would.
#[derive(Debug, Default)]
pub struct SimulatedSink;

#[async_trait]
impl AudioSink for SimulatedSink {
    async fn play(&self, clip: &AudioClip) -> crate::Result<()> {
        tokio::time::sleep(clip.duration()).await;
        Ok(())
    }
}

/// Writes each clip to a numbered WAV file, then waits out its duration.
pub struct WavFileSink {
    dir: PathBuf,
    next_index: AtomicUsize,
}

impl WavFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> crate::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            AudioError::DeviceUnavailable(format!("failed to create {}: {e}", dir.display()))
        })?;
        Ok(Self {
            dir,
            next_index: AtomicUsize::new(1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_path(&self) -> PathBuf {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        self.dir.join(format!("reply_{index:03}.wav"))
    }
}

#[async_trait]
impl AudioSink for WavFileSink {
    async fn play(&self, clip: &AudioClip) -> crate::Result<()> {
        let path = self.next_path();
        save_wav(clip, &path)?;
        tracing::debug!(path = %path.display(), "wrote speech clip");
        tokio::time::sleep(clip.duration()).await;
        Ok(())
    }
}

fn save_wav(clip: &AudioClip, path: &Path) -> crate::Result<()> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let file = std::fs::File::create(path)
        .map_err(|e| AudioError::Playback(format!("failed to create file: {e}")))?;
    let mut writer = WavWriter::new(BufWriter::new(file), spec)
        .map_err(|e| AudioError::Playback(format!("failed to create wav writer: {e}")))?;

    for &sample in &clip.samples {
        writer
            .write_sample(sample)
            .map_err(|e| AudioError::Playback(format!("failed to write sample: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| AudioError::Playback(format!("failed to finalize wav: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_sink_takes_clip_duration() {
        let clip = AudioClip::new(vec![0; 24000]);
        let start = tokio::time::Instant::now();
        SimulatedSink.play(&clip).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wav_sink_writes_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WavFileSink::new(dir.path().join("speech")).unwrap();

        sink.play(&AudioClip::new(vec![1, 2, 3])).await.unwrap();
        sink.play(&AudioClip::new(vec![-4, 5])).await.unwrap();

        let first = sink.dir().join("reply_001.wav");
        let second = sink.dir().join("reply_002.wav");
        assert!(first.exists() && second.exists());

        let mut reader = hound::WavReader::open(&second).unwrap();
        assert_eq!(reader.spec().sample_rate, 24000);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![-4, 5]);
    }
}
