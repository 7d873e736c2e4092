use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Microphone stream held while voice mode is on.
///
/// The session acquires it when voice mode turns on and releases it when
/// voice mode turns off. Release must be idempotent.
pub trait Microphone: Send + Sync {
    fn acquire(&self) -> crate::Result<()>;
    fn release(&self);
}

pub type MicrophoneRef = Arc<dyn Microphone>;

/// Always grants access. Tracks whether it is currently held.
#[derive(Debug, Default)]
pub struct NoopMicrophone {
    held: AtomicBool,
}

impl NoopMicrophone {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

impl Microphone for NoopMicrophone {
    fn acquire(&self) -> crate::Result<()> {
        self.held.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_release() {
        let mic = NoopMicrophone::new();
        assert!(!mic.is_held());
        mic.acquire().unwrap();
        assert!(mic.is_held());
        mic.release();
        mic.release();
        assert!(!mic.is_held());
    }
}
