//! Ordered, non-overlapping playback of synthesized speech.

use std::collections::{BTreeMap, VecDeque};

/// FIFO of clips waiting to play, with a single "currently playing" slot.
///
/// Every `clear` starts a new epoch. Completions and synthesis results from an
/// older epoch are stale and must be dropped by the caller.
#[derive(Debug)]
pub struct PlaybackQueue<T> {
    pending: VecDeque<T>,
    playing: bool,
    epoch: u64,
}

impl<T> Default for PlaybackQueue<T> {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            playing: false,
            epoch: 0,
        }
    }
}

impl<T> PlaybackQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn enqueue(&mut self, clip: T) {
        self.pending.push_back(clip);
    }

    /// Claim the playing slot and take the head, if nothing is playing.
    pub fn start_next(&mut self) -> Option<T> {
        if self.playing {
            return None;
        }
        let clip = self.pending.pop_front()?;
        self.playing = true;
        Some(clip)
    }

    /// Release the playing slot. Returns false for a stale epoch.
    pub fn finish(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        self.playing = false;
        true
    }

    /// Drop everything and start a new epoch. Returns the new epoch.
    pub fn clear(&mut self) -> u64 {
        self.pending.clear();
        self.playing = false;
        self.epoch += 1;
        self.epoch
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_idle(&self) -> bool {
        !self.playing && self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Releases out-of-order synthesis results in dispatch order.
///
/// Each dispatched sentence reserves a sequence number; results are held back
/// until every earlier reservation has resolved. A failed synthesis resolves
/// with `None` so it does not block the sentences behind it.
#[derive(Debug)]
pub struct ClipSequencer<T> {
    next_seq: u64,
    next_release: u64,
    ready: BTreeMap<u64, Option<T>>,
}

impl<T> Default for ClipSequencer<T> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            next_release: 0,
            ready: BTreeMap::new(),
        }
    }
}

impl<T> ClipSequencer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Record a result and return every clip now releasable, in order.
    pub fn resolve(&mut self, seq: u64, clip: Option<T>) -> Vec<T> {
        if seq < self.next_release || seq >= self.next_seq {
            tracing::debug!(seq, "dropping result for unknown sequence");
            return Vec::new();
        }
        self.ready.insert(seq, clip);

        let mut released = Vec::new();
        while let Some(clip) = self.ready.remove(&self.next_release) {
            self.next_release += 1;
            released.extend(clip);
        }
        released
    }

    /// Reservations not yet released.
    pub fn outstanding(&self) -> u64 {
        self.next_seq - self.next_release
    }

    /// Abandon all reservations.
    pub fn reset(&mut self) {
        self.next_release = self.next_seq;
        self.ready.clear();
    }
}
