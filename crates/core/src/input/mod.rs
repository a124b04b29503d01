use std::sync::{Arc, Mutex, MutexGuard};

use crate::VisemeTrack;

/// Latest values written by the playback side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub speaking: bool,
    pub track: VisemeTrack,
    /// Audio playback position in seconds.
    pub audio_time: f32,
    /// Bumped every time a new track is set.
    pub track_revision: u64,
}

/// Shared, thread-safe slot for scene inputs.
///
/// An audio driver on another thread writes here; the scene copies the
/// latest values at the start of each tick. Writes are last-write-wins and
/// never queued, so stopping speech mid-utterance only needs
/// `set_speaking(false)`.
#[derive(Clone, Default)]
pub struct InputHandle {
    shared: Arc<Mutex<InputSnapshot>>,
}

impl InputHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_speaking(&self, speaking: bool) {
        self.lock().speaking = speaking;
    }

    /// Replaces the current track wholesale.
    pub fn set_viseme_track(&self, track: VisemeTrack) {
        let mut inputs = self.lock();
        inputs.track = track;
        inputs.track_revision += 1;
    }

    pub fn set_current_time(&self, seconds: f32) {
        self.lock().audio_time = seconds;
    }

    /// Copies the track only when its revision differs from `known_revision`.
    pub(crate) fn snapshot_since(&self, known_revision: u64) -> (InputSnapshot, bool) {
        let inputs = self.lock();
        let changed = inputs.track_revision != known_revision;
        let snapshot = InputSnapshot {
            speaking: inputs.speaking,
            track: if changed {
                inputs.track.clone()
            } else {
                VisemeTrack::empty()
            },
            audio_time: inputs.audio_time,
            track_revision: inputs.track_revision,
        };
        (snapshot, changed)
    }

    pub fn snapshot(&self) -> InputSnapshot {
        self.lock().clone()
    }

    /// The data is plain values, so a writer that panicked mid-update cannot
    /// leave it inconsistent; the lock is recovered instead of failing.
    fn lock(&self) -> MutexGuard<'_, InputSnapshot> {
        self.shared.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("scene inputs were poisoned, recovering last values");
            poisoned.into_inner()
        })
    }
}

impl std::fmt::Debug for InputHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputHandle").finish()
    }
}
