use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::{AnimationMode, BlendShape, MorphTargetMesh, Result, ShapeSet, WeightMap};

/// Configuration options for headless recording runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub fps: u32,
    pub duration_seconds: f32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            fps: 60,
            duration_seconds: 2.0,
        }
    }
}

impl RecordingSettings {
    pub fn frame_delta(&self) -> f32 {
        1.0 / self.fps.max(1) as f32
    }

    pub fn frame_count(&self) -> u64 {
        (self.duration_seconds.max(0.0) * self.fps as f32).round() as u64
    }
}

/// Weights applied to the recording mesh during one frame.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedFrame {
    pub frame: u64,
    pub time: f32,
    pub mode: AnimationMode,
    pub weights: WeightMap,
}

/// Captures what a scene pushes to its meshes, frame by frame.
///
/// Hand [`Recorder::mesh`] to the scene like any other mesh, then call
/// [`Recorder::capture`] after every tick.
#[derive(Debug, Default)]
pub struct Recorder {
    settings: RecordingSettings,
    is_recording: bool,
    latest: Arc<Mutex<WeightMap>>,
    frames: Vec<RecordedFrame>,
}

impl Recorder {
    pub fn new(settings: RecordingSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    /// A mesh exposing `shapes` whose writes land in this recorder.
    pub fn mesh(&self, shapes: ShapeSet) -> RecordingMesh {
        RecordingMesh {
            shapes,
            latest: self.latest.clone(),
        }
    }

    pub fn start(&mut self) -> Result<()> {
        self.is_recording = true;
        self.frames.clear();
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        self.is_recording = false;
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording
    }

    /// Stores the weights applied since the last capture.
    pub fn capture(&mut self, frame: u64, time: f32, mode: AnimationMode) {
        if !self.is_recording {
            return;
        }
        let weights = lock(&self.latest).clone();
        self.frames.push(RecordedFrame {
            frame,
            time,
            mode,
            weights,
        });
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    /// One JSON object per frame, newline separated.
    pub fn to_json_lines(&self) -> Result<String> {
        let mut out = String::new();
        for frame in &self.frames {
            out.push_str(&serde_json::to_string(frame)?);
            out.push('\n');
        }
        Ok(out)
    }
}

/// Headless mesh created by [`Recorder::mesh`].
#[derive(Debug)]
pub struct RecordingMesh {
    shapes: ShapeSet,
    latest: Arc<Mutex<WeightMap>>,
}

impl MorphTargetMesh for RecordingMesh {
    fn label(&self) -> &str {
        "recorder"
    }

    fn capabilities(&self) -> ShapeSet {
        self.shapes
    }

    fn set_shape_influence(&mut self, shape: BlendShape, value: f32) {
        lock(&self.latest).set(shape, value);
    }
}

fn lock(latest: &Mutex<WeightMap>) -> MutexGuard<'_, WeightMap> {
    latest
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
