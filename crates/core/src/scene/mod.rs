use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    idle::IdlePhaseState, AnimationParams, AvatarConfig, IdleMotion, InputHandle, LipSyncDriver,
    MorphTargetMesh, RenderGraph, SpeakingMotion, TargetBlender, VisemeTrack, WeightMap,
};

/// Which generator set owns the target map this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationMode {
    #[default]
    Idle,
    Speaking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeTransition {
    Unchanged,
    Started,
    Released,
}

impl AnimationMode {
    fn transition(self, speaking: bool) -> (AnimationMode, ModeTransition) {
        match (self, speaking) {
            (AnimationMode::Idle, true) => (AnimationMode::Speaking, ModeTransition::Started),
            (AnimationMode::Speaking, false) => (AnimationMode::Idle, ModeTransition::Released),
            (mode, _) => (mode, ModeTransition::Unchanged),
        }
    }
}

/// One animated avatar: owns its meshes, weight state and generators.
///
/// Drive it by calling [`AvatarScene::tick`] once per rendered frame.
/// Inputs may be written between ticks, from any thread, through
/// [`AvatarScene::input_handle`].
pub struct AvatarScene {
    params: AnimationParams,
    inputs: InputHandle,
    track: VisemeTrack,
    track_revision: u64,
    speaking_requested: bool,
    audio_time: f32,
    mode: AnimationMode,
    lip_sync: LipSyncDriver,
    idle: IdleMotion,
    speaking: SpeakingMotion,
    blender: TargetBlender,
    current: WeightMap,
    target: WeightMap,
    render: RenderGraph,
    model_loaded: bool,
    rng: Box<dyn RngCore + Send>,
}

impl AvatarScene {
    /// Creates a scene whose idle random source is seeded from the config,
    /// or from the OS when no seed is set.
    pub fn new(config: &AvatarConfig) -> Self {
        let rng = match config.animation.seed {
            Some(seed) => Pcg32::seed_from_u64(seed),
            None => Pcg32::from_entropy(),
        };
        Self::with_rng(config, Box::new(rng))
    }

    /// Creates a scene with an explicit random source for idle motion.
    pub fn with_rng(config: &AvatarConfig, rng: Box<dyn RngCore + Send>) -> Self {
        let params = config.animation.clone();
        Self {
            inputs: InputHandle::new(),
            track: VisemeTrack::empty(),
            track_revision: 0,
            speaking_requested: false,
            audio_time: 0.0,
            mode: AnimationMode::Idle,
            lip_sync: LipSyncDriver::new(params.lip_sync_intensity),
            idle: IdleMotion::new(params.clone()),
            speaking: SpeakingMotion::new(),
            blender: TargetBlender::from_params(&params),
            current: WeightMap::new(),
            target: WeightMap::new(),
            render: RenderGraph::new(),
            model_loaded: false,
            rng,
            params,
        }
    }

    /// Handle for feeding inputs from another thread.
    pub fn input_handle(&self) -> InputHandle {
        self.inputs.clone()
    }

    pub fn set_speaking(&self, speaking: bool) {
        self.inputs.set_speaking(speaking);
    }

    pub fn set_viseme_track(&self, track: VisemeTrack) {
        self.inputs.set_viseme_track(track);
    }

    /// Parses and installs a JSON track; malformed input installs an empty
    /// track.
    pub fn set_viseme_track_json(&self, json: &str) {
        self.inputs.set_viseme_track(VisemeTrack::from_json(json));
    }

    pub fn set_current_time(&self, seconds: f32) {
        self.inputs.set_current_time(seconds);
    }

    /// Installs the meshes of a freshly loaded model, replacing and releasing
    /// any previous ones. An empty list is a valid model without morph
    /// targets: generators still run but nothing is written out.
    pub fn attach_model(&mut self, meshes: Vec<Box<dyn MorphTargetMesh>>) {
        if self.model_loaded {
            self.render.release_all();
        }

        for mesh in meshes {
            self.render.register_mesh(mesh);
        }
        self.current.clear();
        self.target.clear();
        self.model_loaded = true;

        tracing::info!(
            meshes = self.render.len(),
            shapes = self.render.exposed_shapes().len(),
            "avatar model attached"
        );
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model_loaded
    }

    pub fn mode(&self) -> AnimationMode {
        self.mode
    }

    pub fn params(&self) -> &AnimationParams {
        &self.params
    }

    /// Weights last applied to the meshes.
    pub fn current_weights(&self) -> &WeightMap {
        &self.current
    }

    /// Weights the generators asked for this tick.
    pub fn target_weights(&self) -> &WeightMap {
        &self.target
    }

    pub fn idle_state(&self) -> &IdlePhaseState {
        self.idle.state()
    }

    /// Runs one frame: read inputs, pick a mode, run that mode's generators,
    /// blend and push weights to the meshes.
    ///
    /// `delta` is the frame duration and `elapsed` the total scene time, both
    /// in seconds. Does nothing until a model is attached.
    pub fn tick(&mut self, delta: f32, elapsed: f32) {
        if !self.model_loaded {
            return;
        }

        self.sync_inputs();

        let (mode, transition) = self.mode.transition(self.speaking_requested);
        if transition != ModeTransition::Unchanged {
            tracing::debug!(?mode, elapsed, "animation mode changed");
        }
        self.mode = mode;

        match self.mode {
            AnimationMode::Speaking => {
                self.lip_sync
                    .update(&self.track, self.audio_time, &mut self.target);
                self.speaking.update(elapsed, &mut self.target);
            }
            AnimationMode::Idle => {
                self.idle
                    .update(elapsed, delta, &mut *self.rng, &mut self.target);
                if transition == ModeTransition::Released {
                    // lip-sync targets drop to rest on the release tick even
                    // though breathing already wrote the jaw
                    LipSyncDriver::reset(&mut self.target);
                }
            }
        }

        if self.render.is_empty() {
            return;
        }
        self.blender
            .advance_all(&mut self.current, &self.target, delta);
        self.render.apply_weights(&self.current);
    }

    fn sync_inputs(&mut self) {
        let (snapshot, track_changed) = self.inputs.snapshot_since(self.track_revision);
        if track_changed {
            tracing::debug!(events = snapshot.track.len(), "viseme track replaced");
            self.track = snapshot.track;
            self.track_revision = snapshot.track_revision;
        }
        self.speaking_requested = snapshot.speaking;
        self.audio_time = snapshot.audio_time;
    }

    /// Releases every mesh and returns the scene to its initial state.
    pub fn teardown(&mut self) {
        if !self.model_loaded && self.render.is_empty() {
            return;
        }

        self.render.release_all();
        self.model_loaded = false;
        self.mode = AnimationMode::Idle;
        self.current.clear();
        self.target.clear();
        self.idle = IdleMotion::new(self.params.clone());
        tracing::info!("avatar scene torn down");
    }
}

impl Drop for AvatarScene {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for AvatarScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarScene")
            .field("mode", &self.mode)
            .field("model_loaded", &self.model_loaded)
            .field("meshes", &self.render.len())
            .field("track_events", &self.track.len())
            .field("audio_time", &self.audio_time)
            .finish_non_exhaustive()
    }
}
