//! Core library for the Avatar Face animation layer.
//!
//! Turns a viseme track and a speaking flag into per-frame blend-shape
//! weights for a 3D character. Each module owns one stage of the frame
//! pipeline (viseme lookup, lip-sync, idle and speaking motion, blending)
//! and [`AvatarScene`] runs them once per rendered frame. The renderer is
//! reached only through the [`MorphTargetMesh`] trait.

pub mod blend;
pub mod config;
pub mod error;
pub mod idle;
pub mod input;
pub mod record;
pub mod render;
pub mod scene;
pub mod shapes;
pub mod speaking;
pub mod timeline;
pub mod viseme;

pub use blend::TargetBlender;
pub use config::{AnimationParams, AvatarConfig, FrameTiming, IntervalConfig};
pub use error::{AvatarError, Result};
pub use idle::{BlinkState, IdleMotion, IdlePhaseState};
pub use input::{InputHandle, InputSnapshot};
pub use record::{RecordedFrame, Recorder, RecordingMesh, RecordingSettings};
pub use render::{MorphTargetMesh, RenderGraph};
pub use scene::{AnimationMode, AvatarScene};
pub use shapes::{BlendShape, ShapeSet, WeightMap};
pub use speaking::SpeakingMotion;
pub use timeline::{select_active_viseme, FrameClock, LipSyncDriver, VisemeEvent, VisemeTrack};
pub use viseme::{contributions_for, jaw_open_amount_for, Viseme};
