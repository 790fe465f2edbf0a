//! Core library for the Beatshow slideshow.
//!
//! Still images are panned and zoomed in time with a music track. This crate
//! owns everything between the analysis data and the pixels: confidence
//! filtered rhythm queries, loudness lookups, randomized keyframe timelines
//! and the clock-driven interpolation a renderer samples every frame.
//! Drawing, image loading and audio playback live elsewhere.

pub mod analysis;
pub mod config;
pub mod error;
pub mod mapping;
pub mod render;
pub mod scene;
pub mod timeline;

pub use analysis::{
    find_last, BarEvent, BeatEvent, LoudnessDataset, LoudnessEnvelope, LoudnessSample,
    RhythmDataset, RhythmIndex, TimedEvent,
};
pub use config::{AppConfig, Extent, GeneratorConfig, GeometryConfig, RhythmConfig, ViewportSizeRange};
pub use error::{BeatshowError, Result};
pub use mapping::{EffectMatrix, ParameterUpdate};
pub use render::{get_frame_pair, shrink_to_aspect_ratio, Ease, FramePair, Viewport};
pub use scene::PanZoomBackground;
pub use timeline::{generate_timeline, KeyFrame, PlaybackClock, Timeline, TimelineGenerator};
