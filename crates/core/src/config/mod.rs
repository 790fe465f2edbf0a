use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BeatshowError, Result};

/// Beats below this confidence are ignored unless the analysis reported no
/// confidence at all.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Attempts spent placing a single keyframe before giving up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

const DEFAULT_MAX_MOVE: f64 = 500.0;
const DEFAULT_SPAN_DURATION_MS: f64 = 15_000.0;
const DEFAULT_SPAN_VARIATION_MS: f64 = 10_000.0;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rhythm: RhythmConfig,
    pub generator: GeneratorConfig,
    pub geometry: Option<GeometryConfig>,
}

impl AppConfig {
    /// Parses a configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Confidence policy for rhythm queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RhythmConfig {
    pub default_confidence: f64,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            default_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

/// Knobs of the keyframe search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Width and height of an image, a canvas or a source area in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub width: f64,
    pub height: f64,
}

impl Extent {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Bounds for the randomly chosen viewport size of each keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportSizeRange {
    pub min_w: f64,
    pub max_w: f64,
    pub min_h: f64,
    pub max_h: f64,
}

impl ViewportSizeRange {
    /// A range that always yields exactly `width` x `height`.
    pub fn fixed(width: f64, height: f64) -> Self {
        Self {
            min_w: width,
            max_w: width,
            min_h: height,
            max_h: height,
        }
    }
}

/// Geometry of a pan/zoom timeline. Accepts both the analysis tool names
/// (`originalSize`, `zoomSizes`) and the descriptive ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeometryConfig {
    #[serde(alias = "originalSize")]
    pub source_extent: Extent,
    #[serde(alias = "zoomSizes")]
    pub viewport_size_range: ViewportSizeRange,
    /// Largest per-axis offset between consecutive keyframes, in pixels.
    #[serde(default = "default_max_move")]
    pub max_move: f64,
    /// Average time between keyframes, in milliseconds.
    #[serde(default = "default_span_duration")]
    pub span_duration: f64,
    /// Maximum jitter applied to `span_duration`, in milliseconds.
    #[serde(default = "default_span_variation")]
    pub span_variation: f64,
}

fn default_max_move() -> f64 {
    DEFAULT_MAX_MOVE
}

fn default_span_duration() -> f64 {
    DEFAULT_SPAN_DURATION_MS
}

fn default_span_variation() -> f64 {
    DEFAULT_SPAN_VARIATION_MS
}

impl GeometryConfig {
    /// Creates a configuration with the default movement and span settings.
    pub fn new(source_extent: Extent, viewport_size_range: ViewportSizeRange) -> Self {
        Self {
            source_extent,
            viewport_size_range,
            max_move: DEFAULT_MAX_MOVE,
            span_duration: DEFAULT_SPAN_DURATION_MS,
            span_variation: DEFAULT_SPAN_VARIATION_MS,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rejects configurations for which no timeline can ever be produced.
    pub fn validate(&self) -> Result<()> {
        let range = &self.viewport_size_range;
        let numbers = [
            ("source width", self.source_extent.width),
            ("source height", self.source_extent.height),
            ("minW", range.min_w),
            ("maxW", range.max_w),
            ("minH", range.min_h),
            ("maxH", range.max_h),
            ("maxMove", self.max_move),
            ("spanDuration", self.span_duration),
            ("spanVariation", self.span_variation),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(BeatshowError::invalid_config(format!(
                    "{name} must be a finite, non-negative number, got {value}"
                )));
            }
            // Signed draws span `[-value, value]`, whose width must stay finite.
            if !(2.0 * value).is_finite() {
                return Err(BeatshowError::invalid_config(format!(
                    "{name} is too large, got {value}"
                )));
            }
        }

        if range.min_w > range.max_w || range.min_h > range.max_h {
            return Err(BeatshowError::invalid_config(format!(
                "viewport size range is inverted: {range:?}"
            )));
        }

        if range.max_w > self.source_extent.width || range.max_h > self.source_extent.height {
            return Err(BeatshowError::invalid_config(format!(
                "viewport up to {}x{} does not fit in source {}x{}",
                range.max_w, range.max_h, self.source_extent.width, self.source_extent.height
            )));
        }

        if self.span_duration - self.span_variation <= 0.0 {
            return Err(BeatshowError::invalid_config(format!(
                "spanDuration {} must exceed spanVariation {}",
                self.span_duration, self.span_variation
            )));
        }

        Ok(())
    }
}
