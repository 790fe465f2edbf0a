use tracing::warn;

use crate::{
    render::{get_frame_pair, Ease, Viewport},
    BeatshowError, Extent, Result, Timeline,
};

/// A background that pans and zooms over a still image following a
/// [`Timeline`].
///
/// Construction takes the natural image size, so the image must be loaded
/// before a background can be built.
#[derive(Debug, Clone)]
pub struct PanZoomBackground {
    timeline: Timeline,
    output: Extent,
    asset: Extent,
    ease: Ease,
}

impl PanZoomBackground {
    pub fn new(timeline: Timeline, source_extent: Extent, output: Extent, asset: Extent) -> Result<Self> {
        if output.width > source_extent.width || output.height > source_extent.height {
            return Err(BeatshowError::invalid_config(format!(
                "output {}x{} is bigger than the background image {}x{}",
                output.width, output.height, source_extent.width, source_extent.height
            )));
        }
        if !(output.width > 0.0 && output.height > 0.0) {
            return Err(BeatshowError::invalid_config("output canvas has no area"));
        }
        if !(asset.width > 0.0 && asset.height > 0.0) {
            return Err(BeatshowError::invalid_input("background image has no pixels"));
        }

        Ok(Self {
            timeline,
            output,
            asset,
            ease: Ease::default(),
        })
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Source rectangle to draw at `clock_ms`, or `None` once the timeline
    /// has run out.
    pub fn source_rect_at(&self, clock_ms: f64) -> Option<Viewport> {
        let Some(pair) = get_frame_pair(clock_ms, self.timeline.frames()) else {
            warn!(clock_ms, "background time overflow");
            return None;
        };
        Some(pair.resolve(self.ease, self.output, self.asset))
    }
}
