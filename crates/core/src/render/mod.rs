//! Turns a playback clock into the source rectangle to draw.
//!
//! The renderer itself lives outside this crate. What it needs from us is the
//! pair of keyframes around the clock and a well defined way to blend them:
//! ease both positions and sizes, fit the sizes to the output aspect ratio,
//! then keep the result inside the loaded image.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::{Extent, KeyFrame};

/// Easing curve applied to the keyframe blend factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    #[default]
    InOutSine,
    InOutQuad,
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
        }
    }

    /// Eased blend from `from` to `to`. Exactly `from` at `t == 0`.
    pub fn range(self, from: f64, to: f64, t: f64) -> f64 {
        from + (to - from) * self.apply(t)
    }
}

/// A rectangle in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Pulls the rectangle back inside an image of `asset` size.
    pub fn clamp_to(self, asset: Extent) -> Self {
        let mut clamped = self;
        if clamped.height > asset.height {
            clamped.height = asset.height;
        }
        if clamped.y + clamped.height > asset.height {
            clamped.y = asset.height - clamped.height;
        }
        if clamped.width > asset.width {
            clamped.width = asset.width;
        }
        if clamped.x + clamped.width > asset.width {
            clamped.x = asset.width - clamped.width;
        }
        clamped.x = clamped.x.max(0.0);
        clamped.y = clamped.y.max(0.0);
        clamped
    }
}

impl From<&KeyFrame> for Viewport {
    fn from(frame: &KeyFrame) -> Self {
        Self {
            x: frame.x,
            y: frame.y,
            width: frame.width,
            height: frame.height,
        }
    }
}

/// The keyframes bracketing a clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePair<'a> {
    pub last: &'a KeyFrame,
    pub current: &'a KeyFrame,
    /// Position between `last` and `current`, in `[0, 1)`.
    pub delta: f64,
    /// Index of `current` in the frame list.
    pub index: usize,
}

impl<'a> FramePair<'a> {
    /// Eased rectangle between the two keyframes, sizes untouched.
    pub fn interpolate(&self, ease: Ease) -> Viewport {
        Viewport {
            x: ease.range(self.last.x, self.current.x, self.delta),
            y: ease.range(self.last.y, self.current.y, self.delta),
            width: ease.range(self.last.width, self.current.width, self.delta),
            height: ease.range(self.last.height, self.current.height, self.delta),
        }
    }

    /// Rectangle to sample for an `output` canvas from an image of natural
    /// size `asset`.
    pub fn resolve(&self, ease: Ease, output: Extent, asset: Extent) -> Viewport {
        let last = shrink_to_aspect_ratio(self.last.width, self.last.height, output);
        let current = shrink_to_aspect_ratio(self.current.width, self.current.height, output);
        Viewport {
            x: ease.range(self.last.x, self.current.x, self.delta),
            y: ease.range(self.last.y, self.current.y, self.delta),
            width: ease.range(last.width, current.width, self.delta),
            height: ease.range(last.height, current.height, self.delta),
        }
        .clamp_to(asset)
    }
}

/// Finds the keyframes around `clock_ms`. `None` before the first frame and
/// from the last frame on.
pub fn get_frame_pair(clock_ms: f64, frames: &[KeyFrame]) -> Option<FramePair<'_>> {
    let first = frames.first()?;
    if !(clock_ms >= first.clock_ms) {
        return None;
    }

    let index = frames.iter().position(|frame| frame.clock_ms > clock_ms)?;
    let last = &frames[index - 1];
    let current = &frames[index];
    let delta = (clock_ms - last.clock_ms) / (current.clock_ms - last.clock_ms);
    Some(FramePair {
        last,
        current,
        delta,
        index,
    })
}

/// Largest `width` x `height` sub-size with the aspect ratio of `target`.
pub fn shrink_to_aspect_ratio(width: f64, height: f64, target: Extent) -> Extent {
    let target_ratio = target.aspect_ratio();
    if !target_ratio.is_finite() || target_ratio <= 0.0 || height <= 0.0 {
        return Extent::new(width, height);
    }
    if width / height > target_ratio {
        Extent::new(height * target_ratio, height)
    } else {
        Extent::new(width, width / target_ratio)
    }
}
