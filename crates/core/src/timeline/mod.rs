//! Randomized pan/zoom keyframe timelines.

use rand::{
    rngs::{StdRng, ThreadRng},
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    config::{GeometryConfig, DEFAULT_MAX_ATTEMPTS},
    BeatshowError, Extent, Result,
};

/// A time-stamped viewport rectangle inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFrame {
    pub clock_ms: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl KeyFrame {
    /// Whether the rectangle lies entirely inside `extent`.
    pub fn fits_in(&self, extent: &Extent) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= extent.width
            && self.y + self.height <= extent.height
    }
}

/// Keyframes ordered by strictly increasing clock, starting at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<KeyFrame>", into = "Vec<KeyFrame>")]
pub struct Timeline {
    frames: Vec<KeyFrame>,
}

impl Timeline {
    /// Wraps frames produced elsewhere, checking the ordering invariants.
    pub fn from_frames(frames: Vec<KeyFrame>) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| BeatshowError::invalid_input("timeline has no frames"))?;
        if first.clock_ms != 0.0 {
            return Err(BeatshowError::invalid_input(format!(
                "timeline starts at {} ms instead of 0",
                first.clock_ms
            )));
        }
        if let Some(pair) = frames.windows(2).find(|pair| pair[1].clock_ms <= pair[0].clock_ms) {
            return Err(BeatshowError::invalid_input(format!(
                "timeline clock goes from {} ms to {} ms",
                pair[0].clock_ms, pair[1].clock_ms
            )));
        }
        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[KeyFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Clock of the last keyframe.
    pub fn duration_ms(&self) -> f64 {
        self.frames.last().map(|frame| frame.clock_ms).unwrap_or(0.0)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| BeatshowError::invalid_input(format!("timeline: {err}")))
    }
}

impl TryFrom<Vec<KeyFrame>> for Timeline {
    type Error = BeatshowError;

    fn try_from(frames: Vec<KeyFrame>) -> Result<Self> {
        Self::from_frames(frames)
    }
}

impl From<Timeline> for Vec<KeyFrame> {
    fn from(timeline: Timeline) -> Self {
        timeline.frames
    }
}

/// Produces keyframe timelines for one geometry, drawing from `R`.
#[derive(Debug)]
pub struct TimelineGenerator<R> {
    config: GeometryConfig,
    rng: R,
    max_attempts: usize,
}

impl TimelineGenerator<ThreadRng> {
    /// Generator drawing from the thread-local random source.
    pub fn new(config: GeometryConfig) -> Self {
        Self::with_rng(config, rand::rng())
    }
}

impl TimelineGenerator<StdRng> {
    /// Generator with a reproducible random sequence.
    pub fn seeded(config: GeometryConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> TimelineGenerator<R> {
    pub fn with_rng(config: GeometryConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides how many placements are tried per keyframe.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    /// Builds a timeline whose last keyframe is at or after `duration_ms`.
    ///
    /// Fails up front with [`BeatshowError::InvalidConfig`] for impossible
    /// geometry, and aborts with [`BeatshowError::KeyFrameSearchExhausted`]
    /// if any keyframe cannot be placed.
    pub fn generate_timeline(&mut self, duration_ms: f64) -> Result<Timeline> {
        self.config.validate()?;
        if !duration_ms.is_finite() {
            return Err(BeatshowError::invalid_input(format!(
                "timeline duration must be finite, got {duration_ms}"
            )));
        }

        let mut previous = self.generate_key_frame(0.0, None)?;
        let mut frames = vec![previous];
        let mut clock = 0.0;
        while clock < duration_ms {
            clock += self.config.span_duration + self.split_random(self.config.span_variation);
            previous = self.generate_key_frame(clock, Some(&previous))?;
            frames.push(previous);
        }

        debug!(duration_ms, frames = frames.len(), "generated timeline");
        Ok(Timeline { frames })
    }

    /// Places one keyframe at `clock_ms`.
    ///
    /// Without a previous frame the position is drawn uniformly inside the
    /// source. Otherwise it is the previous position moved by at most
    /// `max_move` on each axis, redrawn until the rectangle fits.
    pub fn generate_key_frame(
        &mut self,
        clock_ms: f64,
        previous: Option<&KeyFrame>,
    ) -> Result<KeyFrame> {
        let range = self.config.viewport_size_range;
        let extent = self.config.source_extent;
        let width = self.rng.random_range(range.min_w..=range.max_w);
        let height = self.rng.random_range(range.min_h..=range.max_h);

        let Some(previous) = previous else {
            return Ok(KeyFrame {
                clock_ms,
                x: self.rng.random_range(0.0..=(extent.width - width).max(0.0)),
                y: self.rng.random_range(0.0..=(extent.height - height).max(0.0)),
                width,
                height,
            });
        };

        let max_move = self.config.max_move;
        for _ in 0..self.max_attempts {
            let candidate = KeyFrame {
                clock_ms,
                x: previous.x + self.split_random(max_move),
                y: previous.y + self.split_random(max_move),
                width,
                height,
            };
            if candidate.fits_in(&extent) {
                return Ok(candidate);
            }
        }

        error!(?previous, clock_ms, width, height, "could not create key frame");
        Err(BeatshowError::KeyFrameSearchExhausted {
            clock_ms,
            attempts: self.max_attempts,
        })
    }

    /// Uniform draw from `[-magnitude, magnitude]`.
    fn split_random(&mut self, magnitude: f64) -> f64 {
        self.rng.random_range(-magnitude..=magnitude)
    }
}

/// Generates a timeline using the thread-local random generator.
pub fn generate_timeline(duration_ms: f64, config: &GeometryConfig) -> Result<Timeline> {
    TimelineGenerator::new(config.clone()).generate_timeline(duration_ms)
}

/// Millisecond playback position. Never runs backwards past zero.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PlaybackClock {
    pub time_ms: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_ms = 0.0;
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.time_ms = (self.time_ms + delta_ms).max(0.0);
    }

    pub fn seconds(&self) -> f64 {
        self.time_ms / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewportSizeRange;

    fn geometry() -> GeometryConfig {
        GeometryConfig {
            source_extent: Extent::new(1000.0, 800.0),
            viewport_size_range: ViewportSizeRange::fixed(400.0, 300.0),
            max_move: 50.0,
            span_duration: 1000.0,
            span_variation: 400.0,
        }
    }

    #[test]
    fn frames_stay_inside_source() {
        for seed in 0..20 {
            let timeline = TimelineGenerator::seeded(geometry(), seed)
                .generate_timeline(30_000.0)
                .unwrap();

            for frame in timeline.frames() {
                assert!((0.0..=600.0).contains(&frame.x), "x = {}", frame.x);
                assert!((0.0..=500.0).contains(&frame.y), "y = {}", frame.y);
                assert_eq!(frame.width, 400.0);
                assert_eq!(frame.height, 300.0);
            }
        }
    }

    #[test]
    fn clocks_increase_and_cover_duration() {
        let timeline = TimelineGenerator::seeded(geometry(), 7)
            .generate_timeline(12_345.0)
            .unwrap();
        let frames = timeline.frames();

        assert_eq!(frames[0].clock_ms, 0.0);
        assert!(frames.windows(2).all(|pair| pair[1].clock_ms > pair[0].clock_ms));
        assert!(timeline.duration_ms() >= 12_345.0);
        assert!(frames[frames.len() - 2].clock_ms < 12_345.0);
    }

    #[test]
    fn zero_variation_gives_regular_spacing() {
        let mut config = geometry();
        config.span_variation = 0.0;

        let timeline = TimelineGenerator::seeded(config, 1)
            .generate_timeline(10_000.0)
            .unwrap();
        let clocks: Vec<f64> = timeline.frames().iter().map(|f| f.clock_ms).collect();

        assert_eq!(clocks.len(), 11);
        for (i, clock) in clocks.iter().enumerate() {
            assert_eq!(*clock, i as f64 * 1000.0);
        }
    }

    #[test]
    fn moves_are_bounded_by_max_move() {
        let timeline = TimelineGenerator::seeded(geometry(), 3)
            .generate_timeline(20_000.0)
            .unwrap();

        for pair in timeline.frames().windows(2) {
            assert!((pair[1].x - pair[0].x).abs() <= 50.0);
            assert!((pair[1].y - pair[0].y).abs() <= 50.0);
        }
    }

    #[test]
    fn same_seed_same_timeline() {
        let a = TimelineGenerator::seeded(geometry(), 42)
            .generate_timeline(8000.0)
            .unwrap();
        let b = TimelineGenerator::seeded(geometry(), 42)
            .generate_timeline(8000.0)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_duration_still_has_a_start_frame() {
        let timeline = TimelineGenerator::seeded(geometry(), 0)
            .generate_timeline(0.0)
            .unwrap();
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn oversized_viewport_is_rejected_before_generation() {
        let mut config = geometry();
        config.viewport_size_range = ViewportSizeRange::fixed(1200.0, 300.0);

        let err = generate_timeline(5000.0, &config).unwrap_err();
        assert!(matches!(err, BeatshowError::InvalidConfig(_)));
    }

    #[test]
    fn exhausted_search_aborts() {
        // Previous frame sits in a corner the new, larger viewport cannot
        // reach within one move.
        let mut config = geometry();
        config.viewport_size_range = ViewportSizeRange::fixed(900.0, 700.0);
        config.max_move = 10.0;
        let mut generator = TimelineGenerator::seeded(config, 5);
        let previous = KeyFrame {
            clock_ms: 0.0,
            x: 600.0,
            y: 500.0,
            width: 400.0,
            height: 300.0,
        };

        let err = generator.generate_key_frame(1000.0, Some(&previous)).unwrap_err();
        assert!(matches!(
            err,
            BeatshowError::KeyFrameSearchExhausted { attempts: 100, .. }
        ));
    }

    #[test]
    fn exhausted_search_fails_the_whole_timeline() {
        let config = GeometryConfig {
            source_extent: Extent::new(1000.0, 800.0),
            viewport_size_range: ViewportSizeRange {
                min_w: 10.0,
                max_w: 1000.0,
                min_h: 10.0,
                max_h: 800.0,
            },
            max_move: 1.0,
            span_duration: 1000.0,
            span_variation: 0.0,
        };

        let mut exhausted = 0;
        for seed in 0..10 {
            match TimelineGenerator::seeded(config.clone(), seed).generate_timeline(60_000.0) {
                Err(BeatshowError::KeyFrameSearchExhausted { attempts, .. }) => {
                    assert_eq!(attempts, 100);
                    exhausted += 1;
                }
                Ok(timeline) => {
                    assert!(timeline.frames().iter().all(|f| f.fits_in(&config.source_extent)));
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert!(exhausted > 0);
    }

    #[test]
    fn unsampleable_move_is_rejected_before_drawing() {
        let mut config = geometry();
        config.max_move = f64::MAX;

        let result = TimelineGenerator::seeded(config, 1).generate_timeline(5000.0);
        assert!(matches!(result, Err(BeatshowError::InvalidConfig(_))));
    }

    #[test]
    fn first_frame_is_placed_anywhere_inside() {
        let mut generator = TimelineGenerator::seeded(geometry(), 11);
        for _ in 0..50 {
            let frame = generator.generate_key_frame(0.0, None).unwrap();
            assert!(frame.fits_in(&geometry().source_extent));
        }
    }

    #[test]
    fn timeline_json_round_trip_checks_order() {
        let timeline = TimelineGenerator::seeded(geometry(), 2)
            .generate_timeline(3000.0)
            .unwrap();
        let json = timeline.to_json_string().unwrap();
        assert!(json.contains("clockMs"));
        assert_eq!(Timeline::from_json_str(&json).unwrap(), timeline);

        let broken = r#"[{"clockMs": 0, "x": 0, "y": 0, "width": 1, "height": 1},
                         {"clockMs": 0, "x": 0, "y": 0, "width": 1, "height": 1}]"#;
        assert!(matches!(
            Timeline::from_json_str(broken),
            Err(BeatshowError::InvalidInput(_))
        ));
    }

    #[test]
    fn playback_clock_never_goes_negative() {
        let mut clock = PlaybackClock::default();
        clock.advance(1500.0);
        assert_eq!(clock.seconds(), 1.5);
        clock.advance(-5000.0);
        assert_eq!(clock.time_ms, 0.0);
    }
}
