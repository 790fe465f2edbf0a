use serde::{Deserialize, Serialize};
use tracing::info;

use super::seconds_to_ms;
use crate::{config::DEFAULT_MIN_CONFIDENCE, BeatshowError, Result};

/// A detected rhythmic pulse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatEvent {
    #[serde(rename = "start")]
    pub start_ms: f64,
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// Zero when the analysis could not estimate it.
    #[serde(default)]
    pub confidence: f64,
}

/// A detected measure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarEvent {
    #[serde(rename = "start")]
    pub start_ms: f64,
    #[serde(rename = "duration")]
    pub duration_ms: f64,
}

impl BarEvent {
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms
    }

    fn contains(&self, clock_ms: f64) -> bool {
        clock_ms >= self.start_ms && clock_ms < self.end_ms()
    }
}

/// Beat and bar series of a track, ordered by start time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RhythmDataset {
    pub beats: Vec<BeatEvent>,
    #[serde(default)]
    pub bars: Vec<BarEvent>,
}

impl RhythmDataset {
    /// Parses rhythm data as exported by the analysis tool. A document
    /// without a `beats` array is rejected.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| BeatshowError::invalid_input(format!("rhythm data: {err}")))
    }
}

/// An item of an ordered time series that can be searched with
/// [`find_last`].
pub trait TimedEvent {
    fn start_ms(&self) -> f64;

    /// Items without a confidence score always qualify.
    fn confidence(&self) -> f64 {
        1.0
    }
}

impl TimedEvent for BeatEvent {
    fn start_ms(&self) -> f64 {
        self.start_ms
    }

    fn confidence(&self) -> f64 {
        self.confidence
    }
}

impl TimedEvent for BarEvent {
    fn start_ms(&self) -> f64 {
        self.start_ms
    }
}

/// Returns the latest item starting at or before `clock_ms` whose confidence
/// reaches `confidence_threshold`.
///
/// The series must be ordered by start time; scanning stops at the first
/// qualifying item that starts after the clock.
pub fn find_last<T: TimedEvent>(series: &[T], clock_ms: f64, confidence_threshold: f64) -> Option<&T> {
    let mut found = None;
    for item in series {
        if item.confidence() < confidence_threshold {
            continue;
        }
        if item.start_ms() > clock_ms {
            break;
        }
        found = Some(item);
    }
    found
}

/// Confidence-filtered lookups over a [`RhythmDataset`].
///
/// All clock arguments are song positions in seconds. Lookups are linear
/// scans; a song carries a few hundred beats at most.
#[derive(Debug, Clone, Copy)]
pub struct RhythmIndex<'a> {
    dataset: &'a RhythmDataset,
    max_beat_confidence: f64,
    min_confidence: f64,
}

impl<'a> RhythmIndex<'a> {
    /// Indexes `dataset` with the default confidence threshold of 0.5.
    pub fn new(dataset: &'a RhythmDataset) -> Result<Self> {
        Self::with_threshold(dataset, DEFAULT_MIN_CONFIDENCE)
    }

    /// Indexes `dataset` with a custom default threshold. When no beat
    /// carries any confidence the threshold drops to zero so every beat is
    /// accepted.
    pub fn with_threshold(dataset: &'a RhythmDataset, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(BeatshowError::invalid_input(format!(
                "confidence threshold {threshold} is outside [0, 1]"
            )));
        }
        validate(dataset)?;

        let max_beat_confidence = dataset
            .beats
            .iter()
            .map(|beat| beat.confidence)
            .fold(0.0, f64::max);

        let min_confidence = if max_beat_confidence == 0.0 {
            0.0
        } else {
            threshold
        };

        info!(
            beats = dataset.beats.len(),
            bars = dataset.bars.len(),
            max_beat_confidence,
            min_confidence,
            "indexed rhythm data"
        );

        Ok(Self {
            dataset,
            max_beat_confidence,
            min_confidence,
        })
    }

    pub fn dataset(&self) -> &'a RhythmDataset {
        self.dataset
    }

    /// Highest beat confidence in the whole song.
    pub fn max_beat_confidence(&self) -> f64 {
        self.max_beat_confidence
    }

    /// Threshold applied when a query does not supply its own.
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Finds the next qualifying beat starting strictly after the clock.
    ///
    /// `skip` selects every Nth qualifying beat: 1 (or 0) returns the first
    /// one, 2 the second, and so on.
    pub fn find_next_beat(&self, clock_seconds: f64, skip: usize) -> Option<&'a BeatEvent> {
        let clock_ms = seconds_to_ms(clock_seconds);
        let threshold = self.min_confidence;
        self.dataset
            .beats
            .iter()
            .filter(|beat| beat.confidence >= threshold)
            .filter(|beat| beat.start_ms > clock_ms)
            .nth(skip.max(1) - 1)
    }

    /// Finds the latest qualifying beat that started at or before the clock.
    pub fn find_beat_at_clock(
        &self,
        clock_seconds: f64,
        confidence_threshold: Option<f64>,
    ) -> Option<&'a BeatEvent> {
        let threshold = confidence_threshold.unwrap_or(self.min_confidence);
        find_last(&self.dataset.beats, seconds_to_ms(clock_seconds), threshold)
    }

    /// Index of the bar playing at the clock, if any.
    pub fn find_bar_at_clock(&self, clock_seconds: f64) -> Option<usize> {
        let clock_ms = seconds_to_ms(clock_seconds);
        self.dataset.bars.iter().position(|bar| bar.contains(clock_ms))
    }

    /// Index of the bar following the one playing at the clock. `None` when
    /// no bar is playing or the current bar is the last one.
    pub fn find_next_bar(&self, clock_seconds: f64) -> Option<usize> {
        self.find_bar_at_clock(clock_seconds)
            .map(|index| index + 1)
            .filter(|&next| next < self.dataset.bars.len())
    }

    pub fn bar(&self, index: usize) -> Option<&'a BarEvent> {
        self.dataset.bars.get(index)
    }
}

fn validate(dataset: &RhythmDataset) -> Result<()> {
    let mut previous = f64::NEG_INFINITY;
    for (index, beat) in dataset.beats.iter().enumerate() {
        if !beat.start_ms.is_finite() || beat.start_ms < previous {
            return Err(BeatshowError::invalid_input(format!(
                "beat {index} starts at {} which breaks ascending order",
                beat.start_ms
            )));
        }
        if !(0.0..=1.0).contains(&beat.confidence) {
            return Err(BeatshowError::invalid_input(format!(
                "beat {index} has confidence {} outside [0, 1]",
                beat.confidence
            )));
        }
        previous = beat.start_ms;
    }

    let mut previous = f64::NEG_INFINITY;
    for (index, bar) in dataset.bars.iter().enumerate() {
        if !bar.start_ms.is_finite() || bar.start_ms < previous {
            return Err(BeatshowError::invalid_input(format!(
                "bar {index} starts at {} which breaks ascending order",
                bar.start_ms
            )));
        }
        if !bar.duration_ms.is_finite() || bar.duration_ms < 0.0 {
            return Err(BeatshowError::invalid_input(format!(
                "bar {index} has invalid duration {}",
                bar.duration_ms
            )));
        }
        previous = bar.start_ms;
    }

    Ok(())
}
