use serde::{Deserialize, Serialize};

use super::seconds_to_ms;
use crate::{BeatshowError, Result};

/// Regularly sampled loudness levels of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoudnessDataset {
    /// Spacing between samples in milliseconds.
    #[serde(rename = "interval")]
    pub interval_ms: f64,
    /// `[peak, decay, rms]` triplets.
    pub peaks: Vec<[f64; 3]>,
}

impl LoudnessDataset {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|err| BeatshowError::invalid_input(format!("loudness data: {err}")))
    }

    /// Milliseconds covered by the samples.
    pub fn duration_ms(&self) -> f64 {
        self.interval_ms * self.peaks.len() as f64
    }
}

/// One loudness sample.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LoudnessSample {
    pub peak: f64,
    pub decay: f64,
    pub rms: f64,
}

impl From<[f64; 3]> for LoudnessSample {
    fn from([peak, decay, rms]: [f64; 3]) -> Self {
        Self { peak, decay, rms }
    }
}

/// Quantized-time lookups over a [`LoudnessDataset`].
#[derive(Debug, Clone, Copy)]
pub struct LoudnessEnvelope<'a> {
    dataset: &'a LoudnessDataset,
}

impl<'a> LoudnessEnvelope<'a> {
    pub fn new(dataset: &'a LoudnessDataset) -> Result<Self> {
        if !dataset.interval_ms.is_finite() || dataset.interval_ms <= 0.0 {
            return Err(BeatshowError::invalid_input(format!(
                "loudness interval must be positive, got {}",
                dataset.interval_ms
            )));
        }
        Ok(Self { dataset })
    }

    /// Decay level at the song position, or 0 outside the sampled range.
    pub fn get_level(&self, clock_seconds: f64) -> f64 {
        self.sample_at(clock_seconds)
            .map(|sample| sample.decay)
            .unwrap_or(0.0)
    }

    /// Full sample covering the song position.
    pub fn sample_at(&self, clock_seconds: f64) -> Option<LoudnessSample> {
        if !(clock_seconds >= 0.0) {
            return None;
        }
        let index = (seconds_to_ms(clock_seconds) / self.dataset.interval_ms).floor() as usize;
        self.dataset.peaks.get(index).copied().map(LoudnessSample::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> LoudnessDataset {
        LoudnessDataset {
            interval_ms: 250.0,
            peaks: vec![[0.9, 0.5, 0.3], [0.8, 0.4, 0.2], [0.7, 0.3, 0.1]],
        }
    }

    #[test]
    fn returns_decay_component() {
        let data = dataset();
        let envelope = LoudnessEnvelope::new(&data).unwrap();

        assert_eq!(envelope.get_level(0.0), 0.5);
        assert_eq!(envelope.get_level(0.3), 0.4);
        assert_eq!(envelope.get_level(0.7), 0.3);
    }

    #[test]
    fn out_of_range_clocks_are_silent() {
        let data = dataset();
        let envelope = LoudnessEnvelope::new(&data).unwrap();

        assert_eq!(envelope.get_level(-0.01), 0.0);
        assert_eq!(envelope.get_level(0.75), 0.0);
        assert_eq!(envelope.get_level(10.0), 0.0);
        assert_eq!(envelope.get_level(f64::NAN), 0.0);
    }

    #[test]
    fn sample_exposes_every_component() {
        let data = dataset();
        let envelope = LoudnessEnvelope::new(&data).unwrap();

        let sample = envelope.sample_at(0.25).unwrap();
        assert_eq!(
            sample,
            LoudnessSample {
                peak: 0.8,
                decay: 0.4,
                rms: 0.2
            }
        );
    }

    #[test]
    fn rejects_zero_interval() {
        let data = LoudnessDataset {
            interval_ms: 0.0,
            peaks: Vec::new(),
        };
        assert!(matches!(
            LoudnessEnvelope::new(&data),
            Err(BeatshowError::InvalidInput(_))
        ));
    }

    #[test]
    fn parses_levels_export() {
        let data = LoudnessDataset::from_json_str(r#"{"interval": 50, "peaks": [[1, 0.5, 0.25]]}"#)
            .unwrap();
        assert_eq!(data.interval_ms, 50.0);
        assert_eq!(data.duration_ms(), 50.0);
    }
}
