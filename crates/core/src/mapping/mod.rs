use serde::{Deserialize, Serialize};

use crate::{analysis::seconds_to_ms, LoudnessEnvelope, RhythmIndex};

const DEFAULT_PULSE_WINDOW_MS: f64 = 250.0;

/// Runtime matrix of beat-synchronized effect parameters, refilled for every
/// rendered frame.
#[derive(Debug, Clone)]
pub struct EffectMatrix {
    /// How long a beat pulse takes to fade out, in milliseconds.
    pub pulse_window_ms: f64,
    updates: Vec<ParameterUpdate>,
}

impl Default for EffectMatrix {
    fn default() -> Self {
        Self {
            pulse_window_ms: DEFAULT_PULSE_WINDOW_MS,
            updates: Vec::new(),
        }
    }
}

impl EffectMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.updates.clear();
    }

    pub fn updates(&self) -> &[ParameterUpdate] {
        &self.updates
    }

    pub fn push(&mut self, update: ParameterUpdate) {
        self.updates.push(update);
    }

    /// Recomputes `beat`, `bar` and `loudness` for the song position.
    ///
    /// `beat` is 1 on a qualifying beat and fades linearly to 0 over the
    /// pulse window. `bar` is the playing bar index, or -1 between bars.
    pub fn apply_at(
        &mut self,
        clock_seconds: f64,
        rhythm: &RhythmIndex<'_>,
        loudness: Option<&LoudnessEnvelope<'_>>,
    ) -> &[ParameterUpdate] {
        self.clear();

        let clock_ms = seconds_to_ms(clock_seconds);
        let pulse = rhythm
            .find_beat_at_clock(clock_seconds, None)
            .map(|beat| {
                let elapsed = clock_ms - beat.start_ms;
                if self.pulse_window_ms <= 0.0 {
                    return if elapsed == 0.0 { 1.0 } else { 0.0 };
                }
                (1.0 - elapsed / self.pulse_window_ms).clamp(0.0, 1.0)
            })
            .unwrap_or(0.0);
        self.push(ParameterUpdate::new("beat", pulse));

        let bar = rhythm
            .find_bar_at_clock(clock_seconds)
            .map(|index| index as f64)
            .unwrap_or(-1.0);
        self.push(ParameterUpdate::new("bar", bar));

        if let Some(envelope) = loudness {
            self.push(ParameterUpdate::new(
                "loudness",
                envelope.get_level(clock_seconds),
            ));
        }

        &self.updates
    }

    /// Value last computed for `target`.
    pub fn value(&self, target: &str) -> Option<f64> {
        self.updates
            .iter()
            .find(|update| update.target == target)
            .map(|update| update.value)
    }
}

/// Concrete value routed to an effect parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterUpdate {
    pub target: String,
    pub value: f64,
}

impl ParameterUpdate {
    pub fn new(target: impl Into<String>, value: f64) -> Self {
        Self {
            target: target.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BarEvent, BeatEvent, LoudnessDataset, RhythmDataset};

    fn rhythm() -> RhythmDataset {
        RhythmDataset {
            beats: vec![
                BeatEvent {
                    start_ms: 0.0,
                    duration_ms: None,
                    confidence: 0.9,
                },
                BeatEvent {
                    start_ms: 1000.0,
                    duration_ms: None,
                    confidence: 0.8,
                },
            ],
            bars: vec![BarEvent {
                start_ms: 0.0,
                duration_ms: 2000.0,
            }],
        }
    }

    #[test]
    fn beat_pulse_fades_out() {
        let data = rhythm();
        let index = RhythmIndex::new(&data).unwrap();
        let mut matrix = EffectMatrix::new();

        matrix.apply_at(1.0, &index, None);
        assert_eq!(matrix.value("beat"), Some(1.0));

        matrix.apply_at(1.125, &index, None);
        assert_eq!(matrix.value("beat"), Some(0.5));

        matrix.apply_at(1.5, &index, None);
        assert_eq!(matrix.value("beat"), Some(0.0));
        assert_eq!(matrix.value("loudness"), None);
    }

    #[test]
    fn zero_pulse_window_only_flags_the_beat_itself() {
        let data = rhythm();
        let index = RhythmIndex::new(&data).unwrap();
        let mut matrix = EffectMatrix {
            pulse_window_ms: 0.0,
            ..EffectMatrix::default()
        };

        matrix.apply_at(1.0, &index, None);
        assert_eq!(matrix.value("beat"), Some(1.0));

        matrix.apply_at(1.01, &index, None);
        assert_eq!(matrix.value("beat"), Some(0.0));
    }

    #[test]
    fn reports_bar_and_loudness() {
        let data = rhythm();
        let index = RhythmIndex::new(&data).unwrap();
        let levels = LoudnessDataset {
            interval_ms: 500.0,
            peaks: vec![[1.0, 0.6, 0.4], [1.0, 0.2, 0.1]],
        };
        let envelope = LoudnessEnvelope::new(&levels).unwrap();
        let mut matrix = EffectMatrix::new();

        let updates = matrix.apply_at(0.75, &index, Some(&envelope)).to_vec();
        assert_eq!(updates.len(), 3);
        assert_eq!(matrix.value("bar"), Some(0.0));
        assert_eq!(matrix.value("loudness"), Some(0.2));

        matrix.apply_at(3.0, &index, Some(&envelope));
        assert_eq!(matrix.value("bar"), Some(-1.0));
        assert_eq!(matrix.value("loudness"), Some(0.0));
    }
}
