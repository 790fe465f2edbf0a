//! Queries over pre-computed musical analysis data.
//!
//! Both datasets are produced by an external analysis tool and handed to the
//! core already materialised. The query types borrow them and never mutate
//! them, so a single dataset can back any number of concurrent readers.

mod loudness;
mod rhythm;

pub use loudness::{LoudnessDataset, LoudnessEnvelope, LoudnessSample};
pub use rhythm::{find_last, BarEvent, BeatEvent, RhythmDataset, RhythmIndex, TimedEvent};

/// Converts a song position in seconds into the millisecond clock the
/// datasets are expressed in.
pub(crate) fn seconds_to_ms(clock_seconds: f64) -> f64 {
    clock_seconds * 1000.0
}
