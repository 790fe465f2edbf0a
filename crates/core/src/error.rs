/// Result alias that carries the custom [`BeatshowError`] type.
pub type Result<T> = std::result::Result<T, BeatshowError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum BeatshowError {
    /// A dataset handed to the core is missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A geometry or playback configuration can never be satisfied.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Randomized placement of a single keyframe ran out of attempts. The
    /// whole timeline generation is aborted.
    #[error("could not place key frame at {clock_ms} ms after {attempts} attempts")]
    KeyFrameSearchExhausted { clock_ms: f64, attempts: usize },
    /// Failure while decoding JSON configuration or datasets.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Free-form message, mostly surfaced by the command line front end.
    #[error("{0}")]
    Message(String),
}

impl BeatshowError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn invalid_input<T: Into<String>>(msg: T) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub(crate) fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for BeatshowError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BeatshowError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
