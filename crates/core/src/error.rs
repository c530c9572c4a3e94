/// Result alias that carries the custom [`TempoError`] type.
pub type Result<T> = std::result::Result<T, TempoError>;

/// Error type for the I/O edges of the crate.
///
/// The tracking core itself never fails: degenerate numeric input is resolved
/// inside [`crate::Engine::update`]. Errors only surface where configuration
/// is read, where snapshots cross thread boundaries, or where the command line
/// front-end reads its input files.
#[derive(Debug, thiserror::Error)]
pub enum TempoError {
    /// Free-form message for failures without a richer representation.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON configuration or onset files.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl TempoError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for TempoError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for TempoError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
