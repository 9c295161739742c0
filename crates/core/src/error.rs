/// Result alias that carries the custom [`PianoRollError`] type.
pub type Result<T> = std::result::Result<T, PianoRollError>;

/// Common error type for the core crate.
///
/// Editing operations never fail: out-of-range input is clamped and unknown
/// note ids are ignored. What remains are caller bugs (a degenerate grid) and
/// the usual IO and parsing failures around configuration and scripts.
#[derive(Debug, thiserror::Error)]
pub enum PianoRollError {
    /// A zero, negative or non-finite scale factor reached the mapper.
    #[error("invalid grid geometry: {0}")]
    InvalidGeometry(String),
    /// A configuration value outside of its supported range.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl PianoRollError {
    pub fn geometry<T: Into<String>>(msg: T) -> Self {
        Self::InvalidGeometry(msg.into())
    }
}
