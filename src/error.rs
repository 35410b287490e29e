use std::path::PathBuf;

use thiserror::Error;

/// Library error type for stereo viewer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A pair request is missing one half, or an operation that needs a
    /// loaded source found none.
    #[error("invalid stereo source: {0}")]
    InvalidSource(String),

    /// The immersive session request was rejected or the driver is gone.
    #[error("immersive session request failed: {0}")]
    SessionNegotiation(String),

    /// An image failed to decode.
    #[error("failed to decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML/serde configuration error.
    #[error(transparent)]
    Config(#[from] serde_yaml::Error),
}
