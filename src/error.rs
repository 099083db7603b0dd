use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

/// Errors raised while configuring or stepping a colony.
#[derive(Debug, Error)]
pub enum SimError {
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// The caller's position array is out of lockstep with the ant array.
    #[error("expected {expected} ant positions, got {actual}")]
    PositionCountMismatch { expected: usize, actual: usize },

    #[error("position of ant {index} is not finite")]
    NonFinitePosition { index: usize },

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    Json(#[from] serde_json::Error),
}
