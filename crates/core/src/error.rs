use thiserror::Error;

/// Inconsistent settings detected by [`crate::Config::validate`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max complexity must be >= {min}, got {max}")]
    EmptyComplexityRange { min: u32, max: u32 },

    #[error("default complexity {value} is outside [{min}, {max}]")]
    DefaultOutOfRange { value: u32, min: u32, max: u32 },

    #[error("pause window {min_ms}ms + {additional_ms}ms overflows")]
    PauseOverflow { min_ms: u64, additional_ms: u64 },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("unknown complexity policy: {0} (expected 'reject' or 'fallback')")]
    UnknownPolicy(String),
}
