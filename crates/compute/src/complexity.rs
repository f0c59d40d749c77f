//! Caller-supplied complexity bound.

use loadcalc_core::{ComplexityPolicy, ComputeConfig};
use tracing::warn;

/// Why a raw complexity string was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComplexityError {
    #[error("complexity must be an integer in [{min}, {max}], got {input:?}")]
    Unparsable { input: String, min: u32, max: u32 },

    #[error("complexity {input} is outside the allowed range [{min}, {max}]")]
    OutOfRange { input: String, value: i64, min: u32, max: u32 },
}

impl ComplexityError {
    /// The raw text the caller sent.
    pub fn input(&self) -> String {
        match self {
            Self::Unparsable { input, .. } | Self::OutOfRange { input, .. } => input.clone(),
        }
    }
}

/// A validated complexity value, always within the configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Complexity(u32);

impl Complexity {
    pub fn value(self) -> u32 {
        self.0
    }

    /// The configured default, used when the parameter is absent.
    pub fn default_for(config: &ComputeConfig) -> Self {
        Self(config.default_complexity)
    }

    /// Strict parse: absent means default, anything else must be an
    /// integer inside `[min_complexity, max_complexity]`.
    pub fn parse(raw: Option<&str>, config: &ComputeConfig) -> Result<Self, ComplexityError> {
        let Some(raw) = raw else {
            return Ok(Self::default_for(config));
        };
        let (min, max) = (config.min_complexity, config.max_complexity);
        let value: i64 = raw.parse().map_err(|_| ComplexityError::Unparsable {
            input: raw.to_string(),
            min,
            max,
        })?;
        if value < i64::from(min) || value > i64::from(max) {
            return Err(ComplexityError::OutOfRange { input: raw.to_string(), value, min, max });
        }
        // In range, so it fits in u32.
        Ok(Self(value as u32))
    }

    /// Parse under the configured [`ComplexityPolicy`].
    pub fn resolve(raw: Option<&str>, config: &ComputeConfig) -> Result<Self, ComplexityError> {
        match (Self::parse(raw, config), config.invalid_policy) {
            (Err(e), ComplexityPolicy::Fallback) => {
                warn!(input = %e.input(), "{}; using default {}", e, config.default_complexity);
                Ok(Self::default_for(config))
            }
            (result, _) => result,
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
