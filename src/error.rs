//! Validation errors surfaced before any simulation runs

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("simulation count must be at least 1")]
    ZeroSimulations,

    #[error("unknown account tier `{0}`")]
    UnknownTier(String),

    #[error("{field} = {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type SimResult<T> = std::result::Result<T, SimError>;
