//! Error types for the vigia engines.
//!
//! Every operation validates its inputs up front and fails fast with one of
//! the variants below. Callers that only care about the broad class of
//! failure can use [`VigiaError::kind`].

use thiserror::Error;

/// Broad classification of a [`VigiaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ErrorKind {
    /// Malformed or mutually inconsistent input shapes.
    #[display("validation")]
    Validation,
    /// Not enough models, history or categories to compute a result.
    #[display("insufficient_data")]
    InsufficientData,
    /// A metric or score escaped its documented bound.
    #[display("range")]
    Range,
}

/// The main error type for vigia operations.
#[derive(Debug, Error)]
pub enum VigiaError {
    /// Inconsistent or malformed input (mismatched horizons, bad timestamps...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Weight vector or weight bounds violate their construction rules.
    #[error("Invalid weight configuration: {0}")]
    InvalidWeightConfig(String),

    /// Fewer forecast records than the operation needs.
    #[error("Insufficient models: need at least {required}, got {actual}")]
    InsufficientModels {
        /// Minimum number of records required
        required: usize,
        /// Number of records supplied
        actual: usize,
    },

    /// Generic shortage of data (empty score set, empty history...).
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Conformal uncertainty was requested before any residual was recorded.
    #[error("Calibration set is empty")]
    EmptyCalibrationSet,

    /// A raw risk metric is negative, NaN, or a probability above one.
    #[error("Metric '{metric}' out of range: {value}")]
    OutOfRangeMetric {
        /// Name of the offending metric
        metric: String,
        /// The rejected value
        value: f64,
    },

    /// A derived score or parameter is outside its documented bound.
    #[error("Out of range: {0}")]
    Range(String),

    /// Generic error for other cases.
    #[error("Error: {0}")]
    Other(String),
}

impl VigiaError {
    /// Taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidWeightConfig(_) | Self::Other(_) => {
                ErrorKind::Validation
            }
            Self::InsufficientModels { .. }
            | Self::InsufficientData(_)
            | Self::EmptyCalibrationSet => ErrorKind::InsufficientData,
            Self::OutOfRangeMetric { .. } | Self::Range(_) => ErrorKind::Range,
        }
    }

    /// Shorthand for an [`VigiaError::OutOfRangeMetric`].
    pub fn out_of_range(metric: impl Into<String>, value: f64) -> Self {
        Self::OutOfRangeMetric {
            metric: metric.into(),
            value,
        }
    }
}

impl From<String> for VigiaError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}

impl From<&str> for VigiaError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

/// A specialized Result type for vigia operations.
pub type Result<T> = std::result::Result<T, VigiaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VigiaError::InsufficientModels {
            required: 2,
            actual: 1,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient models: need at least 2, got 1"
        );

        let err = VigiaError::out_of_range("default_probability", 1.5);
        assert_eq!(
            err.to_string(),
            "Metric 'default_probability' out of range: 1.5"
        );
    }

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(
            VigiaError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            VigiaError::InvalidWeightConfig("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            VigiaError::EmptyCalibrationSet.kind(),
            ErrorKind::InsufficientData
        );
        assert_eq!(
            VigiaError::out_of_range("spread", -1.0).kind(),
            ErrorKind::Range
        );
        assert_eq!(ErrorKind::InsufficientData.to_string(), "insufficient_data");
    }

    #[test]
    fn test_error_from_str() {
        let err: VigiaError = "boom".into();
        assert!(matches!(err, VigiaError::Other(_)));
    }
}
