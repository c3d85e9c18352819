//! Error taxonomy for the analyzer core
//!
//! Nothing in the core is fatal. Data shortfalls are reported as recoverable
//! errors so the caller can skip the entity for this cycle and retry later.

use thiserror::Error;

/// Result alias used throughout the analyzer library
pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Fewer samples than the configured window size
    #[error("insufficient data: need at least {required} samples, got {available}")]
    InsufficientData { required: usize, available: usize },

    /// Fewer feature vectors than clusters requested
    #[error("insufficient points for clustering: need at least {required}, got {available}")]
    InsufficientPoints { required: usize, available: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failure reported by a telemetry source
    #[error("metrics source error: {0}")]
    Source(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    /// Whether the caller should simply skip this cycle and try again with more data
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalyzerError::InsufficientData { .. } | AnalyzerError::InsufficientPoints { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(AnalyzerError::InsufficientData {
            required: 10,
            available: 3
        }
        .is_recoverable());
        assert!(AnalyzerError::InsufficientPoints {
            required: 3,
            available: 1
        }
        .is_recoverable());
        assert!(!AnalyzerError::InvalidConfig("k must be positive".into()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = AnalyzerError::InsufficientData {
            required: 10,
            available: 4,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data: need at least 10 samples, got 4"
        );
    }
}
