use thiserror::Error;

/// Estimation error types
///
/// Every variant is raised before the filter's state is touched, so the
/// caller can skip the measurement or adjust parameters and retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Dimension mismatch in {operation}: expected {expected}, got {actual}")]
    DimensionMismatch {
        operation: &'static str,
        expected: String,
        actual: String,
    },

    #[error(
        "Innovation covariance is singular or ill-conditioned \
         (min eigenvalue {min_eigenvalue:e}, condition {condition:e})"
    )]
    SingularInnovationCovariance { min_eigenvalue: f64, condition: f64 },

    #[error("Covariance input {name} is not symmetric (max asymmetry {asymmetry:e})")]
    InvalidCovarianceInput { name: &'static str, asymmetry: f64 },

    #[error("Degenerate model parameters: {0}")]
    DegenerateModelParameters(String),

    #[error("Update called without a preceding predict")]
    UpdateWithoutPredict,

    #[error("Non-finite value encountered in {operation}")]
    NonFinite { operation: &'static str },
}

pub type FilterResult<T> = Result<T, FilterError>;

impl FilterError {
    pub(crate) fn shape(
        operation: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    ) -> Self {
        FilterError::DimensionMismatch {
            operation,
            expected: format!("{}x{}", expected.0, expected.1),
            actual: format!("{}x{}", actual.0, actual.1),
        }
    }

    pub(crate) fn length(operation: &'static str, expected: usize, actual: usize) -> Self {
        FilterError::DimensionMismatch {
            operation,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Errors the driver treats as "drop this measurement and keep going".
    pub fn is_recoverable_measurement(&self) -> bool {
        matches!(
            self,
            FilterError::SingularInnovationCovariance { .. } | FilterError::NonFinite { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_message() {
        let err = FilterError::shape("predict", (9, 9), (6, 6));
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in predict: expected 9x9, got 6x6"
        );
    }

    #[test]
    fn test_recoverable_classification() {
        let singular = FilterError::SingularInnovationCovariance {
            min_eigenvalue: 0.0,
            condition: f64::INFINITY,
        };
        assert!(singular.is_recoverable_measurement());
        assert!(!FilterError::UpdateWithoutPredict.is_recoverable_measurement());
        assert!(!FilterError::length("update", 3, 2).is_recoverable_measurement());
    }
}
