use thiserror::Error;

/// Invalid arguments given when constructing or configuring a component.
///
/// These are raised at assignment time. Nothing in the crate defers such
/// checks to evaluation time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// A scalar that must be nonnegative was negative (or NaN).
    #[error("{name} must be nonnegative, got {value}")]
    Negative {
        /// Name of the offending parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// Two collaborators disagree on a dimension.
    #[error("{what}: expected dimension {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        what: &'static str,
        /// Expected dimension.
        expected: usize,
        /// Dimension actually given.
        actual: usize,
    },
    /// Lower bound is greater than the upper bound.
    #[error("lower bound {lower} exceeds upper bound {upper} at index {index}")]
    InvalidBounds {
        /// Index of the variable.
        index: usize,
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// A list that must contain unique items has a duplicate.
    #[error("the {kind} list must be unique, duplicate id {id}")]
    Duplicate {
        /// Kind of the items (receiver, source).
        kind: &'static str,
        /// Identifier of the duplicate item.
        id: u64,
    },
    /// A required value was not provided.
    #[error("missing {0}")]
    Missing(&'static str),
}

impl ConfigurationError {
    pub(crate) fn check_nonnegative(name: &'static str, value: f64) -> Result<f64, Self> {
        // Written this way to also reject NaN.
        if value >= 0.0 {
            Ok(value)
        } else {
            Err(Self::Negative { name, value })
        }
    }

    pub(crate) fn check_dim(what: &'static str, expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::DimensionMismatch {
                what,
                expected,
                actual,
            })
        }
    }
}

/// Error encountered when an optimization run cannot start from given input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProblemError {
    /// The length of the model does not match the dimensionality of the
    /// objective or its domain.
    #[error("invalid dimensionality: expected {expected}, got {actual}")]
    InvalidDimensionality {
        /// Dimension of the objective.
        expected: usize,
        /// Length of the given model.
        actual: usize,
    },
    /// The objective value is NaN or infinite.
    #[error("invalid value encountered")]
    InvalidValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonnegative_check() {
        assert_eq!(ConfigurationError::check_nonnegative("x", 0.0), Ok(0.0));
        assert!(ConfigurationError::check_nonnegative("x", -1.0).is_err());
        assert!(ConfigurationError::check_nonnegative("x", f64::NAN).is_err());
    }
}
