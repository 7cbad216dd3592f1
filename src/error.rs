use itertools::Itertools;

fn format_dims(dims: &[usize]) -> String {
    format!("[{}]", dims.iter().join(", "))
}

/// Every failure the engine reports.
///
/// The variants are kept distinct so callers driving several independent
/// networks (one per cross-validation fold, say) can tell a caller bug from a
/// bad input and abort only the affected unit of work.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The engine was driven in an order it does not support: execution before
    /// `initialize`, an empty layer chain, a missing storage entry, a backward
    /// pass without a matching forward pass.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two shapes that must agree do not.
    #[error("shape mismatch: expected {}, got {}", format_dims(.expected), format_dims(.got))]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    /// A dimension vector that is empty or contains a zero.
    #[error("invalid shape {}: dimensions must be non-empty and positive", format_dims(.0))]
    InvalidShape(Vec<usize>),

    /// The model cannot produce the requested kind of output.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A structure that should always resolve did not, e.g. a split whose
    /// comparison is unordered.
    #[error("degenerate structure: {0}")]
    Degenerate(String),

    /// Learner or validation settings out of range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Error::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = Error::shape_mismatch(&[1, 4], &[1, 3]);
        assert_eq!(err.to_string(), "shape mismatch: expected [1, 4], got [1, 3]");
    }

    #[test]
    fn test_invalid_shape_message() {
        let err = Error::InvalidShape(vec![2, 0]);
        assert_eq!(
            err.to_string(),
            "invalid shape [2, 0]: dimensions must be non-empty and positive"
        );
    }
}
