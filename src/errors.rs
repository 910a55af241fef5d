//! Custom error types for fgindel operations.

use thiserror::Error;

/// Result type alias for fgindel operations
pub type Result<T> = std::result::Result<T, FgindelError>;

/// Error type for fgindel operations
#[derive(Error, Debug)]
pub enum FgindelError {
    /// Evidence key string could not be parsed
    #[error("Malformed evidence key '{key}': {reason}")]
    MalformedEvidenceKey {
        /// The offending key string
        key: String,
        /// Explanation of the problem
        reason: String,
    },

    /// Invalid parameter value provided
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// The parameter name
        parameter: String,
        /// Explanation of why it's invalid
        reason: String,
    },
}
