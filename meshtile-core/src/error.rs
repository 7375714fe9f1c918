//! Error types for meshtile

use thiserror::Error;

/// Main error type for meshtile operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A precondition on the input was violated (bad index, negative depth, ...)
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Cooperative cancellation was requested while tiling
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type alias for meshtile operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidData("face 3 references vertex 9".to_string());
        assert_eq!(format!("{err}"), "Invalid data: face 3 references vertex 9");
        assert_eq!(format!("{}", Error::Cancelled), "Operation cancelled");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
