//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur while reading or writing model files
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// A directive or topology the loader refuses (polygons, free-form geometry)
    #[error("Unsupported input at line {line}: {message}")]
    Unsupported { line: usize, message: String },

    #[error("Material '{name}' referenced at line {line} is not defined in any material library")]
    MissingMaterial { name: String, line: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        IoError::ParseError {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn unsupported<S: Into<String>>(line: usize, message: S) -> Self {
        IoError::Unsupported {
            line,
            message: message.into(),
        }
    }
}

impl From<IoError> for meshtile_core::Error {
    fn from(e: IoError) -> Self {
        match e {
            IoError::Io(io) => meshtile_core::Error::Io(io),
            IoError::FileNotFound { path } => meshtile_core::Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path),
            )),
            e @ IoError::ParseError { .. } => meshtile_core::Error::InvalidData(e.to_string()),
            e @ (IoError::Unsupported { .. } | IoError::MissingMaterial { .. }) => {
                meshtile_core::Error::Unsupported(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_into_core_error() {
        let err: meshtile_core::Error = IoError::parse(4, "bad vertex").into();
        assert!(matches!(err, meshtile_core::Error::InvalidData(ref m) if m.contains("line 4")));

        let err: meshtile_core::Error = IoError::MissingMaterial {
            name: "roof".to_string(),
            line: 12,
        }
        .into();
        assert!(matches!(err, meshtile_core::Error::Unsupported(ref m) if m.contains("roof")));

        let err: meshtile_core::Error = IoError::FileNotFound {
            path: "a.obj".to_string(),
        }
        .into();
        assert!(matches!(err, meshtile_core::Error::Io(_)));
    }
}
