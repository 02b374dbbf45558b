//! Error types for document conversion
//!
//! Only [`DocStructError::InvalidPackage`] is fatal to a conversion; missing
//! optional package parts and malformed per-element properties are absorbed
//! at the site with best-effort defaults.

use thiserror::Error;

/// Errors surfaced by document conversion
#[derive(Error, Debug)]
pub enum DocStructError {
    /// The input cannot be read as an OOXML word-processing package.
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// File I/O failure while reading the input.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for [`Result<T, DocStructError>`].
pub type Result<T> = std::result::Result<T, DocStructError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_package_display() {
        let error = DocStructError::InvalidPackage("not a ZIP archive".to_string());
        assert_eq!(format!("{error}"), "invalid package: not a ZIP archive");
    }

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: DocStructError = io_err.into();
        match error {
            DocStructError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{ bad json")
            .expect_err("parse must fail");
        let error: DocStructError = json_err.into();
        assert!(matches!(error, DocStructError::Json(_)));
    }

    #[test]
    fn propagation_with_question_mark() {
        fn inner() -> Result<()> {
            Err(DocStructError::InvalidPackage("truncated".to_string()))
        }
        fn outer() -> Result<()> {
            inner()?;
            Ok(())
        }
        assert!(matches!(outer(), Err(DocStructError::InvalidPackage(_))));
    }
}
