//! Error types for cutout operations

use thiserror::Error;

/// Result type alias for cutout operations
pub type Result<T> = std::result::Result<T, CutoutError>;

/// Error types for the cutout pipeline
///
/// Every variant is fatal for the image being processed and for that image
/// only. Degenerate segmentation (no foreground left) is not an error; see
/// [`crate::types::SegmentationReport::is_degenerate`].
#[derive(Error, Debug)]
pub enum CutoutError {
    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors raised by the image codec
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// Input could not be read or decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Output could not be encoded or written
    #[error("Encode error: {0}")]
    Encode(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Pipeline stage failures
    #[error("Processing error: {0}")]
    Processing(String),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CutoutError {
    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new encode error
    pub fn encode<S: Into<String>>(msg: S) -> Self {
        Self::Encode(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a new processing error
    pub fn processing<S: Into<String>>(msg: S) -> Self {
        Self::Processing(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: &std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {} '{}': {}", operation, path_display, error),
        ))
    }

    /// Create decode error for an input file with format context
    pub fn image_load_error<P: AsRef<std::path::Path>>(path: P, error: &image::ImageError) -> Self {
        let path_ref = path.as_ref();
        let extension = path_ref
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown");

        Self::Decode(format!(
            "Failed to load image '{}' (format: {}): {}. Supported formats: PNG, JPEG, TIFF, BMP",
            path_ref.display(),
            extension,
            error
        ))
    }

    /// Create configuration error with valid ranges
    pub fn config_value_error<T: std::fmt::Display>(
        parameter: &str,
        value: T,
        valid_range: &str,
        recommended: Option<T>,
    ) -> Self {
        let recommendation = match recommended {
            Some(rec) => format!(" Recommended: {}", rec),
            None => String::new(),
        };

        Self::InvalidConfig(format!(
            "Invalid {}: {} (valid range: {}).{}",
            parameter, value, valid_range, recommendation
        ))
    }

    /// Create processing error with stage context
    pub fn processing_stage_error(stage: &str, details: &str, input_info: Option<&str>) -> Self {
        let input_context = match input_info {
            Some(info) => format!(" (input: {})", info),
            None => String::new(),
        };

        Self::Processing(format!(
            "Processing failed at stage '{}'{}: {}",
            stage, input_context, details
        ))
    }

    /// Whether this failure happened while reading the input
    #[must_use]
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_creation() {
        let err = CutoutError::invalid_config("test config error");
        assert!(matches!(err, CutoutError::InvalidConfig(_)));

        let err = CutoutError::decode("truncated");
        assert!(err.is_decode_failure());

        let err = CutoutError::encode("disk full");
        assert!(matches!(err, CutoutError::Encode(_)));
        assert!(!err.is_decode_failure());
    }

    #[test]
    fn test_error_display() {
        let err = CutoutError::invalid_config("canonical size must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: canonical size must be positive"
        );
    }

    #[test]
    fn test_enhanced_error_context() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = CutoutError::file_io_error("write cutout", Path::new("/out/dish.png"), &io_error);
        let error_string = err.to_string();
        assert!(error_string.contains("write cutout"));
        assert!(error_string.contains("/out/dish.png"));

        let err = CutoutError::config_value_error("shadow threshold", 1.5, "0.0-1.0", Some(0.45));
        let error_string = err.to_string();
        assert!(error_string.contains("shadow threshold"));
        assert!(error_string.contains("1.5"));
        assert!(error_string.contains("0.0-1.0"));
        assert!(error_string.contains("Recommended: 0.45"));

        let err = CutoutError::processing_stage_error(
            "canvas resize",
            "zero-sized input",
            Some("0x0 RGBA"),
        );
        let error_string = err.to_string();
        assert!(error_string.contains("canvas resize"));
        assert!(error_string.contains("0x0 RGBA"));
    }
}
