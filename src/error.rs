// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for rig construction.
//!
//! Only a genuinely unprocessable input surfaces as an error. Detection service
//! failures never appear here: the client collapses them into "no result" and the
//! assembler falls back to the proportional rig.

use std::fmt;

/// Result type alias for rig operations.
pub type Result<T> = std::result::Result<T, RigError>;

/// Main error type for the rigging library.
#[derive(Debug)]
pub enum RigError {
    /// The source could not be read or decoded as an image, or has zero size.
    DecodeError(String),
    /// Error encoding or manipulating image buffers.
    ImageError(String),
    /// Invalid configuration or an invalid skeleton definition.
    ConfigError(String),
    /// Error serializing or parsing the character config.
    SerializationError(String),
    /// IO error with context (file not found, permission denied, etc.).
    IoError(String),
    /// Wrapped `std::io::Error`
    Io(std::io::Error),
}

impl fmt::Display for RigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Decode error: {msg}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::SerializationError(msg) => write!(f, "Serialization error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for RigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for RigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for RigError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<serde_yaml::Error> for RigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RigError::DecodeError("test".to_string());
        assert_eq!(err.to_string(), "Decode error: test");

        let err = RigError::ConfigError("test".to_string());
        assert_eq!(err.to_string(), "Config error: test");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let err = RigError::from(std::io::Error::other("disk full"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "IO error: disk full");

        let err = RigError::ImageError("bad".to_string());
        assert!(err.source().is_none());
    }
}
