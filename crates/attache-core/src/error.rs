//! Error types for attache.

use thiserror::Error;

/// Result type alias using attache's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for attachment resolution.
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// None of inline content, path or URL is set
    #[error("no content available")]
    NoContent,

    /// No explicit type and nothing to detect one from
    #[error("attachment has no type and no content to derive it from")]
    NoType,

    /// A recognized record field carried a value of the wrong type
    #[error("Invalid field '{key}': expected {expected}, got {actual}")]
    InvalidField {
        key: &'static str,
        expected: &'static str,
        actual: &'static str,
    },
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_no_content() {
        assert_eq!(Error::NoContent.to_string(), "no content available");
    }

    #[test]
    fn test_error_display_no_type() {
        assert_eq!(
            Error::NoType.to_string(),
            "attachment has no type and no content to derive it from"
        );
    }

    #[test]
    fn test_error_display_invalid_field() {
        let err = Error::InvalidField {
            key: "content",
            expected: "bytes",
            actual: "text",
        };
        assert_eq!(
            err.to_string(),
            "Invalid field 'content': expected bytes, got text"
        );
    }

    #[test]
    fn test_error_display_request() {
        let err = Error::Request("connection refused".to_string());
        assert_eq!(err.to_string(), "Request error: connection refused");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        match err {
            Error::Io(inner) => assert_eq!(inner.kind(), std::io::ErrorKind::NotFound),
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(err.to_string().starts_with("Serialization error:"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
