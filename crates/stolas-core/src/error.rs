//! Error types for decompression operations.

use thiserror::Error;

/// Result type alias for decompression operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Decompression error types.
#[derive(Debug, Error)]
pub enum Error {
    /// Input data is corrupted or invalid.
    #[error("corrupted data: {message}")]
    CorruptedData {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Buffer too small for output.
    #[error("buffer too small: need {required} bytes, got {provided}")]
    BufferTooSmall { required: usize, provided: usize },

    /// Frame requires a larger window than the configured ceiling.
    #[error("window too large: frame requests {requested} bytes, limit is {limit}")]
    WindowTooLarge { requested: u64, limit: u64 },

    /// Decoded byte count disagrees with the frame's declared content size.
    #[error("content size mismatch: frame declared {expected} bytes, decoded {actual}")]
    ContentSizeMismatch { expected: u64, actual: u64 },

    /// Dictionary not found or invalid.
    #[error("invalid dictionary: {0}")]
    InvalidDictionary(String),

    /// Frame references a dictionary the caller did not supply.
    #[error("dictionary mismatch: frame wants id {expected}, have {found}")]
    DictionaryMismatch { expected: u32, found: u32 },

    /// Checksum verification failed.
    #[error("checksum mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Unexpected end of input stream.
    #[error("unexpected EOF after {bytes_read} bytes")]
    UnexpectedEof { bytes_read: usize },

    /// Streaming decode made no progress over repeated calls.
    #[error("no forward progress after {calls} consecutive calls")]
    NoForwardProgress { calls: u32 },

    /// I/O error from underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stream state error.
    #[error("invalid state: expected {expected}, got {actual}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },

    /// Unsupported feature or format.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Create a corrupted data error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Error::CorruptedData {
            message: message.into(),
            source: None,
        }
    }

    /// Create a corrupted data error with offset context.
    pub fn corrupted_at(message: impl Into<String>, offset: usize) -> Self {
        Error::CorruptedData {
            message: format!("{} at offset {}", message.into(), offset),
            source: None,
        }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(required: usize, provided: usize) -> Self {
        Error::BufferTooSmall { required, provided }
    }

    /// Create a checksum mismatch error.
    pub fn checksum_mismatch(expected: u32, actual: u32) -> Self {
        Error::ChecksumMismatch { expected, actual }
    }

    /// Create an unexpected EOF error.
    pub fn unexpected_eof(bytes_read: usize) -> Self {
        Error::UnexpectedEof { bytes_read }
    }

    /// Create a content size mismatch error.
    pub fn content_size_mismatch(expected: u64, actual: u64) -> Self {
        Error::ContentSizeMismatch { expected, actual }
    }

    /// Create an I/O error with a custom message.
    pub fn io(message: impl Into<String>) -> Self {
        Error::Io(std::io::Error::other(message.into()))
    }

    /// Check if error is recoverable (can retry with more input or a bigger buffer).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedEof { .. } | Error::BufferTooSmall { .. }
        )
    }

    /// Get error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::CorruptedData { .. } => "corrupted_data",
            Error::BufferTooSmall { .. } => "buffer_too_small",
            Error::WindowTooLarge { .. } => "window_too_large",
            Error::ContentSizeMismatch { .. } => "content_size_mismatch",
            Error::InvalidDictionary(_) => "invalid_dictionary",
            Error::DictionaryMismatch { .. } => "dictionary_mismatch",
            Error::ChecksumMismatch { .. } => "checksum_mismatch",
            Error::UnexpectedEof { .. } => "unexpected_eof",
            Error::NoForwardProgress { .. } => "no_forward_progress",
            Error::Io(_) => "io_error",
            Error::InvalidState { .. } => "invalid_state",
            Error::Unsupported(_) => "unsupported",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupted_formats_message() {
        let err = Error::corrupted("bad block header");
        assert_eq!(err.to_string(), "corrupted data: bad block header");
        assert_eq!(err.category(), "corrupted_data");
    }

    #[test]
    fn test_corrupted_at_includes_offset() {
        let err = Error::corrupted_at("reserved bit set", 17);
        assert!(err.to_string().contains("at offset 17"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::unexpected_eof(4).is_recoverable());
        assert!(Error::buffer_too_small(100, 10).is_recoverable());
        assert!(!Error::corrupted("x").is_recoverable());
        assert!(!Error::checksum_mismatch(1, 2).is_recoverable());
    }

    #[test]
    fn test_category_names_are_stable() {
        assert_eq!(
            Error::WindowTooLarge {
                requested: 1 << 30,
                limit: 1 << 27
            }
            .category(),
            "window_too_large"
        );
        assert_eq!(
            Error::content_size_mismatch(10, 11).category(),
            "content_size_mismatch"
        );
        assert_eq!(
            Error::DictionaryMismatch {
                expected: 7,
                found: 0
            }
            .category(),
            "dictionary_mismatch"
        );
    }
}
