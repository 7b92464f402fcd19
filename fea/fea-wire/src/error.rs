//! Error types for the wire protocol.

use thiserror::Error;

/// Errors that can occur while encoding or decoding container state.
///
/// Every failure propagates upward as an `Err`; the caller decides
/// whether to abort the distributed step.
#[derive(Debug, Error)]
pub enum WireError {
    /// Underlying I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream does not start with the state magic bytes.
    #[error("invalid state magic: {0:?}")]
    BadMagic([u8; 4]),

    /// The stream's format version is not supported.
    #[error("unsupported state version: {0}")]
    UnsupportedVersion(u32),

    /// Payload serialization failed.
    #[error("state serialize error: {0}")]
    Serialize(String),

    /// Payload deserialization failed.
    #[error("state deserialize error: {0}")]
    Deserialize(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WireError::BadMagic(*b"XXXX");
        assert!(err.to_string().contains("magic"));

        let err = WireError::UnsupportedVersion(9);
        assert!(err.to_string().contains("9"));
    }
}
