use crate::error_code::ErrorCode;
use thiserror::Error;

/// Main error type for DLMS reader operations
#[derive(Error, Debug)]
pub enum DlmsError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Timeout")]
    Timeout,

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Frame invalid: {0}")]
    FrameInvalid(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// An empty frame was handed to the engine while no physical frame was
    /// still arriving.
    #[error("Packet is empty")]
    EmptyPacket,

    /// The device did not answer within the wait time for every attempt.
    #[error("Failed to receive reply from the device in given time ({attempts} attempts)")]
    RetriesExhausted { attempts: u32 },

    /// The device answered with a nonzero error code.
    #[error("DLMS error: {0}")]
    Device(ErrorCode),

    /// A list read returned a different number of values than requested.
    #[error("Invalid reply count: got {actual}, expected {expected}")]
    CountMismatch { expected: usize, actual: usize },
}

impl DlmsError {
    /// Build a `Connection` error of kind `NotConnected`
    pub fn not_connected(message: &str) -> Self {
        DlmsError::Connection(std::io::Error::new(
            std::io::ErrorKind::NotConnected,
            message.to_string(),
        ))
    }

    /// Device error code carried by this error, if any
    pub fn device_code(&self) -> Option<ErrorCode> {
        match self {
            DlmsError::Device(code) => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for DLMS reader operations
pub type DlmsResult<T> = Result<T, DlmsError>;
