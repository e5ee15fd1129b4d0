//! Device-level error codes
//!
//! Codes below zero are reported by the link layer (HDLC supervisory and
//! unnumbered frames); codes above zero are data access results returned
//! by the application layer.

use std::fmt;

/// Error code carried by a completed device reply
///
/// `0` is success and never appears as an `ErrorCode` inside an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// DM frame: the device is in disconnected mode
    DisconnectMode,
    /// RNR frame: the device is not ready to receive
    ReceiveNotReady,
    /// FRMR frame: the device rejected the last frame
    Rejected,
    /// The frame was not acceptable
    UnacceptableFrame,
    Ok,
    HardwareFault,
    TemporaryFailure,
    ReadWriteDenied,
    UndefinedObject,
    InconsistentClass,
    UnavailableObject,
    UnmatchedType,
    AccessViolated,
    DataBlockUnavailable,
    LongGetOrReadAborted,
    NoLongGetOrReadInProgress,
    LongSetOrWriteAborted,
    NoLongSetOrWriteInProgress,
    DataBlockNumberInvalid,
    OtherReason,
    /// Any code without a dedicated variant
    Unknown(i32),
}

impl ErrorCode {
    /// Numeric value as stored in a reply
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::DisconnectMode => -4,
            ErrorCode::ReceiveNotReady => -3,
            ErrorCode::Rejected => -2,
            ErrorCode::UnacceptableFrame => -1,
            ErrorCode::Ok => 0,
            ErrorCode::HardwareFault => 1,
            ErrorCode::TemporaryFailure => 2,
            ErrorCode::ReadWriteDenied => 3,
            ErrorCode::UndefinedObject => 4,
            ErrorCode::InconsistentClass => 9,
            ErrorCode::UnavailableObject => 11,
            ErrorCode::UnmatchedType => 12,
            ErrorCode::AccessViolated => 13,
            ErrorCode::DataBlockUnavailable => 14,
            ErrorCode::LongGetOrReadAborted => 15,
            ErrorCode::NoLongGetOrReadInProgress => 16,
            ErrorCode::LongSetOrWriteAborted => 17,
            ErrorCode::NoLongSetOrWriteInProgress => 18,
            ErrorCode::DataBlockNumberInvalid => 19,
            ErrorCode::OtherReason => 250,
            ErrorCode::Unknown(code) => *code,
        }
    }

    /// Check if the device asked for the whole exchange to be repeated
    pub fn is_rejected(&self) -> bool {
        matches!(self, ErrorCode::Rejected)
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            -4 => ErrorCode::DisconnectMode,
            -3 => ErrorCode::ReceiveNotReady,
            -2 => ErrorCode::Rejected,
            -1 => ErrorCode::UnacceptableFrame,
            0 => ErrorCode::Ok,
            1 => ErrorCode::HardwareFault,
            2 => ErrorCode::TemporaryFailure,
            3 => ErrorCode::ReadWriteDenied,
            4 => ErrorCode::UndefinedObject,
            9 => ErrorCode::InconsistentClass,
            11 => ErrorCode::UnavailableObject,
            12 => ErrorCode::UnmatchedType,
            13 => ErrorCode::AccessViolated,
            14 => ErrorCode::DataBlockUnavailable,
            15 => ErrorCode::LongGetOrReadAborted,
            16 => ErrorCode::NoLongGetOrReadInProgress,
            17 => ErrorCode::LongSetOrWriteAborted,
            18 => ErrorCode::NoLongSetOrWriteInProgress,
            19 => ErrorCode::DataBlockNumberInvalid,
            250 => ErrorCode::OtherReason,
            other => ErrorCode::Unknown(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorCode::DisconnectMode => "Disconnect mode",
            ErrorCode::ReceiveNotReady => "Receive not ready",
            ErrorCode::Rejected => "Rejected",
            ErrorCode::UnacceptableFrame => "Unacceptable frame",
            ErrorCode::Ok => "Ok",
            ErrorCode::HardwareFault => "Hardware fault",
            ErrorCode::TemporaryFailure => "Temporary failure",
            ErrorCode::ReadWriteDenied => "Read/write denied",
            ErrorCode::UndefinedObject => "Undefined object",
            ErrorCode::InconsistentClass => "Inconsistent class",
            ErrorCode::UnavailableObject => "Unavailable object",
            ErrorCode::UnmatchedType => "Unmatched type",
            ErrorCode::AccessViolated => "Access violated",
            ErrorCode::DataBlockUnavailable => "Data block unavailable",
            ErrorCode::LongGetOrReadAborted => "Long get or read aborted",
            ErrorCode::NoLongGetOrReadInProgress => "No long get or read in progress",
            ErrorCode::LongSetOrWriteAborted => "Long set or write aborted",
            ErrorCode::NoLongSetOrWriteInProgress => "No long set or write in progress",
            ErrorCode::DataBlockNumberInvalid => "Data block number invalid",
            ErrorCode::OtherReason => "Other reason",
            ErrorCode::Unknown(code) => return write!(f, "Unknown error {}", code),
        };
        f.write_str(text)
    }
}
