//! Error model for the connection codec (RFC 7540 Section 7).
//!
//! Every codec entry point returns a [`Status`] instead of stashing an error
//! flag on the codec object for later inspection: the error code is attached
//! at the call site that detected the problem.

use thiserror::Error;

/// HTTP/2 error codes (RFC 7540 Section 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError,
    ProtocolError,
    InternalError,
    FlowControlError,
    SettingsTimeout,
    StreamClosed,
    FrameSizeError,
    RefusedStream,
    Cancel,
    CompressionError,
    ConnectError,
    EnhanceYourCalm,
    InadequateSecurity,
    Http11Required,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::NoError => 0x0,
            ErrorCode::ProtocolError => 0x1,
            ErrorCode::InternalError => 0x2,
            ErrorCode::FlowControlError => 0x3,
            ErrorCode::SettingsTimeout => 0x4,
            ErrorCode::StreamClosed => 0x5,
            ErrorCode::FrameSizeError => 0x6,
            ErrorCode::RefusedStream => 0x7,
            ErrorCode::Cancel => 0x8,
            ErrorCode::CompressionError => 0x9,
            ErrorCode::ConnectError => 0xa,
            ErrorCode::EnhanceYourCalm => 0xb,
            ErrorCode::InadequateSecurity => 0xc,
            ErrorCode::Http11Required => 0xd,
        }
    }

    /// Unknown codes map to INTERNAL_ERROR, matching RFC 7540's instruction
    /// to treat unrecognized error codes as equivalent to INTERNAL_ERROR.
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0 => ErrorCode::NoError,
            0x1 => ErrorCode::ProtocolError,
            0x2 => ErrorCode::InternalError,
            0x3 => ErrorCode::FlowControlError,
            0x4 => ErrorCode::SettingsTimeout,
            0x5 => ErrorCode::StreamClosed,
            0x6 => ErrorCode::FrameSizeError,
            0x7 => ErrorCode::RefusedStream,
            0x8 => ErrorCode::Cancel,
            0x9 => ErrorCode::CompressionError,
            0xa => ErrorCode::ConnectError,
            0xb => ErrorCode::EnhanceYourCalm,
            0xc => ErrorCode::InadequateSecurity,
            0xd => ErrorCode::Http11Required,
            _ => ErrorCode::InternalError,
        }
    }
}

/// A structured HTTP/2 error carrying the RFC error code plus a debug string,
/// used internally wherever `std::error::Error` is expected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code:?}: {message}")]
pub struct Http2Error {
    pub code: ErrorCode,
    pub message: String,
}

impl Http2Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Outcome of a codec operation. Replaces the `SetErrno` + out-of-band
/// inspection pattern: the error code travels with the status itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The operation completed and consumed all it needed.
    Ok,
    /// The operation completed partially (e.g. one frame of several queued).
    PartOk,
    /// Not enough input to make progress; the caller should supply more
    /// bytes and retry. The input cursor is left exactly where it was.
    Pause,
    /// A recoverable, stream-scoped error occurred; an RST_STREAM was
    /// queued and the connection continues.
    PartErr(ErrorCode),
    /// An unrecoverable, connection-scoped error occurred; a GOAWAY was
    /// queued and the caller should close the transport.
    Err(ErrorCode),
}

impl Status {
    pub fn is_error(self) -> bool {
        matches!(self, Status::PartErr(_) | Status::Err(_))
    }
}
