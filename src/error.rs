//! Error types.

use thiserror::Error;

use crate::frame::{DecodeError, ExceptionResponse};

/// Error classes a reply can finish with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The transport is not open or not connected.
    Connection,
    /// The request could not be sent.
    Write,
    /// The server answered with a Modbus exception.
    Protocol,
    /// No response arrived in time.
    Timeout,
    /// The request was cancelled before a response arrived.
    ReplyAborted,
    /// The response was malformed or did not match the request.
    Unknown,
}

/// Why a request failed, either when it was sent or in its [`Reply`].
///
/// `Timeout` and `ReplyAborted` are never raised by the client itself; the
/// queue reports them through [`Reply::set_error()`].
///
/// [`Reply`]: crate::Reply
/// [`Reply::set_error()`]: crate::Reply::set_error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("Device not connected.")]
    Connection,
    #[error("Invalid Modbus request.")]
    Write,
    #[error("The request could not be enqueued.")]
    Enqueue,
    #[error("Modbus Exception Response: {0}")]
    Protocol(ExceptionResponse),
    #[error("An invalid response has been received: {0}")]
    InvalidResponse(#[from] DecodeError),
    #[error("Request timeout.")]
    Timeout,
    #[error("Reply aborted.")]
    ReplyAborted,
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection => ErrorKind::Connection,
            Self::Write | Self::Enqueue => ErrorKind::Write,
            Self::Protocol(_) => ErrorKind::Protocol,
            Self::InvalidResponse(_) => ErrorKind::Unknown,
            Self::Timeout => ErrorKind::Timeout,
            Self::ReplyAborted => ErrorKind::ReplyAborted,
        }
    }
}
