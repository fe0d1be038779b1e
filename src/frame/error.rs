use thiserror::Error;

use super::{ExceptionCode, FunctionCode, Word};

/// Why a response PDU was rejected by the decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("The response is not a structurally valid PDU.")]
    InvalidPdu,

    #[error("The response is an exception response: {0}")]
    Exception(ExceptionCode),

    #[error("Function code mismatch: expected {expected}, received {received}")]
    FunctionCodeMismatch {
        expected: FunctionCode,
        received: FunctionCode,
    },

    #[error("Response data too short: need at least {minimum} bytes, got {actual}")]
    TooShort { minimum: usize, actual: usize },

    #[error("Response data size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Declared byte count {declared} does not match the {available} bytes available")]
    ByteCountMismatch { declared: usize, available: usize },

    #[error("Byte count {0} does not cover whole 16-bit registers")]
    OddByteCount(usize),

    #[error("Invalid single coil value 0x{0:04X}")]
    InvalidCoilValue(Word),

    #[error("Quantity {0} is out of the allowed range")]
    QuantityOutOfRange(usize),

    #[error("Response carries {available} bits but {expected} were requested")]
    InsufficientBits { expected: usize, available: usize },

    #[error("Function code {0} is not supported")]
    Unsupported(FunctionCode),
}
