pub use bytes;
pub use log;

pub mod error;
pub use self::error::{Error, ErrorKind};

pub mod frame;

pub mod codec;
pub use codec::PduCodec;

pub mod client;
pub use client::{Client, Reply};

/// Result type with this crate's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
