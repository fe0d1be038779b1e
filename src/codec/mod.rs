//! Encoding of requests, decoding of responses, and the coil bit packing
//! both directions share.

use crate::{
    bytes::{BufMut, Bytes, BytesMut},
    frame::Coil,
};

mod request;
pub use self::request::{build_read_request, build_read_write_request, build_write_request};

mod response;
pub use self::response::{decode_response, ResponseExtension, Unsupported};

pub mod pdu;
pub use self::pdu::PduCodec;

/// Number of bytes needed to carry `count` coils.
#[must_use]
pub const fn coil_byte_count(count: usize) -> usize {
    (count + 7) / 8
}

/// Packs coils eight to a byte, first coil in the least significant bit.
/// Unused high bits of the last byte are zero.
#[must_use]
pub fn pack_coils(coils: &[Coil]) -> Bytes {
    let mut buf = BytesMut::with_capacity(coil_byte_count(coils.len()));
    for chunk in coils.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .fold(0u8, |byte, (bit, &coil)| byte | (u8::from(coil) << bit));
        buf.put_u8(byte);
    }
    buf.freeze()
}

/// Expands packed bytes into exactly `count` coils; padding bits beyond
/// `count` are discarded. Missing bytes read as off.
#[must_use]
pub fn unpack_coils(bytes: &[u8], count: usize) -> Vec<Coil> {
    (0..count)
        .map(|index| {
            bytes
                .get(index / 8)
                .map_or(false, |byte| (byte >> (index % 8)) & 0x01 != 0)
        })
        .collect()
}
