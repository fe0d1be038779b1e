use std::io::{Error, ErrorKind, Result};

use tokio_util::codec::{Decoder, Encoder};

use crate::{
    bytes::{Buf, BufMut, BytesMut},
    frame::{FunctionCode, RequestPdu, ResponsePdu, EXCEPTION_FLAG, MAX_PDU_DATA_SIZE},
};

/// Client side PDU codec: encodes [`RequestPdu`]s and decodes
/// [`ResponsePdu`]s.
///
/// The codec sits on top of an ADU framing layer (RTU or TCP) and works on
/// the bytes it delivers. Responses whose length cannot be derived from the
/// function code and its count fields (diagnostics, encapsulated interface
/// transport, custom codes) take whatever remains in the buffer, so the
/// framing layer must hand over whole ADUs. A custom code with no data
/// buffered yet is treated as incomplete.
#[derive(Debug, Default)]
pub struct PduCodec;

impl PduCodec {
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for PduCodec {
    type Item = ResponsePdu;
    type Error = Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<ResponsePdu>> {
        let Some(&code) = buf.first() else {
            return Ok(None); // Need more data
        };

        log::debug!("Client received buffer: {:02X?}", &buf[..]);

        if code & !EXCEPTION_FLAG == 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("Invalid function code: 0x{code:02X}"),
            ));
        }

        let data = &buf[1..];
        let size = if code & EXCEPTION_FLAG != 0 {
            Some(1)
        } else {
            let function_code = FunctionCode::new(code);
            match ResponsePdu::minimum_data_size(function_code) {
                Some(minimum) if data.len() < minimum => return Ok(None), // Need more data
                Some(_) => ResponsePdu::calculate_data_size(function_code, data),
                None => None,
            }
        };

        let size = match size {
            Some(size) if size > MAX_PDU_DATA_SIZE => {
                return Err(Error::new(
                    ErrorKind::InvalidData,
                    format!("PDU data size {size} exceeds {MAX_PDU_DATA_SIZE}"),
                ));
            }
            Some(size) if data.len() < size => return Ok(None), // Need more data
            Some(size) => size,
            None if data.is_empty() => return Ok(None), // Need more data
            None => data.len(),
        };

        let mut frame = buf.split_to(1 + size);
        frame.advance(1);
        let response = ResponsePdu::from_raw(code, frame.freeze());
        log::debug!("Decoded response: {:?}", response);
        Ok(Some(response))
    }
}

impl Encoder<RequestPdu> for PduCodec {
    type Error = Error;

    fn encode(&mut self, request: RequestPdu, buf: &mut BytesMut) -> Result<()> {
        if !request.is_valid() {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("Refusing to encode invalid request: {request:?}"),
            ));
        }

        buf.reserve(request.size());
        buf.put_u8(request.function_code().value());
        buf.put_slice(request.data());

        log::debug!("Encoded request: {:02X?}", &buf[..]);
        Ok(())
    }
}
