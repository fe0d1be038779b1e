use crate::{
    bytes::{BufMut, BytesMut},
    frame::*,
};

use super::{coil_byte_count, pack_coils};

/// Builds the read request for `unit`.
///
/// Returns an invalid [`RequestPdu`] if the unit is invalid or asks for more
/// values than one read may return.
#[must_use]
pub fn build_read_request(unit: &DataUnit) -> RequestPdu {
    if !unit.is_valid() {
        return RequestPdu::default();
    }

    let function_code = match unit.register_type() {
        RegisterType::Coils => FunctionCode::ReadCoils,
        RegisterType::DiscreteInputs => FunctionCode::ReadDiscreteInputs,
        RegisterType::HoldingRegisters => FunctionCode::ReadHoldingRegisters,
        RegisterType::InputRegisters => FunctionCode::ReadInputRegisters,
        RegisterType::Invalid => return RequestPdu::default(),
    };
    let limit = if unit.register_type().is_bit() {
        MAX_READ_BITS
    } else {
        MAX_READ_REGISTERS
    };
    if unit.value_count() > limit {
        return RequestPdu::default();
    }

    let mut data = BytesMut::with_capacity(4);
    data.put_u16(unit.start_address());
    data.put_u16(unit.value_count() as Quantity);
    RequestPdu::new(function_code, data.freeze())
}

/// Builds the write request for `unit`.
///
/// A single value uses the single coil/register function, anything longer
/// the multiple variant. Discrete inputs and input registers are read-only,
/// so asking to write them yields an invalid [`RequestPdu`], as does an
/// invalid unit or an oversized one.
#[must_use]
pub fn build_write_request(unit: &DataUnit) -> RequestPdu {
    if !unit.is_valid() || !unit.register_type().is_writable() {
        return RequestPdu::default();
    }

    match unit.register_type() {
        RegisterType::Coils => {
            if unit.value_count() == 1 {
                let coil = if unit.value(0) == 0 { COIL_OFF } else { COIL_ON };
                let mut data = BytesMut::with_capacity(4);
                data.put_u16(unit.start_address());
                data.put_u16(coil);
                return RequestPdu::new(FunctionCode::WriteSingleCoil, data.freeze());
            }
            if unit.value_count() > MAX_WRITE_BITS {
                return RequestPdu::default();
            }

            let packed = pack_coils(&unit.coils());
            let mut data = BytesMut::with_capacity(5 + packed.len());
            data.put_u16(unit.start_address());
            data.put_u16(unit.value_count() as Quantity);
            data.put_u8(coil_byte_count(unit.value_count()) as u8);
            data.put_slice(&packed);
            RequestPdu::new(FunctionCode::WriteMultipleCoils, data.freeze())
        }
        RegisterType::HoldingRegisters => {
            if unit.value_count() == 1 {
                let mut data = BytesMut::with_capacity(4);
                data.put_u16(unit.start_address());
                data.put_u16(unit.value(0));
                return RequestPdu::new(FunctionCode::WriteSingleRegister, data.freeze());
            }
            if unit.value_count() > MAX_WRITE_REGISTERS {
                return RequestPdu::default();
            }

            let mut data = BytesMut::with_capacity(5 + unit.value_count() * 2);
            data.put_u16(unit.start_address());
            data.put_u16(unit.value_count() as Quantity);
            data.put_u8((unit.value_count() * 2) as u8);
            for &word in unit.values() {
                data.put_u16(word);
            }
            RequestPdu::new(FunctionCode::WriteMultipleRegisters, data.freeze())
        }
        _ => RequestPdu::default(),
    }
}

/// Builds a read/write multiple registers request (function code 0x17).
///
/// The function operates on holding registers only, so at least one side
/// must be [`RegisterType::HoldingRegisters`]. Only the address and count
/// of `read` are sent; `write` contributes its values.
#[must_use]
pub fn build_read_write_request(read: &DataUnit, write: &DataUnit) -> RequestPdu {
    if read.register_type() != RegisterType::HoldingRegisters
        && write.register_type() != RegisterType::HoldingRegisters
    {
        return RequestPdu::default();
    }
    if !(1..=MAX_READ_REGISTERS).contains(&read.value_count())
        || !(1..=MAX_READ_WRITE_REGISTERS).contains(&write.value_count())
    {
        return RequestPdu::default();
    }

    let mut data = BytesMut::with_capacity(9 + write.value_count() * 2);
    data.put_u16(read.start_address());
    data.put_u16(read.value_count() as Quantity);
    data.put_u16(write.start_address());
    data.put_u16(write.value_count() as Quantity);
    data.put_u8((write.value_count() * 2) as u8);
    for &word in write.values() {
        data.put_u16(word);
    }
    RequestPdu::new(FunctionCode::ReadWriteMultipleRegisters, data.freeze())
}
