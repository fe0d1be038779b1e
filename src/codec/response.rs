use byteorder::{BigEndian, ByteOrder};

use crate::frame::*;

use super::unpack_coils;

/// Hook for response function codes the decoder does not handle itself
/// (diagnostics, comm event counters, file records, vendor codes, ...).
pub trait ResponseExtension {
    /// Decodes `response` into `unit`, which starts as a copy of the request
    /// template. Returns `false` to reject the response.
    fn process_private_response(&self, _response: &ResponsePdu, _unit: &mut DataUnit) -> bool {
        false
    }
}

/// The default extension: every private response is rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl ResponseExtension for Unsupported {}

/// Validates `response` and decodes it into a fresh [`DataUnit`] derived
/// from `template`, the unit the request was built from.
///
/// Codes without a native decoder are handed to `extension`.
pub fn decode_response<X>(
    response: &ResponsePdu,
    template: &DataUnit,
    extension: &X,
) -> Result<DataUnit, DecodeError>
where
    X: ResponseExtension + ?Sized,
{
    use FunctionCode::*;

    let function_code = response.function_code();
    match function_code {
        ReadCoils | ReadDiscreteInputs => decode_read_bits(response, function_code, template),
        ReadHoldingRegisters | ReadInputRegisters | ReadWriteMultipleRegisters => {
            decode_read_registers(response, function_code, template)
        }
        WriteSingleCoil => decode_write_single_coil(response, template),
        WriteSingleRegister => decode_write_single_register(response, template),
        WriteMultipleCoils => decode_write_multiple_coils(response, template),
        WriteMultipleRegisters => decode_write_multiple_registers(response, template),
        ReadExceptionStatus
        | Diagnostics
        | GetCommEventCounter
        | GetCommEventLog
        | ReportServerId
        | ReadFileRecord
        | WriteFileRecord
        | MaskWriteRegister
        | ReadFifoQueue
        | EncapsulatedInterfaceTransport
        | Custom(_) => {
            check_shape(response, function_code)?;
            let mut unit = template.clone();
            if extension.process_private_response(response, &mut unit) {
                Ok(unit)
            } else {
                Err(DecodeError::Unsupported(function_code))
            }
        }
    }
}

/// Shared shape check: a structurally valid, non-exception PDU carrying
/// `expected`.
fn check_shape(response: &ResponsePdu, expected: FunctionCode) -> Result<(), DecodeError> {
    if !response.is_valid() {
        return Err(DecodeError::InvalidPdu);
    }
    if let Some(exception) = response.exception_code() {
        return Err(DecodeError::Exception(exception));
    }
    if response.function_code() != expected {
        return Err(DecodeError::FunctionCodeMismatch {
            expected,
            received: response.function_code(),
        });
    }
    Ok(())
}

fn check_minimum_size(response: &ResponsePdu, expected: FunctionCode) -> Result<(), DecodeError> {
    let minimum = ResponsePdu::minimum_data_size(expected).unwrap_or_default();
    if response.data_size() < minimum {
        return Err(DecodeError::TooShort {
            minimum,
            actual: response.data_size(),
        });
    }
    Ok(())
}

fn check_exact_size(response: &ResponsePdu, expected: FunctionCode) -> Result<(), DecodeError> {
    let size = ResponsePdu::minimum_data_size(expected).unwrap_or_default();
    if response.data_size() != size {
        return Err(DecodeError::SizeMismatch {
            expected: size,
            actual: response.data_size(),
        });
    }
    Ok(())
}

/// Splits off the leading byte count and checks it against what follows.
fn counted_payload(data: &[u8]) -> Result<&[u8], DecodeError> {
    let Some((&byte_count, payload)) = data.split_first() else {
        return Err(DecodeError::TooShort {
            minimum: 1,
            actual: 0,
        });
    };
    if usize::from(byte_count) != payload.len() {
        return Err(DecodeError::ByteCountMismatch {
            declared: usize::from(byte_count),
            available: payload.len(),
        });
    }
    Ok(payload)
}

/// Reads the two big-endian words of an echo response (address, value or count).
fn read_echo(data: &[u8]) -> (Word, Word) {
    (
        BigEndian::read_u16(&data[0..2]),
        BigEndian::read_u16(&data[2..4]),
    )
}

fn decode_read_bits(
    response: &ResponsePdu,
    expected: FunctionCode,
    template: &DataUnit,
) -> Result<DataUnit, DecodeError> {
    check_shape(response, expected)?;
    check_minimum_size(response, expected)?;
    let payload = counted_payload(response.data())?;

    // 只取模板要求的位数，其余为填充位
    let count = template.value_count();
    let available = payload.len() * 8;
    if available < count {
        return Err(DecodeError::InsufficientBits {
            expected: count,
            available,
        });
    }

    let values = unpack_coils(payload, count)
        .into_iter()
        .map(Word::from)
        .collect::<Vec<_>>();
    let mut unit = template.clone();
    unit.set_values(values);
    Ok(unit)
}

fn decode_read_registers(
    response: &ResponsePdu,
    expected: FunctionCode,
    template: &DataUnit,
) -> Result<DataUnit, DecodeError> {
    check_shape(response, expected)?;
    check_minimum_size(response, expected)?;
    let payload = counted_payload(response.data())?;
    if payload.len() % 2 != 0 {
        return Err(DecodeError::OddByteCount(payload.len()));
    }

    let words = payload
        .chunks_exact(2)
        .map(BigEndian::read_u16)
        .collect::<Vec<_>>();

    let register_type = match expected {
        FunctionCode::ReadInputRegisters => RegisterType::InputRegisters,
        _ => RegisterType::HoldingRegisters,
    };
    let mut unit = template.clone();
    unit.set_values(words);
    unit.set_register_type(register_type);
    Ok(unit)
}

fn decode_write_single_coil(
    response: &ResponsePdu,
    template: &DataUnit,
) -> Result<DataUnit, DecodeError> {
    check_shape(response, FunctionCode::WriteSingleCoil)?;
    check_exact_size(response, FunctionCode::WriteSingleCoil)?;

    let (address, value) = read_echo(response.data());
    let coil: Word = match value {
        COIL_ON => 1,
        COIL_OFF => 0,
        other => return Err(DecodeError::InvalidCoilValue(other)),
    };

    let mut unit = template.clone();
    unit.set_start_address(address);
    unit.set_values(vec![coil]);
    unit.set_register_type(RegisterType::Coils);
    Ok(unit)
}

fn decode_write_single_register(
    response: &ResponsePdu,
    template: &DataUnit,
) -> Result<DataUnit, DecodeError> {
    check_shape(response, FunctionCode::WriteSingleRegister)?;
    check_exact_size(response, FunctionCode::WriteSingleRegister)?;

    let (address, value) = read_echo(response.data());
    let mut unit = template.clone();
    unit.set_start_address(address);
    unit.set_values(vec![value]);
    unit.set_register_type(RegisterType::HoldingRegisters);
    Ok(unit)
}

fn decode_write_multiple_coils(
    response: &ResponsePdu,
    template: &DataUnit,
) -> Result<DataUnit, DecodeError> {
    check_shape(response, FunctionCode::WriteMultipleCoils)?;
    check_exact_size(response, FunctionCode::WriteMultipleCoils)?;

    // 服务器只回显地址和数量，不回显线圈值
    let (address, count) = read_echo(response.data());
    let mut unit = template.clone();
    unit.set_start_address(address);
    unit.set_value_count(usize::from(count));
    unit.set_register_type(RegisterType::Coils);
    Ok(unit)
}

fn decode_write_multiple_registers(
    response: &ResponsePdu,
    template: &DataUnit,
) -> Result<DataUnit, DecodeError> {
    check_shape(response, FunctionCode::WriteMultipleRegisters)?;
    check_exact_size(response, FunctionCode::WriteMultipleRegisters)?;

    let (address, count) = read_echo(response.data());
    let count = usize::from(count);
    if !(1..=MAX_WRITE_REGISTERS).contains(&count) {
        return Err(DecodeError::QuantityOutOfRange(count));
    }

    let mut unit = template.clone();
    unit.set_start_address(address);
    unit.set_value_count(count);
    unit.set_register_type(RegisterType::HoldingRegisters);
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::build_write_request;

    fn decode(response: &ResponsePdu, template: &DataUnit) -> Result<DataUnit, DecodeError> {
        decode_response(response, template, &Unsupported)
    }

    #[test]
    fn read_coils() {
        let template = DataUnit::new(RegisterType::Coils, 10, 5);
        let response = ResponsePdu::new(FunctionCode::ReadCoils, vec![0x01, 0x15]);

        let unit = decode(&response, &template).unwrap();
        assert_eq!(unit.values(), &[1, 0, 1, 0, 1]);
        assert_eq!(unit.start_address(), 10);
        assert_eq!(unit.register_type(), RegisterType::Coils);
    }

    #[test]
    fn read_discrete_inputs_over_two_bytes() {
        let template = DataUnit::new(RegisterType::DiscreteInputs, 0x00C4, 10);
        let response = ResponsePdu::new(FunctionCode::ReadDiscreteInputs, vec![0x02, 0xAC, 0x03]);

        let unit = decode(&response, &template).unwrap();
        assert_eq!(unit.values(), &[0, 0, 1, 1, 0, 1, 0, 1, 1, 1]);
    }

    #[test]
    fn read_bits_byte_count_mismatch() {
        let template = DataUnit::new(RegisterType::Coils, 0, 8);
        let response = ResponsePdu::new(FunctionCode::ReadCoils, vec![0x02, 0x15]);

        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::ByteCountMismatch {
                declared: 2,
                available: 1
            })
        );
    }

    #[test]
    fn read_bits_too_short() {
        let template = DataUnit::new(RegisterType::Coils, 0, 1);
        let response = ResponsePdu::new(FunctionCode::ReadCoils, vec![0x00]);

        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::TooShort {
                minimum: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn read_bits_cannot_satisfy_template() {
        let template = DataUnit::new(RegisterType::Coils, 0, 9);
        let response = ResponsePdu::new(FunctionCode::ReadCoils, vec![0x01, 0xFF]);

        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::InsufficientBits {
                expected: 9,
                available: 8
            })
        );
    }

    #[test]
    fn read_holding_registers() {
        let template = DataUnit::new(RegisterType::HoldingRegisters, 0x006B, 3);
        let response = ResponsePdu::new(
            FunctionCode::ReadHoldingRegisters,
            vec![0x06, 0x02, 0x2B, 0x00, 0x00, 0x00, 0x64],
        );

        let unit = decode(&response, &template).unwrap();
        assert_eq!(unit.values(), &[0x022B, 0x0000, 0x0064]);
        assert_eq!(unit.value_count(), 3);
        assert_eq!(unit.start_address(), 0x006B);
        assert_eq!(unit.register_type(), RegisterType::HoldingRegisters);
    }

    #[test]
    fn read_input_registers_sets_type() {
        let template = DataUnit::new(RegisterType::InputRegisters, 8, 1);
        let response = ResponsePdu::new(FunctionCode::ReadInputRegisters, vec![0x02, 0x00, 0x0A]);

        let unit = decode(&response, &template).unwrap();
        assert_eq!(unit.values(), &[0x000A]);
        assert_eq!(unit.register_type(), RegisterType::InputRegisters);
    }

    #[test]
    fn read_registers_odd_byte_count() {
        let template = DataUnit::new(RegisterType::HoldingRegisters, 0, 2);
        for payload in [vec![0x03, 0x00, 0x01, 0x02], vec![0x01, 0xFF, 0x00]] {
            let response = ResponsePdu::new(FunctionCode::ReadHoldingRegisters, payload);
            assert!(decode(&response, &template).is_err());
        }

        let response = ResponsePdu::new(
            FunctionCode::ReadHoldingRegisters,
            vec![0x03, 0x00, 0x01, 0x02],
        );
        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::OddByteCount(3))
        );
    }

    #[test]
    fn read_write_multiple_registers() {
        let template = DataUnit::new(RegisterType::Coils, 3, 2);
        let response = ResponsePdu::new(
            FunctionCode::ReadWriteMultipleRegisters,
            vec![0x04, 0x00, 0xFE, 0x0A, 0xCD],
        );

        let unit = decode(&response, &template).unwrap();
        assert_eq!(unit.values(), &[0x00FE, 0x0ACD]);
        assert_eq!(unit.register_type(), RegisterType::HoldingRegisters);
    }

    #[test]
    fn write_single_coil_values() {
        let template = DataUnit::new(RegisterType::Coils, 0, 1);

        let on = ResponsePdu::new(FunctionCode::WriteSingleCoil, vec![0x00, 0xAC, 0xFF, 0x00]);
        let unit = decode(&on, &template).unwrap();
        assert_eq!(unit.values(), &[1]);
        assert_eq!(unit.start_address(), 0x00AC);
        assert_eq!(unit.register_type(), RegisterType::Coils);

        let off = ResponsePdu::new(FunctionCode::WriteSingleCoil, vec![0x00, 0xAC, 0x00, 0x00]);
        assert_eq!(decode(&off, &template).unwrap().values(), &[0]);

        let bad = ResponsePdu::new(FunctionCode::WriteSingleCoil, vec![0x00, 0xAC, 0x12, 0x34]);
        assert_eq!(
            decode(&bad, &template),
            Err(DecodeError::InvalidCoilValue(0x1234))
        );
    }

    #[test]
    fn write_single_coil_exact_size() {
        let template = DataUnit::new(RegisterType::Coils, 0, 1);
        let response = ResponsePdu::new(
            FunctionCode::WriteSingleCoil,
            vec![0x00, 0xAC, 0xFF, 0x00, 0x00],
        );
        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::SizeMismatch {
                expected: 4,
                actual: 5
            })
        );
    }

    #[test]
    fn write_single_register() {
        let template = DataUnit::default();
        let response =
            ResponsePdu::new(FunctionCode::WriteSingleRegister, vec![0x00, 0x01, 0x00, 0x03]);

        let unit = decode(&response, &template).unwrap();
        assert_eq!(unit.start_address(), 1);
        assert_eq!(unit.values(), &[3]);
        assert_eq!(unit.register_type(), RegisterType::HoldingRegisters);
    }

    #[test]
    fn write_multiple_coils_keeps_values() {
        let template = DataUnit::with_values(RegisterType::Coils, 0x13, [1, 0, 1]);
        let response =
            ResponsePdu::new(FunctionCode::WriteMultipleCoils, vec![0x00, 0x13, 0x00, 0x03]);

        let unit = decode(&response, &template).unwrap();
        assert_eq!(unit.start_address(), 0x13);
        assert_eq!(unit.value_count(), 3);
        assert_eq!(unit.values(), &[1, 0, 1]);
    }

    #[test]
    fn write_multiple_registers_range() {
        let template = DataUnit::default();
        for (count, ok) in [(0u16, false), (1, true), (123, true), (124, false)] {
            let [hi, lo] = count.to_be_bytes();
            let response = ResponsePdu::new(
                FunctionCode::WriteMultipleRegisters,
                vec![0x00, 0x01, hi, lo],
            );
            assert_eq!(decode(&response, &template).is_ok(), ok, "count {count}");
        }
    }

    #[test]
    fn read_input_registers_odd_byte_count() {
        let template = DataUnit::new(RegisterType::InputRegisters, 0, 2);
        let response =
            ResponsePdu::new(FunctionCode::ReadInputRegisters, vec![0x03, 0x00, 0x01, 0x02]);
        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::OddByteCount(3))
        );
    }

    #[test]
    fn read_write_registers_odd_byte_count() {
        let template = DataUnit::new(RegisterType::HoldingRegisters, 0, 2);
        let response = ResponsePdu::new(
            FunctionCode::ReadWriteMultipleRegisters,
            vec![0x03, 0x00, 0x01, 0x02],
        );
        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::OddByteCount(3))
        );
    }

    #[test]
    fn read_write_registers_byte_count_mismatch() {
        let template = DataUnit::new(RegisterType::HoldingRegisters, 0, 2);
        let response = ResponsePdu::new(
            FunctionCode::ReadWriteMultipleRegisters,
            vec![0x04, 0x00, 0x01, 0x02],
        );
        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::ByteCountMismatch {
                declared: 4,
                available: 3
            })
        );
    }

    #[test]
    fn write_echoes_need_exact_size() {
        let template = DataUnit::default();
        let cases = [
            (FunctionCode::WriteSingleRegister, vec![0x00, 0x01, 0x00], 3),
            (
                FunctionCode::WriteMultipleCoils,
                vec![0x00, 0x01, 0x00, 0x03, 0x00],
                5,
            ),
            (FunctionCode::WriteMultipleRegisters, vec![0x00, 0x01, 0x00], 3),
            (
                FunctionCode::WriteMultipleRegisters,
                vec![0x00, 0x01, 0x00, 0x02, 0x04],
                5,
            ),
        ];
        for (function_code, data, actual) in cases {
            let response = ResponsePdu::new(function_code, data);
            assert_eq!(
                decode(&response, &template),
                Err(DecodeError::SizeMismatch {
                    expected: 4,
                    actual
                }),
                "{function_code}"
            );
        }
    }

    #[test]
    fn write_then_decode_echo() {
        for count in [2usize, 17, 123] {
            let values = (0..count).map(|i| i as Word * 3).collect::<Vec<_>>();
            let unit = DataUnit::with_values(RegisterType::HoldingRegisters, 40, values);
            let request = build_write_request(&unit);
            assert!(request.is_valid());

            // 服务器回显请求的前 4 个字节
            let echo = ResponsePdu::new(request.function_code(), request.data().slice(0..4));
            let decoded = decode(&echo, &unit).unwrap();
            assert_eq!(decoded.value_count(), count);
            assert_eq!(decoded.start_address(), 40);
            assert_eq!(decoded.register_type(), RegisterType::HoldingRegisters);
        }
    }

    #[test]
    fn exception_responses_are_rejected() {
        let template = DataUnit::new(RegisterType::HoldingRegisters, 0, 1);
        let response = ResponsePdu::exception(
            FunctionCode::ReadHoldingRegisters,
            ExceptionCode::IllegalDataAddress,
        );
        assert_eq!(
            decode(&response, &template),
            Err(DecodeError::Exception(ExceptionCode::IllegalDataAddress))
        );
    }

    #[test]
    fn invalid_pdu_is_rejected() {
        let template = DataUnit::new(RegisterType::HoldingRegisters, 0, 1);
        let response = ResponsePdu::new(FunctionCode::ReadHoldingRegisters, vec![0u8; 253]);
        assert_eq!(decode(&response, &template), Err(DecodeError::InvalidPdu));
    }

    #[test]
    fn handler_checks_function_code() {
        let template = DataUnit::new(RegisterType::Coils, 0, 1);
        let response = ResponsePdu::new(FunctionCode::ReadDiscreteInputs, vec![0x01, 0x01]);
        assert_eq!(
            decode_read_bits(&response, FunctionCode::ReadCoils, &template),
            Err(DecodeError::FunctionCodeMismatch {
                expected: FunctionCode::ReadCoils,
                received: FunctionCode::ReadDiscreteInputs,
            })
        );
    }

    #[test]
    fn unsupported_codes_are_rejected_by_default() {
        let template = DataUnit::default();
        for code in [FunctionCode::Diagnostics, FunctionCode::Custom(0x41)] {
            let response = ResponsePdu::new(code, vec![0x00, 0x00, 0x12, 0x34]);
            assert_eq!(
                decode(&response, &template),
                Err(DecodeError::Unsupported(code))
            );
        }
    }

    struct ExceptionStatus;

    impl ResponseExtension for ExceptionStatus {
        fn process_private_response(&self, response: &ResponsePdu, unit: &mut DataUnit) -> bool {
            if response.function_code() != FunctionCode::ReadExceptionStatus {
                return false;
            }
            let Some(&status) = response.data().first() else {
                return false;
            };
            unit.set_values(vec![Word::from(status)]);
            true
        }
    }

    #[test]
    fn extension_decodes_private_responses() {
        let template = DataUnit::new(RegisterType::Coils, 0, 8);
        let response = ResponsePdu::new(FunctionCode::ReadExceptionStatus, vec![0x6D]);

        let unit = decode_response(&response, &template, &ExceptionStatus).unwrap();
        assert_eq!(unit.values(), &[0x6D]);

        let other = ResponsePdu::new(FunctionCode::Custom(0x42), vec![0x01]);
        assert_eq!(
            decode_response(&other, &template, &ExceptionStatus),
            Err(DecodeError::Unsupported(FunctionCode::Custom(0x42)))
        );
    }
}
