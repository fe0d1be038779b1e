use byteorder::{BigEndian, ByteOrder};

use crate::bytes::Bytes;

use super::{
    ExceptionCode, ExceptionResponse, FunctionCode, EXCEPTION_FLAG, MAX_PDU_DATA_SIZE,
};

/// Represents a message from the client (master) to the server (slave).
///
/// The default value carries function code `0` and is never valid; builders
/// return it when a request cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestPdu {
    code: u8,
    data: Bytes,
}

impl RequestPdu {
    #[must_use]
    pub fn new(function_code: FunctionCode, data: impl Into<Bytes>) -> Self {
        Self {
            code: function_code.value(),
            data: data.into(),
        }
    }

    #[must_use]
    pub fn function_code(&self) -> FunctionCode {
        FunctionCode::new(self.code)
    }

    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// Size on the wire: function code byte plus data.
    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.data.len()
    }

    /// A request is valid when its function code is a non-exception code,
    /// its data fits in a PDU and, for public function codes, its data
    /// length matches what that code requires.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.code == 0 || self.code & EXCEPTION_FLAG != 0 {
            return false;
        }
        if self.data.len() > MAX_PDU_DATA_SIZE {
            return false;
        }

        let function_code = self.function_code();
        if let Some(minimum) = Self::minimum_data_size(function_code) {
            if self.data.len() < minimum {
                return false;
            }
        }
        match Self::calculate_data_size(function_code, &self.data) {
            Some(expected) => self.data.len() == expected,
            None => true,
        }
    }

    /// Smallest data section a request with `function_code` can have, or
    /// `None` for codes this crate does not know the layout of.
    #[must_use]
    pub const fn minimum_data_size(function_code: FunctionCode) -> Option<usize> {
        use FunctionCode::*;

        match function_code {
            ReadCoils | ReadDiscreteInputs | ReadHoldingRegisters | ReadInputRegisters
            | WriteSingleCoil | WriteSingleRegister => Some(4),
            ReadExceptionStatus | GetCommEventCounter | GetCommEventLog | ReportServerId => {
                Some(0)
            }
            Diagnostics => Some(4),
            WriteMultipleCoils => Some(6),
            WriteMultipleRegisters => Some(7),
            ReadFileRecord => Some(8),
            WriteFileRecord => Some(10),
            MaskWriteRegister => Some(6),
            ReadWriteMultipleRegisters => Some(11),
            ReadFifoQueue => Some(2),
            EncapsulatedInterfaceTransport => Some(2),
            Custom(_) => None,
        }
    }

    /// Exact data size of a request with `function_code` whose data starts
    /// with `data`, or `None` when it cannot be derived (unknown code, open
    /// ended layout, or not enough bytes to read the count field yet).
    #[must_use]
    pub fn calculate_data_size(function_code: FunctionCode, data: &[u8]) -> Option<usize> {
        use FunctionCode::*;

        match function_code {
            WriteMultipleCoils | WriteMultipleRegisters => {
                data.get(4).map(|&count| 5 + usize::from(count))
            }
            ReadFileRecord | WriteFileRecord => data.first().map(|&count| 1 + usize::from(count)),
            ReadWriteMultipleRegisters => data.get(8).map(|&count| 9 + usize::from(count)),
            Diagnostics | EncapsulatedInterfaceTransport | Custom(_) => None,
            fixed => Self::minimum_data_size(fixed),
        }
    }
}

/// Represents a message from the server (slave) to the client (master).
///
/// Exception responses carry the request's function code with bit `0x80`
/// set and a single exception code byte as data.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResponsePdu {
    code: u8,
    data: Bytes,
}

impl ResponsePdu {
    #[must_use]
    pub fn new(function_code: FunctionCode, data: impl Into<Bytes>) -> Self {
        Self {
            code: function_code.value(),
            data: data.into(),
        }
    }

    /// An exception response to a request with `function_code`.
    #[must_use]
    pub fn exception(function_code: FunctionCode, exception: ExceptionCode) -> Self {
        Self {
            code: function_code.value() | EXCEPTION_FLAG,
            data: Bytes::copy_from_slice(&[u8::from(exception)]),
        }
    }

    /// Builds a response from the raw function code byte as it appeared on
    /// the wire, exception flag included.
    #[must_use]
    pub fn from_raw(code: u8, data: impl Into<Bytes>) -> Self {
        Self {
            code,
            data: data.into(),
        }
    }

    /// Raw function code byte, exception flag included.
    #[must_use]
    pub fn raw_code(&self) -> u8 {
        self.code
    }

    /// Function code with the exception flag stripped.
    #[must_use]
    pub fn function_code(&self) -> FunctionCode {
        FunctionCode::new(self.code & !EXCEPTION_FLAG)
    }

    #[must_use]
    pub fn is_exception(&self) -> bool {
        self.code & EXCEPTION_FLAG != 0
    }

    #[must_use]
    pub fn exception_code(&self) -> Option<ExceptionCode> {
        if !self.is_exception() {
            return None;
        }
        self.data.first().map(|&code| ExceptionCode::new(code))
    }

    #[must_use]
    pub fn exception_response(&self) -> Option<ExceptionResponse> {
        self.exception_code().map(|exception| ExceptionResponse {
            function: self.function_code(),
            exception,
        })
    }

    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    #[must_use]
    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        1 + self.data.len()
    }

    /// Structural validity only: a non-zero function code, data that fits in
    /// a PDU, and exactly one exception code byte for exception responses.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.code & !EXCEPTION_FLAG == 0 || self.data.len() > MAX_PDU_DATA_SIZE {
            return false;
        }
        !self.is_exception() || self.data.len() == 1
    }

    /// Smallest data section a normal response with `function_code` can
    /// have, or `None` for codes this crate does not know the layout of.
    #[must_use]
    pub const fn minimum_data_size(function_code: FunctionCode) -> Option<usize> {
        use FunctionCode::*;

        match function_code {
            ReadCoils | ReadDiscreteInputs => Some(2),
            ReadHoldingRegisters | ReadInputRegisters => Some(3),
            WriteSingleCoil | WriteSingleRegister => Some(4),
            ReadExceptionStatus => Some(1),
            Diagnostics => Some(4),
            GetCommEventCounter => Some(4),
            GetCommEventLog => Some(8),
            WriteMultipleCoils | WriteMultipleRegisters => Some(4),
            ReportServerId => Some(3),
            ReadFileRecord => Some(5),
            WriteFileRecord => Some(10),
            MaskWriteRegister => Some(6),
            ReadWriteMultipleRegisters => Some(3),
            ReadFifoQueue => Some(6),
            EncapsulatedInterfaceTransport => Some(2),
            Custom(_) => None,
        }
    }

    /// Exact data size of a normal response with `function_code` whose data
    /// starts with `data`; `None` when it cannot be derived.
    #[must_use]
    pub fn calculate_data_size(function_code: FunctionCode, data: &[u8]) -> Option<usize> {
        use FunctionCode::*;

        match function_code {
            ReadCoils | ReadDiscreteInputs | ReadHoldingRegisters | ReadInputRegisters
            | GetCommEventLog | ReportServerId | ReadFileRecord | WriteFileRecord
            | ReadWriteMultipleRegisters => data.first().map(|&count| 1 + usize::from(count)),
            ReadFifoQueue => {
                if data.len() < 2 {
                    return None;
                }
                Some(2 + usize::from(BigEndian::read_u16(&data[..2])))
            }
            Diagnostics | EncapsulatedInterfaceTransport | Custom(_) => None,
            fixed => Self::minimum_data_size(fixed),
        }
    }
}
