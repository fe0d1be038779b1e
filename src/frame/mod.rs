use std::fmt::{self, Display};

mod error;
pub use self::error::DecodeError;

mod pdu;
pub use self::pdu::{RequestPdu, ResponsePdu};

mod unit;
pub use self::unit::{DataUnit, RegisterType};

pub type Address = u16;

pub type Quantity = u16;

pub type Word = u16;

pub type Coil = bool;

/// Identifier of a device on a shared Modbus network.
pub type ServerAddress = u8;

/// Largest data section a PDU may carry (256 byte RTU ADU minus address, code and CRC).
pub const MAX_PDU_DATA_SIZE: usize = 252;

/// Function code bit that marks an exception response.
pub(crate) const EXCEPTION_FLAG: u8 = 0x80;

/// Wire value of a coil switched on in a write single coil request.
pub const COIL_ON: Word = 0xFF00;

/// Wire value of a coil switched off in a write single coil request.
pub const COIL_OFF: Word = 0x0000;

// 每个请求的点数上限（Modbus Application Protocol v1.1b3）
pub(crate) const MAX_READ_BITS: usize = 2000;
pub(crate) const MAX_READ_REGISTERS: usize = 125;
pub(crate) const MAX_WRITE_BITS: usize = 1968;
pub(crate) const MAX_WRITE_REGISTERS: usize = 123;
pub(crate) const MAX_READ_WRITE_REGISTERS: usize = 121;

/// A Modbus function code.
///
/// Every public function code of the Modbus Application Protocol has its own
/// variant; anything else (user defined or vendor specific) is carried as
/// [`FunctionCode::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// 0x01
    ReadCoils,
    /// 0x02
    ReadDiscreteInputs,
    /// 0x03
    ReadHoldingRegisters,
    /// 0x04
    ReadInputRegisters,
    /// 0x05
    WriteSingleCoil,
    /// 0x06
    WriteSingleRegister,
    /// 0x07
    ReadExceptionStatus,
    /// 0x08
    Diagnostics,
    /// 0x0B
    GetCommEventCounter,
    /// 0x0C
    GetCommEventLog,
    /// 0x0F
    WriteMultipleCoils,
    /// 0x10
    WriteMultipleRegisters,
    /// 0x11
    ReportServerId,
    /// 0x14
    ReadFileRecord,
    /// 0x15
    WriteFileRecord,
    /// 0x16
    MaskWriteRegister,
    /// 0x17
    ReadWriteMultipleRegisters,
    /// 0x18
    ReadFifoQueue,
    /// 0x2B
    EncapsulatedInterfaceTransport,
    /// None of the above.
    ///
    /// Encoding a predefined code as this is possible but ambiguous; prefer
    /// [`Self::new()`].
    Custom(u8),
}

impl FunctionCode {
    /// Create a new [`FunctionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        use FunctionCode::*;

        match value {
            0x01 => ReadCoils,
            0x02 => ReadDiscreteInputs,
            0x03 => ReadHoldingRegisters,
            0x04 => ReadInputRegisters,
            0x05 => WriteSingleCoil,
            0x06 => WriteSingleRegister,
            0x07 => ReadExceptionStatus,
            0x08 => Diagnostics,
            0x0B => GetCommEventCounter,
            0x0C => GetCommEventLog,
            0x0F => WriteMultipleCoils,
            0x10 => WriteMultipleRegisters,
            0x11 => ReportServerId,
            0x14 => ReadFileRecord,
            0x15 => WriteFileRecord,
            0x16 => MaskWriteRegister,
            0x17 => ReadWriteMultipleRegisters,
            0x18 => ReadFifoQueue,
            0x2B => EncapsulatedInterfaceTransport,
            code => Custom(code),
        }
    }

    /// Get the [`u8`] value of the current [`FunctionCode`].
    #[must_use]
    pub const fn value(self) -> u8 {
        use FunctionCode::*;

        match self {
            ReadCoils => 0x01,
            ReadDiscreteInputs => 0x02,
            ReadHoldingRegisters => 0x03,
            ReadInputRegisters => 0x04,
            WriteSingleCoil => 0x05,
            WriteSingleRegister => 0x06,
            ReadExceptionStatus => 0x07,
            Diagnostics => 0x08,
            GetCommEventCounter => 0x0B,
            GetCommEventLog => 0x0C,
            WriteMultipleCoils => 0x0F,
            WriteMultipleRegisters => 0x10,
            ReportServerId => 0x11,
            ReadFileRecord => 0x14,
            WriteFileRecord => 0x15,
            MaskWriteRegister => 0x16,
            ReadWriteMultipleRegisters => 0x17,
            ReadFifoQueue => 0x18,
            EncapsulatedInterfaceTransport => 0x2B,
            Custom(code) => code,
        }
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.value())
    }
}

/// A server (slave) exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    /// 0x01
    IllegalFunction,
    /// 0x02
    IllegalDataAddress,
    /// 0x03
    IllegalDataValue,
    /// 0x04
    ServerDeviceFailure,
    /// 0x05
    Acknowledge,
    /// 0x06
    ServerDeviceBusy,
    /// 0x08
    MemoryParityError,
    /// 0x0A
    GatewayPathUnavailable,
    /// 0x0B
    GatewayTargetDevice,
    /// None of the above.
    ///
    /// Although encoding one of the predefined values as this is possible, it is not recommended.
    /// Instead, prefer to use [`Self::new()`] to prevent such ambiguities.
    Custom(u8),
}

impl From<ExceptionCode> for u8 {
    fn from(from: ExceptionCode) -> Self {
        use crate::frame::ExceptionCode::*;
        match from {
            IllegalFunction => 0x01,
            IllegalDataAddress => 0x02,
            IllegalDataValue => 0x03,
            ServerDeviceFailure => 0x04,
            Acknowledge => 0x05,
            ServerDeviceBusy => 0x06,
            MemoryParityError => 0x08,
            GatewayPathUnavailable => 0x0A,
            GatewayTargetDevice => 0x0B,
            Custom(code) => code,
        }
    }
}

impl ExceptionCode {
    /// Create a new [`ExceptionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        use crate::frame::ExceptionCode::*;

        match value {
            0x01 => IllegalFunction,
            0x02 => IllegalDataAddress,
            0x03 => IllegalDataValue,
            0x04 => ServerDeviceFailure,
            0x05 => Acknowledge,
            0x06 => ServerDeviceBusy,
            0x08 => MemoryParityError,
            0x0A => GatewayPathUnavailable,
            0x0B => GatewayTargetDevice,
            other => Custom(other),
        }
    }

    pub(crate) fn description(&self) -> &str {
        use crate::frame::ExceptionCode::*;

        match *self {
            IllegalFunction => "Illegal function",
            IllegalDataAddress => "Illegal data address",
            IllegalDataValue => "Illegal data value",
            ServerDeviceFailure => "Server device failure",
            Acknowledge => "Acknowledge",
            ServerDeviceBusy => "Server device busy",
            MemoryParityError => "Memory parity error",
            GatewayPathUnavailable => "Gateway path unavailable",
            GatewayTargetDevice => "Gateway target device failed to respond",
            Custom(_) => "Custom",
        }
    }
}

/// A server (slave) exception response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub function: FunctionCode,
    pub exception: ExceptionCode,
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for ExceptionCode {}

impl fmt::Display for ExceptionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Modbus function {}: {}", self.function, self.exception)
    }
}

impl std::error::Error for ExceptionResponse {}
