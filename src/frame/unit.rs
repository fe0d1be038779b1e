use super::{Address, Word};

/// The four addressable tables of a Modbus server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegisterType {
    #[default]
    Invalid,
    Coils,
    DiscreteInputs,
    HoldingRegisters,
    InputRegisters,
}

impl RegisterType {
    /// Single-bit tables (coils and discrete inputs).
    #[must_use]
    pub const fn is_bit(self) -> bool {
        matches!(self, Self::Coils | Self::DiscreteInputs)
    }

    /// Tables a client may write to.
    #[must_use]
    pub const fn is_writable(self) -> bool {
        matches!(self, Self::Coils | Self::HoldingRegisters)
    }
}

/// A contiguous block of coils, discrete inputs or registers on a remote
/// server, together with their values.
///
/// Bit tables store one value per coil, `0` for off and `1` for on.
/// `values().len()` always equals `value_count()`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataUnit {
    register_type: RegisterType,
    start_address: Address,
    values: Vec<Word>,
}

impl DataUnit {
    /// A block of `count` zeroed values, typically a read request template.
    #[must_use]
    pub fn new(register_type: RegisterType, start_address: Address, count: usize) -> Self {
        Self {
            register_type,
            start_address,
            values: vec![0; count],
        }
    }

    /// A block holding `values`, typically the payload of a write request.
    #[must_use]
    pub fn with_values(
        register_type: RegisterType,
        start_address: Address,
        values: impl Into<Vec<Word>>,
    ) -> Self {
        Self {
            register_type,
            start_address,
            values: values.into(),
        }
    }

    /// A bit block built from booleans.
    #[must_use]
    pub fn with_coils(register_type: RegisterType, start_address: Address, coils: &[bool]) -> Self {
        let values = coils.iter().map(|&coil| Word::from(coil)).collect::<Vec<_>>();
        Self::with_values(register_type, start_address, values)
    }

    #[must_use]
    pub fn register_type(&self) -> RegisterType {
        self.register_type
    }

    pub fn set_register_type(&mut self, register_type: RegisterType) {
        self.register_type = register_type;
    }

    #[must_use]
    pub fn start_address(&self) -> Address {
        self.start_address
    }

    pub fn set_start_address(&mut self, start_address: Address) {
        self.start_address = start_address;
    }

    #[must_use]
    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Resizes the block; existing values are kept, new ones are zero.
    pub fn set_value_count(&mut self, count: usize) {
        self.values.resize(count, 0);
    }

    #[must_use]
    pub fn values(&self) -> &[Word] {
        &self.values
    }

    pub fn set_values(&mut self, values: impl Into<Vec<Word>>) {
        self.values = values.into();
    }

    /// Value at `index`, or `0` when out of range.
    #[must_use]
    pub fn value(&self, index: usize) -> Word {
        self.values.get(index).copied().unwrap_or_default()
    }

    /// Bit values as booleans (any non-zero word is `true`).
    #[must_use]
    pub fn coils(&self) -> Vec<bool> {
        self.values.iter().map(|&value| value != 0).collect()
    }

    /// A unit is valid when it names a table and covers at least one value
    /// without running past the end of the 16-bit address space.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if self.register_type == RegisterType::Invalid || self.values.is_empty() {
            return false;
        }
        usize::from(self.start_address) + self.values.len() <= usize::from(Address::MAX) + 1
    }
}
