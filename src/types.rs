use crate::error::TagError;

/// Modbus unit identifier, just a type-safe wrapper around `u8`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq)]
pub struct UnitId {
    /// underlying raw value
    pub value: u8,
}

impl UnitId {
    /// Create a new UnitId
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

/// Errors that prevent an [AddressRange] from being constructed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidRange {
    /// the range contains a count of zero
    CountOfZero,
    /// start and count would overflow the representation of u16
    AddressOverflow(u16, u16),
}

impl std::error::Error for InvalidRange {}

impl std::fmt::Display for InvalidRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InvalidRange::CountOfZero => f.write_str("range contains a count of zero"),
            InvalidRange::AddressOverflow(start, count) => write!(
                f,
                "start == {start} and count == {count} would overflow the representation of u16"
            ),
        }
    }
}

/// Start and count tuple used by the raw field-side operations
///
/// Cannot be constructed with an invalid start/count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// Starting address of the range
    pub start: u16,
    /// Count of elements in the range
    pub count: u16,
}

impl AddressRange {
    /// Create a validated address range
    pub fn try_from(start: u16, count: u16) -> Result<Self, InvalidRange> {
        if count == 0 {
            return Err(InvalidRange::CountOfZero);
        }

        let max_start = u16::MAX - (count - 1);
        if start > max_start {
            return Err(InvalidRange::AddressOverflow(start, count));
        }

        Ok(Self { start, count })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = u16> {
        let start = self.start;
        (0..self.count).map(move |i| start + i)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

/// Value and its address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<T> {
    /// Address of the value
    pub index: u16,
    /// Associated value
    pub value: T,
}

impl<T> Indexed<T> {
    /// Create a new indexed value
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

/// Closed set of value kinds a tag address can declare
///
/// The register width of every variant is a pure function of the variant
/// itself; it is used to size every codec buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataType {
    /// single bit; stored natively in bit areas, as one register otherwise
    Bool,
    /// signed 16-bit integer, 1 register
    Int16,
    /// unsigned 16-bit integer, 1 register
    UInt16,
    /// signed 32-bit integer, 2 registers
    Int32,
    /// unsigned 32-bit integer, 2 registers
    UInt32,
    /// signed 64-bit integer, 4 registers
    Int64,
    /// unsigned 64-bit integer, 4 registers
    UInt64,
    /// IEEE-754 single precision, 2 registers
    Float32,
    /// IEEE-754 double precision, 4 registers
    Float64,
    /// UTF-8 string of the given byte length, one register per 2 bytes
    String(usize),
    /// boolean projection of one bit of another type
    ///
    /// The bit index is not range-checked against the underlying type: the
    /// extraction truncates the underlying value to 64 bits, so indices >= 64
    /// alias into 0-63 and indices past a narrow type's width read bits of
    /// the widened value.
    Bit {
        /// the type whose registers the bit is projected out of
        underlying: Box<DataType>,
        /// zero-based bit index within the underlying value
        bit: u32,
    },
}

impl DataType {
    /// Width of the type in 16-bit registers
    ///
    /// Wider than `u16` because a declared string length may describe a span
    /// larger than any area; such spans are rejected, never wrapped.
    pub fn register_count(&self) -> usize {
        match self {
            DataType::Bool => 1,
            DataType::Int16 | DataType::UInt16 => 1,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => 2,
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => 4,
            DataType::String(length) => (length + 1) / 2,
            DataType::Bit { underlying, .. } => underlying.register_count(),
        }
    }

    /// True for the six integer variants
    pub(crate) fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int16
                | DataType::UInt16
                | DataType::Int32
                | DataType::UInt32
                | DataType::Int64
                | DataType::UInt64
        )
    }

    /// Check that a value belongs to this type's external domain
    ///
    /// This check runs before any transaction is entered so that a mismatch
    /// never partially applies a write.
    pub fn check(&self, value: &Value) -> Result<(), TagError> {
        let ok = match self {
            DataType::Bool => matches!(value, Value::Bool(_)),
            DataType::Int16 => matches!(value, Value::Int16(_)),
            DataType::UInt16 => matches!(value, Value::UInt16(_)),
            DataType::Int32 => matches!(value, Value::Int32(_)),
            DataType::UInt32 => matches!(value, Value::UInt32(_)),
            DataType::Int64 => matches!(value, Value::Int64(_)),
            DataType::UInt64 => matches!(value, Value::UInt64(_)),
            DataType::Float32 => matches!(value, Value::Float32(_)),
            DataType::Float64 => matches!(value, Value::Float64(_)),
            DataType::String(_) => matches!(value, Value::String(_)),
            DataType::Bit { .. } => matches!(value, Value::Bool(_)),
        };
        if ok {
            Ok(())
        } else {
            Err(TagError::TypeMismatch)
        }
    }
}

/// External value domain shared by the supervisory side and the codec
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// boolean
    Bool(bool),
    /// signed 16-bit integer
    Int16(i16),
    /// unsigned 16-bit integer
    UInt16(u16),
    /// signed 32-bit integer
    Int32(i32),
    /// unsigned 32-bit integer
    UInt32(u32),
    /// signed 64-bit integer
    Int64(i64),
    /// unsigned 64-bit integer
    UInt64(u64),
    /// IEEE-754 single precision
    Float32(f32),
    /// IEEE-754 double precision
    Float64(f64),
    /// UTF-8 string
    String(String),
}

impl Value {
    /// Numeric view of the value as a 64-bit signed integer
    ///
    /// Unsigned values reinterpret their bits, floats truncate toward zero.
    /// `None` for booleans and strings.
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(*v as i64),
            Value::UInt16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::UInt32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            Value::UInt64(v) => Some(*v as i64),
            Value::Float32(v) => Some(*v as i64),
            Value::Float64(v) => Some(*v as i64),
            Value::Bool(_) | Value::String(_) => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
        }
    }
}
