use crate::types::DataType;

/// Errors produced by the supervisory-side translation path
#[derive(Clone, Debug, PartialEq)]
pub enum TagError {
    /// The address text, or the register span it resolves to, is invalid
    InvalidAddress(AddressError),
    /// The supplied value does not match the address's declared data type
    TypeMismatch,
    /// The operation is recognized but deliberately unsupported
    NotSupported(NotSupported),
    /// An internal invariant was violated
    Internal(InternalError),
}

/// Ways in which an address can fail to parse or resolve
#[derive(Clone, Debug, PartialEq)]
pub enum AddressError {
    /// the text does not match the address grammar
    Syntax(String),
    /// the unit id is not an integer in `[0, 255]`
    UnitId(String),
    /// the offset is not an integer in `[0, 65535]`
    Offset(String),
    /// the bit selector is not a valid integer
    BitIndex(String),
    /// array addressing parses but is not implemented
    ArrayAddressing,
    /// the offset plus the register span runs past the end of the area
    SpanOverflow {
        /// starting offset of the span
        offset: u16,
        /// number of registers required by the data type
        registers: usize,
    },
}

/// Recognized but unsupported operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotSupported {
    /// partial-array access qualified by an index range
    IndexRange,
}

/// Invariant violations within the library
#[derive(Clone, Debug, PartialEq)]
pub enum InternalError {
    /// bit projection over a type that does not decode to a numeric value
    BitUnderlyingNotNumeric(DataType),
    /// bit write over a type outside the integer family
    BitUnderlyingNotInteger(DataType),
    /// a bit projection was encoded directly instead of via read-modify-write
    DirectBitEncode,
    /// a codec buffer did not match the data type's register width
    BadSpanLength {
        /// byte count implied by the data type
        expected: usize,
        /// byte count actually supplied
        actual: usize,
    },
}

impl std::error::Error for TagError {}
impl std::error::Error for AddressError {}

impl std::fmt::Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            TagError::InvalidAddress(err) => write!(f, "invalid address: {err}"),
            TagError::TypeMismatch => f.write_str("value does not match the declared data type"),
            TagError::NotSupported(NotSupported::IndexRange) => {
                f.write_str("index range access is not supported")
            }
            TagError::Internal(err) => write!(f, "internal error: {err}"),
        }
    }
}

impl std::fmt::Display for AddressError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AddressError::Syntax(text) => write!(f, "unparseable address: {text}"),
            AddressError::UnitId(text) => write!(f, "invalid unit id: {text}"),
            AddressError::Offset(text) => write!(f, "invalid offset: {text}"),
            AddressError::BitIndex(text) => write!(f, "invalid bit index: {text}"),
            AddressError::ArrayAddressing => f.write_str("array addressing not implemented"),
            AddressError::SpanOverflow { offset, registers } => write!(
                f,
                "offset {offset} with a span of {registers} registers exceeds the area"
            ),
        }
    }
}

impl std::fmt::Display for InternalError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            InternalError::BitUnderlyingNotNumeric(dt) => {
                write!(f, "bit projection over non-numeric type: {dt:?}")
            }
            InternalError::BitUnderlyingNotInteger(dt) => {
                write!(f, "bit write over non-integer type: {dt:?}")
            }
            InternalError::DirectBitEncode => {
                f.write_str("bit projections cannot be encoded directly")
            }
            InternalError::BadSpanLength { expected, actual } => {
                write!(f, "expected a span of {expected} bytes, got {actual}")
            }
        }
    }
}

impl From<AddressError> for TagError {
    fn from(err: AddressError) -> Self {
        TagError::InvalidAddress(err)
    }
}

impl From<InternalError> for TagError {
    fn from(err: InternalError) -> Self {
        TagError::Internal(err)
    }
}

/// Exception codes surfaced to the field-side wire handlers
///
/// This is the subset of the Modbus exception vocabulary that the raw
/// operations actually produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionCode {
    /// The data address received in the query is not an allowable address for the server
    IllegalDataAddress,
    /// A value contained in the request is not an allowable value for the server
    IllegalDataValue,
    /// No device with the requested unit id exists behind this gateway
    GatewayTargetDeviceFailedToRespond,
}

impl ExceptionCode {
    /// The raw exception code transmitted in an exception response PDU
    pub fn to_u8(self) -> u8 {
        match self {
            ExceptionCode::IllegalDataAddress => crate::constants::exceptions::ILLEGAL_DATA_ADDRESS,
            ExceptionCode::IllegalDataValue => crate::constants::exceptions::ILLEGAL_DATA_VALUE,
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                crate::constants::exceptions::GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND
            }
        }
    }
}

impl From<crate::types::InvalidRange> for ExceptionCode {
    fn from(err: crate::types::InvalidRange) -> Self {
        match err {
            crate::types::InvalidRange::CountOfZero => ExceptionCode::IllegalDataValue,
            crate::types::InvalidRange::AddressOverflow(_, _) => ExceptionCode::IllegalDataAddress,
        }
    }
}

impl std::error::Error for ExceptionCode {}

impl std::fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ExceptionCode::IllegalDataAddress => f.write_str(
                "data address received in the query is not an allowable address for the server",
            ),
            ExceptionCode::IllegalDataValue => {
                f.write_str("value contained in the request is not an allowable value for server")
            }
            ExceptionCode::GatewayTargetDeviceFailedToRespond => {
                f.write_str("no response was obtained from the target device")
            }
        }
    }
}
