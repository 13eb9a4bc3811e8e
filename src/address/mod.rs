use crate::types::{DataType, UnitId};

mod parser;

pub use parser::parse;

/// One of the four field-side data areas
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Area {
    /// read/write single-bit outputs
    Coils,
    /// single-bit inputs
    DiscreteInputs,
    /// read/write 16-bit registers
    HoldingRegisters,
    /// 16-bit input registers
    InputRegisters,
}

impl Area {
    /// true for the areas that store bits natively
    pub fn is_bit_area(self) -> bool {
        matches!(self, Area::Coils | Area::DiscreteInputs)
    }
}

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Area::Coils => f.write_str("C"),
            Area::DiscreteInputs => f.write_str("DI"),
            Area::HoldingRegisters => f.write_str("HR"),
            Area::InputRegisters => f.write_str("IR"),
        }
    }
}

/// Byte order of a value within its register span
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    /// most significant byte first (`@BE`, the default)
    Big,
    /// least significant byte first (`@LE`)
    Little,
}

/// Order of 16-bit words for values spanning multiple registers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordOrder {
    /// high word at the lowest offset (`@HL`, the default)
    HighFirst,
    /// low word at the lowest offset (`@LH`)
    LowFirst,
}

/// Modifier set attached to an address: at most one byte order and one word
/// order. A repeated modifier of the same kind overwrites the previous one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    byte_order: Option<ByteOrder>,
    word_order: Option<WordOrder>,
}

impl Modifiers {
    /// Modifier set with the given byte order
    pub fn byte_order(order: ByteOrder) -> Self {
        Self::default().with_byte_order(order)
    }

    /// Modifier set with the given word order
    pub fn word_order(order: WordOrder) -> Self {
        Self::default().with_word_order(order)
    }

    /// Replace the byte order
    pub fn with_byte_order(mut self, order: ByteOrder) -> Self {
        self.byte_order = Some(order);
        self
    }

    /// Replace the word order
    pub fn with_word_order(mut self, order: WordOrder) -> Self {
        self.word_order = Some(order);
        self
    }

    /// The effective orders, applying the big-endian / high-word-first defaults
    pub fn resolve(self) -> (ByteOrder, WordOrder) {
        (
            self.byte_order.unwrap_or(ByteOrder::Big),
            self.word_order.unwrap_or(WordOrder::HighFirst),
        )
    }
}

/// A parsed, immutable tag address
///
/// Offsets and unit ids are always in range after a successful parse.
#[derive(Clone, Debug, PartialEq)]
pub struct Address {
    unit_id: Option<UnitId>,
    area: Area,
    offset: u16,
    data_type: DataType,
    modifiers: Modifiers,
}

impl Address {
    /// Construct an address from its parts
    pub fn new(
        unit_id: Option<UnitId>,
        area: Area,
        offset: u16,
        data_type: DataType,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            unit_id,
            area,
            offset,
            data_type,
            modifiers,
        }
    }

    /// Unit id, when the address text carried one
    pub fn unit_id(&self) -> Option<UnitId> {
        self.unit_id
    }

    /// The addressed area
    pub fn area(&self) -> Area {
        self.area
    }

    /// Offset within the area
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Declared data type, including any bit projection
    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Byte/word-order modifier set
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifiers_default_to_big_endian_high_word_first() {
        assert_eq!(
            Modifiers::default().resolve(),
            (ByteOrder::Big, WordOrder::HighFirst)
        );
    }

    #[test]
    fn repeated_modifier_of_a_kind_overwrites() {
        let m = Modifiers::byte_order(ByteOrder::Big).with_byte_order(ByteOrder::Little);
        assert_eq!(m.resolve(), (ByteOrder::Little, WordOrder::HighFirst));
    }
}
