use crate::address::{Address, Area, ByteOrder, Modifiers, WordOrder};
use crate::error::{AddressError, TagError};
use crate::types::{DataType, UnitId};

/// Parse a structured tag address
///
/// Succeeds only on a full match of the grammar
/// `[unitId.]AREA[<type[dims][@mod]*>]offset[dims][.bit]`. Array dimensions
/// are accepted syntactically but rejected as unimplemented. Unknown modifier
/// tokens are silently ignored.
pub fn parse(text: &str) -> Result<Address, TagError> {
    let mut scanner = Scanner::new(text);

    let unit_id = parse_unit_id(&mut scanner, text)?;

    let area = match parse_area(&mut scanner) {
        Some(area) => area,
        None => return Err(syntax(text)),
    };

    let mut modifiers = Modifiers::default();
    let mut dimensioned = false;

    let mut data_type = if scanner.eat(b'<') {
        let data_type = match parse_data_type(&mut scanner) {
            Some(dt) => dt,
            None => return Err(syntax(text)),
        };
        dimensioned |= parse_dimensions(&mut scanner, text)?;
        parse_modifiers(&mut scanner, &mut modifiers);
        if !scanner.eat(b'>') {
            return Err(syntax(text));
        }
        data_type
    } else if area.is_bit_area() {
        DataType::Bool
    } else {
        DataType::Int16
    };

    let digits = scanner.take_while(|b| b.is_ascii_digit());
    if digits.is_empty() {
        return Err(syntax(text));
    }
    let offset = match digits.parse::<u32>() {
        Ok(value) if value <= u16::MAX as u32 => value as u16,
        _ => return Err(AddressError::Offset(digits.to_string()).into()),
    };

    dimensioned |= parse_dimensions(&mut scanner, text)?;

    if scanner.eat(b'.') {
        let digits = scanner.take_while(|b| b.is_ascii_digit());
        if digits.is_empty() {
            return Err(syntax(text));
        }
        // deliberately no range check against the underlying type's width
        let bit = digits
            .parse::<u32>()
            .map_err(|_| AddressError::BitIndex(digits.to_string()))?;
        data_type = DataType::Bit {
            underlying: Box::new(data_type),
            bit,
        };
    }

    if !scanner.at_end() {
        return Err(syntax(text));
    }

    if dimensioned {
        return Err(AddressError::ArrayAddressing.into());
    }

    Ok(Address::new(unit_id, area, offset, data_type, modifiers))
}

fn syntax(text: &str) -> TagError {
    AddressError::Syntax(text.to_string()).into()
}

fn parse_unit_id(scanner: &mut Scanner, text: &str) -> Result<Option<UnitId>, TagError> {
    if !scanner.peek().is_some_and(|b| b.is_ascii_digit()) {
        return Ok(None);
    }

    let digits = scanner.take_while(|b| b.is_ascii_digit());
    if !scanner.eat(b'.') {
        return Err(syntax(text));
    }

    match digits.parse::<u32>() {
        Ok(value) if value <= u8::MAX as u32 => Ok(Some(UnitId::new(value as u8))),
        _ => Err(AddressError::UnitId(digits.to_string()).into()),
    }
}

fn parse_area(scanner: &mut Scanner) -> Option<Area> {
    match scanner.peek().map(|b| b.to_ascii_uppercase())? {
        b'C' => {
            scanner.advance();
            Some(Area::Coils)
        }
        b'D' => {
            scanner.advance();
            scanner.eat_ignore_case(b'I').then_some(Area::DiscreteInputs)
        }
        b'H' => {
            scanner.advance();
            scanner.eat_ignore_case(b'R').then_some(Area::HoldingRegisters)
        }
        b'I' => {
            scanner.advance();
            scanner.eat_ignore_case(b'R').then_some(Area::InputRegisters)
        }
        _ => None,
    }
}

/// consume exactly one known type name
///
/// The token stops at the end of the name rather than running to the next
/// delimiter, so a trailing modifier run needs no leading `@`: `int16BE`
/// parses as `int16` followed by the modifier run `BE`.
fn parse_data_type(scanner: &mut Scanner) -> Option<DataType> {
    let names = [
        ("bool", DataType::Bool),
        ("int16", DataType::Int16),
        ("uint16", DataType::UInt16),
        ("int32", DataType::Int32),
        ("uint32", DataType::UInt32),
        ("int64", DataType::Int64),
        ("uint64", DataType::UInt64),
        ("float", DataType::Float32),
        ("double", DataType::Float64),
    ];

    for (name, data_type) in names {
        if scanner.eat_keyword(name) {
            return Some(data_type);
        }
    }

    if scanner.eat_keyword("string") {
        let length = scanner.take_while(|b| b.is_ascii_digit());
        // positive decimal, no leading zero
        if length.is_empty() || length.starts_with('0') {
            return None;
        }
        return length.parse::<usize>().ok().map(DataType::String);
    }

    None
}

/// consume 0-3 `[digits]` groups, reporting whether any were present
fn parse_dimensions(scanner: &mut Scanner, text: &str) -> Result<bool, TagError> {
    let mut count = 0;
    while scanner.eat(b'[') {
        let digits = scanner.take_while(|b| b.is_ascii_digit());
        if digits.is_empty() || !scanner.eat(b']') {
            return Err(syntax(text));
        }
        count += 1;
        if count > 3 {
            return Err(syntax(text));
        }
    }
    Ok(count > 0)
}

/// consume a run of modifier-alphabet characters and apply the known tokens
///
/// The run is split on `@`, so the first token needs no leading `@`; tokens
/// other than BE/LE/HL/LH are dropped without error, and a repeated kind
/// overwrites the previous value.
fn parse_modifiers(scanner: &mut Scanner, modifiers: &mut Modifiers) {
    let run = scanner.take_while(|b| {
        matches!(b.to_ascii_uppercase(), b'@' | b'B' | b'E' | b'L' | b'H' | b'|')
    });

    for token in run.split('@') {
        match token.to_ascii_uppercase().as_str() {
            "BE" => *modifiers = modifiers.with_byte_order(ByteOrder::Big),
            "LE" => *modifiers = modifiers.with_byte_order(ByteOrder::Little),
            "HL" => *modifiers = modifiers.with_word_order(WordOrder::HighFirst),
            "LH" => *modifiers = modifiers.with_word_order(WordOrder::LowFirst),
            _ => {}
        }
    }
}

struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_ignore_case(&mut self, upper: u8) -> bool {
        if self.peek().map(|b| b.to_ascii_uppercase()) == Some(upper) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// consume `keyword` if the input continues with it, ignoring case
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let bytes = self.text.as_bytes();
        let end = self.pos + keyword.len();
        if end > bytes.len() {
            return false;
        }
        if bytes[self.pos..end].eq_ignore_ascii_case(keyword.as_bytes()) {
            self.pos = end;
            true
        } else {
            false
        }
    }

    /// consume the longest run of bytes matching the predicate
    ///
    /// Predicates only match ASCII, so the returned slice always ends on a
    /// char boundary.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.advance();
        }
        &self.text[start..self.pos]
    }

    fn at_end(&self) -> bool {
        self.pos == self.text.len()
    }
}
