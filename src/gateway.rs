//! The translation layer: typed reads and writes addressed by tag text.
//!
//! A [Gateway] resolves a parsed [Address] against the process image. Bit
//! areas move single booleans; register areas move whole register spans
//! through the codec. Every operation runs in a single image transaction, so
//! a multi-register value is never observed half-written and a bit
//! read-modify-write cannot interleave with another writer.

use crate::address::{self, Address, Area};
use crate::codec;
use crate::error::{AddressError, InternalError, NotSupported, TagError};
use crate::image::{ProcessImage, RegisterTransaction, RegisterView};
use crate::types::{DataType, Value};

use std::sync::Arc;

/// Typed access to one device's process image by structured address
pub struct Gateway {
    image: Arc<ProcessImage>,
}

impl Gateway {
    /// Create a gateway over the given process image
    pub fn new(image: Arc<ProcessImage>) -> Self {
        Self { image }
    }

    /// The underlying process image
    pub fn image(&self) -> &Arc<ProcessImage> {
        &self.image
    }

    /// Parse `text` and read the addressed value
    ///
    /// A non-empty `index_range` requests partial-array access, which is
    /// recognized but not supported.
    pub fn read(&self, text: &str, index_range: Option<&str>) -> Result<Value, TagError> {
        check_index_range(index_range)?;
        let address = address::parse(text)?;
        self.read_value(&address)
    }

    /// Parse `text` and write `value` to the addressed location
    pub fn write(&self, text: &str, value: Value, index_range: Option<&str>) -> Result<(), TagError> {
        check_index_range(index_range)?;
        let address = address::parse(text)?;
        self.write_value(&address, &value)
    }

    /// Read a batch of addresses; each item carries its own outcome
    pub fn read_batch(&self, addresses: &[&str]) -> Vec<Result<Value, TagError>> {
        addresses.iter().map(|text| self.read(text, None)).collect()
    }

    /// Write a batch of address/value pairs; each item carries its own outcome
    pub fn write_batch(&self, items: &[(&str, Value)]) -> Vec<Result<(), TagError>> {
        items
            .iter()
            .map(|(text, value)| {
                let address = address::parse(text)?;
                self.write_value(&address, value)
            })
            .collect()
    }

    /// Read the value at a parsed address
    ///
    /// Bit areas read a single bit and always produce a boolean. Register
    /// areas read the data type's whole register span under one shared lock
    /// acquisition and decode it with the address's modifiers.
    pub fn read_value(&self, address: &Address) -> Result<Value, TagError> {
        match address.area() {
            Area::Coils => Ok(Value::Bool(
                self.image.read_coils(|view| view.get(address.offset())),
            )),
            Area::DiscreteInputs => Ok(Value::Bool(
                self.image
                    .read_discrete_inputs(|view| view.get(address.offset())),
            )),
            area => {
                let registers = checked_span(address)?;
                let bytes = self.read_span(area, address.offset(), registers);
                codec::decode(&bytes, address.data_type(), address.modifiers())
            }
        }
    }

    /// Write a value to a parsed address
    ///
    /// Bit areas accept only booleans, whatever data type the address
    /// declares. Register writes encode outside the transaction and commit
    /// the whole span inside it. A bit projection on a register area performs
    /// the read-modify-write of the underlying integer span within a single
    /// exclusive transaction.
    pub fn write_value(&self, address: &Address, value: &Value) -> Result<(), TagError> {
        match address.area() {
            Area::Coils => match value {
                Value::Bool(v) => self.image.write_coils(|tx| {
                    tx.set(address.offset(), *v);
                    Ok(())
                }),
                _ => Err(TagError::TypeMismatch),
            },
            Area::DiscreteInputs => match value {
                Value::Bool(v) => self.image.write_discrete_inputs(|tx| {
                    tx.set(address.offset(), *v);
                    Ok(())
                }),
                _ => Err(TagError::TypeMismatch),
            },
            area => self.write_register_value(area, address, value),
        }
    }

    fn write_register_value(
        &self,
        area: Area,
        address: &Address,
        value: &Value,
    ) -> Result<(), TagError> {
        let registers = checked_span(address)?;
        let offset = address.offset();
        let modifiers = address.modifiers();

        if let DataType::Bit { underlying, bit } = address.data_type() {
            address.data_type().check(value)?;
            if !underlying.is_integer() {
                return Err(InternalError::BitUnderlyingNotInteger((**underlying).clone()).into());
            }
            let set = matches!(value, Value::Bool(true));
            let mask = 1i64.wrapping_shl(*bit);

            return self.with_register_tx(area, |tx| {
                let mut bytes = Vec::with_capacity(registers * 2);
                for i in 0..registers {
                    bytes.extend_from_slice(&tx.get(offset + i as u16));
                }
                let current = codec::decode(&bytes, underlying, modifiers)?
                    .as_i64()
                    .ok_or_else(|| InternalError::BitUnderlyingNotInteger((**underlying).clone()))?;
                let next = if set { current | mask } else { current & !mask };
                let bytes = codec::encode(&integer_value(next, underlying), underlying, modifiers)?;
                set_span(tx, offset, &bytes);
                Ok(())
            });
        }

        // encode performs the domain check before any lock is taken
        let bytes = codec::encode(value, address.data_type(), modifiers)?;
        self.with_register_tx(area, |tx| {
            set_span(tx, offset, &bytes);
            Ok(())
        })
    }

    fn read_span(&self, area: Area, offset: u16, registers: usize) -> Vec<u8> {
        let read = move |view: &RegisterView| {
            let mut bytes = Vec::with_capacity(registers * 2);
            for i in 0..registers {
                bytes.extend_from_slice(&view.get(offset + i as u16));
            }
            bytes
        };
        if area == Area::InputRegisters {
            self.image.read_input_registers(read)
        } else {
            self.image.read_holding_registers(read)
        }
    }

    // only called with a register area
    fn with_register_tx<R>(
        &self,
        area: Area,
        f: impl FnOnce(&mut RegisterTransaction) -> Result<R, TagError>,
    ) -> Result<R, TagError> {
        if area == Area::InputRegisters {
            self.image.write_input_registers(f)
        } else {
            self.image.write_holding_registers(f)
        }
    }
}

fn check_index_range(index_range: Option<&str>) -> Result<(), TagError> {
    match index_range {
        Some(range) if !range.is_empty() => Err(TagError::NotSupported(NotSupported::IndexRange)),
        _ => Ok(()),
    }
}

/// register count of the address's span, rejecting spans past the area end
fn checked_span(address: &Address) -> Result<usize, TagError> {
    let registers = address.data_type().register_count();
    if registers == 0 || address.offset() as usize + registers > 0x1_0000 {
        return Err(AddressError::SpanOverflow {
            offset: address.offset(),
            registers,
        }
        .into());
    }
    Ok(registers)
}

fn set_span(tx: &mut RegisterTransaction, offset: u16, bytes: &[u8]) {
    for (i, pair) in bytes.chunks_exact(2).enumerate() {
        tx.set(offset + i as u16, [pair[0], pair[1]]);
    }
}

/// rebuild an integer value of `data_type` from the masked 64-bit image
fn integer_value(bits: i64, data_type: &DataType) -> Value {
    match data_type {
        DataType::Int16 => Value::Int16(bits as i16),
        DataType::UInt16 => Value::UInt16(bits as u16),
        DataType::Int32 => Value::Int32(bits as i32),
        DataType::UInt32 => Value::UInt32(bits as u32),
        DataType::UInt64 => Value::UInt64(bits as u64),
        _ => Value::Int64(bits),
    }
}
