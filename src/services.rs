//! Raw field-side operations over one or more process images.
//!
//! These are the operations a wire PDU handler issues: numeric start/quantity
//! addressing, packed-bit and register-pair payloads, no parser or codec
//! involvement. Failures map to the Modbus exception vocabulary rather than
//! the supervisory-side error taxonomy.

use crate::common::bits;
use crate::constants::limits;
use crate::error::ExceptionCode;
use crate::image::{BitView, ProcessImage, RegisterView};
use crate::types::{AddressRange, Indexed, UnitId};

use std::collections::BTreeMap;
use std::sync::Arc;

/// Raw Modbus operations routed by unit id
pub struct FieldServices {
    devices: BTreeMap<UnitId, Arc<ProcessImage>>,
}

impl FieldServices {
    /// Services over a single device
    pub fn single(unit: UnitId, image: Arc<ProcessImage>) -> Self {
        let mut devices = BTreeMap::new();
        devices.insert(unit, image);
        Self { devices }
    }

    /// Services with no devices; populate with [FieldServices::add]
    pub fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
        }
    }

    /// Add a device, replacing any existing image for the unit id
    pub fn add(&mut self, unit: UnitId, image: Arc<ProcessImage>) {
        self.devices.insert(unit, image);
    }

    fn device(&self, unit: UnitId) -> Result<&Arc<ProcessImage>, ExceptionCode> {
        match self.devices.get(&unit) {
            Some(image) => Ok(image),
            None => {
                tracing::warn!("no device with unit id {}", unit);
                Err(ExceptionCode::GatewayTargetDeviceFailedToRespond)
            }
        }
    }

    /// Read coil status, packed 8 per byte LSB-first
    pub fn read_coils(&self, unit: UnitId, start: u16, count: u16) -> Result<Vec<u8>, ExceptionCode> {
        let device = self.device(unit)?;
        let range = checked_range(start, count, limits::MAX_READ_BITS_COUNT)?;
        Ok(device.read_coils(|view| pack_bits(view, range)))
    }

    /// Read discrete input status, packed 8 per byte LSB-first
    pub fn read_discrete_inputs(
        &self,
        unit: UnitId,
        start: u16,
        count: u16,
    ) -> Result<Vec<u8>, ExceptionCode> {
        let device = self.device(unit)?;
        let range = checked_range(start, count, limits::MAX_READ_BITS_COUNT)?;
        Ok(device.read_discrete_inputs(|view| pack_bits(view, range)))
    }

    /// Read holding registers, two big-endian bytes per register
    pub fn read_holding_registers(
        &self,
        unit: UnitId,
        start: u16,
        count: u16,
    ) -> Result<Vec<u8>, ExceptionCode> {
        let device = self.device(unit)?;
        let range = checked_range(start, count, limits::MAX_READ_REGISTERS_COUNT)?;
        Ok(device.read_holding_registers(|view| collect_registers(view, range)))
    }

    /// Read input registers, two big-endian bytes per register
    pub fn read_input_registers(
        &self,
        unit: UnitId,
        start: u16,
        count: u16,
    ) -> Result<Vec<u8>, ExceptionCode> {
        let device = self.device(unit)?;
        let range = checked_range(start, count, limits::MAX_READ_REGISTERS_COUNT)?;
        Ok(device.read_input_registers(|view| collect_registers(view, range)))
    }

    /// Force a single coil
    pub fn write_single_coil(
        &self,
        unit: UnitId,
        value: Indexed<bool>,
    ) -> Result<(), ExceptionCode> {
        let device = self.device(unit)?;
        device.write_coils(|tx| {
            tx.set(value.index, value.value);
            Ok(())
        })
    }

    /// Preset a single holding register
    pub fn write_single_register(
        &self,
        unit: UnitId,
        value: Indexed<u16>,
    ) -> Result<(), ExceptionCode> {
        let device = self.device(unit)?;
        device.write_holding_registers(|tx| {
            tx.set(value.index, value.value.to_be_bytes());
            Ok(())
        })
    }

    /// Force multiple coils from an LSB-first packed payload
    pub fn write_multiple_coils(
        &self,
        unit: UnitId,
        start: u16,
        count: u16,
        bytes: &[u8],
    ) -> Result<(), ExceptionCode> {
        let device = self.device(unit)?;
        let range = checked_range(start, count, limits::MAX_WRITE_COILS_COUNT)?;
        if bytes.len() != bits::num_bytes_for_bits(count) {
            tracing::warn!(
                "write coils payload of {} byte(s) does not match a count of {}",
                bytes.len(),
                count
            );
            return Err(ExceptionCode::IllegalDataValue);
        }
        device.write_coils(|tx| {
            for (i, offset) in range.iter().enumerate() {
                tx.set(offset, bits::get_bit(bytes, i));
            }
            Ok(())
        })
    }

    /// Preset multiple holding registers from a byte-pair payload
    pub fn write_multiple_registers(
        &self,
        unit: UnitId,
        start: u16,
        count: u16,
        bytes: &[u8],
    ) -> Result<(), ExceptionCode> {
        let device = self.device(unit)?;
        let range = checked_range(start, count, limits::MAX_WRITE_REGISTERS_COUNT)?;
        if bytes.len() != count as usize * 2 {
            tracing::warn!(
                "write registers payload of {} byte(s) does not match a count of {}",
                bytes.len(),
                count
            );
            return Err(ExceptionCode::IllegalDataValue);
        }
        device.write_holding_registers(|tx| {
            for (pair, offset) in bytes.chunks_exact(2).zip(range.iter()) {
                tx.set(offset, [pair[0], pair[1]]);
            }
            Ok(())
        })
    }

    /// Mask-write one holding register: `(current & and) | (or & !and)`
    ///
    /// Atomic under the area's exclusive lock.
    pub fn mask_write_register(
        &self,
        unit: UnitId,
        offset: u16,
        and_mask: u16,
        or_mask: u16,
    ) -> Result<(), ExceptionCode> {
        let device = self.device(unit)?;
        device.write_holding_registers(|tx| {
            let current = u16::from_be_bytes(tx.get(offset));
            let result = (current & and_mask) | (or_mask & !and_mask);
            tx.set(offset, result.to_be_bytes());
            Ok(())
        })
    }
}

impl Default for FieldServices {
    fn default() -> Self {
        Self::new()
    }
}

fn checked_range(start: u16, count: u16, max: u16) -> Result<AddressRange, ExceptionCode> {
    let range = AddressRange::try_from(start, count).map_err(|err| {
        tracing::warn!("invalid range: {}", err);
        ExceptionCode::from(err)
    })?;
    if range.count > max {
        tracing::warn!("count of {} exceeds the maximum of {}", range.count, max);
        return Err(ExceptionCode::IllegalDataValue);
    }
    Ok(range)
}

fn pack_bits(view: &BitView, range: AddressRange) -> Vec<u8> {
    let mut bytes = vec![0u8; bits::num_bytes_for_bits(range.count)];
    for (i, offset) in range.iter().enumerate() {
        bits::set_bit(&mut bytes, i, view.get(offset));
    }
    bytes
}

fn collect_registers(view: &RegisterView, range: AddressRange) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(range.count as usize * 2);
    for offset in range.iter() {
        bytes.extend_from_slice(&view.get(offset));
    }
    bytes
}
