//! Translation core bridging raw Modbus register/coil data and a structured
//! tag address space.
//!
//! The crate maintains a concurrently-accessed process image of the four
//! Modbus areas and exposes it two ways:
//!
//! * [`services::FieldServices`] — raw, type-erased operations keyed by unit
//!   id and numeric address/quantity, as a wire PDU handler would issue them.
//! * [`gateway::Gateway`] — typed reads and writes addressed by a structured
//!   tag string such as `HR<float@LE>100` or `1.HR42.3`, parsed by
//!   [`address::parse`] and converted through the register codec.
//!
//! # Address syntax
//!
//! `[unitId.]AREA[<type[@mod]*>]offset[.bit]` where `AREA` is one of `C`,
//! `DI`, `HR`, `IR` (case-insensitive), `type` is one of `bool`, `int16`,
//! `uint16`, `int32`, `uint32`, `int64`, `uint64`, `float`, `double` or
//! `stringN`, and the modifiers `@BE`/`@LE` select byte order while
//! `@HL`/`@LH` select word order for multi-register values.
//!
//! # Example
//!
//! ```
//! use tagbus::gateway::Gateway;
//! use tagbus::image::ProcessImage;
//! use tagbus::types::Value;
//!
//! use std::sync::Arc;
//!
//! let image = Arc::new(ProcessImage::new());
//! let gateway = Gateway::new(image);
//!
//! gateway.write("HR<float>100", Value::Float32(1.234), None).unwrap();
//! assert_eq!(gateway.read("HR<float>100", None).unwrap(), Value::Float32(1.234));
//! ```

/// structured tag addresses and their parser
pub mod address;
/// conversion between typed values and register byte spans
pub mod codec;
/// error types produced by the translation core
pub mod error;
/// typed read/write access to the process image by structured address
pub mod gateway;
/// the shared, lock-protected store of coil and register state
pub mod image;
/// raw field-side operations keyed by unit id
pub mod services;
/// basic public types: unit ids, address ranges, data types and values
pub mod types;

pub(crate) mod constants;

mod common {
    pub(crate) mod bits;
}
