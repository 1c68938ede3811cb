//! drcalo-core: Core identifier and bit-field types for dual-readout
//! calorimeter segmentation.
//!
//! This crate provides the foundational abstractions for cell addressing:
//! the packed 64-bit cell identifier, the encoding-string bit-field coder,
//! and the small geometric value types shared by the segmentation crate.

pub mod bitfield;
pub mod cellid;
pub mod error;
pub mod vector;

pub use bitfield::{BitFieldCoder, FieldHandle};
pub use cellid::{CellId, Region, Side};
pub use error::{Error, Result};
pub use vector::Vector3;
