//! drcalo-seg: Dual-readout calorimeter segmentation.
//!
//! This crate maps between packed cell identifiers and 3-D positions for a
//! dual-readout calorimeter with a cylindrical barrel and disk endcaps,
//! and enumerates cell adjacency across towers with differing SiPM counts.
//!
//! A [`Segmentation`] is configured once (encoding, pitches, region
//! parameterizations) and then queried per hit and per reconstruction
//! step: position from identifier, identifier from position, neighbors
//! from identifier.

pub mod error;
pub mod neighbours;
pub mod param;
pub mod segmentation;

pub use error::{Error, Result};
pub use neighbours::remap_index;
pub use param::{BarrelConfig, BarrelParam, EndcapConfig, EndcapParam, ParamView};
pub use segmentation::{CellAddress, CellKind, Segmentation, DEFAULT_ENCODING};

pub use drcalo_core::{BitFieldCoder, CellId, Region, Side, Vector3};
