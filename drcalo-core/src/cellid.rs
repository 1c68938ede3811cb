//! Packed cell identifier and the side/region tags it carries.
//!
//! A [`CellId`] is an opaque 64-bit value whose named sub-fields are read
//! and written through a [`crate::BitFieldCoder`]. The default layout keeps
//! every tower-addressing field (system, side, eta, phi, module) in the low
//! 32 bits and every SiPM-local field (x, y, Cerenkov flag) in the high
//! 32 bits, so the legacy 32-bit split view is a clean truncation.
//!
//! Sentinel convention for the split: converting one half back to 64 bits
//! zero-fills the other half. A zero high half reads as `x = 0, y = 0,
//! scintillation`; a zero low half reads as `system = 0, RHS, eta = 0,
//! phi = 0, tower-level`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Packed 64-bit cell identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellId(pub u64);

impl CellId {
    /// Creates an identifier from its raw packed value.
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw packed value.
    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the low half (tower-addressing fields).
    #[inline]
    pub fn first32(&self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    /// Returns the high half (SiPM-local fields).
    #[inline]
    pub fn last32(&self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Rebuilds an identifier from a low half, zero-filling the high half.
    #[inline]
    pub fn from_first32(half: u32) -> Self {
        Self(u64::from(half))
    }

    /// Rebuilds an identifier from a high half, zero-filling the low half.
    #[inline]
    pub fn from_last32(half: u32) -> Self {
        Self(u64::from(half) << 32)
    }

    /// Recombines the two halves of a split identifier.
    #[inline]
    pub fn from_halves(first: u32, last: u32) -> Self {
        Self(u64::from(first) | (u64::from(last) << 32))
    }
}

impl From<u64> for CellId {
    #[inline]
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl From<CellId> for u64 {
    #[inline]
    fn from(id: CellId) -> Self {
        id.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Detector half, encoded as the identifier's side bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Side {
    /// Right-hand side (positive z), side bit 0.
    Right = 0,
    /// Left-hand side (negative z), side bit 1.
    Left = 1,
}

impl Side {
    /// Creates a side from the raw bit value.
    #[inline]
    pub fn from_bit(bit: u64) -> Self {
        if bit == 0 {
            Side::Right
        } else {
            Side::Left
        }
    }

    /// Returns the raw bit value.
    #[inline]
    pub fn bit(&self) -> u64 {
        *self as u64
    }

    /// Returns true for the right-hand side.
    #[inline]
    pub fn is_rhs(&self) -> bool {
        matches!(self, Side::Right)
    }

    /// Returns the z sign of this side.
    #[inline]
    pub fn z_sign(&self) -> f64 {
        match self {
            Side::Right => 1.0,
            Side::Left => -1.0,
        }
    }

    /// Returns the opposite side.
    #[inline]
    pub fn mirrored(&self) -> Self {
        match self {
            Side::Right => Side::Left,
            Side::Left => Side::Right,
        }
    }
}

/// Geometric region of the detector, derived from the tower eta index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Region {
    /// Cylindrical barrel section.
    Barrel,
    /// Disk-shaped endcap section.
    Endcap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_halves() {
        let id = CellId::new(0xDEAD_BEEF_1234_5678);
        assert_eq!(id.first32(), 0x1234_5678);
        assert_eq!(id.last32(), 0xDEAD_BEEF);
        assert_eq!(CellId::from_halves(id.first32(), id.last32()), id);
    }

    #[test]
    fn test_split_sentinel_is_zero() {
        let id = CellId::new(0xDEAD_BEEF_1234_5678);
        assert_eq!(CellId::from_first32(id.first32()).as_u64(), 0x1234_5678);
        assert_eq!(
            CellId::from_last32(id.last32()).as_u64(),
            0xDEAD_BEEF_0000_0000
        );
    }

    #[test]
    fn test_side_roundtrip() {
        assert_eq!(Side::from_bit(0), Side::Right);
        assert_eq!(Side::from_bit(1), Side::Left);
        assert!(Side::Right.is_rhs());
        assert!(!Side::Left.is_rhs());
        assert_eq!(Side::Right.mirrored(), Side::Left);
        assert_eq!(Side::Left.mirrored().bit(), 0);
    }

    #[test]
    fn test_display_is_hex() {
        let id = CellId::new(0xAB);
        assert_eq!(id.to_string(), "0x00000000000000ab");
    }
}
