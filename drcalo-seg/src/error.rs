//! Segmentation-specific error types.

use thiserror::Error;

/// Result type for segmentation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Segmentation error types.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid region parameterization input.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Required configuration missing at first use.
    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    /// Tower eta index outside every configured region.
    #[error("tower eta index {eta} outside configured regions (max {max})")]
    InvalidTowerIndex {
        /// Decoded eta index.
        eta: u32,
        /// Number of configured towers.
        max: u32,
    },

    /// Tower phi index outside the eta ring.
    #[error("tower phi index {phi} outside ring with {max} segments")]
    InvalidPhiIndex {
        /// Decoded phi index.
        phi: u32,
        /// Phi segments in the ring.
        max: u32,
    },

    /// SiPM indices outside the tower grid.
    #[error("sipm index ({x}, {y}) outside tower grid {num_x}x{num_y}")]
    InvalidCellIndex {
        /// Decoded column index.
        x: u32,
        /// Decoded row index.
        y: u32,
        /// Columns in the tower.
        num_x: u32,
        /// Rows in the tower.
        num_y: u32,
    },

    /// Module tag is neither tower-level nor SiPM-level.
    #[error("unrecognized module tag {0}")]
    InvalidModuleTag(u64),

    /// Address names a region other than the one its eta index resolves to.
    #[error("region {given:?} does not match the region resolved from eta index {eta}")]
    RegionMismatch {
        /// Region carried by the address.
        given: drcalo_core::Region,
        /// Eta index it was paired with.
        eta: u32,
    },

    /// Elevation angle outside every tower boundary table.
    #[error("elevation angle {theta} outside detector acceptance")]
    OutsideAcceptance {
        /// Queried elevation angle.
        theta: f64,
    },

    /// Core identifier/bit-field error.
    #[error("core error: {0}")]
    CoreError(#[from] drcalo_core::Error),
}
