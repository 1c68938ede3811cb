//! Region parameterizations for the barrel and endcap.
//!
//! Each region is described by a config (tower widths in elevation, phi
//! segments per ring, anchor surface) and compiled once into an immutable
//! parameter set with derived lookup tables: cumulative tower boundaries
//! and per-ring SiPM counts. Towers need not be uniformly spaced and rings
//! need not share phi segment counts, so every lookup is table-based.
//!
//! The elevation angle `theta` is measured from the transverse plane.
//! Barrel towers sit on a cylinder of inner radius `R`, so the distance
//! from the origin to a tower front face is `R / cos(theta)`; endcap
//! towers sit on a disk at `|z| = Z`, giving `Z / sin(theta)`. Both share
//! the tower center direction `(theta_c, phi_c)` and the front-face
//! extent formulas `w = rho * delta_phi` (phi direction) and
//! `h = d * delta_theta` (eta direction), from which the SiPM counts are
//! derived as `floor(extent / grid_pitch)`.

use crate::{Error, Result};
use drcalo_core::Region;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Barrel region input: towers tiling elevation upward from the equator on
/// a cylinder.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BarrelConfig {
    /// Inner cylinder radius.
    pub inner_radius: f64,
    /// Elevation width of each eta ring, starting at theta = 0.
    pub tower_widths: Vec<f64>,
    /// Phi segments per eta ring (one entry per ring).
    pub phi_segments: Vec<u32>,
}

impl BarrelConfig {
    /// Uniform barrel: `tower_count` rings of equal width and equal phi
    /// segmentation.
    pub fn uniform(inner_radius: f64, tower_count: usize, delta_theta: f64, phi_segments: u32) -> Self {
        Self {
            inner_radius,
            tower_widths: vec![delta_theta; tower_count],
            phi_segments: vec![phi_segments; tower_count],
        }
    }
}

/// Endcap region input: towers continuing from `theta_min` toward the beam
/// axis on a disk.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EndcapConfig {
    /// Disk position along the beam axis (|z| of the front face).
    pub inner_z: f64,
    /// Elevation where endcap coverage starts (the barrel coverage edge).
    pub theta_min: f64,
    /// Elevation width of each eta ring, starting at `theta_min`.
    pub tower_widths: Vec<f64>,
    /// Phi segments per eta ring (one entry per ring).
    pub phi_segments: Vec<u32>,
}

impl EndcapConfig {
    /// Uniform endcap: `tower_count` rings of equal width and equal phi
    /// segmentation.
    pub fn uniform(
        inner_z: f64,
        theta_min: f64,
        tower_count: usize,
        delta_theta: f64,
        phi_segments: u32,
    ) -> Self {
        Self {
            inner_z,
            theta_min,
            tower_widths: vec![delta_theta; tower_count],
            phi_segments: vec![phi_segments; tower_count],
        }
    }
}

/// Derived per-region lookup tables.
#[derive(Debug, Clone)]
struct Tables {
    /// Cumulative elevation boundaries, length `tower_count + 1`.
    boundaries: Vec<f64>,
    /// Phi segments per ring.
    phi_segments: Vec<u32>,
    /// SiPM columns per ring.
    num_x: Vec<u32>,
    /// SiPM rows per ring.
    num_y: Vec<u32>,
}

impl Tables {
    fn build<F>(
        region: &str,
        theta_min: f64,
        widths: &[f64],
        phi_segments: &[u32],
        grid_pitch: f64,
        anchor_distance: F,
    ) -> Result<Self>
    where
        F: Fn(f64) -> f64,
    {
        if widths.is_empty() {
            return Err(Error::InvalidParameters(format!(
                "{region}: no towers defined"
            )));
        }
        if widths.len() != phi_segments.len() {
            return Err(Error::InvalidParameters(format!(
                "{region}: {} tower widths but {} phi segment entries",
                widths.len(),
                phi_segments.len()
            )));
        }
        if grid_pitch <= 0.0 {
            return Err(Error::InvalidParameters(format!(
                "{region}: grid pitch must be positive, got {grid_pitch}"
            )));
        }

        let mut boundaries = Vec::with_capacity(widths.len() + 1);
        boundaries.push(theta_min);
        let mut theta = theta_min;
        for (ring, &w) in widths.iter().enumerate() {
            if w <= 0.0 {
                return Err(Error::InvalidParameters(format!(
                    "{region}: tower width {w} of ring {ring} is not positive"
                )));
            }
            theta += w;
            boundaries.push(theta);
        }
        if theta > std::f64::consts::FRAC_PI_2 {
            return Err(Error::InvalidParameters(format!(
                "{region}: towers extend past the beam axis (theta = {theta})"
            )));
        }

        let mut num_x = Vec::with_capacity(widths.len());
        let mut num_y = Vec::with_capacity(widths.len());
        for (ring, &n_phi) in phi_segments.iter().enumerate() {
            if n_phi == 0 {
                return Err(Error::InvalidParameters(format!(
                    "{region}: ring {ring} has zero phi segments"
                )));
            }
            let lo = boundaries[ring];
            let hi = boundaries[ring + 1];
            let theta_c = 0.5 * (lo + hi);
            let d = anchor_distance(theta_c);
            let rho = d * theta_c.cos();
            let delta_phi = std::f64::consts::TAU / f64::from(n_phi);
            let width = rho * delta_phi;
            let height = d * (hi - lo);
            num_x.push(((width / grid_pitch).floor() as u32).max(1));
            num_y.push(((height / grid_pitch).floor() as u32).max(1));
        }

        Ok(Self {
            boundaries,
            phi_segments: phi_segments.to_vec(),
            num_x,
            num_y,
        })
    }

    fn tower_count(&self) -> usize {
        self.num_x.len()
    }

    /// Ring containing `theta` under the `[lo, hi)` tie-break, or `None`
    /// outside the table.
    fn tower_of(&self, theta: f64) -> Option<usize> {
        let n = self.tower_count();
        if theta < self.boundaries[0] || theta >= self.boundaries[n] {
            return None;
        }
        // partition_point gives the first boundary strictly above theta
        Some(self.boundaries.partition_point(|b| *b <= theta) - 1)
    }
}

/// Immutable barrel parameterization with derived lookup tables.
#[derive(Debug, Clone)]
pub struct BarrelParam {
    inner_radius: f64,
    tables: Tables,
}

impl BarrelParam {
    /// Compiles a barrel config against a grid pitch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] for empty or non-positive
    /// inputs, mismatched table lengths, or coverage past the beam axis.
    pub fn new(config: &BarrelConfig, grid_pitch: f64) -> Result<Self> {
        if config.inner_radius <= 0.0 {
            return Err(Error::InvalidParameters(format!(
                "barrel: inner radius must be positive, got {}",
                config.inner_radius
            )));
        }
        let r = config.inner_radius;
        let tables = Tables::build(
            "barrel",
            0.0,
            &config.tower_widths,
            &config.phi_segments,
            grid_pitch,
            |theta| r / theta.cos(),
        )?;
        Ok(Self {
            inner_radius: r,
            tables,
        })
    }

    /// Inner cylinder radius.
    pub fn inner_radius(&self) -> f64 {
        self.inner_radius
    }
}

/// Immutable endcap parameterization with derived lookup tables.
#[derive(Debug, Clone)]
pub struct EndcapParam {
    inner_z: f64,
    tables: Tables,
}

impl EndcapParam {
    /// Compiles an endcap config against a grid pitch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] for empty or non-positive
    /// inputs, mismatched table lengths, or coverage past the beam axis.
    pub fn new(config: &EndcapConfig, grid_pitch: f64) -> Result<Self> {
        if config.inner_z <= 0.0 {
            return Err(Error::InvalidParameters(format!(
                "endcap: disk position must be positive, got {}",
                config.inner_z
            )));
        }
        if config.theta_min <= 0.0 {
            return Err(Error::InvalidParameters(format!(
                "endcap: theta_min must be positive, got {}",
                config.theta_min
            )));
        }
        let z = config.inner_z;
        let tables = Tables::build(
            "endcap",
            config.theta_min,
            &config.tower_widths,
            &config.phi_segments,
            grid_pitch,
            |theta| z / theta.sin(),
        )?;
        Ok(Self {
            inner_z: z,
            tables,
        })
    }

    /// Disk position along the beam axis.
    pub fn inner_z(&self) -> f64 {
        self.inner_z
    }
}

/// Read-only view dispatching over the two region parameterizations.
///
/// Ring indices are local to the region; the segmentation translates the
/// global tower eta index before calling in.
#[derive(Debug, Clone, Copy)]
pub enum ParamView<'a> {
    /// Barrel parameterization.
    Barrel(&'a BarrelParam),
    /// Endcap parameterization.
    Endcap(&'a EndcapParam),
}

impl ParamView<'_> {
    fn tables(&self) -> &Tables {
        match self {
            ParamView::Barrel(p) => &p.tables,
            ParamView::Endcap(p) => &p.tables,
        }
    }

    /// Region this view describes.
    pub fn region(&self) -> Region {
        match self {
            ParamView::Barrel(_) => Region::Barrel,
            ParamView::Endcap(_) => Region::Endcap,
        }
    }

    /// Number of eta rings in the region.
    pub fn tower_count(&self) -> usize {
        self.tables().tower_count()
    }

    /// Cumulative elevation boundaries, length `tower_count() + 1`.
    pub fn boundaries(&self) -> &[f64] {
        &self.tables().boundaries
    }

    /// Phi segments of a ring.
    pub fn phi_segments(&self, ring: usize) -> u32 {
        self.tables().phi_segments[ring]
    }

    /// SiPM columns of a ring.
    pub fn num_x(&self, ring: usize) -> u32 {
        self.tables().num_x[ring]
    }

    /// SiPM rows of a ring.
    pub fn num_y(&self, ring: usize) -> u32 {
        self.tables().num_y[ring]
    }

    /// Center elevation and width of a ring.
    pub fn tower_center(&self, ring: usize) -> (f64, f64) {
        let t = self.tables();
        let lo = t.boundaries[ring];
        let hi = t.boundaries[ring + 1];
        (0.5 * (lo + hi), hi - lo)
    }

    /// Ring containing `theta` under the `[lo, hi)` tie-break.
    pub fn tower_of(&self, theta: f64) -> Option<usize> {
        self.tables().tower_of(theta)
    }

    /// Distance from the origin to the tower front-face center at the
    /// given elevation.
    pub fn anchor_distance(&self, theta: f64) -> f64 {
        match self {
            ParamView::Barrel(p) => p.inner_radius / theta.cos(),
            ParamView::Endcap(p) => p.inner_z / theta.sin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn barrel() -> BarrelParam {
        BarrelParam::new(&BarrelConfig::uniform(100.0, 10, 0.1, 20), 1.0).unwrap()
    }

    #[test]
    fn test_barrel_tables() {
        let p = barrel();
        let v = ParamView::Barrel(&p);
        assert_eq!(v.tower_count(), 10);
        assert_eq!(v.boundaries().len(), 11);
        assert_relative_eq!(v.boundaries()[3], 0.3);

        // cylinder: every ring has the same face width, so num_x is flat
        let w = 100.0 * std::f64::consts::TAU / 20.0;
        assert_eq!(v.num_x(0), w.floor() as u32);
        assert_eq!(v.num_x(9), v.num_x(0));

        // face height grows with 1/cos(theta), so num_y is non-decreasing
        assert!(v.num_y(9) >= v.num_y(0));
        let (tc, dt) = v.tower_center(3);
        assert_relative_eq!(tc, 0.35);
        assert_relative_eq!(dt, 0.1);
        assert_relative_eq!(v.anchor_distance(tc), 100.0 / tc.cos());
    }

    #[test]
    fn test_endcap_counts_shrink_toward_axis() {
        let cfg = EndcapConfig::uniform(250.0, 1.0, 5, 0.1, 16);
        let p = EndcapParam::new(&cfg, 1.0).unwrap();
        let v = ParamView::Endcap(&p);
        // disk radius Z/tan(theta) falls as theta rises, so inner rings
        // carry fewer columns
        for ring in 1..5 {
            assert!(v.num_x(ring) <= v.num_x(ring - 1));
        }
        assert_relative_eq!(v.anchor_distance(1.2), 250.0 / 1.2f64.sin());
    }

    #[test]
    fn test_tower_lookup_tie_break() {
        let p = barrel();
        let v = ParamView::Barrel(&p);
        // boundary positions always resolve to the upper ring
        assert_eq!(v.tower_of(0.3), Some(3));
        assert_eq!(v.tower_of(0.0), Some(0));
        assert_eq!(v.tower_of(0.399_999_9), Some(3));
        assert_eq!(v.tower_of(1.0), None);
        assert_eq!(v.tower_of(-0.01), None);
        // determinism under repetition
        for _ in 0..100 {
            assert_eq!(v.tower_of(0.3), Some(3));
        }
    }

    #[test]
    fn test_invalid_configs() {
        let no_towers = BarrelConfig {
            inner_radius: 100.0,
            tower_widths: vec![],
            phi_segments: vec![],
        };
        assert!(BarrelParam::new(&no_towers, 1.0).is_err());

        let mismatched = BarrelConfig {
            inner_radius: 100.0,
            tower_widths: vec![0.1, 0.1],
            phi_segments: vec![20],
        };
        assert!(BarrelParam::new(&mismatched, 1.0).is_err());

        let bad_pitch = BarrelConfig::uniform(100.0, 4, 0.1, 20);
        assert!(BarrelParam::new(&bad_pitch, 0.0).is_err());

        let past_axis = BarrelConfig::uniform(100.0, 20, 0.1, 20);
        assert!(BarrelParam::new(&past_axis, 1.0).is_err());

        let flat = EndcapConfig::uniform(250.0, 0.0, 4, 0.1, 16);
        assert!(EndcapParam::new(&flat, 1.0).is_err());
    }
}
