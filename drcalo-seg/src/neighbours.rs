//! Neighbor resolution over the tower-local SiPM grids.
//!
//! Adjacency is 4-connected (no diagonals): an interior cell has exactly
//! four neighbors. Edge cells continue into the adjacent tower — around
//! the ring in phi (with wrap), into the next eta ring (whose grid may
//! have a different column count), and across the equator mirror between
//! the two detector halves at eta ring 0.
//!
//! Rings are not guaranteed to tile with equal cell counts. Cross-ring
//! adjacency is therefore resolved by exact interval overlap: each cell
//! spans a rational arc of the full circle (`[a/D, (a+1)/D)` with
//! `D = phi_segments * num_x`), and two edge cells are adjacent iff their
//! arcs overlap. The comparison is done in integer arithmetic, so a span
//! boundary shared exactly between two cells never flips under floating
//! point, and adjacency is symmetric by construction.

use std::collections::BTreeSet;

use crate::segmentation::{CellAddress, CellKind, RingInfo, Segmentation};
use crate::Result;
use drcalo_core::{CellId, Side};

/// Proportionally remaps a grid index onto a grid of a different size.
///
/// The source cell center is scaled into the destination grid and rounded
/// to the nearest index (ties away from zero, so a center sitting exactly
/// between two destination cells picks the upper one), then clamped into
/// range. Both counts must be positive. With equal counts this is the
/// identity.
///
/// Rounding is not an involution, so the neighbor resolver does not use
/// this mapping (it resolves cross-ring adjacency by interval overlap to
/// keep the relation symmetric); it is exposed for callers that need a
/// single representative index on a foreign grid.
pub fn remap_index(src: u32, src_count: u32, dst_count: u32) -> u32 {
    debug_assert!(src_count > 0 && dst_count > 0);
    let scaled =
        (f64::from(src) + 0.5) * f64::from(dst_count) / f64::from(src_count) - 0.5;
    let idx = scaled.round();
    idx.clamp(0.0, f64::from(dst_count - 1)) as u32
}

impl Segmentation {
    /// Set of cells adjacent to `id`.
    ///
    /// For a SiPM-level identifier this is the 4-neighborhood extended
    /// across tower boundaries; for a tower-level identifier it is the set
    /// of adjacent towers. The result never contains `id` itself and, as a
    /// set, carries no duplicates.
    ///
    /// # Errors
    ///
    /// Invalid-identifier or configuration errors as in
    /// [`Self::decode`](Segmentation::decode).
    pub fn neighbours(&self, id: CellId) -> Result<BTreeSet<CellId>> {
        let addr = self.decode(id)?;
        match addr.kind {
            CellKind::Sipm => self.sipm_neighbours(id, &addr),
            CellKind::Tower => self.tower_neighbours(&addr),
        }
    }

    fn sipm_neighbours(
        &self,
        id: CellId,
        addr: &CellAddress,
    ) -> Result<BTreeSet<CellId>> {
        let info = self.ring_info(addr.tower_eta)?;
        let (side, system, eta, phi) = (addr.side, addr.system, addr.tower_eta, addr.tower_phi);
        let mut out = BTreeSet::new();

        // 4-neighborhood within the tower
        if addr.x > 0 {
            out.insert(self.sipm_id(side, system, eta, phi, addr.x - 1, addr.y)?);
        }
        if addr.x + 1 < info.num_x {
            out.insert(self.sipm_id(side, system, eta, phi, addr.x + 1, addr.y)?);
        }
        if addr.y > 0 {
            out.insert(self.sipm_id(side, system, eta, phi, addr.x, addr.y - 1)?);
        }
        if addr.y + 1 < info.num_y {
            out.insert(self.sipm_id(side, system, eta, phi, addr.x, addr.y + 1)?);
        }

        // around the ring in phi; towers of one ring share their grid shape
        if addr.x == 0 {
            let p = (phi + info.n_phi - 1) % info.n_phi;
            let cand = self.sipm_id(side, system, eta, p, info.num_x - 1, addr.y)?;
            if cand != id {
                out.insert(cand);
            }
        }
        if addr.x + 1 == info.num_x {
            let p = (phi + 1) % info.n_phi;
            let cand = self.sipm_id(side, system, eta, p, 0, addr.y)?;
            if cand != id {
                out.insert(cand);
            }
        }

        // into the next eta ring (toward the beam axis)
        if addr.y + 1 == info.num_y && eta + 1 < self.tower_count()? {
            self.cross_ring(&mut out, side, system, &info, phi, addr.x, eta + 1, true)?;
        }

        // toward the equator: previous ring, or the mirror half at ring 0
        if addr.y == 0 {
            if eta > 0 {
                self.cross_ring(&mut out, side, system, &info, phi, addr.x, eta - 1, false)?;
            } else {
                out.insert(self.sipm_id(side.mirrored(), system, 0, phi, addr.x, 0)?);
            }
        }

        Ok(out)
    }

    /// Inserts every cell of ring `dst_eta` whose phi arc overlaps the
    /// source cell's arc, on the edge row facing the source ring.
    #[allow(clippy::too_many_arguments)]
    fn cross_ring(
        &self,
        out: &mut BTreeSet<CellId>,
        side: Side,
        system: u32,
        src: &RingInfo,
        phi: u32,
        x: u32,
        dst_eta: u32,
        upward: bool,
    ) -> Result<()> {
        let dst = self.ring_info(dst_eta)?;
        let d1 = u64::from(src.n_phi) * u64::from(src.num_x);
        let d2 = u64::from(dst.n_phi) * u64::from(dst.num_x);
        let a = u64::from(phi) * u64::from(src.num_x) + u64::from(x);

        // cells k of the destination ring with k/d2 .. (k+1)/d2 overlapping
        // a/d1 .. (a+1)/d1, in exact integer arithmetic
        let k_lo = a * d2 / d1;
        let k_hi = ((a + 1) * d2 - 1) / d1;
        let y = if upward { 0 } else { dst.num_y - 1 };
        for k in k_lo..=k_hi {
            let p = (k / u64::from(dst.num_x)) as u32;
            let xk = (k % u64::from(dst.num_x)) as u32;
            out.insert(self.sipm_id(side, system, dst_eta, p, xk, y)?);
        }
        Ok(())
    }

    fn tower_neighbours(
        &self,
        addr: &CellAddress,
    ) -> Result<BTreeSet<CellId>> {
        let info = self.ring_info(addr.tower_eta)?;
        let (side, system, eta, phi) = (addr.side, addr.system, addr.tower_eta, addr.tower_phi);
        let mut out = BTreeSet::new();

        if info.n_phi > 1 {
            out.insert(self.tower_id(side, system, eta, (phi + info.n_phi - 1) % info.n_phi)?);
            out.insert(self.tower_id(side, system, eta, (phi + 1) % info.n_phi)?);
        }
        if eta + 1 < self.tower_count()? {
            self.adjacent_towers(&mut out, side, system, info.n_phi, phi, eta + 1)?;
        }
        if eta > 0 {
            self.adjacent_towers(&mut out, side, system, info.n_phi, phi, eta - 1)?;
        } else {
            out.insert(self.tower_id(side.mirrored(), system, 0, phi)?);
        }

        Ok(out)
    }

    /// Inserts every tower of ring `dst_eta` whose phi arc overlaps the
    /// source tower's arc, by the same exact integer overlap as the SiPM
    /// path (so tower-level adjacency is symmetric too).
    fn adjacent_towers(
        &self,
        out: &mut BTreeSet<CellId>,
        side: Side,
        system: u32,
        src_n_phi: u32,
        phi: u32,
        dst_eta: u32,
    ) -> Result<()> {
        let dst = self.ring_info(dst_eta)?;
        let d1 = u64::from(src_n_phi);
        let d2 = u64::from(dst.n_phi);
        let a = u64::from(phi);

        let k_lo = a * d2 / d1;
        let k_hi = ((a + 1) * d2 - 1) / d1;
        for k in k_lo..=k_hi {
            out.insert(self.tower_id(side, system, dst_eta, k as u32)?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{BarrelConfig, EndcapConfig};
    use crate::segmentation::DEFAULT_ENCODING;

    fn seg() -> Segmentation {
        let mut seg = Segmentation::new(DEFAULT_ENCODING).unwrap();
        seg.set_grid_size(1.0);
        seg.set_sipm_size(0.5);
        seg.set_barrel(&BarrelConfig::uniform(100.0, 10, 0.1, 20))
            .unwrap();
        seg.set_endcap(&EndcapConfig::uniform(250.0, 1.0, 4, 0.1, 16))
            .unwrap();
        seg
    }

    #[test]
    fn test_remap_index() {
        // equal counts: identity
        for i in 0..8 {
            assert_eq!(remap_index(i, 8, 8), i);
        }
        // coarsening
        assert_eq!(remap_index(0, 4, 2), 0);
        assert_eq!(remap_index(1, 4, 2), 0);
        assert_eq!(remap_index(2, 4, 2), 1);
        assert_eq!(remap_index(3, 4, 2), 1);
        // refining: ties between destination cells round up
        assert_eq!(remap_index(0, 2, 4), 1);
        assert_eq!(remap_index(1, 2, 4), 3);
        // clamped into range
        assert_eq!(remap_index(9, 10, 3), 2);
    }

    #[test]
    fn test_interior_cell_has_exactly_four() {
        let seg = seg();
        let id = seg.sipm_id(Side::Right, 5, 3, 7, 2, 4).unwrap();
        let n = seg.neighbours(id).unwrap();
        assert_eq!(n.len(), 4);
        assert!(!n.contains(&id));
        for b in &n {
            assert!(seg.neighbours(*b).unwrap().contains(&id));
        }
    }

    #[test]
    fn test_phi_edge_wraps() {
        let seg = seg();
        let info = seg.ring_info(3).unwrap();
        // x = 0 of phi tower 0 is adjacent to the last column of tower 19
        let id = seg.sipm_id(Side::Right, 5, 3, 0, 0, 4).unwrap();
        let wrapped = seg
            .sipm_id(Side::Right, 5, 3, info.n_phi - 1, info.num_x - 1, 4)
            .unwrap();
        let n = seg.neighbours(id).unwrap();
        assert!(n.contains(&wrapped));
        assert!(seg.neighbours(wrapped).unwrap().contains(&id));
    }

    #[test]
    fn test_equator_mirror() {
        let seg = seg();
        let rhs = seg.sipm_id(Side::Right, 5, 0, 7, 2, 0).unwrap();
        let lhs = seg.sipm_id(Side::Left, 5, 0, 7, 2, 0).unwrap();
        assert!(seg.neighbours(rhs).unwrap().contains(&lhs));
        assert!(seg.neighbours(lhs).unwrap().contains(&rhs));
    }

    #[test]
    fn test_symmetry_across_barrel_endcap_boundary() {
        let seg = seg();
        let top = seg.ring_info(9).unwrap();
        let bottom = seg.ring_info(10).unwrap();
        // the two rings disagree in both phi segmentation and column count
        assert_ne!(
            (top.n_phi, top.num_x),
            (bottom.n_phi, bottom.num_x)
        );

        for phi in [0, 1, top.n_phi - 1] {
            for x in 0..top.num_x {
                let a = seg
                    .sipm_id(Side::Right, 5, 9, phi, x, top.num_y - 1)
                    .unwrap();
                let up: Vec<_> = seg
                    .neighbours(a)
                    .unwrap()
                    .into_iter()
                    .filter(|b| seg.num_eta(*b).unwrap() == 10)
                    .collect();
                assert!(!up.is_empty(), "edge cell with no cross-ring neighbour");
                for b in up {
                    assert!(
                        seg.neighbours(b).unwrap().contains(&a),
                        "asymmetric pair {a} / {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_corner_cell() {
        let seg = seg();
        // corner of a mid-barrel tower: two in-tower neighbors, one phi
        // wrap, one cross-ring set; never itself, never a duplicate
        let id = seg.sipm_id(Side::Right, 5, 3, 7, 0, 0).unwrap();
        let n = seg.neighbours(id).unwrap();
        assert!(!n.contains(&id));
        assert!(n.len() >= 4);
        for b in &n {
            assert!(seg.neighbours(*b).unwrap().contains(&id));
        }
    }

    #[test]
    fn test_outer_endcap_ring_has_no_upward_neighbour() {
        let seg = seg();
        let info = seg.ring_info(13).unwrap();
        let id = seg
            .sipm_id(Side::Right, 5, 13, 0, 0, info.num_y - 1)
            .unwrap();
        let n = seg.neighbours(id).unwrap();
        for b in n {
            assert!(seg.num_eta(b).unwrap() <= 13);
        }
    }

    #[test]
    fn test_neighbours_deterministic() {
        let seg = seg();
        let id = seg.sipm_id(Side::Right, 5, 9, 4, 0, 0).unwrap();
        let first = seg.neighbours(id).unwrap();
        for _ in 0..10 {
            assert_eq!(seg.neighbours(id).unwrap(), first);
        }
    }

    #[test]
    fn test_tower_level_neighbours() {
        let seg = seg();
        let tower = seg.tower_id(Side::Right, 5, 0, 0).unwrap();
        let n = seg.neighbours(tower).unwrap();
        let expected = [
            seg.tower_id(Side::Right, 5, 0, 1).unwrap(),
            seg.tower_id(Side::Right, 5, 0, 19).unwrap(),
            seg.tower_id(Side::Right, 5, 1, 0).unwrap(),
            seg.tower_id(Side::Left, 5, 0, 0).unwrap(),
        ];
        for id in expected {
            assert!(n.contains(&id));
        }
        assert_eq!(n.len(), 4);
        assert!(!n.contains(&tower));
    }

    #[test]
    fn test_tower_symmetry_across_barrel_endcap_boundary() {
        let seg = seg();
        let top = seg.ring_info(9).unwrap();
        let bottom = seg.ring_info(10).unwrap();
        assert_ne!(top.n_phi, bottom.n_phi);

        for eta in [9, 10] {
            let info = seg.ring_info(eta).unwrap();
            for phi in 0..info.n_phi {
                let a = seg.tower_id(Side::Right, 5, eta, phi).unwrap();
                for b in seg.neighbours(a).unwrap() {
                    assert!(
                        seg.neighbours(b).unwrap().contains(&a),
                        "asymmetric tower pair {a} / {b}"
                    );
                }
            }
        }

        // the 20-segment ring fans out onto two of the 16-segment towers
        // where the arcs straddle a boundary
        let a = seg.tower_id(Side::Right, 5, 9, 7).unwrap();
        let up: Vec<_> = seg
            .neighbours(a)
            .unwrap()
            .into_iter()
            .filter(|b| seg.num_eta(*b).unwrap() == 10)
            .collect();
        assert_eq!(up.len(), 2);
    }
}
