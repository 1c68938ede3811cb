//! The dual-readout segmentation: identifier codec and geometric mapper.
//!
//! A [`Segmentation`] is built once per readout from an encoding string (or
//! an existing [`BitFieldCoder`]), configured with the grid and SiPM pitch
//! and the region parameterizations, then treated as read-only. Every query
//! after that is a pure function of the identifier (or position) and the
//! frozen configuration, so a configured instance can be shared across
//! reader threads.
//!
//! Identifier layout, grid centering, and tie-break conventions are frozen
//! contracts; see [`DEFAULT_ENCODING`] and the field docs below.

use crate::param::{BarrelConfig, BarrelParam, EndcapConfig, EndcapParam, ParamView};
use crate::{Error, Result};
use drcalo_core::{BitFieldCoder, CellId, FieldHandle, Region, Side, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default encoding string: the frozen wire format of the 64-bit cell
/// identifier.
///
/// Tower-addressing fields (system, side, eta, phi, module) occupy the low
/// 32 bits and SiPM-local fields (x, y, Cerenkov flag) the high 32 bits,
/// so the legacy 32-bit split view is a clean truncation. Bits 31 and
/// 53–63 are reserved and always zero.
pub const DEFAULT_ENCODING: &str = "system:8,side:1,eta:10,phi:10,module:2,x:32:10,y:42:10,c:52:1";

/// Fixed name of the system field (not renameable).
const FIELD_SYSTEM: &str = "system";

/// Module tag marking a tower-level identifier.
const MODULE_TOWER: u64 = 0;
/// Module tag marking a SiPM-level identifier.
const MODULE_SIPM: u64 = 1;

/// Whether an identifier addresses a whole tower or one SiPM within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellKind {
    /// Tower-level identifier (also used as a volume id).
    Tower,
    /// SiPM-level identifier.
    Sipm,
}

impl CellKind {
    fn from_tag(tag: u64) -> Result<Self> {
        match tag {
            MODULE_TOWER => Ok(CellKind::Tower),
            MODULE_SIPM => Ok(CellKind::Sipm),
            other => Err(Error::InvalidModuleTag(other)),
        }
    }

    fn tag(self) -> u64 {
        match self {
            CellKind::Tower => MODULE_TOWER,
            CellKind::Sipm => MODULE_SIPM,
        }
    }
}

/// Decoded view of a cell identifier.
///
/// Encoding and decoding are mutual inverses over the valid domain; a
/// tower-level address carries `x = y = 0` and no Cerenkov flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellAddress {
    /// Detector half.
    pub side: Side,
    /// Region resolved from the eta index.
    pub region: Region,
    /// Detector system tag.
    pub system: u32,
    /// Tower eta index, global across barrel then endcap.
    pub tower_eta: u32,
    /// Tower phi index within the eta ring.
    pub tower_phi: u32,
    /// SiPM column within the tower (phi direction).
    pub x: u32,
    /// SiPM row within the tower (eta direction).
    pub y: u32,
    /// Cerenkov (true) or scintillation (false) channel.
    pub is_cerenkov: bool,
    /// Tower-level or SiPM-level address.
    pub kind: CellKind,
}

/// Configurable field names resolved against the coder.
#[derive(Debug, Clone)]
struct FieldNames {
    assembly: String,
    num_eta: String,
    num_phi: String,
    x: String,
    y: String,
    is_cerenkov: String,
    module: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            assembly: "side".to_owned(),
            num_eta: "eta".to_owned(),
            num_phi: "phi".to_owned(),
            x: "x".to_owned(),
            y: "y".to_owned(),
            is_cerenkov: "c".to_owned(),
            module: "module".to_owned(),
        }
    }
}

/// Field handles resolved once at configuration time.
#[derive(Debug, Clone, Copy)]
struct Handles {
    system: FieldHandle,
    assembly: FieldHandle,
    num_eta: FieldHandle,
    num_phi: FieldHandle,
    x: FieldHandle,
    y: FieldHandle,
    is_cerenkov: FieldHandle,
    module: FieldHandle,
}

/// Per-ring counts consulted by the mapper and neighbor resolver.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RingInfo {
    pub(crate) n_phi: u32,
    pub(crate) num_x: u32,
    pub(crate) num_y: u32,
}

/// Dual-readout calorimeter segmentation instance.
#[derive(Debug)]
pub struct Segmentation {
    coder: BitFieldCoder,
    names: FieldNames,
    handles: Option<Handles>,
    grid_size: Option<f64>,
    sipm_size: Option<f64>,
    barrel: Option<BarrelParam>,
    endcap: Option<EndcapParam>,
}

impl Segmentation {
    /// Creates a segmentation from an encoding string.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoding string does not parse.
    pub fn new(encoding: &str) -> Result<Self> {
        Ok(Self::with_coder(BitFieldCoder::parse(encoding)?))
    }

    /// Creates a segmentation from an existing coder.
    ///
    /// If the coder's field names differ from the defaults, rename them
    /// with the `set_field_name_*` setters before the first query.
    pub fn with_coder(coder: BitFieldCoder) -> Self {
        let mut seg = Self {
            coder,
            names: FieldNames::default(),
            handles: None,
            grid_size: None,
            sipm_size: None,
            barrel: None,
            endcap: None,
        };
        seg.refresh_handles();
        seg
    }

    /// The coder this segmentation reads and writes identifiers through.
    pub fn coder(&self) -> &BitFieldCoder {
        &self.coder
    }

    // --- configuration ---------------------------------------------------

    /// Sets the SiPM grid pitch (center-to-center spacing).
    pub fn set_grid_size(&mut self, grid: f64) {
        self.grid_size = Some(grid);
    }

    /// Sets the SiPM active size. Must not exceed the grid pitch.
    ///
    /// The active size does not enter the geometric mapping (cell centers
    /// and counts follow the grid pitch alone); it is validated against
    /// the pitch and exposed through [`Self::sipm_size`] for consumers
    /// that need the sensitive-area extent.
    pub fn set_sipm_size(&mut self, sipm: f64) {
        self.sipm_size = Some(sipm);
    }

    /// Configured grid pitch, if set.
    pub fn grid_size(&self) -> Option<f64> {
        self.grid_size
    }

    /// Configured SiPM size, if set.
    pub fn sipm_size(&self) -> Option<f64> {
        self.sipm_size
    }

    /// Compiles the barrel parameterization. Requires the grid pitch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConfigured`] before `set_grid_size`, or
    /// [`Error::InvalidParameters`] for a bad config.
    pub fn set_barrel(&mut self, config: &BarrelConfig) -> Result<()> {
        let grid = self.grid_size.ok_or(Error::NotConfigured("grid size"))?;
        self.barrel = Some(BarrelParam::new(config, grid)?);
        Ok(())
    }

    /// Compiles the endcap parameterization. Requires the grid pitch and a
    /// barrel (eta indices continue from the barrel).
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConfigured`] before `set_grid_size` or
    /// `set_barrel`, or [`Error::InvalidParameters`] for a bad config.
    pub fn set_endcap(&mut self, config: &EndcapConfig) -> Result<()> {
        let grid = self.grid_size.ok_or(Error::NotConfigured("grid size"))?;
        if self.barrel.is_none() {
            return Err(Error::NotConfigured("barrel parameters"));
        }
        self.endcap = Some(EndcapParam::new(config, grid)?);
        Ok(())
    }

    /// Barrel parameterization, if configured.
    pub fn barrel_param(&self) -> Option<&BarrelParam> {
        self.barrel.as_ref()
    }

    /// Endcap parameterization, if configured.
    pub fn endcap_param(&self) -> Option<&EndcapParam> {
        self.endcap.as_ref()
    }

    // --- field names -----------------------------------------------------

    /// Name of the side/assembly field.
    pub fn field_name_assembly(&self) -> &str {
        &self.names.assembly
    }

    /// Name of the tower eta field.
    pub fn field_name_num_eta(&self) -> &str {
        &self.names.num_eta
    }

    /// Name of the tower phi field.
    pub fn field_name_num_phi(&self) -> &str {
        &self.names.num_phi
    }

    /// Name of the SiPM column field.
    pub fn field_name_x(&self) -> &str {
        &self.names.x
    }

    /// Name of the SiPM row field.
    pub fn field_name_y(&self) -> &str {
        &self.names.y
    }

    /// Name of the Cerenkov flag field.
    pub fn field_name_is_cerenkov(&self) -> &str {
        &self.names.is_cerenkov
    }

    /// Name of the module tag field.
    pub fn field_name_module(&self) -> &str {
        &self.names.module
    }

    /// Renames the side/assembly field.
    ///
    /// # Errors
    ///
    /// Returns an error if the coder has no field of that name.
    pub fn set_field_name_assembly(&mut self, name: &str) -> Result<()> {
        self.coder.handle(name)?;
        self.names.assembly = name.to_owned();
        self.refresh_handles();
        Ok(())
    }

    /// Renames the tower eta field. Errors as `set_field_name_assembly`.
    pub fn set_field_name_num_eta(&mut self, name: &str) -> Result<()> {
        self.coder.handle(name)?;
        self.names.num_eta = name.to_owned();
        self.refresh_handles();
        Ok(())
    }

    /// Renames the tower phi field. Errors as `set_field_name_assembly`.
    pub fn set_field_name_num_phi(&mut self, name: &str) -> Result<()> {
        self.coder.handle(name)?;
        self.names.num_phi = name.to_owned();
        self.refresh_handles();
        Ok(())
    }

    /// Renames the SiPM column field. Errors as `set_field_name_assembly`.
    pub fn set_field_name_x(&mut self, name: &str) -> Result<()> {
        self.coder.handle(name)?;
        self.names.x = name.to_owned();
        self.refresh_handles();
        Ok(())
    }

    /// Renames the SiPM row field. Errors as `set_field_name_assembly`.
    pub fn set_field_name_y(&mut self, name: &str) -> Result<()> {
        self.coder.handle(name)?;
        self.names.y = name.to_owned();
        self.refresh_handles();
        Ok(())
    }

    /// Renames the Cerenkov flag field. Errors as `set_field_name_assembly`.
    pub fn set_field_name_is_cerenkov(&mut self, name: &str) -> Result<()> {
        self.coder.handle(name)?;
        self.names.is_cerenkov = name.to_owned();
        self.refresh_handles();
        Ok(())
    }

    /// Renames the module tag field. Errors as `set_field_name_assembly`.
    pub fn set_field_name_module(&mut self, name: &str) -> Result<()> {
        self.coder.handle(name)?;
        self.names.module = name.to_owned();
        self.refresh_handles();
        Ok(())
    }

    // --- codec -----------------------------------------------------------

    /// Decodes an identifier into its address tuple.
    ///
    /// Tower-level addresses come back with zeroed SiPM fields regardless
    /// of the stored bits. SiPM indices are validated against the resolved
    /// ring; out-of-range values are an error, never clamped.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTowerIndex`], [`Error::InvalidPhiIndex`],
    /// [`Error::InvalidCellIndex`], [`Error::InvalidModuleTag`], or a
    /// configuration error.
    pub fn decode(&self, id: CellId) -> Result<CellAddress> {
        let h = self.handles()?;
        let w = id.as_u64();
        let system = h.system.get(w) as u32;
        let side = Side::from_bit(h.assembly.get(w));
        let tower_eta = h.num_eta.get(w) as u32;
        let tower_phi = h.num_phi.get(w) as u32;
        let kind = CellKind::from_tag(h.module.get(w))?;

        let (view, ring) = self.locate(tower_eta)?;
        let n_phi = view.phi_segments(ring);
        if tower_phi >= n_phi {
            return Err(Error::InvalidPhiIndex {
                phi: tower_phi,
                max: n_phi,
            });
        }

        let (x, y, is_cerenkov) = match kind {
            CellKind::Tower => (0, 0, false),
            CellKind::Sipm => {
                let x = h.x.get(w) as u32;
                let y = h.y.get(w) as u32;
                let num_x = view.num_x(ring);
                let num_y = view.num_y(ring);
                if x >= num_x || y >= num_y {
                    return Err(Error::InvalidCellIndex { x, y, num_x, num_y });
                }
                (x, y, h.is_cerenkov.get(w) != 0)
            }
        };

        Ok(CellAddress {
            side,
            region: view.region(),
            system,
            tower_eta,
            tower_phi,
            x,
            y,
            is_cerenkov,
            kind,
        })
    }

    /// Encodes an address tuple into an identifier.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::decode`], plus
    /// [`Error::RegionMismatch`] if the address's region does not match
    /// its eta index and a field-overflow error if an index exceeds its
    /// bit width.
    pub fn encode(&self, addr: &CellAddress) -> Result<CellId> {
        let h = self.handles()?;
        let (view, ring) = self.locate(addr.tower_eta)?;
        if addr.region != view.region() {
            return Err(Error::RegionMismatch {
                given: addr.region,
                eta: addr.tower_eta,
            });
        }
        let n_phi = view.phi_segments(ring);
        if addr.tower_phi >= n_phi {
            return Err(Error::InvalidPhiIndex {
                phi: addr.tower_phi,
                max: n_phi,
            });
        }
        let (x, y, c) = match addr.kind {
            CellKind::Tower => (0, 0, false),
            CellKind::Sipm => {
                let num_x = view.num_x(ring);
                let num_y = view.num_y(ring);
                if addr.x >= num_x || addr.y >= num_y {
                    return Err(Error::InvalidCellIndex {
                        x: addr.x,
                        y: addr.y,
                        num_x,
                        num_y,
                    });
                }
                (addr.x, addr.y, addr.is_cerenkov)
            }
        };

        let mut word = 0u64;
        word = put(word, h.system, FIELD_SYSTEM, u64::from(addr.system))?;
        word = put(word, h.assembly, &self.names.assembly, addr.side.bit())?;
        word = put(word, h.num_eta, &self.names.num_eta, u64::from(addr.tower_eta))?;
        word = put(word, h.num_phi, &self.names.num_phi, u64::from(addr.tower_phi))?;
        word = put(word, h.module, &self.names.module, addr.kind.tag())?;
        word = put(word, h.x, &self.names.x, u64::from(x))?;
        word = put(word, h.y, &self.names.y, u64::from(y))?;
        word = put(word, h.is_cerenkov, &self.names.is_cerenkov, u64::from(c))?;
        Ok(CellId::new(word))
    }

    /// Builds a tower-level identifier (usable as a volume id).
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::encode`].
    pub fn tower_id(&self, side: Side, system: u32, eta: u32, phi: u32) -> Result<CellId> {
        let (view, _) = self.locate(eta)?;
        self.encode(&CellAddress {
            side,
            region: view.region(),
            system,
            tower_eta: eta,
            tower_phi: phi,
            x: 0,
            y: 0,
            is_cerenkov: false,
            kind: CellKind::Tower,
        })
    }

    /// Builds a SiPM-level identifier. The Cerenkov flag follows the
    /// checkerboard fiber pattern at `(x, y)`.
    ///
    /// # Errors
    ///
    /// Same taxonomy as [`Self::encode`].
    pub fn sipm_id(
        &self,
        side: Side,
        system: u32,
        eta: u32,
        phi: u32,
        x: u32,
        y: u32,
    ) -> Result<CellId> {
        let (view, _) = self.locate(eta)?;
        self.encode(&CellAddress {
            side,
            region: view.region(),
            system,
            tower_eta: eta,
            tower_phi: phi,
            x,
            y,
            is_cerenkov: self.is_cerenkov_at(x, y),
            kind: CellKind::Sipm,
        })
    }

    // --- field accessors -------------------------------------------------

    /// Tower eta index of an identifier (raw field read).
    pub fn num_eta(&self, id: CellId) -> Result<u32> {
        Ok(self.handles()?.num_eta.get(id.as_u64()) as u32)
    }

    /// Tower phi index of an identifier (raw field read).
    pub fn num_phi(&self, id: CellId) -> Result<u32> {
        Ok(self.handles()?.num_phi.get(id.as_u64()) as u32)
    }

    /// SiPM column of an identifier (raw field read).
    pub fn x(&self, id: CellId) -> Result<u32> {
        Ok(self.handles()?.x.get(id.as_u64()) as u32)
    }

    /// SiPM row of an identifier (raw field read).
    pub fn y(&self, id: CellId) -> Result<u32> {
        Ok(self.handles()?.y.get(id.as_u64()) as u32)
    }

    /// System tag of an identifier (raw field read).
    pub fn system(&self, id: CellId) -> Result<u32> {
        Ok(self.handles()?.system.get(id.as_u64()) as u32)
    }

    /// SiPM columns of the identifier's tower, validated against the
    /// resolved region.
    pub fn num_x(&self, id: CellId) -> Result<u32> {
        let (view, ring) = self.locate(self.num_eta(id)?)?;
        Ok(view.num_x(ring))
    }

    /// SiPM rows of the identifier's tower, validated against the
    /// resolved region.
    pub fn num_y(&self, id: CellId) -> Result<u32> {
        let (view, ring) = self.locate(self.num_eta(id)?)?;
        Ok(view.num_y(ring))
    }

    /// Cerenkov flag of an identifier.
    pub fn is_cerenkov(&self, id: CellId) -> Result<bool> {
        Ok(self.handles()?.is_cerenkov.get(id.as_u64()) != 0)
    }

    /// Checkerboard fiber pattern: Cerenkov where column + row is odd,
    /// scintillation at (0, 0).
    pub fn is_cerenkov_at(&self, col: u32, row: u32) -> bool {
        (col + row) % 2 == 1
    }

    /// True for a tower-level identifier.
    pub fn is_tower(&self, id: CellId) -> Result<bool> {
        Ok(self.handles()?.module.get(id.as_u64()) == MODULE_TOWER)
    }

    /// True for a SiPM-level identifier.
    pub fn is_sipm(&self, id: CellId) -> Result<bool> {
        Ok(self.handles()?.module.get(id.as_u64()) == MODULE_SIPM)
    }

    /// True for a right-hand-side identifier.
    pub fn is_rhs(&self, id: CellId) -> Result<bool> {
        Ok(self.handles()?.assembly.get(id.as_u64()) == 0)
    }

    // --- geometric mapper ------------------------------------------------

    /// Global position of a cell.
    ///
    /// Tower-level identifiers map to the tower front-face center; SiPM
    /// identifiers add the in-tower grid offset. The left-hand side is the
    /// mirror image through the transverse plane.
    ///
    /// # Errors
    ///
    /// Invalid-identifier or configuration errors as in [`Self::decode`].
    pub fn position(&self, id: CellId) -> Result<Vector3> {
        let addr = self.decode(id)?;
        let (view, ring) = self.locate(addr.tower_eta)?;
        let (theta_c, _) = view.tower_center(ring);
        let n_phi = view.phi_segments(ring);
        let phi_c = (f64::from(addr.tower_phi) + 0.5) * std::f64::consts::TAU / f64::from(n_phi);
        let d = view.anchor_distance(theta_c);
        let center = radial_dir(theta_c, phi_c).scaled(d);

        let pos = match addr.kind {
            CellKind::Tower => center,
            CellKind::Sipm => {
                let local =
                    self.local_position_at(view.num_x(ring), view.num_y(ring), addr.x, addr.y)?;
                center
                    + phi_tangent(phi_c).scaled(local.x)
                    + theta_tangent(theta_c, phi_c).scaled(local.y)
            }
        };

        Ok(match addr.side {
            Side::Right => pos,
            Side::Left => pos.mirrored_z(),
        })
    }

    /// In-tower position of a cell (z = 0 plane of the tower frame).
    ///
    /// Tower-level identifiers map to the local origin.
    ///
    /// # Errors
    ///
    /// Invalid-identifier or configuration errors as in [`Self::decode`].
    pub fn local_position(&self, id: CellId) -> Result<Vector3> {
        let addr = self.decode(id)?;
        match addr.kind {
            CellKind::Tower => Ok(Vector3::default()),
            CellKind::Sipm => {
                let (view, ring) = self.locate(addr.tower_eta)?;
                self.local_position_at(view.num_x(ring), view.num_y(ring), addr.x, addr.y)
            }
        }
    }

    /// In-tower position of grid index `(x, y)` in a `num_x` by `num_y`
    /// grid, bypassing decode.
    ///
    /// Centering is symmetric: index `i` of `n` sits at
    /// `(i - (n - 1) / 2) * grid`, so the middle cell of an odd count is
    /// on the tower center and cells `0` and `n - 1` always mirror each
    /// other.
    ///
    /// # Errors
    ///
    /// [`Error::NotConfigured`] before the pitches are set.
    pub fn local_position_at(&self, num_x: u32, num_y: u32, x: u32, y: u32) -> Result<Vector3> {
        let (grid, _) = self.sizes()?;
        let u = (f64::from(x) - (f64::from(num_x) - 1.0) / 2.0) * grid;
        let v = (f64::from(y) - (f64::from(num_y) - 1.0) / 2.0) * grid;
        Ok(Vector3::new(u, v, 0.0))
    }

    /// Identifier of the SiPM containing a point, given the tower volume
    /// the point lies in.
    ///
    /// The in-tower offset is divided by the grid pitch and rounded to the
    /// nearest index, clamped to the tower grid: a point inside the tower
    /// volume always maps to some cell of that tower (best-effort within
    /// the known tower). This is the exact left-inverse of
    /// [`Self::position`] on cell centers. The global position is not
    /// consulted; the tower frame comes from the volume id.
    ///
    /// # Errors
    ///
    /// Invalid-identifier or configuration errors as in [`Self::decode`].
    pub fn cell_id(
        &self,
        local_position: &Vector3,
        _global_position: &Vector3,
        volume_id: CellId,
    ) -> Result<CellId> {
        let vol = self.decode(volume_id)?;
        let (view, ring) = self.locate(vol.tower_eta)?;
        let num_x = view.num_x(ring);
        let num_y = view.num_y(ring);
        let (grid, _) = self.sizes()?;

        let x = nearest_index(local_position.x / grid, num_x);
        let y = nearest_index(local_position.y / grid, num_y);
        self.sipm_id(vol.side, vol.system, vol.tower_eta, vol.tower_phi, x, y)
    }

    /// Region and global eta index of the tower covering an elevation
    /// angle, under the `[lo, hi)` boundary tie-break.
    ///
    /// # Errors
    ///
    /// [`Error::OutsideAcceptance`] if no configured tower covers the
    /// angle, [`Error::NotConfigured`] before `set_barrel`.
    pub fn tower_of_theta(&self, theta: f64) -> Result<(Region, u32)> {
        let barrel = self
            .barrel
            .as_ref()
            .ok_or(Error::NotConfigured("barrel parameters"))?;
        let bview = ParamView::Barrel(barrel);
        if let Some(ring) = bview.tower_of(theta) {
            return Ok((Region::Barrel, ring as u32));
        }
        if let Some(endcap) = self.endcap.as_ref() {
            let eview = ParamView::Endcap(endcap);
            if let Some(ring) = eview.tower_of(theta) {
                return Ok((Region::Endcap, bview.tower_count() as u32 + ring as u32));
            }
        }
        Err(Error::OutsideAcceptance { theta })
    }

    // --- internals -------------------------------------------------------

    fn refresh_handles(&mut self) {
        self.handles = self.build_handles().ok();
    }

    fn build_handles(&self) -> drcalo_core::Result<Handles> {
        Ok(Handles {
            system: self.coder.handle(FIELD_SYSTEM)?,
            assembly: self.coder.handle(&self.names.assembly)?,
            num_eta: self.coder.handle(&self.names.num_eta)?,
            num_phi: self.coder.handle(&self.names.num_phi)?,
            x: self.coder.handle(&self.names.x)?,
            y: self.coder.handle(&self.names.y)?,
            is_cerenkov: self.coder.handle(&self.names.is_cerenkov)?,
            module: self.coder.handle(&self.names.module)?,
        })
    }

    fn handles(&self) -> Result<&Handles> {
        if let Some(h) = &self.handles {
            return Ok(h);
        }
        // reproduce the resolution failure for a precise first-use report
        match self.build_handles() {
            Err(e) => Err(e.into()),
            Ok(_) => Err(Error::NotConfigured("field names")),
        }
    }

    fn sizes(&self) -> Result<(f64, f64)> {
        let grid = self.grid_size.ok_or(Error::NotConfigured("grid size"))?;
        let sipm = self.sipm_size.ok_or(Error::NotConfigured("sipm size"))?;
        if grid <= 0.0 || sipm <= 0.0 {
            return Err(Error::InvalidParameters(format!(
                "pitches must be positive (grid {grid}, sipm {sipm})"
            )));
        }
        if sipm > grid {
            return Err(Error::InvalidParameters(format!(
                "sipm size {sipm} exceeds grid pitch {grid}"
            )));
        }
        Ok((grid, sipm))
    }

    /// Resolves a global eta index to its region view and local ring.
    pub(crate) fn locate(&self, eta: u32) -> Result<(ParamView<'_>, usize)> {
        let barrel = self
            .barrel
            .as_ref()
            .ok_or(Error::NotConfigured("barrel parameters"))?;
        let nb = ParamView::Barrel(barrel).tower_count() as u32;
        if eta < nb {
            return Ok((ParamView::Barrel(barrel), eta as usize));
        }
        if let Some(endcap) = self.endcap.as_ref() {
            let ne = ParamView::Endcap(endcap).tower_count() as u32;
            if eta < nb + ne {
                return Ok((ParamView::Endcap(endcap), (eta - nb) as usize));
            }
            return Err(Error::InvalidTowerIndex {
                eta,
                max: nb + ne,
            });
        }
        Err(Error::InvalidTowerIndex { eta, max: nb })
    }

    /// Total configured towers per side.
    pub(crate) fn tower_count(&self) -> Result<u32> {
        let barrel = self
            .barrel
            .as_ref()
            .ok_or(Error::NotConfigured("barrel parameters"))?;
        let nb = ParamView::Barrel(barrel).tower_count() as u32;
        let ne = self
            .endcap
            .as_ref()
            .map_or(0, |e| ParamView::Endcap(e).tower_count() as u32);
        Ok(nb + ne)
    }

    /// Ring counts for a global eta index.
    pub(crate) fn ring_info(&self, eta: u32) -> Result<RingInfo> {
        let (view, ring) = self.locate(eta)?;
        Ok(RingInfo {
            n_phi: view.phi_segments(ring),
            num_x: view.num_x(ring),
            num_y: view.num_y(ring),
        })
    }
}

fn put(word: u64, handle: FieldHandle, name: &str, value: u64) -> Result<u64> {
    if value > handle.max_value() {
        return Err(drcalo_core::Error::FieldOverflow {
            field: name.to_owned(),
            value,
            width: handle.width(),
        }
        .into());
    }
    Ok(handle.put(word, value))
}

/// Nearest grid index to a pitch-normalized offset, clamped into the grid.
fn nearest_index(offset_in_cells: f64, count: u32) -> u32 {
    let idx = (offset_in_cells + (f64::from(count) - 1.0) / 2.0).round();
    let max = f64::from(count - 1);
    idx.clamp(0.0, max) as u32
}

/// Unit direction at elevation `theta`, azimuth `phi`.
fn radial_dir(theta: f64, phi: f64) -> Vector3 {
    Vector3::new(
        theta.cos() * phi.cos(),
        theta.cos() * phi.sin(),
        theta.sin(),
    )
}

/// Unit tangent in the phi direction.
fn phi_tangent(phi: f64) -> Vector3 {
    Vector3::new(-phi.sin(), phi.cos(), 0.0)
}

/// Unit tangent in the increasing-elevation direction.
fn theta_tangent(theta: f64, phi: f64) -> Vector3 {
    Vector3::new(
        -theta.sin() * phi.cos(),
        -theta.sin() * phi.sin(),
        theta.cos(),
    )
}
