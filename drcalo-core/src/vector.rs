//! Minimal 3-D vector type used by the geometric mapper.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Double-precision 3-D position or direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Vector3 {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Vector3 {
    /// Creates a new vector.
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the Euclidean norm.
    #[inline]
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns the cylindrical radius (distance from the z axis).
    #[inline]
    pub fn rho(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the azimuthal angle in `[0, 2*pi)`.
    #[inline]
    pub fn phi(&self) -> f64 {
        let p = self.y.atan2(self.x);
        if p < 0.0 {
            p + std::f64::consts::TAU
        } else {
            p
        }
    }

    /// Returns the elevation angle from the transverse plane, in
    /// `[-pi/2, pi/2]`.
    #[inline]
    pub fn theta(&self) -> f64 {
        self.z.atan2(self.rho())
    }

    /// Returns this vector scaled by a factor.
    #[inline]
    pub fn scaled(&self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    /// Returns this vector reflected through the transverse plane.
    #[inline]
    pub fn mirrored_z(&self) -> Self {
        Self::new(self.x, self.y, -self.z)
    }
}

impl std::ops::Add for Vector3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Vector3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_norm_and_rho() {
        let v = Vector3::new(3.0, 4.0, 12.0);
        assert_relative_eq!(v.rho(), 5.0);
        assert_relative_eq!(v.norm(), 13.0);
    }

    #[test]
    fn test_angles() {
        let v = Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(v.phi(), FRAC_PI_4);
        assert_relative_eq!(v.theta(), 0.0);

        let up = Vector3::new(1.0, 0.0, 1.0);
        assert_relative_eq!(up.theta(), FRAC_PI_4);

        // phi is reported in [0, 2*pi)
        let w = Vector3::new(0.0, -1.0, 0.0);
        assert_relative_eq!(w.phi(), 3.0 * FRAC_PI_2);
    }

    #[test]
    fn test_mirror() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let m = v.mirrored_z();
        assert_relative_eq!(m.z, -3.0);
        assert_relative_eq!(m.x, v.x);
    }

    #[test]
    fn test_add_sub() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(0.5, -2.0, 1.0);
        let s = a + b;
        assert_relative_eq!(s.x, 1.5);
        assert_relative_eq!(s.y, 0.0);
        let d = s - b;
        assert_relative_eq!(d.z, a.z);
    }
}
