//! Gaussian beams and the complex beam parameter.
//!
//! A fundamental Gaussian beam at a reference plane is described by
//!
//! $$ q = z + i z_R $$
//!
//! where $z$ is the signed distance from the waist and $z_R$ the Rayleigh
//! range. Through an element with ray matrix $M$ it transforms as
//!
//! $$ q' = \frac{A q + B}{C q + D} . $$
//!
//! All lengths are in metres.

use std::f64::consts::PI;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{OpticsError, OpticsResult};
use crate::matrix::ElementMatrix;

/// The complex beam parameter `q = z + i·z_R`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeamParameter(Complex64);

impl BeamParameter {
    pub fn new(distance_from_waist: f64, rayleigh_range: f64) -> Self {
        Self(Complex64::new(distance_from_waist, rayleigh_range))
    }

    /// Beam with its waist exactly at the reference plane, `q = i·z_R`.
    pub fn at_waist(rayleigh_range: f64) -> Self {
        Self::new(0.0, rayleigh_range)
    }

    pub fn from_complex(q: Complex64) -> Self {
        Self(q)
    }

    pub fn as_complex(&self) -> Complex64 {
        self.0
    }

    /// Signed distance from the waist, `Re(q)`.
    pub fn distance_from_waist(&self) -> f64 {
        self.0.re
    }

    /// Rayleigh range, `Im(q)`.
    pub fn rayleigh_range(&self) -> f64 {
        self.0.im
    }

    /// Waist radius `w0 = sqrt(λ·z_R/π)`.
    pub fn waist_radius(&self, wavelength: f64) -> OpticsResult<f64> {
        waist_radius(*self, wavelength)
    }

    /// Beam radius at the reference plane.
    pub fn radius(&self, wavelength: f64) -> OpticsResult<f64> {
        self.radius_after(0.0, wavelength)
    }

    /// Beam radius after propagating `offset` metres of free space.
    pub fn radius_after(&self, offset: f64, wavelength: f64) -> OpticsResult<f64> {
        radius_at(offset + self.0.re, wavelength, self.0.im)
    }

    /// Propagate through one element.
    pub fn transform(&self, matrix: &ElementMatrix) -> OpticsResult<Self> {
        transform_q(matrix, self.0).map(Self)
    }
}

/// Construct a beam parameter from user-level inputs.
///
/// * `z` - distance from the waist.
/// * `zr` - Rayleigh range; `0` means "derive it from `waist`".
/// * `wavelength` - vacuum wavelength.
/// * `waist` - waist radius.
/// * `n` - refractive index of the medium.
///
/// Returns `Ok(None)` when `zr`, `wavelength` and `waist` are all zero: no
/// beam was specified. When `zr` is zero it is derived as `π·n·W²/λ`.
pub fn calc_q(
    z: f64,
    zr: f64,
    wavelength: f64,
    waist: f64,
    n: f64,
) -> OpticsResult<Option<BeamParameter>> {
    if zr == 0.0 && wavelength == 0.0 && waist == 0.0 {
        return Ok(None);
    }
    let zr = if zr == 0.0 {
        if !(wavelength > 0.0) || !(waist > 0.0) || !(n > 0.0) {
            return Err(OpticsError::InvalidBeamParameter(format!(
                "cannot derive Rayleigh range from wavelength={wavelength}, waist={waist}, n={n}"
            )));
        }
        PI * n * waist * waist / wavelength
    } else {
        zr
    };
    if !(zr > 0.0) || !zr.is_finite() {
        return Err(OpticsError::InvalidBeamParameter(format!(
            "Rayleigh range must be positive and finite, got {zr}"
        )));
    }
    Ok(Some(BeamParameter::new(z, zr)))
}

/// Apply `q' = (A·q + B)/(C·q + D)`.
///
/// A denominator of exactly zero magnitude would produce an infinite `q`,
/// which no physical beam has, and is reported as [`OpticsError::InvalidMatrix`].
pub fn transform_q(matrix: &ElementMatrix, q: Complex64) -> OpticsResult<Complex64> {
    let denominator = matrix.c() * q + matrix.d();
    if denominator.norm() == 0.0 {
        return Err(OpticsError::InvalidMatrix(format!(
            "C·q + D vanishes for C={}, D={}, q={}",
            matrix.c(),
            matrix.d(),
            q
        )));
    }
    Ok((matrix.a() * q + matrix.b()) / denominator)
}

/// Waist radius of the beam described by `q`.
pub fn waist_radius(q: BeamParameter, wavelength: f64) -> OpticsResult<f64> {
    radius_at(0.0, wavelength, q.rayleigh_range())
}

/// Beam radius at distance `z` from a waist with Rayleigh range `zr`:
///
/// $$ w(z) = \sqrt{\frac{\lambda z_R}{\pi}} \sqrt{1 + (z/z_R)^2} $$
pub fn radius_at(z: f64, wavelength: f64, zr: f64) -> OpticsResult<f64> {
    if !(zr > 0.0) {
        return Err(OpticsError::InvalidBeamParameter(format!(
            "Rayleigh range must be positive for a propagating beam, got {zr}"
        )));
    }
    if !(wavelength > 0.0) {
        return Err(OpticsError::InvalidBeamParameter(format!(
            "wavelength must be positive, got {wavelength}"
        )));
    }
    let ratio = z / zr;
    Ok((wavelength / PI * zr).sqrt() * (1.0 + ratio * ratio).sqrt())
}

/// Rayleigh range `π·w0²/λ` of a beam with waist radius `w0`.
pub fn rayleigh_range_from_waist(waist: f64, wavelength: f64) -> f64 {
    PI * waist * waist / wavelength
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{free_space, thin_lens, ElementMatrix};

    #[test]
    fn test_calc_q_undefined_without_inputs() {
        assert_eq!(calc_q(0.0, 0.0, 0.0, 0.0, 1.0).unwrap(), None);
    }

    #[test]
    fn test_calc_q_derives_rayleigh_range() {
        let q = calc_q(0.01, 0.0, 972e-9, 2e-3, 1.0).unwrap().unwrap();
        let expected = PI * 4e-6 / 972e-9;
        assert!((q.rayleigh_range() - expected).abs() / expected < 1e-14);
        assert_eq!(q.distance_from_waist(), 0.01);
    }

    #[test]
    fn test_calc_q_uses_given_rayleigh_range() {
        let q = calc_q(-0.2, 0.5, 972e-9, 2e-3, 1.0).unwrap().unwrap();
        assert_eq!(q, BeamParameter::new(-0.2, 0.5));
    }

    #[test]
    fn test_calc_q_index_scales_rayleigh_range() {
        let air = calc_q(0.0, 0.0, 1e-6, 1e-3, 1.0).unwrap().unwrap();
        let glass = calc_q(0.0, 0.0, 1e-6, 1e-3, 1.5).unwrap().unwrap();
        assert!((glass.rayleigh_range() / air.rayleigh_range() - 1.5).abs() < 1e-14);
    }

    #[test]
    fn test_calc_q_rejects_partial_inputs() {
        assert!(calc_q(0.0, 0.0, 0.0, 1e-3, 1.0).is_err());
        assert!(calc_q(0.0, -1.0, 1e-6, 1e-3, 1.0).is_err());
    }

    #[test]
    fn test_free_space_shifts_real_part() {
        let q = BeamParameter::new(0.0, 0.3);
        let moved = q.transform(&free_space(0.1)).unwrap();
        assert!((moved.distance_from_waist() - 0.1).abs() < 1e-15);
        assert!((moved.rayleigh_range() - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_transform_rejects_vanishing_denominator() {
        let singular = ElementMatrix::new(1.0, 0.0, 0.0, 0.0);
        let err = transform_q(&singular, Complex64::new(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, OpticsError::InvalidMatrix(_)));
    }

    #[test]
    fn test_lens_focuses_collimated_beam() {
        let q = BeamParameter::at_waist(1.0e3);
        let after = q.transform(&thin_lens(0.1).unwrap()).unwrap();
        // Waist sits roughly one focal length downstream.
        assert!((after.distance_from_waist() + 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_radius_at_waist_is_waist_radius() {
        let w0 = radius_at(0.0, 972e-9, 0.02).unwrap();
        assert_eq!(w0, (972e-9 / PI * 0.02).sqrt());
        let q = BeamParameter::at_waist(0.02);
        assert_eq!(q.waist_radius(972e-9).unwrap(), w0);
    }

    #[test]
    fn test_radius_grows_by_sqrt2_at_rayleigh_range() {
        let w0 = radius_at(0.0, 1e-6, 0.05).unwrap();
        let w = radius_at(0.05, 1e-6, 0.05).unwrap();
        assert!((w / w0 - 2f64.sqrt()).abs() < 1e-14);
    }

    #[test]
    fn test_radius_rejects_non_positive_rayleigh_range() {
        assert!(radius_at(0.0, 1e-6, 0.0).is_err());
        assert!(radius_at(0.0, 1e-6, -0.1).is_err());
    }

    #[test]
    fn test_rayleigh_range_round_trip() {
        let zr = 0.0123;
        let w0 = radius_at(0.0, 800e-9, zr).unwrap();
        let back = rayleigh_range_from_waist(w0, 800e-9);
        assert!((back - zr).abs() / zr < 1e-14);
    }
}
