//! Self-consistent resonator modes.
//!
//! A resonator supports a mode when its round-trip transform has a fixed
//! point `q* = i·z_R` with `z_R > 0`: a beam whose waist sits exactly at the
//! reference plane and reproduces itself after one round trip.
//!
//! Writing out the residual for `q = i·w`,
//!
//! $$
//! \frac{A\,iw + B}{C\,iw + D} - iw = \frac{B + C w^2 + i w (A - D)}{D + i C w},
//! $$
//!
//! the fixed point needs `B + C·w² = 0` and `A = D`. The solver runs Newton
//! on the real part of the numerator, then accepts the root only if the full
//! complex residual `|q' - q|` is numerically zero there. A reference plane
//! that is not a symmetry plane of the round trip (`A ≠ D`) therefore has
//! no purely imaginary fixed point and is reported as divergent.
//!
//! The returned scalar is the Rayleigh range of the mode, used directly as
//! `Im(q)`. Convert with [`crate::beam::waist_radius`] for a spot size.

use log::debug;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::beam::transform_q;
use crate::error::{OpticsError, OpticsResult};
use crate::matrix::ElementMatrix;

/// `(A + D)/2` of a round-trip matrix.
pub fn stability_parameter(round_trip: &ElementMatrix) -> f64 {
    round_trip.half_trace()
}

/// Cheap stability pre-test: `-1 ≤ (A + D)/2 ≤ 1`.
pub fn is_stable(round_trip: &ElementMatrix) -> bool {
    (-1.0..=1.0).contains(&stability_parameter(round_trip))
}

/// `|transform(M, i·z_R) − i·z_R|`.
pub fn eigenmode_residual(round_trip: &ElementMatrix, rayleigh_range: f64) -> OpticsResult<f64> {
    let q = Complex64::new(0.0, rayleigh_range);
    Ok((transform_q(round_trip, q)? - q).norm())
}

/// Newton solver for the round-trip fixed point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EigenmodeSolver {
    /// Starting value (m). Typical cavity scales are tens of micrometres.
    pub initial_guess: f64,
    /// Relative step size at which Newton stops.
    pub tolerance: f64,
    /// Maximum accepted `|q' − q| / z_R` at the root.
    pub residual_tolerance: f64,
    pub max_iterations: usize,
}

impl Default for EigenmodeSolver {
    fn default() -> Self {
        Self {
            initial_guess: 35e-6,
            tolerance: 1e-12,
            residual_tolerance: 1e-9,
            max_iterations: 200,
        }
    }
}

impl EigenmodeSolver {
    /// Solve for the Rayleigh range of the round-trip eigenmode.
    pub fn solve(&self, round_trip: &ElementMatrix) -> OpticsResult<f64> {
        if !(self.initial_guess > 0.0) {
            return Err(OpticsError::InvalidBeamParameter(format!(
                "eigenmode initial guess must be positive, got {}",
                self.initial_guess
            )));
        }
        let half_trace = stability_parameter(round_trip);
        if !(-1.0..=1.0).contains(&half_trace) {
            return Err(OpticsError::CavityDivergent(format!(
                "(A + D)/2 = {half_trace:.6} lies outside [-1, 1]"
            )));
        }

        let (b, c) = (round_trip.b(), round_trip.c());
        let mut w = self.initial_guess;
        let mut converged = false;
        for iteration in 0..self.max_iterations {
            let slope = 2.0 * c * w;
            if slope == 0.0 || !slope.is_finite() {
                break;
            }
            let step = (b + c * w * w) / slope;
            w -= step;
            if !w.is_finite() {
                break;
            }
            if step.abs() <= self.tolerance * w.abs() {
                debug!("eigenmode converged after {} iterations: z_R = {w:.6e}", iteration + 1);
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(OpticsError::CavityDivergent(format!(
                "no root after {} iterations (B = {b:.3e}, C = {c:.3e})",
                self.max_iterations
            )));
        }

        let w = w.abs();
        let residual = eigenmode_residual(round_trip, w)?;
        if residual > self.residual_tolerance * w {
            return Err(OpticsError::CavityDivergent(format!(
                "no purely imaginary fixed point: residual {residual:.3e} at z_R = {w:.6e} (A − D = {:.3e})",
                round_trip.a() - round_trip.d()
            )));
        }
        Ok(w)
    }
}

/// Solve with default settings. Returns the eigenmode's Rayleigh range.
pub fn solve_cavity_eigenmode(round_trip: &ElementMatrix) -> OpticsResult<f64> {
    EigenmodeSolver::default().solve(round_trip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{curved_mirror, free_space, Axis};
    use crate::system::composite_matrix;

    fn flat_curved(length: f64, radius: f64) -> ElementMatrix {
        composite_matrix(&[
            free_space(length),
            curved_mirror(radius, 0.0, Axis::Horizontal).unwrap(),
            free_space(length),
        ])
    }

    #[test]
    fn test_stability_window() {
        assert!(is_stable(&flat_curved(0.03, 0.05)));
        assert!(!is_stable(&flat_curved(0.075, 0.05)));
        assert!(is_stable(&ElementMatrix::identity()));
    }

    #[test]
    fn test_flat_curved_closed_form() {
        // z_R² = L (R − L) for a flat/curved resonator.
        let zr = solve_cavity_eigenmode(&flat_curved(0.03, 0.05)).unwrap();
        assert!((zr - (0.03_f64 * 0.02).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_unstable_is_divergent() {
        let err = solve_cavity_eigenmode(&flat_curved(0.12, 0.05)).unwrap_err();
        assert!(matches!(err, OpticsError::CavityDivergent(_)));
    }

    #[test]
    fn test_asymmetric_reference_plane_is_divergent() {
        // Stable, but starting mid-arm breaks A = D.
        let m = composite_matrix(&[
            free_space(0.01),
            curved_mirror(0.05, 0.0, Axis::Horizontal).unwrap(),
            free_space(0.03),
        ]);
        assert!(is_stable(&m));
        assert!(matches!(
            solve_cavity_eigenmode(&m),
            Err(OpticsError::CavityDivergent(_))
        ));
    }

    #[test]
    fn test_flat_flat_has_no_root() {
        // Marginal: C = 0, Newton has no slope to follow.
        let m = composite_matrix(&[free_space(0.05), free_space(0.05)]);
        assert!(is_stable(&m));
        assert!(solve_cavity_eigenmode(&m).is_err());
    }

    #[test]
    fn test_rejects_non_positive_guess() {
        let solver = EigenmodeSolver {
            initial_guess: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            solver.solve(&flat_curved(0.03, 0.05)),
            Err(OpticsError::InvalidBeamParameter(_))
        ));
    }
}
