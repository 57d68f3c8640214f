//! Optical resonators: geometry builders and eigenmode solving.
//!
//! All resonator geometries implement the [`Resonator`] trait, which turns
//! physical parameters into one ordered system per transverse axis. The
//! round-trip composite of each system is handed to the
//! [`EigenmodeSolver`](solver::EigenmodeSolver) for the self-consistent mode.
//!
//! - [`builder`] — ring (bow-tie) and linear cavity layouts.
//! - [`solver`] — stability test and round-trip fixed-point solve.

pub mod builder;
pub mod solver;

pub use builder::{build_linear_cavity, build_ring_cavity, LinearCavityGeometry, RingCavityGeometry};
pub use solver::{is_stable, solve_cavity_eigenmode, stability_parameter, EigenmodeSolver};

use serde::{Deserialize, Serialize};

use crate::beam::{waist_radius, BeamParameter};
use crate::error::{OpticsError, OpticsResult};
use crate::matrix::Axis;
use crate::system::OrderedSystem;
use crate::trace::{BeamTrace, BeamTracer, TraceConfig};

/// One ordered system per transverse axis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisSystems {
    pub horizontal: OrderedSystem,
    pub vertical: OrderedSystem,
}

impl AxisSystems {
    pub fn get(&self, axis: Axis) -> &OrderedSystem {
        match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        }
    }
}

/// Rayleigh ranges (m) of a resonator's eigenmode at its reference plane.
///
/// The mode there is `q = i·z_R` on each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CavityMode {
    pub horizontal: f64,
    pub vertical: f64,
}

impl CavityMode {
    pub fn rayleigh_range(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.horizontal,
            Axis::Vertical => self.vertical,
        }
    }

    /// Beam parameter of the mode at the reference plane.
    pub fn q(&self, axis: Axis) -> BeamParameter {
        BeamParameter::at_waist(self.rayleigh_range(axis))
    }

    /// Waist radius (m) on `axis` at `wavelength`.
    pub fn waist_radius(&self, axis: Axis, wavelength: f64) -> OpticsResult<f64> {
        waist_radius(self.q(axis), wavelength)
    }
}

/// A resonator's mode traced once around the cavity on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeTrace {
    pub mode: CavityMode,
    pub horizontal: BeamTrace,
    pub vertical: BeamTrace,
}

/// A resonator geometry that can lay itself out as ordered systems.
pub trait Resonator {
    /// Build the horizontal and vertical round-trip systems.
    fn build(&self) -> OpticsResult<AxisSystems>;

    /// Vacuum wavelength (m) the resonator is operated at.
    fn wavelength(&self) -> f64;

    /// Solve both axes for the self-consistent mode.
    fn eigenmode(&self, solver: &EigenmodeSolver) -> OpticsResult<CavityMode> {
        let systems = self.build()?;
        Ok(CavityMode {
            horizontal: solve_axis(solver, &systems, Axis::Horizontal)?,
            vertical: solve_axis(solver, &systems, Axis::Vertical)?,
        })
    }

    /// Solve for the eigenmode and trace it once around the cavity.
    ///
    /// The trace uses the resonator's own wavelength; the other settings
    /// come from `config`.
    fn trace_mode(&self, solver: &EigenmodeSolver, config: &TraceConfig) -> OpticsResult<ModeTrace> {
        let systems = self.build()?;
        let mode = CavityMode {
            horizontal: solve_axis(solver, &systems, Axis::Horizontal)?,
            vertical: solve_axis(solver, &systems, Axis::Vertical)?,
        };
        let tracer = BeamTracer::new(TraceConfig {
            wavelength: self.wavelength(),
            ..config.clone()
        });
        Ok(ModeTrace {
            mode,
            horizontal: tracer.trace(&systems.horizontal, mode.q(Axis::Horizontal))?,
            vertical: tracer.trace(&systems.vertical, mode.q(Axis::Vertical))?,
        })
    }
}

fn solve_axis(solver: &EigenmodeSolver, systems: &AxisSystems, axis: Axis) -> OpticsResult<f64> {
    solver
        .solve(&systems.get(axis).composite())
        .map_err(|e| match e {
            OpticsError::CavityDivergent(msg) => OpticsError::CavityDivergent(format!("{axis}: {msg}")),
            other => other,
        })
}
