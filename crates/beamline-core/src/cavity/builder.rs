//! Element lists for ring (bow-tie) and linear resonators.
//!
//! Both builders are pure: identical geometry gives bit-for-bit identical
//! systems. Each produces one system per transverse axis; the two differ
//! only in which curved-mirror matrix is used.

use serde::{Deserialize, Serialize};

use super::{AxisSystems, Resonator};
use crate::error::{OpticsError, OpticsResult};
use crate::matrix::{curved_mirror, free_space, Axis};
use crate::system::OrderedSystem;

/// Label placed at the start of a ring cavity, the crystal centre.
pub const CRYSTAL_CENTRE_LABEL: &str = "crystal centre";
/// Label placed halfway along the ring's long free arm.
pub const FREE_ARM_MIDPOINT_LABEL: &str = "free arm midpoint";

/// Bow-tie ring resonator with a nonlinear crystal between two curved
/// focusing mirrors and two flat fold mirrors.
///
/// The reference plane is the crystal centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingCavityGeometry {
    /// Distance between the curved focusing mirrors (m).
    pub focus_separation: f64,
    /// Length of the free arm between the fold mirrors (m).
    pub free_arm: f64,
    /// Physical length of the nonlinear crystal (m).
    pub crystal_length: f64,
    /// Refractive index of the crystal.
    pub crystal_index: f64,
    /// Radius of curvature of the focusing mirrors (m).
    pub mirror_radius: f64,
    /// Angle of incidence on the focusing mirrors (radians).
    pub incidence_angle: f64,
    /// Vacuum wavelength (m).
    pub wavelength: f64,
}

impl Default for RingCavityGeometry {
    fn default() -> Self {
        Self {
            focus_separation: 61.6e-3,
            free_arm: 69.3e-3,
            crystal_length: 15e-3,
            crystal_index: 1.567,
            mirror_radius: 50e-3,
            incidence_angle: 10f64.to_radians(),
            wavelength: 972e-9,
        }
    }
}

impl RingCavityGeometry {
    /// Length of each diagonal arm, `(l_focus + l_free) / (2·cos 2θ)`.
    pub fn diagonal(&self) -> f64 {
        (self.focus_separation + self.free_arm) / (2.0 * (2.0 * self.incidence_angle).cos())
    }

    /// Height of the bow-tie, `sin θ · l_diagonal`.
    pub fn height(&self) -> f64 {
        self.incidence_angle.sin() * self.diagonal()
    }

    /// Full round-trip path (crystal index-scaled).
    pub fn round_trip_length(&self) -> f64 {
        self.crystal_length / self.crystal_index
            + (self.focus_separation - self.crystal_length)
            + 2.0 * self.diagonal()
            + self.free_arm
    }

    fn validate(&self) -> OpticsResult<()> {
        positive("focus_separation", self.focus_separation)?;
        positive("free_arm", self.free_arm)?;
        positive("crystal_index", self.crystal_index)?;
        positive("wavelength", self.wavelength)?;
        if !(self.crystal_length >= 0.0) || self.crystal_length > self.focus_separation {
            return Err(OpticsError::InvalidElementParameter(format!(
                "crystal_length must lie in [0, focus_separation = {}], got {}",
                self.focus_separation, self.crystal_length
            )));
        }
        if !((2.0 * self.incidence_angle).cos() > 0.0) {
            return Err(OpticsError::InvalidElementParameter(format!(
                "ring incidence angle must be below 45°, got {:.3}°",
                self.incidence_angle.to_degrees()
            )));
        }
        Ok(())
    }
}

/// Standing-wave resonator: a flat mirror and a curved mirror facing it.
///
/// The reference plane is the flat mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearCavityGeometry {
    /// Mirror separation (m).
    pub cavity_length: f64,
    /// Radius of curvature of the curved mirror (m).
    pub mirror_radius: f64,
    /// Angle of incidence on the curved mirror (radians). Normally zero.
    #[serde(default)]
    pub incidence_angle: f64,
    /// Vacuum wavelength (m).
    pub wavelength: f64,
}

impl Default for LinearCavityGeometry {
    fn default() -> Self {
        Self {
            cavity_length: 75e-3,
            mirror_radius: 50e-3,
            incidence_angle: 0.0,
            wavelength: 972e-9,
        }
    }
}

impl LinearCavityGeometry {
    fn validate(&self) -> OpticsResult<()> {
        positive("cavity_length", self.cavity_length)?;
        positive("wavelength", self.wavelength)
    }
}

/// Build the horizontal and vertical systems of a ring cavity, starting and
/// ending at the crystal centre.
pub fn build_ring_cavity(geometry: &RingCavityGeometry) -> OpticsResult<AxisSystems> {
    geometry.validate()?;
    let half_crystal = geometry.crystal_length / (2.0 * geometry.crystal_index);
    let focus_arm = (geometry.focus_separation - geometry.crystal_length) / 2.0;
    let half_long_arm = (2.0 * geometry.diagonal() + geometry.free_arm) / 2.0;

    let build = |axis: Axis| -> OpticsResult<OrderedSystem> {
        let mirror = curved_mirror(geometry.mirror_radius, geometry.incidence_angle, axis)?;
        let mut system = OrderedSystem::new();
        system.push_label(CRYSTAL_CENTRE_LABEL);
        system.push(free_space(half_crystal));
        system.push(free_space(focus_arm));
        system.push_mirror(mirror);
        system.push(free_space(half_long_arm));
        system.push_label(FREE_ARM_MIDPOINT_LABEL);
        system.push(free_space(half_long_arm));
        system.push_mirror(mirror);
        system.push(free_space(focus_arm));
        system.push(free_space(half_crystal));
        Ok(system)
    };

    Ok(AxisSystems {
        horizontal: build(Axis::Horizontal)?,
        vertical: build(Axis::Vertical)?,
    })
}

/// Build the systems of a flat/curved linear cavity: out to the curved
/// mirror and back to the flat one.
pub fn build_linear_cavity(geometry: &LinearCavityGeometry) -> OpticsResult<AxisSystems> {
    geometry.validate()?;
    let build = |axis: Axis| -> OpticsResult<OrderedSystem> {
        let mut system = OrderedSystem::new();
        system.push(free_space(geometry.cavity_length));
        system.push_mirror(curved_mirror(
            geometry.mirror_radius,
            geometry.incidence_angle,
            axis,
        )?);
        system.push(free_space(geometry.cavity_length));
        Ok(system)
    };

    Ok(AxisSystems {
        horizontal: build(Axis::Horizontal)?,
        vertical: build(Axis::Vertical)?,
    })
}

impl Resonator for RingCavityGeometry {
    fn build(&self) -> OpticsResult<AxisSystems> {
        build_ring_cavity(self)
    }

    fn wavelength(&self) -> f64 {
        self.wavelength
    }
}

impl Resonator for LinearCavityGeometry {
    fn build(&self) -> OpticsResult<AxisSystems> {
        build_linear_cavity(self)
    }

    fn wavelength(&self) -> f64 {
        self.wavelength
    }
}

fn positive(name: &str, value: f64) -> OpticsResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(OpticsError::InvalidElementParameter(format!(
            "{name} must be positive and finite, got {value}"
        )))
    }
}
