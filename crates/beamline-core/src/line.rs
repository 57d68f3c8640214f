//! User-assembled beamlines.
//!
//! An [`OpticalLine`] couples an input beam with an ordered list of
//! components. Each component can be switched off per axis, in which case
//! it contributes an identity matrix on that axis, so a cylindrical lens is
//! modelled as a thin lens enabled on one axis only.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::beam::{calc_q, BeamParameter};
use crate::cavity::AxisSystems;
use crate::error::{OpticsError, OpticsResult};
use crate::matrix::{Axis, ElementDescriptor};
use crate::system::OrderedSystem;
use crate::trace::{BeamTrace, BeamTracer, DirectionPolicy, TraceConfig};

/// Element type and parameters of a line component, axis-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKind {
    FreeSpace { length: f64 },
    ThinLens { focal_length: f64 },
    /// `incidence_angle` in radians.
    CurvedMirror { radius: f64, incidence_angle: f64 },
    FlatRefraction { n1: f64, n2: f64 },
    FlatMirror,
}

/// One component of an optical line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineComponent {
    pub kind: ComponentKind,
    pub horizontal: bool,
    pub vertical: bool,
    /// Records the beam right after this component when set.
    pub label: Option<String>,
}

impl LineComponent {
    /// A component active on both axes.
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            horizontal: true,
            vertical: true,
            label: None,
        }
    }

    pub fn horizontal_only(mut self) -> Self {
        self.vertical = false;
        self.horizontal = true;
        self
    }

    pub fn vertical_only(mut self) -> Self {
        self.horizontal = false;
        self.vertical = true;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_enabled(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.horizontal,
            Axis::Vertical => self.vertical,
        }
    }

    /// The descriptor this component contributes on `axis`.
    pub fn descriptor(&self, axis: Axis) -> ElementDescriptor {
        if !self.is_enabled(axis) {
            return ElementDescriptor::Identity;
        }
        match self.kind {
            ComponentKind::FreeSpace { length } => ElementDescriptor::FreeSpace { length },
            ComponentKind::ThinLens { focal_length } => ElementDescriptor::ThinLens { focal_length },
            ComponentKind::CurvedMirror {
                radius,
                incidence_angle,
            } => ElementDescriptor::CurvedMirror {
                radius,
                incidence_angle,
                axis,
            },
            ComponentKind::FlatRefraction { n1, n2 } => ElementDescriptor::FlatRefraction { n1, n2 },
            ComponentKind::FlatMirror => ElementDescriptor::FlatMirror,
        }
    }

    /// Boundary checks that the matrix constructors deliberately leave out.
    fn validate(&self) -> OpticsResult<()> {
        if let ComponentKind::FreeSpace { length } = self.kind {
            if !(length >= 0.0) || !length.is_finite() {
                return Err(OpticsError::InvalidElementParameter(format!(
                    "free-space length must be non-negative and finite, got {length}"
                )));
            }
        }
        Ok(())
    }
}

/// Input beam on one axis, in the units a user would type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBeam {
    /// Distance from the waist (m).
    pub distance_from_waist: f64,
    /// Rayleigh range (m); `0` derives it from `waist`.
    pub rayleigh_range: f64,
    /// Waist radius (m).
    pub waist: f64,
}

impl Default for AxisBeam {
    fn default() -> Self {
        Self {
            distance_from_waist: 0.0,
            rayleigh_range: 0.0,
            waist: 1e-3,
        }
    }
}

/// Input beam on both axes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputBeam {
    pub horizontal: AxisBeam,
    pub vertical: AxisBeam,
    /// Vacuum wavelength (m).
    pub wavelength: f64,
    /// Refractive index of the input medium.
    pub refractive_index: f64,
}

impl Default for InputBeam {
    fn default() -> Self {
        Self {
            horizontal: AxisBeam::default(),
            vertical: AxisBeam::default(),
            wavelength: 972e-9,
            refractive_index: 1.0,
        }
    }
}

impl InputBeam {
    /// Resolve the beam parameter on `axis`.
    ///
    /// `None` when neither a Rayleigh range nor a waist is given on that axis.
    pub fn q(&self, axis: Axis) -> OpticsResult<Option<BeamParameter>> {
        let beam = match axis {
            Axis::Horizontal => &self.horizontal,
            Axis::Vertical => &self.vertical,
        };
        if beam.rayleigh_range == 0.0 && beam.waist == 0.0 {
            return Ok(None);
        }
        calc_q(
            beam.distance_from_waist,
            beam.rayleigh_range,
            self.wavelength,
            beam.waist,
            self.refractive_index,
        )
    }
}

/// An input beam propagated through a list of components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpticalLine {
    pub name: String,
    pub beam: InputBeam,
    pub components: Vec<LineComponent>,
    /// Position of the input plane on the plot axis (m).
    pub x_offset: f64,
    /// Samples per free-space segment.
    pub samples: usize,
    /// Trace the horizontal axis.
    pub horizontal: bool,
    /// Trace the vertical axis.
    pub vertical: bool,
    pub direction_policy: DirectionPolicy,
}

impl Default for OpticalLine {
    fn default() -> Self {
        Self {
            name: "New Optical Line".into(),
            beam: InputBeam::default(),
            components: Vec::new(),
            x_offset: 0.0,
            samples: 1000,
            horizontal: true,
            vertical: true,
            direction_policy: DirectionPolicy::Unfold,
        }
    }
}

/// Traces produced by one replot of a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinePlot {
    pub name: String,
    pub horizontal: Option<BeamTrace>,
    pub vertical: Option<BeamTrace>,
}

impl LinePlot {
    pub fn get(&self, axis: Axis) -> Option<&BeamTrace> {
        match axis {
            Axis::Horizontal => self.horizontal.as_ref(),
            Axis::Vertical => self.vertical.as_ref(),
        }
    }
}

impl OpticalLine {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn push(&mut self, component: LineComponent) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn is_traced(&self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.horizontal,
            Axis::Vertical => self.vertical,
        }
    }

    /// Resolve the components into one ordered system per axis.
    pub fn systems(&self) -> OpticsResult<AxisSystems> {
        for component in &self.components {
            component.validate()?;
        }
        let build = |axis: Axis| -> OpticsResult<OrderedSystem> {
            let mut system = OrderedSystem::new();
            for component in &self.components {
                system.push_descriptor(&component.descriptor(axis))?;
                if let Some(label) = &component.label {
                    system.push_label(label.clone());
                }
            }
            Ok(system)
        };
        Ok(AxisSystems {
            horizontal: build(Axis::Horizontal)?,
            vertical: build(Axis::Vertical)?,
        })
    }

    /// Rebuild the systems and trace every enabled axis from scratch.
    ///
    /// An axis with no input beam specified is skipped with a warning.
    pub fn replot(&self) -> OpticsResult<LinePlot> {
        let systems = self.systems()?;
        let tracer = BeamTracer::new(TraceConfig {
            samples_per_segment: self.samples,
            wavelength: self.beam.wavelength,
            start_position: self.x_offset,
            direction_policy: self.direction_policy,
        });

        let trace_axis = |axis: Axis| -> OpticsResult<Option<BeamTrace>> {
            if !self.is_traced(axis) {
                return Ok(None);
            }
            match self.beam.q(axis)? {
                Some(q) => tracer.trace(systems.get(axis), q).map(Some),
                None => {
                    warn!("line '{}': no input beam on the {axis} axis", self.name);
                    Ok(None)
                }
            }
        };

        Ok(LinePlot {
            name: self.name.clone(),
            horizontal: trace_axis(Axis::Horizontal)?,
            vertical: trace_axis(Axis::Vertical)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relay() -> OpticalLine {
        let mut line = OpticalLine::new("relay");
        line.samples = 20;
        line.push(LineComponent::new(ComponentKind::FreeSpace { length: 0.05 }))
            .push(
                LineComponent::new(ComponentKind::ThinLens { focal_length: 0.1 })
                    .horizontal_only()
                    .with_label("cylinder lens"),
            )
            .push(LineComponent::new(ComponentKind::FreeSpace { length: 0.2 }));
        line
    }

    #[test]
    fn test_disabled_component_becomes_identity() {
        let c = LineComponent::new(ComponentKind::ThinLens { focal_length: 0.1 }).horizontal_only();
        assert_eq!(
            c.descriptor(Axis::Horizontal),
            ElementDescriptor::ThinLens { focal_length: 0.1 }
        );
        assert_eq!(c.descriptor(Axis::Vertical), ElementDescriptor::Identity);
    }

    #[test]
    fn test_mirror_descriptor_takes_axis() {
        let c = LineComponent::new(ComponentKind::CurvedMirror {
            radius: 0.1,
            incidence_angle: 0.2,
        });
        assert!(matches!(
            c.descriptor(Axis::Vertical),
            ElementDescriptor::CurvedMirror { axis: Axis::Vertical, .. }
        ));
    }

    #[test]
    fn test_systems_split_per_axis() {
        let systems = relay().systems().unwrap();
        assert_ne!(systems.horizontal.composite(), systems.vertical.composite());
        assert!((systems.vertical.composite().b() - 0.25).abs() < 1e-15);
        assert_eq!(systems.horizontal.entries().len(), 4);
    }

    #[test]
    fn test_negative_length_rejected_at_boundary() {
        let mut line = relay();
        line.push(LineComponent::new(ComponentKind::FreeSpace { length: -0.1 }));
        assert!(matches!(
            line.systems(),
            Err(OpticsError::InvalidElementParameter(_))
        ));
    }

    #[test]
    fn test_replot_traces_enabled_axes() {
        let mut line = relay();
        line.vertical = false;
        let plot = line.replot().unwrap();
        assert!(plot.vertical.is_none());
        let hor = plot.horizontal.unwrap();
        assert_eq!(hor.len(), 40);
        assert_eq!(hor.labeled_points.len(), 1);
    }

    #[test]
    fn test_replot_applies_x_offset() {
        let mut line = relay();
        line.x_offset = 1.5;
        let plot = line.replot().unwrap();
        let ver = plot.get(Axis::Vertical).unwrap();
        assert_eq!(ver.xs[0], 1.5);
        assert!((ver.xs.last().unwrap() - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_replot_skips_undefined_beam() {
        let mut line = relay();
        line.beam.vertical = AxisBeam {
            distance_from_waist: 0.0,
            rayleigh_range: 0.0,
            waist: 0.0,
        };
        let plot = line.replot().unwrap();
        assert!(plot.vertical.is_none());
        assert!(plot.horizontal.is_some());
    }

    #[test]
    fn test_underivable_beam_is_an_error() {
        let mut line = relay();
        line.beam.wavelength = 0.0;
        assert!(matches!(
            line.replot(),
            Err(OpticsError::InvalidBeamParameter(_))
        ));
    }

    #[test]
    fn test_explicit_rayleigh_range_wins() {
        let mut beam = InputBeam::default();
        beam.horizontal.rayleigh_range = 0.5;
        let q = beam.q(Axis::Horizontal).unwrap().unwrap();
        assert_eq!(q.rayleigh_range(), 0.5);
    }
}
