//! TOML configuration deserialisation for beamline jobs.
//!
//! Lengths are in metres. Angles are given in degrees in the job file and
//! converted to radians when the library types are built.

use std::collections::HashSet;

use anyhow::{bail, Result};
use serde::Deserialize;

use beamline_core::cavity::{EigenmodeSolver, LinearCavityGeometry, RingCavityGeometry};
use beamline_core::line::{AxisBeam, ComponentKind, InputBeam, LineComponent, OpticalLine};
use beamline_core::trace::DirectionPolicy;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    #[serde(default)]
    pub line: Vec<LineConfig>,
    #[serde(default)]
    pub ring_cavity: Vec<RingCavityConfig>,
    #[serde(default)]
    pub linear_cavity: Vec<LinearCavityConfig>,
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Write one CSV per traced axis (default: true).
    #[serde(default = "default_true")]
    pub save_traces: bool,
    /// Write `summary.json` (default: true).
    #[serde(default = "default_true")]
    pub save_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_traces: true,
            save_summary: true,
        }
    }
}

/// Eigenmode solver settings shared by all cavities.
#[derive(Debug, Deserialize)]
pub struct SolverConfig {
    #[serde(default = "default_initial_guess")]
    pub initial_guess: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            initial_guess: default_initial_guess(),
            max_iterations: default_max_iterations(),
        }
    }
}

impl SolverConfig {
    pub fn solver(&self) -> EigenmodeSolver {
        EigenmodeSolver {
            initial_guess: self.initial_guess,
            max_iterations: self.max_iterations,
            ..Default::default()
        }
    }
}

/// A user-assembled optical line.
#[derive(Debug, Deserialize)]
pub struct LineConfig {
    pub name: String,
    #[serde(default)]
    pub beam: BeamConfig,
    #[serde(default)]
    pub x_offset: f64,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default = "default_true")]
    pub horizontal: bool,
    #[serde(default = "default_true")]
    pub vertical: bool,
    #[serde(default)]
    pub direction: DirectionPolicy,
    #[serde(default)]
    pub component: Vec<ComponentConfig>,
}

/// Input beam. The top-level waist settings apply to both axes unless an
/// axis table overrides them.
#[derive(Debug, Deserialize)]
pub struct BeamConfig {
    #[serde(default = "default_wavelength")]
    pub wavelength: f64,
    #[serde(default = "default_refractive_index")]
    pub refractive_index: f64,
    #[serde(default)]
    pub distance_from_waist: f64,
    #[serde(default)]
    pub rayleigh_range: f64,
    #[serde(default = "default_waist")]
    pub waist: f64,
    pub horizontal: Option<AxisBeamConfig>,
    pub vertical: Option<AxisBeamConfig>,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            wavelength: default_wavelength(),
            refractive_index: default_refractive_index(),
            distance_from_waist: 0.0,
            rayleigh_range: 0.0,
            waist: default_waist(),
            horizontal: None,
            vertical: None,
        }
    }
}

/// Per-axis override of the input beam.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AxisBeamConfig {
    #[serde(default)]
    pub distance_from_waist: f64,
    #[serde(default)]
    pub rayleigh_range: f64,
    #[serde(default)]
    pub waist: f64,
}

impl BeamConfig {
    fn input_beam(&self) -> InputBeam {
        let shared = AxisBeam {
            distance_from_waist: self.distance_from_waist,
            rayleigh_range: self.rayleigh_range,
            waist: self.waist,
        };
        let resolve = |axis: Option<AxisBeamConfig>| {
            axis.map_or(shared, |a| AxisBeam {
                distance_from_waist: a.distance_from_waist,
                rayleigh_range: a.rayleigh_range,
                waist: a.waist,
            })
        };
        InputBeam {
            horizontal: resolve(self.horizontal),
            vertical: resolve(self.vertical),
            wavelength: self.wavelength,
            refractive_index: self.refractive_index,
        }
    }
}

/// One `[[line.component]]` entry.
#[derive(Debug, Deserialize)]
pub struct ComponentConfig {
    #[serde(flatten)]
    pub kind: ComponentKindConfig,
    #[serde(default = "default_true")]
    pub horizontal: bool,
    #[serde(default = "default_true")]
    pub vertical: bool,
    #[serde(default)]
    pub label: Option<String>,
}

/// Component type, selected by the `type` key.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ComponentKindConfig {
    FreeSpace {
        length: f64,
    },
    ThinLens {
        focal_length: f64,
    },
    CurvedMirror {
        radius: f64,
        #[serde(default)]
        incidence_angle_deg: f64,
    },
    FlatRefraction {
        n1: f64,
        n2: f64,
    },
    FlatMirror,
}

impl ComponentConfig {
    fn component(&self) -> LineComponent {
        let kind = match self.kind {
            ComponentKindConfig::FreeSpace { length } => ComponentKind::FreeSpace { length },
            ComponentKindConfig::ThinLens { focal_length } => ComponentKind::ThinLens { focal_length },
            ComponentKindConfig::CurvedMirror {
                radius,
                incidence_angle_deg,
            } => ComponentKind::CurvedMirror {
                radius,
                incidence_angle: incidence_angle_deg.to_radians(),
            },
            ComponentKindConfig::FlatRefraction { n1, n2 } => ComponentKind::FlatRefraction { n1, n2 },
            ComponentKindConfig::FlatMirror => ComponentKind::FlatMirror,
        };
        LineComponent {
            kind,
            horizontal: self.horizontal,
            vertical: self.vertical,
            label: self.label.clone(),
        }
    }
}

impl LineConfig {
    pub fn optical_line(&self) -> OpticalLine {
        OpticalLine {
            name: self.name.clone(),
            beam: self.beam.input_beam(),
            components: self.component.iter().map(ComponentConfig::component).collect(),
            x_offset: self.x_offset,
            samples: self.samples,
            horizontal: self.horizontal,
            vertical: self.vertical,
            direction_policy: self.direction,
        }
    }
}

/// A bow-tie ring cavity.
#[derive(Debug, Deserialize)]
pub struct RingCavityConfig {
    pub name: String,
    #[serde(default = "default_focus_separation")]
    pub focus_separation: f64,
    #[serde(default = "default_free_arm")]
    pub free_arm: f64,
    #[serde(default = "default_crystal_length")]
    pub crystal_length: f64,
    #[serde(default = "default_crystal_index")]
    pub crystal_index: f64,
    #[serde(default = "default_mirror_radius")]
    pub mirror_radius: f64,
    #[serde(default = "default_ring_angle_deg")]
    pub incidence_angle_deg: f64,
    #[serde(default = "default_wavelength")]
    pub wavelength: f64,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default)]
    pub x_offset: f64,
    #[serde(default)]
    pub direction: DirectionPolicy,
}

impl RingCavityConfig {
    pub fn geometry(&self) -> RingCavityGeometry {
        RingCavityGeometry {
            focus_separation: self.focus_separation,
            free_arm: self.free_arm,
            crystal_length: self.crystal_length,
            crystal_index: self.crystal_index,
            mirror_radius: self.mirror_radius,
            incidence_angle: self.incidence_angle_deg.to_radians(),
            wavelength: self.wavelength,
        }
    }
}

/// A flat/curved linear cavity.
#[derive(Debug, Deserialize)]
pub struct LinearCavityConfig {
    pub name: String,
    #[serde(default = "default_cavity_length")]
    pub cavity_length: f64,
    #[serde(default = "default_mirror_radius")]
    pub mirror_radius: f64,
    #[serde(default)]
    pub incidence_angle_deg: f64,
    #[serde(default = "default_wavelength")]
    pub wavelength: f64,
    #[serde(default = "default_samples")]
    pub samples: usize,
    #[serde(default)]
    pub x_offset: f64,
    #[serde(default)]
    pub direction: DirectionPolicy,
}

impl LinearCavityConfig {
    pub fn geometry(&self) -> LinearCavityGeometry {
        LinearCavityGeometry {
            cavity_length: self.cavity_length,
            mirror_radius: self.mirror_radius,
            incidence_angle: self.incidence_angle_deg.to_radians(),
            wavelength: self.wavelength,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}
fn default_samples() -> usize {
    1000
}
fn default_wavelength() -> f64 {
    972e-9
}
fn default_refractive_index() -> f64 {
    1.0
}
fn default_waist() -> f64 {
    1e-3
}
fn default_initial_guess() -> f64 {
    35e-6
}
fn default_max_iterations() -> usize {
    200
}
fn default_focus_separation() -> f64 {
    61.6e-3
}
fn default_free_arm() -> f64 {
    69.3e-3
}
fn default_crystal_length() -> f64 {
    15e-3
}
fn default_crystal_index() -> f64 {
    1.567
}
fn default_mirror_radius() -> f64 {
    50e-3
}
fn default_ring_angle_deg() -> f64 {
    10.0
}
fn default_cavity_length() -> f64 {
    75e-3
}

impl JobConfig {
    /// Names become output file stems, so they must be unique and non-empty.
    fn check_names(&self) -> Result<()> {
        let mut seen = HashSet::new();
        let names = self
            .line
            .iter()
            .map(|l| &l.name)
            .chain(self.ring_cavity.iter().map(|c| &c.name))
            .chain(self.linear_cavity.iter().map(|c| &c.name));
        for name in names {
            if name.trim().is_empty() {
                bail!("Every line and cavity needs a non-empty 'name'");
            }
            if !seen.insert(name.as_str()) {
                bail!("Duplicate name '{}': output files would collide", name);
            }
        }
        if seen.is_empty() {
            bail!("Job defines no [[line]], [[ring_cavity]] or [[linear_cavity]]");
        }
        Ok(())
    }
}

/// Parse a TOML job configuration from a string.
pub fn parse_config(content: &str) -> Result<JobConfig> {
    let config: JobConfig = toml::from_str(content)?;
    config.check_names()?;
    Ok(config)
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use beamline_core::matrix::Axis;

    const JOB: &str = r#"
        [output]
        directory = "out"

        [[line]]
        name = "relay"
        samples = 200
        direction = "reverse_at_mirrors"

        [line.beam]
        waist = 2e-3

        [line.beam.vertical]
        rayleigh_range = 0.5

        [[line.component]]
        type = "free_space"
        length = 0.02

        [[line.component]]
        type = "thin_lens"
        focal_length = 0.04
        vertical = false
        label = "cylinder"

        [[line.component]]
        type = "curved_mirror"
        radius = 0.1
        incidence_angle_deg = 5.0

        [[line.component]]
        type = "flat_mirror"

        [[ring_cavity]]
        name = "bowtie"
        incidence_angle_deg = 12.0

        [[linear_cavity]]
        name = "standing"
        cavity_length = 0.03
        samples = 50
    "#;

    #[test]
    fn test_parse_full_job() {
        let job = parse_config(JOB).unwrap();
        assert_eq!(job.output.directory, "out");
        assert!(job.output.save_traces);
        assert_eq!(job.line.len(), 1);
        assert_eq!(job.ring_cavity.len(), 1);
        assert_eq!(job.linear_cavity[0].samples, 50);
        assert_eq!(job.ring_cavity[0].samples, 1000);
    }

    #[test]
    fn test_line_conversion() {
        let job = parse_config(JOB).unwrap();
        let line = job.line[0].optical_line();
        assert_eq!(line.samples, 200);
        assert_eq!(line.direction_policy, DirectionPolicy::ReverseAtMirrors);
        assert_eq!(line.components.len(), 4);
        assert!(!line.components[1].is_enabled(Axis::Vertical));
        assert_eq!(line.components[1].label.as_deref(), Some("cylinder"));
        assert_eq!(line.beam.horizontal.waist, 2e-3);
        assert_eq!(line.beam.vertical.rayleigh_range, 0.5);
        match line.components[2].kind {
            ComponentKind::CurvedMirror { incidence_angle, .. } => {
                assert!((incidence_angle - 5f64.to_radians()).abs() < 1e-15)
            }
            ref other => panic!("unexpected component {other:?}"),
        }
        assert!(line.systems().is_ok());
    }

    #[test]
    fn test_cavity_defaults() {
        let job = parse_config(JOB).unwrap();
        let ring = job.ring_cavity[0].geometry();
        assert_eq!(ring.focus_separation, RingCavityGeometry::default().focus_separation);
        assert!((ring.incidence_angle - 12f64.to_radians()).abs() < 1e-15);
        let linear = job.linear_cavity[0].geometry();
        assert_eq!(linear.cavity_length, 0.03);
        assert_eq!(linear.incidence_angle, 0.0);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let job = r#"
            [[line]]
            name = "a"
            [[linear_cavity]]
            name = "a"
        "#;
        assert!(parse_config(job).is_err());
    }

    #[test]
    fn test_empty_job_rejected() {
        assert!(parse_config("").is_err());
    }
}
