//! Job runner: builds lines and cavities, traces them, writes results.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use beamline_core::beam::BeamParameter;
use beamline_core::cavity::{
    stability_parameter, AxisSystems, CavityMode, EigenmodeSolver, Resonator,
};
use beamline_core::line::LinePlot;
use beamline_core::matrix::Axis;
use beamline_core::trace::{BeamTrace, DirectionPolicy, FocusPoint, LabeledPoint, TraceConfig};

use crate::config::JobConfig;

/// Results of one job.
pub struct JobOutput {
    pub lines: Vec<LinePlot>,
    pub cavities: Vec<CavityOutput>,
}

/// Results for one cavity. A cavity without a stable mode keeps its
/// stability numbers and the reason instead of traces.
pub struct CavityOutput {
    pub name: String,
    pub kind: &'static str,
    pub wavelength: f64,
    pub stability: AxisValues,
    pub round_trip_length: f64,
    pub height: Option<f64>,
    pub mode: Option<CavityMode>,
    pub horizontal: Option<BeamTrace>,
    pub vertical: Option<BeamTrace>,
    pub error: Option<String>,
}

impl CavityOutput {
    fn trace(&self, axis: Axis) -> Option<&BeamTrace> {
        match axis {
            Axis::Horizontal => self.horizontal.as_ref(),
            Axis::Vertical => self.vertical.as_ref(),
        }
    }
}

/// A value per transverse axis.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AxisValues {
    pub horizontal: f64,
    pub vertical: f64,
}

/// Settings for tracing one cavity.
struct CavityJob<'a, R: Resonator> {
    name: &'a str,
    kind: &'static str,
    resonator: R,
    round_trip_length: f64,
    height: Option<f64>,
    trace: TraceConfig,
}

/// Build every line and cavity in `job` and trace them.
///
/// Lines and cavities are independent, so they are traced in parallel.
/// Build errors in a line abort the job; a cavity with no stable mode is
/// reported and skipped.
pub fn run_job(job: &JobConfig) -> Result<JobOutput> {
    let solver = job.solver.solver();

    let lines = job
        .line
        .par_iter()
        .map(|config| {
            let line = config.optical_line();
            line.replot()
                .with_context(|| format!("Line '{}'", line.name))
        })
        .collect::<Result<Vec<_>>>()?;

    for plot in &lines {
        for axis in Axis::ALL {
            if let Some(trace) = plot.get(axis) {
                println!(
                    "  Line '{}' [{}]: {} samples, {} focus point(s)",
                    plot.name,
                    axis.short_name(),
                    trace.len(),
                    trace.focus_points.len()
                );
            }
        }
    }

    let ring = job.ring_cavity.par_iter().map(|config| {
        let geometry = config.geometry();
        run_cavity(
            CavityJob {
                name: &config.name,
                kind: "ring",
                round_trip_length: geometry.round_trip_length(),
                height: Some(geometry.height()),
                resonator: geometry,
                trace: trace_config(config.samples, config.x_offset, config.direction),
            },
            &solver,
        )
    });
    let linear = job.linear_cavity.par_iter().map(|config| {
        let geometry = config.geometry();
        run_cavity(
            CavityJob {
                name: &config.name,
                kind: "linear",
                round_trip_length: 2.0 * geometry.cavity_length,
                height: None,
                resonator: geometry,
                trace: trace_config(config.samples, config.x_offset, config.direction),
            },
            &solver,
        )
    });
    let mut cavities = ring.collect::<Result<Vec<_>>>()?;
    cavities.extend(linear.collect::<Result<Vec<_>>>()?);

    for cavity in &cavities {
        match (&cavity.mode, &cavity.error) {
            (Some(mode), _) => println!(
                "  Cavity '{}' ({}): z_R hor = {:.4e} m, ver = {:.4e} m",
                cavity.name, cavity.kind, mode.horizontal, mode.vertical
            ),
            (None, Some(reason)) => println!(
                "  Cavity '{}' ({}): no stable mode ({})",
                cavity.name, cavity.kind, reason
            ),
            (None, None) => {}
        }
    }

    Ok(JobOutput { lines, cavities })
}

fn trace_config(samples: usize, x_offset: f64, direction: DirectionPolicy) -> TraceConfig {
    TraceConfig {
        samples_per_segment: samples,
        start_position: x_offset,
        direction_policy: direction,
        ..Default::default()
    }
}

fn run_cavity<R: Resonator>(job: CavityJob<'_, R>, solver: &EigenmodeSolver) -> Result<CavityOutput> {
    // Geometry errors are configuration mistakes, not physics.
    let systems: AxisSystems = job
        .resonator
        .build()
        .with_context(|| format!("Cavity '{}'", job.name))?;
    let stability = AxisValues {
        horizontal: stability_parameter(&systems.horizontal.composite()),
        vertical: stability_parameter(&systems.vertical.composite()),
    };

    let mut output = CavityOutput {
        name: job.name.to_string(),
        kind: job.kind,
        wavelength: job.resonator.wavelength(),
        stability,
        round_trip_length: job.round_trip_length,
        height: job.height,
        mode: None,
        horizontal: None,
        vertical: None,
        error: None,
    };
    match job.resonator.trace_mode(solver, &job.trace) {
        Ok(traced) => {
            output.mode = Some(traced.mode);
            output.horizontal = Some(traced.horizontal);
            output.vertical = Some(traced.vertical);
        }
        Err(e) => {
            warn!("cavity '{}': {}", job.name, e);
            output.error = Some(e.to_string());
        }
    }
    Ok(output)
}

/// Replace characters that do not belong in a file name.
fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

/// Write one trace to a CSV file with a metadata header.
pub fn write_trace_csv(
    trace: &BeamTrace,
    path: &Path,
    source: &str,
    axis: Axis,
    wavelength: f64,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    writeln!(file, "# beamline: Gaussian beam radius trace")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# source: {source}")?;
    writeln!(file, "# axis: {axis}")?;
    writeln!(file, "# wavelength_m: {wavelength:e}")?;
    writeln!(file, "#")?;
    writeln!(file, "x_m,w_m")?;

    for (x, w) in trace.xs.iter().zip(&trace.ws) {
        writeln!(file, "{x:.9e},{w:.9e}")?;
    }
    file.flush()?;

    info!("trace written to {}", path.display());
    Ok(())
}

/// Write every trace of a job as `<name>_<axis>.csv`.
pub fn write_traces(output: &JobOutput, job: &JobConfig, out_dir: &Path) -> Result<usize> {
    let mut written = 0;
    for (plot, config) in output.lines.iter().zip(&job.line) {
        for axis in Axis::ALL {
            if let Some(trace) = plot.get(axis) {
                let path = out_dir.join(format!("{}_{}.csv", file_stem(&plot.name), axis.short_name()));
                write_trace_csv(trace, &path, &plot.name, axis, config.beam.wavelength)?;
                written += 1;
            }
        }
    }
    for cavity in &output.cavities {
        for axis in Axis::ALL {
            if let Some(trace) = cavity.trace(axis) {
                let path =
                    out_dir.join(format!("{}_{}.csv", file_stem(&cavity.name), axis.short_name()));
                write_trace_csv(trace, &path, &cavity.name, axis, cavity.wavelength)?;
                written += 1;
            }
        }
    }
    println!("{written} trace file(s) written to: {}", out_dir.display());
    Ok(written)
}

#[derive(Debug, Serialize)]
struct TraceSummary<'a> {
    samples: usize,
    rayleigh_range: f64,
    min_radius: Option<FocusPoint>,
    focus_points: &'a [FocusPoint],
    labeled_points: &'a [LabeledPoint],
    q_out: Option<BeamParameter>,
}

impl<'a> From<&'a BeamTrace> for TraceSummary<'a> {
    fn from(trace: &'a BeamTrace) -> Self {
        Self {
            samples: trace.len(),
            rayleigh_range: trace.rayleigh_range,
            min_radius: trace.min_radius(),
            focus_points: &trace.focus_points,
            labeled_points: &trace.labeled_points,
            q_out: trace.q_out,
        }
    }
}

#[derive(Debug, Serialize)]
struct LineSummary<'a> {
    name: &'a str,
    horizontal: Option<TraceSummary<'a>>,
    vertical: Option<TraceSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct CavitySummary<'a> {
    name: &'a str,
    kind: &'static str,
    wavelength: f64,
    stability: AxisValues,
    stable: bool,
    round_trip_length: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    height: Option<f64>,
    /// Rayleigh ranges of the eigenmode at the reference plane.
    mode: Option<CavityMode>,
    waist_radius: Option<AxisValues>,
    horizontal: Option<TraceSummary<'a>>,
    vertical: Option<TraceSummary<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct Summary<'a> {
    version: &'static str,
    lines: Vec<LineSummary<'a>>,
    cavities: Vec<CavitySummary<'a>>,
}

fn summarise(output: &JobOutput) -> Summary<'_> {
    let lines = output
        .lines
        .iter()
        .map(|plot| LineSummary {
            name: &plot.name,
            horizontal: plot.horizontal.as_ref().map(TraceSummary::from),
            vertical: plot.vertical.as_ref().map(TraceSummary::from),
        })
        .collect();

    let cavities = output
        .cavities
        .iter()
        .map(|cavity| {
            let waist_radius = cavity.mode.and_then(|mode| {
                Some(AxisValues {
                    horizontal: mode.waist_radius(Axis::Horizontal, cavity.wavelength).ok()?,
                    vertical: mode.waist_radius(Axis::Vertical, cavity.wavelength).ok()?,
                })
            });
            CavitySummary {
                name: &cavity.name,
                kind: cavity.kind,
                wavelength: cavity.wavelength,
                stability: cavity.stability,
                stable: cavity.mode.is_some(),
                round_trip_length: cavity.round_trip_length,
                height: cavity.height,
                mode: cavity.mode,
                waist_radius,
                horizontal: cavity.horizontal.as_ref().map(TraceSummary::from),
                vertical: cavity.vertical.as_ref().map(TraceSummary::from),
                error: cavity.error.as_deref(),
            }
        })
        .collect();

    Summary {
        version: env!("CARGO_PKG_VERSION"),
        lines,
        cavities,
    }
}

/// Write the focus points, labels and cavity modes of a job to JSON.
pub fn write_summary_json(output: &JobOutput, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&summarise(output))
        .map_err(|e| anyhow::anyhow!("JSON serialisation error: {}", e))?;
    std::fs::write(path, json)?;

    println!("Summary written to: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    const JOB: &str = r#"
        [[line]]
        name = "relay lens"
        samples = 100

        [line.beam]
        waist = 2e-3

        [[line.component]]
        type = "free_space"
        length = 0.02

        [[line.component]]
        type = "thin_lens"
        focal_length = 0.04

        [[line.component]]
        type = "free_space"
        length = 0.09

        [[ring_cavity]]
        name = "bowtie"
        samples = 50

        [[linear_cavity]]
        name = "too long"
    "#;

    #[test]
    fn test_run_job() {
        let job = parse_config(JOB).unwrap();
        let output = run_job(&job).unwrap();
        assert_eq!(output.lines.len(), 1);
        assert_eq!(output.lines[0].horizontal.as_ref().unwrap().len(), 200);

        let ring = &output.cavities[0];
        assert!(ring.mode.is_some());
        assert!(ring.height.unwrap() > 0.0);
        assert_eq!(ring.horizontal.as_ref().unwrap().len(), 300);

        // 75 mm against a 50 mm mirror: unstable.
        let linear = &output.cavities[1];
        assert!(linear.mode.is_none());
        assert!(linear.error.is_some());
        assert!(linear.stability.horizontal.abs() > 1.0);
    }

    #[test]
    fn test_summary_json() {
        let job = parse_config(JOB).unwrap();
        let output = run_job(&job).unwrap();
        let value = serde_json::to_value(summarise(&output)).unwrap();
        assert_eq!(value["lines"][0]["name"], "relay lens");
        assert_eq!(value["lines"][0]["horizontal"]["focus_points"].as_array().unwrap().len(), 1);
        assert_eq!(value["cavities"][0]["stable"], true);
        assert_eq!(value["cavities"][1]["stable"], false);
        assert!(value["cavities"][1]["mode"].is_null());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("relay lens"), "relay_lens");
        assert_eq!(file_stem("ring-1/a"), "ring-1_a");
    }
}
