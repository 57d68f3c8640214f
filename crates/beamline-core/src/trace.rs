//! Sampled beam-radius traces along an ordered system.
//!
//! The tracer walks an [`OrderedSystem`] in physical order, carrying the
//! beam parameter `q` through every element. Inside each free-space segment
//! (any matrix with `B ≠ 0`) it samples the beam radius on a uniform grid
//! from `0` to `B`, using the current `q` as the reference. Consecutive
//! segments share their boundary position, so the position output has no
//! gaps.
//!
//! A sample whose radius cannot be evaluated (non-positive Rayleigh range)
//! is recorded as `0` and the walk continues, so a caller can see where the
//! model broke down instead of losing the whole trace.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::beam::{rayleigh_range_from_waist, BeamParameter};
use crate::error::{OpticsError, OpticsResult};
use crate::system::{OrderedSystem, SystemEntry};

/// What happens to the plotted propagation direction at a reflective element.
///
/// The direction only affects the position axis of the trace; the beam
/// parameter propagates identically under both policies. Whether folded
/// cavities should be drawn folded or unfolded is a presentation choice, so
/// it is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionPolicy {
    /// Never reverse: the trace is plotted against unfolded path length.
    #[default]
    Unfold,
    /// Reverse at every entry tagged reflective (mirrors only; the matrix
    /// shape is never consulted).
    ReverseAtMirrors,
}

/// Settings for one trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Samples per free-space segment, endpoints included.
    pub samples_per_segment: usize,
    /// Vacuum wavelength (m).
    pub wavelength: f64,
    /// Position assigned to the input plane (m).
    pub start_position: f64,
    pub direction_policy: DirectionPolicy,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            samples_per_segment: 1000,
            wavelength: 972e-9,
            start_position: 0.0,
            direction_policy: DirectionPolicy::Unfold,
        }
    }
}

/// A local minimum of the sampled beam radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    /// Position (m).
    pub position: f64,
    /// Beam radius at that position (m).
    pub radius: f64,
}

/// Beam state recorded at a label entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledPoint {
    pub label: String,
    /// Trace position at which the label sits (m).
    pub position: f64,
    /// Beam radius there (m); `0` if it could not be evaluated.
    pub radius: f64,
    pub q: BeamParameter,
}

/// The sampled output of one trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BeamTrace {
    /// Sample positions (m).
    pub xs: Vec<f64>,
    /// Beam radius at each position (m).
    pub ws: Vec<f64>,
    /// Strict local minima of `ws`.
    pub focus_points: Vec<FocusPoint>,
    /// `π·w(0)²/λ` from the first sample, `0` for an empty trace.
    pub rayleigh_range: f64,
    pub labeled_points: Vec<LabeledPoint>,
    /// Beam parameter after the last element.
    pub q_out: Option<BeamParameter>,
}

impl BeamTrace {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Copy of this trace with every position shifted by `offset`.
    pub fn shifted(&self, offset: f64) -> Self {
        let mut trace = self.clone();
        trace.xs.iter_mut().for_each(|x| *x += offset);
        trace
            .focus_points
            .iter_mut()
            .for_each(|f| f.position += offset);
        trace
            .labeled_points
            .iter_mut()
            .for_each(|p| p.position += offset);
        trace
    }

    /// Smallest sampled radius with its position.
    pub fn min_radius(&self) -> Option<FocusPoint> {
        self.xs
            .iter()
            .zip(&self.ws)
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&position, &radius)| FocusPoint { position, radius })
    }
}

/// Walks ordered systems and produces [`BeamTrace`]s.
#[derive(Debug, Clone, Default)]
pub struct BeamTracer {
    config: TraceConfig,
}

impl BeamTracer {
    pub fn new(config: TraceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Trace `q_in` through `system`.
    ///
    /// Fails only on an invalid wavelength or a degenerate element matrix;
    /// sampling failures are zero-filled.
    pub fn trace(&self, system: &OrderedSystem, q_in: BeamParameter) -> OpticsResult<BeamTrace> {
        let wavelength = self.config.wavelength;
        if !(wavelength > 0.0) {
            return Err(OpticsError::InvalidBeamParameter(format!(
                "trace wavelength must be positive, got {wavelength}"
            )));
        }
        let n_points = self.config.samples_per_segment;

        let mut q = q_in;
        let mut direction = 1.0;
        let mut cursor = self.config.start_position;
        let mut xs = Vec::with_capacity(n_points * system.element_count());
        let mut ws = Vec::with_capacity(n_points * system.element_count());
        let mut labeled_points = Vec::new();
        let mut zero_filled = 0usize;

        for entry in system.entries() {
            match entry {
                SystemEntry::Label(label) => {
                    let radius = q.radius(wavelength).unwrap_or_else(|e| {
                        warn!("label '{label}': {e}; recording zero radius");
                        0.0
                    });
                    labeled_points.push(LabeledPoint {
                        label: label.clone(),
                        position: cursor,
                        radius,
                        q,
                    });
                }
                SystemEntry::Element { matrix, reflective } => {
                    let length = matrix.b();
                    if length != 0.0 {
                        for sample in linspace(0.0, length, n_points) {
                            let radius = q.radius_after(sample, wavelength).unwrap_or_else(|_| {
                                zero_filled += 1;
                                0.0
                            });
                            xs.push(direction * sample + cursor);
                            ws.push(radius);
                        }
                        if let Some(&last) = xs.last() {
                            cursor = last;
                        }
                    }
                    if *reflective && self.config.direction_policy == DirectionPolicy::ReverseAtMirrors
                    {
                        direction = -direction;
                    }
                    q = q.transform(matrix)?;
                }
            }
        }

        if zero_filled > 0 {
            warn!("{zero_filled} of {} samples zero-filled: Rayleigh range not positive", ws.len());
        }

        let rayleigh_range = ws
            .first()
            .map(|&w0| rayleigh_range_from_waist(w0, wavelength))
            .unwrap_or(0.0);
        let focus_points = find_focus_points(&xs, &ws);
        debug!(
            "traced {} samples, {} focus point(s), {} label(s)",
            xs.len(),
            focus_points.len(),
            labeled_points.len()
        );

        Ok(BeamTrace {
            xs,
            ws,
            focus_points,
            rayleigh_range,
            labeled_points,
            q_out: Some(q),
        })
    }
}

/// Trace with an explicit configuration.
pub fn trace(
    system: &OrderedSystem,
    q_in: BeamParameter,
    config: &TraceConfig,
) -> OpticsResult<BeamTrace> {
    BeamTracer::new(config.clone()).trace(system, q_in)
}

/// Strict local minima: `w[i] < w[i-1]` and `w[i] < w[i+1]`.
pub fn find_focus_points(xs: &[f64], ws: &[f64]) -> Vec<FocusPoint> {
    ws.windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] < w[0] && w[1] < w[2])
        .map(|(i, w)| FocusPoint {
            position: xs[i + 1],
            radius: w[1],
        })
        .collect()
}

/// `n` evenly spaced values from `start` to `end`, both included.
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| if i + 1 == n && n > 1 { end } else { start + step * i as f64 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{curved_mirror, free_space, thin_lens, Axis, ElementDescriptor};

    fn config(samples: usize) -> TraceConfig {
        TraceConfig {
            samples_per_segment: samples,
            wavelength: 1e-6,
            ..Default::default()
        }
    }

    #[test]
    fn test_linspace_endpoints() {
        let v: Vec<f64> = linspace(0.0, 0.3, 4).collect();
        assert_eq!(v.len(), 4);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[3], 0.3);
        assert_eq!(linspace(0.0, 1.0, 1).collect::<Vec<_>>(), vec![0.0]);
        assert_eq!(linspace(0.0, 1.0, 0).count(), 0);
    }

    #[test]
    fn test_sample_count_and_continuity() {
        let mut system = OrderedSystem::new();
        system.push(free_space(0.1));
        system.push(thin_lens(0.2).unwrap());
        system.push(free_space(0.3));

        let trace = BeamTracer::new(config(50))
            .trace(&system, BeamParameter::at_waist(0.5))
            .unwrap();
        assert_eq!(trace.len(), 100);
        assert_eq!(trace.xs[49], trace.xs[50]);
        assert!((trace.xs[99] - 0.4).abs() < 1e-15);
        assert!(trace.xs.windows(2).all(|p| p[1] >= p[0]));
    }

    #[test]
    fn test_start_position_offsets_trace() {
        let mut system = OrderedSystem::new();
        system.push(free_space(0.1));
        let cfg = TraceConfig {
            start_position: 2.0,
            ..config(10)
        };
        let trace = trace(&system, BeamParameter::at_waist(0.5), &cfg).unwrap();
        assert_eq!(trace.xs[0], 2.0);
        assert!((trace.xs[9] - 2.1).abs() < 1e-15);
    }

    #[test]
    fn test_label_records_current_beam() {
        let mut system = OrderedSystem::new();
        system.push(free_space(0.1));
        system.push_label("after gap");
        let q = BeamParameter::new(0.0, 0.05);
        let trace = BeamTracer::new(config(5)).trace(&system, q).unwrap();

        let point = &trace.labeled_points[0];
        assert_eq!(point.label, "after gap");
        assert!((point.q.distance_from_waist() - 0.1).abs() < 1e-15);
        let expected = q.radius_after(0.1, 1e-6).unwrap();
        assert!((point.radius - expected).abs() < 1e-15);
        assert!((point.position - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_unfold_policy_keeps_direction_at_mirror() {
        let system = OrderedSystem::from_descriptors(&[
            ElementDescriptor::FreeSpace { length: 0.1 },
            ElementDescriptor::FlatMirror,
            ElementDescriptor::FreeSpace { length: 0.1 },
        ])
        .unwrap();
        let trace = BeamTracer::new(config(11))
            .trace(&system, BeamParameter::at_waist(0.5))
            .unwrap();
        assert!((trace.xs.last().unwrap() - 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_reverse_policy_folds_at_mirror() {
        let mut system = OrderedSystem::new();
        system.push(free_space(0.1));
        system.push_mirror(curved_mirror(0.5, 0.0, Axis::Horizontal).unwrap());
        system.push(free_space(0.1));

        let cfg = TraceConfig {
            direction_policy: DirectionPolicy::ReverseAtMirrors,
            ..config(11)
        };
        let folded = BeamTracer::new(cfg).trace(&system, BeamParameter::at_waist(0.5)).unwrap();
        let unfolded = BeamTracer::new(config(11))
            .trace(&system, BeamParameter::at_waist(0.5))
            .unwrap();

        assert!(folded.xs.last().unwrap().abs() < 1e-15);
        assert!(folded.xs[11..].windows(2).all(|p| p[1] <= p[0]));
        // Direction is presentation only: radii agree sample for sample.
        assert_eq!(folded.ws, unfolded.ws);
    }

    #[test]
    fn test_untagged_identity_never_reverses() {
        let system = OrderedSystem::from_descriptors(&[
            ElementDescriptor::FreeSpace { length: 0.1 },
            ElementDescriptor::Identity,
            ElementDescriptor::FreeSpace { length: 0.1 },
        ])
        .unwrap();
        let cfg = TraceConfig {
            direction_policy: DirectionPolicy::ReverseAtMirrors,
            ..config(11)
        };
        let trace = BeamTracer::new(cfg).trace(&system, BeamParameter::at_waist(0.5)).unwrap();
        assert!((trace.xs.last().unwrap() - 0.2).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_beam_is_zero_filled() {
        let mut system = OrderedSystem::new();
        system.push(free_space(0.1));
        let trace = BeamTracer::new(config(8))
            .trace(&system, BeamParameter::new(0.0, -1.0))
            .unwrap();
        assert_eq!(trace.len(), 8);
        assert!(trace.ws.iter().all(|&w| w == 0.0));
        assert_eq!(trace.rayleigh_range, 0.0);
    }

    #[test]
    fn test_rayleigh_range_from_first_sample() {
        let mut system = OrderedSystem::new();
        system.push(free_space(0.1));
        let trace = BeamTracer::new(config(8))
            .trace(&system, BeamParameter::at_waist(0.05))
            .unwrap();
        assert!((trace.rayleigh_range - 0.05).abs() / 0.05 < 1e-12);
    }

    #[test]
    fn test_empty_system_gives_empty_trace() {
        let trace = BeamTracer::default()
            .trace(&OrderedSystem::new(), BeamParameter::at_waist(0.05))
            .unwrap();
        assert!(trace.is_empty());
        assert_eq!(trace.rayleigh_range, 0.0);
        assert!(trace.focus_points.is_empty());
    }

    #[test]
    fn test_rejects_non_positive_wavelength() {
        let cfg = TraceConfig {
            wavelength: 0.0,
            ..Default::default()
        };
        let result = BeamTracer::new(cfg).trace(&OrderedSystem::new(), BeamParameter::at_waist(1.0));
        assert!(matches!(result, Err(OpticsError::InvalidBeamParameter(_))));
    }

    #[test]
    fn test_focus_points_are_strict_minima() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let ws = [3.0, 2.0, 2.0, 1.0, 4.0, 0.5];
        let focus = find_focus_points(&xs, &ws);
        assert_eq!(focus, vec![FocusPoint { position: 3.0, radius: 1.0 }]);
    }

    #[test]
    fn test_shifted_moves_every_position() {
        let mut system = OrderedSystem::new();
        system.push(free_space(0.1));
        system.push_label("end");
        let trace = BeamTracer::new(config(4))
            .trace(&system, BeamParameter::at_waist(0.05))
            .unwrap();
        let shifted = trace.shifted(1.0);
        assert_eq!(shifted.ws, trace.ws);
        assert!((shifted.xs[0] - 1.0).abs() < 1e-15);
        assert!((shifted.labeled_points[0].position - 1.1).abs() < 1e-12);
    }
}
