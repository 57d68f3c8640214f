//! # Beamline Core
//!
//! Paraxial Gaussian-beam propagation with ABCD ray-transfer matrices.
//! This crate models optical elements as 2×2 matrices, propagates the
//! complex beam parameter `q = z + i·z_R` through ordered element lists,
//! samples the beam radius along the optical axis, and solves resonators
//! for their self-consistent eigenmode.
//!
//! ## Architecture
//!
//! Every calculation is carried out once per transverse axis. Elements are
//! built into an [`system::OrderedSystem`] in physical order; its composite
//! matrix drives the eigenmode solve and the
//! [`trace::BeamTracer`] walks it element by element. Resonator geometries
//! implement [`cavity::Resonator`], and user-assembled beamlines are
//! described by [`line::OpticalLine`].
//!
//! ## Modules
//!
//! - [`matrix`] — Element matrices and their constructors.
//! - [`system`] — Ordered element lists and composite matrices.
//! - [`beam`] — The complex beam parameter and beam-radius evaluation.
//! - [`trace`] — Sampled beam-radius profiles along a system.
//! - [`cavity`] — Ring and linear resonators, eigenmode solver.
//! - [`line`] — Input beam plus per-axis component lists.
//! - [`error`] — Error type shared by all modules.

pub mod beam;
pub mod cavity;
pub mod error;
pub mod line;
pub mod matrix;
pub mod system;
pub mod trace;

pub use beam::BeamParameter;
pub use error::{OpticsError, OpticsResult};
pub use matrix::{Axis, ElementDescriptor, ElementMatrix};
pub use system::OrderedSystem;
pub use trace::{BeamTrace, BeamTracer, TraceConfig};
