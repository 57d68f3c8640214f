//! Paraxial ray-transfer (ABCD) matrices for individual optical elements.
//!
//! Every element maps a ray `(y, θ)` at its input plane to `(y', θ')` at its
//! output plane:
//!
//! $$
//! \begin{pmatrix} y' \\ \theta' \end{pmatrix} =
//! \begin{pmatrix} A & B \\ C & D \end{pmatrix}
//! \begin{pmatrix} y \\ \theta \end{pmatrix}
//! $$
//!
//! For lossless elements in a single medium $\det M = 1$; a flat refractive
//! interface from $n_1$ into $n_2$ has $\det M = n_1 / n_2$. This is
//! checkable through [`ElementMatrix::determinant`] but is not enforced.

use std::fmt;
use std::ops::Mul;

use nalgebra::Matrix2;
use serde::{Deserialize, Serialize};

use crate::error::{OpticsError, OpticsResult};

/// Transverse axis of an astigmatic system.
///
/// Off-normal incidence on a spherical mirror focuses the horizontal
/// (tangential) and vertical (sagittal) planes differently, so every system
/// is built once per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Horizontal, Axis::Vertical];

    /// Short tag used in file names and plot legends.
    pub fn short_name(self) -> &'static str {
        match self {
            Axis::Horizontal => "hor",
            Axis::Vertical => "ver",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "horizontal"),
            Axis::Vertical => write!(f, "vertical"),
        }
    }
}

/// A realised 2×2 ray-transfer matrix `[[A, B], [C, D]]`.
///
/// Immutable value type: element matrices are produced fresh from their
/// descriptors whenever the geometry changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementMatrix(Matrix2<f64>);

impl ElementMatrix {
    /// Build a matrix from its entries in row-major order.
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self(Matrix2::new(a, b, c, d))
    }

    pub fn identity() -> Self {
        Self(Matrix2::identity())
    }

    pub fn a(&self) -> f64 {
        self.0[(0, 0)]
    }

    pub fn b(&self) -> f64 {
        self.0[(0, 1)]
    }

    pub fn c(&self) -> f64 {
        self.0[(1, 0)]
    }

    pub fn d(&self) -> f64 {
        self.0[(1, 1)]
    }

    /// $AD - BC$. Unity for lossless elements, $n_1/n_2$ for refraction.
    pub fn determinant(&self) -> f64 {
        self.0.determinant()
    }

    /// Half the trace, $(A + D)/2$. A round trip is stable when this lies in
    /// $[-1, 1]$.
    pub fn half_trace(&self) -> f64 {
        0.5 * (self.a() + self.d())
    }

    /// True for an exact identity matrix (a zero-length marker).
    pub fn is_identity(&self) -> bool {
        self.0 == Matrix2::identity()
    }

    /// Borrow the underlying `nalgebra` matrix.
    pub fn as_matrix(&self) -> &Matrix2<f64> {
        &self.0
    }
}

impl Default for ElementMatrix {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Matrix2<f64>> for ElementMatrix {
    fn from(m: Matrix2<f64>) -> Self {
        Self(m)
    }
}

impl Mul for ElementMatrix {
    type Output = ElementMatrix;

    fn mul(self, rhs: ElementMatrix) -> ElementMatrix {
        ElementMatrix(self.0 * rhs.0)
    }
}

/// Free-space propagation over an optical path `length` (metres, `d·n`).
///
/// Negative lengths are accepted here; reject them where user input enters
/// the system.
pub fn free_space(length: f64) -> ElementMatrix {
    ElementMatrix::new(1.0, length, 0.0, 1.0)
}

/// Thin lens of focal length `focal_length` (metres).
///
/// An infinite focal length gives the identity. Zero is rejected.
pub fn thin_lens(focal_length: f64) -> OpticsResult<ElementMatrix> {
    if focal_length == 0.0 || focal_length.is_nan() {
        return Err(OpticsError::InvalidElementParameter(format!(
            "thin lens focal length must be non-zero, got {focal_length}"
        )));
    }
    Ok(ElementMatrix::new(1.0, 0.0, -1.0 / focal_length, 1.0))
}

/// Spherical mirror of radius `radius` hit at `incidence_angle` (radians).
///
/// The effective focal length is `R·cosθ/2` in the horizontal plane and
/// `R/(2·cosθ)` in the vertical plane, so the two axes differ by `cos²θ`.
pub fn curved_mirror(radius: f64, incidence_angle: f64, axis: Axis) -> OpticsResult<ElementMatrix> {
    if radius == 0.0 || radius.is_nan() {
        return Err(OpticsError::InvalidElementParameter(format!(
            "mirror radius of curvature must be non-zero, got {radius}"
        )));
    }
    let cos_theta = incidence_angle.cos();
    if !(cos_theta > 0.0) {
        return Err(OpticsError::InvalidElementParameter(format!(
            "mirror incidence angle must lie strictly within ±90°, got {:.3}°",
            incidence_angle.to_degrees()
        )));
    }
    let c = match axis {
        Axis::Horizontal => -2.0 / (radius * cos_theta),
        Axis::Vertical => -2.0 * cos_theta / radius,
    };
    Ok(ElementMatrix::new(1.0, 0.0, c, 1.0))
}

/// Refraction at a flat interface from index `n1` into index `n2`.
pub fn flat_refraction(n1: f64, n2: f64) -> OpticsResult<ElementMatrix> {
    for (name, n) in [("n1", n1), ("n2", n2)] {
        if !(n > 0.0) || !n.is_finite() {
            return Err(OpticsError::InvalidElementParameter(format!(
                "refractive index {name} must be positive and finite, got {n}"
            )));
        }
    }
    Ok(ElementMatrix::new(1.0, 0.0, 0.0, n1 / n2))
}

/// No-op element, substituted when a component is disabled for one axis.
pub fn identity() -> ElementMatrix {
    ElementMatrix::identity()
}

/// A closed description of one optical element.
///
/// Each variant resolves to exactly one [`ElementMatrix`]. Descriptors are
/// resolved when the system is built, so an unknown element type cannot
/// appear at propagation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElementDescriptor {
    /// Free space over an optical path length (metres).
    FreeSpace { length: f64 },
    /// Thin lens with focal length (metres).
    ThinLens { focal_length: f64 },
    /// Spherical mirror; `incidence_angle` in radians.
    CurvedMirror {
        radius: f64,
        incidence_angle: f64,
        axis: Axis,
    },
    /// Flat refractive interface from `n1` into `n2`.
    FlatRefraction { n1: f64, n2: f64 },
    /// Plane fold mirror: identity matrix, but reflective.
    FlatMirror,
    Identity,
}

impl ElementDescriptor {
    /// Resolve the descriptor to its ray-transfer matrix.
    pub fn matrix(&self) -> OpticsResult<ElementMatrix> {
        match *self {
            ElementDescriptor::FreeSpace { length } => Ok(free_space(length)),
            ElementDescriptor::ThinLens { focal_length } => thin_lens(focal_length),
            ElementDescriptor::CurvedMirror {
                radius,
                incidence_angle,
                axis,
            } => curved_mirror(radius, incidence_angle, axis),
            ElementDescriptor::FlatRefraction { n1, n2 } => flat_refraction(n1, n2),
            ElementDescriptor::FlatMirror | ElementDescriptor::Identity => Ok(identity()),
        }
    }

    /// Whether the beam changes propagation direction at this element.
    pub fn is_reflective(&self) -> bool {
        matches!(
            self,
            ElementDescriptor::CurvedMirror { .. } | ElementDescriptor::FlatMirror
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            ElementDescriptor::FreeSpace { .. } => "free space",
            ElementDescriptor::ThinLens { .. } => "thin lens",
            ElementDescriptor::CurvedMirror { .. } => "curved mirror",
            ElementDescriptor::FlatRefraction { .. } => "flat refraction",
            ElementDescriptor::FlatMirror => "flat mirror",
            ElementDescriptor::Identity => "identity",
        }
    }
}
