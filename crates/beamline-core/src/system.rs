//! Ordered optical systems and composite-matrix construction.
//!
//! An [`OrderedSystem`] lists its entries in *physical* order: the element
//! the beam meets first comes first. The ray-transfer convention multiplies
//! in the opposite order,
//!
//! $$ M_{\text{total}} = M_n \cdots M_2 M_1 , $$
//!
//! so [`composite_matrix`] folds over a reversed iterator while the tracer
//! walks forwards. Neither touches the caller's sequence.

use serde::{Deserialize, Serialize};

use crate::error::OpticsResult;
use crate::matrix::{ElementDescriptor, ElementMatrix};

/// One entry of an ordered system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemEntry {
    /// A realised element. `reflective` marks mirrors for the tracer's
    /// direction policy; it never affects the matrix algebra.
    Element {
        matrix: ElementMatrix,
        #[serde(default)]
        reflective: bool,
    },
    /// A named point at which the tracer records the beam parameter.
    Label(String),
}

/// An ordered sequence of element matrices and recording labels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderedSystem {
    entries: Vec<SystemEntry>,
}

impl OrderedSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve descriptors, in physical order, into a system.
    pub fn from_descriptors(descriptors: &[ElementDescriptor]) -> OpticsResult<Self> {
        let mut system = Self::new();
        for descriptor in descriptors {
            system.push_descriptor(descriptor)?;
        }
        Ok(system)
    }

    /// Append a non-reflective element.
    pub fn push(&mut self, matrix: ElementMatrix) {
        self.entries.push(SystemEntry::Element {
            matrix,
            reflective: false,
        });
    }

    /// Append a reflective element (mirror).
    pub fn push_mirror(&mut self, matrix: ElementMatrix) {
        self.entries.push(SystemEntry::Element {
            matrix,
            reflective: true,
        });
    }

    /// Resolve a descriptor and append it, carrying its reflective tag.
    pub fn push_descriptor(&mut self, descriptor: &ElementDescriptor) -> OpticsResult<()> {
        let matrix = descriptor.matrix()?;
        self.entries.push(SystemEntry::Element {
            matrix,
            reflective: descriptor.is_reflective(),
        });
        Ok(())
    }

    pub fn push_label(&mut self, label: impl Into<String>) {
        self.entries.push(SystemEntry::Label(label.into()));
    }

    pub fn entries(&self) -> &[SystemEntry] {
        &self.entries
    }

    /// Element matrices in physical order, labels skipped.
    pub fn matrices(&self) -> impl DoubleEndedIterator<Item = &ElementMatrix> + '_ {
        self.entries.iter().filter_map(|entry| match entry {
            SystemEntry::Element { matrix, .. } => Some(matrix),
            SystemEntry::Label(_) => None,
        })
    }

    /// Number of element entries (labels excluded).
    pub fn element_count(&self) -> usize {
        self.matrices().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Composite matrix of the whole system, labels ignored.
    pub fn composite(&self) -> ElementMatrix {
        fold_reversed(self.matrices())
    }

    /// Sum of the free-space path lengths (the `B` entries of matrices with
    /// `A = D = 1`, `C = 0`).
    pub fn optical_path_length(&self) -> f64 {
        self.matrices()
            .filter(|m| m.a() == 1.0 && m.c() == 0.0 && m.d() == 1.0)
            .map(|m| m.b())
            .sum()
    }
}

/// Map each descriptor to its matrix, preserving order.
pub fn build_matrix_list(descriptors: &[ElementDescriptor]) -> OpticsResult<Vec<ElementMatrix>> {
    descriptors.iter().map(ElementDescriptor::matrix).collect()
}

/// Ordered product `M_n · … · M_1` of matrices given in physical order.
pub fn composite_matrix(matrices: &[ElementMatrix]) -> ElementMatrix {
    fold_reversed(matrices.iter())
}

fn fold_reversed<'a, I>(matrices: I) -> ElementMatrix
where
    I: DoubleEndedIterator<Item = &'a ElementMatrix>,
{
    matrices
        .rev()
        .fold(ElementMatrix::identity(), |acc, &m| acc * m)
}
