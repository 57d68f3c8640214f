//! Error taxonomy for the optics engine.
//!
//! Element and beam-parameter errors are surfaced immediately so a caller can
//! flag the offending input. Sampling failures inside a trace are *not*
//! errors: the tracer zero-fills the affected samples and carries on (see
//! [`crate::trace`]).

use thiserror::Error;

/// Errors that can occur while building or propagating through an optical system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OpticsError {
    #[error("Invalid element parameter: {0}")]
    InvalidElementParameter(String),

    #[error("Invalid beam parameter: {0}")]
    InvalidBeamParameter(String),

    #[error("Degenerate ray matrix: {0}")]
    InvalidMatrix(String),

    #[error("Cavity has no stable eigenmode: {0}")]
    CavityDivergent(String),
}

pub type OpticsResult<T> = Result<T, OpticsError>;
