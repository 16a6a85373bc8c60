//! Error types for the contact engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SolverError>;

/// Failure conditions of assembly, reduction, and the contact solve.
///
/// Assembly and reduction errors abort the step before any operator is
/// cached. `NonConvergence` is a typed outcome the caller can react to
/// (relax the tolerance, shrink the time step, or abort); it is never
/// downgraded to a default value.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("element {element} has non-positive measure {measure:.3e}; mesh requires repair")]
    DegenerateMesh { element: usize, measure: f64 },

    #[error("free-free block is numerically singular for the current coefficients/partition")]
    SingularReduction,

    #[error(
        "fixed-point loop exceeded {iterations} iterations (last change norm {change_norm:.3e})"
    )]
    NonConvergence {
        iterations: usize,
        change_norm: f64,
    },

    #[error("minimizer produced non-finite values")]
    NumericalFailure,
}
