//! Numerical engine for frictional-contact elastodynamics.
//!
//! The pipeline per configured body: assemble the P1 simplex operators
//! ([`assembly`]), combine them into the implicit step operator and
//! condense it onto the contact boundary ([`schur`], [`dynamics`]),
//! then advance time steps by minimizing a contact-aware cost
//! functional on the condensed boundary ([`contact`], [`cost`],
//! [`minimize`], [`solver`]).
//!
//! Domain data (meshes, partitions, materials, state, obstacles) lives
//! in the companion `fcx-model` crate.

pub mod assembly;
pub mod contact;
pub mod cost;
pub mod dynamics;
pub mod error;
pub mod minimize;
pub mod schur;
pub mod solver;

pub use assembly::{assemble_dynamics, DynamicsOperators};
pub use contact::{ContactLaw, FrictionalResistance, QuadraticResistance, ThermalResistance};
pub use cost::{CostArgs, CostFunctional, CostVariant};
pub use dynamics::{DynamicsContext, ThermalSystem};
pub use error::{Result, SolverError};
pub use minimize::{Bfgs, MinimizeError, Minimizer, Objective, QuasiSecant};
pub use schur::CondensedSystem;
pub use solver::{ContactSolver, ContactSolverConfig, StepReport};
