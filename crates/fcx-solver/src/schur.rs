//! Schur complement condensation of a global operator onto contact DOFs.
//!
//! Given an operator over the independent layout (contact nodes first,
//! then free, dimension-stacked), the reducer eliminates the free
//! unknowns:
//!
//! ```text
//! boundary = A_cc - A_cf * A_ff^-1 * A_fc
//! ```
//!
//! keeping the coupling blocks and the free-free inverse so free DOFs
//! are recovered from a solved boundary vector by back-substitution.
//! The condensed system is reusable across time steps until the
//! operator or the partition changes.

use crate::assembly::submatrix;
use crate::error::{Result, SolverError};
use log::trace;
use nalgebra::{DMatrix, DVector};

/// The condensed boundary operator and everything needed for
/// back-substitution.
#[derive(Debug, Clone, PartialEq)]
pub struct CondensedSystem {
    /// Schur complement over contact DOFs (`dim * contact` square)
    pub boundary: DMatrix<f64>,
    /// Contact rows × free columns coupling block (A_cf)
    pub contact_x_free: DMatrix<f64>,
    /// Free rows × contact columns coupling block (A_fc)
    pub free_x_contact: DMatrix<f64>,
    /// Inverse of the free-free block
    pub free_x_free_inverted: DMatrix<f64>,
    dimension: usize,
    contact_count: usize,
    free_count: usize,
}

impl CondensedSystem {
    /// Condense `matrix` (independent layout) onto the first
    /// `contact_count` nodes of each axis.
    ///
    /// An empty contact set is a well-defined degenerate path: the
    /// boundary operator is 0×0 and back-substitution reduces to the
    /// plain free solve.
    ///
    /// # Errors
    /// `SingularReduction` if the free-free block is not invertible;
    /// this is fatal for the current coefficients/partition and is
    /// never regularized away.
    pub fn condense(
        matrix: &DMatrix<f64>,
        dimension: usize,
        contact_count: usize,
        free_count: usize,
    ) -> Result<Self> {
        let stride = contact_count + free_count;
        debug_assert_eq!(matrix.nrows(), dimension * stride);
        debug_assert_eq!(matrix.ncols(), dimension * stride);

        let contact_dofs = expanded_range(0, contact_count, dimension, stride);
        let free_dofs = expanded_range(contact_count, free_count, dimension, stride);

        let contact_x_contact = submatrix(matrix, &contact_dofs, &contact_dofs);
        let contact_x_free = submatrix(matrix, &contact_dofs, &free_dofs);
        let free_x_contact = submatrix(matrix, &free_dofs, &contact_dofs);
        let free_x_free = submatrix(matrix, &free_dofs, &free_dofs);

        let free_x_free_inverted = free_x_free
            .try_inverse()
            .ok_or(SolverError::SingularReduction)?;

        let boundary =
            &contact_x_contact - &contact_x_free * &free_x_free_inverted * &free_x_contact;
        trace!(
            "condensed {}x{} operator onto {} boundary DOFs",
            matrix.nrows(),
            matrix.ncols(),
            boundary.nrows()
        );

        Ok(Self {
            boundary,
            contact_x_free,
            free_x_contact,
            free_x_free_inverted,
            dimension,
            contact_count,
            free_count,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn contact_count(&self) -> usize {
        self.contact_count
    }

    pub fn free_count(&self) -> usize {
        self.free_count
    }

    /// Split an independent-layout vector into its contact and free
    /// parts, each dimension-stacked over its own node set.
    pub fn split(&self, vector: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
        let stride = self.contact_count + self.free_count;
        debug_assert_eq!(vector.len(), self.dimension * stride);
        let mut contact = DVector::zeros(self.dimension * self.contact_count);
        let mut free = DVector::zeros(self.dimension * self.free_count);
        for axis in 0..self.dimension {
            for p in 0..self.contact_count {
                contact[axis * self.contact_count + p] = vector[axis * stride + p];
            }
            for p in 0..self.free_count {
                free[axis * self.free_count + p] = vector[axis * stride + self.contact_count + p];
            }
        }
        (contact, free)
    }

    /// Merge contact and free parts back into the independent layout.
    pub fn merge(&self, contact: &DVector<f64>, free: &DVector<f64>) -> DVector<f64> {
        let stride = self.contact_count + self.free_count;
        let mut out = DVector::zeros(self.dimension * stride);
        for axis in 0..self.dimension {
            for p in 0..self.contact_count {
                out[axis * stride + p] = contact[axis * self.contact_count + p];
            }
            for p in 0..self.free_count {
                out[axis * stride + self.contact_count + p] = free[axis * self.free_count + p];
            }
        }
        out
    }

    /// Condensed right-hand side over the boundary:
    /// `rhs_c - A_cf * A_ff^-1 * rhs_f`.
    pub fn condense_rhs(&self, contact_rhs: &DVector<f64>, free_rhs: &DVector<f64>) -> DVector<f64> {
        contact_rhs - &self.contact_x_free * (&self.free_x_free_inverted * free_rhs)
    }

    /// Back-substitute free DOFs from a solved boundary vector:
    /// `A_ff^-1 * (rhs_f - A_fc * boundary_solution)`.
    pub fn recover_free(
        &self,
        free_rhs: &DVector<f64>,
        boundary_solution: &DVector<f64>,
    ) -> DVector<f64> {
        &self.free_x_free_inverted * (free_rhs - &self.free_x_contact * boundary_solution)
    }
}

/// DOF indices of `count` consecutive node positions starting at
/// `offset`, expanded over every axis with the given stride.
fn expanded_range(offset: usize, count: usize, dimension: usize, stride: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(dimension * count);
    for axis in 0..dimension {
        for p in 0..count {
            out.push(axis * stride + offset + p);
        }
    }
    out
}
