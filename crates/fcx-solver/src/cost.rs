//! The scalar objective minimized by the contact solver.
//!
//! Every variant shares the same accumulation pattern: a quadratic core
//! `1/2 x' lhs x - x' rhs` over the condensed boundary unknown, plus a
//! contact-energy sum over boundary nodes weighted by each node's
//! boundary measure. Variants differ in dimensionality and in the
//! physics of the boundary term; the variant is dispatched once at
//! construction, never per evaluation.

use crate::contact::ContactLaw;
use nalgebra::{DMatrix, DVector};
use std::sync::Arc;

/// Physics/dimensionality of the cost functional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostVariant {
    /// Planar elastodynamics with obstacle contact (boundary measure =
    /// edge length)
    Mechanical2d,
    /// Solid elastodynamics with obstacle contact (boundary measure =
    /// face area)
    Mechanical3d,
    /// Boundary temperature with heat exchange
    Thermal,
    /// Boundary electric potential (piezoelectric coupling)
    Piezoelectric,
    /// Pure diffusion (static Poisson) with a normal potential on the
    /// scalar unknown
    Diffusion,
}

impl CostVariant {
    fn dimension(&self) -> usize {
        match self {
            CostVariant::Mechanical2d => 2,
            CostVariant::Mechanical3d => 3,
            _ => 1,
        }
    }
}

/// Inputs of one objective evaluation. Boundary arrays are aligned:
/// entry `b` describes the `b`-th contact node. Obstacle arrays may be
/// shorter (in particular empty when no obstacle is present); nodes
/// without an associated obstacle point contribute no contact energy.
pub struct CostArgs<'a> {
    /// Condensed boundary operator
    pub lhs: &'a DMatrix<f64>,
    /// Condensed right-hand side
    pub rhs: &'a DVector<f64>,
    /// Current (displaced) positions of contact nodes
    pub boundary_nodes: &'a [DVector<f64>],
    /// Outward unit normals of the body surface at contact nodes
    pub boundary_normals: &'a [DVector<f64>],
    /// Nearest obstacle point per contact node
    pub obstacle_nodes: &'a [DVector<f64>],
    /// Outward obstacle normal per contact node
    pub obstacle_normals: &'a [DVector<f64>],
    /// Current velocity of contact nodes, dimension-stacked
    pub boundary_velocity: &'a DVector<f64>,
    /// Boundary measure carried by each contact node
    pub boundary_measures: &'a DVector<f64>,
    pub time_step: f64,
}

/// A cost functional bound to one contact law.
pub struct CostFunctional {
    variant: CostVariant,
    law: Arc<dyn ContactLaw>,
}

impl CostFunctional {
    pub fn new(variant: CostVariant, law: Arc<dyn ContactLaw>) -> Self {
        Self { variant, law }
    }

    pub fn variant(&self) -> CostVariant {
        self.variant
    }

    pub fn law(&self) -> Arc<dyn ContactLaw> {
        Arc::clone(&self.law)
    }

    /// Evaluate the objective at `candidate` (the boundary acceleration
    /// for mechanical variants, the boundary scalar field otherwise).
    /// Finite and sub-differentiable everywhere by construction of the
    /// law's potentials.
    pub fn evaluate(&self, candidate: &DVector<f64>, args: &CostArgs<'_>) -> f64 {
        let quadratic = 0.5 * candidate.dot(&(args.lhs * candidate)) - candidate.dot(args.rhs);
        let boundary = match self.variant {
            CostVariant::Mechanical2d | CostVariant::Mechanical3d => {
                self.contact_energy(candidate, args)
            }
            CostVariant::Thermal | CostVariant::Piezoelectric => args
                .boundary_measures
                .iter()
                .zip(candidate.iter())
                .map(|(&measure, &value)| measure * self.law.exchange_potential(value))
                .sum(),
            CostVariant::Diffusion => args
                .boundary_measures
                .iter()
                .zip(candidate.iter())
                .map(|(&measure, &value)| measure * self.law.normal_potential(value))
                .sum(),
        };
        quadratic + boundary
    }

    /// Obstacle contact energy of the mechanical variants: per node,
    /// advance the position by `dt * (v + dt * a)`, project the gap on
    /// the obstacle normal, clip to non-negative penetration, and
    /// accumulate `measure * (jn(depth) + h(depth) * jt(slip))`.
    fn contact_energy(&self, acceleration: &DVector<f64>, args: &CostArgs<'_>) -> f64 {
        let dim = self.variant.dimension();
        let count = args.boundary_nodes.len();
        let dt = args.time_step;
        let friction = self.law.has_friction();

        let mut energy = 0.0;
        let mut velocity = vec![0.0; dim];
        let mut slip = vec![0.0; dim];

        for b in 0..count.min(args.obstacle_nodes.len()) {
            let node = &args.boundary_nodes[b];
            let obstacle_node = &args.obstacle_nodes[b];
            let obstacle_normal = &args.obstacle_normals[b];

            let mut gap = 0.0;
            for a in 0..dim {
                velocity[a] =
                    args.boundary_velocity[a * count + b] + dt * acceleration[a * count + b];
                let position = node[a] + dt * velocity[a];
                gap += (position - obstacle_node[a]) * obstacle_normal[a];
            }
            let depth = (-gap).max(0.0);

            let mut node_energy = self.law.normal_potential(depth);
            if friction {
                let body_normal = &args.boundary_normals[b];
                let mut along_normal = 0.0;
                for a in 0..dim {
                    along_normal += velocity[a] * body_normal[a];
                }
                for a in 0..dim {
                    slip[a] = velocity[a] - along_normal * body_normal[a];
                }
                node_energy +=
                    self.law.friction_bound(depth) * self.law.tangential_potential(&slip[..dim]);
            }
            energy += args.boundary_measures[b] * node_energy;
        }
        energy
    }
}
