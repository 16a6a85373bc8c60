//! The per-step contact solver: condensed nonlinear solve on the
//! boundary, back-substitution of free DOFs, state update.
//!
//! Each step runs an outer fixed-point loop over the boundary
//! acceleration. One pass minimizes the cost functional for the current
//! contact configuration; the loop stops once the Euclidean change
//! between consecutive outer iterates drops below
//! `fixed_point_abs_tol`. The default tolerance is `+inf`, which makes
//! the loop run exactly one pass (the original engine's behavior);
//! tightening it buys fixed-point accuracy at the price of repeated
//! minimizations. Exhausting `max_outer_iterations` is a typed
//! `NonConvergence`, never a silently returned iterate.

use crate::cost::{CostArgs, CostFunctional, CostVariant};
use crate::dynamics::{DynamicsContext, ThermalSystem};
use crate::error::{Result, SolverError};
use crate::minimize::Minimizer;
use fcx_model::{BodyState, Obstacle};
use log::debug;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

/// Outer-loop settings of the contact solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactSolverConfig {
    /// Stop the fixed-point loop when the change between consecutive
    /// boundary iterates drops below this. `+inf` (the default) runs
    /// exactly one pass.
    pub fixed_point_abs_tol: f64,
    /// Hard budget of outer passes; exceeding it is `NonConvergence`.
    pub max_outer_iterations: usize,
}

impl Default for ContactSolverConfig {
    fn default() -> Self {
        Self {
            fixed_point_abs_tol: f64::INFINITY,
            max_outer_iterations: 20,
        }
    }
}

/// What one completed step cost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub outer_iterations: usize,
    /// Euclidean change of the last outer pass
    pub change_norm: f64,
}

/// A contact solver bound to one cost functional and one inner
/// minimizer.
pub struct ContactSolver {
    functional: CostFunctional,
    minimizer: Box<dyn Minimizer>,
    config: ContactSolverConfig,
}

impl ContactSolver {
    pub fn new(
        functional: CostFunctional,
        minimizer: Box<dyn Minimizer>,
        config: ContactSolverConfig,
    ) -> Self {
        Self {
            functional,
            minimizer,
            config,
        }
    }

    pub fn config(&self) -> &ContactSolverConfig {
        &self.config
    }

    /// Advance the mechanical state by one time step.
    ///
    /// `forces` is a full-mesh, dimension-stacked body force density;
    /// `obstacle` is optional (no obstacle means a plain implicit step).
    ///
    /// # Errors
    /// `NonConvergence` when the outer budget runs out before the
    /// tolerance is met, `NumericalFailure` when the minimizer hits
    /// non-finite values. The state is untouched on error.
    pub fn solve_step(
        &self,
        ctx: &DynamicsContext,
        obstacle: Option<&Obstacle>,
        state: &mut BodyState,
        forces: &DVector<f64>,
    ) -> Result<StepReport> {
        let dim = ctx.mesh().dimension;
        let condensed = ctx.condensed();

        let rhs = ctx.step_rhs(state, forces);
        let (contact_rhs, free_rhs) = condensed.split(&rhs);
        let boundary_rhs = condensed.condense_rhs(&contact_rhs, &free_rhs);

        // Contact geometry for this step, with the nearest obstacle
        // points refreshed against the displaced boundary.
        let positions = ctx.contact_positions(state);
        let velocity = ctx.contact_velocity(state);
        let surface = ctx.contact_surface();
        let (obstacle_nodes, obstacle_normals) = match obstacle {
            Some(obstacle) => {
                let nearest = obstacle.nearest_indices(&positions);
                let nodes: Vec<DVector<f64>> = nearest
                    .iter()
                    .map(|&i| obstacle.nodes()[i].clone())
                    .collect();
                let normals: Vec<DVector<f64>> = nearest
                    .iter()
                    .map(|&i| obstacle.normals()[i].clone())
                    .collect();
                (nodes, normals)
            }
            None => (Vec::new(), Vec::new()),
        };

        let args = CostArgs {
            lhs: &condensed.boundary,
            rhs: &boundary_rhs,
            boundary_nodes: &positions,
            boundary_normals: &surface.normals,
            obstacle_nodes: &obstacle_nodes,
            obstacle_normals: &obstacle_normals,
            boundary_velocity: &velocity,
            boundary_measures: &surface.measures,
            time_step: ctx.time_step(),
        };

        // Warm start from the previous step's boundary acceleration.
        let (initial, _) = condensed.split(&ctx.partition().gather(&state.acceleration, dim));
        let (boundary, report) = self.fixed_point(&args, initial)?;

        let free = condensed.recover_free(&free_rhs, &boundary);
        let merged = condensed.merge(&boundary, &free);
        let mut acceleration = ctx.partition().scatter(&merged, dim);
        zero_dirichlet(&mut acceleration, ctx, dim);

        state.advance(&acceleration, ctx.time_step());
        debug!(
            "step solved in {} outer pass(es), change {:.3e}",
            report.outer_iterations, report.change_norm
        );
        Ok(report)
    }

    /// Advance the temperature field of a thermally coupled body by one
    /// time step, mirroring the mechanical solve on the condensed heat
    /// system. Boundary heat exchange uses the same contact law.
    pub fn solve_temperature_step(
        &self,
        ctx: &DynamicsContext,
        thermal: &ThermalSystem,
        state: &mut BodyState,
        heat_sources: &DVector<f64>,
    ) -> Result<StepReport> {
        let condensed = &thermal.condensed;

        let rhs = ctx.thermal_rhs(state, heat_sources);
        let (contact_rhs, free_rhs) = condensed.split(&rhs);
        let boundary_rhs = condensed.condense_rhs(&contact_rhs, &free_rhs);

        let surface = ctx.contact_surface();
        let exchange = CostFunctional::new(CostVariant::Thermal, self.functional.law());
        let velocity = DVector::zeros(0);
        let args = CostArgs {
            lhs: &condensed.boundary,
            rhs: &boundary_rhs,
            boundary_nodes: &[],
            boundary_normals: &[],
            obstacle_nodes: &[],
            obstacle_normals: &[],
            boundary_velocity: &velocity,
            boundary_measures: &surface.measures,
            time_step: ctx.time_step(),
        };

        let (initial, _) = condensed.split(&ctx.partition().gather(&state.temperature, 1));
        let (boundary, report) = self.fixed_point_with(&exchange, &args, initial)?;

        let free = condensed.recover_free(&free_rhs, &boundary);
        let merged = condensed.merge(&boundary, &free);
        let mut temperature = ctx.partition().scatter(&merged, 1);
        zero_dirichlet(&mut temperature, ctx, 1);

        state.advance_temperature(&temperature);
        Ok(report)
    }

    fn fixed_point(
        &self,
        args: &CostArgs<'_>,
        initial: DVector<f64>,
    ) -> Result<(DVector<f64>, StepReport)> {
        self.fixed_point_with(&self.functional, args, initial)
    }

    /// The outer fixed-point loop. `inf >= inf` holds, so the default
    /// tolerance admits exactly one pass.
    fn fixed_point_with(
        &self,
        functional: &CostFunctional,
        args: &CostArgs<'_>,
        initial: DVector<f64>,
    ) -> Result<(DVector<f64>, StepReport)> {
        let mut boundary = initial;
        let mut change = f64::INFINITY;
        let mut outer = 0;

        while change >= self.config.fixed_point_abs_tol {
            if outer >= self.config.max_outer_iterations {
                return Err(SolverError::NonConvergence {
                    iterations: outer,
                    change_norm: change,
                });
            }
            let objective = |candidate: &DVector<f64>| functional.evaluate(candidate, args);
            let solution = self
                .minimizer
                .minimize(&objective, boundary.clone())
                .map_err(|_| SolverError::NumericalFailure)?;
            change = (&solution - &boundary).norm();
            boundary = solution;
            outer += 1;
        }

        Ok((
            boundary,
            StepReport {
                outer_iterations: outer,
                change_norm: change,
            },
        ))
    }
}

/// Force dirichlet DOFs to exactly zero on every axis. Scatter already
/// leaves them zero; this keeps the invariant explicit against future
/// layout changes.
fn zero_dirichlet(full: &mut DVector<f64>, ctx: &DynamicsContext, dimension: usize) {
    let n = ctx.partition().node_count();
    for &node in ctx.partition().dirichlet() {
        for axis in 0..dimension {
            full[axis * n + node] = 0.0;
        }
    }
}
