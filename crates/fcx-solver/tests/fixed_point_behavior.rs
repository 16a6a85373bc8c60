/// Integration tests for the outer fixed-point loop
///
/// Uses instrumented mock minimizers to pin down the loop semantics:
/// the default (infinite) tolerance runs exactly one inner solve, a
/// finite tolerance iterates until the boundary iterate settles, and an
/// exhausted budget surfaces as a typed non-convergence error.
use fcx_model::{BodyProperties, BodyState, DofClass, DofPartition, Mesh};
use fcx_solver::{
    ContactSolver, ContactSolverConfig, CostFunctional, CostVariant, DynamicsContext,
    MinimizeError, Minimizer, Objective, QuadraticResistance, SolverError,
};
use nalgebra::DVector;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Returns its input untouched, counting invocations.
struct CountingMinimizer {
    calls: Arc<AtomicUsize>,
}

impl Minimizer for CountingMinimizer {
    fn minimize(
        &self,
        _objective: &Objective<'_>,
        initial: DVector<f64>,
    ) -> Result<DVector<f64>, MinimizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(initial)
    }
}

/// Moves every entry by a fixed offset on each call, so consecutive
/// outer iterates never settle.
struct DriftingMinimizer {
    offset: f64,
}

impl Minimizer for DriftingMinimizer {
    fn minimize(
        &self,
        _objective: &Objective<'_>,
        initial: DVector<f64>,
    ) -> Result<DVector<f64>, MinimizeError> {
        Ok(initial.add_scalar(self.offset))
    }
}

/// Halves the distance to a fixed target on each call; the outer
/// iterates converge geometrically.
struct ContractingMinimizer {
    target: f64,
}

impl Minimizer for ContractingMinimizer {
    fn minimize(
        &self,
        _objective: &Objective<'_>,
        initial: DVector<f64>,
    ) -> Result<DVector<f64>, MinimizeError> {
        Ok(initial.map(|x| x + 0.5 * (self.target - x)))
    }
}

fn square_context() -> DynamicsContext {
    let mesh = Mesh::new(
        2,
        vec![
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![1.0, 0.0]),
            DVector::from_vec(vec![1.0, 1.0]),
            DVector::from_vec(vec![0.0, 1.0]),
        ],
        vec![vec![0, 1, 2], vec![0, 2, 3]],
    )
    .unwrap();
    let partition = DofPartition::from_classifier(4, |node| match node {
        0 | 1 => DofClass::Contact,
        _ => DofClass::Free,
    });
    let props = BodyProperties::viscoelastic(1.0, 4.0, 4.0, 0.5, 0.25);
    DynamicsContext::new(mesh, props, partition, 0.1).unwrap()
}

fn solver_with(minimizer: Box<dyn Minimizer>, config: ContactSolverConfig) -> ContactSolver {
    let law = Arc::new(QuadraticResistance { hardness: 1.0 });
    let functional = CostFunctional::new(CostVariant::Mechanical2d, law);
    ContactSolver::new(functional, minimizer, config)
}

#[test]
fn default_tolerance_runs_exactly_one_inner_solve() {
    let ctx = square_context();
    let calls = Arc::new(AtomicUsize::new(0));
    let solver = solver_with(
        Box::new(CountingMinimizer {
            calls: Arc::clone(&calls),
        }),
        ContactSolverConfig::default(),
    );

    let mut state = BodyState::new(4, 2);
    let forces = DVector::zeros(8);
    let report = solver.solve_step(&ctx, None, &mut state, &forces).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(report.outer_iterations, 1);
    assert_eq!(report.change_norm, 0.0);
}

#[test]
fn exhausted_budget_is_a_typed_nonconvergence() {
    let ctx = square_context();
    let solver = solver_with(
        Box::new(DriftingMinimizer { offset: 1.0 }),
        ContactSolverConfig {
            fixed_point_abs_tol: 1e-12,
            max_outer_iterations: 5,
        },
    );

    let mut state = BodyState::new(4, 2);
    let forces = DVector::zeros(8);
    let result = solver.solve_step(&ctx, None, &mut state, &forces);

    match result {
        Err(SolverError::NonConvergence {
            iterations,
            change_norm,
        }) => {
            assert_eq!(iterations, 5);
            assert!(change_norm > 0.0);
        }
        other => panic!("expected NonConvergence, got {:?}", other.map(|_| ())),
    }
    // Failed steps leave the state untouched
    assert_eq!(state, BodyState::new(4, 2));
}

#[test]
fn finite_tolerance_iterates_until_the_change_settles() {
    let ctx = square_context();
    let solver = solver_with(
        Box::new(ContractingMinimizer { target: 2.0 }),
        ContactSolverConfig {
            fixed_point_abs_tol: 1e-3,
            max_outer_iterations: 50,
        },
    );

    let mut state = BodyState::new(4, 2);
    let forces = DVector::zeros(8);
    let report = solver.solve_step(&ctx, None, &mut state, &forces).unwrap();

    // Starting from zero on 4 boundary DOFs, the change norm of pass k
    // is 2 * 2^-k * 2 = 2^(2-k); it first drops below 1e-3 at k = 12.
    assert_eq!(report.outer_iterations, 12);
    assert!(report.change_norm < 1e-3);
}
