/// End-to-end integration tests for the contact step pipeline
///
/// Tests the complete workflow: mesh → operator assembly → Schur
/// condensation → boundary minimization → back-substitution → state
/// update. Validates against direct dense solves of the same implicit
/// system.
use fcx_model::{BodyProperties, BodyState, DofClass, DofPartition, Mesh, Obstacle};
use fcx_solver::{
    Bfgs, ContactSolver, ContactSolverConfig, CondensedSystem, CostFunctional, CostVariant,
    DynamicsContext, QuadraticResistance,
};
use nalgebra::DVector;
use std::sync::Arc;

fn unit_square() -> Mesh {
    Mesh::new(
        2,
        vec![
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![1.0, 0.0]),
            DVector::from_vec(vec![1.0, 1.0]),
            DVector::from_vec(vec![0.0, 1.0]),
        ],
        vec![vec![0, 1, 2], vec![0, 2, 3]],
    )
    .unwrap()
}

fn bottom_contact_partition() -> DofPartition {
    DofPartition::from_classifier(4, |node| match node {
        0 | 1 => DofClass::Contact,
        3 => DofClass::Dirichlet,
        _ => DofClass::Free,
    })
}

fn default_solver(hardness: f64) -> ContactSolver {
    let law = Arc::new(QuadraticResistance { hardness });
    let functional = CostFunctional::new(CostVariant::Mechanical2d, law);
    ContactSolver::new(
        functional,
        Box::new(Bfgs::default()),
        ContactSolverConfig::default(),
    )
}

#[test]
fn condensed_solve_matches_direct_solve_on_assembled_operators() {
    let props = BodyProperties::viscoelastic(1.0, 4.0, 4.0, 0.5, 0.25);
    let ctx = DynamicsContext::new(unit_square(), props, bottom_contact_partition(), 0.1).unwrap();

    let rhs = DVector::from_fn(ctx.lhs().nrows(), |i, _| ((i * 7) % 5) as f64 - 2.0);
    let condensed = CondensedSystem::condense(
        ctx.lhs(),
        2,
        ctx.partition().contact_count(),
        ctx.partition().free_count(),
    )
    .unwrap();

    let (contact_rhs, free_rhs) = condensed.split(&rhs);
    let boundary_rhs = condensed.condense_rhs(&contact_rhs, &free_rhs);
    let boundary = condensed.boundary.clone().lu().solve(&boundary_rhs).unwrap();
    let free = condensed.recover_free(&free_rhs, &boundary);
    let merged = condensed.merge(&boundary, &free);

    let direct = ctx.lhs().clone().lu().solve(&rhs).unwrap();
    assert!((merged - direct).norm() < 1e-9);
}

#[test]
fn obstacle_free_step_matches_the_linear_implicit_solve() {
    // Without an obstacle the cost functional is a pure quadratic, so
    // the minimizer must reproduce the direct solve of lhs a = rhs.
    let props = BodyProperties::elastic(1.0, 4.0, 4.0);
    let ctx = DynamicsContext::new(unit_square(), props, bottom_contact_partition(), 0.1).unwrap();

    let mut state = BodyState::new(4, 2);
    let mut forces = DVector::zeros(8);
    for node in 0..4 {
        forces[4 + node] = -2.0; // uniform downward pull
    }

    let expected_independent = ctx
        .lhs()
        .clone()
        .lu()
        .solve(&ctx.step_rhs(&state, &forces))
        .unwrap();
    let expected = ctx.partition().scatter(&expected_independent, 2);

    let solver = default_solver(1.0);
    solver.solve_step(&ctx, None, &mut state, &forces).unwrap();

    assert!((state.acceleration.clone() - expected).norm() < 1e-4);
    // Velocity-first update from rest: v = dt a, u = dt v
    let dt = ctx.time_step();
    for i in 0..8 {
        assert!((state.velocity[i] - dt * state.acceleration[i]).abs() < 1e-12);
        assert!((state.displacement[i] - dt * state.velocity[i]).abs() < 1e-12);
    }
}

#[test]
fn single_triangle_step_is_a_linear_elastic_deflection() {
    // One element, one dirichlet vertex, no contact: one step is the
    // dense solve of (M + (V + dt E) dt) a = -V v - E (u + dt v) + f.
    let mesh = Mesh::new(
        2,
        vec![
            DVector::from_vec(vec![0.0, 0.0]),
            DVector::from_vec(vec![1.0, 0.0]),
            DVector::from_vec(vec![0.0, 1.0]),
        ],
        vec![vec![0, 1, 2]],
    )
    .unwrap();
    let partition = DofPartition::from_classifier(3, |node| {
        if node == 0 {
            DofClass::Dirichlet
        } else {
            DofClass::Free
        }
    });
    let props = BodyProperties::viscoelastic(1.0, 4.0, 4.0, 0.5, 0.25);
    let dt = 0.05;
    let ctx = DynamicsContext::new(mesh, props, partition, dt).unwrap();

    let mut state = BodyState::new(3, 2);
    state.displacement[3 + 1] = 0.01; // node 1 pulled up
    state.velocity[2] = -0.1; // node 2 moving left

    let mut forces = DVector::zeros(6);
    forces[3 + 2] = -1.0; // downward pull on node 2

    let expected_independent = ctx
        .lhs()
        .clone()
        .lu()
        .solve(&ctx.step_rhs(&state, &forces))
        .unwrap();
    let expected = ctx.partition().scatter(&expected_independent, 2);

    let solver = default_solver(1.0);
    let report = solver.solve_step(&ctx, None, &mut state, &forces).unwrap();

    assert_eq!(report.outer_iterations, 1);
    assert!((state.acceleration.clone() - expected).norm() < 1e-4);
    assert_eq!(state.acceleration[0], 0.0);
    assert_eq!(state.acceleration[3], 0.0);
}

#[test]
fn obstacle_resists_penetration() {
    // The bottom edge sits on a flat obstacle (normal +y). A downward
    // velocity would penetrate within one step; a hard obstacle must
    // push the contact nodes up relative to the unobstructed step.
    let props = BodyProperties::viscoelastic(1.0, 4.0, 4.0, 0.5, 0.25);
    let ctx = DynamicsContext::new(unit_square(), props, bottom_contact_partition(), 0.1).unwrap();

    let obstacle = Obstacle::new(
        vec![DVector::from_vec(vec![0.5, 0.0])],
        vec![DVector::from_vec(vec![0.0, 1.0])],
    )
    .unwrap();

    let mut pushed = BodyState::new(4, 2);
    for node in 0..4 {
        pushed.velocity[4 + node] = -1.0;
    }
    let mut unobstructed = pushed.clone();

    let forces = DVector::zeros(8);
    let solver = default_solver(1e4);
    solver
        .solve_step(&ctx, Some(&obstacle), &mut pushed, &forces)
        .unwrap();
    solver
        .solve_step(&ctx, None, &mut unobstructed, &forces)
        .unwrap();

    // Contact nodes 0 and 1: the obstacle pushes the bottom edge up.
    let lifted: f64 = [0usize, 1]
        .iter()
        .map(|&node| pushed.acceleration[4 + node] - unobstructed.acceleration[4 + node])
        .sum();
    assert!(lifted > 1.0, "expected upward push, got {}", lifted);
}

#[test]
fn dirichlet_dofs_are_exactly_zero_with_contact_active() {
    let props = BodyProperties::viscoelastic(1.0, 4.0, 4.0, 0.5, 0.25);
    let ctx = DynamicsContext::new(unit_square(), props, bottom_contact_partition(), 0.1).unwrap();

    let obstacle = Obstacle::new(
        vec![DVector::from_vec(vec![0.5, 0.0])],
        vec![DVector::from_vec(vec![0.0, 1.0])],
    )
    .unwrap();

    let mut state = BodyState::new(4, 2);
    for node in 0..4 {
        state.velocity[4 + node] = -1.0;
    }
    let mut forces = DVector::zeros(8);
    for node in 0..4 {
        forces[node] = 1.5;
        forces[4 + node] = -2.0;
    }

    let solver = default_solver(1e4);
    for _ in 0..3 {
        solver
            .solve_step(&ctx, Some(&obstacle), &mut state, &forces)
            .unwrap();
        // Node 3 is dirichlet: exactly zero on both axes, every field
        assert_eq!(state.acceleration[3], 0.0);
        assert_eq!(state.acceleration[4 + 3], 0.0);
        assert_eq!(state.velocity[3], 0.0);
        assert_eq!(state.velocity[4 + 3], 0.0);
        assert_eq!(state.displacement[3], 0.0);
        assert_eq!(state.displacement[4 + 3], 0.0);
    }
}

#[test]
fn thermal_step_relaxes_toward_uniform_temperature() {
    // Pure conduction with no sources: the implicit heat step must
    // contract the temperature spread and preserve sign ordering.
    let props = BodyProperties::viscoelastic(1.0, 4.0, 4.0, 0.5, 0.25).with_thermal(0.1, 2.0);
    let partition = DofPartition::from_classifier(4, |node| match node {
        0 | 1 => DofClass::Contact,
        _ => DofClass::Free,
    });
    let ctx = DynamicsContext::new(unit_square(), props, partition, 0.1).unwrap();
    let thermal = ctx.thermal().unwrap().clone();

    let mut state = BodyState::new(4, 2);
    state.temperature = DVector::from_vec(vec![1.0, -1.0, 1.0, -1.0]);
    let spread_before = state.temperature.max() - state.temperature.min();

    let solver = default_solver(0.0);
    let sources = DVector::zeros(4);
    solver
        .solve_temperature_step(&ctx, &thermal, &mut state, &sources)
        .unwrap();

    let spread_after = state.temperature.max() - state.temperature.min();
    assert!(spread_after < spread_before);
    assert!(spread_after > 0.0);
}
