//! Pluggable unconstrained minimizers for the contact objective.
//!
//! The objective encodes the non-smooth contact/friction penalty
//! itself, so no explicit constraints are imposed; any implementation
//! accepting the same objective signature and starting point can be
//! swapped in. Two are provided: a general-purpose quasi-Newton (BFGS
//! with Armijo backtracking) and a two-point secant stepper tolerant of
//! the non-smooth term. Gradients are central differences, evaluated in
//! parallel across coordinates.
//!
//! Iteration caps are the caller's hard budget: exhausting them returns
//! the best iterate found. Non-finite objective or gradient values are
//! a failure, never masked as convergence.

use log::trace;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Objective signature shared by all minimizers.
pub type Objective<'a> = dyn Fn(&DVector<f64>) -> f64 + Sync + 'a;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinimizeError {
    #[error("objective or gradient produced non-finite values")]
    NotFinite,
}

/// A swappable inner solver: minimize the objective from a starting
/// point, returning an (approximately) stationary point.
pub trait Minimizer: Send + Sync {
    fn minimize(
        &self,
        objective: &Objective<'_>,
        initial: DVector<f64>,
    ) -> Result<DVector<f64>, MinimizeError>;
}

/// Central-difference gradient, one coordinate per rayon task.
fn numerical_gradient(
    objective: &Objective<'_>,
    point: &DVector<f64>,
    relative_step: f64,
) -> Result<DVector<f64>, MinimizeError> {
    let entries: Vec<f64> = (0..point.len())
        .into_par_iter()
        .map(|i| {
            let h = relative_step * point[i].abs().max(1.0);
            let mut forward = point.clone();
            let mut backward = point.clone();
            forward[i] += h;
            backward[i] -= h;
            (objective(&forward) - objective(&backward)) / (2.0 * h)
        })
        .collect();
    let gradient = DVector::from_vec(entries);
    if gradient.iter().all(|g| g.is_finite()) {
        Ok(gradient)
    } else {
        Err(MinimizeError::NotFinite)
    }
}

/// Dense-inverse-Hessian BFGS with Armijo backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bfgs {
    pub max_iterations: usize,
    /// Stop when the gradient norm drops below this
    pub gradient_tol: f64,
    /// Stop when the accepted step is shorter than this
    pub step_tol: f64,
    /// Relative finite-difference step
    pub gradient_step: f64,
    /// Armijo sufficient-decrease parameter
    pub armijo_param: f64,
    /// Smallest backtracking step before giving up on the direction
    pub min_step_size: f64,
}

impl Default for Bfgs {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            gradient_tol: 1e-9,
            step_tol: 1e-14,
            gradient_step: 1e-6,
            armijo_param: 1e-4,
            min_step_size: 1e-12,
        }
    }
}

impl Minimizer for Bfgs {
    fn minimize(
        &self,
        objective: &Objective<'_>,
        initial: DVector<f64>,
    ) -> Result<DVector<f64>, MinimizeError> {
        let n = initial.len();
        if n == 0 {
            return Ok(initial);
        }

        let mut x = initial;
        let mut value = objective(&x);
        if !value.is_finite() {
            return Err(MinimizeError::NotFinite);
        }
        let mut gradient = numerical_gradient(objective, &x, self.gradient_step)?;
        let mut inverse_hessian = DMatrix::<f64>::identity(n, n);

        for iteration in 0..self.max_iterations {
            if gradient.norm() < self.gradient_tol {
                trace!("bfgs converged after {} iterations", iteration);
                break;
            }

            let mut direction = -(&inverse_hessian * &gradient);
            let mut slope = direction.dot(&gradient);
            if slope >= 0.0 {
                // Curvature information went stale (non-smooth kink);
                // restart from steepest descent.
                inverse_hessian = DMatrix::identity(n, n);
                direction = -gradient.clone();
                slope = -gradient.norm_squared();
            }

            // Backtracking line search with the Armijo condition.
            let mut alpha = 1.0;
            let mut candidate;
            let mut candidate_value;
            loop {
                candidate = &x + alpha * &direction;
                candidate_value = objective(&candidate);
                if !candidate_value.is_finite() {
                    return Err(MinimizeError::NotFinite);
                }
                if candidate_value <= value + self.armijo_param * alpha * slope {
                    break;
                }
                alpha *= 0.5;
                if alpha < self.min_step_size {
                    break;
                }
            }
            if alpha < self.min_step_size && candidate_value > value {
                // No descent along any tested step: stationary enough.
                break;
            }

            let next_gradient = numerical_gradient(objective, &candidate, self.gradient_step)?;
            let step = &candidate - &x;
            let gradient_change = &next_gradient - &gradient;
            let curvature = step.dot(&gradient_change);
            if curvature > 1e-12 {
                let rho = 1.0 / curvature;
                let identity = DMatrix::<f64>::identity(n, n);
                let left = &identity - rho * (&step * gradient_change.transpose());
                let right = &identity - rho * (&gradient_change * step.transpose());
                inverse_hessian =
                    &left * inverse_hessian * &right + rho * (&step * step.transpose());
            }

            let step_norm = step.norm();
            x = candidate;
            value = candidate_value;
            gradient = next_gradient;
            if step_norm < self.step_tol {
                break;
            }
        }
        Ok(x)
    }
}

/// Two-point secant stepper (Barzilai-Borwein) with a nonmonotone
/// safeguard: the best iterate seen is tracked and returned, which
/// keeps the method usable on the non-smooth contact term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuasiSecant {
    pub max_iterations: usize,
    pub gradient_tol: f64,
    pub step_tol: f64,
    pub gradient_step: f64,
    /// First step length, before secant information exists
    pub initial_step: f64,
    /// Clamp on the secant step length
    pub max_step: f64,
}

impl Default for QuasiSecant {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            gradient_tol: 1e-9,
            step_tol: 1e-14,
            gradient_step: 1e-6,
            initial_step: 1e-2,
            max_step: 1e3,
        }
    }
}

impl Minimizer for QuasiSecant {
    fn minimize(
        &self,
        objective: &Objective<'_>,
        initial: DVector<f64>,
    ) -> Result<DVector<f64>, MinimizeError> {
        if initial.is_empty() {
            return Ok(initial);
        }

        let mut x = initial;
        let mut value = objective(&x);
        if !value.is_finite() {
            return Err(MinimizeError::NotFinite);
        }
        let mut gradient = numerical_gradient(objective, &x, self.gradient_step)?;
        let mut best_x = x.clone();
        let mut best_value = value;
        let mut alpha = self.initial_step;

        for iteration in 0..self.max_iterations {
            if gradient.norm() < self.gradient_tol {
                trace!("quasi-secant converged after {} iterations", iteration);
                break;
            }

            let candidate = &x - alpha * &gradient;
            value = objective(&candidate);
            if !value.is_finite() {
                return Err(MinimizeError::NotFinite);
            }
            let next_gradient = numerical_gradient(objective, &candidate, self.gradient_step)?;

            let step = &candidate - &x;
            let gradient_change = &next_gradient - &gradient;
            let denominator = gradient_change.norm_squared();
            alpha = if denominator > 1e-30 {
                (step.dot(&gradient_change) / denominator)
                    .abs()
                    .clamp(1e-8, self.max_step)
            } else {
                self.initial_step
            };

            if value < best_value {
                best_value = value;
                best_x = candidate.clone();
            }

            let step_norm = step.norm();
            x = candidate;
            gradient = next_gradient;
            if step_norm < self.step_tol {
                break;
            }
        }
        Ok(best_x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifted_quadratic(x: &DVector<f64>) -> f64 {
        // minimum at (1, -2, 3)
        let target = [1.0, -2.0, 3.0];
        x.iter()
            .zip(target)
            .map(|(xi, t)| (xi - t) * (xi - t))
            .sum()
    }

    #[test]
    fn bfgs_finds_quadratic_minimum() {
        let minimizer = Bfgs::default();
        let solution = minimizer
            .minimize(&shifted_quadratic, DVector::zeros(3))
            .unwrap();
        assert!((solution[0] - 1.0).abs() < 1e-5);
        assert!((solution[1] + 2.0).abs() < 1e-5);
        assert!((solution[2] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn quasi_secant_finds_quadratic_minimum() {
        let minimizer = QuasiSecant::default();
        let solution = minimizer
            .minimize(&shifted_quadratic, DVector::zeros(3))
            .unwrap();
        assert!((solution[0] - 1.0).abs() < 1e-4);
        assert!((solution[1] + 2.0).abs() < 1e-4);
        assert!((solution[2] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn bfgs_handles_nonsmooth_kink() {
        // |x| + (x - 0)^2-ish: minimum at the kink
        let objective = |x: &DVector<f64>| x[0].abs() + 0.5 * (x[0] - 0.1) * (x[0] - 0.1);
        let minimizer = Bfgs::default();
        let solution = minimizer
            .minimize(&objective, DVector::from_vec(vec![5.0]))
            .unwrap();
        // Subdifferential at 0 contains the minimizer; accept a loose band
        assert!(solution[0].abs() < 1e-2);
    }

    #[test]
    fn non_finite_objective_is_an_error() {
        let objective = |_: &DVector<f64>| f64::NAN;
        let minimizer = Bfgs::default();
        let result = minimizer.minimize(&objective, DVector::zeros(2));
        assert_eq!(result.unwrap_err(), MinimizeError::NotFinite);
    }

    #[test]
    fn empty_unknown_is_a_no_op() {
        let objective = |_: &DVector<f64>| 0.0;
        let minimizer = Bfgs::default();
        let solution = minimizer.minimize(&objective, DVector::zeros(0)).unwrap();
        assert!(solution.is_empty());
    }
}
