//! Time-stepped state of one elastic body.

use nalgebra::DVector;

/// State vectors of a body, mutated once per completed time step.
///
/// Vector fields (displacement, velocity, acceleration) are
/// dimension-stacked over all mesh nodes; scalar fields (temperature,
/// electric potential) hold one entry per node. All zero-initialized.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyState {
    pub displacement: DVector<f64>,
    pub velocity: DVector<f64>,
    pub acceleration: DVector<f64>,
    pub temperature: DVector<f64>,
    pub electric_potential: DVector<f64>,
    dimension: usize,
    node_count: usize,
}

impl BodyState {
    pub fn new(node_count: usize, dimension: usize) -> Self {
        Self {
            displacement: DVector::zeros(dimension * node_count),
            velocity: DVector::zeros(dimension * node_count),
            acceleration: DVector::zeros(dimension * node_count),
            temperature: DVector::zeros(node_count),
            electric_potential: DVector::zeros(node_count),
            dimension,
            node_count,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Advance one time step with the solved acceleration:
    /// `v += dt * a`, then `u += dt * v` (velocity-first update).
    pub fn advance(&mut self, acceleration: &DVector<f64>, time_step: f64) {
        debug_assert_eq!(acceleration.len(), self.velocity.len());
        self.velocity += time_step * acceleration;
        self.displacement += time_step * &self.velocity;
        self.acceleration = acceleration.clone();
    }

    /// Advance the scalar temperature field after a thermal solve.
    pub fn advance_temperature(&mut self, temperature: &DVector<f64>) {
        debug_assert_eq!(temperature.len(), self.temperature.len());
        self.temperature = temperature.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let state = BodyState::new(4, 2);
        assert_eq!(state.displacement.len(), 8);
        assert_eq!(state.temperature.len(), 4);
        assert!(state.velocity.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn advance_is_velocity_first() {
        let mut state = BodyState::new(1, 2);
        let a = DVector::from_vec(vec![1.0, 2.0]);
        state.advance(&a, 0.5);
        // v = 0 + 0.5 * a, u = 0 + 0.5 * v
        assert_eq!(state.velocity.as_slice(), &[0.5, 1.0]);
        assert_eq!(state.displacement.as_slice(), &[0.25, 0.5]);
        assert_eq!(state.acceleration.as_slice(), &[1.0, 2.0]);
    }
}
