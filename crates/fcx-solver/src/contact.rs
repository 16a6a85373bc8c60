//! Contact laws: the potentials governing obstacle resistance.
//!
//! A law is selected once per scenario and consumed by the cost
//! functional. The capability set is a trait with defaulted optional
//! parts: every law provides the normal potential `jn`; friction adds
//! the bound `h` and the tangential potential `jt`; thermally and
//! electrically coupled variants add a scalar exchange potential.

/// Potentials of one contact law. All functions must be finite and
/// sub-differentiable everywhere; non-smoothness at zero penetration is
/// expected and handled by the minimizer.
pub trait ContactLaw: Send + Sync {
    /// Normal resistance potential `jn(depth)`; `depth >= 0`.
    fn normal_potential(&self, depth: f64) -> f64;

    /// Whether the law carries a tangential (friction) potential.
    fn has_friction(&self) -> bool {
        false
    }

    /// Friction bound `h(depth)`, the normal-force weight of the
    /// tangential term.
    fn friction_bound(&self, depth: f64) -> f64 {
        let _ = depth;
        0.0
    }

    /// Tangential potential `jt` of the slip velocity.
    fn tangential_potential(&self, slip: &[f64]) -> f64 {
        let _ = slip;
        0.0
    }

    /// Boundary exchange potential for thermally or electrically
    /// coupled variants, evaluated at the scalar unknown.
    fn exchange_potential(&self, value: f64) -> f64 {
        let _ = value;
        0.0
    }
}

/// Quadratic normal resistance: `jn(depth) = hardness * depth^2 / 2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadraticResistance {
    pub hardness: f64,
}

impl ContactLaw for QuadraticResistance {
    fn normal_potential(&self, depth: f64) -> f64 {
        self.hardness * 0.5 * depth * depth
    }
}

/// Quadratic normal resistance plus Coulomb-regularized friction.
///
/// The friction bound is the indicator-style weight `friction` once
/// penetration occurs; the tangential potential is the regularized slip
/// speed, smooth at zero slip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionalResistance {
    pub hardness: f64,
    pub friction: f64,
    /// Coulomb regularization parameter; keeps `jt` differentiable at
    /// zero slip
    pub slip_regularization: f64,
}

impl ContactLaw for FrictionalResistance {
    fn normal_potential(&self, depth: f64) -> f64 {
        self.hardness * 0.5 * depth * depth
    }

    fn has_friction(&self) -> bool {
        true
    }

    fn friction_bound(&self, depth: f64) -> f64 {
        if depth > 0.0 { self.friction } else { 0.0 }
    }

    fn tangential_potential(&self, slip: &[f64]) -> f64 {
        let squared: f64 = slip.iter().map(|s| s * s).sum();
        (squared + self.slip_regularization * self.slip_regularization).sqrt()
            - self.slip_regularization
    }
}

/// Quadratic normal resistance plus a quadratic boundary heat-exchange
/// potential, for thermally coupled bodies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalResistance {
    pub hardness: f64,
    pub exchange: f64,
}

impl ContactLaw for ThermalResistance {
    fn normal_potential(&self, depth: f64) -> f64 {
        self.hardness * 0.5 * depth * depth
    }

    fn exchange_potential(&self, value: f64) -> f64 {
        self.exchange * 0.5 * value * value
    }
}
