//! Per-body material coefficients.
//!
//! Coefficients are read-only during a time step and replaceable
//! between steps (temperature-dependent behavior is modeled by
//! swapping the properties and rebuilding the dynamics context).

use serde::{Deserialize, Serialize};

/// Thermal coupling coefficients, present only for bodies with
/// temperature-dependent behavior.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermalProperties {
    /// Thermal expansion coefficient
    pub expansion: f64,
    /// Thermal conductivity
    pub conductivity: f64,
}

/// Material coefficients of one elastic body.
///
/// Elasticity and viscosity both use a Lamé-type pair: (`lame_mu`,
/// `lame_lambda`) for the stiffness operator, (`viscosity_mu`,
/// `viscosity_lambda`) for the damping operator of the same form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyProperties {
    /// Mass density
    pub mass_density: f64,
    /// First Lamé shear parameter (mu)
    pub lame_mu: f64,
    /// Second Lamé parameter (lambda)
    pub lame_lambda: f64,
    /// Viscous shear parameter (theta)
    pub viscosity_mu: f64,
    /// Viscous volumetric parameter (zeta)
    pub viscosity_lambda: f64,
    /// Thermal coupling, if the body is temperature-dependent
    pub thermal: Option<ThermalProperties>,
}

impl BodyProperties {
    /// Purely elastic body (no damping, no thermal coupling).
    pub fn elastic(mass_density: f64, lame_mu: f64, lame_lambda: f64) -> Self {
        Self {
            mass_density,
            lame_mu,
            lame_lambda,
            viscosity_mu: 0.0,
            viscosity_lambda: 0.0,
            thermal: None,
        }
    }

    /// Viscoelastic body.
    pub fn viscoelastic(
        mass_density: f64,
        lame_mu: f64,
        lame_lambda: f64,
        viscosity_mu: f64,
        viscosity_lambda: f64,
    ) -> Self {
        Self {
            mass_density,
            lame_mu,
            lame_lambda,
            viscosity_mu,
            viscosity_lambda,
            thermal: None,
        }
    }

    /// Add thermal coupling coefficients.
    pub fn with_thermal(mut self, expansion: f64, conductivity: f64) -> Self {
        self.thermal = Some(ThermalProperties {
            expansion,
            conductivity,
        });
        self
    }

    /// Whether the body carries temperature-dependent behavior.
    pub fn has_thermal(&self) -> bool {
        self.thermal.is_some()
    }
}
