//! Per-configuration solver context: assembled operators, the combined
//! implicit left-hand side, and its Schur condensation.
//!
//! The context is rebuilt as a unit whenever the mesh, the partition, or
//! the time step changes (a remeshing event); a monotone version counter
//! lets downstream consumers detect staleness. Rebuilding is atomic: on
//! any assembly or condensation error the previous context is kept
//! untouched.
//!
//! The implicit system solved each step is
//!
//! ```text
//! lhs = M + (V + dt * E) * dt
//! rhs = f - V * v - E * (u + dt * v)
//! ```
//!
//! over the independent DOFs, with `M`, `V`, `E` the mass, viscosity and
//! elasticity operators; the unknown is the acceleration.

use crate::assembly::{assemble_dynamics, DynamicsOperators};
use crate::error::Result;
use crate::schur::CondensedSystem;
use fcx_model::{BodyProperties, BodyState, DofPartition, Mesh, SurfaceGeometry};
use log::info;
use nalgebra::{DMatrix, DVector};

/// Condensed scalar heat system of a thermally coupled body.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalSystem {
    /// `(1/dt) * scalar_mass + conductivity` over independent nodes
    pub lhs: DMatrix<f64>,
    /// Schur condensation of `lhs` (dimension 1)
    pub condensed: CondensedSystem,
}

/// Everything the step solver needs for one mesh/coefficient/time-step
/// configuration.
pub struct DynamicsContext {
    mesh: Mesh,
    properties: BodyProperties,
    partition: DofPartition,
    time_step: f64,
    operators: DynamicsOperators,
    lhs: DMatrix<f64>,
    condensed: CondensedSystem,
    thermal: Option<ThermalSystem>,
    contact_surface: SurfaceGeometry,
    version: u64,
}

impl DynamicsContext {
    /// Assemble and condense everything for the given configuration.
    ///
    /// # Errors
    /// `DegenerateMesh` from assembly, `SingularReduction` from
    /// condensation.
    pub fn new(
        mesh: Mesh,
        properties: BodyProperties,
        partition: DofPartition,
        time_step: f64,
    ) -> Result<Self> {
        let built = Self::build(mesh, properties, partition, time_step, 0)?;
        info!(
            "dynamics context ready: {} nodes, {} contact, dt {}",
            built.mesh.node_count(),
            built.partition.contact_count(),
            built.time_step
        );
        Ok(built)
    }

    /// Replace the mesh, partition, and coefficients after a remeshing
    /// event or a coefficient change, bumping the version. The existing
    /// context survives any failure.
    pub fn rebuild(
        &mut self,
        mesh: Mesh,
        partition: DofPartition,
        properties: BodyProperties,
    ) -> Result<()> {
        let next = Self::build(mesh, properties, partition, self.time_step, self.version + 1)?;
        *self = next;
        info!("dynamics context rebuilt, version {}", self.version);
        Ok(())
    }

    fn build(
        mesh: Mesh,
        properties: BodyProperties,
        partition: DofPartition,
        time_step: f64,
        version: u64,
    ) -> Result<Self> {
        let operators = assemble_dynamics(&mesh, &properties, &partition)?;

        let lhs = &operators.acceleration
            + (&operators.viscosity + time_step * &operators.elasticity) * time_step;
        let condensed = CondensedSystem::condense(
            &lhs,
            mesh.dimension,
            partition.contact_count(),
            partition.free_count(),
        )?;

        let thermal = match &operators.thermal_conductivity {
            Some(conductivity) => {
                let lhs = (1.0 / time_step) * &operators.scalar_mass + conductivity;
                let condensed = CondensedSystem::condense(
                    &lhs,
                    1,
                    partition.contact_count(),
                    partition.free_count(),
                )?;
                Some(ThermalSystem { lhs, condensed })
            }
            None => None,
        };

        let contact_surface = mesh.surface_geometry(partition.contact());

        Ok(Self {
            mesh,
            properties,
            partition,
            time_step,
            operators,
            lhs,
            condensed,
            thermal,
            contact_surface,
            version,
        })
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn properties(&self) -> &BodyProperties {
        &self.properties
    }

    pub fn partition(&self) -> &DofPartition {
        &self.partition
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn operators(&self) -> &DynamicsOperators {
        &self.operators
    }

    pub fn lhs(&self) -> &DMatrix<f64> {
        &self.lhs
    }

    pub fn condensed(&self) -> &CondensedSystem {
        &self.condensed
    }

    pub fn thermal(&self) -> Option<&ThermalSystem> {
        self.thermal.as_ref()
    }

    /// Normals and measures of the contact surface, aligned with the
    /// partition's contact ordering.
    pub fn contact_surface(&self) -> &SurfaceGeometry {
        &self.contact_surface
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Right-hand side of the implicit step over independent DOFs:
    /// volume-integrated body forces minus the viscous and elastic
    /// reactions of the current state, plus the thermal expansion pull
    /// for thermally coupled bodies.
    ///
    /// `forces` is a full-mesh, dimension-stacked force density.
    pub fn step_rhs(&self, state: &BodyState, forces: &DVector<f64>) -> DVector<f64> {
        let dim = self.mesh.dimension;
        let dt = self.time_step;
        let count = self.partition.independent_count();

        let mut rhs = self.partition.gather(forces, dim);
        for axis in 0..dim {
            for p in 0..count {
                rhs[axis * count + p] *= self.operators.nodal_volume[p];
            }
        }

        let velocity = self.partition.gather(&state.velocity, dim);
        let displacement = self.partition.gather(&state.displacement, dim);
        rhs -= &self.operators.viscosity * &velocity;
        rhs -= &self.operators.elasticity * (displacement + dt * &velocity);

        if let Some(expansion) = &self.operators.thermal_expansion {
            let temperature = self.partition.gather(&state.temperature, 1);
            rhs += expansion.transpose() * temperature;
        }
        rhs
    }

    /// Right-hand side of the implicit heat step over independent nodes:
    /// volume-integrated sources plus the inertia of the current
    /// temperature field.
    ///
    /// `heat_sources` is a full-mesh scalar source density.
    pub fn thermal_rhs(&self, state: &BodyState, heat_sources: &DVector<f64>) -> DVector<f64> {
        let count = self.partition.independent_count();
        let mut rhs = self.partition.gather(heat_sources, 1);
        for p in 0..count {
            rhs[p] *= self.operators.nodal_volume[p];
        }
        let temperature = self.partition.gather(&state.temperature, 1);
        rhs += (1.0 / self.time_step) * (&self.operators.scalar_mass * temperature);
        rhs
    }

    /// Current (displaced) positions of the contact nodes.
    pub fn contact_positions(&self, state: &BodyState) -> Vec<DVector<f64>> {
        let dim = self.mesh.dimension;
        let n = self.mesh.node_count();
        self.partition
            .contact()
            .iter()
            .map(|&node| {
                DVector::from_fn(dim, |axis, _| {
                    self.mesh.nodes[node][axis] + state.displacement[axis * n + node]
                })
            })
            .collect()
    }

    /// Current velocity of the contact nodes, dimension-stacked over
    /// the contact set.
    pub fn contact_velocity(&self, state: &BodyState) -> DVector<f64> {
        let dim = self.mesh.dimension;
        let n = self.mesh.node_count();
        let contact = self.partition.contact();
        let mut out = DVector::zeros(dim * contact.len());
        for axis in 0..dim {
            for (b, &node) in contact.iter().enumerate() {
                out[axis * contact.len() + b] = state.velocity[axis * n + node];
            }
        }
        out
    }
}
