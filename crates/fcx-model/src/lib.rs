//! Domain data for the fcx contact engine: meshes, DOF partitions,
//! material coefficients, body state, and rigid obstacles.
//!
//! This crate holds no numerics beyond geometry helpers; operator
//! assembly, condensation, and the contact solve live in `fcx-solver`.

pub mod materials;
pub mod mesh;
pub mod obstacle;
pub mod partition;
pub mod state;

pub use materials::{BodyProperties, ThermalProperties};
pub use mesh::{BoundaryFace, Mesh, SurfaceGeometry};
pub use obstacle::Obstacle;
pub use partition::{expand, DofClass, DofPartition};
pub use state::BodyState;
