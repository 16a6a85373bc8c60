//! Per-step linear operator assembly over a simplex mesh.
//!
//! Builds the operators the dynamics context caches for a mesh and a
//! coefficient set: element volumes, lumped nodal volumes, the
//! acceleration (consistent mass) operator, elasticity and viscosity
//! operators in isotropic Lamé form, and — for thermally coupled
//! bodies — conductivity and expansion operators.
//!
//! Assembly loops over elements, computes the constant P1 shape
//! gradients and the simplex volume, and scatter-adds local blocks into
//! dense global matrices. Accumulation is plain addition, so the result
//! does not depend on element iteration order beyond floating-point
//! rounding, and every operator is symmetric up to rounding. All
//! returned operators are restricted to the independent (non-dirichlet)
//! indices in the partition's ordering: contact nodes first, then free.

use crate::error::{Result, SolverError};
use fcx_model::partition::expand;
use fcx_model::{BodyProperties, DofPartition, Mesh};
use log::debug;
use nalgebra::{DMatrix, DVector};

/// Operators assembled for one mesh/coefficient configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicsOperators {
    /// Volume (area in 2D) of each element
    pub element_volumes: Vec<f64>,
    /// Lumped volume per independent node (`vol / (dim + 1)` per vertex),
    /// the integration weight for external body forces
    pub nodal_volume: DVector<f64>,
    /// Density-weighted consistent mass, block diagonal per axis
    /// (`dim * independent` square)
    pub acceleration: DMatrix<f64>,
    /// Isotropic elasticity operator (Lamé pair mu/lambda)
    pub elasticity: DMatrix<f64>,
    /// Viscosity operator of the same form (theta/zeta pair)
    pub viscosity: DMatrix<f64>,
    /// Scalar consistent mass (`independent` square), used by the
    /// thermal system
    pub scalar_mass: DMatrix<f64>,
    /// Thermal conductivity (scalar Laplacian), when the body is thermal
    pub thermal_conductivity: Option<DMatrix<f64>>,
    /// Thermal expansion coupling, scalar rows × vector columns
    /// (`independent` × `dim * independent`), when the body is thermal
    pub thermal_expansion: Option<DMatrix<f64>>,
}

/// Assemble all dynamics operators for `mesh` and `properties`,
/// restricted to the partition's independent indices.
///
/// # Errors
/// `DegenerateMesh` if any element has non-positive volume. This is
/// fatal for the mesh and must surface to the remeshing layer; no
/// partial operator is returned.
pub fn assemble_dynamics(
    mesh: &Mesh,
    properties: &BodyProperties,
    partition: &DofPartition,
) -> Result<DynamicsOperators> {
    let dim = mesh.dimension;
    let n = mesh.node_count();
    let factorial = if dim == 2 { 2.0 } else { 6.0 };

    // Full-mesh accumulators; restriction happens once at the end.
    let mut gradient_products = vec![vec![DMatrix::<f64>::zeros(n, n); dim]; dim];
    let mut mass = DMatrix::<f64>::zeros(n, n);
    let mut first_derivatives = vec![DMatrix::<f64>::zeros(n, n); dim];
    let mut volumes = DVector::<f64>::zeros(n);
    let mut element_volumes = Vec::with_capacity(mesh.element_count());

    for (e, element) in mesh.elements.iter().enumerate() {
        let origin = &mesh.nodes[element[0]];
        let mut edges = DMatrix::<f64>::zeros(dim, dim);
        for k in 0..dim {
            let edge = &mesh.nodes[element[k + 1]] - origin;
            for a in 0..dim {
                edges[(a, k)] = edge[a];
            }
        }

        let volume = edges.determinant() / factorial;
        if volume <= 0.0 {
            return Err(SolverError::DegenerateMesh {
                element: e,
                measure: volume,
            });
        }
        element_volumes.push(volume);

        let inverse = edges
            .try_inverse()
            .ok_or(SolverError::DegenerateMesh {
                element: e,
                measure: volume,
            })?;

        // P1 shape gradients: grad phi_{k+1} = row k of edges^-1,
        // grad phi_0 closes the partition of unity.
        let mut gradients = vec![vec![0.0; dim]; dim + 1];
        for k in 0..dim {
            for a in 0..dim {
                gradients[k + 1][a] = inverse[(k, a)];
                gradients[0][a] -= inverse[(k, a)];
            }
        }

        let vertex_share = volume / (dim as f64 + 1.0);
        let mass_scale = volume / ((dim as f64 + 1.0) * (dim as f64 + 2.0));

        for (li, &i) in element.iter().enumerate() {
            volumes[i] += vertex_share;
            for (lj, &j) in element.iter().enumerate() {
                let same = if li == lj { 2.0 } else { 1.0 };
                mass[(i, j)] += mass_scale * same;
                for a in 0..dim {
                    // int phi_i d(phi_j)/dx_a = vertex_share * grad_j[a]
                    first_derivatives[a][(i, j)] += vertex_share * gradients[lj][a];
                    for b in 0..dim {
                        gradient_products[a][b][(i, j)] +=
                            volume * gradients[li][a] * gradients[lj][b];
                    }
                }
            }
        }
    }

    let acceleration_full = vector_operator(dim, n, |a, b| {
        if a == b {
            properties.mass_density * mass.clone()
        } else {
            DMatrix::zeros(n, n)
        }
    });
    let elasticity_full = lame_operator(
        dim,
        n,
        &gradient_products,
        properties.lame_mu,
        properties.lame_lambda,
    );
    let viscosity_full = lame_operator(
        dim,
        n,
        &gradient_products,
        properties.viscosity_mu,
        properties.viscosity_lambda,
    );

    let independent = partition.independent();
    let expanded = expand(independent, dim, n);

    let operators = DynamicsOperators {
        element_volumes,
        nodal_volume: partition.gather(&volumes, 1),
        acceleration: submatrix(&acceleration_full, &expanded, &expanded),
        elasticity: submatrix(&elasticity_full, &expanded, &expanded),
        viscosity: submatrix(&viscosity_full, &expanded, &expanded),
        scalar_mass: {
            let scaled = properties.mass_density * &mass;
            submatrix(&scaled, independent, independent)
        },
        thermal_conductivity: properties.thermal.map(|thermal| {
            let mut laplacian = DMatrix::zeros(n, n);
            for a in 0..dim {
                laplacian += &gradient_products[a][a];
            }
            laplacian *= thermal.conductivity;
            submatrix(&laplacian, independent, independent)
        }),
        thermal_expansion: properties.thermal.map(|thermal| {
            let mut coupling = DMatrix::zeros(n, dim * n);
            for a in 0..dim {
                for i in 0..n {
                    for j in 0..n {
                        coupling[(i, a * n + j)] =
                            thermal.expansion * first_derivatives[a][(i, j)];
                    }
                }
            }
            submatrix(&coupling, independent, &expanded)
        }),
    };

    debug!(
        "assembled operators: {} elements, {} independent nodes, dim {}",
        operators.element_volumes.len(),
        partition.independent_count(),
        dim
    );
    Ok(operators)
}

/// Build a `dim * n` square operator from per-axis-pair blocks.
fn vector_operator<F>(dim: usize, n: usize, block: F) -> DMatrix<f64>
where
    F: Fn(usize, usize) -> DMatrix<f64>,
{
    let mut out = DMatrix::zeros(dim * n, dim * n);
    for a in 0..dim {
        for b in 0..dim {
            let blk = block(a, b);
            for i in 0..n {
                for j in 0..n {
                    out[(a * n + i, b * n + j)] = blk[(i, j)];
                }
            }
        }
    }
    out
}

/// Isotropic Lamé-form operator from the gradient-product matrices:
/// block (a, b) = lambda * W^{ab} + mu * (W^{ba} + delta_ab * sum_k W^{kk}).
fn lame_operator(
    dim: usize,
    n: usize,
    gradient_products: &[Vec<DMatrix<f64>>],
    mu: f64,
    lambda: f64,
) -> DMatrix<f64> {
    let mut trace = DMatrix::zeros(n, n);
    for k in 0..dim {
        trace += &gradient_products[k][k];
    }
    vector_operator(dim, n, |a, b| {
        let mut blk = lambda * &gradient_products[a][b] + mu * &gradient_products[b][a];
        if a == b {
            blk += mu * &trace;
        }
        blk
    })
}

/// Dense submatrix extraction by explicit row/column index lists.
pub(crate) fn submatrix(m: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    let mut out = DMatrix::zeros(rows.len(), cols.len());
    for (i, &r) in rows.iter().enumerate() {
        for (j, &c) in cols.iter().enumerate() {
            out[(i, j)] = m[(r, c)];
        }
    }
    out
}
