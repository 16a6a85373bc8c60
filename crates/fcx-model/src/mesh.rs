//! Simplex mesh data structures for the contact engine.
//!
//! A mesh is an ordered sequence of nodes (points in R^2 or R^3) and
//! simplex elements (triangles or tetrahedra referencing node indices).
//! The mesh is immutable between remeshing events; everything derived
//! from it (operators, condensed systems, contact surfaces) is rebuilt
//! when a new mesh is installed.

use nalgebra::DVector;
use std::collections::HashMap;

/// A finite element mesh of simplices.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    /// Spatial dimension (2 or 3)
    pub dimension: usize,
    /// Node positions, each of length `dimension`
    pub nodes: Vec<DVector<f64>>,
    /// Simplex elements, each `dimension + 1` node indices
    pub elements: Vec<Vec<usize>>,
}

/// A boundary face together with the element that owns it.
///
/// `opposite` is the owning element's vertex not on the face; the
/// outward normal points away from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryFace {
    pub nodes: Vec<usize>,
    pub element: usize,
    pub opposite: usize,
}

/// Per-node geometry of a boundary surface: outward unit normals and
/// the boundary measure (length/area share) carried by each node.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceGeometry {
    /// One unit normal per selected node (zero for nodes with no
    /// boundary face inside the selection)
    pub normals: Vec<DVector<f64>>,
    /// One boundary measure per selected node
    pub measures: DVector<f64>,
}

impl Mesh {
    /// Create a mesh, validating element arity and node indices.
    pub fn new(
        dimension: usize,
        nodes: Vec<DVector<f64>>,
        elements: Vec<Vec<usize>>,
    ) -> Result<Self, String> {
        if dimension != 2 && dimension != 3 {
            return Err(format!("Unsupported mesh dimension: {}", dimension));
        }
        for (i, node) in nodes.iter().enumerate() {
            if node.len() != dimension {
                return Err(format!(
                    "Node {} has {} coordinates, expected {}",
                    i,
                    node.len(),
                    dimension
                ));
            }
        }
        for (e, element) in elements.iter().enumerate() {
            if element.len() != dimension + 1 {
                return Err(format!(
                    "Element {} has {} nodes, expected {}",
                    e,
                    element.len(),
                    dimension + 1
                ));
            }
            for &n in element {
                if n >= nodes.len() {
                    return Err(format!("Element {} references missing node {}", e, n));
                }
            }
        }
        Ok(Self {
            dimension,
            nodes,
            elements,
        })
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of elements
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Faces incident to exactly one element.
    ///
    /// A simplex with `d + 1` vertices has `d + 1` faces, each omitting
    /// one vertex; faces shared by two elements are interior.
    pub fn boundary_faces(&self) -> Vec<BoundaryFace> {
        let mut incidence: HashMap<Vec<usize>, (usize, BoundaryFace)> = HashMap::new();

        for (e, element) in self.elements.iter().enumerate() {
            for skip in 0..element.len() {
                let face: Vec<usize> = element
                    .iter()
                    .enumerate()
                    .filter(|(k, _)| *k != skip)
                    .map(|(_, &n)| n)
                    .collect();
                let mut key = face.clone();
                key.sort_unstable();
                let entry = incidence.entry(key).or_insert_with(|| {
                    (
                        0,
                        BoundaryFace {
                            nodes: face,
                            element: e,
                            opposite: element[skip],
                        },
                    )
                });
                entry.0 += 1;
            }
        }

        let mut faces: Vec<BoundaryFace> = incidence
            .into_values()
            .filter(|(count, _)| *count == 1)
            .map(|(_, face)| face)
            .collect();
        // Deterministic order regardless of hash iteration
        faces.sort_by(|a, b| (a.element, &a.nodes).cmp(&(b.element, &b.nodes)));
        faces
    }

    /// Outward unit normals and boundary measures for the nodes in
    /// `selection`, using only boundary faces lying entirely inside the
    /// selection. Each face spreads its measure evenly over its
    /// `dimension` nodes (half edge length in 2D, a third of the
    /// triangle area in 3D). Node normals are the measure-weighted
    /// averages of adjacent face normals, normalized.
    pub fn surface_geometry(&self, selection: &[usize]) -> SurfaceGeometry {
        let position: HashMap<usize, usize> = selection
            .iter()
            .enumerate()
            .map(|(p, &n)| (n, p))
            .collect();

        let mut normals = vec![DVector::zeros(self.dimension); selection.len()];
        let mut measures = DVector::zeros(selection.len());

        for face in self.boundary_faces() {
            if !face.nodes.iter().all(|n| position.contains_key(n)) {
                continue;
            }
            let (normal, measure) = self.face_normal_and_measure(&face);
            let share = measure / self.dimension as f64;
            for n in &face.nodes {
                let p = position[n];
                measures[p] += share;
                normals[p] += &normal * measure;
            }
        }

        for normal in &mut normals {
            let len = normal.norm();
            if len > 0.0 {
                *normal /= len;
            }
        }

        SurfaceGeometry { normals, measures }
    }

    /// Outward unit normal and measure (length or area) of a boundary face.
    fn face_normal_and_measure(&self, face: &BoundaryFace) -> (DVector<f64>, f64) {
        let a = &self.nodes[face.nodes[0]];
        let (mut normal, measure) = match self.dimension {
            2 => {
                let b = &self.nodes[face.nodes[1]];
                let tangent = b - a;
                let length = tangent.norm();
                let normal = DVector::from_vec(vec![tangent[1], -tangent[0]]) / length;
                (normal, length)
            }
            _ => {
                let b = &self.nodes[face.nodes[1]];
                let c = &self.nodes[face.nodes[2]];
                let u = b - a;
                let v = c - a;
                let cross = DVector::from_vec(vec![
                    u[1] * v[2] - u[2] * v[1],
                    u[2] * v[0] - u[0] * v[2],
                    u[0] * v[1] - u[1] * v[0],
                ]);
                let doubled = cross.norm();
                (cross / doubled, doubled / 2.0)
            }
        };

        // Outward means away from the owning element's opposite vertex.
        let outward = a - &self.nodes[face.opposite];
        if normal.dot(&outward) < 0.0 {
            normal = -normal;
        }
        (normal, measure)
    }
}
