//! Rigid obstacles: reference points with outward normals.

use nalgebra::DVector;

/// A rigid obstacle described by reference points and outward unit
/// normals. Immutable per scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    nodes: Vec<DVector<f64>>,
    normals: Vec<DVector<f64>>,
}

impl Obstacle {
    /// Create an obstacle; normals are normalized on construction.
    pub fn new(nodes: Vec<DVector<f64>>, normals: Vec<DVector<f64>>) -> Result<Self, String> {
        if nodes.len() != normals.len() {
            return Err(format!(
                "Obstacle has {} nodes but {} normals",
                nodes.len(),
                normals.len()
            ));
        }
        if nodes.is_empty() {
            return Err("Obstacle must have at least one node".to_string());
        }
        let normals = normals
            .into_iter()
            .enumerate()
            .map(|(i, n)| {
                let len = n.norm();
                if len == 0.0 {
                    Err(format!("Obstacle normal {} has zero length", i))
                } else {
                    Ok(n / len)
                }
            })
            .collect::<Result<Vec<_>, String>>()?;
        Ok(Self { nodes, normals })
    }

    pub fn nodes(&self) -> &[DVector<f64>] {
        &self.nodes
    }

    pub fn normals(&self) -> &[DVector<f64>] {
        &self.normals
    }

    /// Index of the closest obstacle point for each query point.
    ///
    /// Recomputed whenever boundary geometry moves enough to matter
    /// (every step before the contact solve, and after remeshing).
    pub fn nearest_indices(&self, points: &[DVector<f64>]) -> Vec<usize> {
        points
            .iter()
            .map(|p| {
                let mut best = 0;
                let mut best_distance = f64::INFINITY;
                for (i, node) in self.nodes.iter().enumerate() {
                    let distance = (node - p).norm_squared();
                    if distance < best_distance {
                        best_distance = distance;
                        best = i;
                    }
                }
                best
            })
            .collect()
    }
}
