//! Degree-of-freedom partitioning into dirichlet, contact, and free sets.
//!
//! The partition drives the Schur condensation: contact DOFs are the
//! boundary unknowns the nonlinear solve runs on, free DOFs are
//! recovered by back-substitution, dirichlet DOFs are excluded from
//! assembly and forced to zero in every solver output.
//!
//! All dimension-strided index arithmetic lives here. State vectors are
//! dimension-stacked: the DOF of node `i` along axis `a` sits at
//! `a * node_count + i`, and restricted vectors use the same layout
//! over the independent ordering (contact nodes first, then free).

use nalgebra::DVector;

/// Classification of a single mesh node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DofClass {
    /// Fixed node: excluded from the unknowns, zeroed post-solve
    Dirichlet,
    /// Boundary node eligible for obstacle interaction
    Contact,
    /// Interior node, recovered by back-substitution
    Free,
}

/// An explicit partition of all mesh nodes into the three DOF classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DofPartition {
    contact: Vec<usize>,
    free: Vec<usize>,
    dirichlet: Vec<usize>,
    /// Contact nodes followed by free nodes; the ordering of every
    /// restricted operator and vector.
    independent: Vec<usize>,
    node_count: usize,
}

impl DofPartition {
    /// Build a partition by classifying each node index in order.
    /// The three sets partition the node set exactly by construction.
    pub fn from_classifier<F>(node_count: usize, classify: F) -> Self
    where
        F: Fn(usize) -> DofClass,
    {
        let mut contact = Vec::new();
        let mut free = Vec::new();
        let mut dirichlet = Vec::new();
        for node in 0..node_count {
            match classify(node) {
                DofClass::Contact => contact.push(node),
                DofClass::Free => free.push(node),
                DofClass::Dirichlet => dirichlet.push(node),
            }
        }
        Self::from_parts(contact, free, dirichlet, node_count)
    }

    /// Build a partition from explicit index sets, validating that they
    /// cover `0..node_count` exactly once each.
    pub fn from_sets(
        contact: Vec<usize>,
        free: Vec<usize>,
        dirichlet: Vec<usize>,
        node_count: usize,
    ) -> Result<Self, String> {
        let mut seen = vec![false; node_count];
        for &node in contact.iter().chain(&free).chain(&dirichlet) {
            if node >= node_count {
                return Err(format!("Node index {} out of range", node));
            }
            if seen[node] {
                return Err(format!("Node {} appears in two sets", node));
            }
            seen[node] = true;
        }
        if let Some(missing) = seen.iter().position(|s| !s) {
            return Err(format!("Node {} is unclassified", missing));
        }
        Ok(Self::from_parts(contact, free, dirichlet, node_count))
    }

    fn from_parts(
        contact: Vec<usize>,
        free: Vec<usize>,
        dirichlet: Vec<usize>,
        node_count: usize,
    ) -> Self {
        let mut independent = Vec::with_capacity(contact.len() + free.len());
        independent.extend_from_slice(&contact);
        independent.extend_from_slice(&free);
        Self {
            contact,
            free,
            dirichlet,
            independent,
            node_count,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn contact(&self) -> &[usize] {
        &self.contact
    }

    pub fn free(&self) -> &[usize] {
        &self.free
    }

    pub fn dirichlet(&self) -> &[usize] {
        &self.dirichlet
    }

    /// Contact nodes followed by free nodes.
    pub fn independent(&self) -> &[usize] {
        &self.independent
    }

    pub fn contact_count(&self) -> usize {
        self.contact.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn independent_count(&self) -> usize {
        self.independent.len()
    }

    /// Restrict a full-mesh vector to the independent layout.
    ///
    /// `dimension = 1` restricts a scalar field (temperature, electric
    /// potential); otherwise the vector must be dimension-stacked over
    /// all nodes.
    pub fn gather(&self, full: &DVector<f64>, dimension: usize) -> DVector<f64> {
        debug_assert_eq!(full.len(), dimension * self.node_count);
        let count = self.independent.len();
        let mut out = DVector::zeros(dimension * count);
        for axis in 0..dimension {
            for (p, &node) in self.independent.iter().enumerate() {
                out[axis * count + p] = full[axis * self.node_count + node];
            }
        }
        out
    }

    /// Expand an independent-layout vector back to a full-mesh vector.
    /// Dirichlet entries are zero.
    pub fn scatter(&self, reduced: &DVector<f64>, dimension: usize) -> DVector<f64> {
        let count = self.independent.len();
        debug_assert_eq!(reduced.len(), dimension * count);
        let mut out = DVector::zeros(dimension * self.node_count);
        for axis in 0..dimension {
            for (p, &node) in self.independent.iter().enumerate() {
                out[axis * self.node_count + node] = reduced[axis * count + p];
            }
        }
        out
    }
}

/// Expand node positions into dimension-stacked DOF indices over a
/// vector of `dimension * stride` entries.
pub fn expand(indices: &[usize], dimension: usize, stride: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(dimension * indices.len());
    for axis in 0..dimension {
        for &i in indices {
            out.push(axis * stride + i);
        }
    }
    out
}
