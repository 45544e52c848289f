//! Global system assembly for the two velocity components.
//!
//! Element matrices are evaluated in parallel with Rayon, then scattered into a
//! triplet builder in element order so the assembled matrix does not depend on
//! thread scheduling. DOF layout:
//!
//! - `[0, N)`: x-velocity at node `i` is DOF `i`
//! - `[N, 2N)`: y-velocity at node `i` is DOF `i + N`
//!
//! The components are decoupled: each element block is scattered identically
//! into both diagonal sub-blocks and nothing couples them.

use crate::element::FlowTriangle;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::sparse::{CsrMatrix, TripletMatrix};
use nalgebra::Matrix3;
use rayon::prelude::*;

/// Assembled system `K u = F` for both velocity components.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    /// Global matrix (2N × 2N).
    pub stiffness: CsrMatrix,
    /// Right-hand side (length 2N).
    pub rhs: Vec<f64>,
    /// Number of mesh nodes N.
    pub n_nodes: usize,
    /// Elements skipped because their area fell below the degeneracy threshold.
    pub degenerate_elements: usize,
}

impl LinearSystem {
    /// Total number of DOFs (2N).
    pub fn n_dofs(&self) -> usize {
        2 * self.n_nodes
    }

    /// DOF index of the x-velocity at a node.
    #[inline]
    pub fn x_dof(&self, node: usize) -> usize {
        node
    }

    /// DOF index of the y-velocity at a node.
    #[inline]
    pub fn y_dof(&self, node: usize) -> usize {
        node + self.n_nodes
    }
}

/// Assemble the global matrix and (zero) load vector.
///
/// Inlet momentum enters only through the Dirichlet values applied afterwards by
/// [`crate::boundary::apply_boundary_conditions`], so `F` is zero here.
///
/// # Errors
///
/// Returns [`Error::InvalidParameter`] if the viscosity is not positive and finite.
pub fn assemble(mesh: &Mesh, kinematic_viscosity: f64) -> Result<LinearSystem> {
    if !(kinematic_viscosity.is_finite() && kinematic_viscosity > 0.0) {
        return Err(Error::InvalidParameter(format!(
            "kinematic viscosity must be positive and finite, got {}",
            kinematic_viscosity
        )));
    }

    let n_nodes = mesh.n_nodes();
    let n_dofs = 2 * n_nodes;
    let element = FlowTriangle::new(kinematic_viscosity);

    let element_matrices: Vec<Option<Matrix3<f64>>> = (0..mesh.n_elements())
        .into_par_iter()
        .map(|elem_idx| {
            mesh.element_coords(elem_idx)
                .and_then(|coords| element.stiffness(&coords))
        })
        .collect();

    // Each element contributes a full 3x3 block to both velocity blocks
    let nnz_estimate = 18 * mesh.n_elements();
    let mut triplet = TripletMatrix::with_capacity(n_dofs, n_dofs, nnz_estimate);
    let mut degenerate_elements = 0;

    for (connectivity, ke) in mesh.elements().iter().zip(&element_matrices) {
        match ke {
            Some(ke) => {
                triplet.add_block(connectivity, 0, ke);
                triplet.add_block(connectivity, n_nodes, ke);
            }
            None => degenerate_elements += 1,
        }
    }

    if degenerate_elements > 0 {
        log::warn!(
            "Skipped {} degenerate elements (area below threshold)",
            degenerate_elements
        );
    }
    log::debug!(
        "Assembled {} triplets for {} DOFs from {} elements",
        triplet.nnz(),
        n_dofs,
        mesh.n_elements()
    );

    let stiffness = triplet.to_csr()?;

    Ok(LinearSystem {
        stiffness,
        rhs: vec![0.0; n_dofs],
        n_nodes,
        degenerate_elements,
    })
}
