//! Dirichlet boundary conditions by row replacement.
//!
//! For each constrained DOF `i` with value `g`:
//! - Set `K[i, :] = 0`
//! - Set `K[i, i] = 1`
//! - Set `F[i] = g`
//!
//! Columns are left untouched, so the constrained system is not symmetric. Applying
//! the same conditions twice yields the same system as applying them once.
//!
//! | Boundary | x-velocity      | y-velocity |
//! |----------|-----------------|------------|
//! | inlet    | inlet velocity  | 0          |
//! | walls    | 0               | 0          |
//! | pier     | 0               | 0          |
//! | outlet   | free (natural)  | free       |

use crate::assembly::LinearSystem;
use crate::error::{Error, Result};
use crate::mesh::{BoundaryKind, Mesh};
use crate::sparse::{CsrMatrix, TripletMatrix};

/// Prescribed value for one DOF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirichletCondition {
    /// Global DOF index.
    pub dof: usize,
    /// Prescribed value.
    pub value: f64,
}

/// Collect the Dirichlet conditions implied by the mesh boundary classification.
///
/// Conditions are ordered inlet, walls, pier; within a set by ascending node.
pub fn dirichlet_conditions(
    system: &LinearSystem,
    mesh: &Mesh,
    inlet_velocity: f64,
) -> Vec<DirichletCondition> {
    let sets = mesh.boundary_sets();
    let mut conditions = Vec::with_capacity(2 * (sets.len() - sets.outlet.len()));

    for &node in mesh.boundary_nodes(BoundaryKind::Inlet) {
        conditions.push(DirichletCondition { dof: system.x_dof(node), value: inlet_velocity });
        conditions.push(DirichletCondition { dof: system.y_dof(node), value: 0.0 });
    }

    for kind in [BoundaryKind::Wall, BoundaryKind::Pier] {
        debug_assert!(kind.is_no_slip());
        for &node in mesh.boundary_nodes(kind) {
            conditions.push(DirichletCondition { dof: system.x_dof(node), value: 0.0 });
            conditions.push(DirichletCondition { dof: system.y_dof(node), value: 0.0 });
        }
    }

    conditions
}

/// Zero a row and put 1 on its diagonal. Returns `false` if the diagonal is not in
/// the sparsity pattern.
fn replace_row_with_identity(matrix: &mut CsrMatrix, row: usize) -> bool {
    let mut row_view = matrix.row_mut(row);
    let (cols, values) = row_view.cols_and_values_mut();
    let mut has_diagonal = false;
    for (&col, value) in cols.iter().zip(values.iter_mut()) {
        if col == row {
            *value = 1.0;
            has_diagonal = true;
        } else {
            *value = 0.0;
        }
    }
    has_diagonal
}

/// Rebuild the matrix with identity rows for the given DOFs.
fn rebuild_with_identity_rows(matrix: &CsrMatrix, identity_rows: &[bool]) -> Result<CsrMatrix> {
    let mut triplet = TripletMatrix::with_capacity(matrix.nrows(), matrix.ncols(), matrix.nnz());
    for (row, col, &value) in matrix.triplet_iter() {
        if !identity_rows[row] {
            triplet.add(row, col, value);
        }
    }
    for row in (0..identity_rows.len()).filter(|&r| identity_rows[r]) {
        triplet.add(row, row, 1.0);
    }
    triplet.to_csr()
}

/// Apply inlet and no-slip conditions to an assembled system in place.
///
/// Returns the number of constrained DOFs. Rows are rewritten in place when the
/// diagonal is already stored (any node that belongs to an element); otherwise the
/// matrix is rebuilt once with the missing diagonals.
///
/// # Errors
///
/// * [`Error::Solver`] if the system size does not match the mesh
/// * [`Error::InvalidParameter`] if the inlet velocity is not finite
pub fn apply_boundary_conditions(
    system: &mut LinearSystem,
    mesh: &Mesh,
    inlet_velocity: f64,
) -> Result<usize> {
    if system.n_nodes != mesh.n_nodes() || system.rhs.len() != system.n_dofs() {
        return Err(Error::Solver(format!(
            "system has {} nodes / {} RHS entries, mesh has {} nodes",
            system.n_nodes,
            system.rhs.len(),
            mesh.n_nodes()
        )));
    }
    if !inlet_velocity.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "inlet velocity must be finite, got {}",
            inlet_velocity
        )));
    }

    let conditions = dirichlet_conditions(system, mesh, inlet_velocity);
    let mut constrained = vec![false; system.n_dofs()];
    let mut missing_diagonal = false;

    for condition in &conditions {
        constrained[condition.dof] = true;
        if !replace_row_with_identity(&mut system.stiffness, condition.dof) {
            missing_diagonal = true;
        }
        system.rhs[condition.dof] = condition.value;
    }

    if missing_diagonal {
        log::debug!("Constrained DOF without stored diagonal, rebuilding matrix");
        system.stiffness = rebuild_with_identity_rows(&system.stiffness, &constrained)?;
    }

    log::debug!(
        "Applied {} Dirichlet conditions ({} outlet nodes left free)",
        conditions.len(),
        mesh.boundary_nodes(BoundaryKind::Outlet).len()
    );

    Ok(conditions.len())
}
