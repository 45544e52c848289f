//! Linear system solvers.
//!
//! Provides direct solvers for the constrained system Ku = F.
//!
//! # Solver Backends
//!
//! - [`FaerLuSolver`]: Sparse LU factorization using the faer library. Row
//!   replacement makes the constrained matrix unsymmetric, so LU is used rather
//!   than Cholesky.
//! - [`DenseLuSolver`]: nalgebra dense LU, for small systems and tests.
//!
//! Both backends report [`Error::SingularSystem`] when the factorization fails or
//! the computed solution is not finite (for example a free node that no element
//! touches, or a subdomain cut off by the pier exclusion).

use std::panic::{self, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::sparse::CsrMatrix;
use faer::prelude::*;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use serde::{Deserialize, Serialize};

/// Linear solver interface.
pub trait Solver: Send + Sync {
    /// Solve the linear system Ax = b.
    ///
    /// # Arguments
    ///
    /// * `matrix` - System matrix (K)
    /// * `rhs` - Right-hand side vector (F)
    ///
    /// # Returns
    ///
    /// Solution vector (u)
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>>;

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

/// Solver selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverType {
    /// Sparse LU via faer.
    SparseLu,
    /// Dense LU via nalgebra.
    DenseLu,
    /// Dense below the threshold, sparse above.
    #[default]
    Auto,
}

/// Solver configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Solver type to use.
    pub solver_type: SolverType,
    /// Largest system size solved densely under [`SolverType::Auto`].
    pub dense_threshold: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            solver_type: SolverType::Auto,
            dense_threshold: 200,
        }
    }
}

fn check_dimensions(matrix: &CsrMatrix, rhs: &[f64]) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(Error::Solver("Matrix must be square".into()));
    }
    if matrix.nrows() != rhs.len() {
        return Err(Error::Solver(format!(
            "RHS size mismatch: matrix is {}x{}, RHS has {} entries",
            matrix.nrows(),
            matrix.ncols(),
            rhs.len()
        )));
    }
    Ok(())
}

fn check_finite(solution: Vec<f64>) -> Result<Vec<f64>> {
    match solution.iter().position(|x| !x.is_finite()) {
        Some(idx) => Err(Error::SingularSystem(format!(
            "non-finite solution at DOF {}",
            idx
        ))),
        None => Ok(solution),
    }
}

/// Direct solver using nalgebra dense LU factorization.
///
/// Converts the matrix to dense storage; only suitable for small systems.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseLuSolver;

impl DenseLuSolver {
    pub fn new() -> Self {
        Self
    }
}

impl Solver for DenseLuSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        use nalgebra::{DMatrix, DVector};

        check_dimensions(matrix, rhs)?;
        if rhs.is_empty() {
            return Ok(vec![]);
        }

        let dense = DMatrix::from(matrix);
        let b = DVector::from_column_slice(rhs);

        let solution = dense
            .lu()
            .solve(&b)
            .ok_or_else(|| Error::SingularSystem("dense LU factorization failed".into()))?;

        check_finite(solution.as_slice().to_vec())
    }

    fn name(&self) -> &str {
        "nalgebra Dense LU"
    }
}

/// Convert nalgebra-sparse CSR matrix to faer SparseColMat (CSC format).
///
/// The constrained system is unsymmetric, so entries are genuinely transposed into
/// column storage. Row indices within each column come out sorted because rows are
/// visited in order.
fn csr_to_faer_csc(csr: &CsrMatrix) -> SparseColMat<usize, f64> {
    let nrows = csr.nrows();
    let ncols = csr.ncols();

    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();

    // Count entries per column
    let mut col_counts = vec![0usize; ncols];
    for &col in col_indices {
        col_counts[col] += 1;
    }

    let mut col_offsets = vec![0usize; ncols + 1];
    for i in 0..ncols {
        col_offsets[i + 1] = col_offsets[i] + col_counts[i];
    }

    let nnz = values.len();
    let mut csc_row_indices = vec![0usize; nnz];
    let mut csc_values = vec![0.0f64; nnz];
    let mut col_positions = col_offsets[..ncols].to_vec();

    for row in 0..nrows {
        for idx in row_offsets[row]..row_offsets[row + 1] {
            let col = col_indices[idx];
            let pos = col_positions[col];
            csc_row_indices[pos] = row;
            csc_values[pos] = values[idx];
            col_positions[col] += 1;
        }
    }

    // SAFETY: offsets are monotone, row indices are in bounds and sorted per column
    unsafe {
        SparseColMat::new(
            SymbolicSparseColMat::new_unchecked(nrows, ncols, col_offsets, None, csc_row_indices),
            csc_values,
        )
    }
}

/// Sparse LU solver using the faer library.
///
/// Production solver for the flow system: symbolic analysis (fill-reducing
/// ordering) followed by a numeric LU factorization with partial pivoting.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerLuSolver;

impl FaerLuSolver {
    /// Create a new sparse LU solver.
    pub fn new() -> Self {
        Self
    }
}

impl Solver for FaerLuSolver {
    fn solve(&self, matrix: &CsrMatrix, rhs: &[f64]) -> Result<Vec<f64>> {
        check_dimensions(matrix, rhs)?;
        let n = rhs.len();
        if n == 0 {
            return Ok(vec![]);
        }

        let csc = csr_to_faer_csc(matrix);
        let csc_ref = csc.as_ref();

        let symbolic = SymbolicLu::try_new(csc_ref.symbolic()).map_err(|e| {
            Error::SingularSystem(format!("symbolic LU analysis failed: {:?}", e))
        })?;

        // faer panics instead of returning an error on an exact zero pivot
        let factored = panic::catch_unwind(AssertUnwindSafe(|| {
            Lu::try_new_with_symbolic(symbolic, csc_ref).map(|lu| {
                let mut x = faer::Mat::from_fn(n, 1, |i, _| rhs[i]);
                lu.solve_in_place(x.as_mut());
                (0..n).map(|i| x[(i, 0)]).collect::<Vec<f64>>()
            })
        }));

        let solution = match factored {
            Ok(Ok(solution)) => solution,
            Ok(Err(e)) => {
                return Err(Error::SingularSystem(format!(
                    "sparse LU factorization failed: {:?}",
                    e
                )))
            }
            Err(_) => {
                return Err(Error::SingularSystem(
                    "sparse LU factorization hit a zero pivot".into(),
                ))
            }
        };

        check_finite(solution)
    }

    fn name(&self) -> &str {
        "faer Sparse LU"
    }
}

/// Select solver based on configuration and problem size.
pub fn select_solver(config: &SolverConfig, n_dofs: usize) -> Box<dyn Solver> {
    match config.solver_type {
        SolverType::SparseLu => Box::new(FaerLuSolver::new()),
        SolverType::DenseLu => Box::new(DenseLuSolver::new()),
        SolverType::Auto => {
            if n_dofs <= config.dense_threshold {
                Box::new(DenseLuSolver::new())
            } else {
                Box::new(FaerLuSolver::new())
            }
        }
    }
}
