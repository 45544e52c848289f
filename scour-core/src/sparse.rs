//! Sparse matrix operations.
//!
//! Uses CSR (Compressed Sparse Row) format for the global system so Dirichlet rows
//! can be rewritten in place before the direct solve.

use crate::error::{Error, Result};
use nalgebra::Matrix3;
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;

/// Compressed Sparse Row matrix.
pub type CsrMatrix = NalgebraCsr<f64>;

/// Builder for assembling a sparse matrix from triplets (COO format).
///
/// Accumulates (row, col, value) triplets and converts to CSR when complete.
#[derive(Debug, Clone)]
pub struct TripletMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl TripletMatrix {
    /// Create a new triplet matrix builder.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Create with estimated capacity.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(nnz_estimate),
            cols: Vec::with_capacity(nnz_estimate),
            values: Vec::with_capacity(nnz_estimate),
        }
    }

    /// Add a value at (row, col). Duplicates are summed during conversion.
    ///
    /// Exact zeros are not stored.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows, "Row index out of bounds");
        debug_assert!(col < self.n_cols, "Column index out of bounds");

        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
    }

    /// Scatter a 3×3 element block at `nodes + offset` in both dimensions.
    ///
    /// The offset selects the DOF block (0 for x-velocity, N for y-velocity).
    pub fn add_block(&mut self, nodes: &[usize; 3], offset: usize, block: &Matrix3<f64>) {
        for (i, &row) in nodes.iter().enumerate() {
            for (j, &col) in nodes.iter().enumerate() {
                self.add(row + offset, col + offset, block[(i, j)]);
            }
        }
    }

    /// Number of stored triplets.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Convert to CSR format, summing duplicate entries.
    pub fn to_csr(self) -> Result<CsrMatrix> {
        let coo = CooMatrix::try_from_triplets(
            self.n_rows,
            self.n_cols,
            self.rows,
            self.cols,
            self.values,
        )
        .map_err(|e| Error::Solver(format!("invalid triplet data: {}", e)))?;

        Ok(CsrMatrix::from(&coo))
    }
}

/// Value stored at (row, col), zero if outside the sparsity pattern.
pub fn csr_get(matrix: &CsrMatrix, row: usize, col: usize) -> f64 {
    let row_view = matrix.row(row);
    row_view
        .col_indices()
        .iter()
        .position(|&c| c == col)
        .map(|k| row_view.values()[k])
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triplet_to_csr() {
        let mut triplet = TripletMatrix::new(3, 3);
        triplet.add(0, 0, 1.0);
        triplet.add(1, 1, 2.0);
        triplet.add(2, 2, 3.0);
        triplet.add(0, 1, 0.5);
        triplet.add(1, 0, 0.5);

        let csr = triplet.to_csr().unwrap();
        assert_eq!(csr.nrows(), 3);
        assert_eq!(csr.ncols(), 3);
        assert_eq!(csr.nnz(), 5);
    }

    #[test]
    fn test_duplicate_summation() {
        let mut triplet = TripletMatrix::new(2, 2);
        triplet.add(0, 0, 1.0);
        triplet.add(0, 0, 2.0);
        triplet.add(0, 0, 3.0);

        let csr = triplet.to_csr().unwrap();
        assert!((csr_get(&csr, 0, 0) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_zeros_not_stored() {
        let mut triplet = TripletMatrix::new(2, 2);
        triplet.add(0, 1, 0.0);
        triplet.add(1, 1, 1e-300);
        assert_eq!(triplet.nnz(), 1);
    }

    #[test]
    fn test_block_scatter_with_offset() {
        // Two DOF blocks of 4 nodes each
        let mut triplet = TripletMatrix::new(8, 8);
        let block = Matrix3::new(
            1.0, 0.5, 0.1,
            0.5, 2.0, 0.2,
            0.1, 0.2, 3.0,
        );
        triplet.add_block(&[0, 2, 3], 0, &block);
        triplet.add_block(&[0, 2, 3], 4, &block);

        let csr = triplet.to_csr().unwrap();
        assert!((csr_get(&csr, 0, 2) - 0.5).abs() < 1e-12);
        assert!((csr_get(&csr, 4, 6) - 0.5).abs() < 1e-12);
        assert!((csr_get(&csr, 7, 7) - 3.0).abs() < 1e-12);
        // No coupling between the blocks
        assert_eq!(csr_get(&csr, 0, 4), 0.0);
        assert_eq!(csr_get(&csr, 1, 1), 0.0);
    }
}
