//! Trajectory output: dense `ndarray::Array2` buffers or sparse CSC
//! matrices sharing the caller's sparsity pattern (§4.8).

use ndarray::Array2;
use simnet_sparse::CscMatrix;

/// A trajectory sink for one of `U` (compartments) or `V` (auxiliary
/// state): either a dense matrix with one row per state entry and one
/// column per `tspan` point, or a sparse matrix with the same column
/// count whose structural pattern the caller supplies up front.
pub enum Output<T> {
    /// Row-major per-state, column-per-report-time dense buffer.
    Dense(Array2<T>),
    /// A CSC matrix whose `ncol` equals `tspan.len()`; `pr` is filled in
    /// column by column as report times are crossed.
    Sparse(CscMatrix<T>),
}

impl<T: Copy> Output<T> {
    /// Number of report-time columns.
    #[must_use]
    pub fn tlen(&self) -> usize {
        match self {
            Output::Dense(arr) => arr.ncols(),
            Output::Sparse(m) => m.ncol(),
        }
    }

    /// Whether this sink uses the sparse representation.
    #[must_use]
    pub fn is_sparse(&self) -> bool {
        matches!(self, Output::Sparse(_))
    }

    /// Dense-only: writes `data` into column `col`, starting at absolute
    /// row `row_start`. Used by each worker thread to write its own
    /// contiguous node-row block in parallel; disjoint row ranges make
    /// this safe across threads without locking.
    ///
    /// # Panics
    /// Panics if `self` is [`Output::Sparse`]; the driver never routes a
    /// sparse sink through this path.
    pub fn write_dense_rows(&mut self, col: usize, row_start: usize, data: &[T]) {
        match self {
            Output::Dense(arr) => {
                for (i, &val) in data.iter().enumerate() {
                    arr[[row_start + i, col]] = val;
                }
            }
            Output::Sparse(_) => unreachable!("dense row write routed to a sparse output"),
        }
    }

    /// Sparse-only: writes column `col` by reading `full_state[row]` for
    /// every row the sparsity pattern names in that column. Master-thread,
    /// serial, per §4.8.
    ///
    /// # Panics
    /// Panics if `self` is [`Output::Dense`].
    pub fn write_sparse_column(&mut self, col: usize, full_state: &[T]) {
        match self {
            Output::Sparse(m) => {
                for j in m.col_range(col) {
                    let row = m.rows()[j];
                    m.pr_mut()[j] = full_state[row];
                }
            }
            Output::Dense(_) => unreachable!("sparse column write routed to a dense output"),
        }
    }
}

/// Returns the `tspan` indices newly crossed now that the clock reads
/// `tt`, advancing `next_it` past them. Each returned index should be
/// written with the current state before the caller moves on.
pub fn crossed_tspan_indices(tspan: &[f64], tt: f64, next_it: &mut usize) -> Vec<usize> {
    let mut crossed = Vec::new();
    while *next_it < tspan.len() && tt > tspan[*next_it] {
        crossed.push(*next_it);
        *next_it += 1;
    }
    crossed
}
