//! Claim resolution: pruning and optimal one-to-one assignment.

use ndarray::Array2;

use crate::error::TrackingError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentResult {
    /// Matched `(row, col)` pairs in ascending row order
    pub matches: Vec<(usize, usize)>,
    /// Columns no row was paired with, ascending
    pub unmatched_cols: Vec<usize>,
}

/// Clamp every cost at or above `prune_weight` to `max_weight`.
///
/// Non-finite costs are clamped as well.
pub fn prune_costs(cost_matrix: &mut Array2<f64>, prune_weight: f64, max_weight: f64) {
    cost_matrix.mapv_inplace(|cost| if cost < prune_weight { cost } else { max_weight });
}

/// Minimum total cost matching between rows and columns.
///
/// The matrix may be rectangular; it is padded to a square one with a
/// constant so the padding never changes which real cells are optimal.
/// Every real row paired with a real column is reported, whatever its cost.
pub fn linear_assignment(cost_matrix: &Array2<f64>) -> Result<AssignmentResult, TrackingError> {
    let (num_rows, num_cols) = cost_matrix.dim();

    if num_rows == 0 || num_cols == 0 {
        return Ok(AssignmentResult {
            matches: vec![],
            unmatched_cols: (0..num_cols).collect(),
        });
    }

    let size = num_rows.max(num_cols);
    let mut padded = Array2::<f64>::zeros((size, size));
    padded
        .slice_mut(ndarray::s![..num_rows, ..num_cols])
        .assign(cost_matrix);

    let (row_to_col, _) =
        lapjv::lapjv(&padded).map_err(|err| TrackingError::Assignment(format!("{:?}", err)))?;

    let mut matches = vec![];
    let mut unmatched_cols_mask: Vec<bool> = vec![true; num_cols];

    for (row_idx, &col_idx) in row_to_col.iter().enumerate().take(num_rows) {
        if col_idx < num_cols {
            matches.push((row_idx, col_idx));
            unmatched_cols_mask[col_idx] = false;
        }
    }

    let unmatched_cols: Vec<usize> = unmatched_cols_mask
        .iter()
        .enumerate()
        .filter_map(|(i, &u)| if u { Some(i) } else { None })
        .collect();

    Ok(AssignmentResult {
        matches,
        unmatched_cols,
    })
}

/// Prune the claims in `cost_matrix` and solve the assignment.
///
/// The matrix is pruned in place so callers can compare the returned
/// pairs against `max_weight` afterwards.
pub fn resolve_claims(
    cost_matrix: &mut Array2<f64>,
    prune_weight: f64,
    max_weight: f64,
) -> Result<AssignmentResult, TrackingError> {
    prune_costs(cost_matrix, prune_weight, max_weight);
    linear_assignment(cost_matrix)
}
