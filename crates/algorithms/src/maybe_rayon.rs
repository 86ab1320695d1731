//! Row-parallel execution that degrades to a plain loop.
//!
//! With the `parallel` feature the rows are handed to rayon; without it they
//! run in order on the calling thread. Rows are always concatenated in row
//! order, so both builds produce identical grids.

/// Evaluate `row_fn` for every row index in `0..rows` and concatenate the
/// per-row outputs in row order.
#[cfg(feature = "parallel")]
pub(crate) fn collect_rows<T, F>(rows: usize, row_fn: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    use rayon::prelude::*;

    (0..rows).into_par_iter().flat_map_iter(row_fn).collect()
}

#[cfg(not(feature = "parallel"))]
pub(crate) fn collect_rows<T, F>(rows: usize, row_fn: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    (0..rows).flat_map(row_fn).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_concatenated_in_order() {
        let out = collect_rows(3, |row| vec![row * 10, row * 10 + 1]);
        assert_eq!(out, vec![0, 1, 10, 11, 20, 21]);
    }

    #[test]
    fn zero_rows_is_empty() {
        let out: Vec<u8> = collect_rows(0, |_| vec![1]);
        assert!(out.is_empty());
    }
}
