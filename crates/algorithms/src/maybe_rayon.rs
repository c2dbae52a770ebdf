//! Row-parallel helpers.
//!
//! With the `parallel` feature rows are produced on rayon workers; without
//! it they are produced in order on the calling thread. Output order is the
//! same either way.

/// Build a row-major buffer by calling `f` once per row and concatenating
/// the returned rows.
pub(crate) fn map_rows<T, F>(rows: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> Vec<T> + Sync + Send,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        (0..rows).into_par_iter().flat_map_iter(f).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        (0..rows).flat_map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_concatenated_in_order() {
        let out = map_rows(4, |r| vec![r * 10, r * 10 + 1]);
        assert_eq!(out, vec![0, 1, 10, 11, 20, 21, 30, 31]);
        assert!(map_rows(0, |_| vec![1u8]).is_empty());
    }
}
