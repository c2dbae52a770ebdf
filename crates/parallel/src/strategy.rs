//! Execution strategies for per-tile work

use roofarea_core::{Error, Result};

/// Processing mode for tiled operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global rayon pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

/// Strategy for mapping work items to results
pub trait ParallelStrategy {
    /// Map `f` over `items`, returning results in input order
    fn map_ordered<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn map_ordered<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => Ok(items.into_iter().map(f).collect()),
            #[cfg(feature = "parallel")]
            ProcessingMode::Parallel => {
                use rayon::prelude::*;
                Ok(items.into_par_iter().map(f).collect())
            }
            #[cfg(feature = "parallel")]
            ProcessingMode::ParallelWith(threads) => {
                use rayon::prelude::*;
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(*threads)
                    .build()
                    .map_err(|e| Error::Algorithm(format!("failed to build thread pool: {}", e)))?;
                Ok(pool.install(|| items.into_par_iter().map(f).collect()))
            }
            #[cfg(not(feature = "parallel"))]
            ProcessingMode::Parallel | ProcessingMode::ParallelWith(_) => {
                Ok(items.into_iter().map(f).collect())
            }
        }
    }
}
