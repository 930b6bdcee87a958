/// Parallel processing utilities
use crate::{GistError, Result};

/// 0 means "all available cores".
pub fn resolve_threads(threads: usize) -> usize {
    if threads == 0 {
        num_cpus::get()
    } else {
        threads
    }
}

/// Build a bounded pool for one batch of independent tasks. Pools are not
/// shared between batches or jobs.
pub fn batch_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(resolve_threads(threads))
        .thread_name(|idx| format!("gist-stratum-{}", idx))
        .build()
        .map_err(|e| GistError::Config(format!("Failed to build thread pool: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_threads() {
        assert_eq!(resolve_threads(3), 3);
        assert!(resolve_threads(0) >= 1);
    }

    #[test]
    fn test_batch_pool_size() {
        let pool = batch_pool(2).unwrap();
        assert_eq!(pool.current_num_threads(), 2);
    }
}
