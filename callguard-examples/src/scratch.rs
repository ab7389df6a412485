use std::sync::{Mutex, PoisonError};

/// Stand-in for an accelerator allocation cache.
///
/// Leased buffers stay cached until [`ScratchPool::release_all`] runs, the way
/// a device allocator keeps freed blocks around until asked to empty its cache.
#[derive(Debug, Default)]
pub struct ScratchPool {
    buffers: Mutex<Vec<Vec<u8>>>,
}

impl ScratchPool {
    /// Allocates a zeroed buffer of `size` bytes and caches it.
    pub fn lease(&self, size: usize) -> usize {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        buffers.push(vec![0; size]);
        buffers.iter().map(Vec::len).sum()
    }

    /// Frees every cached buffer and returns how many bytes were released.
    pub fn release_all(&self) -> usize {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        let released = buffers.iter().map(Vec::len).sum();
        buffers.clear();
        buffers.shrink_to_fit();
        released
    }

    pub fn cached_bytes(&self) -> usize {
        let buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        buffers.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_all_empties_the_cache() {
        let pool = ScratchPool::default();

        assert_eq!(pool.lease(16), 16);
        assert_eq!(pool.lease(8), 24);
        assert_eq!(pool.release_all(), 24);
        assert_eq!(pool.cached_bytes(), 0);
    }
}
