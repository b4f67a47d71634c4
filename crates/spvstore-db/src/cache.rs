//! Bounded in-memory probe cache: hash -> slot byte offset. Bypasses
//! linear probing for hot keys (the current tip and recent ancestors during
//! reorg walks). Never caches the authoritative bytes, only where to find
//! them.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use spvstore_codec::BlockHash;

const DEFAULT_CAPACITY: usize = 512;

pub struct ProbeCache {
    inner: Mutex<LruCache<BlockHash, u32>>,
}

impl ProbeCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(LruCache::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap())),
        }
    }

    pub fn get(&self, hash: &BlockHash) -> Option<u32> {
        self.inner.lock().get(hash).copied()
    }

    pub fn insert(&self, hash: BlockHash, slot_index: u32) {
        self.inner.lock().put(hash, slot_index);
    }

    pub fn invalidate(&self, hash: &BlockHash) {
        self.inner.lock().pop(hash);
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Default for ProbeCache {
    fn default() -> Self {
        Self::new()
    }
}
