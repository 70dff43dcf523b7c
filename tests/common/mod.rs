//! Shared test helpers

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use mergelog::shard::{BackingStore, MemoryStore};

/// Memory store with switchable read/close failures
#[derive(Debug, Clone)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    /// Reads at or past this position fail
    fail_reads_from: Arc<AtomicU64>,
    fail_close: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            fail_reads_from: Arc::new(AtomicU64::new(u64::MAX)),
            fail_close: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_reads_from(&self, position: u64) {
        self.fail_reads_from.store(position, Ordering::SeqCst);
    }

    pub fn fail_close(&self) {
        self.fail_close.store(true, Ordering::SeqCst);
    }
}

impl BackingStore for FlakyStore {
    fn read_at(&self, pos: u64, buf: &mut [u8]) -> io::Result<usize> {
        if pos >= self.fail_reads_from.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        self.inner.read_at(pos, buf)
    }

    fn write_at(&mut self, pos: u64, data: &[u8]) -> io::Result<()> {
        self.inner.write_at(pos, data)
    }

    fn len(&self) -> io::Result<u64> {
        self.inner.len()
    }

    fn set_len(&mut self, len: u64) -> io::Result<()> {
        self.inner.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.fail_close.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected close failure"));
        }
        Ok(())
    }
}

/// Deterministic pseudo-random bytes
pub fn random_bytes(seed: u64, len: usize) -> Vec<u8> {
    use rand::{Rng, SeedableRng};

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}
