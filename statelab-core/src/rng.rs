//! Deterministic seed hierarchy.
//!
//! A master seed expands into labelled sub-seeds (one per clustering restart,
//! per synthetic series, per batch symbol). Sub-seeds come from BLAKE3 over
//! `(master, label, index)`, so they do not depend on the order in which
//! they are requested or on how many threads are involved.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive the sub-seed for `(label, index)`.
    pub fn sub_seed(&self, label: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(&(label.len() as u64).to_le_bytes());
        hasher.update(label.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    pub fn rng_for(&self, label: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(label, index))
    }

    /// Child hierarchy rooted at `(label, index)`.
    pub fn child(&self, label: &str, index: u64) -> Self {
        Self::new(self.sub_seed(label, index))
    }
}
