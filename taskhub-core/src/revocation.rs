//! Bloom-filter revocation tracking for bearer tokens.
//!
//! Logout must invalidate a token immediately, long before its signed
//! expiry, without keeping a row per revoked token for the lifetime of the
//! process. The filter answers "was this token revoked?" in O(hash rounds)
//! time and fixed space, at the cost of a bounded false-positive rate: a
//! token that was never revoked may occasionally be reported as revoked (and
//! the caller re-authenticates), but a revoked token is never reported as
//! valid.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AccessError;

/// Default backing size hint in bytes (so 80 000 bits).
pub const DEFAULT_CAPACITY_HINT: usize = 10_000;
/// Default number of independent hash rounds per token.
pub const DEFAULT_HASH_COUNT: u32 = 3;

/// Fixed-size bit array with `hash_count` salted SHA-256 rounds per token.
///
/// Bits are only ever set; the sole bulk mutation is [`clear`], which resets
/// the whole filter (per-item removal is structurally unsafe for a Bloom
/// filter). Concurrent `add`s go through `fetch_or` on the touched word so
/// no update is lost, and `clear` takes the write side of a gate that every
/// reader holds for the duration of a lookup.
///
/// [`clear`]: RevocationFilter::clear
pub struct RevocationFilter {
    words: Box<[AtomicU64]>,
    bits: u64,
    hash_count: u32,
    /// Readers = `add`/`contains`; writer = `clear`.
    clear_gate: RwLock<()>,
}

/// Read-only introspection of a filter, safe to expose on a diagnostic
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub bits: u64,
    pub hash_count: u32,
    pub byte_size: usize,
}

impl fmt::Debug for RevocationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevocationFilter")
            .field("bits", &self.bits)
            .field("hash_count", &self.hash_count)
            .finish()
    }
}

impl Default for RevocationFilter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY_HINT, DEFAULT_HASH_COUNT)
    }
}

impl RevocationFilter {
    /// Allocate a filter of `capacity_hint * 8` bits using `hash_count`
    /// rounds.
    ///
    /// # Panics
    ///
    /// Panics when either argument is zero; config validation rejects those
    /// values before a filter is ever constructed.
    pub fn new(capacity_hint: usize, hash_count: u32) -> Self {
        assert!(capacity_hint > 0, "capacity hint must be non-zero");
        assert!(hash_count > 0, "hash count must be non-zero");

        let bits = capacity_hint as u64 * 8;
        let words = (0..(bits as usize).div_ceil(64))
            .map(|_| AtomicU64::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            words,
            bits,
            hash_count,
            clear_gate: RwLock::new(()),
        }
    }

    /// Mark a token as revoked. Idempotent.
    pub fn add(&self, token: &str) -> Result<(), AccessError> {
        let positions = self.bit_positions(token)?;

        let _gate = self.clear_gate.read();
        for position in positions {
            let (word, mask) = Self::word_and_mask(position);
            self.words[word].fetch_or(mask, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Membership test: `false` is definitive, `true` may be a false
    /// positive (probability ≈ `(1 − e^(−Kn/M))^K` after `n` insertions).
    pub fn contains(&self, token: &str) -> Result<bool, AccessError> {
        let positions = self.bit_positions(token)?;

        let _gate = self.clear_gate.read();
        for position in positions {
            let (word, mask) = Self::word_and_mask(position);
            if self.words[word].load(Ordering::Relaxed) & mask == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Reset every bit. The only supported removal, applied to the whole
    /// filter; all previously added tokens become unknown again.
    pub fn clear(&self) {
        let _gate = self.clear_gate.write();
        for word in self.words.iter() {
            word.store(0, Ordering::Relaxed);
        }
    }

    pub fn stats(&self) -> FilterStats {
        FilterStats {
            bits: self.bits,
            hash_count: self.hash_count,
            byte_size: self.words.len() * 8,
        }
    }

    /// Derive one bit position per hash round from SHA-256 of the token
    /// salted with the round index, reduced modulo the bit count.
    fn bit_positions(&self, token: &str) -> Result<Vec<u64>, AccessError> {
        (0..self.hash_count)
            .map(|round| {
                let mut hasher = Sha256::new();
                hasher.update(token.as_bytes());
                hasher.update(round.to_string().as_bytes());
                let digest = hasher.finalize();

                let head: [u8; 4] = digest
                    .get(..4)
                    .and_then(|slice| slice.try_into().ok())
                    .ok_or(AccessError::HashFailure)?;
                Ok(u64::from(u32::from_le_bytes(head)) % self.bits)
            })
            .collect()
    }

    fn word_and_mask(position: u64) -> (usize, u64) {
        ((position / 64) as usize, 1u64 << (position % 64))
    }

    #[cfg(test)]
    fn snapshot(&self) -> Vec<u64> {
        self.words
            .iter()
            .map(|word| word.load(Ordering::Relaxed))
            .collect()
    }
}
