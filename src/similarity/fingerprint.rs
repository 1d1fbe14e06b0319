//! Rolling-hash fingerprinting of document text.
//!
//! # Overview
//!
//! A fingerprint is the set of Rabin-Karp hashes of every window of
//! `window_size` consecutive characters. The first window is evaluated
//! directly as a polynomial in base [`HASH_BASE`]; every following window is
//! derived from its predecessor in O(1) by removing the leaving character and
//! adding the entering one.
//!
//! All arithmetic is done on `u32` with wrapping operations, which is exactly
//! arithmetic modulo 2^32: every stored value is the non-negative residue.
//!
//! Text is processed as a sequence of Unicode scalar values, so a window of
//! size 5 always spans five characters regardless of their UTF-8 width.
//!
//! # Example
//!
//! ```
//! use neardupe::similarity::fingerprint;
//!
//! let fp = fingerprint("the quick brown fox", 5).unwrap();
//! assert_eq!(fp.window_count(), 15);
//! assert!(!fp.is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

/// Multiplicative base of the polynomial hash.
pub const HASH_BASE: u32 = 101;

/// Errors that can occur while fingerprinting text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    /// Window size is zero or longer than the text.
    #[error("invalid window size {window_size} for text of {text_len} characters")]
    InvalidWindow {
        /// Requested window size
        window_size: usize,
        /// Length of the text in characters
        text_len: usize,
    },
}

/// The set of distinct window hashes of a text.
///
/// Repeated substrings coalesce into a single hash, so `len()` may be smaller
/// than [`window_count`](Self::window_count).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintSet {
    hashes: HashSet<u32>,
    windows: usize,
}

impl FingerprintSet {
    /// Build a set from an ordered sequence of window hashes.
    #[must_use]
    pub fn from_hashes(hashes: &[u32]) -> Self {
        Self {
            hashes: hashes.iter().copied().collect(),
            windows: hashes.len(),
        }
    }

    /// Number of distinct hashes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Whether the set holds no hashes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Number of windows the text produced (before de-duplication).
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.windows
    }

    /// Whether the given hash occurs in the set.
    #[must_use]
    pub fn contains(&self, hash: u32) -> bool {
        self.hashes.contains(&hash)
    }

    /// Number of hashes shared with `other`.
    #[must_use]
    pub fn intersection_len(&self, other: &FingerprintSet) -> usize {
        // Iterate the smaller set
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .hashes
            .iter()
            .filter(|h| large.hashes.contains(h))
            .count()
    }

    /// Iterate over the distinct hashes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.hashes.iter().copied()
    }
}

/// Compute the ordered rolling hash of every window of `window_size` characters.
///
/// The returned vector has exactly `chars(text) - window_size + 1` entries.
///
/// # Errors
///
/// Returns [`FingerprintError::InvalidWindow`] if `window_size` is zero or
/// exceeds the number of characters in `text`.
pub fn rolling_hashes(text: &str, window_size: usize) -> Result<Vec<u32>, FingerprintError> {
    let units: Vec<u32> = text.chars().map(u32::from).collect();
    let n = units.len();
    if window_size == 0 || window_size > n {
        return Err(FingerprintError::InvalidWindow {
            window_size,
            text_len: n,
        });
    }

    // base^window_size, needed to cancel the leaving unit after the shift
    let base_pow = wrapping_pow(HASH_BASE, window_size);

    let mut out = Vec::with_capacity(n - window_size + 1);
    let mut h = 0u32;
    for &unit in &units[..window_size] {
        h = h.wrapping_mul(HASH_BASE).wrapping_add(unit);
    }
    out.push(h);

    for (&old, &new) in units.iter().zip(units.iter().skip(window_size)) {
        h = h
            .wrapping_mul(HASH_BASE)
            .wrapping_sub(old.wrapping_mul(base_pow))
            .wrapping_add(new);
        out.push(h);
    }

    log::trace!(
        "Computed {} window hashes (window={}, chars={})",
        out.len(),
        window_size,
        n
    );

    Ok(out)
}

/// Compute the fingerprint set of `text` for the given window size.
///
/// # Errors
///
/// Returns [`FingerprintError::InvalidWindow`] if `window_size` is zero or
/// exceeds the number of characters in `text`.
pub fn fingerprint(text: &str, window_size: usize) -> Result<FingerprintSet, FingerprintError> {
    rolling_hashes(text, window_size).map(|hashes| FingerprintSet::from_hashes(&hashes))
}

fn wrapping_pow(base: u32, exp: usize) -> u32 {
    let mut result = 1u32;
    let mut b = base;
    let mut e = exp;
    while e > 0 {
        if e & 1 == 1 {
            result = result.wrapping_mul(b);
        }
        b = b.wrapping_mul(b);
        e >>= 1;
    }
    result
}
