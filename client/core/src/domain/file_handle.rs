// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NFS FileHandle
//!
//! Fixed-size opaque handle issued by the server. The client never interprets
//! the bytes; it only carries them back to the server and compares them.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Cache key for the vnode cache, with the word-sum bucket hash

use std::fmt;
use std::hash::{BuildHasherDefault, Hash, Hasher};

/// Size of an NFSv2 file handle on the wire (`FHSIZE`).
pub const FHSIZE: usize = 32;

/// Server-issued opaque file handle
///
/// Equality is a byte-for-byte comparison of the whole handle.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileHandle([u8; FHSIZE]);

impl FileHandle {
    /// Wrap raw handle bytes
    pub const fn new(bytes: [u8; FHSIZE]) -> Self {
        Self(bytes)
    }

    /// Build a handle from a slice that must be exactly [`FHSIZE`] bytes long
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; FHSIZE] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; FHSIZE] {
        &self.0
    }

    /// Sum of the handle's 32-bit words with the high half folded into the low half
    pub fn word_hash(&self) -> u32 {
        let mut hasher = HandleHasher::default();
        hasher.write(&self.0);
        hasher.folded()
    }
}

impl Hash for FileHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0);
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileHandle({})", hex::encode(self.0))
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Hasher that sums native-endian 32-bit words
///
/// Used through [`HandleBuildHasher`] so the vnode cache buckets handles the
/// same way regardless of the std hasher's seed.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleHasher {
    sum: u32,
}

impl HandleHasher {
    fn folded(&self) -> u32 {
        self.sum.wrapping_add(self.sum >> 16)
    }
}

impl Hasher for HandleHasher {
    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(4) {
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            self.sum = self.sum.wrapping_add(u32::from_ne_bytes(word));
        }
    }

    fn finish(&self) -> u64 {
        // hashbrown takes its control tag from the top bits
        let folded = self.folded() as u64;
        (folded << 32) | folded
    }
}

/// `BuildHasher` for maps keyed by [`FileHandle`]
pub type HandleBuildHasher = BuildHasherDefault<HandleHasher>;
