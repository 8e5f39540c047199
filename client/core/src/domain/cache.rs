// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Vnode Cache
//!
//! Maps server file handles to cached vnodes and vnode ids back to vnodes.
//! The cache's `RwLock` is the session lock: it guards structural mutation
//! only and is never held across a network call.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** At most one vnode per file handle at any instant

use crate::domain::file_handle::{FileHandle, HandleBuildHasher};
use crate::domain::status::{NfsError, NfsResult};
use crate::domain::vnode::{Vnode, VnodeId, VnodeKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Initial bucket count for a freshly mounted filesystem
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

struct CacheTables {
    by_handle: HashMap<FileHandle, Arc<Vnode>, HandleBuildHasher>,
    by_id: HashMap<VnodeId, Arc<Vnode>>,
    /// Times each vnode was handed out by `insert_or_get` and not withdrawn
    claims: HashMap<VnodeId, usize>,
}

impl CacheTables {
    fn evict(&mut self, vnode: &Vnode) {
        self.by_handle.remove(vnode.handle());
        self.by_id.remove(&vnode.id());
        self.claims.remove(&vnode.id());
    }
}

/// Handle → vnode table owned by a mount session
pub struct VnodeCache {
    tables: RwLock<CacheTables>,
    next_id: AtomicU64,
}

impl VnodeCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tables: RwLock::new(CacheTables {
                by_handle: HashMap::with_capacity_and_hasher(capacity, HandleBuildHasher::default()),
                by_id: HashMap::with_capacity(capacity),
                claims: HashMap::with_capacity(capacity),
            }),
            next_id: AtomicU64::new(1),
        }
    }

    /// Find the vnode cached for `handle`
    pub fn lookup(&self, handle: &FileHandle) -> Option<Arc<Vnode>> {
        self.tables.read().by_handle.get(handle).cloned()
    }

    /// Find a vnode by the id handed to the host
    pub fn get(&self, id: VnodeId) -> Option<Arc<Vnode>> {
        self.tables.read().by_id.get(&id).cloned()
    }

    /// Return the vnode for `handle`, creating and inserting one if absent
    ///
    /// The existence check and the insertion happen under one write lock, so
    /// racing callers for the same handle converge on a single vnode. The
    /// boolean is `true` when this call inserted it. Every hand-out counts as
    /// a claim until the caller gives it back through [`VnodeCache::withdraw`].
    pub fn insert_or_get(&self, handle: FileHandle, kind: VnodeKind) -> NfsResult<(Arc<Vnode>, bool)> {
        let mut tables = self.tables.write();
        if let Some(existing) = tables.by_handle.get(&handle).cloned() {
            *tables.claims.entry(existing.id()).or_insert(0) += 1;
            return Ok((existing, false));
        }

        tables.by_handle.try_reserve(1).map_err(|_| NfsError::NoMemory)?;
        tables.by_id.try_reserve(1).map_err(|_| NfsError::NoMemory)?;
        tables.claims.try_reserve(1).map_err(|_| NfsError::NoMemory)?;

        let id = VnodeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let vnode = Arc::new(Vnode::new(id, handle, kind));
        tables.by_handle.insert(handle, vnode.clone());
        tables.by_id.insert(id, vnode.clone());
        tables.claims.insert(id, 1);

        debug!("Cached vnode: id={}, kind={:?}, handle={}", id, kind, handle);
        Ok((vnode, true))
    }

    /// Remove `vnode` if it is still the entry cached for its handle
    pub fn remove(&self, vnode: &Arc<Vnode>) -> bool {
        let mut tables = self.tables.write();
        match tables.by_handle.get(vnode.handle()) {
            Some(cached) if Arc::ptr_eq(cached, vnode) => {
                tables.evict(vnode);
                debug!("Evicted vnode: id={}", vnode.id());
                true
            }
            _ => false,
        }
    }

    /// Give back one claim taken by `insert_or_get` whose caller could not use it
    ///
    /// The vnode is evicted only when no claim on it remains, so a vnode
    /// another caller already handed to the host stays cached. Returns `true`
    /// when this call evicted it.
    pub fn withdraw(&self, vnode: &Arc<Vnode>) -> bool {
        let mut tables = self.tables.write();
        match tables.by_handle.get(vnode.handle()) {
            Some(cached) if Arc::ptr_eq(cached, vnode) => {}
            _ => return false,
        }

        let remaining = match tables.claims.get_mut(&vnode.id()) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining > 0 {
            debug!("Vnode {} still claimed {} time(s), kept", vnode.id(), remaining);
            return false;
        }

        tables.evict(vnode);
        debug!("Withdrew and evicted vnode: id={}", vnode.id());
        true
    }

    pub fn len(&self) -> usize {
        self.tables.read().by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached vnode
    pub fn clear(&self) {
        let mut tables = self.tables.write();
        tables.by_handle.clear();
        tables.by_id.clear();
        tables.claims.clear();
    }
}
