// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Reference-counting host
//!
//! Minimal [`HostVfs`] that only keeps per-vnode reference counts. It stands
//! in for a kernel VFS when the driver is used from a plain process (the
//! `nfsc` CLI) and lets tests observe and inject host behaviour.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for host

use crate::domain::vfs::{FsId, HostVfs, HostVfsError};
use crate::domain::vnode::VnodeId;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Default)]
pub struct RefCountingHost {
    refs: Mutex<HashMap<(FsId, VnodeId), usize>>,
    /// Refuse new references once this many vnodes are held
    limit: Option<usize>,
}

impl RefCountingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Host that refuses references beyond `limit` distinct vnodes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            refs: Mutex::new(HashMap::new()),
            limit: Some(limit),
        }
    }

    pub fn ref_count(&self, fs: FsId, vnid: VnodeId) -> usize {
        self.refs.lock().get(&(fs, vnid)).copied().unwrap_or(0)
    }

    /// Number of distinct vnodes the host currently references
    pub fn held(&self) -> usize {
        self.refs.lock().len()
    }
}

impl HostVfs for RefCountingHost {
    fn get_vnode(&self, fs: FsId, vnid: VnodeId) -> Result<(), HostVfsError> {
        let mut refs = self.refs.lock();
        if let Some(count) = refs.get_mut(&(fs, vnid)) {
            *count += 1;
            return Ok(());
        }
        if self.limit.is_some_and(|limit| refs.len() >= limit) {
            return Err(HostVfsError::Exhausted);
        }
        refs.insert((fs, vnid), 1);
        debug!("Host ref taken: fs={}, vnid={}", fs, vnid);
        Ok(())
    }

    fn put_vnode(&self, fs: FsId, vnid: VnodeId) -> bool {
        let mut refs = self.refs.lock();
        match refs.get_mut(&(fs, vnid)) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                refs.remove(&(fs, vnid));
                debug!("Host ref released: fs={}, vnid={}", fs, vnid);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_vnode() {
        let host = RefCountingHost::new();
        let fs = FsId(1);

        host.get_vnode(fs, VnodeId(5)).unwrap();
        host.get_vnode(fs, VnodeId(5)).unwrap();
        host.get_vnode(FsId(2), VnodeId(5)).unwrap();
        assert_eq!(host.ref_count(fs, VnodeId(5)), 2);
        assert_eq!(host.held(), 2);

        assert!(!host.put_vnode(fs, VnodeId(5)));
        assert!(host.put_vnode(fs, VnodeId(5)));
        assert!(!host.put_vnode(fs, VnodeId(5)));
        assert_eq!(host.ref_count(fs, VnodeId(5)), 0);
    }

    #[test]
    fn test_limit_refuses_new_vnodes_only() {
        let host = RefCountingHost::with_limit(1);
        let fs = FsId(1);

        host.get_vnode(fs, VnodeId(1)).unwrap();
        assert!(matches!(host.get_vnode(fs, VnodeId(2)), Err(HostVfsError::Exhausted)));
        // existing vnode can still gain references
        host.get_vnode(fs, VnodeId(1)).unwrap();
        assert_eq!(host.ref_count(fs, VnodeId(1)), 2);
    }
}
