// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Vnode
//!
//! In-memory representative of a remote object. A vnode exposes only its
//! handle and kind; everything else is fetched from the server on demand.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for vnode

use crate::domain::file_handle::FileHandle;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;

/// Identifier the host VFS uses to refer to a vnode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VnodeId(pub u64);

impl fmt::Display for VnodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Object kind, fixed when the vnode is created
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnodeKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Anything else the server reports (devices, symlinks, sockets)
    Unknown,
}

/// Cached remote object
///
/// The per-vnode lock serializes every state-changing operation on this
/// object, including the network calls it issues.
pub struct Vnode {
    id: VnodeId,
    handle: FileHandle,
    kind: VnodeKind,
    lock: Mutex<()>,
}

impl Vnode {
    pub(crate) fn new(id: VnodeId, handle: FileHandle, kind: VnodeKind) -> Self {
        Self {
            id,
            handle,
            kind,
            lock: Mutex::new(()),
        }
    }

    pub fn id(&self) -> VnodeId {
        self.id
    }

    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }

    pub fn kind(&self) -> VnodeKind {
        self.kind
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.kind == VnodeKind::Directory
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == VnodeKind::File
    }

    /// Acquire the per-vnode operation lock
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }
}

impl fmt::Debug for Vnode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Vnode")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("kind", &self.kind)
            .finish()
    }
}
