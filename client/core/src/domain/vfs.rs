// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Host VFS Contract
//!
//! Two directions of the same boundary:
//!
//! - [`FsCalls`] is what the host invokes on a mounted filesystem driver.
//! - [`HostVfs`] is what the driver calls back into the host for: taking and
//!   releasing the host's reference on a vnode id.
//!
//! Vnode reference counting, path resolution and mount-point management all
//! belong to the host; the driver only reports ids and honours final release.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Collaborator contracts between driver and host

use crate::domain::cursor::{DirCursor, FileCursor, OpenFlags, SeekMode};
use crate::domain::status::NfsResult;
use crate::domain::vnode::{Vnode, VnodeId, VnodeKind};
use std::fmt;
use std::io::{IoSlice, IoSliceMut};
use std::sync::Arc;
use thiserror::Error;

/// Identifier the host assigns to a mounted filesystem instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FsId(pub u32);

impl fmt::Display for FsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Failure reported by the host when asked for a vnode reference
#[derive(Debug, Error)]
pub enum HostVfsError {
    #[error("Vnode {vnid} is unknown to filesystem {fs}")]
    UnknownVnode { fs: FsId, vnid: VnodeId },

    #[error("Host vnode table exhausted")]
    Exhausted,
}

/// Callbacks the driver makes into the host VFS
pub trait HostVfs: Send + Sync {
    /// Take a host reference on `vnid`
    fn get_vnode(&self, fs: FsId, vnid: VnodeId) -> Result<(), HostVfsError>;

    /// Release a host reference on `vnid`
    ///
    /// Returns `true` when this was the last reference and the host has
    /// finished with the vnode.
    fn put_vnode(&self, fs: FsId, vnid: VnodeId) -> bool;
}

/// Subset of attributes reported by `rstat`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub vnid: VnodeId,
    pub size: u64,
    pub kind: VnodeKind,
}

/// Operations a filesystem driver exposes to the host VFS
///
/// Every call is synchronous. Methods that act on a vnode lock it for their
/// whole duration, network round trips included.
pub trait FsCalls: Send + Sync {
    /// Driver-specific mount parameters
    type MountArgs;

    /// Mount `device` as filesystem `fs`, returning the driver and root vnode id
    fn mount(fs: FsId, device: &str, args: Self::MountArgs) -> NfsResult<(Self, VnodeId)>
    where
        Self: Sized;

    /// Tear the filesystem down; always consumes the driver
    fn unmount(self) -> NfsResult<()>
    where
        Self: Sized;

    fn sync(&self) -> NfsResult<()>;

    /// Resolve `name` inside `dir` and take a host reference on the result
    fn lookup(&self, dir: &Vnode, name: &str) -> NfsResult<VnodeId>;

    fn getvnode(&self, vnid: VnodeId) -> NfsResult<Arc<Vnode>>;

    /// Final release of a vnode by the host
    fn putvnode(&self, vnode: Arc<Vnode>) -> NfsResult<()>;

    fn removevnode(&self, vnode: Arc<Vnode>) -> NfsResult<()>;

    fn opendir(&self, vnode: &Arc<Vnode>) -> NfsResult<DirCursor>;

    fn closedir(&self, vnode: &Vnode, cursor: DirCursor) -> NfsResult<()>;

    fn rewinddir(&self, cursor: &mut DirCursor) -> NfsResult<()>;

    /// Copy the next entry's name into `buf`, returning its length; `0` at end
    fn readdir(&self, cursor: &mut DirCursor, buf: &mut [u8]) -> NfsResult<usize>;

    fn open(&self, vnode: &Arc<Vnode>, flags: OpenFlags) -> NfsResult<FileCursor>;

    fn close(&self, vnode: &Vnode, cursor: &FileCursor) -> NfsResult<()>;

    fn freecookie(&self, vnode: &Vnode, cursor: FileCursor) -> NfsResult<()>;

    fn fsync(&self, vnode: &Vnode) -> NfsResult<()>;

    /// Read into `buf` at `pos`, or at the cursor's offset when `pos` is `None`
    fn read(&self, cursor: &mut FileCursor, buf: &mut [u8], pos: Option<u64>) -> NfsResult<usize>;

    fn write(&self, cursor: &mut FileCursor, buf: &[u8], pos: Option<u64>) -> NfsResult<usize>;

    /// Reposition the cursor, returning the new offset
    fn seek(&self, cursor: &mut FileCursor, pos: i64, mode: SeekMode) -> NfsResult<u64>;

    fn ioctl(&self, cursor: &mut FileCursor, op: u32, buf: &mut [u8]) -> NfsResult<usize>;

    fn canpage(&self, vnode: &Vnode) -> bool;

    /// Scatter-read starting at `pos`; short tails are zero-filled
    fn readpage(&self, vnode: &Vnode, bufs: &mut [IoSliceMut<'_>], pos: u64) -> NfsResult<usize>;

    fn writepage(&self, vnode: &Vnode, bufs: &[IoSlice<'_>], pos: u64) -> NfsResult<usize>;

    fn create(&self, dir: &Vnode, name: &str) -> NfsResult<VnodeId>;

    fn unlink(&self, dir: &Vnode, name: &str) -> NfsResult<()>;

    fn rename(&self, old_dir: &Vnode, old_name: &str, new_dir: &Vnode, new_name: &str) -> NfsResult<()>;

    fn mkdir(&self, dir: &Vnode, name: &str) -> NfsResult<()>;

    fn rmdir(&self, dir: &Vnode, name: &str) -> NfsResult<()>;

    fn rstat(&self, vnode: &Vnode) -> NfsResult<FileStat>;

    fn wstat(&self, vnode: &Vnode, stat: &FileStat, mask: u32) -> NfsResult<()>;
}
