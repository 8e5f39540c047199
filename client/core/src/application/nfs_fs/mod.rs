// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NFS Filesystem Driver
//!
//! [`NfsFs`] implements the host VFS contract ([`FsCalls`]) on top of a
//! [`MountSession`]. Each handler locks the vnode it operates on, packs the
//! protocol arguments, issues synchronous calls through the session and
//! translates the reply.
//!
//! The handlers are split by concern:
//! - `dir` — directory cursors and paged READDIR
//! - `io` — chunked READ, seek, paging and attribute fetch
//! - `create` — CREATE/MKDIR and REMOVE/RMDIR
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Operation handlers behind the host VFS contract

mod create;
mod dir;
mod io;

pub use create::ObjectKind;
pub use dir::READDIR_BUF_SIZE;
pub use io::{MAX_READ_POSITION, READ_BUF_SIZE};

use crate::application::session::{MountSession, MountSpec};
use crate::domain::cache::DEFAULT_CACHE_CAPACITY;
use crate::domain::cursor::{DirCursor, FileCursor, OpenFlags, SeekMode};
use crate::domain::file_handle::FileHandle;
use crate::domain::rpc::{NfsProc, RpcTransport};
use crate::domain::status::{NfsError, NfsResult};
use crate::domain::vfs::{FileStat, FsCalls, FsId, HostVfs};
use crate::domain::vnode::{Vnode, VnodeId, VnodeKind};
use crate::infrastructure::xdr::{decode_diropres, pack, DirOpArgs, XdrEncode, XdrError, DIROPRES_LEN};
use bytes::BytesMut;
use std::io::{IoSlice, IoSliceMut};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators handed to [`NfsFs::mount`]
#[derive(Clone)]
pub struct NfsMountArgs {
    pub transport: Arc<dyn RpcTransport>,
    pub host: Arc<dyn HostVfs>,
    pub cache_capacity: usize,
}

impl NfsMountArgs {
    pub fn new(transport: Arc<dyn RpcTransport>, host: Arc<dyn HostVfs>) -> Self {
        Self {
            transport,
            host,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }
}

/// A mounted NFSv2 filesystem
pub struct NfsFs {
    session: MountSession,
    host: Arc<dyn HostVfs>,
}

impl std::fmt::Debug for NfsFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfsFs")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl NfsFs {
    pub fn session(&self) -> &MountSession {
        &self.session
    }

    pub fn fs_id(&self) -> FsId {
        self.session.fs_id()
    }

    pub fn root(&self) -> &Arc<Vnode> {
        self.session.root()
    }

    /// Bring the vnode for `handle` into the cache and take a host reference
    ///
    /// If the host refuses the reference, this call's claim on the vnode is
    /// withdrawn; the vnode is evicted only when no other caller holds one.
    fn materialize(&self, handle: FileHandle, kind: VnodeKind) -> NfsResult<VnodeId> {
        let cache = self.session.cache();
        let (vnode, inserted) = cache.insert_or_get(handle, kind)?;

        if let Err(e) = self.host.get_vnode(self.fs_id(), vnode.id()) {
            warn!("Host refused vnode {} (inserted={}): {}", vnode.id(), inserted, e);
            cache.withdraw(&vnode);
            return Err(NfsError::NotFound);
        }
        Ok(vnode.id())
    }
}

/// Pack arguments, reporting oversized names as [`NfsError::PathTooLong`]
fn encode_args<T: XdrEncode>(args: &T) -> NfsResult<BytesMut> {
    pack(args).map_err(|e| match e {
        XdrError::TooLong { .. } => NfsError::PathTooLong,
        other => other.into(),
    })
}

impl FsCalls for NfsFs {
    type MountArgs = NfsMountArgs;

    fn mount(fs: FsId, device: &str, args: NfsMountArgs) -> NfsResult<(Self, VnodeId)> {
        debug!("NFS MOUNT: fs={}, device='{}'", fs, device);
        let spec: MountSpec = device.parse()?;
        let session = MountSession::establish(fs, &spec, args.transport, args.cache_capacity)?;

        let root_id = session.root().id();
        if let Err(e) = args.host.get_vnode(fs, root_id) {
            warn!("Host refused the root vnode of {}: {}", spec, e);
            session.teardown();
            return Err(e.into());
        }

        Ok((
            Self {
                session,
                host: args.host,
            },
            root_id,
        ))
    }

    fn unmount(self) -> NfsResult<()> {
        debug!("NFS UNMOUNT: fs={}", self.fs_id());
        self.host.put_vnode(self.fs_id(), self.root().id());
        self.session.teardown();
        info!("Unmounted fs {}", self.fs_id());
        Ok(())
    }

    fn sync(&self) -> NfsResult<()> {
        debug!("NFS SYNC: fs={}", self.fs_id());
        Ok(())
    }

    fn lookup(&self, dir: &Vnode, name: &str) -> NfsResult<VnodeId> {
        debug!("NFS LOOKUP: dir={}, name={}", dir.id(), name);
        let _guard = dir.lock();

        let args = encode_args(&DirOpArgs { dir: dir.handle(), name })?;
        let mut response = [0u8; DIROPRES_LEN];
        let n = match self.session.nfs_call(NfsProc::Lookup, &args, &mut response) {
            Ok(n) => n,
            Err(e) => {
                debug!("NFS LOOKUP: '{}' call failed: {}", name, e);
                return Err(NfsError::NotFound);
            }
        };

        let found = match decode_diropres(&response[..n]) {
            Ok(Ok(found)) => found,
            Ok(Err(status)) => {
                debug!("NFS LOOKUP: '{}' not found (status {})", name, status.code());
                return Err(NfsError::NotFound);
            }
            Err(e) => {
                warn!("NFS LOOKUP: malformed reply for '{}': {}", name, e);
                return Err(NfsError::NotFound);
            }
        };

        self.materialize(found.file, found.attributes.ftype.into())
    }

    fn getvnode(&self, vnid: VnodeId) -> NfsResult<Arc<Vnode>> {
        debug!("NFS GETVNODE: vnid={}", vnid);
        self.session.cache().get(vnid).ok_or(NfsError::NotFound)
    }

    fn putvnode(&self, vnode: Arc<Vnode>) -> NfsResult<()> {
        debug!("NFS PUTVNODE: vnid={}", vnode.id());
        self.session.cache().remove(&vnode);
        Ok(())
    }

    fn removevnode(&self, vnode: Arc<Vnode>) -> NfsResult<()> {
        debug!("NFS REMOVEVNODE: vnid={}", vnode.id());
        Err(NfsError::NotSupported)
    }

    fn opendir(&self, vnode: &Arc<Vnode>) -> NfsResult<DirCursor> {
        self.open_dir(vnode)
    }

    fn closedir(&self, vnode: &Vnode, cursor: DirCursor) -> NfsResult<()> {
        self.close_dir(vnode, cursor)
    }

    fn rewinddir(&self, cursor: &mut DirCursor) -> NfsResult<()> {
        self.rewind_dir(cursor)
    }

    fn readdir(&self, cursor: &mut DirCursor, buf: &mut [u8]) -> NfsResult<usize> {
        self.read_dir_entry(cursor, buf)
    }

    fn open(&self, vnode: &Arc<Vnode>, flags: OpenFlags) -> NfsResult<FileCursor> {
        self.open_file(vnode, flags)
    }

    fn close(&self, vnode: &Vnode, _cursor: &FileCursor) -> NfsResult<()> {
        debug!("NFS CLOSE: vnid={}", vnode.id());
        if vnode.is_dir() {
            return Err(NfsError::IsADirectory);
        }
        Ok(())
    }

    fn freecookie(&self, vnode: &Vnode, cursor: FileCursor) -> NfsResult<()> {
        debug!("NFS FREECOOKIE: vnid={}", vnode.id());
        if vnode.is_dir() {
            return Err(NfsError::IsADirectory);
        }
        drop(cursor);
        Ok(())
    }

    fn fsync(&self, vnode: &Vnode) -> NfsResult<()> {
        debug!("NFS FSYNC: vnid={}", vnode.id());
        Ok(())
    }

    fn read(&self, cursor: &mut FileCursor, buf: &mut [u8], pos: Option<u64>) -> NfsResult<usize> {
        self.read_file(cursor, buf, pos)
    }

    fn write(&self, cursor: &mut FileCursor, buf: &[u8], pos: Option<u64>) -> NfsResult<usize> {
        self.write_file(cursor, buf, pos)
    }

    fn seek(&self, cursor: &mut FileCursor, pos: i64, mode: SeekMode) -> NfsResult<u64> {
        self.seek_file(cursor, pos, mode)
    }

    fn ioctl(&self, cursor: &mut FileCursor, op: u32, _buf: &mut [u8]) -> NfsResult<usize> {
        debug!("NFS IOCTL: vnid={}, op={}", cursor.vnode().id(), op);
        Err(NfsError::NotSupported)
    }

    fn canpage(&self, vnode: &Vnode) -> bool {
        vnode.is_file()
    }

    fn readpage(&self, vnode: &Vnode, bufs: &mut [IoSliceMut<'_>], pos: u64) -> NfsResult<usize> {
        self.read_pages(vnode, bufs, pos)
    }

    fn writepage(&self, vnode: &Vnode, _bufs: &[IoSlice<'_>], pos: u64) -> NfsResult<usize> {
        debug!("NFS WRITEPAGE: vnid={}, pos={:#x}", vnode.id(), pos);
        if vnode.is_dir() {
            return Err(NfsError::IsADirectory);
        }
        Err(NfsError::NotSupported)
    }

    fn create(&self, dir: &Vnode, name: &str) -> NfsResult<VnodeId> {
        debug!("NFS CREATE: dir={}, name={}", dir.id(), name);
        let _guard = dir.lock();
        let created = self.create_object(dir, name, ObjectKind::File)?;
        self.materialize(created.file, created.attributes.ftype.into())
    }

    fn unlink(&self, dir: &Vnode, name: &str) -> NfsResult<()> {
        debug!("NFS UNLINK: dir={}, name={}", dir.id(), name);
        let _guard = dir.lock();
        self.unlink_object(dir, name, ObjectKind::File)
    }

    fn rename(&self, old_dir: &Vnode, old_name: &str, new_dir: &Vnode, new_name: &str) -> NfsResult<()> {
        debug!(
            "NFS RENAME: {}/{} -> {}/{}",
            old_dir.id(),
            old_name,
            new_dir.id(),
            new_name
        );
        Err(NfsError::NotSupported)
    }

    fn mkdir(&self, dir: &Vnode, name: &str) -> NfsResult<()> {
        debug!("NFS MKDIR: dir={}, name={}", dir.id(), name);
        let _guard = dir.lock();
        self.create_object(dir, name, ObjectKind::Directory).map(|_| ())
    }

    fn rmdir(&self, dir: &Vnode, name: &str) -> NfsResult<()> {
        debug!("NFS RMDIR: dir={}, name={}", dir.id(), name);
        let _guard = dir.lock();
        self.unlink_object(dir, name, ObjectKind::Directory)
    }

    fn rstat(&self, vnode: &Vnode) -> NfsResult<FileStat> {
        debug!("NFS RSTAT: vnid={}", vnode.id());
        let _guard = vnode.lock();
        let attrs = self.getattr(vnode)?;
        Ok(FileStat {
            vnid: vnode.id(),
            size: u64::from(attrs.size),
            kind: attrs.ftype.into(),
        })
    }

    fn wstat(&self, vnode: &Vnode, _stat: &FileStat, mask: u32) -> NfsResult<()> {
        debug!("NFS WSTAT: vnid={}, mask={:#x}", vnode.id(), mask);
        Err(NfsError::NotSupported)
    }
}
