// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mount Session
//!
//! Everything that exists between a successful mount and its unmount: the
//! server address, the resolved MOUNT and NFS service ports, the exported
//! path, the root vnode and the vnode cache.
//!
//! Calls are addressed explicitly. MOUNT traffic goes to the mount port, all
//! vnode traffic to the NFS port; there is no shared "current port" that one
//! thread could switch underneath another.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Mount/unmount lifecycle and call routing

use crate::domain::cache::VnodeCache;
use crate::domain::file_handle::{FileHandle, FHSIZE};
use crate::domain::rpc::{
    NfsProc, RpcError, RpcTransport, IPPROTO_UDP, MOUNTPROC_MNT, MOUNTPROC_UMNT, MOUNT_PROGRAM,
    MOUNT_VERSION, NFS_PROGRAM, NFS_VERSION,
};
use crate::domain::status::{NfsError, NfsResult};
use crate::domain::vfs::FsId;
use crate::domain::vnode::{Vnode, VnodeKind};
use crate::infrastructure::xdr::{decode_fhstatus, pack, MountArgs};
use parking_lot::Mutex;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of a session value
///
/// Mounting is the span of [`MountSession::establish`]; no session exists
/// until it succeeds, so a session starts out `Mounted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountState {
    Mounted,
    /// Teardown in progress, UMNT in flight
    Unmounting,
    Unmounted,
}

/// Parsed `<dotted-quad-ipv4>:<path>` mount specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    pub server: Ipv4Addr,
    /// Exported path, verbatim (may itself contain colons)
    pub path: String,
}

impl FromStr for MountSpec {
    type Err = NfsError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let trimmed = spec.trim_start();
        let (host, path) = trimmed
            .split_once(':')
            .ok_or_else(|| NfsError::BadAddress(format!("missing ':' in '{}'", spec)))?;
        let server = host
            .parse::<Ipv4Addr>()
            .map_err(|_| NfsError::BadAddress(format!("'{}' is not a dotted-quad IPv4 address", host)))?;
        Ok(Self {
            server,
            path: path.to_string(),
        })
    }
}

impl fmt::Display for MountSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.server, self.path)
    }
}

pub struct MountSession {
    fs_id: FsId,
    server: Ipv4Addr,
    server_path: String,
    mount_port: u16,
    nfs_port: u16,
    root: Arc<Vnode>,
    cache: VnodeCache,
    transport: Arc<dyn RpcTransport>,
    state: Mutex<MountState>,
}

impl MountSession {
    /// Resolve ports, MNT the export and build the cache around the root vnode
    pub fn establish(
        fs_id: FsId,
        spec: &MountSpec,
        transport: Arc<dyn RpcTransport>,
        cache_capacity: usize,
    ) -> NfsResult<Self> {
        info!("Mounting {} as fs {}", spec, fs_id);

        let mount_port = transport.portmap_lookup(spec.server, MOUNT_PROGRAM, MOUNT_VERSION, IPPROTO_UDP)?;
        let nfs_port = transport.portmap_lookup(spec.server, NFS_PROGRAM, NFS_VERSION, IPPROTO_UDP)?;
        debug!("Resolved service ports: mount={}, nfs={}", mount_port, nfs_port);

        let mount_addr = SocketAddrV4::new(spec.server, mount_port);
        let root_handle = mount_export(transport.as_ref(), mount_addr, &spec.path)?;
        debug!("Root handle for '{}': {}", spec.path, root_handle);

        let cache = VnodeCache::with_capacity(cache_capacity);
        let root = match cache.insert_or_get(root_handle, VnodeKind::Directory) {
            Ok((root, _)) => root,
            Err(e) => {
                warn!("Mount of {} aborted after MNT: {}", spec, e);
                if let Err(umnt) = unmount_export(transport.as_ref(), mount_addr, &spec.path) {
                    warn!("UMNT during mount rollback failed: {}", umnt);
                }
                return Err(e);
            }
        };

        info!("Mounted {} (root vnode {})", spec, root.id());
        Ok(Self {
            fs_id,
            server: spec.server,
            server_path: spec.path.clone(),
            mount_port,
            nfs_port,
            root,
            cache,
            transport,
            state: Mutex::new(MountState::Mounted),
        })
    }

    /// Best-effort UMNT followed by cache teardown; repeated calls are no-ops
    pub fn teardown(&self) {
        {
            let mut state = self.state.lock();
            if *state != MountState::Mounted {
                return;
            }
            *state = MountState::Unmounting;
        }

        info!("Unmounting {}:{} (fs {})", self.server, self.server_path, self.fs_id);
        let mount_addr = SocketAddrV4::new(self.server, self.mount_port);
        if let Err(e) = unmount_export(self.transport.as_ref(), mount_addr, &self.server_path) {
            warn!("UMNT of '{}' failed, tearing down anyway: {}", self.server_path, e);
        }

        self.cache.clear();
        *self.state.lock() = MountState::Unmounted;
        debug!("Mount state: {:?} -> {:?}", MountState::Unmounting, MountState::Unmounted);
    }

    /// Issue an NFS procedure against the session's NFS service port
    pub fn nfs_call(&self, procedure: NfsProc, request: &[u8], response: &mut [u8]) -> Result<usize, RpcError> {
        self.transport.call(
            SocketAddrV4::new(self.server, self.nfs_port),
            NFS_PROGRAM,
            NFS_VERSION,
            procedure.number(),
            request,
            response,
        )
    }

    pub fn fs_id(&self) -> FsId {
        self.fs_id
    }

    pub fn server(&self) -> Ipv4Addr {
        self.server
    }

    pub fn server_path(&self) -> &str {
        &self.server_path
    }

    pub fn mount_port(&self) -> u16 {
        self.mount_port
    }

    pub fn nfs_port(&self) -> u16 {
        self.nfs_port
    }

    pub fn root(&self) -> &Arc<Vnode> {
        &self.root
    }

    pub fn cache(&self) -> &VnodeCache {
        &self.cache
    }

    pub fn state(&self) -> MountState {
        *self.state.lock()
    }
}

impl Drop for MountSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for MountSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountSession")
            .field("fs_id", &self.fs_id)
            .field("server", &self.server)
            .field("server_path", &self.server_path)
            .field("mount_port", &self.mount_port)
            .field("nfs_port", &self.nfs_port)
            .field("root", &self.root.id())
            .field("cached", &self.cache.len())
            .field("state", &self.state())
            .finish()
    }
}

fn mount_export(transport: &dyn RpcTransport, mount_addr: SocketAddrV4, path: &str) -> NfsResult<FileHandle> {
    let args = pack(&MountArgs { path })?;
    let mut response = [0u8; 4 + FHSIZE];
    let n = transport.call(mount_addr, MOUNT_PROGRAM, MOUNT_VERSION, MOUNTPROC_MNT, &args, &mut response)?;
    match decode_fhstatus(&response[..n])? {
        Ok(handle) => Ok(handle),
        Err(status) => {
            warn!("MNT of '{}' refused with status {}", path, status.code());
            Err(status.into())
        }
    }
}

fn unmount_export(transport: &dyn RpcTransport, mount_addr: SocketAddrV4, path: &str) -> NfsResult<()> {
    let args = pack(&MountArgs { path })?;
    transport.call(mount_addr, MOUNT_PROGRAM, MOUNT_VERSION, MOUNTPROC_UMNT, &args, &mut [])?;
    Ok(())
}
