// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory NFSv2 server for integration tests
//!
//! Implements the transport trait directly, so the driver's packed
//! arguments are decoded and answered without any socket. Every call is
//! recorded, and individual procedures can be made to fail.

#![allow(dead_code)]

use bytes::{BufMut, BytesMut};
use nfs_client_core::domain::file_handle::{FileHandle, FHSIZE};
use nfs_client_core::domain::rpc::{
    RpcError, RpcTransport, MOUNTPROC_MNT, MOUNTPROC_UMNT, MOUNT_PROGRAM, NFS_PROGRAM,
};
use nfs_client_core::domain::vfs::FsId;
use nfs_client_core::domain::vnode::VnodeId;
use nfs_client_core::infrastructure::xdr::{
    put_opaque, FAttr, FileType, XdrDecoder, XdrEncode, MAXNAMLEN, MNTPATHLEN, NFS_MAXDATA,
};
use nfs_client_core::{NfsFs, NfsMountArgs, RefCountingHost};
use nfs_client_core::domain::vfs::FsCalls;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

pub const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 5);
pub const MOUNT_PORT: u16 = 635;
pub const NFS_PORT: u16 = 2049;
pub const EXPORT: &str = "/export";
pub const DEVICE: &str = "10.0.0.5:/export";
pub const FS: FsId = FsId(7);

// NFSv2 procedure numbers, as the server sees them
pub const GETATTR: u32 = 1;
pub const LOOKUP: u32 = 4;
pub const READ: u32 = 6;
pub const CREATE: u32 = 9;
pub const REMOVE: u32 = 10;
pub const MKDIR: u32 = 14;
pub const RMDIR: u32 = 15;
pub const READDIR: u32 = 16;

const NFSERR_NOENT: u32 = 2;
const NFSERR_EXIST: u32 = 17;
const NFSERR_NOTDIR: u32 = 20;
const NFSERR_ISDIR: u32 = 21;
const NFSERR_NOTEMPTY: u32 = 66;
const NFSERR_STALE: u32 = 70;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub destination: SocketAddrV4,
    pub program: u32,
    pub procedure: u32,
    pub request: Vec<u8>,
}

/// Injected failure for one `(program, procedure)` pair
#[derive(Debug, Clone, Copy)]
pub enum Fault {
    /// The call never gets a reply
    Transport,
    /// The server answers with this `nfsstat`
    Status(u32),
    /// The first `n` calls succeed, later ones get no reply
    TransportAfter(usize),
}

struct Node {
    fileid: u32,
    ftype: FileType,
    data: Vec<u8>,
    children: Vec<(String, FileHandle)>,
}

struct ServerState {
    nodes: HashMap<FileHandle, Node>,
    root: FileHandle,
    next_fileid: u32,
    faults: HashMap<(u32, u32), Fault>,
    unregistered: HashSet<u32>,
    read_cap: Option<usize>,
    oversized_reads: bool,
}

pub struct FakeNfsServer {
    state: Mutex<ServerState>,
    calls: Mutex<Vec<CallRecord>>,
}

pub fn handle_for(fileid: u32) -> FileHandle {
    let mut bytes = [0u8; FHSIZE];
    bytes[..4].copy_from_slice(&fileid.to_be_bytes());
    for (i, b) in bytes.iter_mut().enumerate().skip(4) {
        *b = (fileid as u8).wrapping_mul(31).wrapping_add(i as u8);
    }
    FileHandle::new(bytes)
}

impl FakeNfsServer {
    pub fn new() -> Arc<Self> {
        let root = handle_for(1);
        let mut nodes = HashMap::new();
        nodes.insert(
            root,
            Node {
                fileid: 1,
                ftype: FileType::Dir,
                data: Vec::new(),
                children: Vec::new(),
            },
        );
        Arc::new(Self {
            state: Mutex::new(ServerState {
                nodes,
                root,
                next_fileid: 2,
                faults: HashMap::new(),
                unregistered: HashSet::new(),
                read_cap: None,
                oversized_reads: false,
            }),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn root_handle(&self) -> FileHandle {
        self.state.lock().root
    }

    pub fn add_node(&self, parent: FileHandle, name: &str, ftype: FileType, data: &[u8]) -> FileHandle {
        let mut state = self.state.lock();
        let fileid = state.next_fileid;
        state.next_fileid += 1;
        let handle = handle_for(fileid);
        state.nodes.insert(
            handle,
            Node {
                fileid,
                ftype,
                data: data.to_vec(),
                children: Vec::new(),
            },
        );
        if let Some(dir) = state.nodes.get_mut(&parent) {
            dir.children.push((name.to_string(), handle));
        }
        handle
    }

    pub fn add_file(&self, parent: FileHandle, name: &str, data: &[u8]) -> FileHandle {
        self.add_node(parent, name, FileType::Reg, data)
    }

    pub fn add_dir(&self, parent: FileHandle, name: &str) -> FileHandle {
        self.add_node(parent, name, FileType::Dir, &[])
    }

    /// Make an existing handle reachable under a second name
    pub fn link(&self, parent: FileHandle, name: &str, target: FileHandle) {
        if let Some(dir) = self.state.lock().nodes.get_mut(&parent) {
            dir.children.push((name.to_string(), target));
        }
    }

    pub fn child(&self, parent: FileHandle, name: &str) -> Option<FileHandle> {
        let state = self.state.lock();
        state
            .nodes
            .get(&parent)?
            .children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, h)| *h)
    }

    pub fn fail(&self, program: u32, procedure: u32, fault: Fault) {
        self.state.lock().faults.insert((program, procedure), fault);
    }

    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    pub fn unregister(&self, program: u32) {
        self.state.lock().unregistered.insert(program);
    }

    /// Limit every READ reply to `cap` bytes
    pub fn cap_reads(&self, cap: usize) {
        self.state.lock().read_cap = Some(cap);
    }

    /// Return one byte more than asked for on every READ
    pub fn oversize_reads(&self) {
        self.state.lock().oversized_reads = true;
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().clone()
    }

    pub fn count(&self, program: u32, procedure: u32) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == program && c.procedure == procedure)
            .count()
    }

    pub fn nfs_calls(&self, procedure: u32) -> usize {
        self.count(NFS_PROGRAM, procedure)
    }

    /// Request bodies of every recorded NFS call to `procedure`
    pub fn requests(&self, procedure: u32) -> Vec<Vec<u8>> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.program == NFS_PROGRAM && c.procedure == procedure)
            .map(|c| c.request.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn attrs(node: &Node) -> FAttr {
        FAttr::new(node.ftype, node.data.len() as u32, node.fileid)
    }

    fn mount_proc(&self, procedure: u32, args: &[u8], out: &mut BytesMut) -> Result<(), RpcError> {
        let mut dec = XdrDecoder::new(args);
        let path = dec.opaque(MNTPATHLEN)?.to_vec();
        match procedure {
            MOUNTPROC_MNT if path == EXPORT.as_bytes() => {
                out.put_u32(0);
                self.root_handle().encode(out)?;
            }
            MOUNTPROC_MNT => out.put_u32(13),
            MOUNTPROC_UMNT => {}
            other => return Err(RpcError::Unaccepted(other)),
        }
        Ok(())
    }

    fn nfs_proc(&self, procedure: u32, args: &[u8], out: &mut BytesMut) -> Result<(), RpcError> {
        let mut dec = XdrDecoder::new(args);
        let mut state = self.state.lock();
        let handle = dec.file_handle()?;

        let Some(node) = state.nodes.get(&handle) else {
            out.put_u32(NFSERR_STALE);
            return Ok(());
        };

        match procedure {
            GETATTR => {
                out.put_u32(0);
                Self::attrs(node).encode(out)?;
            }
            LOOKUP => {
                let name = dec.opaque(MAXNAMLEN)?;
                let found = node
                    .children
                    .iter()
                    .find(|(n, _)| n.as_bytes() == name)
                    .map(|(_, h)| *h);
                match found.and_then(|h| state.nodes.get(&h).map(|n| (h, n))) {
                    Some((h, child)) => {
                        out.put_u32(0);
                        h.encode(out)?;
                        Self::attrs(child).encode(out)?;
                    }
                    None => out.put_u32(NFSERR_NOENT),
                }
            }
            READ => {
                let offset = dec.u32()? as usize;
                let mut count = dec.u32()? as usize;
                if let Some(cap) = state.read_cap {
                    count = count.min(cap);
                }
                if node.ftype == FileType::Dir {
                    out.put_u32(NFSERR_ISDIR);
                    return Ok(());
                }
                let start = offset.min(node.data.len());
                let end = (offset + count).min(node.data.len());
                let mut data = node.data[start..end].to_vec();
                if state.oversized_reads {
                    data.resize(count + 1, b'!');
                }
                out.put_u32(0);
                Self::attrs(node).encode(out)?;
                put_opaque(out, &data, NFS_MAXDATA + 1)?;
            }
            READDIR => {
                let cookie = dec.u32()? as usize;
                let _count = dec.u32()?;
                if node.ftype != FileType::Dir {
                    out.put_u32(NFSERR_NOTDIR);
                    return Ok(());
                }
                out.put_u32(0);
                match node.children.get(cookie) {
                    Some((name, h)) => {
                        let fileid = state.nodes.get(h).map(|n| n.fileid).unwrap_or(0);
                        out.put_u32(1);
                        out.put_u32(fileid);
                        put_opaque(out, name.as_bytes(), MAXNAMLEN)?;
                        out.put_u32(cookie as u32 + 1);
                        out.put_u32(0);
                        out.put_u32(0);
                    }
                    None => {
                        out.put_u32(0);
                        out.put_u32(1);
                    }
                }
            }
            CREATE | MKDIR => {
                let name = String::from_utf8_lossy(dec.opaque(MAXNAMLEN)?).into_owned();
                if node.children.iter().any(|(n, _)| *n == name) {
                    out.put_u32(NFSERR_EXIST);
                    return Ok(());
                }
                let ftype = if procedure == CREATE { FileType::Reg } else { FileType::Dir };
                drop(state);
                let created = self.add_node(handle, &name, ftype, &[]);
                let state = self.state.lock();
                out.put_u32(0);
                created.encode(out)?;
                if let Some(node) = state.nodes.get(&created) {
                    Self::attrs(node).encode(out)?;
                }
            }
            REMOVE | RMDIR => {
                let name = dec.opaque(MAXNAMLEN)?.to_vec();
                let Some(pos) = node.children.iter().position(|(n, _)| n.as_bytes() == name.as_slice()) else {
                    out.put_u32(NFSERR_NOENT);
                    return Ok(());
                };
                let target = node.children[pos].1;
                let status = match state.nodes.get(&target) {
                    Some(t) if procedure == REMOVE && t.ftype == FileType::Dir => NFSERR_ISDIR,
                    Some(t) if procedure == RMDIR && t.ftype != FileType::Dir => NFSERR_NOTDIR,
                    Some(t) if procedure == RMDIR && !t.children.is_empty() => NFSERR_NOTEMPTY,
                    _ => 0,
                };
                if status == 0 {
                    if let Some(dir) = state.nodes.get_mut(&handle) {
                        dir.children.remove(pos);
                    }
                    state.nodes.remove(&target);
                }
                out.put_u32(status);
            }
            other => return Err(RpcError::Unaccepted(other)),
        }
        Ok(())
    }
}

impl RpcTransport for FakeNfsServer {
    fn call(
        &self,
        destination: SocketAddrV4,
        program: u32,
        _version: u32,
        procedure: u32,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, RpcError> {
        let seen = {
            let mut calls = self.calls.lock();
            calls.push(CallRecord {
                destination,
                program,
                procedure,
                request: request.to_vec(),
            });
            calls
                .iter()
                .filter(|c| c.program == program && c.procedure == procedure)
                .count()
        };

        let expected_port = match program {
            MOUNT_PROGRAM => MOUNT_PORT,
            NFS_PROGRAM => NFS_PORT,
            _ => 0,
        };
        if destination != SocketAddrV4::new(SERVER, expected_port) {
            // PROG_UNAVAIL: nothing serves this program at that address
            return Err(RpcError::Unaccepted(1));
        }

        let fault = self.state.lock().faults.get(&(program, procedure)).copied();
        let mut out = BytesMut::new();
        match fault {
            Some(Fault::Transport) => return Err(RpcError::Timeout { xid: 0, attempts: 1 }),
            Some(Fault::Status(status)) => out.put_u32(status),
            Some(Fault::TransportAfter(n)) if seen > n => {
                return Err(RpcError::Timeout { xid: 0, attempts: 1 })
            }
            Some(Fault::TransportAfter(_)) if program == MOUNT_PROGRAM => {
                self.mount_proc(procedure, request, &mut out)?
            }
            Some(Fault::TransportAfter(_)) => self.nfs_proc(procedure, request, &mut out)?,
            None if program == MOUNT_PROGRAM => self.mount_proc(procedure, request, &mut out)?,
            None => self.nfs_proc(procedure, request, &mut out)?,
        }

        let n = out.len().min(response.len());
        response[..n].copy_from_slice(&out[..n]);
        Ok(n)
    }

    fn portmap_lookup(&self, server: Ipv4Addr, program: u32, version: u32, _protocol: u32) -> Result<u16, RpcError> {
        if server != SERVER || self.state.lock().unregistered.contains(&program) {
            return Err(RpcError::NotRegistered { program, version });
        }
        match program {
            MOUNT_PROGRAM => Ok(MOUNT_PORT),
            NFS_PROGRAM => Ok(NFS_PORT),
            _ => Err(RpcError::NotRegistered { program, version }),
        }
    }
}

/// Mount the fake export with a fresh reference-counting host
pub fn mount(server: &Arc<FakeNfsServer>) -> (NfsFs, Arc<RefCountingHost>, VnodeId) {
    let host = Arc::new(RefCountingHost::new());
    let (fs, root) = NfsFs::mount(FS, DEVICE, NfsMountArgs::new(server.clone(), host.clone()))
        .expect("mount of the fake export");
    (fs, host, root)
}

/// Name returned by one `readdir` call, `None` for an empty read
pub fn read_name(buf: &[u8], len: usize) -> Option<String> {
    (len > 0).then(|| String::from_utf8_lossy(&buf[..len]).into_owned())
}
