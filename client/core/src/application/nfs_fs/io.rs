// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! File I/O
//!
//! Reads are split into READ calls of at most [`READ_BUF_SIZE`] bytes. A
//! reply shorter than requested means end of file and stops the loop.
//! NFSv2 offsets are 32 bits wide; positions beyond that read nothing.

use super::NfsFs;
use crate::domain::cursor::{FileCursor, OpenFlags, SeekMode};
use crate::domain::rpc::NfsProc;
use crate::domain::status::{NfsError, NfsResult};
use crate::domain::vnode::{Vnode, VnodeKind};
use crate::infrastructure::xdr::{
    decode_attrstat, decode_readres, FAttr, ReadArgs, ATTRSTAT_LEN, FATTR_LEN,
};
use std::io::IoSliceMut;
use std::sync::Arc;
use tracing::{debug, error};

/// Largest payload requested by a single READ
pub const READ_BUF_SIZE: usize = 1024;

/// Highest position a READ can address
pub const MAX_READ_POSITION: u64 = 0xffff_ffff;

const READRES_LEN: usize = 4 + FATTR_LEN + 4 + READ_BUF_SIZE;

impl NfsFs {
    pub(super) fn open_file(&self, vnode: &Arc<Vnode>, flags: OpenFlags) -> NfsResult<FileCursor> {
        debug!("NFS OPEN: vnid={}, flags={:#x}", vnode.id(), flags.0);
        if vnode.is_dir() {
            return Err(NfsError::IsADirectory);
        }
        Ok(FileCursor::new(vnode.clone(), flags))
    }

    /// GETATTR; the caller holds the vnode lock
    pub(super) fn getattr(&self, vnode: &Vnode) -> NfsResult<FAttr> {
        let args = super::encode_args(vnode.handle())?;
        let mut response = [0u8; ATTRSTAT_LEN];
        let n = self.session.nfs_call(NfsProc::GetAttr, &args, &mut response)?;
        match decode_attrstat(&response[..n])? {
            Ok(attrs) => Ok(attrs),
            Err(status) => Err(status.into()),
        }
    }

    /// Chunked read of `buf.len()` bytes at `pos`
    ///
    /// Returns the outcome together with the position following the last
    /// byte read. A failure after some bytes arrived is reported as a short
    /// read; a failure before any byte arrived is returned as the error.
    fn read_at(&self, vnode: &Vnode, buf: &mut [u8], mut pos: u64) -> (NfsResult<usize>, u64) {
        if pos > MAX_READ_POSITION || buf.is_empty() {
            return (Ok(0), pos);
        }

        let mut total = 0usize;
        let mut failure = None;
        let mut response = vec![0u8; READRES_LEN];

        while total < buf.len() && pos <= MAX_READ_POSITION {
            let to_read = (buf.len() - total).min(READ_BUF_SIZE);
            let args = match super::encode_args(&ReadArgs {
                file: vnode.handle(),
                offset: pos as u32,
                count: to_read as u32,
                total_count: 0,
            }) {
                Ok(args) => args,
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            };

            let n = match self.session.nfs_call(NfsProc::Read, &args, &mut response) {
                Ok(n) => n,
                Err(e) => {
                    error!("NFS READ: vnid={}, pos={:#x} failed: {}", vnode.id(), pos, e);
                    failure = Some(e.into());
                    break;
                }
            };
            let data = match decode_readres(&response[..n]) {
                Ok(Ok(res)) => res.data,
                Ok(Err(status)) => {
                    failure = Some(status.into());
                    break;
                }
                Err(e) => {
                    failure = Some(e.into());
                    break;
                }
            };

            if data.len() > to_read {
                // server sent more than fits the destination
                return (Err(NfsError::BadBuffer), pos);
            }
            buf[total..total + data.len()].copy_from_slice(data);
            pos += data.len() as u64;
            total += data.len();

            if data.len() != to_read {
                break;
            }
        }

        match failure {
            Some(e) if total == 0 => (Err(e), pos),
            _ => (Ok(total), pos),
        }
    }

    pub(super) fn read_file(&self, cursor: &mut FileCursor, buf: &mut [u8], pos: Option<u64>) -> NfsResult<usize> {
        let vnode = cursor.vnode().clone();
        debug!(
            "NFS READ: vnid={}, pos={:?}, len={}",
            vnode.id(),
            pos,
            buf.len()
        );
        if vnode.is_dir() {
            return Err(NfsError::IsADirectory);
        }
        let _guard = vnode.lock();

        let start = pos.unwrap_or_else(|| cursor.offset());
        if start > MAX_READ_POSITION {
            return Ok(0);
        }
        let (result, end) = self.read_at(&vnode, buf, start);
        cursor.set_offset(end);
        result
    }

    pub(super) fn write_file(&self, cursor: &mut FileCursor, buf: &[u8], pos: Option<u64>) -> NfsResult<usize> {
        let vnode = cursor.vnode().clone();
        debug!("NFS WRITE: vnid={}, pos={:?}, len={}", vnode.id(), pos, buf.len());
        let _guard = vnode.lock();

        match vnode.kind() {
            VnodeKind::File => Err(NfsError::NotSupported),
            VnodeKind::Directory => Err(NfsError::NotAllowed),
            VnodeKind::Unknown => Err(NfsError::General),
        }
    }

    pub(super) fn seek_file(&self, cursor: &mut FileCursor, pos: i64, mode: SeekMode) -> NfsResult<u64> {
        let vnode = cursor.vnode().clone();
        debug!("NFS SEEK: vnid={}, pos={}, mode={:?}", vnode.id(), pos, mode);
        if vnode.is_dir() {
            return Err(NfsError::IsADirectory);
        }
        let _guard = vnode.lock();

        let size = i64::from(self.getattr(&vnode)?.size);
        let current = i64::try_from(cursor.offset()).unwrap_or(i64::MAX);
        let target = match mode {
            SeekMode::Set => pos,
            SeekMode::Current => current.saturating_add(pos),
            SeekMode::End => size.saturating_add(pos),
        };

        let offset = target.clamp(0, size) as u64;
        cursor.set_offset(offset);
        Ok(offset)
    }

    pub(super) fn read_pages(&self, vnode: &Vnode, bufs: &mut [IoSliceMut<'_>], pos: u64) -> NfsResult<usize> {
        debug!("NFS READPAGE: vnid={}, vecs={}, pos={:#x}", vnode.id(), bufs.len(), pos);
        if vnode.is_dir() {
            return Err(NfsError::IsADirectory);
        }
        let _guard = vnode.lock();

        let mut pos = pos;
        let mut total = 0usize;
        let mut hit_eof = false;

        for buf in bufs.iter_mut() {
            let buf: &mut [u8] = buf;
            if hit_eof {
                buf.fill(0);
                total += buf.len();
                continue;
            }

            let (result, end) = self.read_at(vnode, buf, pos);
            let n = match result {
                Ok(n) => n,
                Err(e) if total == 0 => return Err(e),
                Err(_) => return Ok(total),
            };
            pos = end;
            total += n;

            if n < buf.len() {
                buf[n..].fill(0);
                total += buf.len() - n;
                hit_eof = true;
            }
        }

        Ok(total)
    }
}
