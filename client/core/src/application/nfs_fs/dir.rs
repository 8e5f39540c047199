// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Directory enumeration
//!
//! One READDIR per `readdir` call, returning the first entry of the page and
//! continuing from that entry's cookie next time.

use super::NfsFs;
use crate::domain::cursor::DirCursor;
use crate::domain::rpc::NfsProc;
use crate::domain::status::{NfsError, NfsResult};
use crate::domain::vnode::Vnode;
use crate::infrastructure::xdr::{decode_readdir_first, ReadDirArgs, MAXNAMLEN};
use std::sync::Arc;
use tracing::debug;

/// Byte budget requested per READDIR, and the size of the reply buffer
pub const READDIR_BUF_SIZE: usize = MAXNAMLEN + 64;

impl NfsFs {
    pub(super) fn open_dir(&self, vnode: &Arc<Vnode>) -> NfsResult<DirCursor> {
        debug!("NFS OPENDIR: vnid={}", vnode.id());
        if !vnode.is_dir() {
            return Err(NfsError::NotADirectory);
        }
        Ok(DirCursor::new(vnode.clone()))
    }

    pub(super) fn close_dir(&self, vnode: &Vnode, cursor: DirCursor) -> NfsResult<()> {
        debug!("NFS CLOSEDIR: vnid={}", vnode.id());
        if !vnode.is_dir() {
            return Err(NfsError::NotADirectory);
        }
        drop(cursor);
        Ok(())
    }

    pub(super) fn rewind_dir(&self, cursor: &mut DirCursor) -> NfsResult<()> {
        let vnode = cursor.vnode().clone();
        debug!("NFS REWINDDIR: vnid={}", vnode.id());
        let _guard = vnode.lock();
        cursor.rewind();
        Ok(())
    }

    pub(super) fn read_dir_entry(&self, cursor: &mut DirCursor, buf: &mut [u8]) -> NfsResult<usize> {
        let vnode = cursor.vnode().clone();
        debug!(
            "NFS READDIR: vnid={}, cookie={:#x}, len={}",
            vnode.id(),
            cursor.cookie(),
            buf.len()
        );
        let _guard = vnode.lock();

        if buf.len() < MAXNAMLEN {
            return Err(NfsError::InsufficientBuffer {
                required: MAXNAMLEN,
                provided: buf.len(),
            });
        }
        if cursor.at_end() {
            return Ok(0);
        }

        let args = super::encode_args(&ReadDirArgs {
            dir: vnode.handle(),
            cookie: cursor.cookie(),
            count: buf.len().min(READDIR_BUF_SIZE) as u32,
        })?;
        let mut response = [0u8; READDIR_BUF_SIZE];
        let n = self.session.nfs_call(NfsProc::ReadDir, &args, &mut response)?;

        match decode_readdir_first(&response[..n])? {
            Err(status) => {
                // listing stays resumable; the host sees an empty read
                debug!("NFS READDIR: status {} on vnid={}", status.code(), vnode.id());
                Ok(0)
            }
            Ok(None) => {
                cursor.mark_end();
                Ok(0)
            }
            Ok(Some(entry)) => {
                let len = entry.name.len().min(buf.len());
                buf[..len].copy_from_slice(&entry.name[..len]);
                cursor.advance(entry.cookie);
                Ok(len)
            }
        }
    }
}
