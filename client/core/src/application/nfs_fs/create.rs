// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Object creation and removal
//!
//! Files and directories share one creation path and one removal path; the
//! object kind only selects the procedure. Removal leaves the vnode cache
//! untouched: a cached vnode for the removed object lives on until the host
//! releases it, and calls against it get `InvalidHandle` from the server.

use super::NfsFs;
use crate::domain::rpc::NfsProc;
use crate::domain::status::{NfsError, NfsResult};
use crate::domain::vnode::Vnode;
use crate::infrastructure::xdr::{
    decode_diropres, decode_stat, CreateArgs, DirOpArgs, DirOpOk, SAttr, DIROPRES_LEN,
};

/// Kind of object created or removed by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    File,
    Directory,
}

impl ObjectKind {
    fn create_proc(self) -> NfsProc {
        match self {
            Self::File => NfsProc::Create,
            Self::Directory => NfsProc::Mkdir,
        }
    }

    fn remove_proc(self) -> NfsProc {
        match self {
            Self::File => NfsProc::Remove,
            Self::Directory => NfsProc::Rmdir,
        }
    }
}

impl NfsFs {
    /// CREATE or MKDIR `name` in `dir` with default attributes; `dir` is locked by the caller
    pub(super) fn create_object(&self, dir: &Vnode, name: &str, kind: ObjectKind) -> NfsResult<DirOpOk> {
        let args = super::encode_args(&CreateArgs {
            target: DirOpArgs { dir: dir.handle(), name },
            attributes: SAttr::create_defaults(),
        })?;
        let mut response = [0u8; DIROPRES_LEN];
        let n = self.session.nfs_call(kind.create_proc(), &args, &mut response)?;

        match decode_diropres(&response[..n])? {
            Ok(created) => Ok(created),
            Err(status) => Err(NfsError::from(status)),
        }
    }

    /// REMOVE or RMDIR `name` in `dir`; `dir` is locked by the caller
    pub(super) fn unlink_object(&self, dir: &Vnode, name: &str, kind: ObjectKind) -> NfsResult<()> {
        let args = super::encode_args(&DirOpArgs { dir: dir.handle(), name })?;
        let mut response = [0u8; 4];
        let n = self.session.nfs_call(kind.remove_proc(), &args, &mut response)?;
        decode_stat(&response[..n])?.into_result()
    }
}
