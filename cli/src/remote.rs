// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Remote export access for one CLI invocation
//!
//! The driver resolves single names only; walking a slash-separated path is
//! the host's job, so the CLI does it here. Every vnode handed out by
//! [`Remote::walk`] carries one host reference that [`Remote::release`]
//! gives back.
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Mount, path walk and reference release on behalf of commands

use anyhow::{anyhow, Context, Result};
use nfs_client_core::domain::config::ClientConfig;
use nfs_client_core::domain::vfs::{FsCalls, FsId, HostVfs};
use nfs_client_core::domain::vnode::Vnode;
use nfs_client_core::{NfsFs, NfsMountArgs, RefCountingHost, UdpRpcTransport};
use std::sync::Arc;
use tracing::debug;

/// The CLI mounts exactly one filesystem per run
const CLI_FS_ID: FsId = FsId(1);

pub struct Remote {
    fs: NfsFs,
    host: Arc<RefCountingHost>,
}

impl Remote {
    pub fn mount(device: &str, config: &ClientConfig) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;

        let transport = UdpRpcTransport::new(&config.transport).context("Failed to open RPC socket")?;
        let host = Arc::new(RefCountingHost::new());
        let args = NfsMountArgs::new(Arc::new(transport), host.clone())
            .with_cache_capacity(config.cache.initial_capacity);

        let (fs, root) = NfsFs::mount(CLI_FS_ID, device, args).with_context(|| format!("Failed to mount {}", device))?;
        debug!("Mounted {} with root vnode {}", device, root);
        Ok(Self { fs, host })
    }

    pub fn fs(&self) -> &NfsFs {
        &self.fs
    }

    /// Resolve `path` from the export root, one LOOKUP per component
    pub fn walk(&self, path: &str) -> Result<Arc<Vnode>> {
        let mut current = self.fs.root().clone();
        for name in components(path) {
            let id = self
                .fs
                .lookup(&current, name)
                .with_context(|| format!("{}: lookup of '{}' failed", path, name))?;
            let next = self.fs.getvnode(id)?;
            self.release(current);
            current = next;
        }
        Ok(current)
    }

    /// Resolve the parent directory of `path` and return it with the final name
    pub fn walk_parent<'a>(&self, path: &'a str) -> Result<(Arc<Vnode>, &'a str)> {
        let (parent, name) = split_parent(path).ok_or_else(|| anyhow!("'{}' does not name an entry", path))?;
        Ok((self.walk(parent)?, name))
    }

    /// Give back the host reference taken when `vnode` was looked up
    ///
    /// The root is pinned by the mount itself and is never released here.
    pub fn release(&self, vnode: Arc<Vnode>) {
        if Arc::ptr_eq(&vnode, self.fs.root()) {
            return;
        }
        if self.host.put_vnode(self.fs.fs_id(), vnode.id()) {
            if let Err(e) = self.fs.putvnode(vnode) {
                debug!("putvnode failed: {}", e);
            }
        }
    }

    pub fn unmount(self) -> Result<()> {
        self.fs.unmount().context("Failed to unmount")
    }
}

/// Non-empty path components, skipping `.`
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty() && *c != ".")
}

/// Split `path` into its parent directory and final component
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = match trimmed.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", trimmed),
    };
    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some((parent, name))
}
