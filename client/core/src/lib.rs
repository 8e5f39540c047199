// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NFS Client Core
//!
//! Client-side NFSv2 filesystem driver. Translates host VFS operations into
//! ONC-RPC calls against a remote NFS server and keeps a cache of vnodes keyed
//! by the opaque file handles the server hands out.
//!
//! ## Architecture
//! ```text
//! Host VFS (path walk, vnode refcounts)
//!   → NfsFs (implements domain::vfs::FsCalls)
//!   → MountSession (ports, root vnode, VnodeCache)
//!   → xdr (typed pack/unpack) → RpcTransport (UDP ONC-RPC, portmap)
//! ```
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Crate root, re-exports the domain layer

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
pub use application::host::RefCountingHost;
pub use application::nfs_fs::{NfsFs, NfsMountArgs};
pub use application::session::{MountSession, MountSpec, MountState};
pub use infrastructure::rpc::UdpRpcTransport;
