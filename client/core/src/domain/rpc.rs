// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! RPC Transport Trait - Anti-Corruption Layer for ONC-RPC
//!
//! The driver never touches sockets. It hands a packed argument record to an
//! [`RpcTransport`] together with an explicit destination and receives the
//! raw result record back. Enables testing against an in-memory server.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Collaborator contract plus program/procedure numbers

use std::net::{Ipv4Addr, SocketAddrV4};
use thiserror::Error;

/// Portmapper program
pub const PMAP_PROGRAM: u32 = 100_000;
pub const PMAP_VERSION: u32 = 2;
pub const PMAPPROC_GETPORT: u32 = 3;

/// Mount protocol (v1, paired with NFSv2)
pub const MOUNT_PROGRAM: u32 = 100_005;
pub const MOUNT_VERSION: u32 = 1;
pub const MOUNTPROC_MNT: u32 = 1;
pub const MOUNTPROC_UMNT: u32 = 3;

/// NFS protocol (v2)
pub const NFS_PROGRAM: u32 = 100_003;
pub const NFS_VERSION: u32 = 2;

/// IP protocol number used in portmap queries
pub const IPPROTO_UDP: u32 = 17;

/// NFSv2 procedures used by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfsProc {
    GetAttr,
    Lookup,
    Read,
    Create,
    Remove,
    Mkdir,
    Rmdir,
    ReadDir,
}

impl NfsProc {
    pub fn number(self) -> u32 {
        match self {
            Self::GetAttr => 1,
            Self::Lookup => 4,
            Self::Read => 6,
            Self::Create => 9,
            Self::Remove => 10,
            Self::Mkdir => 14,
            Self::Rmdir => 15,
            Self::ReadDir => 16,
        }
    }
}

/// Transport-level failures
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No reply for xid {xid:#x} after {attempts} attempts")]
    Timeout { xid: u32, attempts: u32 },

    #[error("Call rejected by server (reject_stat {0})")]
    Denied(u32),

    #[error("Call not accepted by server (accept_stat {0})")]
    Unaccepted(u32),

    #[error("Program {program} v{version} is not registered with the portmapper")]
    NotRegistered { program: u32, version: u32 },

    #[error("Malformed response: {0}")]
    Garbage(String),
}

/// Synchronous ONC-RPC client
///
/// Implementations own their socket(s) and any timeout/retransmit policy.
/// Calls block the calling thread for the full round trip.
pub trait RpcTransport: Send + Sync {
    /// Issue one call and copy the result record into `response`
    ///
    /// Returns the number of result bytes written. A result larger than
    /// `response` is truncated to fit.
    fn call(
        &self,
        destination: SocketAddrV4,
        program: u32,
        version: u32,
        procedure: u32,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, RpcError>;

    /// Ask the server's portmapper which port serves `(program, version, protocol)`
    fn portmap_lookup(
        &self,
        server: Ipv4Addr,
        program: u32,
        version: u32,
        protocol: u32,
    ) -> Result<u16, RpcError>;
}
