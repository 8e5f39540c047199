// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! NFS Status Translation
//!
//! Protocol status codes (`nfsstat`) and the driver's local error taxonomy.
//! Every non-OK status maps to exactly one [`NfsError`] variant; codes the
//! driver does not recognize collapse into [`NfsError::General`].
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Error translator between the wire and the host VFS

use crate::domain::rpc::RpcError;
use crate::domain::vfs::HostVfsError;
use thiserror::Error;

/// Result alias used by every driver operation
pub type NfsResult<T> = Result<T, NfsError>;

/// NFSv2 status code as returned by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NfsStatus {
    Ok,
    Perm,
    NoEnt,
    Io,
    NxIo,
    Acces,
    Exist,
    NoDev,
    NotDir,
    IsDir,
    FBig,
    NoSpc,
    Rofs,
    NameTooLong,
    NotEmpty,
    DQuot,
    Stale,
    /// Any code outside the table above (e.g. `NFSERR_WFLUSH`)
    Other(u32),
}

impl NfsStatus {
    pub fn code(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::Perm => 1,
            Self::NoEnt => 2,
            Self::Io => 5,
            Self::NxIo => 6,
            Self::Acces => 13,
            Self::Exist => 17,
            Self::NoDev => 19,
            Self::NotDir => 20,
            Self::IsDir => 21,
            Self::FBig => 27,
            Self::NoSpc => 28,
            Self::Rofs => 30,
            Self::NameTooLong => 63,
            Self::NotEmpty => 66,
            Self::DQuot => 69,
            Self::Stale => 70,
            Self::Other(code) => code,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// `Ok(())` for `NFS_OK`, the translated error otherwise
    pub fn into_result(self) -> NfsResult<()> {
        match NfsError::from_status(self) {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

impl From<u32> for NfsStatus {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Perm,
            2 => Self::NoEnt,
            5 => Self::Io,
            6 => Self::NxIo,
            13 => Self::Acces,
            17 => Self::Exist,
            19 => Self::NoDev,
            20 => Self::NotDir,
            21 => Self::IsDir,
            27 => Self::FBig,
            28 => Self::NoSpc,
            30 => Self::Rofs,
            63 => Self::NameTooLong,
            66 => Self::NotEmpty,
            69 => Self::DQuot,
            70 => Self::Stale,
            other => Self::Other(other),
        }
    }
}

/// Driver errors surfaced to the host VFS
#[derive(Debug, Error)]
pub enum NfsError {
    #[error("Permission denied")]
    PermissionDenied,

    #[error("No such file or directory")]
    PathNotFound,

    #[error("I/O error")]
    Io,

    #[error("Not found")]
    NotFound,

    #[error("Already exists")]
    AlreadyExists,

    #[error("Not a directory")]
    NotADirectory,

    #[error("Is a directory")]
    IsADirectory,

    #[error("File too big")]
    TooBig,

    #[error("No space left on server")]
    OutOfSpace,

    #[error("Read-only filesystem")]
    ReadOnlyFilesystem,

    #[error("Path too long")]
    PathTooLong,

    #[error("Directory not empty")]
    DirectoryNotEmpty,

    #[error("Quota exceeded")]
    QuotaExceeded,

    #[error("Stale file handle")]
    InvalidHandle,

    #[error("General failure")]
    General,

    #[error("Transport error: {0}")]
    Transport(#[from] RpcError),

    #[error("Host VFS refused the vnode: {0}")]
    Host(#[from] HostVfsError),

    #[error("Out of memory")]
    NoMemory,

    #[error("Buffer of {provided} bytes is smaller than the required {required}")]
    InsufficientBuffer { required: usize, provided: usize },

    #[error("Destination buffer rejected the copy")]
    BadBuffer,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid mount address: {0}")]
    BadAddress(String),

    #[error("Operation not allowed on this vnode")]
    NotAllowed,

    #[error("Operation not supported")]
    NotSupported,
}

impl NfsError {
    /// Translate a protocol status; `None` for `NFS_OK`
    pub fn from_status(status: NfsStatus) -> Option<Self> {
        let err = match status {
            NfsStatus::Ok => return None,
            NfsStatus::Perm => Self::PermissionDenied,
            NfsStatus::NoEnt => Self::PathNotFound,
            NfsStatus::Io => Self::Io,
            NfsStatus::NxIo => Self::NotFound,
            NfsStatus::Acces => Self::PermissionDenied,
            NfsStatus::Exist => Self::AlreadyExists,
            NfsStatus::NoDev => Self::NotFound,
            NfsStatus::NotDir => Self::NotADirectory,
            NfsStatus::IsDir => Self::IsADirectory,
            NfsStatus::FBig => Self::TooBig,
            NfsStatus::NoSpc => Self::OutOfSpace,
            NfsStatus::Rofs => Self::ReadOnlyFilesystem,
            NfsStatus::NameTooLong => Self::PathTooLong,
            NfsStatus::NotEmpty => Self::DirectoryNotEmpty,
            NfsStatus::DQuot => Self::QuotaExceeded,
            NfsStatus::Stale => Self::InvalidHandle,
            NfsStatus::Other(_) => Self::General,
        };
        Some(err)
    }
}

impl From<NfsStatus> for NfsError {
    /// `NFS_OK` is not an error; converting it yields [`NfsError::General`].
    fn from(status: NfsStatus) -> Self {
        Self::from_status(status).unwrap_or(Self::General)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_roundtrip_through_u32() {
        for code in [0, 1, 2, 5, 6, 13, 17, 19, 20, 21, 27, 28, 30, 63, 66, 69, 70, 99] {
            assert_eq!(NfsStatus::from(code).code(), code);
        }
        assert_eq!(NfsStatus::from(99), NfsStatus::Other(99));
    }

    #[test]
    fn test_ok_is_not_an_error() {
        assert!(NfsStatus::Ok.into_result().is_ok());
        assert!(NfsError::from_status(NfsStatus::Ok).is_none());
    }

    #[test]
    fn test_translation_table() {
        let cases = [
            (1, "PermissionDenied"),
            (2, "PathNotFound"),
            (5, "Io"),
            (6, "NotFound"),
            (13, "PermissionDenied"),
            (17, "AlreadyExists"),
            (19, "NotFound"),
            (20, "NotADirectory"),
            (21, "IsADirectory"),
            (27, "TooBig"),
            (28, "OutOfSpace"),
            (30, "ReadOnlyFilesystem"),
            (63, "PathTooLong"),
            (66, "DirectoryNotEmpty"),
            (69, "QuotaExceeded"),
            (70, "InvalidHandle"),
            (99, "General"),
            (12345, "General"),
        ];
        for (code, expected) in cases {
            let err = NfsStatus::from(code).into_result().unwrap_err();
            assert_eq!(format!("{:?}", err), expected, "status {}", code);
        }
    }
}
