// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Open-object cursors
//!
//! Per-open state handed to the host as an opaque cookie: a directory cursor
//! tracks the server's continuation cookie, a file cursor tracks the byte
//! offset. Cursor fields only change while the owning vnode is locked.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for cursor

use crate::domain::status::NfsError;
use crate::domain::vnode::Vnode;
use std::sync::Arc;

/// Cookie value that starts a directory listing from the beginning
pub const INITIAL_DIR_COOKIE: u32 = 0;

/// Position within a paged, cookie-continued directory listing
#[derive(Debug)]
pub struct DirCursor {
    vnode: Arc<Vnode>,
    cookie: u32,
    at_end: bool,
}

impl DirCursor {
    pub(crate) fn new(vnode: Arc<Vnode>) -> Self {
        Self {
            vnode,
            cookie: INITIAL_DIR_COOKIE,
            at_end: false,
        }
    }

    pub fn vnode(&self) -> &Arc<Vnode> {
        &self.vnode
    }

    pub fn cookie(&self) -> u32 {
        self.cookie
    }

    pub fn at_end(&self) -> bool {
        self.at_end
    }

    pub(crate) fn rewind(&mut self) {
        self.cookie = INITIAL_DIR_COOKIE;
        self.at_end = false;
    }

    pub(crate) fn advance(&mut self, cookie: u32) {
        self.cookie = cookie;
    }

    pub(crate) fn mark_end(&mut self) {
        self.at_end = true;
    }
}

/// Flags passed to `open`, carried but not interpreted by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags(pub u32);

impl OpenFlags {
    pub const RDONLY: Self = Self(0x0);
    pub const WRONLY: Self = Self(0x1);
    pub const RDWR: Self = Self(0x2);
}

/// Byte position within an open regular file
#[derive(Debug)]
pub struct FileCursor {
    vnode: Arc<Vnode>,
    offset: u64,
    flags: OpenFlags,
}

impl FileCursor {
    pub(crate) fn new(vnode: Arc<Vnode>, flags: OpenFlags) -> Self {
        Self {
            vnode,
            offset: 0,
            flags,
        }
    }

    pub fn vnode(&self) -> &Arc<Vnode> {
        &self.vnode
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn flags(&self) -> OpenFlags {
        self.flags
    }

    pub(crate) fn set_offset(&mut self, offset: u64) {
        self.offset = offset;
    }
}

/// Origin for `seek`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekMode {
    /// Absolute position
    Set,
    /// Relative to the cursor's current offset
    Current,
    /// Relative to the file's size
    End,
}

impl TryFrom<i32> for SeekMode {
    type Error = NfsError;

    /// Decode the host's `SEEK_SET`/`SEEK_CUR`/`SEEK_END` values
    fn try_from(whence: i32) -> Result<Self, Self::Error> {
        match whence {
            0 => Ok(Self::Set),
            1 => Ok(Self::Current),
            2 => Ok(Self::End),
            other => Err(NfsError::InvalidArgument(format!("unknown seek mode {}", other))),
        }
    }
}
