// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Types that describe the driver independently of the wire: file handles,
//! vnodes and their cache, cursors, the error taxonomy, the host VFS contract
//! and client configuration.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Implements internal responsibilities for mod

pub mod cache;
pub mod config;
pub mod cursor;
pub mod file_handle;
pub mod rpc;
pub mod status;
pub mod vfs;
pub mod vnode;
