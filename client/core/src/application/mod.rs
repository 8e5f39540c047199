// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Application Layer
//!
//! The mount session, the driver that implements the host VFS contract on
//! top of it, and a minimal reference-counting host.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements internal responsibilities for mod

pub mod host;
pub mod nfs_fs;
pub mod session;
