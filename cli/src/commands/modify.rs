// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Namespace-changing commands
//!
//! Commands: touch, mkdir, rm, rmdir

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use nfs_client_core::domain::config::ClientConfig;
use nfs_client_core::domain::status::NfsError;
use nfs_client_core::domain::vfs::FsCalls;

use crate::remote::Remote;

#[derive(Subcommand)]
pub enum ModifyCommand {
    /// Create an empty file if it does not exist
    Touch {
        /// Export to mount, as <ipv4>:<path>
        device: String,
        /// File to create
        path: String,
    },

    /// Create a directory
    Mkdir {
        /// Export to mount, as <ipv4>:<path>
        device: String,
        /// Directory to create
        path: String,
    },

    /// Remove a file
    Rm {
        /// Export to mount, as <ipv4>:<path>
        device: String,
        /// File to remove
        path: String,
    },

    /// Remove an empty directory
    Rmdir {
        /// Export to mount, as <ipv4>:<path>
        device: String,
        /// Directory to remove
        path: String,
    },
}

impl ModifyCommand {
    fn target(&self) -> (&str, &str) {
        match self {
            Self::Touch { device, path }
            | Self::Mkdir { device, path }
            | Self::Rm { device, path }
            | Self::Rmdir { device, path } => (device.as_str(), path.as_str()),
        }
    }
}

pub fn handle_command(command: ModifyCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = ClientConfig::load_or_default(config_override).context("Failed to load configuration")?;
    let (device, path) = command.target();

    let remote = Remote::mount(device, &config)?;
    let result = apply(&remote, &command, path);
    remote.unmount()?;
    result
}

fn apply(remote: &Remote, command: &ModifyCommand, path: &str) -> Result<()> {
    let fs = remote.fs();
    let (dir, name) = remote.walk_parent(path)?;

    let outcome = match command {
        ModifyCommand::Touch { .. } => match fs.create(&dir, name) {
            Ok(id) => {
                if let Ok(created) = fs.getvnode(id) {
                    remote.release(created);
                }
                Ok("created")
            }
            Err(NfsError::AlreadyExists) => Ok("exists"),
            Err(e) => Err(e),
        },
        ModifyCommand::Mkdir { .. } => fs.mkdir(&dir, name).map(|_| "created"),
        ModifyCommand::Rm { .. } => fs.unlink(&dir, name).map(|_| "removed"),
        ModifyCommand::Rmdir { .. } => fs.rmdir(&dir, name).map(|_| "removed"),
    };
    remote.release(dir);

    let verb = outcome.with_context(|| format!("{}: operation failed", path))?;
    println!("{}", format!("✓ {} {}", path, verb).green());
    Ok(())
}
