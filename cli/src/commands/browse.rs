// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Read-only commands
//!
//! Commands: ls, cat, stat

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::io::Write;
use std::path::PathBuf;

use nfs_client_core::application::nfs_fs::READDIR_BUF_SIZE;
use nfs_client_core::domain::config::ClientConfig;
use nfs_client_core::domain::cursor::OpenFlags;
use nfs_client_core::domain::vfs::{FileStat, FsCalls};
use nfs_client_core::domain::vnode::VnodeKind;

use crate::remote::Remote;

/// Bytes requested from the driver per `read` while streaming a file
const CAT_CHUNK: usize = 8192;

#[derive(Subcommand)]
pub enum BrowseCommand {
    /// List a directory
    Ls {
        /// Export to mount, as <ipv4>:<path>
        device: String,

        /// Directory inside the export
        #[arg(default_value = "/")]
        path: String,

        /// Show kind and size of every entry
        #[arg(short, long)]
        long: bool,
    },

    /// Print a file to stdout
    Cat {
        /// Export to mount, as <ipv4>:<path>
        device: String,

        /// File inside the export
        path: String,
    },

    /// Show attributes of a file or directory
    Stat {
        /// Export to mount, as <ipv4>:<path>
        device: String,

        /// Entry inside the export
        #[arg(default_value = "/")]
        path: String,
    },
}

pub fn handle_command(command: BrowseCommand, config_override: Option<PathBuf>) -> Result<()> {
    let config = ClientConfig::load_or_default(config_override).context("Failed to load configuration")?;

    match command {
        BrowseCommand::Ls { device, path, long } => {
            let remote = Remote::mount(&device, &config)?;
            let result = ls(&remote, &path, long);
            remote.unmount()?;
            result
        }
        BrowseCommand::Cat { device, path } => {
            let remote = Remote::mount(&device, &config)?;
            let result = cat(&remote, &path);
            remote.unmount()?;
            result
        }
        BrowseCommand::Stat { device, path } => {
            let remote = Remote::mount(&device, &config)?;
            let result = stat(&remote, &path);
            remote.unmount()?;
            result
        }
    }
}

fn ls(remote: &Remote, path: &str, long: bool) -> Result<()> {
    let fs = remote.fs();
    let dir = remote.walk(path)?;
    let mut cursor = fs.opendir(&dir).with_context(|| format!("{}: cannot list", path))?;

    let mut names = Vec::new();
    let mut buf = [0u8; READDIR_BUF_SIZE];
    loop {
        let n = fs.readdir(&mut cursor, &mut buf)?;
        if n == 0 {
            break;
        }
        names.push(String::from_utf8_lossy(&buf[..n]).into_owned());
    }
    fs.closedir(&dir, cursor)?;

    for name in &names {
        if !long || name == "." || name == ".." {
            println!("{}", name);
            continue;
        }
        match fs.lookup(&dir, name).and_then(|id| fs.getvnode(id)) {
            Ok(entry) => {
                let attrs = fs.rstat(&entry);
                remote.release(entry);
                match attrs {
                    Ok(attrs) => println!("{} {:>10} {}", kind_tag(attrs.kind), attrs.size, decorate(name, attrs.kind)),
                    Err(e) => println!("? {:>10} {} ({})", "-", name, e.to_string().dimmed()),
                }
            }
            Err(e) => println!("? {:>10} {} ({})", "-", name, e.to_string().dimmed()),
        }
    }

    remote.release(dir);
    Ok(())
}

fn cat(remote: &Remote, path: &str) -> Result<()> {
    let fs = remote.fs();
    let file = remote.walk(path)?;
    let mut cursor = fs.open(&file, OpenFlags::RDONLY).with_context(|| format!("{}: cannot open", path))?;

    let mut stdout = std::io::stdout().lock();
    let mut buf = vec![0u8; CAT_CHUNK];
    loop {
        let n = fs.read(&mut cursor, &mut buf, None).with_context(|| format!("{}: read failed", path))?;
        if n == 0 {
            break;
        }
        stdout.write_all(&buf[..n])?;
    }
    stdout.flush()?;

    fs.close(&file, &cursor)?;
    fs.freecookie(&file, cursor)?;
    remote.release(file);
    Ok(())
}

fn stat(remote: &Remote, path: &str) -> Result<()> {
    let file = remote.walk(path)?;
    let attrs = remote.fs().rstat(&file).with_context(|| format!("{}: stat failed", path))?;
    print_stat(path, &attrs);
    remote.release(file);
    Ok(())
}

fn print_stat(path: &str, attrs: &FileStat) {
    println!("{}", path.bold());
    println!("  Kind:  {:?}", attrs.kind);
    println!("  Size:  {}", attrs.size);
    println!("  Vnode: {}", attrs.vnid);
}

fn kind_tag(kind: VnodeKind) -> char {
    match kind {
        VnodeKind::Directory => 'd',
        VnodeKind::File => '-',
        VnodeKind::Unknown => '?',
    }
}

fn decorate(name: &str, kind: VnodeKind) -> String {
    match kind {
        VnodeKind::Directory => format!("{}/", name).blue().bold().to_string(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(kind_tag(VnodeKind::Directory), 'd');
        assert_eq!(kind_tag(VnodeKind::File), '-');
        assert_eq!(kind_tag(VnodeKind::Unknown), '?');
    }

    #[test]
    fn test_directories_get_trailing_slash() {
        colored::control::set_override(false);
        assert_eq!(decorate("sub", VnodeKind::Directory), "sub/");
        assert_eq!(decorate("file", VnodeKind::File), "file");
    }
}
