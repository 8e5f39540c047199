// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for directory enumeration

mod common;

use common::{read_name, FakeNfsServer, Fault, READDIR};
use nfs_client_core::application::nfs_fs::READDIR_BUF_SIZE;
use nfs_client_core::domain::cursor::DirCursor;
use nfs_client_core::domain::rpc::{RpcError, NFS_PROGRAM};
use nfs_client_core::domain::status::NfsError;
use nfs_client_core::domain::vfs::FsCalls;
use nfs_client_core::NfsFs;

fn drain(fs: &NfsFs, cursor: &mut DirCursor) -> Vec<String> {
    let mut names = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = fs.readdir(cursor, &mut buf).unwrap();
        match read_name(&buf, n) {
            Some(name) => names.push(name),
            None => break,
        }
    }
    names
}

fn requested_count(request: &[u8]) -> u32 {
    // dir handle (32), cookie (4), count (4)
    u32::from_be_bytes([request[36], request[37], request[38], request[39]])
}

#[test]
fn test_enumerates_every_entry_then_rewinds() {
    let server = FakeNfsServer::new();
    let root = server.root_handle();
    for name in [".", "..", "alpha", "beta", "gamma"] {
        server.add_file(root, name, b"");
    }

    let (fs, _host, _) = common::mount(&server);
    let mut cursor = fs.opendir(fs.root()).unwrap();

    let first = drain(&fs, &mut cursor);
    assert_eq!(first, [".", "..", "alpha", "beta", "gamma"]);
    assert!(cursor.at_end());

    // once exhausted, no further calls are made
    let calls = server.nfs_calls(READDIR);
    let mut buf = [0u8; 512];
    assert_eq!(fs.readdir(&mut cursor, &mut buf).unwrap(), 0);
    assert_eq!(server.nfs_calls(READDIR), calls);

    fs.rewinddir(&mut cursor).unwrap();
    assert_eq!(cursor.cookie(), 0);
    assert!(!cursor.at_end());
    assert_eq!(drain(&fs, &mut cursor), first);

    fs.closedir(fs.root(), cursor).unwrap();
}

#[test]
fn test_empty_directory_reads_nothing() {
    let server = FakeNfsServer::new();
    let (fs, _host, _) = common::mount(&server);

    let mut cursor = fs.opendir(fs.root()).unwrap();
    let mut buf = [0u8; 512];
    assert_eq!(fs.readdir(&mut cursor, &mut buf).unwrap(), 0);
    assert!(cursor.at_end());
}

#[test]
fn test_undersized_buffer_is_rejected() {
    let server = FakeNfsServer::new();
    server.add_file(server.root_handle(), "a", b"");
    let (fs, _host, _) = common::mount(&server);
    server.clear_calls();

    let mut cursor = fs.opendir(fs.root()).unwrap();
    let mut buf = [0u8; 100];
    let err = fs.readdir(&mut cursor, &mut buf).unwrap_err();

    assert!(matches!(err, NfsError::InsufficientBuffer { required: 255, provided: 100 }));
    assert_eq!(server.nfs_calls(READDIR), 0);
    assert_eq!(cursor.cookie(), 0);
}

#[test]
fn test_opendir_on_file_is_refused() {
    let server = FakeNfsServer::new();
    server.add_file(server.root_handle(), "file", b"data");
    let (fs, _host, _) = common::mount(&server);

    let id = fs.lookup(fs.root(), "file").unwrap();
    let file = fs.getvnode(id).unwrap();
    assert!(matches!(fs.opendir(&file), Err(NfsError::NotADirectory)));
}

#[test]
fn test_error_status_keeps_listing_resumable() {
    let server = FakeNfsServer::new();
    let root = server.root_handle();
    server.add_file(root, "one", b"");
    server.add_file(root, "two", b"");

    let (fs, _host, _) = common::mount(&server);
    let mut cursor = fs.opendir(fs.root()).unwrap();
    let mut buf = [0u8; 512];

    let n = fs.readdir(&mut cursor, &mut buf).unwrap();
    assert_eq!(read_name(&buf, n).as_deref(), Some("one"));

    server.fail(NFS_PROGRAM, READDIR, Fault::Status(5));
    assert_eq!(fs.readdir(&mut cursor, &mut buf).unwrap(), 0);
    assert!(!cursor.at_end());

    server.clear_faults();
    let n = fs.readdir(&mut cursor, &mut buf).unwrap();
    assert_eq!(read_name(&buf, n).as_deref(), Some("two"));
}

#[test]
fn test_transport_failure_surfaces() {
    let server = FakeNfsServer::new();
    server.add_file(server.root_handle(), "a", b"");
    let (fs, _host, _) = common::mount(&server);

    server.fail(NFS_PROGRAM, READDIR, Fault::Transport);
    let mut cursor = fs.opendir(fs.root()).unwrap();
    let mut buf = [0u8; 512];
    let err = fs.readdir(&mut cursor, &mut buf).unwrap_err();

    assert!(matches!(err, NfsError::Transport(RpcError::Timeout { .. })));
    assert_eq!(cursor.cookie(), 0);
}

#[test]
fn test_requested_count_is_capped_by_reply_buffer() {
    let server = FakeNfsServer::new();
    server.add_file(server.root_handle(), "a", b"");
    let (fs, _host, _) = common::mount(&server);

    let mut big = [0u8; 4096];
    let mut cursor = fs.opendir(fs.root()).unwrap();
    fs.readdir(&mut cursor, &mut big).unwrap();

    let mut exact = [0u8; 300];
    fs.rewinddir(&mut cursor).unwrap();
    fs.readdir(&mut cursor, &mut exact).unwrap();

    let requests = server.requests(READDIR);
    assert_eq!(requested_count(&requests[0]), READDIR_BUF_SIZE as u32);
    assert_eq!(requested_count(&requests[1]), 300);
}

#[test]
fn test_cookie_follows_returned_entries() {
    let server = FakeNfsServer::new();
    let root = server.root_handle();
    server.add_file(root, "a", b"");
    server.add_file(root, "b", b"");

    let (fs, _host, _) = common::mount(&server);
    let mut cursor = fs.opendir(fs.root()).unwrap();
    let mut buf = [0u8; 512];

    fs.readdir(&mut cursor, &mut buf).unwrap();
    assert_eq!(cursor.cookie(), 1);
    fs.readdir(&mut cursor, &mut buf).unwrap();
    assert_eq!(cursor.cookie(), 2);

    let cookies: Vec<u32> = server
        .requests(READDIR)
        .iter()
        .map(|r| u32::from_be_bytes([r[32], r[33], r[34], r[35]]))
        .collect();
    assert_eq!(cookies, [0, 1]);
}
