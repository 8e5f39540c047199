// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Integration tests for mount and unmount
//!
//! These tests verify:
//! 1. Port resolution and per-call routing (MOUNT vs NFS service)
//! 2. Mount failures surface translated errors and leave nothing behind
//! 3. Unmount is best-effort and always releases the session

mod common;

use common::{FakeNfsServer, Fault, DEVICE, FS, MOUNT_PORT, NFS_PORT, SERVER};
use nfs_client_core::domain::rpc::{RpcError, MOUNTPROC_MNT, MOUNTPROC_UMNT, MOUNT_PROGRAM, NFS_PROGRAM};
use nfs_client_core::domain::status::NfsError;
use nfs_client_core::domain::vfs::{FsCalls, HostVfsError};
use nfs_client_core::domain::vnode::VnodeKind;
use nfs_client_core::{MountSession, MountSpec, MountState, NfsFs, NfsMountArgs, RefCountingHost};
use std::net::SocketAddrV4;
use std::sync::Arc;

#[test]
fn test_mount_resolves_ports_and_routes_calls() {
    let server = FakeNfsServer::new();
    server.add_file(server.root_handle(), "motd", b"hello");

    let (fs, host, root_id) = common::mount(&server);
    assert_eq!(fs.session().mount_port(), MOUNT_PORT);
    assert_eq!(fs.session().nfs_port(), NFS_PORT);
    assert_eq!(fs.session().server_path(), "/export");
    assert_eq!(fs.root().id(), root_id);
    assert_eq!(fs.root().kind(), VnodeKind::Directory);
    assert_eq!(*fs.root().handle(), server.root_handle());
    assert_eq!(host.ref_count(FS, root_id), 1);

    let mnt = &server.calls()[0];
    assert_eq!((mnt.program, mnt.procedure), (MOUNT_PROGRAM, MOUNTPROC_MNT));
    assert_eq!(mnt.destination, SocketAddrV4::new(SERVER, MOUNT_PORT));

    fs.lookup(fs.root(), "motd").unwrap();
    let lookup = server.calls().last().cloned().unwrap();
    assert_eq!(lookup.program, NFS_PROGRAM);
    assert_eq!(lookup.destination, SocketAddrV4::new(SERVER, NFS_PORT));
}

#[test]
fn test_bad_mount_address_makes_no_calls() {
    let server = FakeNfsServer::new();
    let host = Arc::new(RefCountingHost::new());

    for device in ["fileserver:/export", "10.0.0.5/export", "   "] {
        let err = NfsFs::mount(FS, device, NfsMountArgs::new(server.clone(), host.clone())).unwrap_err();
        assert!(matches!(err, NfsError::BadAddress(_)), "{}: {:?}", device, err);
    }
    assert!(server.calls().is_empty());
    assert_eq!(host.held(), 0);
}

#[test]
fn test_mount_of_unknown_export_is_refused() {
    let server = FakeNfsServer::new();
    let host = Arc::new(RefCountingHost::new());

    let err = NfsFs::mount(FS, "10.0.0.5:/private", NfsMountArgs::new(server.clone(), host.clone())).unwrap_err();
    assert!(matches!(err, NfsError::PermissionDenied));
    assert_eq!(server.count(MOUNT_PROGRAM, MOUNTPROC_UMNT), 0);
    assert_eq!(host.held(), 0);
}

#[test]
fn test_mount_fails_when_service_is_not_registered() {
    let server = FakeNfsServer::new();
    server.unregister(NFS_PROGRAM);
    let host = Arc::new(RefCountingHost::new());

    let err = NfsFs::mount(FS, DEVICE, NfsMountArgs::new(server.clone(), host)).unwrap_err();
    assert!(matches!(
        err,
        NfsError::Transport(RpcError::NotRegistered { program: NFS_PROGRAM, .. })
    ));
    assert!(server.calls().is_empty());
}

#[test]
fn test_mount_transport_failure_surfaces() {
    let server = FakeNfsServer::new();
    server.fail(MOUNT_PROGRAM, MOUNTPROC_MNT, Fault::Transport);
    let host = Arc::new(RefCountingHost::new());

    let err = NfsFs::mount(FS, DEVICE, NfsMountArgs::new(server.clone(), host)).unwrap_err();
    assert!(matches!(err, NfsError::Transport(RpcError::Timeout { .. })));
}

#[test]
fn test_host_refusing_root_aborts_mount() {
    let server = FakeNfsServer::new();
    let host = Arc::new(RefCountingHost::with_limit(0));

    let err = NfsFs::mount(FS, DEVICE, NfsMountArgs::new(server.clone(), host.clone())).unwrap_err();
    assert!(matches!(err, NfsError::Host(HostVfsError::Exhausted)));
    // the export was mounted on the server, so it is released again
    assert_eq!(server.count(MOUNT_PROGRAM, MOUNTPROC_UMNT), 1);
}

#[test]
fn test_mount_then_unmount_leaks_nothing() {
    let server = FakeNfsServer::new();
    let (fs, host, root_id) = common::mount(&server);
    let root = fs.root().clone();

    fs.unmount().unwrap();

    assert_eq!(Arc::strong_count(&root), 1);
    assert_eq!(host.ref_count(FS, root_id), 0);
    assert_eq!(host.held(), 0);
    assert_eq!(server.count(MOUNT_PROGRAM, MOUNTPROC_UMNT), 1);

    let umnt = server.calls().last().cloned().unwrap();
    assert_eq!(umnt.destination, SocketAddrV4::new(SERVER, MOUNT_PORT));
}

#[test]
fn test_unmount_ignores_umnt_failure() {
    let server = FakeNfsServer::new();
    server.fail(MOUNT_PROGRAM, MOUNTPROC_UMNT, Fault::Transport);
    let (fs, host, _) = common::mount(&server);

    assert!(fs.unmount().is_ok());
    assert_eq!(host.held(), 0);
}

#[test]
fn test_session_state_transitions() {
    let server = FakeNfsServer::new();
    let spec: MountSpec = DEVICE.parse().unwrap();

    let session = MountSession::establish(FS, &spec, server.clone(), 16).unwrap();
    assert_eq!(session.state(), MountState::Mounted);
    assert_eq!(session.cache().len(), 1);
    assert!(Arc::ptr_eq(
        &session.cache().lookup(&server.root_handle()).unwrap(),
        session.root()
    ));

    session.teardown();
    assert_eq!(session.state(), MountState::Unmounted);
    assert!(session.cache().is_empty());

    // second teardown and the drop are no-ops
    session.teardown();
    drop(session);
    assert_eq!(server.count(MOUNT_PROGRAM, MOUNTPROC_UMNT), 1);
}

#[test]
fn test_sync_and_fsync_make_no_calls() {
    let server = FakeNfsServer::new();
    let (fs, _host, _) = common::mount(&server);
    server.clear_calls();

    fs.sync().unwrap();
    fs.fsync(fs.root()).unwrap();
    assert!(server.calls().is_empty());
}
