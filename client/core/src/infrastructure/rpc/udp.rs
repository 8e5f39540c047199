// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Blocking UDP ONC-RPC client
//!
//! Every in-flight call owns a socket for its whole exchange: send, wait for
//! the reply with the matching xid, retransmit on timeout. Idle sockets are
//! kept for reuse, so calls on different vnodes proceed in parallel without
//! sharing a receive queue. Replies carrying another xid are late answers to
//! an earlier call on the same socket and are dropped.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements [`RpcTransport`] over `std::net::UdpSocket`

use crate::domain::config::TransportConfig;
use crate::domain::rpc::{RpcError, RpcTransport, PMAPPROC_GETPORT, PMAP_PROGRAM, PMAP_VERSION};
use crate::infrastructure::rpc::message::{decode_reply, encode_call, message_xid, AuthUnix, CallHeader};
use crate::infrastructure::xdr::{pack, PmapMapping, XdrDecoder};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace, warn};

/// Largest datagram the transport will accept
const MAX_DATAGRAM: usize = 64 * 1024;

pub struct UdpRpcTransport {
    /// Sockets not currently used by a call
    idle: Mutex<Vec<UdpSocket>>,
    next_xid: AtomicU32,
    credentials: AuthUnix,
    timeout: Duration,
    retransmits: u32,
    portmap_port: u16,
}

impl UdpRpcTransport {
    /// Bind an ephemeral local port and prepare AUTH_UNIX credentials
    pub fn new(config: &TransportConfig) -> Result<Self, RpcError> {
        let socket = bind_ephemeral()?;
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
            .unwrap_or(1);

        debug!("RPC transport bound to {:?}", socket.local_addr().ok());

        Ok(Self {
            idle: Mutex::new(vec![socket]),
            next_xid: AtomicU32::new(seed),
            credentials: AuthUnix {
                stamp: seed,
                machine_name: config.machine_name.clone(),
                uid: config.uid,
                gid: config.gid,
            },
            timeout: config.timeout(),
            retransmits: config.retransmits,
            portmap_port: config.portmap_port,
        })
    }

    fn checkout(&self) -> Result<UdpSocket, RpcError> {
        if let Some(socket) = self.idle.lock().pop() {
            return Ok(socket);
        }
        let socket = bind_ephemeral()?;
        debug!("RPC transport bound extra socket {:?}", socket.local_addr().ok());
        Ok(socket)
    }

    fn checkin(&self, socket: UdpSocket) {
        self.idle.lock().push(socket);
    }

    fn exchange(&self, socket: &UdpSocket, destination: SocketAddrV4, xid: u32, message: &[u8]) -> Result<Vec<u8>, RpcError> {
        let attempts = self.retransmits.saturating_add(1);
        let mut datagram = vec![0u8; MAX_DATAGRAM];

        for attempt in 1..=attempts {
            socket.send_to(message, destination)?;
            trace!("RPC send: xid={:#x}, attempt={}, dest={}", xid, attempt, destination);

            let deadline = Instant::now() + self.timeout;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    break;
                }
                socket.set_read_timeout(Some(remaining))?;

                let (len, from) = match socket.recv_from(&mut datagram) {
                    Ok(received) => received,
                    Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => break,
                    Err(e) => return Err(e.into()),
                };

                if from != SocketAddr::V4(destination) {
                    trace!("RPC recv: ignoring datagram from {}", from);
                    continue;
                }
                match message_xid(&datagram[..len]) {
                    Some(got) if got == xid => {
                        datagram.truncate(len);
                        return Ok(datagram);
                    }
                    got => trace!("RPC recv: stale xid {:?}, waiting for {:#x}", got, xid),
                }
            }

            if attempt < attempts {
                debug!("RPC timeout: xid={:#x}, retransmitting ({}/{})", xid, attempt, attempts - 1);
            }
        }

        warn!("RPC call to {} gave up: xid={:#x}, attempts={}", destination, xid, attempts);
        Err(RpcError::Timeout { xid, attempts })
    }
}

impl RpcTransport for UdpRpcTransport {
    fn call(
        &self,
        destination: SocketAddrV4,
        program: u32,
        version: u32,
        procedure: u32,
        request: &[u8],
        response: &mut [u8],
    ) -> Result<usize, RpcError> {
        let xid = self.next_xid.fetch_add(1, Ordering::Relaxed);
        let header = CallHeader {
            xid,
            program,
            version,
            procedure,
        };
        let message = encode_call(&header, &self.credentials, request)?;

        let socket = self.checkout()?;
        let exchanged = self.exchange(&socket, destination, xid, &message);
        self.checkin(socket);
        let reply = exchanged?;

        let results = decode_reply(&reply)?;
        let n = results.len().min(response.len());
        response[..n].copy_from_slice(&results[..n]);
        debug!(
            "RPC call: prog={}, vers={}, proc={}, xid={:#x}, {} result bytes",
            program, version, procedure, xid, results.len()
        );
        Ok(n)
    }

    fn portmap_lookup(&self, server: Ipv4Addr, program: u32, version: u32, protocol: u32) -> Result<u16, RpcError> {
        let args = pack(&PmapMapping {
            program,
            version,
            protocol,
            port: 0,
        })?;
        let mut result = [0u8; 4];
        let n = self.call(
            SocketAddrV4::new(server, self.portmap_port),
            PMAP_PROGRAM,
            PMAP_VERSION,
            PMAPPROC_GETPORT,
            &args,
            &mut result,
        )?;

        let port = XdrDecoder::new(&result[..n]).u32()?;
        match u16::try_from(port) {
            Ok(0) => Err(RpcError::NotRegistered { program, version }),
            Ok(port) => {
                debug!("Portmap: prog={} vers={} -> port {}", program, version, port);
                Ok(port)
            }
            Err(_) => Err(RpcError::Garbage(format!("portmapper returned port {}", port))),
        }
    }
}

fn bind_ephemeral() -> Result<UdpSocket, RpcError> {
    Ok(UdpSocket::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))?)
}
