// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ONC-RPC v2 message framing
//!
//! Call headers with AUTH_UNIX credentials and reply parsing down to the
//! procedure's result record. Record marking is not used: one message per
//! UDP datagram.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements internal responsibilities for message

use crate::domain::rpc::RpcError;
use crate::infrastructure::xdr::{put_opaque, XdrDecoder, XdrEncode, XdrError};
use bytes::{BufMut, BytesMut};

pub const RPC_VERSION: u32 = 2;

const MSG_CALL: u32 = 0;
const MSG_REPLY: u32 = 1;

const MSG_ACCEPTED: u32 = 0;
const MSG_DENIED: u32 = 1;

const ACCEPT_SUCCESS: u32 = 0;

const AUTH_NULL: u32 = 0;
const AUTH_UNIX: u32 = 1;

/// Upper bound on any auth body
const MAX_AUTH_BYTES: usize = 400;

/// `authunix_parms` credential body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUnix {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
}

impl XdrEncode for AuthUnix {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        buf.put_u32(self.stamp);
        put_opaque(buf, self.machine_name.as_bytes(), 255)?;
        buf.put_u32(self.uid);
        buf.put_u32(self.gid);
        // no supplementary groups
        buf.put_u32(0);
        Ok(())
    }
}

/// Fixed part of a call message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallHeader {
    pub xid: u32,
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
}

/// Encode a complete call: header, AUTH_UNIX credential, AUTH_NULL verifier, args
pub fn encode_call(header: &CallHeader, cred: &AuthUnix, args: &[u8]) -> Result<BytesMut, XdrError> {
    let mut body = BytesMut::with_capacity(64);
    cred.encode(&mut body)?;

    let mut buf = BytesMut::with_capacity(64 + body.len() + args.len());
    buf.put_u32(header.xid);
    buf.put_u32(MSG_CALL);
    buf.put_u32(RPC_VERSION);
    buf.put_u32(header.program);
    buf.put_u32(header.version);
    buf.put_u32(header.procedure);
    buf.put_u32(AUTH_UNIX);
    put_opaque(&mut buf, &body, MAX_AUTH_BYTES)?;
    buf.put_u32(AUTH_NULL);
    buf.put_u32(0);
    buf.put_slice(args);
    Ok(buf)
}

/// Peek the transaction id of a received message
pub fn message_xid(buf: &[u8]) -> Option<u32> {
    XdrDecoder::new(buf).u32().ok()
}

/// Validate a reply and return the procedure's result record
pub fn decode_reply(buf: &[u8]) -> Result<&[u8], RpcError> {
    let mut dec = XdrDecoder::new(buf);
    let _xid = dec.u32()?;
    let msg_type = dec.u32()?;
    if msg_type != MSG_REPLY {
        return Err(RpcError::Garbage(format!("expected reply, got message type {}", msg_type)));
    }

    match dec.u32()? {
        MSG_ACCEPTED => {
            let _flavor = dec.u32()?;
            dec.opaque(MAX_AUTH_BYTES)?;
            match dec.u32()? {
                ACCEPT_SUCCESS => {
                    let consumed = buf.len() - dec.remaining();
                    Ok(&buf[consumed..])
                }
                stat => Err(RpcError::Unaccepted(stat)),
            }
        }
        MSG_DENIED => Err(RpcError::Denied(dec.u32()?)),
        other => Err(RpcError::Garbage(format!("unknown reply_stat {}", other))),
    }
}

/// Decode the fixed part of a call message, returning the header and its args
///
/// Credentials and verifier are skipped without inspection.
pub fn decode_call(buf: &[u8]) -> Result<(CallHeader, &[u8]), RpcError> {
    let mut dec = XdrDecoder::new(buf);
    let xid = dec.u32()?;
    let msg_type = dec.u32()?;
    let rpcvers = dec.u32()?;
    if msg_type != MSG_CALL || rpcvers != RPC_VERSION {
        return Err(RpcError::Garbage(format!(
            "not an RPCv2 call (type {}, version {})",
            msg_type, rpcvers
        )));
    }
    let header = CallHeader {
        xid,
        program: dec.u32()?,
        version: dec.u32()?,
        procedure: dec.u32()?,
    };
    for _ in 0..2 {
        let _flavor = dec.u32()?;
        dec.opaque(MAX_AUTH_BYTES)?;
    }
    let consumed = buf.len() - dec.remaining();
    Ok((header, &buf[consumed..]))
}

/// Encode an accepted, successful reply carrying `results`
pub fn encode_success_reply(xid: u32, results: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(24 + results.len());
    buf.put_u32(xid);
    buf.put_u32(MSG_REPLY);
    buf.put_u32(MSG_ACCEPTED);
    buf.put_u32(AUTH_NULL);
    buf.put_u32(0);
    buf.put_u32(ACCEPT_SUCCESS);
    buf.put_slice(results);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred() -> AuthUnix {
        AuthUnix {
            stamp: 7,
            machine_name: "host".to_string(),
            uid: 1000,
            gid: 100,
        }
    }

    #[test]
    fn test_call_roundtrip_keeps_args() {
        let header = CallHeader {
            xid: 0x1234,
            program: 100_003,
            version: 2,
            procedure: 4,
        };
        let msg = encode_call(&header, &cred(), &[1, 2, 3, 4]).unwrap();

        let (decoded, args) = decode_call(&msg).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(args, &[1, 2, 3, 4]);
        assert_eq!(message_xid(&msg), Some(0x1234));
    }

    #[test]
    fn test_success_reply_yields_results() {
        let reply = encode_success_reply(9, &[0, 0, 0, 5]);
        assert_eq!(message_xid(&reply), Some(9));
        assert_eq!(decode_reply(&reply).unwrap(), &[0, 0, 0, 5]);
    }

    #[test]
    fn test_denied_and_unaccepted_replies() {
        let mut denied = BytesMut::new();
        for word in [1u32, MSG_REPLY, MSG_DENIED, 1] {
            denied.put_u32(word);
        }
        assert!(matches!(decode_reply(&denied), Err(RpcError::Denied(1))));

        let mut prog_unavail = BytesMut::new();
        for word in [1u32, MSG_REPLY, MSG_ACCEPTED, AUTH_NULL, 0, 1] {
            prog_unavail.put_u32(word);
        }
        assert!(matches!(decode_reply(&prog_unavail), Err(RpcError::Unaccepted(1))));
    }

    #[test]
    fn test_call_is_not_a_reply() {
        let header = CallHeader {
            xid: 1,
            program: 1,
            version: 1,
            procedure: 0,
        };
        let msg = encode_call(&header, &cred(), &[]).unwrap();
        assert!(matches!(decode_reply(&msg), Err(RpcError::Garbage(_))));
        assert!(matches!(decode_reply(&[0, 0]), Err(RpcError::Garbage(_))));
    }
}
