// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! XDR Marshaling for MOUNT v1 and NFSv2
//!
//! Typed pack/unpack of the argument and result records the driver
//! exchanges with the server. Everything on the wire is big-endian and
//! padded to a 4-byte boundary; [`round_up4`] is that padding rule.
//!
//! Result decoders return `Result<Reply<T>, XdrError>`: the outer error means
//! the bytes were malformed, the inner [`Reply`] carries the server's status.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Wire codec between driver types and RPC payloads

use crate::domain::file_handle::{FileHandle, FHSIZE};
use crate::domain::rpc::RpcError;
use crate::domain::status::{NfsError, NfsStatus};
use crate::domain::vnode::VnodeKind;
use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;

/// Longest path accepted by MNT
pub const MNTPATHLEN: usize = 1024;
/// Longest single path component
pub const MAXNAMLEN: usize = 255;
/// Largest READ/WRITE payload in NFSv2
pub const NFS_MAXDATA: usize = 8192;

/// Encoded size of `fattr`
pub const FATTR_LEN: usize = 17 * 4;
/// Encoded size of a successful `attrstat`
pub const ATTRSTAT_LEN: usize = 4 + FATTR_LEN;
/// Encoded size of a successful `diropres`
pub const DIROPRES_LEN: usize = 4 + FHSIZE + FATTR_LEN;

/// Round `len` up to the next multiple of four
#[inline]
pub const fn round_up4(len: usize) -> usize {
    (len + 3) & !3
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XdrError {
    #[error("Truncated record: needed {needed} bytes, {remaining} remaining")]
    ShortBuffer { needed: usize, remaining: usize },

    #[error("Opaque of {len} bytes exceeds the {max} byte limit")]
    TooLong { len: usize, max: usize },
}

impl From<XdrError> for RpcError {
    fn from(err: XdrError) -> Self {
        RpcError::Garbage(err.to_string())
    }
}

impl From<XdrError> for NfsError {
    fn from(err: XdrError) -> Self {
        NfsError::Transport(err.into())
    }
}

/// Outcome of a procedure the server executed
pub type Reply<T> = Result<T, NfsStatus>;

// ============================================================================
// Encoding
// ============================================================================

pub trait XdrEncode {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError>;
}

/// Encode `value` into a fresh buffer
pub fn pack<T: XdrEncode + ?Sized>(value: &T) -> Result<BytesMut, XdrError> {
    let mut buf = BytesMut::with_capacity(128);
    value.encode(&mut buf)?;
    Ok(buf)
}

/// Variable-length opaque: length word, bytes, zero padding
pub fn put_opaque(buf: &mut BytesMut, data: &[u8], max: usize) -> Result<(), XdrError> {
    if data.len() > max {
        return Err(XdrError::TooLong { len: data.len(), max });
    }
    buf.put_u32(data.len() as u32);
    buf.put_slice(data);
    buf.put_bytes(0, round_up4(data.len()) - data.len());
    Ok(())
}

impl XdrEncode for FileHandle {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        buf.put_slice(self.as_bytes());
        Ok(())
    }
}

/// MNT / UMNT argument: the exported path
#[derive(Debug, Clone, Copy)]
pub struct MountArgs<'a> {
    pub path: &'a str,
}

impl XdrEncode for MountArgs<'_> {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        put_opaque(buf, self.path.as_bytes(), MNTPATHLEN)
    }
}

/// `diropargs`: directory handle plus component name
#[derive(Debug, Clone, Copy)]
pub struct DirOpArgs<'a> {
    pub dir: &'a FileHandle,
    pub name: &'a str,
}

impl XdrEncode for DirOpArgs<'_> {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        self.dir.encode(buf)?;
        put_opaque(buf, self.name.as_bytes(), MAXNAMLEN)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadArgs<'a> {
    pub file: &'a FileHandle,
    pub offset: u32,
    pub count: u32,
    /// Unused by NFSv2 servers
    pub total_count: u32,
}

impl XdrEncode for ReadArgs<'_> {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        self.file.encode(buf)?;
        buf.put_u32(self.offset);
        buf.put_u32(self.count);
        buf.put_u32(self.total_count);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReadDirArgs<'a> {
    pub dir: &'a FileHandle,
    pub cookie: u32,
    pub count: u32,
}

impl XdrEncode for ReadDirArgs<'_> {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        self.dir.encode(buf)?;
        buf.put_u32(self.cookie);
        buf.put_u32(self.count);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeVal {
    pub seconds: u32,
    pub useconds: u32,
}

impl XdrEncode for TimeVal {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        buf.put_u32(self.seconds);
        buf.put_u32(self.useconds);
        Ok(())
    }
}

/// Settable attributes sent with CREATE and MKDIR
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SAttr {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub atime: TimeVal,
    pub mtime: TimeVal,
}

impl SAttr {
    /// Attributes used for every object the driver creates
    pub fn create_defaults() -> Self {
        Self {
            mode: 0o777,
            uid: 0,
            gid: 0,
            size: 0,
            atime: TimeVal::default(),
            mtime: TimeVal::default(),
        }
    }
}

impl XdrEncode for SAttr {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        buf.put_u32(self.mode);
        buf.put_u32(self.uid);
        buf.put_u32(self.gid);
        buf.put_u32(self.size);
        self.atime.encode(buf)?;
        self.mtime.encode(buf)
    }
}

/// `createargs`, shared by CREATE and MKDIR
#[derive(Debug, Clone, Copy)]
pub struct CreateArgs<'a> {
    pub target: DirOpArgs<'a>,
    pub attributes: SAttr,
}

impl XdrEncode for CreateArgs<'_> {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        self.target.encode(buf)?;
        self.attributes.encode(buf)
    }
}

/// Portmap `mapping` used as GETPORT argument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmapMapping {
    pub program: u32,
    pub version: u32,
    pub protocol: u32,
    pub port: u32,
}

impl XdrEncode for PmapMapping {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        buf.put_u32(self.program);
        buf.put_u32(self.version);
        buf.put_u32(self.protocol);
        buf.put_u32(self.port);
        Ok(())
    }
}

// ============================================================================
// Decoding
// ============================================================================

/// Cursor over a received record
#[derive(Debug, Clone)]
pub struct XdrDecoder<'a> {
    buf: &'a [u8],
}

impl<'a> XdrDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    fn need(&self, needed: usize) -> Result<(), XdrError> {
        if self.buf.len() < needed {
            return Err(XdrError::ShortBuffer {
                needed,
                remaining: self.buf.len(),
            });
        }
        Ok(())
    }

    pub fn u32(&mut self) -> Result<u32, XdrError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    pub fn bool(&mut self) -> Result<bool, XdrError> {
        Ok(self.u32()? != 0)
    }

    /// Fixed-length opaque of `len` bytes plus its padding
    pub fn fixed(&mut self, len: usize) -> Result<&'a [u8], XdrError> {
        let padded = round_up4(len);
        self.need(padded)?;
        let (data, rest) = self.buf.split_at(padded);
        self.buf = rest;
        Ok(&data[..len])
    }

    /// Variable-length opaque bounded by `max`
    pub fn opaque(&mut self, max: usize) -> Result<&'a [u8], XdrError> {
        let len = self.u32()? as usize;
        if len > max {
            return Err(XdrError::TooLong { len, max });
        }
        self.fixed(len)
    }

    pub fn skip(&mut self, len: usize) -> Result<(), XdrError> {
        self.fixed(len).map(|_| ())
    }

    pub fn file_handle(&mut self) -> Result<FileHandle, XdrError> {
        let bytes = self.fixed(FHSIZE)?;
        FileHandle::from_slice(bytes).ok_or(XdrError::ShortBuffer {
            needed: FHSIZE,
            remaining: bytes.len(),
        })
    }

    pub fn status(&mut self) -> Result<NfsStatus, XdrError> {
        Ok(NfsStatus::from(self.u32()?))
    }

    pub fn time(&mut self) -> Result<TimeVal, XdrError> {
        Ok(TimeVal {
            seconds: self.u32()?,
            useconds: self.u32()?,
        })
    }

    pub fn fattr(&mut self) -> Result<FAttr, XdrError> {
        Ok(FAttr {
            ftype: FileType::from(self.u32()?),
            mode: self.u32()?,
            nlink: self.u32()?,
            uid: self.u32()?,
            gid: self.u32()?,
            size: self.u32()?,
            blocksize: self.u32()?,
            rdev: self.u32()?,
            blocks: self.u32()?,
            fsid: self.u32()?,
            fileid: self.u32()?,
            atime: self.time()?,
            mtime: self.time()?,
            ctime: self.time()?,
        })
    }
}

/// NFSv2 `ftype`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Non,
    Reg,
    Dir,
    Blk,
    Chr,
    Lnk,
    Other(u32),
}

impl From<u32> for FileType {
    fn from(code: u32) -> Self {
        match code {
            0 => Self::Non,
            1 => Self::Reg,
            2 => Self::Dir,
            3 => Self::Blk,
            4 => Self::Chr,
            5 => Self::Lnk,
            other => Self::Other(other),
        }
    }
}

impl FileType {
    pub fn code(self) -> u32 {
        match self {
            Self::Non => 0,
            Self::Reg => 1,
            Self::Dir => 2,
            Self::Blk => 3,
            Self::Chr => 4,
            Self::Lnk => 5,
            Self::Other(code) => code,
        }
    }
}

impl From<FileType> for VnodeKind {
    fn from(ftype: FileType) -> Self {
        match ftype {
            FileType::Reg => VnodeKind::File,
            FileType::Dir => VnodeKind::Directory,
            _ => VnodeKind::Unknown,
        }
    }
}

/// File attributes (`fattr`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FAttr {
    pub ftype: FileType,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub blocksize: u32,
    pub rdev: u32,
    pub blocks: u32,
    pub fsid: u32,
    pub fileid: u32,
    pub atime: TimeVal,
    pub mtime: TimeVal,
    pub ctime: TimeVal,
}

impl FAttr {
    /// Minimal attributes for an object of `ftype` and `size`
    pub fn new(ftype: FileType, size: u32, fileid: u32) -> Self {
        Self {
            ftype,
            mode: 0o644,
            nlink: 1,
            uid: 0,
            gid: 0,
            size,
            blocksize: 4096,
            rdev: 0,
            blocks: size.div_ceil(512),
            fsid: 1,
            fileid,
            atime: TimeVal::default(),
            mtime: TimeVal::default(),
            ctime: TimeVal::default(),
        }
    }
}

impl XdrEncode for FAttr {
    fn encode(&self, buf: &mut BytesMut) -> Result<(), XdrError> {
        buf.put_u32(self.ftype.code());
        for word in [
            self.mode,
            self.nlink,
            self.uid,
            self.gid,
            self.size,
            self.blocksize,
            self.rdev,
            self.blocks,
            self.fsid,
            self.fileid,
        ] {
            buf.put_u32(word);
        }
        self.atime.encode(buf)?;
        self.mtime.encode(buf)?;
        self.ctime.encode(buf)
    }
}

/// Successful LOOKUP / CREATE / MKDIR result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirOpOk {
    pub file: FileHandle,
    pub attributes: FAttr,
}

/// Successful READ result; `data` borrows the response buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOk<'a> {
    pub attributes: FAttr,
    pub data: &'a [u8],
}

/// First entry of a READDIR result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry<'a> {
    pub fileid: u32,
    pub name: &'a [u8],
    /// Cookie that continues the listing after this entry
    pub cookie: u32,
}

/// `fhstatus`, the MNT result
pub fn decode_fhstatus(buf: &[u8]) -> Result<Reply<FileHandle>, XdrError> {
    let mut dec = XdrDecoder::new(buf);
    match dec.status()? {
        NfsStatus::Ok => Ok(Ok(dec.file_handle()?)),
        status => Ok(Err(status)),
    }
}

/// `diropres`
pub fn decode_diropres(buf: &[u8]) -> Result<Reply<DirOpOk>, XdrError> {
    let mut dec = XdrDecoder::new(buf);
    match dec.status()? {
        NfsStatus::Ok => Ok(Ok(DirOpOk {
            file: dec.file_handle()?,
            attributes: dec.fattr()?,
        })),
        status => Ok(Err(status)),
    }
}

/// `attrstat`
pub fn decode_attrstat(buf: &[u8]) -> Result<Reply<FAttr>, XdrError> {
    let mut dec = XdrDecoder::new(buf);
    match dec.status()? {
        NfsStatus::Ok => Ok(Ok(dec.fattr()?)),
        status => Ok(Err(status)),
    }
}

/// `readres`
pub fn decode_readres(buf: &[u8]) -> Result<Reply<ReadOk<'_>>, XdrError> {
    let mut dec = XdrDecoder::new(buf);
    match dec.status()? {
        NfsStatus::Ok => {
            let attributes = dec.fattr()?;
            let data = dec.opaque(NFS_MAXDATA)?;
            Ok(Ok(ReadOk { attributes, data }))
        }
        status => Ok(Err(status)),
    }
}

/// Bare `nfsstat`, the REMOVE / RMDIR result
pub fn decode_stat(buf: &[u8]) -> Result<NfsStatus, XdrError> {
    XdrDecoder::new(buf).status()
}

/// First entry of a `readdirres`; `None` when the listing is exhausted
///
/// Layout after the status word: a value-follows marker, then `fileid`,
/// the name length, the name padded to four bytes, then the entry cookie.
pub fn decode_readdir_first(buf: &[u8]) -> Result<Reply<Option<DirEntry<'_>>>, XdrError> {
    let mut dec = XdrDecoder::new(buf);
    let status = dec.status()?;
    if !status.is_ok() {
        return Ok(Err(status));
    }
    if !dec.bool()? {
        return Ok(Ok(None));
    }
    let fileid = dec.u32()?;
    let name = dec.opaque(MAXNAMLEN)?;
    let cookie = dec.u32()?;
    Ok(Ok(Some(DirEntry { fileid, name, cookie })))
}
