//! Archive fixtures for the workspace tests and benchmarks.
//!
//! Builds single-disk archives in memory, with hooks to produce the broken
//! and unsupported shapes the readers must reject.

use crc::{CRC_32_ISO_HDLC, Crc};

pub const METHOD_STORED: u16 = 0;
pub const METHOD_DEFLATE: u16 = 8;
pub const METHOD_BZIP2: u16 = 12;
pub const FLAG_ENCRYPTED: u16 = 1 << 0;

/// Size of a local file header without name and extra field.
pub const LOCAL_HEADER_SIZE: usize = 30;

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// One archive member. Payloads are compressed according to the method;
/// any method other than deflate stores the data as is.
#[derive(Debug, Clone)]
pub struct Member<'a> {
    name: &'a str,
    data: &'a [u8],
    method: u16,
    flags: u16,
    crc: Option<u32>,
    size: Option<u32>,
}

impl<'a> Member<'a> {
    pub fn stored(name: &'a str, data: &'a [u8]) -> Self {
        Member {
            name,
            data,
            method: METHOD_STORED,
            flags: 0,
            crc: None,
            size: None,
        }
    }

    pub fn deflated(name: &'a str, data: &'a [u8]) -> Self {
        Member {
            method: METHOD_DEFLATE,
            ..Member::stored(name, data)
        }
    }

    /// Directory entry, named with a trailing slash.
    pub fn dir(name: &'a str) -> Self {
        Member::stored(name, b"")
    }

    /// Records `method` in the headers without compressing the data.
    pub fn method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    /// Records `crc` instead of the checksum of the data.
    pub fn crc(mut self, crc: u32) -> Self {
        self.crc = Some(crc);
        self
    }

    /// Records `size` as the uncompressed size instead of the data length.
    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }
}

#[derive(Debug, Default)]
pub struct ZipBuilder {
    out: Vec<u8>,
    central: Vec<u8>,
    count: u16,
    comment: Vec<u8>,
}

fn put16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn put32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.member(Member::stored(name, data))
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        self.member(Member::deflated(name, data))
    }

    pub fn member(mut self, member: Member<'_>) -> Self {
        let payload = if member.method == METHOD_DEFLATE {
            miniz_oxide::deflate::compress_to_vec(member.data, 6)
        } else {
            member.data.to_vec()
        };
        let crc = member.crc.unwrap_or_else(|| CRC32.checksum(member.data));
        let size = member.size.unwrap_or(member.data.len() as u32);
        let offset = self.out.len() as u32;

        // fields shared by the local and central headers
        let mut fields = Vec::with_capacity(24);
        put16(&mut fields, member.flags);
        put16(&mut fields, member.method);
        put32(&mut fields, 0); // time, date
        put32(&mut fields, crc);
        put32(&mut fields, payload.len() as u32);
        put32(&mut fields, size);
        put16(&mut fields, member.name.len() as u16);
        put16(&mut fields, 0); // extra

        put32(&mut self.out, 0x04034b50);
        put16(&mut self.out, 20);
        self.out.extend_from_slice(&fields);
        self.out.extend_from_slice(member.name.as_bytes());
        self.out.extend_from_slice(&payload);

        put32(&mut self.central, 0x02014b50);
        put16(&mut self.central, 20);
        put16(&mut self.central, 20);
        self.central.extend_from_slice(&fields);
        put16(&mut self.central, 0); // comment
        put16(&mut self.central, 0); // disk
        put16(&mut self.central, 0); // internal attributes
        put32(&mut self.central, 0); // external attributes
        put32(&mut self.central, offset);
        self.central.extend_from_slice(member.name.as_bytes());

        self.count += 1;
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = self.out;
        let central_offset = out.len() as u32;
        out.extend_from_slice(&self.central);
        put32(&mut out, 0x06054b50);
        put16(&mut out, 0);
        put16(&mut out, 0);
        put16(&mut out, self.count);
        put16(&mut out, self.count);
        put32(&mut out, self.central.len() as u32);
        put32(&mut out, central_offset);
        put16(&mut out, self.comment.len() as u16);
        out.extend_from_slice(&self.comment);
        out
    }
}

/// Text that deflates well but still needs back references across the
/// whole window.
pub fn mesh_text(size: usize) -> Vec<u8> {
    (0u32..)
        .flat_map(|i| format!("v {} {} {}\n", i % 7, i % 11, i * 31 % 97).into_bytes())
        .take(size)
        .collect()
}
