//! Canonical serialization helpers shared by [`crate::tree`] and
//! [`crate::commit`].
//!
//! The template derives its wire format from a `ContentHash` proc-macro
//! backed by protobuf; sod has no protobuf dependency and a much smaller,
//! fixed set of object kinds, so canonical encoding is hand-rolled instead:
//! every variable-length field is length-prefixed with a 4-byte big-endian
//! count, so two encodings are byte-identical iff the encoded values are
//! equal (spec.md §8 invariant 2).

use std::io;
use std::io::Write as _;

/// Writes `bytes` prefixed with its length as a 4-byte big-endian integer.
pub fn write_framed(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

pub fn write_u8(out: &mut Vec<u8>, value: u8) {
    out.push(value);
}

pub fn write_i64(out: &mut Vec<u8>, value: i64) {
    out.extend_from_slice(&value.to_be_bytes());
}

/// Minimal cursor-style reader for the frames written above. Returns `None`
/// on truncated/malformed input, which callers turn into
/// `ObjectStoreCorruption`.
pub struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_framed(&mut self) -> Option<&'a [u8]> {
        let len = self.read_u32()? as usize;
        let bytes = self.data.get(self.pos..self.pos + len)?;
        self.pos += len;
        Some(bytes)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(self.pos..self.pos + 4)?.try_into().ok()?;
        self.pos += 4;
        Some(u32::from_be_bytes(bytes))
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let b = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    pub fn read_i64(&mut self) -> Option<i64> {
        let bytes: [u8; 8] = self.data.get(self.pos..self.pos + 8)?.try_into().ok()?;
        self.pos += 8;
        Some(i64::from_be_bytes(bytes))
    }

    pub fn at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}

/// Writes `body` prefixed with a plain-text object-kind header, matching
/// the on-disk object format of spec.md §4.C: "a short header naming its
/// kind (`tree` | `commit`), then the canonical body".
pub fn write_object_header(mut out: impl io::Write, kind: &str, body: &[u8]) -> io::Result<()> {
    writeln!(out, "{kind}")?;
    out.write_all(body)
}

/// Splits a stored object's bytes into its kind header and body.
pub fn read_object_header(data: &[u8]) -> Option<(&str, &[u8])> {
    let newline = data.iter().position(|&b| b == b'\n')?;
    let kind = std::str::from_utf8(&data[..newline]).ok()?;
    Some((kind, &data[newline + 1..]))
}
