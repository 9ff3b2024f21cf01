//! The digest primitive (component A): a fixed-width content fingerprint
//! computed from a byte stream, with lowercase-hex display and "abbreviated"
//! prefix support.

use std::fmt;
use std::io;
use std::io::Read;

use blake2::Blake2b512;
use blake2::Digest as _;

use crate::hex_util;

/// Block size used when streaming file contents into the hasher. Chosen to
/// balance syscall count against peak memory for very large media files.
const HASH_BLOCK_SIZE: usize = 16 << 10;

/// The repository-wide hash algorithm identifier, persisted in
/// `.sod/config` as `core.hashAlgo`. Sod supports exactly one algorithm;
/// changing it for an existing repository is unsupported (spec.md §4.A).
pub const HASH_ALGO_NAME: &str = "blake2b512";

/// A fixed-width content digest. Two files (or two canonical serializations)
/// with equal digests are treated as identical content.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Digest(Vec<u8>);

impl Digest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The all-zero digest, used as the "old digest" placeholder for pure
    /// additions in raw diff output (spec.md §4.G).
    pub fn zero(len: usize) -> Self {
        Self(vec![0; len])
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    pub fn hex(&self) -> String {
        hex_util::encode_hex(&self.0)
    }

    pub fn try_from_hex(hex: impl AsRef<[u8]>) -> Option<Self> {
        hex_util::decode_hex(hex).map(Self)
    }

    /// Length, in hex nibbles, of the shortest prefix of `self` not shared
    /// with `other`. Used to compute abbreviated digests (spec.md §3).
    pub fn divergent_hex_len(&self, other: &Self) -> usize {
        hex_util::common_hex_len(&self.0, &other.0) + 1
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex())
    }
}

/// Streaming hasher over the repository's configured algorithm.
pub struct Hasher(Blake2b512);

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    pub fn new() -> Self {
        Self(Blake2b512::new())
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    pub fn finish(self) -> Digest {
        Digest(self.0.finalize().to_vec())
    }
}

/// Hashes the bytes yielded by `reader`, reading in fixed-size blocks.
pub fn hash_reader(mut reader: impl Read) -> io::Result<Digest> {
    let mut hasher = Hasher::new();
    let mut buf = vec![0u8; HASH_BLOCK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finish())
}

/// Hashes a byte slice directly (used for symlink targets, and canonical
/// tree/commit serializations).
pub fn hash_bytes(bytes: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finish()
}

/// Shortest unique hex prefix of `id` among `others`, no narrower than
/// `min_width` hex digits (spec.md §3: "minimum display width 10").
pub fn abbreviate(id: &Digest, others: impl IntoIterator<Item = Digest>, min_width: usize) -> String {
    let mut longest_shared = 0;
    for other in others {
        if &other == id {
            continue;
        }
        longest_shared = longest_shared.max(id.divergent_hex_len(&other).saturating_sub(1));
    }
    let width = (longest_shared + 1).max(min_width);
    let hex = id.hex();
    hex[..width.min(hex.len())].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_reader_matches_hash_bytes() {
        let data = b"hello world".repeat(10_000);
        let a = hash_bytes(&data);
        let b = hash_reader(io::Cursor::new(&data)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn digest_roundtrips_through_hex() {
        let d = hash_bytes(b"hello");
        let hex = d.hex();
        let parsed = Digest::try_from_hex(&hex).unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn abbreviate_respects_minimum_width() {
        let a = hash_bytes(b"a");
        let b = hash_bytes(b"b");
        let abbrev = abbreviate(&a, vec![b], 10);
        assert_eq!(abbrev.len(), 10);
        assert!(a.hex().starts_with(&abbrev));
    }

    #[test]
    fn abbreviate_grows_to_disambiguate() {
        // Two digests sharing a long common hex prefix by construction.
        let a = Digest(vec![0x12, 0x34, 0x56, 0x00]);
        let b = Digest(vec![0x12, 0x34, 0x56, 0xff]);
        let abbrev = abbreviate(&a, vec![b.clone()], 1);
        assert!(abbrev.len() > 1);
        assert!(a.hex().starts_with(&abbrev));
        assert!(!b.hex().starts_with(&abbrev));
    }
}
