//! The tree data model (module C's data side): an ordered, canonically
//! serialized listing of named entries, each a file or a nested tree
//! (spec.md §3 — `TreeEntry`/`Tree`).

use thiserror::Error;

use crate::canonical::FrameReader;
use crate::canonical::write_framed;
use crate::canonical::write_u32;
use crate::canonical::write_u8;
use crate::digest::Digest;
use crate::digest::hash_bytes;
use crate::object_id::TreeId;

/// Unix-style permission bits, the only mode metadata sod tracks. The
/// executable bit is the one bit that matters to the differ and to
/// restore (spec.md's rename pairing requires "digest and mode-bits
/// equal").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ModeBits(pub u32);

impl ModeBits {
    pub const REGULAR: Self = Self(0o644);
    pub const EXECUTABLE: Self = Self(0o755);

    pub fn is_executable(self) -> bool {
        self.0 & 0o111 != 0
    }

    pub fn from_executable(executable: bool) -> Self {
        if executable { Self::EXECUTABLE } else { Self::REGULAR }
    }
}

/// What a [`TreeEntry`] points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeValue {
    File { digest: Digest, mode: ModeBits },
    Tree { id: TreeId },
}

/// One named child of a [`Tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub value: TreeValue,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        matches!(self.value, TreeValue::Tree { .. })
    }
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("corrupt tree object: {0}")]
    Malformed(String),
}

/// An ordered list of [`TreeEntry`] sorted by name, byte-wise ascending.
/// Serialization is canonical: equal entry sets always yield identical
/// bytes (spec.md §8 invariant 2), which is what lets tree digests be
/// used as equality tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Builds a tree from arbitrarily ordered entries, sorting them into
    /// canonical order. Panics (a programmer error, not a user error) if
    /// two entries share a name.
    pub fn from_entries(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        for pair in entries.windows(2) {
            assert_ne!(pair[0].name, pair[1].name, "duplicate tree entry name");
        }
        Self { entries }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries
            .binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical byte encoding: for each entry (in sorted order) a framed
    /// name, a one-byte kind tag, and either a framed content digest plus
    /// mode, or a framed tree id.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_u32(&mut out, self.entries.len() as u32);
        for entry in &self.entries {
            write_framed(&mut out, entry.name.as_bytes());
            match &entry.value {
                TreeValue::File { digest, mode } => {
                    write_u8(&mut out, 0);
                    write_framed(&mut out, digest.as_bytes());
                    write_u32(&mut out, mode.0);
                }
                TreeValue::Tree { id } => {
                    write_u8(&mut out, 1);
                    write_framed(&mut out, id.digest().as_bytes());
                }
            }
        }
        out
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, TreeError> {
        let mut reader = FrameReader::new(data);
        let count = reader
            .read_u32()
            .ok_or_else(|| TreeError::Malformed("missing entry count".into()))?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = reader
                .read_framed()
                .ok_or_else(|| TreeError::Malformed("missing entry name".into()))?;
            let name = String::from_utf8(name.to_vec())
                .map_err(|e| TreeError::Malformed(e.to_string()))?;
            let kind = reader
                .read_u8()
                .ok_or_else(|| TreeError::Malformed("missing entry kind".into()))?;
            let value = match kind {
                0 => {
                    let digest = reader
                        .read_framed()
                        .ok_or_else(|| TreeError::Malformed("missing file digest".into()))?;
                    let mode = reader
                        .read_u32()
                        .ok_or_else(|| TreeError::Malformed("missing mode bits".into()))?;
                    TreeValue::File { digest: Digest::from_bytes(digest), mode: ModeBits(mode) }
                }
                1 => {
                    let id = reader
                        .read_framed()
                        .ok_or_else(|| TreeError::Malformed("missing tree id".into()))?;
                    TreeValue::Tree { id: TreeId::from_bytes(id) }
                }
                other => return Err(TreeError::Malformed(format!("unknown entry kind {other}"))),
            };
            entries.push(TreeEntry { name, value });
        }
        if !reader.at_end() {
            return Err(TreeError::Malformed("trailing bytes after tree body".into()));
        }
        Ok(Self { entries })
    }

    pub fn digest(&self) -> Digest {
        hash_bytes(&self.serialize())
    }
}
