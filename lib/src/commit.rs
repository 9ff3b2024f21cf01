//! Commit objects (spec.md §3: `{ tree-digest, parent-digest, author-name,
//! timestamp, message }`), canonically serialized the same way as trees.

use chrono::DateTime;
use chrono::FixedOffset;
use thiserror::Error;

use crate::canonical::FrameReader;
use crate::canonical::write_framed;
use crate::canonical::write_i64;
use crate::digest::hash_bytes;
use crate::object_id::CommitId;
use crate::object_id::TreeId;

#[derive(Debug, Error)]
pub enum CommitError {
    #[error("corrupt commit object: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree_id: TreeId,
    pub parent_id: Option<CommitId>,
    pub author_name: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
}

impl Commit {
    /// Canonical encoding: framed tree id, a presence byte plus optional
    /// framed parent id, framed author name, an 8-byte big-endian UTC
    /// millisecond timestamp, a 4-byte signed UTC-offset in seconds, and a
    /// framed message.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_framed(&mut out, self.tree_id.digest().as_bytes());
        match &self.parent_id {
            Some(parent) => {
                out.push(1);
                write_framed(&mut out, parent.digest().as_bytes());
            }
            None => out.push(0),
        }
        write_framed(&mut out, self.author_name.as_bytes());
        write_i64(&mut out, self.timestamp.timestamp_millis());
        write_i64(&mut out, i64::from(self.timestamp.offset().local_minus_utc()));
        write_framed(&mut out, self.message.as_bytes());
        out
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, CommitError> {
        let mut reader = FrameReader::new(data);
        let tree_bytes = reader
            .read_framed()
            .ok_or_else(|| CommitError::Malformed("missing tree id".into()))?;
        let tree_id = TreeId::from_bytes(tree_bytes);

        let has_parent = reader
            .read_u8()
            .ok_or_else(|| CommitError::Malformed("missing parent marker".into()))?;
        let parent_id = match has_parent {
            0 => None,
            1 => {
                let bytes = reader
                    .read_framed()
                    .ok_or_else(|| CommitError::Malformed("missing parent id".into()))?;
                Some(CommitId::from_bytes(bytes))
            }
            other => return Err(CommitError::Malformed(format!("bad parent marker {other}"))),
        };

        let author_bytes = reader
            .read_framed()
            .ok_or_else(|| CommitError::Malformed("missing author name".into()))?;
        let author_name = String::from_utf8(author_bytes.to_vec())
            .map_err(|e| CommitError::Malformed(e.to_string()))?;

        let millis = reader
            .read_i64()
            .ok_or_else(|| CommitError::Malformed("missing timestamp".into()))?;
        let offset_secs = reader
            .read_i64()
            .ok_or_else(|| CommitError::Malformed("missing utc offset".into()))?;
        let offset = FixedOffset::east_opt(offset_secs as i32)
            .ok_or_else(|| CommitError::Malformed("invalid utc offset".into()))?;
        let timestamp = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| CommitError::Malformed("invalid timestamp".into()))?
            .with_timezone(&offset);

        let message_bytes = reader
            .read_framed()
            .ok_or_else(|| CommitError::Malformed("missing message".into()))?;
        let message = String::from_utf8(message_bytes.to_vec())
            .map_err(|e| CommitError::Malformed(e.to_string()))?;

        if !reader.at_end() {
            return Err(CommitError::Malformed("trailing bytes after commit body".into()));
        }

        Ok(Self { tree_id, parent_id, author_name, timestamp, message })
    }

    pub fn digest_id(&self) -> CommitId {
        CommitId::new(hash_bytes(&self.serialize()))
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::hash_bytes;

    fn sample(message: &str) -> Commit {
        Commit {
            tree_id: TreeId::new(hash_bytes(b"tree")),
            parent_id: None,
            author_name: "jane".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2026-07-30T12:00:00+00:00").unwrap(),
            message: message.to_string(),
        }
    }

    #[test]
    fn serialize_roundtrips() {
        let c = sample("initial commit");
        let decoded = Commit::deserialize(&c.serialize()).unwrap();
        assert_eq!(c, decoded);
    }

    #[test]
    fn distinct_messages_yield_distinct_digests() {
        let a = sample("a");
        let b = sample("b");
        assert_ne!(a.digest_id(), b.digest_id());
    }

    #[test]
    fn parent_chain_is_encoded() {
        let mut child = sample("child");
        child.parent_id = Some(CommitId::new(hash_bytes(b"parent")));
        let decoded = Commit::deserialize(&child.serialize()).unwrap();
        assert!(!decoded.is_root());
        assert_eq!(decoded.parent_id, child.parent_id);
    }
}
