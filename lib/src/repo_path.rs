//! Repository-relative paths (module B). Paths are `/`-separated byte
//! strings, independent of host path conventions, and are not required to
//! be valid UTF-8 — mirroring the template's own repo-path module, but
//! collapsed to a single owned type since sod never needs borrowed path
//! slices cheap enough to warrant a ref-cast pair.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use bstr::BStr;
use bstr::BString;
use bstr::ByteSlice as _;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoPathError {
    #[error("path escapes the repository root: {0}")]
    EscapesRoot(String),
    #[error("path component `.` or `..` is not allowed: {0}")]
    DotComponent(String),
    #[error("path has a trailing or leading slash: {0}")]
    ExtraSlash(String),
}

/// A repository-relative path, stored internally as a `/`-separated byte
/// string with no leading or trailing slash and no `.`/`..` components.
/// The empty path denotes the repository root.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RepoPathBuf(BString);

impl RepoPathBuf {
    pub fn root() -> Self {
        Self(BString::from(""))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a `/`-separated, repo-relative path. Rejects absolute paths,
    /// `.`/`..` components, and doubled separators.
    pub fn parse(value: impl AsRef<[u8]>) -> Result<Self, RepoPathError> {
        let value = value.as_ref();
        let as_str = String::from_utf8_lossy(value).into_owned();
        if value.is_empty() {
            return Ok(Self::root());
        }
        if value.starts_with(b"/") || value.ends_with(b"/") {
            return Err(RepoPathError::ExtraSlash(as_str));
        }
        for component in value.split(|&b| b == b'/') {
            if component.is_empty() {
                return Err(RepoPathError::ExtraSlash(as_str));
            }
            if component == b"." || component == b".." {
                return Err(RepoPathError::DotComponent(as_str));
            }
        }
        Ok(Self(BString::from(value)))
    }

    /// Builds a `RepoPathBuf` from a filesystem path taken relative to
    /// `root`, converting the host separator to `/` and rejecting any path
    /// that climbs outside `root`.
    pub fn from_fs_path(root: &Path, fs_path: &Path) -> Result<Self, RepoPathError> {
        let relative = fs_path.strip_prefix(root).map_err(|_| {
            RepoPathError::EscapesRoot(fs_path.to_string_lossy().into_owned())
        })?;
        let mut components = Vec::new();
        for component in relative.components() {
            use std::path::Component;
            match component {
                Component::Normal(part) => components.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(RepoPathError::EscapesRoot(
                        fs_path.to_string_lossy().into_owned(),
                    ));
                }
            }
        }
        Self::parse(components.join("/"))
    }

    pub fn join(&self, component: &str) -> Self {
        if self.is_root() {
            Self(BString::from(component))
        } else {
            let mut buf = self.0.clone();
            buf.push(b'/');
            buf.extend_from_slice(component.as_bytes());
            Self(buf)
        }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind_byte(b'/') {
            Some(idx) => Some(Self(self.0[..idx].into())),
            None => Some(Self::root()),
        }
    }

    pub fn components(&self) -> impl Iterator<Item = &BStr> {
        self.0.split_str("/").filter(|c| !c.is_empty()).map(BStr::new)
    }

    pub fn file_name(&self) -> Option<&BStr> {
        self.components().next_back()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_internal_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        self.0.to_str_lossy()
    }

    /// Converts to a host filesystem path rooted at `root`.
    pub fn to_fs_path(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for component in self.components() {
            path.push(component.to_str_lossy().as_ref());
        }
        path
    }

    /// True if `self` is `other` or a descendant of `other`.
    pub fn starts_with(&self, other: &Self) -> bool {
        if other.is_root() {
            return true;
        }
        self.0 == other.0
            || (self.0.starts_with(other.0.as_slice()) && self.0.get(other.0.len()) == Some(&b'/'))
    }
}

impl fmt::Debug for RepoPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoPathBuf({:?})", self.0)
    }
}

impl fmt::Display for RepoPathBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_str_lossy())
    }
}

impl serde::Serialize for RepoPathBuf {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_internal_str_lossy())
    }
}

impl<'de> serde::Deserialize<'de> for RepoPathBuf {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_dot_components() {
        assert!(RepoPathBuf::parse("a/../b").is_err());
        assert!(RepoPathBuf::parse("./a").is_err());
    }

    #[test]
    fn parse_rejects_extra_slashes() {
        assert!(RepoPathBuf::parse("/a/b").is_err());
        assert!(RepoPathBuf::parse("a/b/").is_err());
        assert!(RepoPathBuf::parse("a//b").is_err());
    }

    #[test]
    fn join_and_parent_roundtrip() {
        let root = RepoPathBuf::root();
        let a = root.join("a");
        let ab = a.join("b");
        assert_eq!(ab.to_string(), "a/b");
        assert_eq!(ab.parent().unwrap(), a);
        assert_eq!(a.parent().unwrap(), root);
    }

    #[test]
    fn starts_with_is_component_aware() {
        let dir = RepoPathBuf::parse("dir1").unwrap();
        let sibling = RepoPathBuf::parse("dir10/x").unwrap();
        let child = RepoPathBuf::parse("dir1/x").unwrap();
        assert!(child.starts_with(&dir));
        assert!(!sibling.starts_with(&dir));
    }

    #[test]
    fn ordering_is_byte_wise() {
        let mut paths = vec![
            RepoPathBuf::parse("b").unwrap(),
            RepoPathBuf::parse("a").unwrap(),
            RepoPathBuf::parse("a/b").unwrap(),
        ];
        paths.sort();
        assert_eq!(paths[0].to_string(), "a");
        assert_eq!(paths[1].to_string(), "a/b");
        assert_eq!(paths[2].to_string(), "b");
    }
}
