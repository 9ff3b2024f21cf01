//! Typed wrappers around [`crate::digest::Digest`] so tree digests and
//! commit digests can't be accidentally swapped at a call site.

use std::fmt;

use crate::digest::Digest;

pub trait ObjectId {
    fn object_type(&self) -> &'static str;
    fn digest(&self) -> &Digest;
}

/// Defines a newtype wrapping a [`Digest`], with `Debug`/`Display` printing
/// its hex form and an `object_type()` tag used in object-store headers.
macro_rules! id_type {
    ($(#[$attr:meta])* $vis:vis $name:ident, $object_type:literal) => {
        $(#[$attr])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name(Digest);

        impl $name {
            pub fn new(digest: Digest) -> Self {
                Self(digest)
            }

            pub fn from_bytes(bytes: &[u8]) -> Self {
                Self(Digest::from_bytes(bytes))
            }

            pub fn try_from_hex(hex: impl AsRef<[u8]>) -> Option<Self> {
                Digest::try_from_hex(hex).map(Self)
            }

            pub fn hex(&self) -> String {
                self.0.hex()
            }
        }

        impl $crate::object_id::ObjectId for $name {
            fn object_type(&self) -> &'static str {
                $object_type
            }

            fn digest(&self) -> &Digest {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.hex()).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(&self.hex())
            }
        }

        impl From<Digest> for $name {
            fn from(digest: Digest) -> Self {
                Self(digest)
            }
        }
    };
}

id_type!(
    /// Identifies a [`crate::tree::Tree`] object in the object store.
    pub TreeId, "tree"
);

id_type!(
    /// Identifies a [`crate::commit::Commit`] object in the object store.
    pub CommitId, "commit"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_hex() {
        let id = TreeId::from_bytes(b"abc");
        assert_eq!(id.to_string(), id.hex());
    }
}
