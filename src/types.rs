/// Core domain types for guidref: GUIDs, reference occurrences, and resources.
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// Number of hex characters in a Unity GUID.
pub const GUID_LEN: usize = 32;

/// A Unity GUID: exactly 32 hex chars, in whatever case the file used.
/// Equality and hashing ignore case; the original spelling is kept for output.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(transparent)]
pub struct Guid(
    /// The GUID text as it appeared in the source.
    String,
);

impl Guid {
    /// The GUID exactly as written in the source text.
    pub fn as_str(&self) -> &str {
        return &self.0;
    }

    /// Validate and wrap a GUID string. Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidGuid` unless the value is exactly 32 hex characters.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let trimmed = value.trim();
        if trimmed.len() != GUID_LEN || !trimmed.bytes().all(|b| return b.is_ascii_hexdigit()) {
            return Err(Error::InvalidGuid {
                value: value.to_string(),
            });
        }
        return Ok(Self(trimmed.to_string()));
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

impl FromStr for Guid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return Self::parse(s);
    }
}

impl Hash for Guid {
    /// Hash the lowercase form so that equal GUIDs in different case collide.
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl PartialEq for Guid {
    fn eq(&self, other: &Self) -> bool {
        return self.0.eq_ignore_ascii_case(&other.0);
    }
}

impl Eq for Guid {}

/// One concrete textual appearance of a GUID reference in a document.
/// Recomputed on every render; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceOccurrence {
    /// The verbatim matched substring.
    pub full_match: String,
    /// GUID value inside the match, case preserved.
    pub guid: Guid,
    /// Byte offset of the GUID inside `full_match`.
    pub guid_offset: usize,
    /// Byte offset of `full_match` in the document.
    pub offset: usize,
    /// Which syntactic form matched.
    pub shape: ReferenceShape,
}

impl ReferenceOccurrence {
    /// Byte range of the GUID relative to the start of `full_match`.
    pub fn guid_range(&self) -> Range<usize> {
        return self.guid_offset..self.guid_offset.saturating_add(GUID_LEN);
    }

    /// Byte range of the whole match in the document.
    pub fn span(&self) -> Range<usize> {
        return self.offset..self.offset.saturating_add(self.full_match.len());
    }
}

/// Surface syntax a reference was written in. Ordered from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceShape {
    /// `guid: <guid>` with nothing else.
    GuidOnly,
    /// `guid: <guid>, type: <int>` without braces.
    GuidType,
    /// `{fileID: <int>, guid: <guid>, type: <int>}`.
    ObjectRef,
}

impl ReferenceShape {
    /// Short label for text output.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::GuidOnly => "guid",
            Self::GuidType => "guid+type",
            Self::ObjectRef => "object",
        };
    }
}

/// A project resource as described by its `.meta` file.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResourceDescriptor {
    /// Resource file name, i.e. the meta file name without `.meta`.
    pub display_name: String,
    /// GUID declared in the meta file.
    pub guid: Guid,
    /// Path of the `.meta` file.
    pub path: PathBuf,
}

/// Kind of Unity text resource guidref is willing to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// A `.asset` file (`ScriptableObject`, material, etc).
    Asset,
    /// A `.prefab` file.
    Prefab,
}

impl ResourceKind {
    /// Classify a path by extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        return match ext.as_str() {
            "asset" => Some(Self::Asset),
            "prefab" => Some(Self::Prefab),
            _ => None,
        };
    }

    /// Human label shown in headers.
    pub const fn label(self) -> &'static str {
        return match self {
            Self::Asset => "Asset",
            Self::Prefab => "Prefab",
        };
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn guid_equality_ignores_case_but_keeps_spelling() {
        let upper = Guid::parse("ABCDEF0123456789ABCDEF0123456789").unwrap();
        let lower = Guid::parse("abcdef0123456789abcdef0123456789").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "ABCDEF0123456789ABCDEF0123456789");

        let set: HashSet<Guid> = [upper, lower].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn guid_rejects_wrong_length_and_non_hex() {
        assert!(Guid::parse("abcdef0123456789abcdef012345678").is_err());
        assert!(Guid::parse("abcdef0123456789abcdef01234567890").is_err());
        assert!(Guid::parse("zbcdef0123456789abcdef0123456789").is_err());
    }

    #[test]
    fn resource_kind_from_extension() {
        assert_eq!(ResourceKind::from_path(Path::new("a/B.PREFAB")), Some(ResourceKind::Prefab));
        assert_eq!(ResourceKind::from_path(Path::new("Data.asset")), Some(ResourceKind::Asset));
        assert_eq!(ResourceKind::from_path(Path::new("Script.cs")), None);
    }
}
