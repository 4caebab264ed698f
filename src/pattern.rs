//! Recognise GUID references in Unity YAML text.
//!
//! Three shapes are understood, tried in order of specificity at each
//! position: the braced object `{fileID: F, guid: G, type: T}`, the unbraced
//! `guid: G, type: T`, and a bare `guid: G`. A looser shape is always a
//! substring of a stricter one, so alternation order decides the winner.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::{Guid, ReferenceOccurrence, ReferenceShape};

/// Compiled once; shared by the rayon workers that read `.meta` files.
#[allow(clippy::expect_used, reason = "hardcoded pattern is a compile-time invariant")]
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(concat!(
        r"\{\s*fileID:\s*-?\d+\s*,\s*guid:\s*(?P<object>[0-9a-fA-F]{32})\b\s*,\s*type:\s*-?\d+\s*\}",
        r"|guid:\s*(?P<typed>[0-9a-fA-F]{32})\b\s*,\s*type:\s*-?\d+",
        r"|guid:\s*(?P<bare>[0-9a-fA-F]{32})\b",
    ))
    .expect("valid regex");
});

/// GUID of the first `guid:` field in `text`, whatever shape surrounds it.
/// Meta files declare their own GUID this way.
pub fn first_guid(text: &str) -> Option<Guid> {
    return references(text).next().map(|occurrence| return occurrence.guid);
}

/// Find the occurrence whose match starts exactly at `offset`.
pub fn occurrence_at(text: &str, offset: usize) -> Option<ReferenceOccurrence> {
    return references(text)
        .take_while(|occurrence| return occurrence.offset <= offset)
        .find(|occurrence| return occurrence.offset == offset);
}

/// Build an occurrence from one regex match, picking the shape by which group fired.
fn occurrence_from_captures(caps: &Captures<'_>) -> Option<ReferenceOccurrence> {
    let whole = caps.get(0)?;
    let (shape, guid_match) = if let Some(m) = caps.name("object") {
        (ReferenceShape::ObjectRef, m)
    } else if let Some(m) = caps.name("typed") {
        (ReferenceShape::GuidType, m)
    } else {
        (ReferenceShape::GuidOnly, caps.name("bare")?)
    };

    let guid = Guid::parse(guid_match.as_str()).ok()?;
    let guid_offset = guid_match.start().checked_sub(whole.start())?;

    return Some(ReferenceOccurrence {
        full_match: whole.as_str().to_string(),
        guid,
        guid_offset,
        offset: whole.start(),
        shape,
    });
}

/// Lazily yield every reference occurrence in document order.
/// Calling again on the same text yields the same sequence.
pub fn references(text: &str) -> impl Iterator<Item = ReferenceOccurrence> + '_ {
    return REFERENCE_PATTERN
        .captures_iter(text)
        .filter_map(|caps| return occurrence_from_captures(&caps));
}
