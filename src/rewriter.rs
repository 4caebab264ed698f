//! Repoint one reference occurrence to a different GUID.
//!
//! Only the 32 GUID characters inside the targeted match are replaced; the
//! surrounding `fileID`/`type` fields and every other byte of the document are
//! left untouched. Both entry points fail closed: a stale click target or an
//! externally edited document yields an error and no new text.

use crate::error::Error;
use crate::pattern;
use crate::types::{Guid, ReferenceOccurrence};

/// Check that `reference` still carries `expected` as its GUID field and
/// return the byte range of that GUID inside `reference`.
///
/// # Errors
///
/// Returns `Error::GuidMismatch` if the first GUID field differs or is absent.
fn locate_expected_guid(
    reference: &str,
    expected: &Guid,
) -> Result<std::ops::Range<usize>, Error> {
    let Some(found) = pattern::references(reference).next() else {
        return Err(Error::GuidMismatch {
            expected: expected.clone(),
            found: None,
        });
    };
    if found.guid != *expected {
        return Err(Error::GuidMismatch {
            expected: expected.clone(),
            found: Some(found.guid),
        });
    }
    let range = found.guid_range();
    let start = found.offset.saturating_add(range.start);
    let end = found.offset.saturating_add(range.end);
    return Ok(start..end);
}

/// Splice `new_guid` into `document` at the absolute byte range `guid_span`.
fn splice(document: &str, guid_span: std::ops::Range<usize>, new_guid: &Guid) -> Option<String> {
    let before = document.get(..guid_span.start)?;
    let after = document.get(guid_span.end..)?;
    let mut out = String::with_capacity(document.len());
    out.push_str(before);
    out.push_str(new_guid.as_str());
    out.push_str(after);
    return Some(out);
}

/// Content-addressed rewrite: repoint the first verbatim occurrence of
/// `original_match` in `document`.
///
/// When a document holds byte-identical reference blocks this always picks the
/// first one; use [`rewrite_at`] when the occurrence's offset is known.
///
/// # Errors
///
/// Returns `Error::GuidMismatch` if `original_match` does not hold
/// `expected_old`, or `Error::ReferenceNotFound` if it no longer occurs in
/// `document`.
pub fn rewrite(
    document: &str,
    original_match: &str,
    expected_old: &Guid,
    new_guid: &Guid,
) -> Result<String, Error> {
    let guid_in_match = locate_expected_guid(original_match, expected_old)?;
    let Some(position) = document.find(original_match) else {
        return Err(Error::ReferenceNotFound {
            reference: original_match.to_string(),
        });
    };

    let span = position.saturating_add(guid_in_match.start)..position.saturating_add(guid_in_match.end);
    return splice(document, span, new_guid).ok_or_else(|| {
        return Error::ReferenceNotFound {
            reference: original_match.to_string(),
        };
    });
}

/// Span-addressed rewrite: repoint exactly the occurrence found at
/// `occurrence.offset`, which must still hold `occurrence.full_match`.
///
/// # Errors
///
/// Returns `Error::GuidMismatch` if the occurrence does not hold
/// `expected_old`, or `Error::ReferenceNotFound` if the document bytes at the
/// recorded span no longer equal the recorded match.
pub fn rewrite_at(
    document: &str,
    occurrence: &ReferenceOccurrence,
    expected_old: &Guid,
    new_guid: &Guid,
) -> Result<String, Error> {
    let guid_in_match = locate_expected_guid(&occurrence.full_match, expected_old)?;
    let not_found = || {
        return Error::ReferenceNotFound {
            reference: occurrence.full_match.clone(),
        };
    };

    if document.get(occurrence.span()) != Some(occurrence.full_match.as_str()) {
        return Err(not_found());
    }

    let span = occurrence.offset.saturating_add(guid_in_match.start)
        ..occurrence.offset.saturating_add(guid_in_match.end);
    return splice(document, span, new_guid).ok_or_else(not_found);
}

#[cfg(test)]
mod tests {
    use super::*;

    const OLD: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";
    const NEW: &str = "BBBBBBBBBBBBBBBBBBBBBBBBBBBBBBBB";
    const OTHER: &str = "0123456789abcdef0123456789abcdef";

    fn guid(s: &str) -> Guid {
        return Guid::parse(s).unwrap();
    }

    fn sample() -> String {
        return format!(
            "MonoBehaviour:\n  m_Script: {{fileID: 11500000, guid: {OLD}, type: 3}}\n  m_Icon: guid: {OLD}\n"
        );
    }

    #[test]
    fn replaces_only_guid_field_of_target_occurrence() {
        let document = sample();
        let original = format!("{{fileID: 11500000, guid: {OLD}, type: 3}}");

        let rewritten = rewrite(&document, &original, &guid(OLD), &guid(NEW)).unwrap();

        assert_eq!(
            rewritten,
            format!(
                "MonoBehaviour:\n  m_Script: {{fileID: 11500000, guid: {NEW}, type: 3}}\n  m_Icon: guid: {OLD}\n"
            )
        );
    }

    #[test]
    fn expected_guid_compares_case_insensitively() {
        let document = sample();
        let original = format!("{{fileID: 11500000, guid: {OLD}, type: 3}}");
        let lower = guid(&OLD.to_ascii_lowercase());
        assert!(rewrite(&document, &original, &lower, &guid(NEW)).is_ok());
    }

    #[test]
    fn mismatched_guid_is_rejected() {
        let document = sample();
        let original = format!("{{fileID: 11500000, guid: {OLD}, type: 3}}");

        let err = rewrite(&document, &original, &guid(OTHER), &guid(NEW)).unwrap_err();
        assert!(matches!(err, Error::GuidMismatch { found: Some(ref f), .. } if *f == guid(OLD)));
    }

    #[test]
    fn match_without_guid_field_is_a_mismatch() {
        let err = rewrite("anything", "m_Name: Hero", &guid(OLD), &guid(NEW)).unwrap_err();
        assert!(matches!(err, Error::GuidMismatch { found: None, .. }));
    }

    #[test]
    fn vanished_reference_is_rejected() {
        let original = format!("{{fileID: 1, guid: {OLD}, type: 2}}");
        let document = format!("m_Script: {{fileID: 2, guid: {OLD}, type: 2}}\n");

        let err = rewrite(&document, &original, &guid(OLD), &guid(NEW)).unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { .. }));
    }

    #[test]
    fn rewriting_to_the_same_guid_is_byte_identical() {
        let document = format!(
            "a: {{fileID: 1, guid: {OLD}, type: 3}}\r\nb: guid: {OTHER}, type: 2\r\nc: guid: {OLD}\r\n"
        );
        for occurrence in pattern::references(&document) {
            let same = rewrite_at(&document, &occurrence, &occurrence.guid, &occurrence.guid).unwrap();
            assert_eq!(same, document);
            let same = rewrite(&document, &occurrence.full_match, &occurrence.guid, &occurrence.guid).unwrap();
            assert_eq!(same, document);
        }
    }

    #[test]
    fn span_rewrite_targets_the_second_identical_block() {
        let block = format!("{{fileID: 1, guid: {OLD}, type: 2}}");
        let document = format!("a: {block}\nb: {block}\n");
        let second = pattern::references(&document).nth(1).unwrap();

        let rewritten = rewrite_at(&document, &second, &guid(OLD), &guid(NEW)).unwrap();
        assert_eq!(
            rewritten,
            format!("a: {block}\nb: {{fileID: 1, guid: {NEW}, type: 2}}\n")
        );
    }

    #[test]
    fn span_rewrite_rejects_shifted_document() {
        let document = format!("a: {{fileID: 1, guid: {OLD}, type: 2}}\n");
        let occurrence = pattern::references(&document).next().unwrap();
        let edited = format!("# edited\n{document}");

        let err = rewrite_at(&edited, &occurrence, &guid(OLD), &guid(NEW)).unwrap_err();
        assert!(matches!(err, Error::ReferenceNotFound { .. }));
    }

    #[test]
    fn span_rewrite_checks_guid_before_position() {
        let document = format!("a: guid: {OLD}\n");
        let occurrence = pattern::references(&document).next().unwrap();

        let err = rewrite_at("", &occurrence, &guid(OTHER), &guid(NEW)).unwrap_err();
        assert!(matches!(err, Error::GuidMismatch { .. }));
    }
}
