//! Presentation of a session view: annotated text for terminals, JSON for
//! editor hosts. Every reference is addressed by its byte offset, which is
//! what `repoint --at` takes back.

use std::fmt::Write as _;

use serde::Serialize;

use crate::session::{Document, View};
use crate::types::{Guid, ReferenceShape};

/// Placeholder when the document has no readable `.meta`.
const GUID_NOT_FOUND: &str = "GUID not found";

/// JSON document for `show --format json`.
#[derive(Serialize)]
struct DocumentJson<'a> {
    file: String,
    kind: &'static str,
    main_guid: Option<&'a Guid>,
    references: Vec<ReferenceJson<'a>>,
    unresolved: Vec<&'a Guid>,
}

/// One reference in JSON output.
#[derive(Serialize)]
struct ReferenceJson<'a> {
    full_match: &'a str,
    guid: &'a Guid,
    index: usize,
    line: usize,
    offset: usize,
    resource: Option<&'a str>,
    shape: ReferenceShape,
}

/// 1-based line number of each offset. `offsets` must be ascending.
fn line_numbers(text: &str, offsets: impl Iterator<Item = usize>) -> Vec<usize> {
    let mut lines = Vec::new();
    let mut line = 1_usize;
    let mut scanned = 0_usize;
    for offset in offsets {
        let upto = offset.min(text.len());
        if let Some(chunk) = text.get(scanned..upto) {
            line = line.saturating_add(chunk.matches('\n').count());
            scanned = upto;
        }
        lines.push(line);
    }
    return lines;
}

/// Serialize the view as pretty JSON.
///
/// # Errors
///
/// Returns `Error::Json` if serialization fails.
pub fn to_json(document: &Document, view: &View) -> Result<String, crate::error::Error> {
    let lines = line_numbers(&document.text, view.occurrences.iter().map(|o| return o.offset));
    let references = view
        .occurrences
        .iter()
        .zip(lines)
        .enumerate()
        .map(|(i, (occurrence, line))| {
            return ReferenceJson {
                full_match: &occurrence.full_match,
                guid: &occurrence.guid,
                index: i.saturating_add(1),
                line,
                offset: occurrence.offset,
                resource: view.resolution.name_of(&occurrence.guid),
                shape: occurrence.shape,
            };
        })
        .collect();

    let json = DocumentJson {
        file: document.path.display().to_string(),
        kind: document.kind.label(),
        main_guid: document.main_guid.as_ref(),
        references,
        unresolved: view.resolution.unresolved.iter().collect(),
    };
    return Ok(serde_json::to_string_pretty(&json)?);
}

/// Render the view as markdown-flavoured text: header, reference table, and
/// the document body with each reference tagged `[#n name]`.
pub fn to_text(document: &Document, view: &View) -> String {
    let main_guid = document
        .main_guid
        .as_ref()
        .map_or_else(|| return GUID_NOT_FOUND.to_string(), ToString::to_string);

    let mut out = String::new();
    let _ = writeln!(out, "# {} ({})", document.file_name(), document.kind.label());
    let _ = writeln!(out);
    let _ = writeln!(out, "Main GUID: {main_guid}");
    let _ = writeln!(out);

    let lines = line_numbers(&document.text, view.occurrences.iter().map(|o| return o.offset));
    let _ = writeln!(out, "## References ({})", view.occurrences.len());
    let _ = writeln!(out);
    for (i, (occurrence, line)) in view.occurrences.iter().zip(&lines).enumerate() {
        let _ = writeln!(
            out,
            "{:>4}  line {:<5} @{:<7} {:<10} {}  {}",
            i.saturating_add(1),
            line,
            occurrence.offset,
            occurrence.shape.label(),
            occurrence.guid,
            view.display_name(&occurrence.guid),
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Content (repoint with `guidref repoint <file> --at <offset>`)");
    let _ = writeln!(out);
    out.push_str(&annotate(document, view));
    return out;
}

/// Document text with a `[#n name]` tag after every reference.
fn annotate(document: &Document, view: &View) -> String {
    let text = &document.text;
    let mut out = String::with_capacity(text.len());
    let mut copied = 0_usize;
    for (i, occurrence) in view.occurrences.iter().enumerate() {
        let end = occurrence.span().end;
        let Some(chunk) = text.get(copied..end) else {
            continue;
        };
        out.push_str(chunk);
        let _ = write!(
            out,
            " [#{} {}]",
            i.saturating_add(1),
            view.display_name(&occurrence.guid)
        );
        copied = end;
    }
    out.push_str(text.get(copied..).unwrap_or_default());
    if !out.ends_with('\n') {
        out.push('\n');
    }
    return out;
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::pattern;
    use crate::resolver::Resolution;
    use crate::session::EXTERNAL_REFERENCE;
    use crate::types::ResourceKind;

    const HERO: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const LOST: &str = "dddddddddddddddddddddddddddddddd";

    fn fixture() -> (Document, View) {
        let text = format!("a: 1\nb: {{fileID: 5, guid: {HERO}, type: 3}}\nc: guid: {LOST}\n");
        let occurrences: Vec<_> = pattern::references(&text).collect();
        let mut resolution = Resolution::default();
        resolution.names.insert(Guid::parse(HERO).unwrap(), "Hero.prefab".to_string());
        resolution.unresolved.push(Guid::parse(LOST).unwrap());

        let document = Document {
            kind: ResourceKind::Asset,
            main_guid: None,
            path: PathBuf::from("Assets/Level.asset"),
            text,
        };
        return (document, View { occurrences, resolution });
    }

    #[test]
    fn text_output_tags_references_and_keeps_body() {
        let (document, view) = fixture();
        let out = to_text(&document, &view);

        assert!(out.starts_with("# Level.asset (Asset)\n"));
        assert!(out.contains("Main GUID: GUID not found"));
        assert!(out.contains(&format!("b: {{fileID: 5, guid: {HERO}, type: 3}} [#1 Hero.prefab]\n")));
        assert!(out.contains(&format!("c: guid: {LOST} [#2 {EXTERNAL_REFERENCE}]\n")));
    }

    #[test]
    fn json_output_carries_offsets_and_lines() {
        let (document, view) = fixture();
        let json: serde_json::Value = serde_json::from_str(&to_json(&document, &view).unwrap()).unwrap();

        let refs = json["references"].as_array().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0]["line"], 2);
        assert_eq!(refs[0]["offset"], 8);
        assert_eq!(refs[0]["shape"], "object_ref");
        assert_eq!(refs[0]["resource"], "Hero.prefab");
        assert!(refs[1]["resource"].is_null());
        assert_eq!(json["unresolved"][0], LOST);
        assert_eq!(json["kind"], "Asset");
    }

    #[test]
    fn line_numbers_follow_newlines() {
        assert_eq!(line_numbers("a\nb\nc", [0, 2, 4].into_iter()), vec![1, 2, 3]);
    }
}
