use crate::error::Error;
use crate::types::Guid;
use crate::workspace::lock_path_for;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::GuidMismatch { expected, found } => render_guid_mismatch(expected, found.as_ref()),
        Error::ReferenceNotFound { reference } => render_reference_not_found(reference),
        Error::NoMetaFilesFound { root } => render_no_meta_files(&root.display().to_string()),
        Error::NoValidCandidates { scanned } => render_no_valid_candidates(*scanned),
        Error::NoReferenceAtOffset { file, offset } => {
            render_no_reference_at_offset(&file.display().to_string(), *offset)
        },
        Error::UnsupportedResource { path } => render_unsupported_resource(&path.display().to_string()),
        _ => render_generic(e),
    };
}

fn render_generic(e: &Error) -> String {
    return match e {
        Error::FileNotReadable { path } => format!("\
# Error: File Not Readable

`{}` does not exist or is not UTF-8 text.
", path.display()),

        Error::InvalidGuid { value } => format!("\
# Error: Invalid GUID

`{value}` does not hold a valid GUID. Unity GUIDs are exactly 32 hex characters.
"),

        Error::RewriteInProgress { path } => format!("\
# Error: Rewrite In Progress

Another guidref process is rewriting `{}`. No changes were made.

## Fix

Wait for it to finish, then retry. If no other guidref is running, delete the
stale lock file `{}`.
", path.display(), lock_path_for(path).display()),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON

{e}
"),
        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.guidref.toml` at the project root.
"),
        Error::WatchFailed { reason } => format!("\
# Error: Watch Failed

{reason}
"),
        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    };
}

fn render_guid_mismatch(expected: &Guid, found: Option<&Guid>) -> String {
    let found = found.map_or_else(|| return "no GUID at all".to_string(), |g| return format!("`{g}`"));
    return format!("\
# Error: GUID Mismatch

The selected reference was expected to hold `{expected}` but holds {found}.
No changes were made.

## Fix

Re-run `guidref show` and pick the reference again.
");
}

fn render_no_meta_files(root: &str) -> String {
    return format!("\
# Error: No Meta Files

No `.meta` files were found under `{root}` (build and package directories are skipped).

## Fix

Run guidref from the Unity project root, or pass `--root <project>`.
");
}

fn render_no_reference_at_offset(file: &str, offset: usize) -> String {
    return format!("\
# Error: No Reference At Offset

No GUID reference starts at byte {offset} in `{file}`.

## Fix

List the offsets with:

    guidref show {file}
");
}

fn render_no_valid_candidates(scanned: usize) -> String {
    return format!("\
# Error: No Valid Candidates

None of the {scanned} `.meta` files scanned declares a GUID, so there is nothing to pick from.
");
}

fn render_reference_not_found(reference: &str) -> String {
    return format!("\
# Error: Reference Not Found

`{reference}` is no longer where it was. The file may have been modified.
No changes were made.

## Fix

Re-run `guidref show` to get fresh offsets, then retry.
");
}

fn render_unsupported_resource(path: &str) -> String {
    return format!("\
# Error: Unsupported Resource

`{path}` is not a Unity text resource.

## Fix

Open a `.asset` or `.prefab` file.
");
}
