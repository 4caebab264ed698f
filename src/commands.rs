//! Core CLI commands for guidref: show, resolve, resources, repoint.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::process::ExitCode;

use crate::catalog;
use crate::error;
use crate::host::{CancelToken, Notifier as _, StderrNotifier, StderrProgress, StdinPrompt};
use crate::pattern;
use crate::render;
use crate::resolver::GuidResolver;
use crate::session::{Outcome, Session};
use crate::types::Guid;
use crate::workspace::FsWorkspace;

/// Output flavour for commands that print structured data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Machine-readable JSON on stdout.
    Json,
    /// Human-readable text on stdout.
    Text,
}

impl OutputFormat {
    /// Progress sink matching this format; JSON runs stay quiet.
    const fn progress(self) -> StderrProgress {
        return StderrProgress {
            quiet: matches!(self, Self::Json),
        };
    }
}

/// How `repoint` addresses the reference to rewrite, and where it goes.
pub enum Target {
    /// Verbatim reference text; the first copy in the file is pointed at `to`.
    Match {
        /// Reference text as shown to the user.
        text: String,
        /// New GUID.
        to: Guid,
    },
    /// Byte offset where the reference starts, as printed by `show`. Without
    /// `to` the user picks the new resource.
    Offset {
        /// Byte offset of the reference.
        at: usize,
        /// New GUID, if already known.
        to: Option<Guid>,
    },
}

/// Rewrite one reference in a resource file.
///
/// A target with a GUID is repointed directly; an offset without one lets the
/// user pick from every project resource. `expect` guards against a stale
/// target: the reference must still hold that GUID.
///
/// # Errors
///
/// Returns errors from opening the workspace or resource, enumeration, or the
/// rewrite preconditions.
pub fn repoint(
    root: &Path,
    file: &Path,
    target: &Target,
    expect: Option<&Guid>,
) -> Result<ExitCode, error::Error> {
    let workspace = FsWorkspace::open(root)?;
    let mut session = Session::open(&workspace, file)?;
    let mut progress = StderrProgress { quiet: false };
    let mut notifier = StderrNotifier;

    let (old_name, new_guid) = match target {
        Target::Offset { at, to: None } => {
            let occurrence = session.occurrence_at(*at)?;
            if let Some(expected) = expect
                && *expected != occurrence.guid
            {
                return Err(error::Error::GuidMismatch {
                    expected: expected.clone(),
                    found: Some(occurrence.guid),
                });
            }
            let outcome = session.repoint_interactively(*at, &mut StdinPrompt, &mut notifier, &mut progress)?;
            tracing::debug!(cancelled = matches!(outcome, Outcome::Cancelled), "interactive repoint finished");
            session.close();
            return Ok(ExitCode::SUCCESS);
        },
        Target::Offset {
            at,
            to: Some(new_guid),
        } => {
            let occurrence = session.occurrence_at(*at)?;
            let expected = expect.cloned().unwrap_or_else(|| return occurrence.guid.clone());
            let old_name = session.name_of(&occurrence.guid, &mut progress)?;
            session.repoint(&occurrence, &expected, new_guid)?;
            (old_name, new_guid)
        },
        Target::Match { text, to: new_guid } => {
            let expected = match expect {
                Some(guid) => guid.clone(),
                None => pattern::first_guid(text).ok_or_else(|| {
                    return error::Error::InvalidGuid { value: text.clone() };
                })?,
            };
            let old_name = session.name_of(&expected, &mut progress)?;
            session.repoint_match(text, &expected, new_guid)?;
            (old_name, new_guid)
        },
    };

    let new_name = session.name_of(new_guid, &mut progress)?;
    notifier.info(&format!(
        "Reference to \"{old_name}\" updated to \"{new_name}\" in {}.",
        session.document().file_name()
    ));
    session.close();
    return Ok(ExitCode::SUCCESS);
}

/// Resolve GUIDs given on the command line. Exits 1 if any stays unresolved.
///
/// # Errors
///
/// Returns errors from opening the workspace or listing meta files.
pub fn resolve(root: &Path, guids: &[Guid], format: OutputFormat) -> Result<ExitCode, error::Error> {
    let workspace = FsWorkspace::open(root)?;
    let mut resolver = GuidResolver::default();
    let resolution = resolver.resolve(guids, &workspace, &mut format.progress(), &CancelToken::default())?;

    match format {
        OutputFormat::Json => {
            let resolved: BTreeMap<&str, &str> = resolution
                .names
                .iter()
                .map(|(guid, name)| return (guid.as_str(), name.as_str()))
                .collect();
            let json = serde_json::json!({
                "resolved": resolved,
                "unresolved": resolution.unresolved,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        },
        OutputFormat::Text => {
            let mut printed = HashSet::new();
            for guid in guids {
                if !printed.insert(guid) {
                    continue;
                }
                match resolution.name_of(guid) {
                    Some(name) => println!("{guid}  {name}"),
                    None => println!("{guid}  {}", crate::session::EXTERNAL_REFERENCE),
                }
            }
        },
    }

    if resolution.unresolved.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    return Ok(ExitCode::from(1));
}

/// List every project resource with its GUID.
///
/// # Errors
///
/// Returns `NoMetaFilesFound` / `NoValidCandidates` or workspace errors.
pub fn resources(root: &Path, format: OutputFormat) -> Result<(), error::Error> {
    let workspace = FsWorkspace::open(root)?;
    let resources = catalog::list_resources(&workspace)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&resources)?),
        OutputFormat::Text => {
            for resource in &resources {
                let relative = resource.path.strip_prefix(root).unwrap_or(&resource.path);
                println!("{}  {}  {}", resource.guid, resource.display_name, relative.display());
            }
        },
    }
    return Ok(());
}

/// Open a resource and print it with every reference resolved.
///
/// # Errors
///
/// Returns errors from opening the workspace or resource, or resolution.
pub fn show(root: &Path, file: &Path, format: OutputFormat) -> Result<(), error::Error> {
    let workspace = FsWorkspace::open(root)?;
    let mut session = Session::open(&workspace, file)?;
    if session.document().main_guid.is_none() {
        StderrNotifier.warn(&format!("No GUID found for {}.", session.document().file_name()));
    }
    print_view(&mut session, format)?;
    session.close();
    return Ok(());
}

/// Render the session's current view to stdout.
///
/// # Errors
///
/// Returns resolution or serialization errors.
pub fn print_view(session: &mut Session<'_>, format: OutputFormat) -> Result<(), error::Error> {
    let mut progress = format.progress();
    progress_message(&mut progress, session);
    let view = session.view(&mut progress)?;

    match format {
        OutputFormat::Json => println!("{}", render::to_json(session.document(), &view)?),
        OutputFormat::Text => print!("{}", render::to_text(session.document(), &view)),
    }
    return Ok(());
}

/// Announce which document is being analysed.
fn progress_message(progress: &mut StderrProgress, session: &Session<'_>) {
    use crate::host::ProgressSink as _;
    progress.report(0, &format!("Analyzing {}...", session.document().file_name()));
}
