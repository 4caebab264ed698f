//! File watcher: shows a resource on startup, then re-renders it whenever the
//! resource or anything next to it changes.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use notify::{RecursiveMode, Watcher as _};

use crate::commands::{self, OutputFormat};
use crate::diagnostics;
use crate::error;
use crate::host::{Notifier as _, StderrNotifier};
use crate::session::Session;
use crate::workspace::FsWorkspace;

/// Debounce delay between filesystem events and re-render.
const DEBOUNCE_MS: u64 = 100;

/// Create a filesystem watcher that sends events on the given channel.
///
/// # Errors
///
/// Returns `Error::WatchFailed` if the watcher cannot be created.
fn create_watcher(
    tx: crossbeam_channel::Sender<()>,
) -> Result<notify::RecommendedWatcher, error::Error> {
    return notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
        if let Ok(event) = res
            && matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            )
        {
            let _ = tx.send(());
        }
    })
    .map_err(|e| {
        return error::Error::WatchFailed {
            reason: format!("watcher setup failed: {e}"),
        };
    });
}

/// Directory whose events matter for `file`: the resource and its `.meta`
/// sibling both live there.
fn watch_dir(file: &Path) -> PathBuf {
    return match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
}

/// Entry point for the watch command.
///
/// Starts watching, renders the resource once, then reloads the session and
/// re-renders after each debounced burst of changes. Render failures are
/// reported and the watch continues.
///
/// # Errors
///
/// Returns errors from opening the workspace or resource, or watcher setup.
pub fn run(root: &Path, file: &Path, format: OutputFormat) -> Result<ExitCode, error::Error> {
    let workspace = FsWorkspace::open(root)?;
    let mut session = Session::open(&workspace, file)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let mut watcher = create_watcher(tx)?;
    let dir = watch_dir(file);
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| {
            return error::Error::WatchFailed {
                reason: format!("cannot watch {}: {e}", dir.display()),
            };
        })?;

    eprintln!("watch: monitoring {}, press Ctrl+C to stop", dir.display());

    // Events from here on are queued, so an edit made during the first
    // render still triggers a re-render.
    let mut last_code = render_once(&mut session, format);

    while rx.recv().is_ok() {
        let debounce = Duration::from_millis(DEBOUNCE_MS);
        while rx.recv_timeout(debounce).is_ok() {}
        eprintln!("watch: change detected, re-rendering...");
        last_code = match session.reload() {
            Ok(()) => render_once(&mut session, format),
            Err(e) => {
                StderrNotifier.error(&format!("{} could not be reloaded: {e}", file.display()));
                ExitCode::from(3_u8)
            },
        };
    }

    session.close();
    return Ok(last_code);
}

/// Render once and report failures. Returns the exit code for this render.
fn render_once(session: &mut Session<'_>, format: OutputFormat) -> ExitCode {
    return match commands::print_view(session, format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(3_u8)
        },
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_file_watches_current_dir() {
        assert_eq!(watch_dir(Path::new("Level.asset")), PathBuf::from("."));
    }

    #[test]
    fn nested_file_watches_its_parent() {
        assert_eq!(
            watch_dir(Path::new("Assets/Levels/Level.asset")),
            PathBuf::from("Assets/Levels")
        );
    }
}
