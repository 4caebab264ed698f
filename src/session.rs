//! One open resource and everything derived from it: text, main GUID,
//! resolution cache, and the rewrite lock on the backing file.
//!
//! A session is created when a resource is opened and torn down on close.
//! Every rewrite is a read-modify-write of the backing file followed by a
//! cache invalidation, so the next view re-runs matching and resolution.

use std::path::{Path, PathBuf};

use crate::catalog;
use crate::error::Error;
use crate::host::{CancelToken, Notifier, ProgressSink, Prompt};
use crate::pattern;
use crate::resolver::{GuidResolver, Resolution};
use crate::rewriter;
use crate::types::{Guid, ReferenceOccurrence, ResourceKind};
use crate::workspace::{Workspace, meta_path_for};

/// Display text for references no meta file declares.
pub const EXTERNAL_REFERENCE: &str = "(External Reference/Not Found in Project)";

/// The open resource file.
#[derive(Debug, Clone)]
pub struct Document {
    /// Asset or prefab.
    pub kind: ResourceKind,
    /// GUID from the sibling `.meta`, if it exists and declares one.
    pub main_guid: Option<Guid>,
    /// Path of the resource file.
    pub path: PathBuf,
    /// Current contents.
    pub text: String,
}

impl Document {
    /// File name for headers and messages.
    pub fn file_name(&self) -> String {
        return self
            .path
            .file_name()
            .map(|n| return n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }
}

/// What a repoint request ended in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The user dismissed the picker; nothing was written.
    Cancelled,
    /// The reference now points at the chosen resource.
    Rewritten {
        /// Display name of the new target.
        new_name: String,
        /// Display name of the previous target.
        old_name: String,
    },
}

/// Occurrences of the current text plus their resolved names.
#[derive(Debug)]
pub struct View {
    /// Every reference in document order.
    pub occurrences: Vec<ReferenceOccurrence>,
    /// Names for the occurrences' GUIDs.
    pub resolution: Resolution,
}

impl View {
    /// Resolved name, or the external-reference placeholder.
    pub fn display_name(&self, guid: &Guid) -> &str {
        return self.resolution.name_of(guid).unwrap_or(EXTERNAL_REFERENCE);
    }
}

/// Holds the workspace lock on a resource for the duration of one rewrite.
struct RewriteGuard<'w> {
    path: PathBuf,
    workspace: &'w dyn Workspace,
}

impl<'w> RewriteGuard<'w> {
    /// Claim the resource, or fail if another rewrite holds it.
    ///
    /// # Errors
    ///
    /// Returns `Error::RewriteInProgress` if the lock is held elsewhere, or
    /// `Error::Io` if it cannot be taken.
    fn acquire(workspace: &'w dyn Workspace, path: &Path) -> Result<Self, Error> {
        if !workspace.try_lock(path)? {
            return Err(Error::RewriteInProgress { path: path.to_path_buf() });
        }
        return Ok(Self {
            path: path.to_path_buf(),
            workspace,
        });
    }
}

impl Drop for RewriteGuard<'_> {
    fn drop(&mut self) {
        self.workspace.unlock(&self.path);
    }
}

/// Session state for exactly one open resource.
pub struct Session<'w> {
    cancel: CancelToken,
    document: Document,
    resolver: GuidResolver,
    workspace: &'w dyn Workspace,
}

impl<'w> Session<'w> {
    /// Tear the session down and drop the cache.
    pub fn close(mut self) {
        self.resolver.invalidate();
        tracing::debug!(path = %self.document.path.display(), "session closed");
    }

    /// Read-only view of the open document.
    pub const fn document(&self) -> &Document {
        return &self.document;
    }

    /// Find the reference starting at `offset` in the current text.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoReferenceAtOffset` if no occurrence starts there.
    pub fn occurrence_at(&self, offset: usize) -> Result<ReferenceOccurrence, Error> {
        return pattern::occurrence_at(&self.document.text, offset).ok_or_else(|| {
            return Error::NoReferenceAtOffset {
                file: self.document.path.clone(),
                offset,
            };
        });
    }

    /// Open a resource: read its text and the GUID from its `.meta` sibling.
    /// A missing or GUID-less meta file is not fatal; the main GUID is `None`.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedResource` for files other than `.asset` and
    /// `.prefab`, or `Error::FileNotReadable` if the resource cannot be read.
    pub fn open(workspace: &'w dyn Workspace, path: &Path) -> Result<Self, Error> {
        let Some(kind) = ResourceKind::from_path(path) else {
            return Err(Error::UnsupportedResource { path: path.to_path_buf() });
        };
        let text = workspace.read_text(path)?;
        let main_guid = read_main_guid(workspace, path);
        tracing::info!(path = %path.display(), kind = kind.label(), "opened resource");

        return Ok(Self {
            cancel: CancelToken::default(),
            document: Document {
                kind,
                main_guid,
                path: path.to_path_buf(),
                text,
            },
            resolver: GuidResolver::default(),
            workspace,
        });
    }

    /// Re-read the document from disk and drop cached names.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotReadable` if the resource can no longer be read.
    pub fn reload(&mut self) -> Result<(), Error> {
        self.document.text = self.workspace.read_text(&self.document.path)?;
        self.document.main_guid = read_main_guid(self.workspace, &self.document.path);
        self.resolver.invalidate();
        return Ok(());
    }

    /// Point `occurrence` at `new_guid` and persist the file.
    ///
    /// The file is re-read first; the rewrite is addressed by the occurrence's
    /// byte span and fails closed if the bytes there changed. On success the
    /// in-memory text is replaced and the resolution cache cleared.
    ///
    /// # Errors
    ///
    /// Returns `Error::RewriteInProgress` if another rewrite holds the lock,
    /// `Error::GuidMismatch` / `Error::ReferenceNotFound` from the rewriter
    /// (nothing is written), or I/O errors from reading or writing the file.
    pub fn repoint(
        &mut self,
        occurrence: &ReferenceOccurrence,
        expected_old: &Guid,
        new_guid: &Guid,
    ) -> Result<(), Error> {
        self.persist_rewrite(expected_old, new_guid, |current| {
            return rewriter::rewrite_at(current, occurrence, expected_old, new_guid);
        })?;
        tracing::info!(offset = occurrence.offset, "reference repointed by span");
        return Ok(());
    }

    /// Point the first verbatim copy of `original_match` at `new_guid`.
    /// For hosts that only know the clicked text, not its offset.
    ///
    /// # Errors
    ///
    /// Same as [`Session::repoint`].
    pub fn repoint_match(
        &mut self,
        original_match: &str,
        expected_old: &Guid,
        new_guid: &Guid,
    ) -> Result<(), Error> {
        self.persist_rewrite(expected_old, new_guid, |current| {
            return rewriter::rewrite(current, original_match, expected_old, new_guid);
        })?;
        tracing::info!(reference = original_match, "reference repointed by content");
        return Ok(());
    }

    /// Re-read, rewrite, write back, then adopt the new text.
    ///
    /// # Errors
    ///
    /// Returns `Error::RewriteInProgress`, errors from `rewrite`, or I/O errors.
    fn persist_rewrite(
        &mut self,
        expected_old: &Guid,
        new_guid: &Guid,
        rewrite: impl FnOnce(&str) -> Result<String, Error>,
    ) -> Result<(), Error> {
        let path = self.document.path.clone();
        let _guard = RewriteGuard::acquire(self.workspace, &path)?;

        let current = self.workspace.read_text(&path)?;
        let updated = rewrite(&current)?;
        self.workspace.write_text(&path, &updated)?;
        tracing::debug!(path = %path.display(), old = %expected_old, new = %new_guid, "resource written");

        self.document.text = updated;
        self.resolver.invalidate();
        return Ok(());
    }

    /// Interactive repoint: let the user pick the new target from every
    /// project resource, then rewrite the reference starting at `offset`.
    /// A dismissed picker is `Outcome::Cancelled`, not an error.
    ///
    /// # Errors
    ///
    /// Returns `Error::NoReferenceAtOffset`, enumeration errors
    /// (`NoMetaFilesFound`, `NoValidCandidates`), or any error from `repoint`.
    pub fn repoint_interactively(
        &mut self,
        offset: usize,
        prompt: &mut dyn Prompt,
        notifier: &mut dyn Notifier,
        progress: &mut dyn ProgressSink,
    ) -> Result<Outcome, Error> {
        let occurrence = self.occurrence_at(offset)?;
        let old_guid = occurrence.guid.clone();
        let old_name = self.name_of(&old_guid, progress)?;

        let candidates = catalog::list_resources(self.workspace)?;
        let question = format!("Replace ref. to \"{old_name}\" (GUID: {old_guid}). Select NEW resource:");
        let Some(choice) = prompt.pick_one(&candidates, &question) else {
            notifier.info("No changes made. New resource not selected.");
            return Ok(Outcome::Cancelled);
        };
        let Some(chosen) = candidates.get(choice) else {
            notifier.info("No changes made. New resource not selected.");
            return Ok(Outcome::Cancelled);
        };

        self.repoint(&occurrence, &old_guid, &chosen.guid)?;
        let new_name = chosen.display_name.clone();
        notifier.info(&format!(
            "Reference to \"{old_name}\" updated to \"{new_name}\" in {}.",
            self.document.file_name()
        ));
        return Ok(Outcome::Rewritten { new_name, old_name });
    }

    /// Resolution cache size.
    #[cfg(test)]
    pub fn cached_names(&self) -> usize {
        return self.resolver.cache().len();
    }

    /// Name for a single GUID, or the external-reference placeholder.
    ///
    /// # Errors
    ///
    /// Returns errors from listing meta files.
    pub fn name_of(&mut self, guid: &Guid, progress: &mut dyn ProgressSink) -> Result<String, Error> {
        let resolution = self.resolver.resolve([guid], self.workspace, progress, &self.cancel)?;
        return Ok(resolution.name_of(guid).unwrap_or(EXTERNAL_REFERENCE).to_string());
    }

    /// Match every reference in the current text and resolve their GUIDs.
    ///
    /// # Errors
    ///
    /// Returns errors from listing meta files.
    pub fn view(&mut self, progress: &mut dyn ProgressSink) -> Result<View, Error> {
        progress.report(0, "Reading references...");
        let occurrences: Vec<ReferenceOccurrence> = pattern::references(&self.document.text).collect();
        let resolution = self.resolver.resolve(
            occurrences.iter().map(|o| return &o.guid),
            self.workspace,
            progress,
            &self.cancel,
        )?;
        return Ok(View { occurrences, resolution });
    }
}

/// Main GUID of a resource from `<resource>.meta`; `None` when unavailable.
fn read_main_guid(workspace: &dyn Workspace, resource: &Path) -> Option<Guid> {
    let meta = meta_path_for(resource);
    return match workspace.read_meta_guid(&meta) {
        Ok(guid) => guid,
        Err(e) => {
            tracing::warn!(path = %meta.display(), error = %e, "meta file not readable");
            None
        },
    };
}
