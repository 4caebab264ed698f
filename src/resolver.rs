//! GUID → resource name resolution against the project's `.meta` files.
//!
//! Cache misses are resolved in one pass over the meta file set: every file is
//! read (in parallel, header only) and its GUID checked against the pending
//! set. Only hits are cached, so a GUID missing today is retried next time.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::error::Error;
use crate::host::{CancelToken, ProgressSink, percent};
use crate::types::Guid;
use crate::workspace::{Workspace, display_name_for_meta};

/// Session-scoped GUID → display name map. Entries are only ever added while
/// the session lives, so a cancelled scan never leaves it inconsistent.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    names: HashMap<Guid, String>,
}

impl ResolutionCache {
    /// Drop every entry.
    pub fn clear(&mut self) {
        self.names.clear();
    }

    /// Cached name for a GUID.
    pub fn get(&self, guid: &Guid) -> Option<&str> {
        return self.names.get(guid).map(String::as_str);
    }

    /// Record a resolved GUID.
    pub fn insert(&mut self, guid: Guid, name: String) {
        self.names.insert(guid, name);
    }

    /// Whether nothing is cached.
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        return self.names.is_empty();
    }

    /// Number of cached GUIDs.
    pub fn len(&self) -> usize {
        return self.names.len();
    }
}

/// Result of one `resolve` call.
#[derive(Debug, Default)]
pub struct Resolution {
    /// The scan stopped early because the caller cancelled.
    pub cancelled: bool,
    /// Resolved GUIDs, cache hits included.
    pub names: HashMap<Guid, String>,
    /// Requested GUIDs no meta file declared, in request order.
    pub unresolved: Vec<Guid>,
}

impl Resolution {
    /// Display name for a GUID, if it resolved.
    pub fn name_of(&self, guid: &Guid) -> Option<&str> {
        return self.names.get(guid).map(String::as_str);
    }
}

/// Resolves GUIDs with a cache owned by the caller's session.
#[derive(Debug, Default)]
pub struct GuidResolver {
    cache: ResolutionCache,
    /// Pool for meta reads; the global rayon pool when unset.
    pool: Option<Arc<rayon::ThreadPool>>,
    scans: usize,
}

impl GuidResolver {
    /// Resolver whose meta reads run on a dedicated pool of `threads`.
    #[cfg(test)]
    pub fn with_threads(threads: usize) -> Self {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        return Self {
            pool: Some(Arc::new(pool)),
            ..Self::default()
        };
    }

    /// Read-only view of the cache.
    #[cfg(test)]
    pub const fn cache(&self) -> &ResolutionCache {
        return &self.cache;
    }

    /// Forget everything resolved so far.
    pub fn invalidate(&mut self) {
        tracing::debug!(entries = self.cache.len(), "clearing resolution cache");
        self.cache.clear();
    }

    /// Map each GUID to the name of the resource whose `.meta` declares it.
    ///
    /// Input is deduplicated; cache hits are served without touching the
    /// workspace. Unreadable meta files are skipped. Progress is reported as
    /// resolved-so-far over the number of cache misses.
    ///
    /// # Errors
    ///
    /// Returns errors from listing the project's meta files.
    pub fn resolve<'a, I>(
        &mut self,
        guids: I,
        workspace: &dyn Workspace,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Resolution, Error>
    where
        I: IntoIterator<Item = &'a Guid>,
    {
        let mut resolution = Resolution::default();
        let mut seen: HashSet<&Guid> = HashSet::new();
        let mut misses: Vec<Guid> = Vec::new();

        for guid in guids {
            if !seen.insert(guid) {
                continue;
            }
            match self.cache.get(guid) {
                Some(name) => {
                    resolution.names.insert(guid.clone(), name.to_string());
                },
                None => misses.push(guid.clone()),
            }
        }

        if misses.is_empty() {
            return Ok(resolution);
        }

        let total = misses.len();
        progress.report(0, &format!("Searching for {total} new GUIDs..."));
        let found = self.scan_meta_files(&misses, workspace, progress, cancel)?;

        for guid in misses {
            match found.get(&guid) {
                Some(path) => {
                    let name = display_name_for_meta(path);
                    self.cache.insert(guid.clone(), name.clone());
                    resolution.names.insert(guid, name);
                },
                None => resolution.unresolved.push(guid),
            }
        }

        resolution.cancelled = cancel.is_cancelled();
        tracing::debug!(
            resolved = resolution.names.len(),
            unresolved = resolution.unresolved.len(),
            cancelled = resolution.cancelled,
            "guid resolution finished"
        );
        return Ok(resolution);
    }

    /// One pass over every meta file, collecting paths for pending GUIDs.
    /// Workers read headers in parallel and send hits back over a channel; this
    /// thread alone reports progress, so the count is of completed hits.
    ///
    /// # Errors
    ///
    /// Returns errors from listing the project's meta files.
    fn scan_meta_files(
        &mut self,
        pending: &[Guid],
        workspace: &dyn Workspace,
        progress: &mut dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<HashMap<Guid, PathBuf>, Error> {
        let metas = workspace.list_meta_files()?;
        self.scans = self.scans.saturating_add(1);
        tracing::info!(meta_files = metas.len(), pending = pending.len(), "scanning meta files");

        let wanted: HashSet<&Guid> = pending.iter().collect();
        let total = wanted.len();
        // Workers strike GUIDs off as they find them; the last strike stops the scan.
        let remaining: Mutex<HashSet<&Guid>> = Mutex::new(wanted.clone());
        let all_found = AtomicBool::new(false);
        let mut found: HashMap<Guid, PathBuf> = HashMap::new();
        let (tx, rx) = crossbeam_channel::unbounded::<(Guid, PathBuf)>();
        let pool = self.pool.clone();

        std::thread::scope(|scope| {
            let wanted = &wanted;
            let remaining = &remaining;
            let all_found = &all_found;
            let scan = move || {
                metas.par_iter().for_each_with(tx, |tx, path| {
                    if cancel.is_cancelled() || all_found.load(Ordering::SeqCst) {
                        return;
                    }
                    match workspace.read_meta_guid(path) {
                        Ok(Some(guid)) if wanted.contains(&guid) => {
                            if let Ok(mut left) = remaining.lock()
                                && left.remove(&guid)
                                && left.is_empty()
                            {
                                all_found.store(true, Ordering::SeqCst);
                            }
                            let _ = tx.send((guid, path.clone()));
                        },
                        Ok(_) => {},
                        Err(e) => tracing::debug!(path = %path.display(), error = %e, "skipping meta file"),
                    }
                });
            };
            scope.spawn(move || {
                match pool {
                    Some(pool) => pool.install(scan),
                    None => scan(),
                }
            });

            for (guid, path) in &rx {
                if let Some(existing) = found.get_mut(&guid) {
                    // Workers finish in any order; the lowest path wins.
                    if path < *existing {
                        *existing = path;
                    }
                    tracing::warn!(
                        %guid,
                        kept = %existing.display(),
                        "guid declared by more than one meta file"
                    );
                    continue;
                }
                found.insert(guid, path);
                let done = found.len();
                progress.report(percent(done, total), &format!("Resolved {done}/{total}..."));
            }
        });

        return Ok(found);
    }

    /// Number of meta file scans performed since construction.
    #[cfg(test)]
    pub const fn scan_count(&self) -> usize {
        return self.scans;
    }
}
