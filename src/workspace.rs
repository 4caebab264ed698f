//! Filesystem access for the core: reading and writing resource text and
//! enumerating the project's `.meta` files.

use std::io::{BufRead as _, Write as _};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::pattern;
use crate::types::Guid;

/// Suffix of Unity's sidecar files.
pub const META_SUFFIX: &str = ".meta";

/// Suffix of the sidecar that marks a resource as being rewritten.
pub const LOCK_SUFFIX: &str = ".guidref-lock";

/// Everything the core needs from its host environment's file system.
/// `Sync` so meta reads can fan out across the rayon pool.
pub trait Workspace: Sync {
    /// Every `.meta` file of the project, build/output directories excluded.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the project root itself cannot be walked.
    fn list_meta_files(&self) -> Result<Vec<PathBuf>, Error>;

    /// Read a meta file only as far as its GUID field.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotReadable` if the file cannot be read.
    fn read_meta_guid(&self, path: &Path) -> Result<Option<Guid>, Error> {
        let text = self.read_text(path)?;
        return Ok(pattern::first_guid(&text));
    }

    /// Read a whole file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `Error::FileNotReadable` if the file is missing or not UTF-8.
    fn read_text(&self, path: &Path) -> Result<String, Error>;

    /// Project root all listed paths live under.
    fn root(&self) -> &Path;

    /// Claim exclusive rewrite rights on a resource. `Ok(false)` means another
    /// process (or session) holds them.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the claim cannot be recorded.
    fn try_lock(&self, resource: &Path) -> Result<bool, Error>;

    /// Release a claim taken with `try_lock`.
    fn unlock(&self, resource: &Path);

    /// Replace a file's contents.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the write fails.
    fn write_text(&self, path: &Path, contents: &str) -> Result<(), Error>;
}

/// Resource name owning a meta file: the file name with `.meta` stripped.
pub fn display_name_for_meta(meta_path: &Path) -> String {
    let name = meta_path
        .file_name()
        .map(|n| return n.to_string_lossy().into_owned())
        .unwrap_or_default();
    return match name.strip_suffix(META_SUFFIX) {
        Some(stripped) => stripped.to_string(),
        None => name,
    };
}

/// Sibling meta file of a resource: `<resource>.meta`.
pub fn meta_path_for(resource: &Path) -> PathBuf {
    let mut os = resource.as_os_str().to_os_string();
    os.push(META_SUFFIX);
    return PathBuf::from(os);
}

/// Lock sidecar of a resource: `<resource>.guidref-lock`.
pub fn lock_path_for(resource: &Path) -> PathBuf {
    let mut os = resource.as_os_str().to_os_string();
    os.push(LOCK_SUFFIX);
    return PathBuf::from(os);
}

/// `Workspace` backed by the real file system under a project root.
#[derive(Debug, Clone)]
pub struct FsWorkspace {
    config: Config,
    root: PathBuf,
}

impl FsWorkspace {
    /// Project configuration this workspace filters with.
    pub const fn config(&self) -> &Config {
        return &self.config;
    }

    /// Open a workspace rooted at `root`, loading `.guidref.toml` if present.
    ///
    /// # Errors
    ///
    /// Returns config loading errors.
    pub fn open(root: &Path) -> Result<Self, Error> {
        let config = Config::load(root)?;
        return Ok(Self::with_config(root, config));
    }

    /// Build a workspace with an explicit config.
    pub fn with_config(root: &Path, config: Config) -> Self {
        return Self {
            config,
            root: root.to_path_buf(),
        };
    }
}

impl Workspace for FsWorkspace {
    fn list_meta_files(&self) -> Result<Vec<PathBuf>, Error> {
        if !self.root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("project root {} is not a directory", self.root.display()),
            )));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| {
                return e.depth() == 0
                    || !e.file_type().is_dir()
                    || !self.config.is_excluded_dir(&e.file_name().to_string_lossy());
            })
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_file())
            .filter(|e| return e.file_name().to_string_lossy().ends_with(META_SUFFIX))
        {
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if !self.config.should_scan(&relative.to_string_lossy().replace('\\', "/")) {
                continue;
            }
            found.push(entry.into_path());
        }

        found.sort();
        return Ok(found);
    }

    /// Stops reading at the first line carrying a GUID field.
    fn read_meta_guid(&self, path: &Path) -> Result<Option<Guid>, Error> {
        let unreadable = || return Error::FileNotReadable { path: path.to_path_buf() };
        let file = std::fs::File::open(path).map_err(|_err| return unreadable())?;
        for line in std::io::BufReader::new(file).lines() {
            let line = line.map_err(|_err| return unreadable())?;
            if let Some(guid) = pattern::first_guid(&line) {
                return Ok(Some(guid));
            }
        }
        return Ok(None);
    }

    fn read_text(&self, path: &Path) -> Result<String, Error> {
        return std::fs::read_to_string(path)
            .map_err(|_err| return Error::FileNotReadable { path: path.to_path_buf() });
    }

    fn root(&self) -> &Path {
        return &self.root;
    }

    /// The sidecar is created with `create_new`, so two processes can never
    /// both hold it. It records the owner's pid for humans cleaning up.
    fn try_lock(&self, resource: &Path) -> Result<bool, Error> {
        let lock = lock_path_for(resource);
        return match std::fs::OpenOptions::new().write(true).create_new(true).open(&lock) {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                Ok(true)
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::Io(e)),
        };
    }

    fn unlock(&self, resource: &Path) {
        let lock = lock_path_for(resource);
        if let Err(e) = std::fs::remove_file(&lock) {
            tracing::warn!(path = %lock.display(), error = %e, "lock file not removed");
        }
    }

    fn write_text(&self, path: &Path, contents: &str) -> Result<(), Error> {
        std::fs::write(path, contents)?;
        return Ok(());
    }
}

/// In-memory workspace with access counters, for resolver and session tests.
#[cfg(test)]
pub mod memory {
    use std::collections::{BTreeMap, BTreeSet};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::{META_SUFFIX, Workspace};
    use crate::error::Error;

    /// Called after every meta read with the path that was read.
    pub type ReadHook = Box<dyn Fn(&Path) + Send + Sync>;

    /// Files live in a map; every call is counted.
    #[derive(Default)]
    pub struct MemoryWorkspace {
        files: Mutex<BTreeMap<PathBuf, Option<String>>>,
        pub lists: AtomicUsize,
        locks: Mutex<BTreeSet<PathBuf>>,
        pub meta_reads: AtomicUsize,
        read_hook: Option<ReadHook>,
        root: PathBuf,
        pub writes: AtomicUsize,
    }

    impl MemoryWorkspace {
        pub fn insert(&self, path: &str, contents: &str) {
            self.files
                .lock()
                .unwrap()
                .insert(PathBuf::from(path), Some(contents.to_string()));
        }

        /// Listed like any other file, but every read fails.
        pub fn insert_unreadable(&self, path: &str) {
            self.files.lock().unwrap().insert(PathBuf::from(path), None);
        }

        pub fn insert_meta(&self, resource: &str, guid: &str) {
            self.insert(
                &format!("{resource}{META_SUFFIX}"),
                &format!("fileFormatVersion: 2\nguid: {guid}\nNativeFormatImporter:\n"),
            );
        }

        pub fn get(&self, path: &str) -> Option<String> {
            return self.files.lock().unwrap().get(Path::new(path)).cloned().flatten();
        }

        pub fn is_locked(&self, path: &str) -> bool {
            return self.locks.lock().unwrap().contains(Path::new(path));
        }

        pub fn set_read_hook(&mut self, hook: ReadHook) {
            self.read_hook = Some(hook);
        }

        pub fn list_count(&self) -> usize {
            return self.lists.load(Ordering::SeqCst);
        }

        pub fn meta_read_count(&self) -> usize {
            return self.meta_reads.load(Ordering::SeqCst);
        }

        pub fn write_count(&self) -> usize {
            return self.writes.load(Ordering::SeqCst);
        }
    }

    impl Workspace for MemoryWorkspace {
        fn list_meta_files(&self) -> Result<Vec<PathBuf>, Error> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            let files = self.files.lock().unwrap();
            return Ok(files
                .keys()
                .filter(|p| return p.to_string_lossy().ends_with(META_SUFFIX))
                .cloned()
                .collect());
        }

        fn read_meta_guid(&self, path: &Path) -> Result<Option<crate::types::Guid>, Error> {
            self.meta_reads.fetch_add(1, Ordering::SeqCst);
            let text = self.read_text(path);
            if let Some(hook) = &self.read_hook {
                hook(path);
            }
            return Ok(crate::pattern::first_guid(&text?));
        }

        fn read_text(&self, path: &Path) -> Result<String, Error> {
            return self
                .files
                .lock()
                .unwrap()
                .get(path)
                .cloned()
                .flatten()
                .ok_or_else(|| return Error::FileNotReadable { path: path.to_path_buf() });
        }

        fn root(&self) -> &Path {
            return &self.root;
        }

        fn try_lock(&self, resource: &Path) -> Result<bool, Error> {
            return Ok(self.locks.lock().unwrap().insert(resource.to_path_buf()));
        }

        fn unlock(&self, resource: &Path) {
            self.locks.lock().unwrap().remove(resource);
        }

        fn write_text(&self, path: &Path, contents: &str) -> Result<(), Error> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), Some(contents.to_string()));
            return Ok(());
        }
    }
}
