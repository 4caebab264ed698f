/// Crate-level error types for guidref diagnostics.
use std::path::PathBuf;

use crate::types::Guid;

/// All errors in guidref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, GUID, or reason for failure.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A resource or `.meta` file is missing or cannot be read as text.
    #[error("file not readable: {}", path.display())]
    FileNotReadable {
        /// Path that could not be read.
        path: PathBuf,
    },

    /// The GUID inside the clicked reference is not the one the caller expected.
    #[error(
        "guid mismatch: expected {expected}, found {}",
        found.as_ref().map_or_else(|| return "no guid".to_string(), ToString::to_string)
    )]
    GuidMismatch {
        /// GUID the caller believed the reference held.
        expected: Guid,
        /// GUID actually present in the reference text, if any.
        found: Option<Guid>,
    },

    /// A value that should be a GUID is not 32 hex characters.
    #[error("invalid guid: `{value}` (expected 32 hex characters)")]
    InvalidGuid {
        /// The rejected value.
        value: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON serialization failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// The project scan listed no `.meta` files at all.
    #[error("no .meta files found under {}", root.display())]
    NoMetaFilesFound {
        /// Project root that was scanned.
        root: PathBuf,
    },

    /// No reference starts at the requested byte offset.
    #[error("no reference at byte offset {offset} in {}", file.display())]
    NoReferenceAtOffset {
        /// Document that was searched.
        file: PathBuf,
        /// Requested byte offset.
        offset: usize,
    },

    /// Every scanned `.meta` file lacked a parseable GUID.
    #[error("no resources with a valid guid among {scanned} .meta files")]
    NoValidCandidates {
        /// Number of meta files inspected.
        scanned: usize,
    },

    /// The reference text no longer occurs where (or anywhere) it was found.
    #[error("reference not found in document: `{reference}`")]
    ReferenceNotFound {
        /// The reference text that was searched for.
        reference: String,
    },

    /// A rewrite on this document is still running.
    #[error("a rewrite of {} is already in progress", path.display())]
    RewriteInProgress {
        /// Document being rewritten.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// The file is not a Unity text resource guidref knows how to open.
    #[error("unsupported resource: {}", path.display())]
    UnsupportedResource {
        /// Path that was rejected.
        path: PathBuf,
    },

    /// The filesystem watcher could not be set up.
    #[error("watch failed: {reason}")]
    WatchFailed {
        /// Description of the watcher failure.
        reason: String,
    },
}
