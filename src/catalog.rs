//! Enumerate every project resource with its GUID, for the replacement picker.
//! Independent of the resolver cache: this lists all resources, the resolver
//! looks up specific ones.

use rayon::prelude::*;

use crate::error::Error;
use crate::types::ResourceDescriptor;
use crate::workspace::{Workspace, display_name_for_meta};

/// Read every `.meta` file and build one descriptor per file with a GUID.
/// Unreadable files and files without a GUID are skipped. Sorted by display
/// name, then path.
///
/// # Errors
///
/// Returns `Error::NoMetaFilesFound` if the project has no meta files,
/// `Error::NoValidCandidates` if none of them declares a GUID,
/// or listing errors from the workspace.
pub fn list_resources(workspace: &dyn Workspace) -> Result<Vec<ResourceDescriptor>, Error> {
    let metas = workspace.list_meta_files()?;
    if metas.is_empty() {
        return Err(Error::NoMetaFilesFound {
            root: workspace.root().to_path_buf(),
        });
    }

    let mut resources: Vec<ResourceDescriptor> = metas
        .par_iter()
        .filter_map(|path| {
            return match workspace.read_meta_guid(path) {
                Ok(Some(guid)) => Some(ResourceDescriptor {
                    display_name: display_name_for_meta(path),
                    guid,
                    path: path.clone(),
                }),
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "meta file has no guid");
                    None
                },
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping meta file");
                    None
                },
            };
        })
        .collect();

    if resources.is_empty() {
        return Err(Error::NoValidCandidates {
            scanned: metas.len(),
        });
    }

    resources.sort_by(|a, b| {
        return a
            .display_name
            .to_lowercase()
            .cmp(&b.display_name.to_lowercase())
            .then_with(|| return a.path.cmp(&b.path));
    });
    tracing::debug!(count = resources.len(), "listed resources");
    return Ok(resources);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::memory::MemoryWorkspace;

    #[test]
    fn lists_resources_sorted_and_skips_broken_meta() {
        let workspace = MemoryWorkspace::default();
        workspace.insert_meta("Assets/sword.asset", "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        workspace.insert_meta("Assets/Hero.prefab", "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        workspace.insert_unreadable("Assets/Broken.asset.meta");
        workspace.insert("Assets/Folder.meta", "fileFormatVersion: 2\nfolderAsset: yes\n");

        let resources = list_resources(&workspace).unwrap();
        let names: Vec<&str> = resources.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, vec!["Hero.prefab", "sword.asset"]);
        assert_eq!(resources[0].guid.as_str(), "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    }

    #[test]
    fn empty_project_has_no_meta_files() {
        let workspace = MemoryWorkspace::default();
        assert!(matches!(list_resources(&workspace), Err(Error::NoMetaFilesFound { .. })));
    }

    #[test]
    fn project_without_guids_has_no_candidates() {
        let workspace = MemoryWorkspace::default();
        workspace.insert("Assets/Folder.meta", "fileFormatVersion: 2\n");
        workspace.insert_unreadable("Assets/Broken.asset.meta");
        assert!(matches!(
            list_resources(&workspace),
            Err(Error::NoValidCandidates { scanned: 2 })
        ));
    }
}
