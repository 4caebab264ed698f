use std::path::Path;

use crate::error::Error;

/// Directory names skipped by default during `.meta` scans: Unity's build
/// cache and scratch directories plus the package manager's install tree.
const DEFAULT_EXCLUDE_DIRS: [&str; 4] = ["library", "temp", "obj", "node_modules"];

/// Project configuration loaded from `.guidref.toml`.
/// Include/exclude patterns are path prefixes applied to `.meta` files relative
/// to the project root; `exclude_dirs` prunes whole directory trees by name.
#[derive(Debug, Clone)]
pub struct Config {
    exclude: Vec<String>,
    exclude_dirs: Vec<String>,
    include: Vec<String>,
}

/// Raw TOML structure for `.guidref.toml`.
#[derive(serde::Deserialize)]
struct GuidrefTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    exclude_dirs: Option<Vec<String>>,
    #[serde(default)]
    include: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|d| return (*d).to_string()).collect(),
            include: Vec::new(),
        };
    }
}

impl Config {
    /// Check whether a directory should be pruned from the walk.
    /// Names compare case-insensitively; hidden directories are always skipped.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        if name.starts_with('.') && name != "." && name != ".." {
            return true;
        }
        return self.exclude_dirs.iter().any(|d| return d.eq_ignore_ascii_case(name));
    }

    /// Load config from `.guidref.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(".guidref.toml");
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        return Self::parse(&content);
    }

    /// Parse config from TOML text, filling unset keys with defaults.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: GuidrefTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();
        return Ok(Self {
            exclude: raw.exclude,
            exclude_dirs: raw.exclude_dirs.unwrap_or(defaults.exclude_dirs),
            include: raw.include,
        });
    }

    /// Check whether a `.meta` file path (relative to the root) should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_exclude_library_case_insensitively() {
        let config = Config::default();
        assert!(config.is_excluded_dir("Library"));
        assert!(config.is_excluded_dir("LIBRARY"));
        assert!(config.is_excluded_dir("node_modules"));
        assert!(config.is_excluded_dir(".git"));
        assert!(!config.is_excluded_dir("Assets"));
    }

    #[test]
    fn include_and_exclude_prefixes() {
        let config = Config::parse(
            "include = [\"Assets/\"]\nexclude = [\"Assets/ThirdParty/\"]\n",
        )
        .unwrap();
        assert!(config.should_scan("Assets/Data/Item.asset.meta"));
        assert!(!config.should_scan("Assets/ThirdParty/Lib.asset.meta"));
        assert!(!config.should_scan("Packages/x.asset.meta"));
    }

    #[test]
    fn unset_keys_keep_defaults() {
        let config = Config::parse("exclude_dirs = [\"Build\"]\n").unwrap();
        assert!(config.is_excluded_dir("build"));
        assert!(!config.is_excluded_dir("Library"));
        assert!(config.should_scan("Assets/a.meta"));
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(matches!(Config::parse("include = 3"), Err(Error::TomlDe(_))));
    }
}
