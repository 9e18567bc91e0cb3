use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use directories::BaseDirs;
use nix::unistd::{access, AccessFlags};
use serde::{Deserialize, Serialize};
use tracing::debug;

mod catalog;
mod entry;
mod error;
mod keys;
mod locale;

pub use catalog::{Catalog, CatalogItem};
pub use entry::{
    is_valid_group, is_valid_key, join_list, split_list, Entry, EntryType, Value,
    DESKTOP_ENTRY_GROUP,
};
pub use error::{EntryError, Violations};
pub use keys::{Field, RecognizedKey, ValueKind, RECOGNIZED_KEYS};
pub use locale::{split_locale, Locale};

const DEFAULT_DATA_DIRS: &[&str] = &["/usr/local/share", "/usr/share"];

/// User and system XDG locations the editor reads from and saves to.
#[derive(Debug, Clone)]
pub struct EditorPaths {
    config_dir: PathBuf,
    data_home: PathBuf,
    data_dirs: Vec<PathBuf>,
}

impl EditorPaths {
    pub fn new() -> Result<Self> {
        let dirs = BaseDirs::new().context("unable to resolve XDG base directories")?;
        Ok(Self {
            config_dir: dirs.config_dir().join("dee"),
            data_home: dirs.data_dir().to_path_buf(),
            data_dirs: system_data_dirs(),
        })
    }

    /// Explicit roots, for tests and callers that sandbox the editor.
    pub fn with_roots(config_dir: PathBuf, data_home: PathBuf, data_dirs: Vec<PathBuf>) -> Self {
        Self {
            config_dir,
            data_home,
            data_dirs,
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join("settings.toml")
    }

    pub fn data_home(&self) -> &Path {
        &self.data_home
    }

    pub fn data_dirs(&self) -> &[PathBuf] {
        &self.data_dirs
    }

    /// `applications` under the user data home, then under each system data dir.
    pub fn applications_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(&self.data_home)
            .chain(self.data_dirs.iter())
            .map(|dir| dir.join("applications"))
            .collect()
    }

    /// First existing applications directory the current user can write to.
    pub fn default_save_dir(&self) -> Option<PathBuf> {
        self.applications_dirs()
            .into_iter()
            .find(|dir| dir.is_dir() && is_writable(dir))
    }

    /// A file is read-only when it exists without write permission for the
    /// current user, or when it sits under a system data dir rather than the
    /// user's data home.
    pub fn is_read_only(&self, path: &Path) -> bool {
        if path.exists() && !is_writable(path) {
            return true;
        }
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if under(&path, &self.data_home) {
            return false;
        }
        self.data_dirs.iter().any(|dir| under(&path, dir))
    }
}

fn under(path: &Path, dir: &Path) -> bool {
    let dir = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
    path.starts_with(dir)
}

fn system_data_dirs() -> Vec<PathBuf> {
    let dirs: Vec<PathBuf> = env::var_os("XDG_DATA_DIRS")
        .map(|value| env::split_paths(&value).filter(|p| p.is_absolute()).collect())
        .unwrap_or_default();
    if dirs.is_empty() {
        DEFAULT_DATA_DIRS.iter().map(PathBuf::from).collect()
    } else {
        dirs
    }
}

pub(crate) fn is_writable(path: &Path) -> bool {
    access(path, AccessFlags::W_OK).is_ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Settings {
    #[serde(default = "default_show_read_only_files")]
    pub show_read_only_files: bool,
    /// Scanned for launchers in addition to the XDG applications directories.
    #[serde(default)]
    pub extra_search_dirs: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_read_only_files: default_show_read_only_files(),
            extra_search_dirs: Vec::new(),
        }
    }
}

fn default_show_read_only_files() -> bool {
    true
}

#[derive(Clone)]
pub struct SettingsRepository {
    paths: EditorPaths,
}

impl SettingsRepository {
    pub fn new(paths: EditorPaths) -> Self {
        Self { paths }
    }

    pub fn load(&self) -> Result<Settings> {
        let path = self.paths.settings_path();
        if !path.exists() {
            debug!(target: "settings", path = %path.display(), "no settings file; using defaults");
            return Ok(Settings::default());
        }
        let data =
            fs::read_to_string(&path).with_context(|| format!("read settings file {path:?}"))?;
        let settings: Settings =
            toml::from_str(&data).with_context(|| format!("parse settings file {path:?}"))?;
        Ok(settings)
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let path = self.paths.settings_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {parent:?}"))?;
        }
        let data = toml::to_string_pretty(settings).context("serialize settings")?;
        fs::write(&path, data).with_context(|| format!("write settings file {path:?}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn paths_in(root: &Path) -> EditorPaths {
        EditorPaths::with_roots(
            root.join("config"),
            root.join("home/share"),
            vec![root.join("usr/share")],
        )
    }

    #[test]
    fn settings_defaults_when_missing() {
        let root = tempdir().unwrap();
        let repo = SettingsRepository::new(paths_in(root.path()));
        let settings = repo.load().unwrap();
        assert!(settings.show_read_only_files);
        assert!(settings.extra_search_dirs.is_empty());
    }

    #[test]
    fn settings_roundtrip() {
        let root = tempdir().unwrap();
        let repo = SettingsRepository::new(paths_in(root.path()));
        let settings = Settings {
            show_read_only_files: false,
            extra_search_dirs: vec![PathBuf::from("/opt/launchers")],
        };
        repo.save(&settings).unwrap();
        assert_eq!(repo.load().unwrap(), settings);
    }

    #[test]
    fn partial_settings_file_fills_defaults() {
        let root = tempdir().unwrap();
        let paths = paths_in(root.path());
        fs::create_dir_all(root.path().join("config")).unwrap();
        fs::write(paths.settings_path(), "extra_search_dirs = [\"/srv\"]\n").unwrap();
        let settings = SettingsRepository::new(paths).load().unwrap();
        assert!(settings.show_read_only_files);
        assert_eq!(settings.extra_search_dirs, [PathBuf::from("/srv")]);
    }

    #[test]
    fn applications_dirs_put_user_first() {
        let root = tempdir().unwrap();
        let paths = paths_in(root.path());
        assert_eq!(
            paths.applications_dirs(),
            [
                root.path().join("home/share/applications"),
                root.path().join("usr/share/applications"),
            ]
        );
    }

    #[test]
    fn default_save_dir_skips_missing_dirs() {
        let root = tempdir().unwrap();
        let paths = paths_in(root.path());
        assert_eq!(paths.default_save_dir(), None);

        let system = root.path().join("usr/share/applications");
        fs::create_dir_all(&system).unwrap();
        assert_eq!(paths.default_save_dir(), Some(system));

        let user = root.path().join("home/share/applications");
        fs::create_dir_all(&user).unwrap();
        assert_eq!(paths.default_save_dir(), Some(user));
    }

    #[test]
    fn system_location_is_read_only() {
        let root = tempdir().unwrap();
        let paths = paths_in(root.path());
        let system = root.path().join("usr/share/applications");
        let user = root.path().join("home/share/applications");
        fs::create_dir_all(&system).unwrap();
        fs::create_dir_all(&user).unwrap();
        fs::write(system.join("a.desktop"), "[Desktop Entry]\n").unwrap();
        fs::write(user.join("a.desktop"), "[Desktop Entry]\n").unwrap();

        assert!(paths.is_read_only(&system.join("a.desktop")));
        assert!(!paths.is_read_only(&user.join("a.desktop")));
        assert!(!paths.is_read_only(&root.path().join("elsewhere.desktop")));
    }
}
