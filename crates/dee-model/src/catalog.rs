use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{EditorPaths, Entry, Settings};

/// One launcher found while scanning the applications directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub path: PathBuf,
    pub name: String,
    /// GenericName when set, Name otherwise.
    pub tooltip: String,
    pub icon: String,
    pub read_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
}

impl Catalog {
    /// Collects every `*.desktop` file under the applications directories and
    /// the configured extra directories, sorted by name. Files that fail to
    /// parse are skipped.
    pub fn scan(paths: &EditorPaths, settings: &Settings) -> Self {
        let dirs = paths
            .applications_dirs()
            .into_iter()
            .chain(settings.extra_search_dirs.iter().cloned());

        let mut items = Vec::new();
        for dir in dirs {
            debug!(target: "catalog", dir = %dir.display(), "loading desktop entries");
            for path in desktop_files(&dir) {
                let entry = match Entry::load(&path) {
                    Ok(entry) => entry,
                    Err(err) => {
                        warn!(target: "catalog", path = %path.display(), error = %err, "skipping desktop entry");
                        continue;
                    }
                };
                let read_only = paths.is_read_only(&path);
                if read_only && !settings.show_read_only_files {
                    continue;
                }
                items.push(item_for(path, &entry, read_only));
            }
        }
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));
        Self { items }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

fn item_for(path: PathBuf, entry: &Entry, read_only: bool) -> CatalogItem {
    let name = entry.name().to_string();
    let tooltip = match entry.generic_name() {
        "" => name.clone(),
        generic => generic.to_string(),
    };
    CatalogItem {
        path,
        name,
        tooltip,
        icon: entry.icon().to_string(),
        read_only,
    }
}

fn desktop_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(read) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = read
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("desktop"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, file: &str, text: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(file), text).unwrap();
    }

    #[test]
    fn scans_sorts_and_skips_broken_files() {
        let root = tempdir().unwrap();
        let user = root.path().join("home/share/applications");
        let system = root.path().join("usr/share/applications");
        write(&user, "zed.desktop", "[Desktop Entry]\nType=Application\nName=Zed\nExec=zed\n");
        write(
            &system,
            "files.desktop",
            "[Desktop Entry]\nType=Application\nName=Files\nGenericName=File Manager\nIcon=folder\nExec=nautilus\n",
        );
        write(&system, "broken.desktop", "Name=Orphan\n");
        write(&system, "notes.txt", "[Desktop Entry]\nName=Ignored\n");

        let paths = EditorPaths::with_roots(
            root.path().join("config"),
            root.path().join("home/share"),
            vec![root.path().join("usr/share")],
        );
        let catalog = Catalog::scan(&paths, &Settings::default());
        let names: Vec<_> = catalog.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Files", "Zed"]);

        let files = &catalog.items()[0];
        assert_eq!(files.tooltip, "File Manager");
        assert_eq!(files.icon, "folder");
        assert!(files.read_only);
        let zed = &catalog.items()[1];
        assert_eq!(zed.tooltip, "Zed");
        assert!(!zed.read_only);

        let hidden = Settings {
            show_read_only_files: false,
            ..Settings::default()
        };
        let catalog = Catalog::scan(&paths, &hidden);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.items()[0].name, "Zed");
    }

    #[test]
    fn extra_search_dirs_are_scanned() {
        let root = tempdir().unwrap();
        let extra = root.path().join("extra");
        write(&extra, "tool.desktop", "[Desktop Entry]\nType=Application\nName=Tool\nExec=tool\n");
        let paths = EditorPaths::with_roots(
            root.path().join("config"),
            root.path().join("home/share"),
            Vec::new(),
        );
        let settings = Settings {
            extra_search_dirs: vec![extra],
            ..Settings::default()
        };
        let catalog = Catalog::scan(&paths, &settings);
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.items()[0].read_only);
    }
}
