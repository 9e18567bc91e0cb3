use std::{fs, os::unix::fs::PermissionsExt};

use dee_model::{EditorPaths, Entry, EntryError};
use nix::unistd::Uid;
use tempfile::tempdir;

const FIREFOX: &str = "[Desktop Entry]
Type=Application
Name=Firefox
Exec=firefox %u
Terminal=false
";

const RICH: &str = "# Installed by the package manager
[Desktop Entry]
Version=1.0
Type=Application
Name=Text Editor
Name[de]=Texteditor
GenericName = Editor
Exec=gedit %U
Terminal=false
MimeType=text/plain;
Categories=GNOME;GTK;Utility;TextEditor;
Actions=new-window;

# per-action overrides
[Desktop Action new-window]
Name=New Window
Exec=gedit --new-window
";

#[test]
fn unmodified_roundtrip_is_byte_identical() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("gedit.desktop");
    let dst = dir.path().join("copy.desktop");
    fs::write(&src, RICH).unwrap();

    let mut entry = Entry::load(&src).unwrap();
    entry.write(&dst).unwrap();
    assert_eq!(fs::read(&dst).unwrap(), RICH.as_bytes());
    assert_eq!(entry.filename(), Some(dst.as_path()));
}

#[test]
fn writing_twice_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gedit.desktop");
    fs::write(&path, RICH).unwrap();

    let mut entry = Entry::load(&path).unwrap();
    entry.set("Comment", "Edit text files");
    entry.write(&path).unwrap();
    let first = fs::read(&path).unwrap();
    entry.write(&path).unwrap();
    assert_eq!(fs::read(&path).unwrap(), first);
}

#[test]
fn edit_touches_only_the_edited_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gedit.desktop");
    fs::write(&path, RICH).unwrap();

    let mut entry = Entry::load(&path).unwrap();
    entry.set("Terminal", true);
    entry.write(&path).unwrap();
    let written = fs::read_to_string(&path).unwrap();
    assert_eq!(written, RICH.replace("Terminal=false", "Terminal=true"));
}

#[test]
fn firefox_edit_write_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("firefox.desktop");
    fs::write(&path, FIREFOX).unwrap();

    let mut entry = Entry::load(&path).unwrap();
    assert_eq!(entry.name(), "Firefox");
    assert_eq!(entry.exec(), "firefox %u");
    assert!(!entry.terminal().unwrap());
    assert!(!entry.is_modified());

    entry.set("Name", "Firefox Browser");
    assert!(entry.is_modified());
    entry.write(&path).unwrap();
    assert!(!entry.is_modified());

    let reloaded = Entry::load(&path).unwrap();
    assert_eq!(reloaded.name(), "Firefox Browser");
    assert!(!reloaded.is_modified());
}

#[test]
fn new_entry_can_be_saved() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("untitled.desktop");

    let mut entry = Entry::new();
    entry.set("Type", "Link");
    entry.set("Name", "Example");
    entry.set("URL", "http://example.com");
    entry.validate().unwrap();
    entry.write(&path).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[Desktop Entry]\nType=Link\nName=Example\nURL=http://example.com\n"
    );
}

#[test]
fn missing_file_is_a_parse_error() {
    let dir = tempdir().unwrap();
    match Entry::load(dir.path().join("nope.desktop")) {
        Err(EntryError::Parse { path, line, .. }) => {
            assert!(path.is_some());
            assert_eq!(line, None);
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn malformed_file_reports_path_and_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.desktop");
    fs::write(&path, "[Desktop Entry]\nType=Application\n[Broken\n").unwrap();
    let err = Entry::load(&path).unwrap_err();
    assert!(err.to_string().contains("bad.desktop:3"));
}

#[test]
fn write_failure_is_surfaced() {
    let dir = tempdir().unwrap();
    let mut entry = Entry::parse(FIREFOX).unwrap();
    entry.set("Name", "Changed");
    let target = dir.path().join("missing-dir").join("x.desktop");
    match entry.write(&target) {
        Err(EntryError::Write { path, .. }) => assert_eq!(path, target),
        other => panic!("expected write error, got {other:?}"),
    }
    assert!(entry.is_modified());
    assert!(entry.filename().is_none());
}

#[test]
fn read_only_follows_file_permissions() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("firefox.desktop");
    fs::write(&path, FIREFOX).unwrap();

    let entry = Entry::load(&path).unwrap();
    assert!(!entry.is_read_only());
    assert!(!Entry::new().is_read_only());

    // root bypasses permission bits
    if Uid::effective().is_root() {
        return;
    }
    fs::set_permissions(&path, fs::Permissions::from_mode(0o444)).unwrap();
    assert!(entry.is_read_only());
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(!entry.is_read_only());
}

#[test]
fn entries_under_system_data_dirs_are_read_only() {
    let root = tempdir().unwrap();
    let home = root.path().join("home/.local/share");
    let system = root.path().join("usr/share");
    let paths = EditorPaths::with_roots(root.path().join("config"), home.clone(), vec![system.clone()]);
    fs::create_dir_all(home.join("applications")).unwrap();
    fs::create_dir_all(system.join("applications")).unwrap();
    let installed = system.join("applications/firefox.desktop");
    let personal = home.join("applications/firefox.desktop");
    fs::write(&installed, FIREFOX).unwrap();
    fs::write(&personal, FIREFOX).unwrap();

    // holds for every user, root included
    assert!(Entry::load(&installed).unwrap().is_read_only_in(&paths));
    assert!(!Entry::load(&personal).unwrap().is_read_only_in(&paths));
    assert!(!Entry::new().is_read_only_in(&paths));

    // saving a copy to the user dir makes the entry writable again
    let mut entry = Entry::load(&installed).unwrap();
    entry.write(&personal).unwrap();
    assert!(!entry.is_read_only_in(&paths));
}
