use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use dee_icons::{classify, load_icon, IconSource};
use dee_model::{
    is_valid_group, is_valid_key, Catalog, EditorPaths, Entry, EntryError, Field, Locale, SettingsRepository,
    Value, ValueKind, DESKTOP_ENTRY_GROUP, RECOGNIZED_KEYS,
};
use tracing::{info, warn};

fn load(file: &Path) -> Result<Entry> {
    Entry::load(file).with_context(|| format!("open desktop entry {file:?}"))
}

/// Recognized boolean keys only accept `true`/`false`; everything else is stored as text.
fn typed_value(group: &str, key: &str, raw: &str) -> Result<Value> {
    let boolean = group == DESKTOP_ENTRY_GROUP
        && Field::from_key(key).is_some_and(|f| f.kind() == ValueKind::Boolean);
    if !boolean {
        return Ok(Value::from(raw));
    }
    match raw {
        "true" => Ok(Value::Boolean(true)),
        "false" => Ok(Value::Boolean(false)),
        other => bail!("{key} is a boolean key; expected `true` or `false`, got {other:?}"),
    }
}

fn check_names(group: &str, key: &str) -> Result<()> {
    if !is_valid_group(group) {
        bail!("invalid group name {group:?}");
    }
    if !is_valid_key(key) {
        bail!("invalid key name {key:?}");
    }
    Ok(())
}

fn parse_edit(edit: &str) -> Result<(&str, &str)> {
    let (key, value) = edit
        .split_once('=')
        .with_context(|| format!("expected KEY=VALUE, got {edit:?}"))?;
    let key = key.trim();
    if !is_valid_key(key) {
        bail!("invalid key name {key:?}");
    }
    Ok((key, value))
}

fn save(entry: &mut Entry, target: &Path) -> Result<()> {
    if entry.filename() == Some(target) && entry.is_read_only() {
        bail!("{target:?} is read-only; use --output to save a copy");
    }
    entry.write(target)?;
    info!(target: "cli", path = %target.display(), "saved desktop entry");
    Ok(())
}

pub fn show(file: &Path) -> Result<()> {
    let entry = load(file)?;
    let marker = if entry.is_read_only() { " (read-only)" } else { "" };
    println!("# {}{marker}", file.display());
    for known in RECOGNIZED_KEYS.iter() {
        match entry.field(known.field) {
            Ok(Some(value)) => println!("{}={}", known.key, value),
            Ok(None) => {}
            Err(err) => println!("{}={} # {err}", known.key, entry.get(known.key)?),
        }
    }
    for group in entry.groups() {
        let extra: Vec<&str> = entry
            .keys_in(group)
            .into_iter()
            .filter(|key| group != DESKTOP_ENTRY_GROUP || Field::from_key(key).is_none())
            .collect();
        if extra.is_empty() {
            continue;
        }
        println!("[{group}]");
        for key in extra {
            println!("{key}={}", entry.get_in(group, key)?);
        }
    }
    Ok(())
}

/// With no explicit locale, `[Desktop Entry]` lookups follow the session locale.
fn lookup<'e>(entry: &'e Entry, group: &str, key: &str, locale: Option<&str>) -> Result<&'e str> {
    check_names(group, key)?;
    if group != DESKTOP_ENTRY_GROUP {
        if locale.is_some() {
            bail!("--locale only applies to [{DESKTOP_ENTRY_GROUP}]");
        }
        return Ok(entry.get_in(group, key)?);
    }
    match locale.map(Locale::parse).or_else(Locale::from_env) {
        Some(locale) => entry
            .get_localized(key, &locale)
            .with_context(|| format!("{key} not found in [{group}]")),
        None => Ok(entry.get_in(group, key)?),
    }
}

pub fn get(file: &Path, group: &str, key: &str, locale: Option<&str>) -> Result<()> {
    let entry = load(file)?;
    let value = lookup(&entry, group, key, locale).with_context(|| format!("read {file:?}"))?;
    println!("{value}");
    Ok(())
}

pub fn set(file: &Path, group: &str, key: &str, value: &str, output: Option<&Path>) -> Result<()> {
    check_names(group, key)?;
    let mut entry = load(file)?;
    entry.set_in(group, key, typed_value(group, key, value)?);
    save(&mut entry, output.unwrap_or(file))
}

pub fn unset(file: &Path, group: &str, key: &str, output: Option<&Path>) -> Result<()> {
    check_names(group, key)?;
    let mut entry = load(file)?;
    if !entry.remove_in(group, key) {
        warn!(target: "cli", key, group, "key not present; nothing to remove");
        return Ok(());
    }
    save(&mut entry, output.unwrap_or(file))
}

pub struct NewEntry {
    pub path: PathBuf,
    pub name: String,
    pub entry_type: String,
    pub exec: Option<String>,
    pub in_default_dir: bool,
    pub force: bool,
}

pub fn new(args: NewEntry) -> Result<()> {
    let path = if args.in_default_dir {
        let paths = EditorPaths::new()?;
        let dir = paths
            .default_save_dir()
            .context("no writable applications directory found")?;
        dir.join(&args.path)
    } else {
        args.path
    };
    if path.exists() && !args.force {
        bail!("{path:?} already exists; pass --force to replace it");
    }

    let mut entry = Entry::new();
    entry.set("Type", args.entry_type.as_str());
    entry.set("Name", args.name.as_str());
    if let Some(exec) = &args.exec {
        entry.set("Exec", exec.as_str());
    }
    entry.write(&path)?;
    info!(target: "cli", path = %path.display(), "created desktop entry");
    if let Err(err) = entry.validate() {
        warn!(target: "cli", error = %err, "new entry is incomplete");
    }
    println!("{}", path.display());
    Ok(())
}

pub fn validate(files: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for file in files {
        let result = Entry::load(file).and_then(|entry| entry.validate());
        match result {
            Ok(()) => println!("{}: ok", file.display()),
            Err(EntryError::Validation(violations)) => {
                failed += 1;
                for violation in violations.iter() {
                    println!("{}: {violation}", file.display());
                }
            }
            Err(err) => {
                failed += 1;
                println!("{}: {err}", file.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} entries failed validation", files.len());
    }
    Ok(())
}

pub fn preview(file: &Path, edits: &[String]) -> Result<()> {
    let mut entry = load(file)?;
    for edit in edits {
        let (key, value) = parse_edit(edit)?;
        entry.set(key, typed_value(DESKTOP_ENTRY_GROUP, key, value)?);
    }
    print!("{}", entry.preview()?);
    Ok(())
}

pub fn keys() -> Result<()> {
    for known in RECOGNIZED_KEYS.iter() {
        let kind = if known.list {
            format!("{} list", known.kind)
        } else {
            known.kind.to_string()
        };
        println!("{:<16} {:<12} {}", known.key, kind, known.description);
    }
    Ok(())
}

pub fn list(all: bool) -> Result<()> {
    let paths = EditorPaths::new()?;
    let mut settings = SettingsRepository::new(paths.clone()).load()?;
    if all {
        settings.show_read_only_files = true;
    }
    let catalog = Catalog::scan(&paths, &settings);
    for item in catalog.items() {
        let marker = if item.read_only { " (read-only)" } else { "" };
        println!("{}{marker}\t{}\t{}", item.name, item.tooltip, item.path.display());
    }
    info!(target: "cli", count = catalog.len(), "listed launchers");
    Ok(())
}

pub fn icon(file: &Path, size: u32) -> Result<()> {
    let entry = load(file)?;
    match classify(entry.icon()) {
        IconSource::Empty => println!("no icon set"),
        IconSource::Named(name) => println!("themed icon name: {name}"),
        IconSource::File(path) => {
            let img = load_icon(&path, size)?;
            println!(
                "icon file: {} (rendered at {}x{})",
                path.display(),
                img.width(),
                img.height()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn boolean_keys_are_typed() {
        assert_eq!(
            typed_value(DESKTOP_ENTRY_GROUP, "Terminal", "true").unwrap(),
            Value::Boolean(true)
        );
        assert!(typed_value(DESKTOP_ENTRY_GROUP, "Terminal", "yes").is_err());
        assert_eq!(
            typed_value("Desktop Action new", "Terminal", "yes").unwrap(),
            Value::from("yes")
        );
        assert_eq!(
            typed_value(DESKTOP_ENTRY_GROUP, "Name", "true").unwrap(),
            Value::from("true")
        );
    }

    #[test]
    fn edits_split_on_first_equals() {
        assert_eq!(parse_edit("Exec=env A=b app").unwrap(), ("Exec", "env A=b app"));
        assert!(parse_edit("NoEquals").is_err());
        assert!(parse_edit("Bad Key=1").is_err());
    }

    #[test]
    fn set_writes_to_output_and_keeps_source() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.desktop");
        let out = dir.path().join("out.desktop");
        fs::write(&src, "[Desktop Entry]\nType=Application\nName=App\nExec=app\n").unwrap();

        set(&src, DESKTOP_ENTRY_GROUP, "Terminal", "true", Some(&out)).unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "[Desktop Entry]\nType=Application\nName=App\nExec=app\nTerminal=true\n"
        );
        assert!(!fs::read_to_string(&src).unwrap().contains("Terminal"));

        unset(&out, DESKTOP_ENTRY_GROUP, "Exec", None).unwrap();
        assert!(!fs::read_to_string(&out).unwrap().contains("Exec"));
    }

    #[test]
    fn malformed_group_names_are_refused() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("app.desktop");
        let text = "[Desktop Entry]\nType=Application\nName=App\nExec=app\n";
        fs::write(&src, text).unwrap();

        let err = set(&src, "Bad]Group", "Key", "v", None).unwrap_err();
        assert!(err.to_string().contains("invalid group name"));
        assert!(unset(&src, "[Other", "Name", None).is_err());
        assert!(get(&src, "", "Name", None).is_err());
        assert_eq!(fs::read_to_string(&src).unwrap(), text);

        set(&src, "Desktop Action new", "Name", "New", None).unwrap();
        let entry = Entry::load(&src).unwrap();
        assert_eq!(entry.get_in("Desktop Action new", "Name").unwrap(), "New");
    }

    #[test]
    fn explicit_locale_picks_translation() {
        let entry =
            Entry::parse("[Desktop Entry]\nName=Files\nName[de]=Dateien\n[Extra]\nName=X\n")
                .unwrap();
        assert_eq!(
            lookup(&entry, DESKTOP_ENTRY_GROUP, "Name", Some("de_DE.UTF-8")).unwrap(),
            "Dateien"
        );
        assert_eq!(
            lookup(&entry, DESKTOP_ENTRY_GROUP, "Name", Some("fr_FR")).unwrap(),
            "Files"
        );
        assert_eq!(lookup(&entry, "Extra", "Name", None).unwrap(), "X");
        assert!(lookup(&entry, "Extra", "Name", Some("de")).is_err());
        assert!(lookup(&entry, DESKTOP_ENTRY_GROUP, "Comment", Some("de")).is_err());
    }

    #[test]
    fn new_refuses_to_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh.desktop");
        let args = |force| NewEntry {
            path: path.clone(),
            name: "Untitled".into(),
            entry_type: "Application".into(),
            exec: Some("true".into()),
            in_default_dir: false,
            force,
        };
        new(args(false)).unwrap();
        assert!(new(args(false)).is_err());
        new(args(true)).unwrap();
        let entry = Entry::load(&path).unwrap();
        assert_eq!(entry.name(), "Untitled");
        entry.validate().unwrap();
    }

    #[test]
    fn validate_reports_failures() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.desktop");
        let bad = dir.path().join("bad.desktop");
        fs::write(&good, "[Desktop Entry]\nType=Link\nName=Example\nURL=http://example.com\n")
            .unwrap();
        fs::write(&bad, "[Desktop Entry]\nType=Application\nName=NoExec\n").unwrap();
        validate(&[good.clone()]).unwrap();
        assert!(validate(&[good, bad]).is_err());
    }
}
