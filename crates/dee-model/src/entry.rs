use std::{
    borrow::Cow,
    fmt, fs,
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use url::Url;

use crate::{
    error::{EntryError, Result, Violations},
    keys::{Field, ValueKind},
    locale::{split_locale, Locale},
    EditorPaths,
};

pub const DESKTOP_ENTRY_GROUP: &str = "Desktop Entry";

/// The `Type` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryType {
    Application,
    Link,
    Directory,
    /// Anything else, including an absent key (empty string).
    Unknown(String),
}

impl EntryType {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Application" => Self::Application,
            "Link" => Self::Link,
            "Directory" => Self::Directory,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Application => "Application",
            Self::Link => "Link",
            Self::Directory => "Directory",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value handed to [`Entry::set`], or read back through [`Entry::field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Boolean(bool),
    List(Vec<String>),
}

impl Value {
    /// The text stored in the file for this value.
    pub fn to_raw(&self) -> String {
        match self {
            Self::String(s) => s.replace('\n', "\\n").replace('\r', "\\r"),
            Self::Boolean(b) => b.to_string(),
            Self::List(items) => join_list(items),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Self::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<&[&str]> for Value {
    fn from(value: &[&str]) -> Self {
        Self::List(value.iter().map(|s| s.to_string()).collect())
    }
}

impl From<EntryType> for Value {
    fn from(value: EntryType) -> Self {
        Self::String(value.as_str().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Pair {
    /// Full key, locale suffix included.
    key: String,
    value: String,
    /// Line as read from disk; dropped once the value is edited.
    raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    Blank(String),
    Comment(String),
    Pair(Pair),
}

impl Line {
    fn render(&self) -> Cow<'_, str> {
        match self {
            Line::Blank(raw) | Line::Comment(raw) => Cow::Borrowed(raw.as_str()),
            Line::Pair(Pair { raw: Some(raw), .. }) => Cow::Borrowed(raw.as_str()),
            Line::Pair(Pair { key, value, .. }) => Cow::Owned(format!("{key}={value}")),
        }
    }

    fn pair(&self) -> Option<&Pair> {
        match self {
            Line::Pair(pair) => Some(pair),
            _ => None,
        }
    }

    fn pair_mut(&mut self) -> Option<&mut Pair> {
        match self {
            Line::Pair(pair) => Some(pair),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    name: String,
    header: Option<String>,
    lines: Vec<Line>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            header: None,
            lines: Vec::new(),
        }
    }

    fn render_header(&self) -> Cow<'_, str> {
        match &self.header {
            Some(raw) => Cow::Borrowed(raw.as_str()),
            None => Cow::Owned(format!("[{}]", self.name)),
        }
    }
}

/// One desktop entry file: ordered groups of ordered key/value lines.
///
/// Comments and blank lines stay where they were read, and lines that are not
/// edited are written back with their original bytes. When a group header or a
/// key appears more than once, the last occurrence wins for lookups and is the
/// one [`Entry::set`] updates; earlier occurrences are kept as they are.
///
/// An `Entry` has no internal locking; mutation goes through `&mut self`.
#[derive(Debug, Clone)]
pub struct Entry {
    filename: Option<PathBuf>,
    preamble: Vec<Line>,
    sections: Vec<Section>,
    /// Leading U+FEFF, written back as read.
    bom: bool,
    trailing_newline: bool,
    modified: bool,
}

impl Default for Entry {
    fn default() -> Self {
        Self::new()
    }
}

impl Entry {
    /// A fresh entry with an empty `[Desktop Entry]` group and no backing file.
    pub fn new() -> Self {
        Self {
            filename: None,
            preamble: Vec::new(),
            sections: vec![Section::new(DESKTOP_ENTRY_GROUP)],
            bom: false,
            trailing_newline: true,
            modified: false,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| EntryError::Parse {
            path: Some(path.to_path_buf()),
            line: None,
            message: format!("cannot read file: {err}"),
        })?;
        let mut entry = Self::parse(&text).map_err(|err| err.with_path(path.to_path_buf()))?;
        entry.filename = Some(path.to_path_buf());
        Ok(entry)
    }

    /// Parses desktop entry text. The result has no backing file.
    pub fn parse(text: &str) -> Result<Self> {
        let (bom, text) = match text.strip_prefix('\u{feff}') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let mut entry = Self {
            filename: None,
            preamble: Vec::new(),
            sections: Vec::new(),
            bom,
            trailing_newline: text.is_empty() || text.ends_with('\n'),
            modified: false,
        };
        if text.is_empty() {
            return Ok(entry);
        }

        let body = text.strip_suffix('\n').unwrap_or(text);
        for (idx, raw) in body.split('\n').enumerate() {
            let number = idx + 1;
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let trimmed = line.trim();

            if trimmed.is_empty() {
                entry.push_line(Line::Blank(raw.to_string()));
                continue;
            }
            if trimmed.starts_with('#') {
                entry.push_line(Line::Comment(raw.to_string()));
                continue;
            }
            if trimmed.starts_with('[') {
                let name = parse_group_header(trimmed).ok_or_else(|| {
                    EntryError::parse(number, format!("malformed group header {trimmed:?}"))
                })?;
                entry.sections.push(Section {
                    name: name.to_string(),
                    header: Some(raw.to_string()),
                    lines: Vec::new(),
                });
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(EntryError::parse(
                    number,
                    format!("expected `Key=Value`, a comment or a group header, found {trimmed:?}"),
                ));
            };
            let key = key.trim();
            if !is_valid_key(key) {
                return Err(EntryError::parse(number, format!("invalid key name {key:?}")));
            }
            let Some(section) = entry.sections.last_mut() else {
                return Err(EntryError::parse(
                    number,
                    format!("key {key:?} appears before the first group header"),
                ));
            };
            section.lines.push(Line::Pair(Pair {
                key: key.to_string(),
                value: value.trim_start().to_string(),
                raw: Some(raw.to_string()),
            }));
        }
        Ok(entry)
    }

    fn push_line(&mut self, line: Line) {
        match self.sections.last_mut() {
            Some(section) => section.lines.push(line),
            None => self.preamble.push(line),
        }
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Whether the backing file cannot be saved in place by the current user.
    ///
    /// Checked against the file system on every call. An entry without a
    /// backing file is never read-only.
    pub fn is_read_only(&self) -> bool {
        match EditorPaths::new() {
            Ok(paths) => self.is_read_only_in(&paths),
            Err(_) => self
                .filename
                .as_deref()
                .is_some_and(|path| path.exists() && !crate::is_writable(path)),
        }
    }

    /// [`Entry::is_read_only`] against explicit data directories.
    pub fn is_read_only_in(&self, paths: &EditorPaths) -> bool {
        self.filename
            .as_deref()
            .is_some_and(|path| paths.is_read_only(path))
    }

    /// Group names in file order, duplicates folded.
    pub fn groups(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for section in &self.sections {
            if !names.contains(&section.name.as_str()) {
                names.push(&section.name);
            }
        }
        names
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.sections.iter().any(|s| s.name == group)
    }

    /// Keys of `group` in file order (locale-suffixed keys included), duplicates folded.
    pub fn keys_in(&self, group: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for pair in self.pairs(group) {
            if !keys.contains(&pair.key.as_str()) {
                keys.push(&pair.key);
            }
        }
        keys
    }

    fn pairs<'a, 'g>(&'a self, group: &'g str) -> impl Iterator<Item = &'a Pair> + 'g
    where
        'a: 'g,
    {
        self.sections
            .iter()
            .filter(move |s| s.name == group)
            .flat_map(|s| s.lines.iter())
            .filter_map(Line::pair)
    }

    fn lookup(&self, group: &str, key: &str) -> Option<&str> {
        self.pairs(group)
            .filter(|p| p.key == key)
            .last()
            .map(|p| p.value.as_str())
    }

    /// Raw value of `key` in `[Desktop Entry]`.
    pub fn get(&self, key: &str) -> Result<&str> {
        self.get_in(DESKTOP_ENTRY_GROUP, key)
    }

    pub fn get_in(&self, group: &str, key: &str) -> Result<&str> {
        self.lookup(group, key)
            .ok_or_else(|| EntryError::KeyNotFound {
                group: group.to_string(),
                key: key.to_string(),
            })
    }

    /// Typed value of a recognized key: `Ok(None)` when absent, an error when
    /// a boolean key holds something other than `true`/`false`.
    pub fn field(&self, field: Field) -> Result<Option<Value>> {
        let Some(raw) = self.lookup(DESKTOP_ENTRY_GROUP, field.key()) else {
            return Ok(None);
        };
        let value = match (field.kind(), field.is_list()) {
            (ValueKind::Boolean, _) => Value::Boolean(parse_bool(field.key(), raw)?),
            (ValueKind::String, true) => Value::List(split_list(raw)),
            (ValueKind::String, false) => Value::String(raw.to_string()),
        };
        Ok(Some(value))
    }

    fn string_field(&self, field: Field) -> &str {
        self.lookup(DESKTOP_ENTRY_GROUP, field.key())
            .unwrap_or_default()
    }

    fn bool_field(&self, field: Field) -> Result<bool> {
        match self.lookup(DESKTOP_ENTRY_GROUP, field.key()) {
            Some(raw) => parse_bool(field.key(), raw),
            None => Ok(false),
        }
    }

    pub fn entry_type(&self) -> EntryType {
        EntryType::parse(self.string_field(Field::Type))
    }

    pub fn version(&self) -> &str {
        self.string_field(Field::Version)
    }

    pub fn name(&self) -> &str {
        self.string_field(Field::Name)
    }

    pub fn generic_name(&self) -> &str {
        self.string_field(Field::GenericName)
    }

    pub fn comment(&self) -> &str {
        self.string_field(Field::Comment)
    }

    pub fn icon(&self) -> &str {
        self.string_field(Field::Icon)
    }

    pub fn exec(&self) -> &str {
        self.string_field(Field::Exec)
    }

    pub fn try_exec(&self) -> &str {
        self.string_field(Field::TryExec)
    }

    pub fn path(&self) -> &str {
        self.string_field(Field::Path)
    }

    pub fn mime_type(&self) -> &str {
        self.string_field(Field::MimeType)
    }

    pub fn categories(&self) -> &str {
        self.string_field(Field::Categories)
    }

    pub fn only_show_in(&self) -> &str {
        self.string_field(Field::OnlyShowIn)
    }

    pub fn not_show_in(&self) -> &str {
        self.string_field(Field::NotShowIn)
    }

    pub fn startup_wm_class(&self) -> &str {
        self.string_field(Field::StartupWMClass)
    }

    pub fn url(&self) -> &str {
        self.string_field(Field::Url)
    }

    pub fn terminal(&self) -> Result<bool> {
        self.bool_field(Field::Terminal)
    }

    pub fn hidden(&self) -> Result<bool> {
        self.bool_field(Field::Hidden)
    }

    pub fn no_display(&self) -> Result<bool> {
        self.bool_field(Field::NoDisplay)
    }

    pub fn startup_notify(&self) -> Result<bool> {
        self.bool_field(Field::StartupNotify)
    }

    /// Items of a `;`-separated key in `[Desktop Entry]`; empty when absent.
    pub fn list(&self, key: &str) -> Vec<String> {
        self.lookup(DESKTOP_ENTRY_GROUP, key)
            .map(split_list)
            .unwrap_or_default()
    }

    /// Value of `key` for `locale`, falling back through less specific locales
    /// to the unlocalized key.
    pub fn get_localized(&self, key: &str, locale: &Locale) -> Option<&str> {
        locale
            .candidates()
            .iter()
            .find_map(|suffix| self.lookup(DESKTOP_ENTRY_GROUP, &format!("{key}[{suffix}]")))
            .or_else(|| self.lookup(DESKTOP_ENTRY_GROUP, key))
    }

    /// Locale suffixes present for `key` in `[Desktop Entry]`, in file order.
    pub fn locales(&self, key: &str) -> Vec<&str> {
        let mut found: Vec<&str> = Vec::new();
        for pair in self.pairs(DESKTOP_ENTRY_GROUP) {
            if let (base, Some(locale)) = split_locale(&pair.key) {
                if base == key && !found.contains(&locale) {
                    found.push(locale);
                }
            }
        }
        found
    }

    /// Sets `key` in `[Desktop Entry]`.
    ///
    /// `key` must satisfy [`is_valid_key`]; it is stored as given.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.set_in(DESKTOP_ENTRY_GROUP, key, value)
    }

    /// Updates `key` in place, or appends it to `group` (created at the end of
    /// the file if missing).
    ///
    /// `group` must satisfy [`is_valid_group`] and `key` [`is_valid_key`].
    pub fn set_in(&mut self, group: &str, key: &str, value: impl Into<Value>) {
        let value = value.into().to_raw();
        self.modified = true;

        let existing = self
            .sections
            .iter_mut()
            .filter(|s| s.name == group)
            .flat_map(|s| s.lines.iter_mut())
            .filter_map(Line::pair_mut)
            .filter(|p| p.key == key)
            .last();
        if let Some(pair) = existing {
            pair.value = value;
            pair.raw = None;
            return;
        }

        let index = match self.sections.iter().rposition(|s| s.name == group) {
            Some(index) => index,
            None => {
                self.sections.push(Section::new(group));
                self.sections.len() - 1
            }
        };
        let lines = &mut self.sections[index].lines;
        // Right after the group's last key; trailing blanks and comments usually
        // belong to whatever follows.
        let at = lines
            .iter()
            .rposition(|l| matches!(l, Line::Pair(_)))
            .or_else(|| lines.iter().rposition(|l| !matches!(l, Line::Blank(_))))
            .map_or(0, |i| i + 1);
        lines.insert(
            at,
            Line::Pair(Pair {
                key: key.to_string(),
                value,
                raw: None,
            }),
        );
    }

    pub fn remove(&mut self, key: &str) -> bool {
        self.remove_in(DESKTOP_ENTRY_GROUP, key)
    }

    /// Drops every occurrence of `key` in `group`. Returns whether anything was removed.
    pub fn remove_in(&mut self, group: &str, key: &str) -> bool {
        let mut removed = false;
        for section in self.sections.iter_mut().filter(|s| s.name == group) {
            let before = section.lines.len();
            section
                .lines
                .retain(|l| l.pair().map_or(true, |p| p.key != key));
            removed |= section.lines.len() != before;
        }
        if removed {
            self.modified = true;
        }
        removed
    }

    fn rendered_lines(&self) -> Vec<Cow<'_, str>> {
        let mut out: Vec<Cow<'_, str>> = self.preamble.iter().map(Line::render).collect();
        for section in &self.sections {
            out.push(section.render_header());
            out.extend(section.lines.iter().map(Line::render));
        }
        out
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "{self}")
    }

    pub fn to_desktop_string(&self) -> String {
        self.to_string()
    }

    /// Serializes to `path`, then makes it the backing file and clears the
    /// modified flag.
    pub fn write(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_desktop_string()).map_err(|source| EntryError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        self.filename = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// The text [`Entry::write`] would produce, rendered through a private
    /// temporary file that is removed before returning.
    pub fn preview(&self) -> Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("dee-preview-")
            .suffix(".desktop")
            .tempfile()
            .map_err(|source| EntryError::Write {
                path: std::env::temp_dir(),
                source,
            })?;
        let path = file.path().to_path_buf();
        let text = self
            .write_and_read_back(file.as_file_mut())
            .map_err(|source| EntryError::Write {
                path: path.clone(),
                source,
            })?;
        file.close()
            .map_err(|source| EntryError::Write { path, source })?;
        Ok(text)
    }

    fn write_and_read_back(&self, file: &mut fs::File) -> io::Result<String> {
        self.write_to(file)?;
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        Ok(text)
    }

    /// Checks the structural requirements of the Desktop Entry Specification.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if !self.has_group(DESKTOP_ENTRY_GROUP) {
            problems.push(format!("missing [{DESKTOP_ENTRY_GROUP}] group"));
        }

        match self.lookup(DESKTOP_ENTRY_GROUP, Field::Type.key()) {
            None => problems.push("Type key is missing".to_string()),
            Some(raw) => match EntryType::parse(raw) {
                EntryType::Application if self.exec().trim().is_empty() => {
                    problems.push("Exec is required for Application entries".to_string())
                }
                EntryType::Link => match self.lookup(DESKTOP_ENTRY_GROUP, Field::Url.key()) {
                    None => problems.push("URL is required for Link entries".to_string()),
                    Some(url) if Url::parse(url.trim()).is_err() => {
                        problems.push(format!("URL {url:?} is not a valid URL"))
                    }
                    Some(_) => {}
                },
                EntryType::Unknown(other) => problems.push(format!(
                    "Type {other:?} is not one of Application, Link or Directory"
                )),
                _ => {}
            },
        }

        if self.name().trim().is_empty() {
            problems.push("Name is required and must not be empty".to_string());
        }

        for field in Field::ALL.iter().filter(|f| f.kind() == ValueKind::Boolean) {
            if let Err(err) = self.field(*field) {
                problems.push(err.to_string());
            }
        }

        let shows = [Field::OnlyShowIn, Field::NotShowIn]
            .iter()
            .filter(|f| self.lookup(DESKTOP_ENTRY_GROUP, f.key()).is_some())
            .count();
        if shows == 2 {
            problems.push("only one of OnlyShowIn or NotShowIn may be present".to_string());
        }

        match Violations::from_vec(problems) {
            Some(violations) => Err(EntryError::Validation(violations)),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bom {
            f.write_str("\u{feff}")?;
        }
        let lines = self.rendered_lines();
        let last = lines.len().saturating_sub(1);
        for (i, line) in lines.iter().enumerate() {
            f.write_str(line)?;
            if i < last || self.trailing_newline {
                f.write_str("\n")?;
            }
        }
        Ok(())
    }
}

/// `Key` or `Key[locale]`, with `Key` made of ASCII letters, digits and `-`.
pub fn is_valid_key(key: &str) -> bool {
    let (base, locale) = split_locale(key);
    let base_ok = !base.is_empty() && base.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    let locale_ok = locale.map_or(true, |l| {
        !l.is_empty() && !l.contains(['[', ']', '=']) && !l.chars().any(char::is_whitespace)
    });
    base_ok && locale_ok
}

/// Group names are non-empty printable text without `[` or `]`.
pub fn is_valid_group(name: &str) -> bool {
    !name.is_empty() && !name.contains(['[', ']']) && !name.chars().any(char::is_control)
}

fn parse_group_header(trimmed: &str) -> Option<&str> {
    let name = trimmed.strip_prefix('[')?.strip_suffix(']')?;
    is_valid_group(name).then_some(name)
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(EntryError::TypeCoercion {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Splits on `;`, decoding `\;`, `\\`, `\n` and `\r`. Other escapes are kept
/// as written. Empty items are dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(';') => current.push(';'),
                Some('\\') => current.push('\\'),
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ';' => items.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    items.push(current);
    items.retain(|item| !item.is_empty());
    items
}

pub fn join_list<S: AsRef<str>>(items: &[S]) -> String {
    let mut out = String::new();
    for item in items {
        for c in item.as_ref().chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                ';' => out.push_str("\\;"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                _ => out.push(c),
            }
        }
        out.push(';');
    }
    out
}
