//! Keys defined by the Desktop Entry Specification and how their values are typed.

use std::fmt;

/// How the raw text of a recognized key is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::String => "string",
            Self::Boolean => "boolean",
        })
    }
}

/// One row of the recognized keys table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognizedKey {
    pub field: Field,
    pub key: &'static str,
    pub description: &'static str,
    pub kind: ValueKind,
    /// `;`-separated list of strings.
    pub list: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Type,
    Version,
    Name,
    GenericName,
    NoDisplay,
    Comment,
    Icon,
    Hidden,
    OnlyShowIn,
    NotShowIn,
    TryExec,
    Exec,
    Path,
    Terminal,
    MimeType,
    Categories,
    StartupNotify,
    StartupWMClass,
    Url,
}

impl Field {
    pub const ALL: [Field; 19] = [
        Field::Type,
        Field::Version,
        Field::Name,
        Field::GenericName,
        Field::NoDisplay,
        Field::Comment,
        Field::Icon,
        Field::Hidden,
        Field::OnlyShowIn,
        Field::NotShowIn,
        Field::TryExec,
        Field::Exec,
        Field::Path,
        Field::Terminal,
        Field::MimeType,
        Field::Categories,
        Field::StartupNotify,
        Field::StartupWMClass,
        Field::Url,
    ];

    pub fn row(self) -> &'static RecognizedKey {
        // RECOGNIZED_KEYS is laid out in declaration order.
        &RECOGNIZED_KEYS[self as usize]
    }

    pub fn key(self) -> &'static str {
        self.row().key
    }

    pub fn kind(self) -> ValueKind {
        self.row().kind
    }

    pub fn description(self) -> &'static str {
        self.row().description
    }

    pub fn is_list(self) -> bool {
        self.row().list
    }

    /// Looks up a key by its exact (case-sensitive) name, without locale suffix.
    pub fn from_key(key: &str) -> Option<Field> {
        RECOGNIZED_KEYS.iter().find(|k| k.key == key).map(|k| k.field)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

const fn string(field: Field, key: &'static str, description: &'static str) -> RecognizedKey {
    RecognizedKey {
        field,
        key,
        description,
        kind: ValueKind::String,
        list: false,
    }
}

const fn strings(field: Field, key: &'static str, description: &'static str) -> RecognizedKey {
    RecognizedKey {
        field,
        key,
        description,
        kind: ValueKind::String,
        list: true,
    }
}

const fn boolean(field: Field, key: &'static str, description: &'static str) -> RecognizedKey {
    RecognizedKey {
        field,
        key,
        description,
        kind: ValueKind::Boolean,
        list: false,
    }
}

pub static RECOGNIZED_KEYS: [RecognizedKey; 19] = [
    string(
        Field::Type,
        "Type",
        "This specification defines 3 types of desktop entries: Application (type 1), Link \
         (type 2) and Directory (type 3). To allow the addition of new types in the future, \
         implementations should ignore desktop entries with an unknown type.",
    ),
    string(
        Field::Version,
        "Version",
        "Version of the Desktop Entry Specification that the desktop entry conforms with. \
         Note that the version field is not required to be present.",
    ),
    string(
        Field::Name,
        "Name",
        "Specific name of the application, for example \"Mozilla\".",
    ),
    string(
        Field::GenericName,
        "GenericName",
        "Generic name of the application, for example \"Web Browser\".",
    ),
    boolean(
        Field::NoDisplay,
        "NoDisplay",
        "NoDisplay means \"this application exists, but don't display it in the menus\". This \
         can be useful to e.g. associate this application with MIME types, so that it gets \
         launched from a file manager, without having a menu entry for it.",
    ),
    string(
        Field::Comment,
        "Comment",
        "Tooltip for the entry, for example \"View sites on the Internet\". The value should \
         not be redundant with the values of Name and GenericName.",
    ),
    string(
        Field::Icon,
        "Icon",
        "Icon to display in file manager, menus, etc. If the name is an absolute path, the \
         given file will be used. If the name is not an absolute path, the algorithm described \
         in the Icon Theme Specification will be used to locate the icon.",
    ),
    boolean(
        Field::Hidden,
        "Hidden",
        "Hidden should have been called Deleted. It means the user deleted (at their level) \
         something that was present at an upper level, e.g. in the system dirs. It's strictly \
         equivalent to the .desktop file not existing at all, as far as that user is concerned.",
    ),
    strings(
        Field::OnlyShowIn,
        "OnlyShowIn",
        "A list of strings identifying the environments that should display a given desktop \
         entry. Only one of OnlyShowIn or NotShowIn may appear in a group.",
    ),
    strings(
        Field::NotShowIn,
        "NotShowIn",
        "A list of strings identifying the environments that should not display a given \
         desktop entry. Only one of OnlyShowIn or NotShowIn may appear in a group.",
    ),
    string(
        Field::TryExec,
        "TryExec",
        "Path to an executable file on disk used to determine if the program is actually \
         installed. If the path is not an absolute path, the file is looked up in the $PATH \
         environment variable. If the file is not present or if it is not executable, the entry \
         may be ignored.",
    ),
    string(
        Field::Exec,
        "Exec",
        "Program to execute, possibly with arguments.",
    ),
    string(
        Field::Path,
        "Path",
        "If entry is of type Application, the working directory to run the program in.",
    ),
    boolean(
        Field::Terminal,
        "Terminal",
        "Whether the program runs in a terminal window.",
    ),
    strings(
        Field::MimeType,
        "MimeType",
        "The MIME type(s) supported by this application.",
    ),
    strings(
        Field::Categories,
        "Categories",
        "Categories in which the entry should be shown in a menu (for possible values see the \
         Desktop Menu Specification).",
    ),
    boolean(
        Field::StartupNotify,
        "StartupNotify",
        "If true, it is KNOWN that the application will send a \"remove\" message when started \
         with the DESKTOP_STARTUP_ID environment variable set. If false, it is KNOWN that the \
         application does not work with startup notification at all.",
    ),
    string(
        Field::StartupWMClass,
        "StartupWMClass",
        "If specified, it is known that the application will map at least one window with the \
         given string as its WM class or WM name hint.",
    ),
    string(
        Field::Url,
        "URL",
        "If entry is Link type, the URL to access.",
    ),
];
