use std::{fmt, io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EntryError {
    #[error("{}: {message}", describe_location(path, *line))]
    Parse {
        path: Option<PathBuf>,
        /// 1-based line number, `None` when the file could not be read at all.
        line: Option<usize>,
        message: String,
    },
    #[error("key {key:?} not found in group [{group}]")]
    KeyNotFound { group: String, key: String },
    #[error("invalid desktop entry: {0}")]
    Validation(Violations),
    #[error("write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("value {value:?} of {key} is not a boolean (expected `true` or `false`)")]
    TypeCoercion { key: String, value: String },
}

pub type Result<T, E = EntryError> = std::result::Result<T, E>;

impl EntryError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: None,
            line: Some(line),
            message: message.into(),
        }
    }

    pub(crate) fn with_path(self, at: PathBuf) -> Self {
        match self {
            Self::Parse { line, message, .. } => Self::Parse {
                path: Some(at),
                line,
                message,
            },
            other => other,
        }
    }

    /// Violations carried by a [`EntryError::Validation`], empty for other kinds.
    pub fn violations(&self) -> &[String] {
        match self {
            Self::Validation(v) => v.as_slice(),
            _ => &[],
        }
    }
}

fn describe_location(path: &Option<PathBuf>, line: Option<usize>) -> String {
    match (path, line) {
        (Some(path), Some(line)) => format!("{}:{line}", path.display()),
        (Some(path), None) => path.display().to_string(),
        (None, Some(line)) => format!("line {line}"),
        (None, None) => "desktop entry".to_string(),
    }
}

/// Non-empty list of human-readable validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violations(Vec<String>);

impl Violations {
    /// Returns `None` when there is nothing to report.
    pub fn from_vec(items: Vec<String>) -> Option<Self> {
        (!items.is_empty()).then_some(Self(items))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.0.iter().any(|v| v.contains(needle))
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}
