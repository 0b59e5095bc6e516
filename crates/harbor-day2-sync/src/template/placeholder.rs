use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

pub(crate) static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{ *(project|registry):([A-Za-z0-9._\-]+) *\}\}")
        .expect("Invalid placeholder regex")
});

/// The entity kinds a placeholder can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    Project,
    Registry,
}

impl PlaceholderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Registry => "registry",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "project" => Some(Self::Project),
            "registry" => Some(Self::Registry),
            _ => None,
        }
    }
}

impl fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `kind:name` reference found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub name: String,
}

impl Placeholder {
    pub fn new(kind: PlaceholderKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    /// Context path of this placeholder, `kind:name`.
    pub fn token(&self) -> String {
        format!("{}:{}", self.kind, self.name)
    }

    pub(crate) fn from_captures(captures: &regex::Captures<'_>) -> Option<Self> {
        let kind = PlaceholderKind::parse(captures.get(1)?.as_str())?;
        Some(Self::new(kind, captures.get(2)?.as_str()))
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{{ {} }}}}", self.token())
    }
}

/// Distinct placeholders of a document, in order of first appearance.
pub fn scan(document: &str) -> Vec<Placeholder> {
    let mut seen = HashSet::new();
    PLACEHOLDER
        .captures_iter(document)
        .filter_map(|captures| Placeholder::from_captures(&captures))
        .filter(|placeholder| seen.insert(placeholder.clone()))
        .collect()
}
