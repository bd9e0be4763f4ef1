use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

static LANGUAGE_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<stem>.+)_(?P<lang>[A-Za-z0-9]+)\.prompt$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    TopDown,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One entry of an architecture description.
///
/// `filename` is the unique key. Callers are expected to keep it unique; when
/// two records share a filename the last one wins (see [`authoritative_modules`]).
///
/// Filenames share an id namespace with the synthetic ids of the graph model:
/// a filename must not start with `group::` (group container ids) and must not
/// contain `->` (edge ids are `source->target`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub filename: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Remaining fields of the record (reason, filepath, tags, interface...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Module {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            dependencies: Vec::new(),
            priority: 0,
            group: None,
            position: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = Some(Position::new(x, y));
        self
    }

    /// Display label derived from the filename (`foo_python.prompt` -> `foo`).
    pub fn label(&self) -> String {
        match LANGUAGE_SUFFIX_RE.captures(&self.filename) {
            Some(caps) => caps["stem"].to_string(),
            None => self.filename.clone(),
        }
    }

    /// Language tag encoded in the filename suffix, if any.
    pub fn language(&self) -> Option<String> {
        LANGUAGE_SUFFIX_RE
            .captures(&self.filename)
            .map(|caps| caps["lang"].to_ascii_lowercase())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchitectureError {
    #[error("failed to read architecture file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid architecture document: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub modules: Vec<Module>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArchitectureDocument {
    List(Vec<Module>),
    Wrapped { modules: Vec<Module> },
}

impl Architecture {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    /// Parses either a bare module array or `{ "modules": [...] }`.
    /// Strict JSON is tried first; JSON5 covers hand-edited files with
    /// comments or trailing commas.
    pub fn from_json(input: &str) -> Result<Self, ArchitectureError> {
        let doc = match serde_json::from_str::<ArchitectureDocument>(input) {
            Ok(doc) => doc,
            Err(strict_err) => json5::from_str::<ArchitectureDocument>(input)
                .map_err(|_| ArchitectureError::Parse(strict_err.to_string()))?,
        };
        let modules = match doc {
            ArchitectureDocument::List(modules) => modules,
            ArchitectureDocument::Wrapped { modules } => modules,
        };
        Ok(Self { modules })
    }
}

pub fn load_architecture(path: &Path) -> Result<Architecture, ArchitectureError> {
    let contents = std::fs::read_to_string(path)?;
    Architecture::from_json(&contents)
}

/// Returns the records that win under last-write-wins, in input order.
///
/// Precondition: filenames are unique. When they are not, every earlier record
/// with a repeated filename is skipped so that downstream maps and lists agree.
pub fn authoritative_modules(modules: &[Module]) -> Vec<&Module> {
    let mut last_index: HashMap<&str, usize> = HashMap::new();
    for (idx, module) in modules.iter().enumerate() {
        last_index.insert(module.filename.as_str(), idx);
    }
    modules
        .iter()
        .enumerate()
        .filter(|(idx, module)| last_index.get(module.filename.as_str()) == Some(idx))
        .map(|(_, module)| module)
        .collect()
}
