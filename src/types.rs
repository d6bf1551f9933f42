use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use phf::phf_map;
use serde::{Deserialize, Serialize};

/// Coarse classification of a command line.
///
/// The built-in variants form a closed set. User-defined rules may introduce
/// any other label, which is carried as [`Category::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Category {
    VersionControl,
    Build,
    FileOperations,
    Navigation,
    DevTools,
    SystemAdmin,
    Network,
    Containers,
    Database,
    Editor,
    Search,
    PackageManager,
    Other,
    Custom(String),
}

static BUILTIN_LABELS: phf::Map<&'static str, Category> = phf_map! {
    "version-control" => Category::VersionControl,
    "build" => Category::Build,
    "file-operations" => Category::FileOperations,
    "navigation" => Category::Navigation,
    "dev-tools" => Category::DevTools,
    "system-admin" => Category::SystemAdmin,
    "network" => Category::Network,
    "containers" => Category::Containers,
    "database" => Category::Database,
    "editor" => Category::Editor,
    "search" => Category::Search,
    "package-manager" => Category::PackageManager,
    "other" => Category::Other,
};

impl Category {
    /// Map a label to its category. Unknown labels become [`Category::Custom`].
    pub fn from_label(label: &str) -> Self {
        BUILTIN_LABELS
            .get(label)
            .cloned()
            .unwrap_or_else(|| Category::Custom(label.to_string()))
    }

    /// Internal label, e.g. `version-control`.
    pub fn as_str(&self) -> &str {
        match self {
            Category::VersionControl => "version-control",
            Category::Build => "build",
            Category::FileOperations => "file-operations",
            Category::Navigation => "navigation",
            Category::DevTools => "dev-tools",
            Category::SystemAdmin => "system-admin",
            Category::Network => "network",
            Category::Containers => "containers",
            Category::Database => "database",
            Category::Editor => "editor",
            Category::Search => "search",
            Category::PackageManager => "package-manager",
            Category::Other => "other",
            Category::Custom(label) => label,
        }
    }

    /// Human-friendly title, e.g. `Version Control`.
    ///
    /// Custom labels are title-cased word by word, splitting on `-`, `_` and spaces.
    pub fn display_name(&self) -> String {
        match self {
            Category::VersionControl => "Version Control".to_string(),
            Category::Build => "Build".to_string(),
            Category::FileOperations => "File Operations".to_string(),
            Category::Navigation => "Navigation".to_string(),
            Category::DevTools => "Dev Tools".to_string(),
            Category::SystemAdmin => "System Admin".to_string(),
            Category::Network => "Network".to_string(),
            Category::Containers => "Containers".to_string(),
            Category::Database => "Database".to_string(),
            Category::Editor => "Editor".to_string(),
            Category::Search => "Search".to_string(),
            Category::PackageManager => "Package Manager".to_string(),
            Category::Other => "Other".to_string(),
            Category::Custom(label) => title_case(label),
        }
    }

    pub fn is_builtin(&self) -> bool {
        !matches!(self, Category::Custom(_))
    }
}

fn title_case(label: &str) -> String {
    label
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        match category {
            Category::Custom(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

impl From<String> for Category {
    fn from(label: String) -> Self {
        Category::from_label(&label)
    }
}

impl From<&str> for Category {
    fn from(label: &str) -> Self {
        Category::from_label(label)
    }
}

/// Where a category rule came from. Determines priority only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleOrigin {
    UserDefined,
    BuiltIn,
}

/// A user-supplied `{category, pattern}` pair, before compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub pattern: String,
}

impl CategoryRule {
    pub fn new(category: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            pattern: pattern.into(),
        }
    }
}

/// One parsed history entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub sequence_id: u64,
    pub timestamp: DateTime<Utc>,
    /// Seconds the command ran, 0 when the log does not say.
    pub duration: u64,
    /// Full command line, continuation lines joined with `\n`.
    #[serde(rename = "command")]
    pub text: String,
    /// Working directory inferred from preceding `cd` commands.
    pub directory: String,
    pub category: Category,
    pub base_command: String,
    /// Set by the segmenter, exactly once.
    pub session_id: Option<u32>,
}

/// A contiguous run of commands judged to be one work period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// `end_time - start_time`, in seconds.
    #[serde(rename = "duration")]
    pub duration_secs: i64,
    pub commands: Vec<CommandRecord>,
    /// Distinct directories, in the order they were first seen.
    pub directories: Vec<String>,
    pub categories: BTreeMap<Category, usize>,
    pub description: String,
}

impl Session {
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    pub fn has_category(&self, label: &str) -> bool {
        self.categories.keys().any(|category| category.as_str() == label)
    }
}
