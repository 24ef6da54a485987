use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Index options
// ---------------------------------------------------------------------------

/// What happens when two indexed directories produce the same label.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateLabels {
    /// Fail with [`Error::DuplicateLabel`](crate::Error::DuplicateLabel).
    #[default]
    Reject,
    /// The directory visited last wins (logged).
    Overwrite,
}

/// How a directory is turned into a label.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum LabelScheme {
    /// The directory's own name, e.g. `cats` for `root/train/cats`.
    #[default]
    Basename,
    /// The path relative to the root, `/`-separated, e.g. `train/cats`.
    /// The root itself is labelled `.`.
    RelativePath,
}

/// Settings for building a [`DatasetIndex`](crate::DatasetIndex).
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "extensions": ["npy"], "recurse": false, "duplicates": "overwrite" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexOptions {
    /// Extensions to index; empty means the loader's own defaults.
    pub extensions: Vec<String>,
    /// Index every directory below the root, not only the root itself.
    pub recurse: bool,
    /// Descend into symlinked directories.
    pub follow_links: bool,
    pub duplicates: DuplicateLabels,
    pub label_scheme: LabelScheme,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            recurse: true,
            follow_links: false,
            duplicates: DuplicateLabels::default(),
            label_scheme: LabelScheme::default(),
        }
    }
}

impl IndexOptions {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
