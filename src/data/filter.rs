use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Extension filter: which directory entries are indexed
// ---------------------------------------------------------------------------

/// A normalized set of file extensions: lowercase, with a leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: BTreeSet<String>,
}

impl ExtensionSet {
    /// Normalize each extension (`"NPY"`, `"npy"` and `".npy"` all become
    /// `".npy"`). An empty string is rejected.
    pub fn new<I, S>(extensions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| normalize(ext.as_ref()))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(ExtensionSet { extensions })
    }

    /// Whether `path` has one of the extensions (case-insensitive).
    ///
    /// Only the last suffix counts, so `a.tar.gz` matches `.gz`, and dotfiles
    /// such as `.npy` have no extension at all.
    pub fn matches(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self
                .extensions
                .contains(&format!(".{}", ext.to_lowercase())),
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.extensions.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

impl fmt::Display for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(", "))
    }
}

fn normalize(ext: &str) -> Result<String> {
    let trimmed = ext.trim();
    if trimmed.is_empty() || trimmed == "." {
        return Err(Error::InvalidExtension(ext.to_string()));
    }
    let lower = trimmed.to_lowercase();
    if lower.starts_with('.') {
        Ok(lower)
    } else {
        Ok(format!(".{lower}"))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_normalized() {
        let set = ExtensionSet::new(["npy", ".MAT", "Png"]).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![".mat", ".npy", ".png"]);
    }

    #[test]
    fn matching_ignores_case() {
        let set = ExtensionSet::new([".png"]).unwrap();
        assert!(set.matches(Path::new("/data/cats/IMG.PNG")));
        assert!(set.matches(Path::new("img.png")));
        assert!(!set.matches(Path::new("img.jpg")));
        assert!(!set.matches(Path::new("png")));
        assert!(!set.matches(Path::new(".png")));
    }

    #[test]
    fn only_last_suffix_counts() {
        let set = ExtensionSet::new(["gz"]).unwrap();
        assert!(set.matches(Path::new("a.tar.gz")));
        assert!(!ExtensionSet::new(["tar"]).unwrap().matches(Path::new("a.tar.gz")));
    }

    #[test]
    fn empty_extension_is_rejected() {
        assert!(matches!(
            ExtensionSet::new([""]),
            Err(Error::InvalidExtension(_))
        ));
        assert!(matches!(
            ExtensionSet::new(["."]),
            Err(Error::InvalidExtension(_))
        ));
    }
}
