use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use walkdir::WalkDir;

use super::fileset::LabeledFileSet;
use super::filter::ExtensionSet;
#[cfg(feature = "hdf5")]
use super::loader::Hdf5Loader;
use super::loader::{FileLoader, ImageLoader, MatLoader, NpyLoader, Unbound};
use super::model::{LabelSelection, Labeled, Loaded, Selection};
use super::table::TableLoader;
use crate::config::{DuplicateLabels, IndexOptions, LabelScheme};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// DatasetIndex – label -> files, built from a directory tree
// ---------------------------------------------------------------------------

/// Class-labelled files found under a root directory.
///
/// Each directory holding at least one file with a matching extension
/// becomes a label (its name); its matching files, sorted by name, form that
/// label's [`LabeledFileSet`]. The index is built by a single scan and is
/// immutable afterwards. Labels iterate in ascending order.
#[derive(Debug)]
pub struct DatasetIndex<L> {
    root: PathBuf,
    extensions: ExtensionSet,
    labels: BTreeMap<String, LabeledFileSet<L>>,
}

pub type NpyDataStore = DatasetIndex<NpyLoader>;
pub type MatlabDataStore = DatasetIndex<MatLoader>;
pub type ImageDataStore = DatasetIndex<ImageLoader>;
pub type TableDataStore = DatasetIndex<TableLoader>;
#[cfg(feature = "hdf5")]
pub type Hdf5DataStore = DatasetIndex<Hdf5Loader>;

impl DatasetIndex<Unbound> {
    /// Start building an index with no format bound. Pick one with
    /// [`DatasetIndexBuilder::loader`]; until then loads fail with
    /// [`Error::NotImplemented`].
    pub fn builder<P: AsRef<Path>>(root: P) -> DatasetIndexBuilder<Unbound> {
        DatasetIndexBuilder::new(root, Unbound)
    }
}

impl DatasetIndex<NpyLoader> {
    /// `.npy` arrays.
    pub fn npy<P: AsRef<Path>>(root: P) -> DatasetIndexBuilder<NpyLoader> {
        DatasetIndexBuilder::new(root, NpyLoader)
    }
}

impl DatasetIndex<MatLoader> {
    /// Matlab `.mat` files (v4 / v5).
    pub fn matlab<P: AsRef<Path>>(root: P) -> DatasetIndexBuilder<MatLoader> {
        DatasetIndexBuilder::new(root, MatLoader)
    }
}

impl DatasetIndex<ImageLoader> {
    /// `.jpg`, `.png`, `.tif` and `.bmp` images, decoded to grayscale.
    pub fn image<P: AsRef<Path>>(root: P) -> DatasetIndexBuilder<ImageLoader> {
        DatasetIndexBuilder::new(root, ImageLoader)
    }
}

impl DatasetIndex<TableLoader> {
    /// Numeric `.csv`, `.json` and `.parquet` tables.
    pub fn table<P: AsRef<Path>>(root: P) -> DatasetIndexBuilder<TableLoader> {
        DatasetIndexBuilder::new(root, TableLoader)
    }
}

#[cfg(feature = "hdf5")]
impl DatasetIndex<Hdf5Loader> {
    /// HDF5 files, including Matlab v7.3 `.mat`.
    pub fn hdf5<P: AsRef<Path>>(root: P) -> DatasetIndexBuilder<Hdf5Loader> {
        DatasetIndexBuilder::new(root, Hdf5Loader)
    }
}

impl<L: FileLoader> DatasetIndex<L> {
    /// Start building an index that loads files with `loader`.
    pub fn with_loader<P: AsRef<Path>>(root: P, loader: L) -> DatasetIndexBuilder<L> {
        DatasetIndexBuilder::new(root, loader)
    }

    /// The file set of one label.
    pub fn get(&self, label: &str) -> Result<&LabeledFileSet<L>> {
        self.labels
            .get(label)
            .ok_or_else(|| Error::UnknownLabel(label.to_string()))
    }

    /// Load files from one, several or all labels.
    ///
    /// The same `selection` applies to every label, so each requested label
    /// must hold more files than the largest selected index. All labels are
    /// checked before anything is read. Values come back label by label,
    /// each tagged with its label; a single value is returned as
    /// [`Labeled::One`].
    ///
    /// ```no_run
    /// # use datastore::{DatasetIndex, Selection};
    /// let ds = DatasetIndex::npy("data/gaussians").build()?;
    /// let everything = ds.load(None::<&str>, Selection::All)?;
    /// let firsts = ds.load(["class1", "class3"], [0, 1])?;
    /// # Ok::<(), datastore::Error>(())
    /// ```
    pub fn load(
        &self,
        labels: impl Into<LabelSelection>,
        selection: impl Into<Selection>,
    ) -> Result<Labeled<L::Output>> {
        let sets = self.check_labels(labels.into())?;
        let selection = selection.into();

        let mut values = Vec::new();
        let mut tags = Vec::new();
        for (label, set) in sets {
            match set.load_selection(&selection)? {
                Loaded::One(value) => {
                    values.push(value);
                    tags.push(label);
                }
                Loaded::Many(loaded) => {
                    tags.extend(std::iter::repeat(label).take(loaded.len()));
                    values.extend(loaded);
                }
            }
        }

        Ok(Labeled::from_parts(values, tags))
    }

    fn check_labels(&self, labels: LabelSelection) -> Result<Vec<(String, &LabeledFileSet<L>)>> {
        let names = match labels {
            LabelSelection::All => self.labels.keys().cloned().collect(),
            LabelSelection::One(label) => vec![label],
            LabelSelection::Many(labels) => labels,
        };
        names
            .into_iter()
            .map(|name| {
                let set = self.get(&name)?;
                Ok((name, set))
            })
            .collect()
    }
}

impl<L> DatasetIndex<L> {
    /// Absolute path of the scanned root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Label names, ascending.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &LabeledFileSet<L>)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Number of labels.
    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    /// File count of each label, in label order.
    pub fn file_counts(&self) -> Vec<usize> {
        self.labels.values().map(LabeledFileSet::len).collect()
    }

    /// Total number of indexed files.
    pub fn len(&self) -> usize {
        self.labels.values().map(LabeledFileSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn summary(&self) -> IndexSummary {
        IndexSummary {
            root: self.root.clone(),
            extensions: self.extensions.iter().map(str::to_string).collect(),
            n_classes: self.n_classes(),
            n_files: self.len(),
            labels: self
                .labels
                .iter()
                .map(|(label, set)| LabelSummary {
                    label: label.clone(),
                    files: set.len(),
                })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for [`DatasetIndex`]; [`build`](Self::build) scans the tree.
#[derive(Debug, Clone)]
pub struct DatasetIndexBuilder<L> {
    root: PathBuf,
    options: IndexOptions,
    loader: L,
}

impl<L: FileLoader> DatasetIndexBuilder<L> {
    pub fn new<P: AsRef<Path>>(root: P, loader: L) -> Self {
        DatasetIndexBuilder {
            root: root.as_ref().to_path_buf(),
            options: IndexOptions::default(),
            loader,
        }
    }

    /// Replace the loader, keeping every other setting.
    pub fn loader<M: FileLoader>(self, loader: M) -> DatasetIndexBuilder<M> {
        DatasetIndexBuilder {
            root: self.root,
            options: self.options,
            loader,
        }
    }

    /// Apply a full set of options, e.g. read from a JSON file.
    pub fn options(mut self, options: IndexOptions) -> Self {
        self.options = options;
        self
    }

    /// Add one extension to index (`"png"` and `".PNG"` are equivalent).
    pub fn extension(mut self, ext: impl Into<String>) -> Self {
        self.options.extensions.push(ext.into());
        self
    }

    /// Replace the extensions to index.
    pub fn extensions<I, S>(mut self, exts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extensions = exts.into_iter().map(Into::into).collect();
        self
    }

    /// When false only the root directory itself is scanned.
    pub fn recurse(mut self, yes: bool) -> Self {
        self.options.recurse = yes;
        self
    }

    pub fn follow_links(mut self, yes: bool) -> Self {
        self.options.follow_links = yes;
        self
    }

    pub fn duplicates(mut self, policy: DuplicateLabels) -> Self {
        self.options.duplicates = policy;
        self
    }

    pub fn label_scheme(mut self, scheme: LabelScheme) -> Self {
        self.options.label_scheme = scheme;
        self
    }

    /// Scan the directory tree and build the index.
    pub fn build(self) -> Result<DatasetIndex<L>> {
        let root = std::path::absolute(&self.root)?;
        if !root.is_dir() {
            return Err(Error::NotADirectory(root));
        }

        let extensions = if self.options.extensions.is_empty() {
            ExtensionSet::new(self.loader.extensions())?
        } else {
            ExtensionSet::new(&self.options.extensions)?
        };

        let loader = Arc::new(self.loader);
        let mut labels = BTreeMap::new();
        let mut origins: BTreeMap<String, PathBuf> = BTreeMap::new();

        for dir in collect_directories(&root, &self.options) {
            let files = match matching_files(&dir, &extensions) {
                Ok(files) => files,
                Err(e) if dir != root => {
                    warn!("Skipping unreadable directory {}: {e}", dir.display());
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if files.is_empty() {
                continue;
            }

            let label = label_for(&root, &dir, self.options.label_scheme);
            debug!("{} files in {} -> '{label}'", files.len(), dir.display());

            if let Some(first) = origins.get(&label) {
                match self.options.duplicates {
                    DuplicateLabels::Reject => {
                        return Err(Error::DuplicateLabel {
                            label,
                            first: first.clone(),
                            second: dir,
                        });
                    }
                    DuplicateLabels::Overwrite => warn!(
                        "Label '{label}' from {} replaces {}",
                        dir.display(),
                        first.display()
                    ),
                }
            }

            origins.insert(label.clone(), dir);
            labels.insert(
                label,
                LabeledFileSet::with_shared_loader(files, Arc::clone(&loader)),
            );
        }

        if labels.is_empty() {
            warn!("No '{extensions}' files found in {}.", root.display());
        }

        Ok(DatasetIndex {
            root,
            extensions,
            labels,
        })
    }
}

/// The root first, then (when recursing) every directory below it, sorted
/// by the raw bytes of the path, so `x-y/cats` comes before `x/cats`.
fn collect_directories(root: &Path, options: &IndexOptions) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).follow_links(options.follow_links);
    if !options.recurse {
        walker = walker.max_depth(0);
    }

    let mut dirs = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => dirs.push(entry.into_path()),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry under {}: {e}", root.display()),
        }
    }
    dirs.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    dirs
}

/// Regular files in `dir` with a matching extension, sorted by file name.
fn matching_files(dir: &Path, extensions: &ExtensionSet) -> io::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    paths.retain(|p| extensions.matches(p) && p.is_file());
    Ok(paths)
}

fn label_for(root: &Path, dir: &Path, scheme: LabelScheme) -> String {
    match scheme {
        LabelScheme::Basename => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string()),
        LabelScheme::RelativePath => {
            let parts: Vec<String> = dir
                .strip_prefix(root)
                .unwrap_or(dir)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            if parts.is_empty() {
                ".".to_string()
            } else {
                parts.join("/")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// A serializable overview of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSummary {
    pub root: PathBuf,
    pub extensions: Vec<String>,
    pub n_classes: usize,
    pub n_files: usize,
    pub labels: Vec<LabelSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSummary {
    pub label: String,
    pub files: usize,
}

impl fmt::Display for IndexSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root:       {}", self.root.display())?;
        writeln!(f, "extensions: {}", self.extensions.join(", "))?;
        writeln!(f, "classes:    {}", self.n_classes)?;
        writeln!(f, "files:      {}", self.n_files)?;
        for l in &self.labels {
            writeln!(f, "  {:<24} {:>6}", l.label, l.files)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
