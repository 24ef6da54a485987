use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use super::loader::FileLoader;
use super::model::{Loaded, Selection};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// LabeledFileSet – the files of one class label
// ---------------------------------------------------------------------------

/// The ordered files of one label, loaded lazily through a shared loader.
///
/// The list is fixed at construction and nothing is read from disk until
/// [`load`](Self::load) is called.
#[derive(Debug)]
pub struct LabeledFileSet<L> {
    files: Vec<PathBuf>,
    loader: Arc<L>,
}

impl<L> Clone for LabeledFileSet<L> {
    fn clone(&self) -> Self {
        LabeledFileSet {
            files: self.files.clone(),
            loader: Arc::clone(&self.loader),
        }
    }
}

impl<L: FileLoader> LabeledFileSet<L> {
    /// Store `files` verbatim, in the given order.
    pub fn new<I, P>(files: I, loader: L) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_shared_loader(files, Arc::new(loader))
    }

    pub(crate) fn with_shared_loader<I, P>(files: I, loader: Arc<L>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        LabeledFileSet {
            files: files.into_iter().map(Into::into).collect(),
            loader,
        }
    }

    /// Load the selected files.
    ///
    /// Every index is checked against the file count before anything is
    /// read; the largest index is reported when the check fails. Files that
    /// no longer exist are skipped, so the result can hold fewer values than
    /// were requested. A single loaded value is returned as
    /// [`Loaded::One`].
    ///
    /// ```no_run
    /// # use datastore::{LabeledFileSet, NpyLoader};
    /// let set = LabeledFileSet::new(["a.npy", "b.npy", "c.npy"], NpyLoader);
    /// let first = set.load(0)?;
    /// let some = set.load([2, 0])?;
    /// let all = set.load(None::<usize>)?;
    /// # Ok::<(), datastore::Error>(())
    /// ```
    pub fn load(&self, selection: impl Into<Selection>) -> Result<Loaded<L::Output>> {
        self.load_selection(&selection.into())
    }

    pub(crate) fn load_selection(&self, selection: &Selection) -> Result<Loaded<L::Output>> {
        let indices = self.check_indices(selection)?;

        let mut data = Vec::with_capacity(indices.len());
        for i in indices {
            let path = &self.files[i];
            if !path.is_file() {
                warn!("Skipping missing file {}", path.display());
                continue;
            }
            debug!("Loading {}", path.display());
            data.push(self.loader.load(path)?);
        }

        Ok(Loaded::from_vec(data))
    }

    fn check_indices(&self, selection: &Selection) -> Result<Vec<usize>> {
        let indices = selection.resolve(self.files.len());
        if let Some(&max) = indices.iter().max() {
            if max >= self.files.len() {
                return Err(Error::OutOfRange {
                    index: max,
                    count: self.files.len(),
                });
            }
        }
        Ok(indices)
    }
}

impl<L> LabeledFileSet<L> {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Path of the `index`-th file.
    pub fn path(&self, index: usize) -> Option<&Path> {
        self.files.get(index).map(PathBuf::as_path)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{FnLoader, Unbound};

    fn read_text(path: &Path) -> Result<String> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Loader that returns the file's text.
    fn text_loader() -> impl FileLoader<Output = String> {
        FnLoader::new(read_text)
    }

    fn fixture(names: &[&str]) -> (tempfile::TempDir, Vec<PathBuf>) {
        let dir = tempfile::tempdir().unwrap();
        let paths = names
            .iter()
            .map(|n| {
                let p = dir.path().join(n);
                std::fs::write(&p, n).unwrap();
                p
            })
            .collect();
        (dir, paths)
    }

    #[test]
    fn construction_touches_nothing() {
        let set = LabeledFileSet::new(["/no/such/a", "/no/such/b"], Unbound);
        assert_eq!(set.len(), 2);
        assert_eq!(set.path(1), Some(Path::new("/no/such/b")));
        assert_eq!(set.path(2), None);
    }

    #[test]
    fn load_all_in_order() {
        let (_dir, paths) = fixture(&["a", "b", "c"]);
        let set = LabeledFileSet::new(paths, text_loader());

        assert_eq!(
            set.load(Selection::All).unwrap(),
            Loaded::Many(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn load_all_of_single_file_collapses() {
        let (_dir, paths) = fixture(&["only"]);
        let set = LabeledFileSet::new(paths, text_loader());
        assert_eq!(set.load(None::<usize>).unwrap(), Loaded::One("only".to_string()));
    }

    #[test]
    fn single_index_equals_one_element_list() {
        let (_dir, paths) = fixture(&["a", "b"]);
        let set = LabeledFileSet::new(paths, text_loader());
        assert_eq!(set.load(1).unwrap(), set.load([1]).unwrap());
        assert_eq!(set.load(1).unwrap(), Loaded::One("b".to_string()));
    }

    #[test]
    fn list_keeps_request_order_and_duplicates() {
        let (_dir, paths) = fixture(&["a", "b", "c"]);
        let set = LabeledFileSet::new(paths, text_loader());
        assert_eq!(
            set.load(vec![2, 0, 2]).unwrap().into_vec(),
            vec!["c", "a", "c"]
        );
    }

    #[test]
    fn out_of_range_reports_max_index() {
        let (_dir, paths) = fixture(&["a", "b"]);
        let set = LabeledFileSet::new(paths, text_loader());
        match set.load([5, 0, 3]) {
            Err(Error::OutOfRange { index, count }) => {
                assert_eq!(index, 5);
                assert_eq!(count, 2);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert!(matches!(set.load(2), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn empty_list_loads_nothing() {
        let (_dir, paths) = fixture(&["a"]);
        let set = LabeledFileSet::new(paths, text_loader());
        assert_eq!(set.load(Vec::<usize>::new()).unwrap(), Loaded::Many(vec![]));
    }

    #[test]
    fn missing_files_are_skipped() {
        let (_dir, paths) = fixture(&["a", "b", "c"]);
        std::fs::remove_file(&paths[1]).unwrap();
        let set = LabeledFileSet::new(paths.clone(), text_loader());

        assert_eq!(
            set.load(Selection::All).unwrap().into_vec(),
            vec!["a", "c"]
        );
        // one survivor collapses to a single value
        assert_eq!(set.load([0, 1]).unwrap(), Loaded::One("a".to_string()));
        assert_eq!(set.load(1).unwrap(), Loaded::Many(vec![]));
    }

    #[test]
    fn unbound_loader_fails_on_existing_file() {
        let (_dir, paths) = fixture(&["a"]);
        let set = LabeledFileSet::new(paths, Unbound);
        assert!(matches!(set.load(0), Err(Error::NotImplemented)));
    }

    #[test]
    fn reader_errors_propagate() {
        let (_dir, paths) = fixture(&["a"]);
        let failing = FnLoader::new(|_: &Path| -> Result<()> {
            Err(Error::format("corrupt header"))
        });
        let set = LabeledFileSet::new(paths, failing);
        let err = set.load(0).unwrap_err();
        assert_eq!(err.to_string(), "corrupt header");
    }
}
