//! # datastore
//!
//! Lazy, class-labelled access to directory trees of data files.
//!
//! A [`DatasetIndex`] scans a root directory once. Every directory holding
//! files with a matching extension becomes a label, and its files are
//! loaded only when asked for, through a [`FileLoader`] bound at build time:
//!
//! ```no_run
//! use datastore::{DatasetIndex, Labeled};
//!
//! let ds = DatasetIndex::npy("data/gaussians").build()?;
//! println!("{} classes, {:?} files each", ds.n_classes(), ds.file_counts());
//!
//! if let Labeled::Many { values, labels } = ds.load(["class1", "class3"], [0, 1])? {
//!     for (array, label) in values.iter().zip(&labels) {
//!         println!("{label}: {:?}", array.shape);
//!     }
//! }
//! # Ok::<(), datastore::Error>(())
//! ```

pub mod config;
pub mod data;
pub mod error;

pub use config::{DuplicateLabels, IndexOptions, LabelScheme};
pub use data::fileset::LabeledFileSet;
pub use data::filter::ExtensionSet;
pub use data::index::{
    DatasetIndex, DatasetIndexBuilder, ImageDataStore, IndexSummary, LabelSummary,
    MatlabDataStore, NpyDataStore, TableDataStore,
};
#[cfg(feature = "hdf5")]
pub use data::index::Hdf5DataStore;
#[cfg(feature = "hdf5")]
pub use data::loader::Hdf5Loader;
pub use data::loader::{FileLoader, FnLoader, ImageLoader, MatLoader, NpyLoader, Unbound};
pub use data::model::{Array, LabelSelection, Labeled, Loaded, MatData, Selection, Table};
pub use data::table::TableLoader;
pub use error::{Error, FormatError, Result};
pub use image::GrayImage;
