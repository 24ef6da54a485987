/// Data layer: indexing, lazy loading and file formats.
///
/// Architecture:
/// ```text
///   root/
///     class1/ a.npy b.npy
///     class2/ c.npy
///        │
///        ▼
///   ┌──────────────┐
///   │ DatasetIndex  │  scan tree → label → LabeledFileSet (filter: extensions)
///   └──────────────┘
///        │ load(labels, selection)
///        ▼
///   ┌────────────────┐
///   │ LabeledFileSet  │  check indices, skip missing files
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  FileLoader: npy / mat / image / table / hdf5
///   └──────────┘
/// ```

pub mod fileset;
pub mod filter;
pub mod index;
pub mod loader;
pub mod model;
pub mod table;
