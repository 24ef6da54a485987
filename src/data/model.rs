use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Array – a dense numeric array read from disk
// ---------------------------------------------------------------------------

/// A dense, row-major (C order) numeric array.
///
/// Every numeric dtype is widened to `f64`; `shape` keeps the on-disk
/// dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    /// Dimensions, outermost first. A scalar has an empty shape.
    pub shape: Vec<usize>,
    /// Row-major values – `shape.iter().product()` of them.
    pub data: Vec<f64>,
}

impl Array {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Self {
        Array { shape, data }
    }

    /// Build an array from column-major (Fortran order) values, reordering
    /// them to row-major.
    pub fn from_column_major(shape: Vec<usize>, data: Vec<f64>) -> Self {
        if shape.len() < 2 {
            return Array { shape, data };
        }
        let n = data.len();
        let mut out = vec![0.0; n];
        let mut idx = vec![0usize; shape.len()];
        // Walk the row-major positions, tracking the multi-index.
        for slot in out.iter_mut() {
            let mut col_major = 0usize;
            let mut stride = 1usize;
            for (i, dim) in idx.iter().zip(&shape) {
                col_major += i * stride;
                stride *= dim;
            }
            *slot = data[col_major];

            for axis in (0..shape.len()).rev() {
                idx[axis] += 1;
                if idx[axis] < shape[axis] {
                    break;
                }
                idx[axis] = 0;
            }
        }
        Array { shape, data: out }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "array{:?}", self.shape)
    }
}

// ---------------------------------------------------------------------------
// MatData – the variables of one Matlab file
// ---------------------------------------------------------------------------

/// Named numeric variables read from a Matlab `.mat` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatData {
    pub variables: BTreeMap<String, Array>,
}

impl MatData {
    pub fn get(&self, name: &str) -> Option<&Array> {
        self.variables.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Table – numeric columns from CSV / JSON / Parquet
// ---------------------------------------------------------------------------

/// A numeric table: `values` has shape `[rows, columns.len()]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub values: Array,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.values.shape.first().copied().unwrap_or(0)
    }

    /// Values of one named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let c = self.columns.iter().position(|n| n == name)?;
        let width = self.columns.len();
        Some(
            self.values
                .data
                .iter()
                .skip(c)
                .step_by(width)
                .copied()
                .collect(),
        )
    }
}

// ---------------------------------------------------------------------------
// Selection – which files of a label to load
// ---------------------------------------------------------------------------

/// File indices requested from a [`LabeledFileSet`](super::fileset::LabeledFileSet).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every file, in stored order.
    #[default]
    All,
    One(usize),
    /// Each index in the given order; duplicates are allowed.
    Many(Vec<usize>),
}

impl Selection {
    /// Expand to concrete indices for a file set of `count` files.
    pub fn resolve(&self, count: usize) -> Vec<usize> {
        match self {
            Selection::All => (0..count).collect(),
            Selection::One(i) => vec![*i],
            Selection::Many(v) => v.clone(),
        }
    }
}

impl From<usize> for Selection {
    fn from(i: usize) -> Self {
        Selection::One(i)
    }
}

impl From<Vec<usize>> for Selection {
    fn from(v: Vec<usize>) -> Self {
        Selection::Many(v)
    }
}

impl From<&[usize]> for Selection {
    fn from(v: &[usize]) -> Self {
        Selection::Many(v.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Selection {
    fn from(v: [usize; N]) -> Self {
        Selection::Many(v.to_vec())
    }
}

impl<T: Into<Selection>> From<Option<T>> for Selection {
    fn from(v: Option<T>) -> Self {
        v.map_or(Selection::All, Into::into)
    }
}

// ---------------------------------------------------------------------------
// LabelSelection – which labels of an index to load
// ---------------------------------------------------------------------------

/// Labels requested from a [`DatasetIndex`](super::index::DatasetIndex).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LabelSelection {
    /// Every label, in index order.
    #[default]
    All,
    One(String),
    Many(Vec<String>),
}

impl From<&str> for LabelSelection {
    fn from(s: &str) -> Self {
        LabelSelection::One(s.to_string())
    }
}

impl From<String> for LabelSelection {
    fn from(s: String) -> Self {
        LabelSelection::One(s)
    }
}

impl From<&String> for LabelSelection {
    fn from(s: &String) -> Self {
        LabelSelection::One(s.clone())
    }
}

impl From<Vec<String>> for LabelSelection {
    fn from(v: Vec<String>) -> Self {
        LabelSelection::Many(v)
    }
}

impl From<Vec<&str>> for LabelSelection {
    fn from(v: Vec<&str>) -> Self {
        LabelSelection::Many(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for LabelSelection {
    fn from(v: &[&str]) -> Self {
        LabelSelection::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for LabelSelection {
    fn from(v: [&str; N]) -> Self {
        LabelSelection::Many(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<T: Into<LabelSelection>> From<Option<T>> for LabelSelection {
    fn from(v: Option<T>) -> Self {
        v.map_or(LabelSelection::All, Into::into)
    }
}

// ---------------------------------------------------------------------------
// Loaded / Labeled – results with the single-value collapse
// ---------------------------------------------------------------------------

/// Result of loading from one file set: a lone value when exactly one file
/// was loaded, otherwise the ordered (possibly empty) values.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> Loaded<T> {
    /// Apply the collapse rule to a list of loaded values.
    pub fn from_vec(mut values: Vec<T>) -> Self {
        match values.pop() {
            Some(v) if values.is_empty() => Loaded::One(v),
            Some(v) => {
                values.push(v);
                Loaded::Many(values)
            }
            None => Loaded::Many(values),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Loaded::One(_) => 1,
            Loaded::Many(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The lone value, if the result collapsed.
    pub fn as_one(&self) -> Option<&T> {
        match self {
            Loaded::One(v) => Some(v),
            Loaded::Many(_) => None,
        }
    }

    pub fn into_one(self) -> Option<T> {
        match self {
            Loaded::One(v) => Some(v),
            Loaded::Many(_) => None,
        }
    }

    /// Undo the collapse: always a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Loaded::One(v) => vec![v],
            Loaded::Many(v) => v,
        }
    }
}

impl<T> IntoIterator for Loaded<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

/// Result of loading across labels: every value is paired with the label
/// it came from, collapsed the same way as [`Loaded`].
#[derive(Debug, Clone, PartialEq)]
pub enum Labeled<T> {
    One { value: T, label: String },
    Many { values: Vec<T>, labels: Vec<String> },
}

impl<T> Labeled<T> {
    /// Apply the collapse rule to parallel value / label lists.
    pub fn from_parts(mut values: Vec<T>, mut labels: Vec<String>) -> Self {
        debug_assert_eq!(values.len(), labels.len());
        if values.len() == 1 && labels.len() == 1 {
            if let (Some(value), Some(label)) = (values.pop(), labels.pop()) {
                return Labeled::One { value, label };
            }
        }
        Labeled::Many { values, labels }
    }

    pub fn len(&self) -> usize {
        match self {
            Labeled::One { .. } => 1,
            Labeled::Many { values, .. } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label tags, one per value.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            Labeled::One { label, .. } => vec![label.as_str()],
            Labeled::Many { labels, .. } => labels.iter().map(String::as_str).collect(),
        }
    }

    /// Undo the collapse: `(value, label)` pairs in load order.
    pub fn into_pairs(self) -> Vec<(T, String)> {
        match self {
            Labeled::One { value, label } => vec![(value, label)],
            Labeled::Many { values, labels } => values.into_iter().zip(labels).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_major_is_reordered() {
        // [[1, 2, 3], [4, 5, 6]] stored column by column
        let a = Array::from_column_major(vec![2, 3], vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert_eq!(a.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(a.shape, vec![2, 3]);
    }

    #[test]
    fn column_major_three_dims() {
        // element (i, j, k) = 100i + 10j + k, shape [2, 2, 2]
        let mut fortran = Vec::new();
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    fortran.push((100 * i + 10 * j + k) as f64);
                }
            }
        }
        let a = Array::from_column_major(vec![2, 2, 2], fortran);
        assert_eq!(
            a.data,
            vec![0.0, 1.0, 10.0, 11.0, 100.0, 101.0, 110.0, 111.0]
        );
    }

    #[test]
    fn selection_conversions() {
        assert_eq!(Selection::from(3), Selection::One(3));
        assert_eq!(Selection::from([0, 2]), Selection::Many(vec![0, 2]));
        assert_eq!(Selection::from(None::<usize>), Selection::All);
        assert_eq!(Selection::from(Some(vec![1])), Selection::Many(vec![1]));
        assert_eq!(Selection::All.resolve(3), vec![0, 1, 2]);
        assert_eq!(Selection::Many(vec![2, 2, 0]).resolve(3), vec![2, 2, 0]);
    }

    #[test]
    fn label_selection_conversions() {
        assert_eq!(LabelSelection::from("a"), LabelSelection::One("a".into()));
        assert_eq!(
            LabelSelection::from(["a", "b"]),
            LabelSelection::Many(vec!["a".into(), "b".into()])
        );
        assert_eq!(LabelSelection::from(None::<&str>), LabelSelection::All);
    }

    #[test]
    fn loaded_collapses_single_value() {
        assert_eq!(Loaded::from_vec(vec![7]), Loaded::One(7));
        assert_eq!(Loaded::from_vec(vec![1, 2]), Loaded::Many(vec![1, 2]));
        assert_eq!(Loaded::<i32>::from_vec(vec![]), Loaded::Many(vec![]));
        assert_eq!(Loaded::One(7).into_vec(), vec![7]);
    }

    #[test]
    fn labeled_collapses_single_pair() {
        let one = Labeled::from_parts(vec![1], vec!["a".to_string()]);
        assert_eq!(
            one,
            Labeled::One {
                value: 1,
                label: "a".to_string()
            }
        );
        let many = Labeled::from_parts(vec![1, 2], vec!["a".to_string(), "b".to_string()]);
        assert_eq!(many.labels(), vec!["a", "b"]);
        assert_eq!(
            many.into_pairs(),
            vec![(1, "a".to_string()), (2, "b".to_string())]
        );
    }

    #[test]
    fn table_column_access() {
        let t = Table {
            columns: vec!["x".into(), "y".into()],
            values: Array::new(vec![3, 2], vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0]),
        };
        assert_eq!(t.n_rows(), 3);
        assert_eq!(t.column("y"), Some(vec![10.0, 20.0, 30.0]));
        assert_eq!(t.column("z"), None);
    }
}
