use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use image::GrayImage;
use matfile::NumericData;
use npyz::{DType, NpyFile, Order, TypeChar};

use super::model::{Array, MatData};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Loader strategy
// ---------------------------------------------------------------------------

/// Turns one file on disk into an in-memory value.
///
/// A loader is bound to a [`DatasetIndex`](super::index::DatasetIndex) or
/// [`LabeledFileSet`](super::fileset::LabeledFileSet) when it is built and is
/// shared by every label of the index.
pub trait FileLoader {
    type Output;

    /// Extensions indexed when the builder is not given any.
    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    /// Read `path`. Malformed content is reported as [`Error::Format`].
    fn load(&self, path: &Path) -> Result<Self::Output>;
}

/// The loader of an index built without a format: every load fails with
/// [`Error::NotImplemented`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbound;

impl FileLoader for Unbound {
    type Output = ();

    fn load(&self, _path: &Path) -> Result<()> {
        Err(Error::NotImplemented)
    }
}

/// A loader backed by a caller-supplied function.
#[derive(Clone, Copy)]
pub struct FnLoader<F> {
    func: F,
}

impl<F> FnLoader<F> {
    pub fn new(func: F) -> Self {
        FnLoader { func }
    }
}

impl<F, T> FileLoader for FnLoader<F>
where
    F: Fn(&Path) -> Result<T>,
{
    type Output = T;

    fn load(&self, path: &Path) -> Result<T> {
        (self.func)(path)
    }
}

impl<F> std::fmt::Debug for FnLoader<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnLoader")
    }
}

// ---------------------------------------------------------------------------
// NumPy `.npy`
// ---------------------------------------------------------------------------

/// Reads `.npy` arrays of bool, integer or float dtype into an [`Array`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NpyLoader;

impl FileLoader for NpyLoader {
    type Output = Array;

    fn extensions(&self) -> &'static [&'static str] {
        &[".npy"]
    }

    fn load(&self, path: &Path) -> Result<Array> {
        let file = File::open(path)?;
        let npy = NpyFile::new(BufReader::new(file)).map_err(Error::format)?;
        let shape: Vec<usize> = npy.shape().iter().map(|&d| d as usize).collect();
        let fortran = matches!(npy.order(), Order::Fortran);

        let type_str = match npy.dtype() {
            DType::Plain(ts) => ts,
            other => {
                return Err(Error::format(format!(
                    "{}: unsupported dtype {}",
                    path.display(),
                    other.descr()
                )))
            }
        };

        let data = match (type_str.type_char(), type_str.size_field()) {
            (TypeChar::Float, 8) => read_as::<f64, _>(npy, |v| v)?,
            (TypeChar::Float, 4) => read_as::<f32, _>(npy, f64::from)?,
            (TypeChar::Int, 1) => read_as::<i8, _>(npy, f64::from)?,
            (TypeChar::Int, 2) => read_as::<i16, _>(npy, f64::from)?,
            (TypeChar::Int, 4) => read_as::<i32, _>(npy, f64::from)?,
            (TypeChar::Int, 8) => read_as::<i64, _>(npy, |v| v as f64)?,
            (TypeChar::Uint, 1) => read_as::<u8, _>(npy, f64::from)?,
            (TypeChar::Uint, 2) => read_as::<u16, _>(npy, f64::from)?,
            (TypeChar::Uint, 4) => read_as::<u32, _>(npy, f64::from)?,
            (TypeChar::Uint, 8) => read_as::<u64, _>(npy, |v| v as f64)?,
            (TypeChar::Bool, 1) => read_as::<bool, _>(npy, |b| if b { 1.0 } else { 0.0 })?,
            _ => {
                return Err(Error::format(format!(
                    "{}: unsupported dtype {type_str}",
                    path.display()
                )))
            }
        };

        Ok(if fortran {
            Array::from_column_major(shape, data)
        } else {
            Array::new(shape, data)
        })
    }
}

fn read_as<T, R>(npy: NpyFile<R>, widen: fn(T) -> f64) -> Result<Vec<f64>>
where
    T: npyz::Deserialize,
    R: Read,
{
    let values = npy.into_vec::<T>().map_err(Error::format)?;
    Ok(values.into_iter().map(widen).collect())
}

// ---------------------------------------------------------------------------
// Matlab `.mat` (v4 / v5)
// ---------------------------------------------------------------------------

/// Reads the real numeric variables of a Matlab `.mat` file.
///
/// Complex variables are rejected. Version 7.3 files are HDF5 containers;
/// use the `hdf5` loader for those.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatLoader;

impl FileLoader for MatLoader {
    type Output = MatData;

    fn extensions(&self) -> &'static [&'static str] {
        &[".mat"]
    }

    fn load(&self, path: &Path) -> Result<MatData> {
        let file = File::open(path)?;
        let mat = matfile::MatFile::parse(BufReader::new(file)).map_err(Error::format)?;

        let mut out = MatData::default();
        for array in mat.arrays() {
            let data = real_values(array.data()).ok_or_else(|| {
                Error::format(format!(
                    "{}: variable '{}' is complex",
                    path.display(),
                    array.name()
                ))
            })?;
            // Matlab stores arrays column-major.
            let values = Array::from_column_major(array.size().clone(), data);
            out.variables.insert(array.name().to_string(), values);
        }
        Ok(out)
    }
}

/// Widen the real part to `f64`; `None` for complex data.
fn real_values(data: &NumericData) -> Option<Vec<f64>> {
    fn widen<T: Copy>(real: &[T], imag: &Option<Vec<T>>, f: fn(T) -> f64) -> Option<Vec<f64>> {
        match imag {
            Some(_) => None,
            None => Some(real.iter().map(|&v| f(v)).collect()),
        }
    }
    match data {
        NumericData::Double { real, imag } => widen(real, imag, |v| v),
        NumericData::Single { real, imag } => widen(real, imag, f64::from),
        NumericData::Int8 { real, imag } => widen(real, imag, f64::from),
        NumericData::UInt8 { real, imag } => widen(real, imag, f64::from),
        NumericData::Int16 { real, imag } => widen(real, imag, f64::from),
        NumericData::UInt16 { real, imag } => widen(real, imag, f64::from),
        NumericData::Int32 { real, imag } => widen(real, imag, f64::from),
        NumericData::UInt32 { real, imag } => widen(real, imag, f64::from),
        NumericData::Int64 { real, imag } => widen(real, imag, |v| v as f64),
        NumericData::UInt64 { real, imag } => widen(real, imag, |v| v as f64),
    }
}

// ---------------------------------------------------------------------------
// Images
// ---------------------------------------------------------------------------

/// Decodes an image and converts it to 8-bit grayscale.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageLoader;

impl FileLoader for ImageLoader {
    type Output = GrayImage;

    fn extensions(&self) -> &'static [&'static str] {
        &[".jpg", ".png", ".tif", ".bmp"]
    }

    fn load(&self, path: &Path) -> Result<GrayImage> {
        let img = image::open(path).map_err(Error::format)?;
        Ok(img.to_luma8())
    }
}

// ---------------------------------------------------------------------------
// HDF5
// ---------------------------------------------------------------------------

/// Opens HDF5 files (including Matlab v7.3 `.mat`) read-only.
///
/// The returned [`hdf5::File`] is a live handle owned by the caller; the
/// underlying file is closed when it is dropped.
#[cfg(feature = "hdf5")]
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdf5Loader;

#[cfg(feature = "hdf5")]
impl FileLoader for Hdf5Loader {
    type Output = hdf5::File;

    fn extensions(&self) -> &'static [&'static str] {
        &[".mat", ".h5", ".hdf5"]
    }

    fn load(&self, path: &Path) -> Result<hdf5::File> {
        hdf5::File::open(path).map_err(|e| Error::format(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use npyz::WriterBuilder;
    use std::io::Write;

    fn write_npy<T: npyz::AutoSerialize>(path: &Path, shape: &[u64], data: Vec<T>) {
        write_npy_ordered(path, shape, data, Order::C);
    }

    fn write_npy_ordered<T: npyz::AutoSerialize>(
        path: &Path,
        shape: &[u64],
        data: Vec<T>,
        order: Order,
    ) {
        let file = std::io::BufWriter::new(File::create(path).unwrap());
        let mut writer = npyz::WriteOptions::new()
            .default_dtype()
            .shape(shape)
            .order(order)
            .writer(file)
            .begin_nd()
            .unwrap();
        for value in &data {
            writer.push(value).unwrap();
        }
        writer.finish().unwrap();
    }

    /// Append one uncompressed data element: tag, payload, zero padding to 8.
    fn push_element(out: &mut Vec<u8>, data_type: u32, payload: &[u8]) {
        out.extend_from_slice(&data_type.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(payload);
        out.resize(out.len() + (8 - payload.len() % 8) % 8, 0);
    }

    /// A little-endian Level 5 MAT file holding one double matrix. `real`
    /// (and `imag`) are given column-major, the way Matlab stores them.
    fn mat_v5_bytes(
        name: &str,
        rows: i32,
        cols: i32,
        real: &[f64],
        imag: Option<&[f64]>,
    ) -> Vec<u8> {
        const MI_INT8: u32 = 1;
        const MI_INT32: u32 = 5;
        const MI_UINT32: u32 = 6;
        const MI_DOUBLE: u32 = 9;
        const MI_MATRIX: u32 = 14;
        const MX_DOUBLE_CLASS: u32 = 6;
        const COMPLEX_FLAG: u32 = 0x0800;

        let doubles = |v: &[f64]| v.iter().flat_map(|x| x.to_le_bytes()).collect::<Vec<u8>>();

        let mut matrix = Vec::new();
        let flags = MX_DOUBLE_CLASS | if imag.is_some() { COMPLEX_FLAG } else { 0 };
        let mut flag_bytes = flags.to_le_bytes().to_vec();
        flag_bytes.extend_from_slice(&0u32.to_le_bytes());
        push_element(&mut matrix, MI_UINT32, &flag_bytes);
        let dims: Vec<u8> = [rows, cols].iter().flat_map(|d| d.to_le_bytes()).collect();
        push_element(&mut matrix, MI_INT32, &dims);
        push_element(&mut matrix, MI_INT8, name.as_bytes());
        push_element(&mut matrix, MI_DOUBLE, &doubles(real));
        if let Some(imag) = imag {
            push_element(&mut matrix, MI_DOUBLE, &doubles(imag));
        }

        let mut text = b"MATLAB 5.0 MAT-file, written by datastore tests".to_vec();
        text.resize(116, b' ');
        let mut out = text;
        out.extend_from_slice(&[0u8; 8]);
        out.extend_from_slice(&0x0100u16.to_le_bytes());
        out.extend_from_slice(b"IM");
        push_element(&mut out, MI_MATRIX, &matrix);
        out
    }

    #[test]
    fn unbound_loader_is_not_implemented() {
        assert!(matches!(
            Unbound.load(Path::new("whatever.npy")),
            Err(Error::NotImplemented)
        ));
    }

    #[test]
    fn fn_loader_calls_function() {
        let loader =
            FnLoader::new(|p: &Path| -> Result<String> { Ok(p.display().to_string()) });
        assert_eq!(loader.load(Path::new("a/b.txt")).unwrap(), "a/b.txt");
        assert!(loader.extensions().is_empty());
    }

    #[test]
    fn npy_float_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        write_npy(&path, &[2, 3], vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let a = NpyLoader.load(&path).unwrap();
        assert_eq!(a.shape, vec![2, 3]);
        assert_eq!(a.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn npy_integer_array_is_widened() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ints.npy");
        write_npy(&path, &[4], vec![-1i32, 0, 7, 42]);

        let a = NpyLoader.load(&path).unwrap();
        assert_eq!(a.shape, vec![4]);
        assert_eq!(a.data, vec![-1.0, 0.0, 7.0, 42.0]);
    }

    #[test]
    fn npy_fortran_order_is_read_row_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.npy");
        // [[1, 2, 3], [4, 5, 6]] stored column by column
        let column_major = vec![1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0];
        write_npy_ordered(&path, &[2, 3], column_major, Order::Fortran);

        let a = NpyLoader.load(&path).unwrap();
        assert_eq!(a.shape, vec![2, 3]);
        assert_eq!(a.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn malformed_npy_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.npy");
        File::create(&path)
            .unwrap()
            .write_all(b"definitely not numpy")
            .unwrap();

        assert!(matches!(NpyLoader.load(&path), Err(Error::Format(_))));
    }

    #[test]
    fn malformed_mat_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.mat");
        File::create(&path).unwrap().write_all(&[0u8; 16]).unwrap();

        match MatLoader.load(&path) {
            Err(Error::Format(e)) => assert!(e.downcast_ref::<matfile::Error>().is_some()),
            other => panic!("expected a matfile error, got {other:?}"),
        }
    }

    #[test]
    fn mat_matrix_is_read_row_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.mat");
        let bytes = mat_v5_bytes("x", 2, 3, &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0], None);
        std::fs::write(&path, bytes).unwrap();

        let mat = MatLoader.load(&path).unwrap();
        assert_eq!(mat.variables.keys().collect::<Vec<_>>(), vec!["x"]);
        let x = &mat.variables["x"];
        assert_eq!(x.shape, vec![2, 3]);
        assert_eq!(x.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn matlab_index_loads_variables() {
        let dir = tempfile::tempdir().unwrap();
        let runs = dir.path().join("runs");
        std::fs::create_dir_all(&runs).unwrap();
        std::fs::write(runs.join("A.MAT"), mat_v5_bytes("a", 1, 2, &[1.0, 2.0], None)).unwrap();
        std::fs::write(runs.join("b.mat"), mat_v5_bytes("b", 2, 1, &[3.0, 4.0], None)).unwrap();
        std::fs::write(runs.join("c.npy"), b"ignored").unwrap();

        let ds = crate::DatasetIndex::matlab(dir.path()).build().unwrap();
        assert_eq!(ds.file_counts(), vec![2]);
        let pairs = ds.load("runs", 1).unwrap().into_pairs();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.variables["b"].shape, vec![2, 1]);
        assert_eq!(pairs[0].1, "runs");
    }

    #[test]
    fn mat_complex_variable_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("z.mat");
        let bytes = mat_v5_bytes("z", 1, 2, &[1.0, 2.0], Some(&[0.5, -0.5]));
        std::fs::write(&path, bytes).unwrap();

        match MatLoader.load(&path) {
            Err(Error::Format(e)) => assert!(e.to_string().contains("'z' is complex")),
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn image_is_decoded_to_grayscale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rgb.png");
        let rgb = image::RgbImage::from_pixel(4, 3, image::Rgb([255, 255, 255]));
        rgb.save(&path).unwrap();

        let gray = ImageLoader.load(&path).unwrap();
        assert_eq!(gray.dimensions(), (4, 3));
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }
}
