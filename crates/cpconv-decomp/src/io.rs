//! Binary persistence for convolution factor sets
//!
//! File format (little-endian):
//! - Magic: b"CPCF" (4 bytes)
//! - Version: u32 (4 bytes)
//! - Matrix count: u32 (4 bytes), always 4
//! - Per matrix, in the order `f_in`, `f_h`, `f_w`, `f_out`:
//!   - Element type: u8 (1 = f32, 2 = f64)
//!   - Dimension count: u32, always 2
//!   - Dimensions: u64 each
//!   - Data: row-major elements

use crate::conv_factors::ConvFactors;
use crate::error::CpError;
use scirs2_core::ndarray_ext::Array2;
use scirs2_core::numeric::Float;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"CPCF";
const VERSION: u32 = 1;
const MATRIX_COUNT: u32 = 4;

/// Scalar types that can be stored in a factor file
pub trait FactorElement: Float + 'static {
    /// Element type tag written before each matrix
    const DTYPE: u8;

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()>;

    fn read_le<R: Read>(reader: &mut R) -> std::io::Result<Self>;
}

impl FactorElement for f32 {
    const DTYPE: u8 = 1;

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    fn read_le<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 4];
        reader.read_exact(&mut bytes)?;
        Ok(f32::from_le_bytes(bytes))
    }
}

impl FactorElement for f64 {
    const DTYPE: u8 = 2;

    fn write_le<W: Write>(self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.to_le_bytes())
    }

    fn read_le<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut bytes = [0u8; 8];
        reader.read_exact(&mut bytes)?;
        Ok(f64::from_le_bytes(bytes))
    }
}

/// Write a factor set to `writer`
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::Array2;
/// use cpconv_decomp::{read_factors, write_factors, ConvFactors};
///
/// let factors = ConvFactors::new(
///     Array2::<f32>::ones((4, 2)),
///     Array2::<f32>::ones((3, 2)),
///     Array2::<f32>::ones((3, 2)),
///     Array2::<f32>::ones((2, 8)),
/// )
/// .unwrap();
///
/// let mut buf = Vec::new();
/// write_factors(&mut buf, &factors).unwrap();
/// let loaded: ConvFactors<f32> = read_factors(buf.as_slice()).unwrap();
/// assert_eq!(loaded, factors);
/// ```
pub fn write_factors<W, T>(mut writer: W, factors: &ConvFactors<T>) -> Result<(), CpError>
where
    W: Write,
    T: FactorElement,
{
    writer.write_all(MAGIC)?;
    writer.write_all(&VERSION.to_le_bytes())?;
    writer.write_all(&MATRIX_COUNT.to_le_bytes())?;

    for matrix in [factors.f_in(), factors.f_h(), factors.f_w(), factors.f_out()] {
        writer.write_all(&[T::DTYPE])?;
        writer.write_all(&2u32.to_le_bytes())?;
        for &dim in matrix.shape() {
            writer.write_all(&(dim as u64).to_le_bytes())?;
        }
        // Logical order is row-major regardless of memory layout
        for &value in matrix.iter() {
            value.write_le(&mut writer)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// Read a factor set written by [`write_factors`]
///
/// The element type in the file must match `T`. The loaded matrices are
/// validated as a factor set.
pub fn read_factors<R, T>(mut reader: R) -> Result<ConvFactors<T>, CpError>
where
    R: Read,
    T: FactorElement,
{
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(CpError::Format(format!("bad magic bytes {:?}", magic)));
    }

    let version = read_u32(&mut reader)?;
    if version != VERSION {
        return Err(CpError::Format(format!(
            "unsupported version {} (expected {})",
            version, VERSION
        )));
    }

    let count = read_u32(&mut reader)?;
    if count != MATRIX_COUNT {
        return Err(CpError::Format(format!(
            "expected {} matrices, found {}",
            MATRIX_COUNT, count
        )));
    }

    let f_in = read_matrix::<_, T>(&mut reader)?;
    let f_h = read_matrix::<_, T>(&mut reader)?;
    let f_w = read_matrix::<_, T>(&mut reader)?;
    let f_out = read_matrix::<_, T>(&mut reader)?;

    ConvFactors::new(f_in, f_h, f_w, f_out)
}

/// Write a factor set to a file
pub fn save_factors<P, T>(path: P, factors: &ConvFactors<T>) -> Result<(), CpError>
where
    P: AsRef<Path>,
    T: FactorElement,
{
    let file = File::create(path)?;
    write_factors(BufWriter::new(file), factors)
}

/// Read a factor set from a file
pub fn load_factors<P, T>(path: P) -> Result<ConvFactors<T>, CpError>
where
    P: AsRef<Path>,
    T: FactorElement,
{
    let file = File::open(path)?;
    read_factors(BufReader::new(file))
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32, CpError> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_dim<R: Read>(reader: &mut R) -> Result<usize, CpError> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    let dim = u64::from_le_bytes(bytes);
    usize::try_from(dim).map_err(|_| CpError::Format(format!("dimension {} too large", dim)))
}

fn read_matrix<R, T>(reader: &mut R) -> Result<Array2<T>, CpError>
where
    R: Read,
    T: FactorElement,
{
    let mut dtype = [0u8; 1];
    reader.read_exact(&mut dtype)?;
    if dtype[0] != T::DTYPE {
        return Err(CpError::Format(format!(
            "element type {} does not match requested type {}",
            dtype[0],
            T::DTYPE
        )));
    }

    let ndim = read_u32(reader)?;
    if ndim != 2 {
        return Err(CpError::Format(format!(
            "factor matrices must have 2 dimensions, found {}",
            ndim
        )));
    }

    let rows = read_dim(reader)?;
    let cols = read_dim(reader)?;
    let len = rows
        .checked_mul(cols)
        .ok_or_else(|| CpError::Format(format!("matrix {}x{} is too large", rows, cols)))?;

    // Truncated files surface as UnexpectedEof before this grows large
    let mut data = Vec::with_capacity(len.min(1 << 20));
    for _ in 0..len {
        data.push(T::read_le(reader)?);
    }

    Array2::from_shape_vec((rows, cols), data).map_err(|e| CpError::Format(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;
    use std::env;

    fn sample() -> ConvFactors<f64> {
        ConvFactors::new(
            array![[1.0, 0.5], [0.0, -1.0], [2.0, 0.25]],
            array![[1.0, 0.0], [0.5, 1.0], [-1.0, 2.0]],
            array![[0.5, 1.0], [1.0, 1.0], [0.0, -0.5]],
            array![[1.0, 2.0, 0.0, -1.0], [0.5, 0.0, 1.0, 1.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_write_read_roundtrip() {
        let factors = sample();
        let mut buf = Vec::new();
        write_factors(&mut buf, &factors).unwrap();

        // header + 4 × (tag + ndim + dims) + data
        let data_bytes = 8 * factors.num_parameters();
        assert_eq!(buf.len(), 12 + 4 * (1 + 4 + 16) + data_bytes);
        assert_eq!(&buf[0..4], b"CPCF");

        let loaded: ConvFactors<f64> = read_factors(buf.as_slice()).unwrap();
        assert_eq!(loaded, factors);
    }

    #[test]
    fn test_transposed_layout_is_written_row_major() {
        let factors = sample();
        let (f_in, f_h, f_w, f_out) = factors.clone().into_parts();
        // Same values, column-major memory for f_out
        let f_out_f = f_out
            .reversed_axes()
            .as_standard_layout()
            .into_owned()
            .reversed_axes();
        let reordered = ConvFactors::new(f_in, f_h, f_w, f_out_f).unwrap();

        let mut a = Vec::new();
        let mut b = Vec::new();
        write_factors(&mut a, &factors).unwrap();
        write_factors(&mut b, &reordered).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_file_roundtrip() {
        let path = env::temp_dir().join("cpconv_factors_roundtrip.cpcf");
        let factors = sample();
        save_factors(&path, &factors).unwrap();
        let loaded: ConvFactors<f64> = load_factors(&path).unwrap();
        assert_eq!(loaded, factors);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_magic_bytes() {
        let mut buf = Vec::new();
        write_factors(&mut buf, &sample()).unwrap();
        buf[0] = b'X';
        let result: Result<ConvFactors<f64>, _> = read_factors(buf.as_slice());
        assert!(matches!(result, Err(CpError::Format(_))));
    }

    #[test]
    fn test_element_type_mismatch() {
        let mut buf = Vec::new();
        write_factors(&mut buf, &sample()).unwrap();
        let result: Result<ConvFactors<f32>, _> = read_factors(buf.as_slice());
        assert!(matches!(result, Err(CpError::Format(_))));
    }

    #[test]
    fn test_unsupported_version() {
        let mut buf = Vec::new();
        write_factors(&mut buf, &sample()).unwrap();
        buf[4..8].copy_from_slice(&7u32.to_le_bytes());
        let result: Result<ConvFactors<f64>, _> = read_factors(buf.as_slice());
        assert!(matches!(result, Err(CpError::Format(_))));
    }

    #[test]
    fn test_truncated_file() {
        let mut buf = Vec::new();
        write_factors(&mut buf, &sample()).unwrap();
        buf.truncate(buf.len() - 3);
        let result: Result<ConvFactors<f64>, _> = read_factors(buf.as_slice());
        assert!(matches!(result, Err(CpError::Io(_))));
    }

    #[test]
    fn test_inconsistent_ranks_rejected_on_load() {
        let mut buf = Vec::new();
        write_factors(&mut buf, &sample()).unwrap();
        // f_in header starts at byte 12: tag(1) ndim(4) rows(8) cols(8)
        // Claim f_in is 6x1 instead of 3x2; same element count
        buf[17..25].copy_from_slice(&6u64.to_le_bytes());
        buf[25..33].copy_from_slice(&1u64.to_le_bytes());
        let result: Result<ConvFactors<f64>, _> = read_factors(buf.as_slice());
        assert!(matches!(result, Err(CpError::InvalidFactorSet(_))));
    }
}
