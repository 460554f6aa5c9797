//! Reshaping and matricization on array views
//!
//! These are the view-level counterparts of the methods on
//! [`DenseND`](cpconv_core::DenseND), reporting failures as [`KernelError`]
//! so they compose with the rest of the kernel routines.

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{Array, Array2, ArrayView, IxDyn};
use scirs2_core::numeric::Num;

/// Reshape to `new_shape`, reading elements in logical row-major order
///
/// Works on any view, including permuted or sliced ones; the result is a
/// fresh standard-layout array.
///
/// # Errors
///
/// [`KernelError::ShapeMismatch`] if the element counts differ.
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::Array;
/// use cpconv_kernels::reshape;
///
/// let k = Array::<f64, _>::zeros(vec![3, 3, 4, 8]);
/// assert_eq!(reshape(&k.view(), &[9, 32]).unwrap().shape(), &[9, 32]);
/// assert!(reshape(&k.view(), &[10, 32]).is_err());
/// ```
pub fn reshape<T>(a: &ArrayView<T, IxDyn>, new_shape: &[usize]) -> KernelResult<Array<T, IxDyn>>
where
    T: Clone + Num,
{
    check_len("reshape", a.shape(), new_shape)?;
    let flat: Vec<T> = a.iter().cloned().collect();
    Array::from_shape_vec(IxDyn(new_shape), flat)
        .map_err(|e| KernelError::operation_error("reshape", e.to_string()))
}

/// Zero-copy reshape of a standard-layout view
///
/// # Errors
///
/// - [`KernelError::ShapeMismatch`] if the element counts differ
/// - [`KernelError::InvalidArgument`] if the view is not in standard layout;
///   use [`reshape`] for those
pub fn reshape_view<'a, T>(
    a: ArrayView<'a, T, IxDyn>,
    new_shape: &[usize],
) -> KernelResult<ArrayView<'a, T, IxDyn>> {
    check_len("reshape_view", a.shape(), new_shape)?;
    if !a.is_standard_layout() {
        return Err(KernelError::invalid_argument(
            "reshape_view",
            "a",
            "view is not in standard layout and cannot be reshaped without copying",
        ));
    }
    a.into_shape_with_order(IxDyn(new_shape))
        .map_err(|e| KernelError::operation_error("reshape_view", e.to_string()))
}

fn check_len(operation: &str, from: &[usize], to: &[usize]) -> KernelResult<()> {
    let old: usize = from.iter().product();
    let new: usize = to.iter().product();
    if old != new {
        return Err(KernelError::shape_mismatch(
            operation,
            from.to_vec(),
            to.to_vec(),
            format!("cannot reshape {} elements into {}", old, new),
        ));
    }
    Ok(())
}

fn check_row_axes(operation: &str, ndim: usize, row_axes: &[usize]) -> KernelResult<()> {
    for (i, &axis) in row_axes.iter().enumerate() {
        if axis >= ndim {
            return Err(KernelError::invalid_mode(
                axis,
                ndim,
                format!("{}: row axis out of bounds", operation),
            ));
        }
        if row_axes[..i].contains(&axis) {
            return Err(KernelError::invalid_argument(
                operation,
                "row_axes",
                format!("axis {} listed twice", axis),
            ));
        }
    }
    Ok(())
}

/// Flatten into a matrix whose rows enumerate `row_axes` (in the given order)
/// and whose columns enumerate the remaining axes in forward order
///
/// `to_matrix(a, &[n])` is the mode-n unfolding.
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::Array;
/// use cpconv_kernels::to_matrix;
///
/// // (H, W, C, T) kernel with spatial axes as rows
/// let k = Array::<f64, _>::ones(vec![3, 3, 4, 8]);
/// let m = to_matrix(&k.view(), &[0, 1]).unwrap();
/// assert_eq!(m.shape(), &[9, 32]);
/// ```
pub fn to_matrix<T>(a: &ArrayView<T, IxDyn>, row_axes: &[usize]) -> KernelResult<Array2<T>>
where
    T: Clone + Num,
{
    check_row_axes("to_matrix", a.ndim(), row_axes)?;

    let shape = a.shape();
    let rows: usize = row_axes.iter().map(|&ax| shape[ax]).product();
    let cols: usize = (0..a.ndim())
        .filter(|ax| !row_axes.contains(ax))
        .map(|ax| shape[ax])
        .product();

    let perm: Vec<usize> = row_axes
        .iter()
        .copied()
        .chain((0..a.ndim()).filter(|ax| !row_axes.contains(ax)))
        .collect();
    let flat: Vec<T> = a.view().permuted_axes(IxDyn(&perm)).iter().cloned().collect();

    Array2::from_shape_vec((rows, cols), flat)
        .map_err(|e| KernelError::operation_error("to_matrix", e.to_string()))
}

/// Inverse of [`to_matrix`]: rebuild a tensor of `shape` from its matricization
///
/// # Errors
///
/// [`KernelError::ShapeMismatch`] if the matrix dims do not match `shape`
/// split by `row_axes`.
pub fn from_matrix<T>(
    matrix: &Array2<T>,
    shape: &[usize],
    row_axes: &[usize],
) -> KernelResult<Array<T, IxDyn>>
where
    T: Clone + Num,
{
    check_row_axes("from_matrix", shape.len(), row_axes)?;

    let col_axes: Vec<usize> = (0..shape.len()).filter(|ax| !row_axes.contains(ax)).collect();
    let rows: usize = row_axes.iter().map(|&ax| shape[ax]).product();
    let cols: usize = col_axes.iter().map(|&ax| shape[ax]).product();
    if matrix.dim() != (rows, cols) {
        return Err(KernelError::shape_mismatch(
            "from_matrix",
            vec![rows, cols],
            matrix.shape().to_vec(),
            format!("matrix does not fold into {:?}", shape),
        ));
    }

    let perm: Vec<usize> = row_axes.iter().chain(&col_axes).copied().collect();
    let permuted_shape: Vec<usize> = perm.iter().map(|&ax| shape[ax]).collect();
    let flat: Vec<T> = matrix.iter().cloned().collect();
    let permuted = Array::from_shape_vec(IxDyn(&permuted_shape), flat)
        .map_err(|e| KernelError::operation_error("from_matrix", e.to_string()))?;

    let mut inverse = vec![0; perm.len()];
    for (pos, &ax) in perm.iter().enumerate() {
        inverse[ax] = pos;
    }
    Ok(permuted
        .permuted_axes(IxDyn(&inverse))
        .as_standard_layout()
        .into_owned())
}
