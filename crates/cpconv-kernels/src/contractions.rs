//! Tensor contraction operations
//!
//! - [`contract_tensors`]: pairwise contraction over paired axes (einsum with
//!   free axes of `a` followed by free axes of `b`)
//! - [`mode_product`]: contract one axis against the rows of a matrix, keeping
//!   the axis in place; this is the channel-mixing step of a factored convolution
//!
//! Both lower to a single matrix multiplication after permuting and
//! flattening the operands.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{Array, Array2, ArrayView, ArrayView2, IxDyn};
use scirs2_core::numeric::Float;

fn validate_axes(
    operation: &str,
    axes: &[usize],
    ndim: usize,
    label: &str,
) -> KernelResult<()> {
    for (i, &axis) in axes.iter().enumerate() {
        if axis >= ndim {
            return Err(KernelError::invalid_mode(
                axis,
                ndim,
                format!("{}: {} axis out of bounds", operation, label),
            ));
        }
        if axes[..i].contains(&axis) {
            return Err(KernelError::invalid_argument(
                operation,
                label,
                format!("axis {} listed twice", axis),
            ));
        }
    }
    Ok(())
}

/// Permute `x` so that `leading` axes come first, then flatten into a matrix
/// of shape (∏ leading, ∏ rest).
fn flatten_axes<T>(
    operation: &str,
    x: &ArrayView<T, IxDyn>,
    leading: &[usize],
    trailing: &[usize],
) -> KernelResult<Array2<T>>
where
    T: Float,
{
    let shape = x.shape();
    let rows: usize = leading.iter().map(|&a| shape[a]).product();
    let cols: usize = trailing.iter().map(|&a| shape[a]).product();

    let perm: Vec<usize> = leading.iter().chain(trailing).copied().collect();
    let flat: Vec<T> = x.view().permuted_axes(IxDyn(&perm)).iter().copied().collect();
    Array2::from_shape_vec((rows, cols), flat)
        .map_err(|e| KernelError::operation_error(operation, e.to_string()))
}

/// Contract two tensors along paired axes
///
/// The output carries the free axes of `a` in order, followed by the free axes
/// of `b`. Contracting every axis yields a 0-dimensional array.
///
/// # Errors
///
/// - [`KernelError::ShapeMismatch`] if `axes_a` and `axes_b` differ in length
/// - [`KernelError::InvalidMode`] for an axis beyond the operand's rank
/// - [`KernelError::IncompatibleShapes`] if paired axes differ in size
///
/// # Complexity
///
/// Time: O(∏ free_a × ∏ contracted × ∏ free_b)
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::Array;
/// use cpconv_kernels::contract_tensors;
///
/// // einsum('nchw,cr->nhwr')
/// let x = Array::<f64, _>::ones(vec![1, 4, 5, 5]);
/// let f_in = Array::<f64, _>::ones(vec![4, 2]);
/// let y = contract_tensors(&x.view(), &f_in.view(), &[1], &[0]).unwrap();
/// assert_eq!(y.shape(), &[1, 5, 5, 2]);
/// assert_eq!(y[[0, 0, 0, 0]], 4.0);
/// ```
pub fn contract_tensors<T>(
    a: &ArrayView<T, IxDyn>,
    b: &ArrayView<T, IxDyn>,
    axes_a: &[usize],
    axes_b: &[usize],
) -> KernelResult<Array<T, IxDyn>>
where
    T: Float + 'static,
{
    if axes_a.len() != axes_b.len() {
        return Err(KernelError::shape_mismatch(
            "contract_tensors",
            vec![axes_a.len()],
            vec![axes_b.len()],
            "Both operands must list the same number of contracted axes",
        ));
    }

    validate_axes("contract_tensors", axes_a, a.ndim(), "axes_a")?;
    validate_axes("contract_tensors", axes_b, b.ndim(), "axes_b")?;

    for (&ax_a, &ax_b) in axes_a.iter().zip(axes_b) {
        if a.shape()[ax_a] != b.shape()[ax_b] {
            return Err(KernelError::incompatible_shapes(
                "contract_tensors",
                a.shape().to_vec(),
                b.shape().to_vec(),
                format!(
                    "axis {} of a has size {}, axis {} of b has size {}",
                    ax_a,
                    a.shape()[ax_a],
                    ax_b,
                    b.shape()[ax_b]
                ),
            ));
        }
    }

    let free_a: Vec<usize> = (0..a.ndim()).filter(|m| !axes_a.contains(m)).collect();
    let free_b: Vec<usize> = (0..b.ndim()).filter(|m| !axes_b.contains(m)).collect();

    let a_mat = flatten_axes("contract_tensors", a, &free_a, axes_a)?;
    let b_mat = flatten_axes("contract_tensors", b, axes_b, &free_b)?;
    let product = a_mat.dot(&b_mat);

    let out_shape: Vec<usize> = free_a
        .iter()
        .map(|&m| a.shape()[m])
        .chain(free_b.iter().map(|&m| b.shape()[m]))
        .collect();

    product
        .into_shape_with_order(IxDyn(&out_shape))
        .map_err(|e| KernelError::operation_error("contract_tensors", e.to_string()))
}

/// Contract `axis` of `x` against the rows of `matrix`, keeping the axis position
///
/// `y[.., j, ..] = ∑ᵢ x[.., i, ..] · matrix[i, j]`, so the axis size changes
/// from `matrix.nrows()` to `matrix.ncols()`.
///
/// # Errors
///
/// - [`KernelError::InvalidMode`] if `axis` is out of bounds
/// - [`KernelError::ShapeMismatch`] if the axis size differs from `matrix.nrows()`
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::{Array, Array2};
/// use cpconv_kernels::mode_product;
///
/// // NHWC input, 4 channels mixed down to rank 2
/// let x = Array::<f64, _>::ones(vec![1, 3, 3, 4]);
/// let f_in = Array2::<f64>::ones((4, 2));
/// let y = mode_product(&x.view(), &f_in.view(), 3).unwrap();
/// assert_eq!(y.shape(), &[1, 3, 3, 2]);
/// ```
pub fn mode_product<T>(
    x: &ArrayView<T, IxDyn>,
    matrix: &ArrayView2<T>,
    axis: usize,
) -> KernelResult<Array<T, IxDyn>>
where
    T: Float + 'static,
{
    if axis >= x.ndim() {
        return Err(KernelError::invalid_mode(
            axis,
            x.ndim(),
            "mode_product: axis out of bounds",
        ));
    }
    if x.shape()[axis] != matrix.nrows() {
        let mut expected = x.shape().to_vec();
        expected[axis] = matrix.nrows();
        return Err(KernelError::shape_mismatch(
            "mode_product",
            expected,
            x.shape().to_vec(),
            format!(
                "axis {} must have {} entries to match the matrix rows",
                axis,
                matrix.nrows()
            ),
        ));
    }

    let others: Vec<usize> = (0..x.ndim()).filter(|&m| m != axis).collect();
    let x_mat = flatten_axes("mode_product", x, &others, &[axis])?;
    let product = x_mat.dot(matrix);

    // Result is laid out as [others..., new_axis]; move the new axis back
    let mut inter_shape: Vec<usize> = others.iter().map(|&m| x.shape()[m]).collect();
    inter_shape.push(matrix.ncols());
    let inter = product
        .into_shape_with_order(IxDyn(&inter_shape))
        .map_err(|e| KernelError::operation_error("mode_product", e.to_string()))?;

    let last = x.ndim() - 1;
    let mut perm: Vec<usize> = (0..last).collect();
    perm.insert(axis, last);
    Ok(inter
        .permuted_axes(IxDyn(&perm))
        .as_standard_layout()
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    fn seq(shape: &[usize]) -> Array<f64, IxDyn> {
        let n: usize = shape.iter().product();
        Array::from_shape_vec(IxDyn(shape), (0..n).map(|x| x as f64).collect()).unwrap()
    }

    #[test]
    fn test_contract_matches_matmul() {
        let a = seq(&[2, 3]);
        let b = seq(&[3, 4]);
        let result = contract_tensors(&a.view(), &b.view(), &[1], &[0]).unwrap();

        let a2 = a.clone().into_dimensionality::<scirs2_core::ndarray_ext::Ix2>().unwrap();
        let b2 = b.clone().into_dimensionality::<scirs2_core::ndarray_ext::Ix2>().unwrap();
        let expected = a2.dot(&b2);
        assert_eq!(result.shape(), &[2, 4]);
        for i in 0..2 {
            for j in 0..4 {
                assert_eq!(result[[i, j]], expected[[i, j]]);
            }
        }
    }

    #[test]
    fn test_contract_against_loops() {
        // einsum('ijk,kjl->il')
        let a = seq(&[2, 3, 4]);
        let b = seq(&[4, 3, 5]);
        let result = contract_tensors(&a.view(), &b.view(), &[1, 2], &[1, 0]).unwrap();
        assert_eq!(result.shape(), &[2, 5]);

        for i in 0..2 {
            for l in 0..5 {
                let mut sum = 0.0;
                for j in 0..3 {
                    for k in 0..4 {
                        sum += a[[i, j, k]] * b[[k, j, l]];
                    }
                }
                assert_eq!(result[[i, l]], sum);
            }
        }
    }

    #[test]
    fn test_contract_full_is_scalar() {
        let a = seq(&[2, 3]);
        let result = contract_tensors(&a.view(), &a.view(), &[0, 1], &[0, 1]).unwrap();
        assert_eq!(result.ndim(), 0);
        let expected: f64 = (0..6).map(|x| (x * x) as f64).sum();
        assert_eq!(result[IxDyn(&[])], expected);
    }

    #[test]
    fn test_contract_errors() {
        let a = seq(&[2, 3]);
        let b = seq(&[4, 3]);

        assert!(matches!(
            contract_tensors(&a.view(), &b.view(), &[1], &[]),
            Err(KernelError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            contract_tensors(&a.view(), &b.view(), &[2], &[0]),
            Err(KernelError::InvalidMode { .. })
        ));
        assert!(matches!(
            contract_tensors(&a.view(), &b.view(), &[0], &[0]),
            Err(KernelError::IncompatibleShapes { .. })
        ));
        assert!(matches!(
            contract_tensors(&a.view(), &a.view(), &[0, 0], &[0, 1]),
            Err(KernelError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_mode_product_keeps_axis_position() {
        let x = seq(&[2, 3, 4]);
        let m = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let y = mode_product(&x.view(), &m.view(), 1).unwrap();
        assert_eq!(y.shape(), &[2, 2, 4]);

        for i in 0..2 {
            for k in 0..4 {
                assert_eq!(y[[i, 0, k]], x[[i, 0, k]] + x[[i, 2, k]]);
                assert_eq!(y[[i, 1, k]], x[[i, 1, k]] + x[[i, 2, k]]);
            }
        }
    }

    #[test]
    fn test_mode_product_on_strided_view() {
        let x = seq(&[3, 2]);
        let xt = x.view().reversed_axes();
        let m = array![[2.0], [1.0], [0.0]];
        let y = mode_product(&xt, &m.view(), 1).unwrap();
        assert_eq!(y.shape(), &[2, 1]);
        assert_eq!(y[[0, 0]], 2.0 * x[[0, 0]] + x[[1, 0]]);
        assert_eq!(y[[1, 0]], 2.0 * x[[0, 1]] + x[[1, 1]]);
    }

    #[test]
    fn test_mode_product_errors() {
        let x = seq(&[2, 3]);
        let m = Array2::<f64>::ones((4, 2));
        assert!(matches!(
            mode_product(&x.view(), &m.view(), 1),
            Err(KernelError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            mode_product(&x.view(), &m.view(), 2),
            Err(KernelError::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_flatten_axes_permutes_then_flattens() {
        let x = seq(&[2, 3, 4]);
        let flat = flatten_axes("test", &x.view(), &[2, 0], &[1]).unwrap();
        assert_eq!(flat.shape(), &[8, 3]);
        // Row (k, i), column j holds x[i, j, k]
        assert_eq!(flat[[0, 1]], x[[0, 1, 0]]);
        assert_eq!(flat[[1, 2]], x[[1, 2, 0]]);
        assert_eq!(flat[[7, 0]], x[[1, 0, 3]]);

        let empty = seq(&[0, 3]);
        let flat = flatten_axes("test", &empty.view(), &[0], &[1]).unwrap();
        assert_eq!(flat.shape(), &[0, 3]);
    }
}
