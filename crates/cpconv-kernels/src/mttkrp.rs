//! MTTKRP (Matricized Tensor Times Khatri-Rao Product)
//!
//! MTTKRP is the computational bottleneck of CP-ALS. For tensor X and factor
//! matrices U₁, ..., Uₙ it computes
//!
//! V = X_(mode) × (U₁ ⊙ ... ⊙ U_(mode-1) ⊙ U_(mode+1) ⊙ ... ⊙ Uₙ)
//!
//! with the remaining factors taken in forward order, matching the column
//! order of [`to_matrix`](crate::to_matrix).
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.

use crate::error::{KernelError, KernelResult};
use crate::khatri_rao::khatri_rao_list;
use crate::shape_ops::to_matrix;
use scirs2_core::ndarray_ext::{Array2, ArrayView, ArrayView2, IxDyn};
use scirs2_core::numeric::Float;

/// Check that `factors` fits `shape` and return the shared CP rank
pub fn validate_factors<T>(
    operation: &str,
    shape: &[usize],
    factors: &[ArrayView2<T>],
) -> KernelResult<usize> {
    if factors.len() != shape.len() {
        return Err(KernelError::shape_mismatch(
            operation,
            vec![shape.len()],
            vec![factors.len()],
            "one factor matrix per tensor mode",
        ));
    }

    let rank = factors.first().map(|f| f.ncols()).unwrap_or(0);
    for (i, (factor, &dim)) in factors.iter().zip(shape).enumerate() {
        if factor.ncols() != rank {
            return Err(KernelError::rank_mismatch(operation, rank, factor.ncols(), i));
        }
        if factor.nrows() != dim {
            return Err(KernelError::shape_mismatch(
                operation,
                vec![dim, rank],
                factor.shape().to_vec(),
                format!("factor {} rows must equal the mode-{} size", i, i),
            ));
        }
    }
    Ok(rank)
}

/// Compute MTTKRP for `mode`
///
/// Returns a matrix of shape (I_mode, R).
///
/// # Errors
///
/// - [`KernelError::InvalidMode`] if `mode` is out of bounds
/// - [`KernelError::ShapeMismatch`] / [`KernelError::RankMismatch`] if the
///   factors do not fit the tensor
///
/// # Complexity
///
/// Time: O(I_mode × R × ∏ᵢ≠mode Iᵢ)
/// Space: O(R × ∏ᵢ≠mode Iᵢ) for the Khatri-Rao product
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::{Array, Array2};
/// use cpconv_kernels::mttkrp;
///
/// let tensor = Array::from_shape_vec(vec![2, 3, 4], (0..24).map(|x| x as f64).collect()).unwrap();
/// let u1 = Array2::<f64>::ones((2, 2));
/// let u2 = Array2::<f64>::ones((3, 2));
/// let u3 = Array2::<f64>::ones((4, 2));
///
/// let v = mttkrp(&tensor.view(), &[u1.view(), u2.view(), u3.view()], 1).unwrap();
/// assert_eq!(v.shape(), &[3, 2]);
/// ```
pub fn mttkrp<T>(
    tensor: &ArrayView<T, IxDyn>,
    factors: &[ArrayView2<T>],
    mode: usize,
) -> KernelResult<Array2<T>>
where
    T: Float + 'static,
{
    let ndim = tensor.ndim();
    if mode >= ndim {
        return Err(KernelError::invalid_mode(
            mode,
            ndim,
            "mttkrp: mode out of bounds",
        ));
    }
    let rank = validate_factors("mttkrp", tensor.shape(), factors)?;

    let unfolded = to_matrix(tensor, &[mode])?;
    let others: Vec<ArrayView2<T>> = factors
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != mode)
        .map(|(_, f)| f.view())
        .collect();

    if others.is_empty() {
        // Order-1 tensor: the unfolding is a column, broadcast across the rank
        return Ok(unfolded.dot(&Array2::<T>::ones((1, rank))));
    }

    let kr = khatri_rao_list(&others)?;
    Ok(unfolded.dot(&kr))
}

/// Hadamard product of the Gram matrices `UₖᵀUₖ` for every `k != skip`
///
/// This is the (R × R) system matrix of the ALS update for mode `skip`.
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::array;
/// use cpconv_kernels::gram_hadamard;
///
/// let a = array![[1.0, 0.0], [0.0, 2.0]];
/// let b = array![[1.0, 1.0], [1.0, 1.0]];
/// let g = gram_hadamard(&[a.view(), b.view()], 0);
/// assert_eq!(g, b.t().dot(&b));
/// ```
pub fn gram_hadamard<T>(factors: &[ArrayView2<T>], skip: usize) -> Array2<T>
where
    T: Float + 'static,
{
    let rank = factors.first().map(|f| f.ncols()).unwrap_or(0);
    let mut gram = Array2::<T>::ones((rank, rank));
    for (k, factor) in factors.iter().enumerate() {
        if k == skip {
            continue;
        }
        let g = factor.t().dot(factor);
        gram.zip_mut_with(&g, |acc, &x| *acc = *acc * x);
    }
    gram
}
