//! Outer products and CP reconstruction
//!
//! For vectors v₁, ..., vₙ the outer product is the tensor
//! `T[i₁, ..., iₙ] = v₁[i₁] × ... × vₙ[iₙ]`. A CP model is a weighted sum of
//! such rank-1 tensors, one per column of the factor matrices.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.

use crate::error::{KernelError, KernelResult};
use crate::khatri_rao::khatri_rao_list;
use scirs2_core::ndarray_ext::{Array, Array2, ArrayView1, ArrayView2, IxDyn};
use scirs2_core::numeric::{Float, Num};

/// Outer product of N vectors into an N-D tensor
///
/// # Errors
///
/// [`KernelError::EmptyInput`] if no vectors are given.
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::array;
/// use cpconv_kernels::outer_product;
///
/// let h = array![1.0, 2.0];
/// let w = array![3.0, 4.0, 5.0];
/// let c = array![6.0, 7.0];
///
/// let tensor = outer_product(&[h.view(), w.view(), c.view()]).unwrap();
/// assert_eq!(tensor.shape(), &[2, 3, 2]);
/// assert_eq!(tensor[[1, 2, 1]], 2.0 * 5.0 * 7.0);
/// ```
pub fn outer_product<T>(vectors: &[ArrayView1<T>]) -> KernelResult<Array<T, IxDyn>>
where
    T: Clone + Num,
{
    let (first, rest) = vectors
        .split_first()
        .ok_or_else(|| KernelError::empty_input("outer_product", "vectors"))?;

    // Grow one mode at a time: flat buffer of the running product, row-major
    let mut values: Vec<T> = first.to_vec();
    for v in rest {
        let mut next = Vec::with_capacity(values.len() * v.len());
        for a in &values {
            for b in v.iter() {
                next.push(a.clone() * b.clone());
            }
        }
        values = next;
    }

    let shape: Vec<usize> = vectors.iter().map(|v| v.len()).collect();
    Array::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| KernelError::operation_error("outer_product", e.to_string()))
}

/// Reconstruct a tensor from CP factors: `∑ᵣ λᵣ · A₁[:,r] ⊗ ... ⊗ Aₙ[:,r]`
///
/// Each factor is (Iₖ × R); `weights` defaults to all ones. Computed as
/// `A₁ · diag(λ) · (A₂ ⊙ ... ⊙ Aₙ)ᵀ` folded back to `(I₁, ..., Iₙ)`.
///
/// # Errors
///
/// - [`KernelError::EmptyInput`] without factors
/// - [`KernelError::RankMismatch`] if column counts differ
/// - [`KernelError::ShapeMismatch`] if `weights` has the wrong length
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::array;
/// use cpconv_kernels::cp_reconstruct;
///
/// let a = array![[1.0], [2.0]];
/// let b = array![[3.0], [4.0]];
/// let t = cp_reconstruct(&[a.view(), b.view()], None).unwrap();
/// assert_eq!(t[[1, 1]], 8.0);
/// ```
pub fn cp_reconstruct<T>(
    factors: &[ArrayView2<T>],
    weights: Option<&ArrayView1<T>>,
) -> KernelResult<Array<T, IxDyn>>
where
    T: Float + 'static,
{
    let (first, rest) = factors
        .split_first()
        .ok_or_else(|| KernelError::empty_input("cp_reconstruct", "factors"))?;
    let rank = first.ncols();

    let mut scaled: Array2<T> = first.to_owned();
    if let Some(w) = weights {
        if w.len() != rank {
            return Err(KernelError::shape_mismatch(
                "cp_reconstruct",
                vec![rank],
                vec![w.len()],
                "One weight per CP component",
            ));
        }
        for (mut col, &lambda) in scaled.columns_mut().into_iter().zip(w.iter()) {
            col.mapv_inplace(|x| x * lambda);
        }
    }

    let shape: Vec<usize> = factors.iter().map(|f| f.nrows()).collect();
    let unfolded = if rest.is_empty() {
        scaled.dot(&Array2::<T>::ones((rank, 1)))
    } else {
        let kr = khatri_rao_list(rest)?;
        scaled.dot(&kr.t())
    };

    unfolded
        .into_shape_with_order(IxDyn(&shape))
        .map_err(|e| KernelError::operation_error("cp_reconstruct", e.to_string()))
}
