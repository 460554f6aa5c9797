//! Khatri-Rao product (column-wise Kronecker product)
//!
//! For A (I × R) and B (J × R), C = A ⊙ B is (I·J × R) with row `ia * J + ib`
//! holding `A[ia, r] * B[ib, r]`. This is the column ordering produced by
//! [`DenseND::unfold`](cpconv_core::DenseND::unfold) for the remaining modes,
//! so `unfold(X, n) ≈ F_n · (⊙_{k≠n} F_k)ᵀ` for a CP model taken in forward
//! mode order.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.

use crate::error::{KernelError, KernelResult};
use scirs2_core::ndarray_ext::{Array2, ArrayView2};
use scirs2_core::numeric::Num;

#[cfg(feature = "parallel")]
use scirs2_core::ndarray_ext::Axis;

fn check_columns<T>(operation: &str, a: &ArrayView2<T>, b: &ArrayView2<T>) -> KernelResult<()> {
    if a.ncols() != b.ncols() {
        return Err(KernelError::rank_mismatch(
            operation,
            a.ncols(),
            b.ncols(),
            1,
        ));
    }
    Ok(())
}

/// Khatri-Rao product of two matrices with equal column counts
///
/// # Errors
///
/// [`KernelError::RankMismatch`] if the column counts differ.
///
/// # Complexity
///
/// Time: O(I * J * R)
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::array;
/// use cpconv_kernels::khatri_rao;
///
/// let a = array![[1.0, 2.0], [3.0, 4.0]];
/// let b = array![[5.0, 6.0], [7.0, 8.0]];
/// let c = khatri_rao(&a.view(), &b.view()).unwrap();
/// assert_eq!(c.shape(), &[4, 2]);
///
/// // First column: [1*5, 1*7, 3*5, 3*7]
/// assert_eq!(c.column(0).to_vec(), vec![5.0, 7.0, 15.0, 21.0]);
/// ```
pub fn khatri_rao<T>(a: &ArrayView2<T>, b: &ArrayView2<T>) -> KernelResult<Array2<T>>
where
    T: Clone + Num,
{
    check_columns("khatri_rao", a, b)?;
    let (i, rank) = a.dim();
    let j = b.nrows();

    let mut result = Array2::<T>::zeros((i * j, rank));
    for col in 0..rank {
        let a_col = a.column(col);
        let b_col = b.column(col);
        for (ia, a_val) in a_col.iter().enumerate() {
            for (ib, b_val) in b_col.iter().enumerate() {
                result[[ia * j + ib, col]] = a_val.clone() * b_val.clone();
            }
        }
    }

    Ok(result)
}

/// Khatri-Rao product with columns computed in parallel
///
/// Produces exactly the same matrix as [`khatri_rao`].
#[cfg(feature = "parallel")]
pub fn khatri_rao_parallel<T>(a: &ArrayView2<T>, b: &ArrayView2<T>) -> KernelResult<Array2<T>>
where
    T: Clone + Num + Send + Sync,
{
    use scirs2_core::parallel_ops::*;

    check_columns("khatri_rao_parallel", a, b)?;
    let (i, rank) = a.dim();
    let j = b.nrows();

    let mut result = Array2::<T>::zeros((i * j, rank));
    result
        .axis_iter_mut(Axis(1))
        .into_par_iter()
        .enumerate()
        .for_each(|(col, mut out)| {
            let a_col = a.column(col);
            let b_col = b.column(col);
            for (ia, a_val) in a_col.iter().enumerate() {
                for (ib, b_val) in b_col.iter().enumerate() {
                    out[ia * j + ib] = a_val.clone() * b_val.clone();
                }
            }
        });

    Ok(result)
}

/// Khatri-Rao product of a sequence of matrices, left to right
///
/// `[A, B, C]` yields `(A ⊙ B) ⊙ C` whose row index is `(ia * J + ib) * K + ic`.
///
/// # Errors
///
/// [`KernelError::EmptyInput`] for an empty list, [`KernelError::RankMismatch`]
/// naming the first matrix whose column count differs.
pub fn khatri_rao_list<T>(matrices: &[ArrayView2<T>]) -> KernelResult<Array2<T>>
where
    T: Clone + Num,
{
    let (first, rest) = matrices
        .split_first()
        .ok_or_else(|| KernelError::empty_input("khatri_rao_list", "matrices"))?;

    let rank = first.ncols();
    for (idx, m) in rest.iter().enumerate() {
        if m.ncols() != rank {
            return Err(KernelError::rank_mismatch(
                "khatri_rao_list",
                rank,
                m.ncols(),
                idx + 1,
            ));
        }
    }

    let mut acc = first.to_owned();
    for m in rest {
        acc = khatri_rao(&acc.view(), m)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    #[test]
    fn test_khatri_rao_row_order() {
        // A: 3×2, B: 2×2 => 6×2
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let b = array![[7.0, 8.0], [9.0, 10.0]];
        let c = khatri_rao(&a.view(), &b.view()).unwrap();

        assert_eq!(c.shape(), &[6, 2]);
        assert_eq!(
            c.column(0).to_vec(),
            vec![7.0, 9.0, 21.0, 27.0, 35.0, 45.0]
        );
        assert_eq!(
            c.column(1).to_vec(),
            vec![16.0, 20.0, 32.0, 40.0, 48.0, 60.0]
        );
    }

    #[test]
    fn test_khatri_rao_mismatched_columns() {
        let a = array![[1.0, 2.0, 3.0]];
        let b = array![[4.0, 5.0]];
        let err = khatri_rao(&a.view(), &b.view()).unwrap_err();
        assert!(matches!(
            err,
            KernelError::RankMismatch {
                expected_rank: 3,
                actual_rank: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_khatri_rao_list_matches_nested() {
        let a = array![[1.0, -1.0], [2.0, 0.5]];
        let b = array![[3.0, 1.0], [0.0, 2.0], [1.0, 1.0]];
        let c = array![[2.0, 4.0], [1.0, -3.0]];

        let nested = khatri_rao(&khatri_rao(&a.view(), &b.view()).unwrap().view(), &c.view()).unwrap();
        let listed = khatri_rao_list(&[a.view(), b.view(), c.view()]).unwrap();
        assert_eq!(nested, listed);
        assert_eq!(listed.shape(), &[12, 2]);

        // Row (ia=1, ib=2, ic=0) = (1*3 + 2)*2 + 0 = 10
        assert_eq!(listed[[10, 0]], 2.0 * 1.0 * 2.0);
        assert_eq!(listed[[10, 1]], 0.5 * 1.0 * 4.0);
    }

    #[test]
    fn test_khatri_rao_list_errors() {
        let empty: Vec<ArrayView2<f64>> = Vec::new();
        assert!(matches!(
            khatri_rao_list(&empty),
            Err(KernelError::EmptyInput { .. })
        ));

        let a = Array2::<f64>::ones((2, 3));
        let b = Array2::<f64>::ones((2, 3));
        let c = Array2::<f64>::ones((2, 2));
        assert!(matches!(
            khatri_rao_list(&[a.view(), b.view(), c.view()]),
            Err(KernelError::RankMismatch {
                factor_index: 2,
                ..
            })
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_khatri_rao_parallel_matches_serial() {
        let a = array![[1.0, 2.0, 0.5], [3.0, 4.0, -1.0], [0.0, 1.0, 2.0]];
        let b = array![[5.0, 6.0, 1.0], [7.0, 8.0, 2.0]];

        let serial = khatri_rao(&a.view(), &b.view()).unwrap();
        let parallel = khatri_rao_parallel(&a.view(), &b.view()).unwrap();
        assert_eq!(serial, parallel);
    }
}
