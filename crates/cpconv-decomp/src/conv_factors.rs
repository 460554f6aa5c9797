//! CP factorization of convolution kernels
//!
//! An HWIO kernel `K[h, w, c, t]` of CP rank R is stored as four matrices:
//!
//! ```text
//! K[h, w, c, t] = Σᵣ f_h[h, r] · f_w[w, r] · f_in[c, r] · f_out[r, t]
//! ```
//!
//! `f_out` is kept as an (R, T) matrix so that output mixing is a plain
//! matrix product over the rank axis. Component weights from ALS are folded
//! into `f_out`.

use crate::cp::{cp_als, ConvergenceStatus, CpAlsConfig, CpDecomp};
use crate::error::CpError;
use cpconv_core::KernelTensor;
use cpconv_kernels::cp_reconstruct;
use scirs2_core::ndarray_ext::{Array2, Axis, Ix4, ScalarOperand};
use scirs2_core::numeric::{Float, FloatConst, NumAssign, NumCast};
use std::iter::Sum;
use tracing::debug;

/// The four factor matrices of a rank-R convolution kernel
///
/// Shapes: `f_in` (C, R), `f_h` (H, R), `f_w` (W, R), `f_out` (R, T).
/// Construction validates that all four share the same rank.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvFactors<T> {
    f_in: Array2<T>,
    f_h: Array2<T>,
    f_w: Array2<T>,
    f_out: Array2<T>,
}

impl<T> ConvFactors<T>
where
    T: Float + 'static,
{
    /// Build a factor set, checking that the shapes agree
    ///
    /// # Examples
    ///
    /// ```
    /// use scirs2_core::ndarray_ext::Array2;
    /// use cpconv_decomp::ConvFactors;
    ///
    /// let factors = ConvFactors::new(
    ///     Array2::<f64>::ones((4, 2)),
    ///     Array2::<f64>::ones((3, 2)),
    ///     Array2::<f64>::ones((3, 2)),
    ///     Array2::<f64>::ones((2, 8)),
    /// )
    /// .unwrap();
    /// assert_eq!(factors.rank(), 2);
    /// assert_eq!(factors.kernel_dims(), [3, 3, 4, 8]);
    ///
    /// // f_out must have one row per component
    /// assert!(ConvFactors::new(
    ///     Array2::<f64>::ones((4, 2)),
    ///     Array2::<f64>::ones((3, 2)),
    ///     Array2::<f64>::ones((3, 2)),
    ///     Array2::<f64>::ones((3, 8)),
    /// )
    /// .is_err());
    /// ```
    pub fn new(
        f_in: Array2<T>,
        f_h: Array2<T>,
        f_w: Array2<T>,
        f_out: Array2<T>,
    ) -> Result<Self, CpError> {
        let factors = Self {
            f_in,
            f_h,
            f_w,
            f_out,
        };
        factors.validate()?;
        Ok(factors)
    }

    /// All-zero factors for a kernel of shape `[h, w, c, t]`
    pub fn zeros(kernel_dims: [usize; 4], rank: usize) -> Result<Self, CpError> {
        let [h, w, c, t] = kernel_dims;
        Self::new(
            Array2::zeros((c, rank)),
            Array2::zeros((h, rank)),
            Array2::zeros((w, rank)),
            Array2::zeros((rank, t)),
        )
    }

    fn validate(&self) -> Result<(), CpError> {
        let rank = self.f_in.ncols();
        if rank == 0 {
            return Err(CpError::InvalidFactorSet(
                "factor matrices have zero columns".to_string(),
            ));
        }
        if self.f_h.ncols() != rank || self.f_w.ncols() != rank || self.f_out.nrows() != rank {
            return Err(CpError::InvalidFactorSet(format!(
                "rank mismatch: f_in {:?}, f_h {:?}, f_w {:?}, f_out {:?}",
                self.f_in.shape(),
                self.f_h.shape(),
                self.f_w.shape(),
                self.f_out.shape()
            )));
        }
        if [
            self.f_in.nrows(),
            self.f_h.nrows(),
            self.f_w.nrows(),
            self.f_out.ncols(),
        ]
        .contains(&0)
        {
            return Err(CpError::InvalidFactorSet(format!(
                "empty kernel dimension: {:?}",
                self.kernel_dims()
            )));
        }
        Ok(())
    }

    /// Channel-mixing factor, shape (C, R)
    pub fn f_in(&self) -> &Array2<T> {
        &self.f_in
    }

    /// Vertical filters, shape (H, R)
    pub fn f_h(&self) -> &Array2<T> {
        &self.f_h
    }

    /// Horizontal filters, shape (W, R)
    pub fn f_w(&self) -> &Array2<T> {
        &self.f_w
    }

    /// Output-mixing factor, shape (R, T)
    pub fn f_out(&self) -> &Array2<T> {
        &self.f_out
    }

    pub fn rank(&self) -> usize {
        self.f_in.ncols()
    }

    pub fn in_channels(&self) -> usize {
        self.f_in.nrows()
    }

    pub fn out_channels(&self) -> usize {
        self.f_out.ncols()
    }

    /// Shape `[h, w, c, t]` of the kernel these factors represent
    pub fn kernel_dims(&self) -> [usize; 4] {
        [
            self.f_h.nrows(),
            self.f_w.nrows(),
            self.f_in.nrows(),
            self.f_out.ncols(),
        ]
    }

    pub fn into_parts(self) -> (Array2<T>, Array2<T>, Array2<T>, Array2<T>) {
        (self.f_in, self.f_h, self.f_w, self.f_out)
    }

    pub fn is_finite(&self) -> bool {
        [&self.f_in, &self.f_h, &self.f_w, &self.f_out]
            .iter()
            .all(|m| m.iter().all(|x| x.is_finite()))
    }

    /// Number of stored scalars, `R·(C + H + W + T)`
    pub fn num_parameters(&self) -> usize {
        let [h, w, c, t] = self.kernel_dims();
        self.rank() * (c + h + w + t)
    }

    /// Full kernel size divided by [`num_parameters`](Self::num_parameters)
    pub fn compression_ratio(&self) -> f64 {
        let [h, w, c, t] = self.kernel_dims();
        (h * w * c * t) as f64 / self.num_parameters() as f64
    }

    /// Rebuild the full HWIO kernel as a sum of R rank-1 terms
    pub fn recompose(&self) -> Result<KernelTensor<T>, CpError> {
        let full = cp_reconstruct(
            &[
                self.f_h.view(),
                self.f_w.view(),
                self.f_in.view(),
                self.f_out.t(),
            ],
            None,
        )?;
        let data = full
            .into_dimensionality::<Ix4>()
            .map_err(|e| CpError::ShapeMismatch(format!("recomposed kernel: {}", e)))?;
        Ok(KernelTensor::from_array(data))
    }
}

/// Outcome of [`factorize`]
#[derive(Debug, Clone)]
pub struct Factorization<T> {
    pub factors: ConvFactors<T>,
    pub status: ConvergenceStatus,
    /// `‖K − recompose(factors)‖ / ‖K‖`
    pub relative_error: T,
    pub iters: usize,
    pub error_history: Vec<T>,
}

impl<T> Factorization<T> {
    pub fn is_converged(&self) -> bool {
        self.status.is_converged()
    }
}

/// Factorize an HWIO kernel into rank-`rank` convolution factors
///
/// Runs [`cp_als`] on the 4-mode kernel and reorders the factors into
/// `(f_in, f_h, f_w, f_out)`, scaling the columns of the output factor by the
/// component weights.
///
/// # Examples
///
/// ```
/// use cpconv_core::KernelTensor;
/// use cpconv_decomp::{factorize, CpAlsConfig};
///
/// let kernel = KernelTensor::<f64>::random_uniform_seeded([3, 3, 4, 8], -1.0, 1.0, 0);
/// let result = factorize(&kernel, 2, &CpAlsConfig::default().with_seed(1)).unwrap();
///
/// assert_eq!(result.factors.f_in().shape(), &[4, 2]);
/// assert_eq!(result.factors.f_h().shape(), &[3, 2]);
/// assert_eq!(result.factors.f_w().shape(), &[3, 2]);
/// assert_eq!(result.factors.f_out().shape(), &[2, 8]);
/// ```
pub fn factorize<T>(
    kernel: &KernelTensor<T>,
    rank: usize,
    config: &CpAlsConfig,
) -> Result<Factorization<T>, CpError>
where
    T: Float
        + FloatConst
        + NumCast
        + NumAssign
        + Sum
        + ScalarOperand
        + Send
        + Sync
        + std::fmt::Display
        + 'static,
{
    debug!(dims = ?kernel.dims(), rank, "factorizing convolution kernel");

    let CpDecomp {
        factors,
        weights,
        relative_error,
        iters,
        status,
        error_history,
    } = cp_als(&kernel.to_dense(), rank, config)?;

    let [f_h, f_w, f_in, mut out]: [Array2<T>; 4] = factors.try_into().map_err(|f: Vec<_>| {
        CpError::ShapeMismatch(format!("expected 4 factor matrices, got {}", f.len()))
    })?;

    for (mut column, &weight) in out.axis_iter_mut(Axis(1)).zip(weights.iter()) {
        column.mapv_inplace(|x| x * weight);
    }
    let f_out = out.t().as_standard_layout().into_owned();

    Ok(Factorization {
        factors: ConvFactors::new(f_in, f_h, f_w, f_out)?,
        status,
        relative_error,
        iters,
        error_history,
    })
}

/// Rebuild the full kernel from its factors
///
/// Equivalent to [`ConvFactors::recompose`].
pub fn recompose<T>(factors: &ConvFactors<T>) -> Result<KernelTensor<T>, CpError>
where
    T: Float + 'static,
{
    factors.recompose()
}
