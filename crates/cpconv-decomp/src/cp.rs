//! CP-ALS (Canonical Polyadic decomposition via Alternating Least Squares)
//!
//! The CP decomposition factorizes a tensor X into a sum of rank-1 tensors:
//!
//! X ≈ Σᵣ λᵣ (u₁ᵣ ⊗ u₂ᵣ ⊗ ... ⊗ uₙᵣ)
//!
//! Where:
//! - R is the CP rank
//! - λᵣ are component weights
//! - uᵢᵣ are factor vectors forming factor matrices Uᵢ ∈ ℝ^(Iᵢ×R)
//!
//! The ALS algorithm alternates between updating each factor matrix while
//! keeping the others fixed, using MTTKRP and a pseudo-inverse of the
//! Hadamard product of Gram matrices.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.
//! Linear algebra operations use `scirs2_linalg`.

use crate::error::CpError;
use cpconv_core::DenseND;
use cpconv_kernels::{cp_reconstruct, gram_hadamard, mttkrp, reconstruction_error};
use scirs2_core::ndarray_ext::{Array1, Array2, ArrayView2, Axis, ScalarOperand};
use scirs2_core::numeric::{Float, FloatConst, NumAssign, NumCast};
use scirs2_core::random::{
    thread_rng, Distribution, RandNormal as Normal, Rng, SeedableRng, StdRng,
};
use scirs2_linalg::{eigh, svd};
use std::fmt;
use std::iter::Sum;
use tracing::{debug, info, warn};

/// Initialization strategy for CP-ALS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InitStrategy {
    /// Random initialization from uniform distribution [0, 1)
    Random,
    /// Random initialization from normal distribution N(0, 1)
    RandomNormal,
    /// Leading left singular vectors of each mode unfolding (HOSVD)
    #[default]
    Svd,
}

/// Configuration for [`cp_als`]
///
/// # Examples
///
/// ```
/// use cpconv_decomp::{CpAlsConfig, InitStrategy};
///
/// let config = CpAlsConfig::default()
///     .with_max_iters(500)
///     .with_tol(1e-12)
///     .with_init(InitStrategy::Random)
///     .with_seed(7);
/// assert_eq!(config.seed, Some(7));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct CpAlsConfig {
    /// Upper bound on ALS sweeps
    pub max_iters: usize,
    /// Stop once the relative error changes by less than this between sweeps
    pub tol: f64,
    /// How the factor matrices are seeded
    pub init: InitStrategy,
    /// RNG seed for random initialization and SVD padding columns
    pub seed: Option<u64>,
    /// Normalize factor columns into component weights after each update
    pub normalize: bool,
}

impl Default for CpAlsConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            tol: 1e-10,
            init: InitStrategy::Svd,
            seed: None,
            normalize: true,
        }
    }
}

impl CpAlsConfig {
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// The tolerance must be finite and non-negative
    pub fn validate(&self) -> Result<(), CpError> {
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(CpError::InvalidTolerance(self.tol));
        }
        Ok(())
    }
}

/// How an ALS run ended
///
/// Running out of sweeps is reported here rather than as an error. A run cut
/// short by a non-finite error is also reported as `MaxIterationsReached`,
/// with a NaN `last_improvement`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConvergenceStatus {
    Converged {
        iters: usize,
    },
    MaxIterationsReached {
        iters: usize,
        /// Error decrease over the final sweep
        last_improvement: f64,
    },
}

impl ConvergenceStatus {
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceStatus::Converged { .. })
    }

    pub fn iters(&self) -> usize {
        match *self {
            ConvergenceStatus::Converged { iters } => iters,
            ConvergenceStatus::MaxIterationsReached { iters, .. } => iters,
        }
    }
}

impl fmt::Display for ConvergenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceStatus::Converged { iters } => {
                write!(f, "converged after {} iterations", iters)
            }
            ConvergenceStatus::MaxIterationsReached {
                iters,
                last_improvement,
            } => write!(
                f,
                "stopped after {} iterations (last improvement {:.3e})",
                iters, last_improvement
            ),
        }
    }
}

/// CP decomposition result
///
/// Contains the factor matrices with unit-norm columns (when normalization is
/// enabled), the component weights, and convergence information.
#[derive(Debug, Clone)]
pub struct CpDecomp<T> {
    /// Factor matrices, one per mode, each of shape (Iₙ, R)
    pub factors: Vec<Array2<T>>,

    /// Component weights λ (all ones when normalization is disabled)
    pub weights: Array1<T>,

    /// Relative reconstruction error of the returned factors
    pub relative_error: T,

    /// Number of ALS sweeps performed
    pub iters: usize,

    pub status: ConvergenceStatus,

    /// Relative error after each sweep
    pub error_history: Vec<T>,
}

impl<T> CpDecomp<T>
where
    T: Float + 'static,
{
    pub fn rank(&self) -> usize {
        self.weights.len()
    }

    /// Fit value `1 - relative_error`
    pub fn fit(&self) -> T {
        T::one() - self.relative_error
    }

    /// Reconstruct the full tensor from the weighted factors
    pub fn reconstruct(&self) -> Result<DenseND<T>, CpError> {
        let views: Vec<ArrayView2<T>> = self.factors.iter().map(|f| f.view()).collect();
        let weights = self.weights.view();
        let full = cp_reconstruct(&views, Some(&weights))?;
        Ok(DenseND::from_array(full))
    }
}

/// Compute CP-ALS decomposition of a tensor
///
/// # Arguments
///
/// * `tensor` - Input tensor to decompose
/// * `rank` - Target CP rank (number of components); may exceed mode sizes
/// * `config` - Iteration limit, tolerance, initialization and seed
///
/// # Errors
///
/// `InvalidRank` for rank 0, `InvalidTolerance` for a negative or non-finite
/// tolerance, `ShapeMismatch` for an empty tensor, and `NumericDegeneracy`
/// when the input or every iterate is non-finite.
///
/// # Complexity
///
/// Time: O(iters × N × R × ∏ᵢ Iᵢ)
///
/// # Examples
///
/// ```
/// use cpconv_core::DenseND;
/// use cpconv_decomp::{cp_als, CpAlsConfig};
///
/// let tensor = DenseND::<f64>::random_uniform_seeded(&[6, 5, 4], 0.0, 1.0, 3);
/// let cp = cp_als(&tensor, 3, &CpAlsConfig::default().with_seed(1)).unwrap();
///
/// assert_eq!(cp.factors[0].shape(), &[6, 3]);
/// assert_eq!(cp.factors[1].shape(), &[5, 3]);
/// assert_eq!(cp.factors[2].shape(), &[4, 3]);
/// assert!(cp.relative_error < 1.0);
/// ```
pub fn cp_als<T>(
    tensor: &DenseND<T>,
    rank: usize,
    config: &CpAlsConfig,
) -> Result<CpDecomp<T>, CpError>
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
    if rank == 0 {
        return Err(CpError::InvalidRank(rank));
    }
    config.validate()?;

    let shape = tensor.shape().to_vec();
    let n_modes = shape.len();
    if n_modes == 0 || tensor.is_empty() {
        return Err(CpError::ShapeMismatch(format!(
            "cannot decompose an empty tensor of shape {:?}",
            shape
        )));
    }
    if !tensor.is_finite() {
        return Err(CpError::NumericDegeneracy(
            "input tensor contains non-finite values".to_string(),
        ));
    }

    let scale = tensor.max_abs();
    if scale == T::zero() {
        warn!(?shape, rank, "zero-norm tensor, returning zero factors");
        return Ok(CpDecomp {
            factors: shape.iter().map(|&n| Array2::zeros((n, rank))).collect(),
            weights: Array1::zeros(rank),
            relative_error: T::zero(),
            iters: 0,
            status: ConvergenceStatus::Converged { iters: 0 },
            error_history: Vec::new(),
        });
    }

    // Sweeps run on the tensor divided by its largest magnitude
    let scaled = DenseND::from_array(tensor.as_array().mapv(|x| x / scale));
    let tensor = &scaled;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::seed_from_u64(thread_rng().random::<u64>()),
    };

    let mut factors = initialize_factors(tensor, rank, config.init, &mut rng)?;
    let mut weights = Array1::<T>::ones(rank);

    let initial_error = relative_error(tensor, &factors, &weights)?;
    let mut best = initial_error
        .is_finite()
        .then(|| (factors.clone(), weights.clone(), initial_error));

    let tol = T::from(config.tol).unwrap_or_else(T::zero);
    let mut prev_error = initial_error;
    let mut last_improvement = 0.0;
    let mut error_history = Vec::with_capacity(config.max_iters);
    let mut converged = false;
    let mut iters = 0;

    for iter in 0..config.max_iters {
        iters = iter + 1;

        for mode in 0..n_modes {
            let updated = {
                let views: Vec<ArrayView2<T>> = factors.iter().map(|f| f.view()).collect();
                let v = mttkrp(&tensor.view(), &views, mode)?;
                let gram = gram_hadamard(&views, mode);
                v.dot(&pseudo_inverse(&gram)?)
            };
            factors[mode] = updated;

            if config.normalize {
                weights = normalize_columns(&mut factors[mode]);
            }
        }

        let error = relative_error(tensor, &factors, &weights)?;
        error_history.push(error);

        if !error.is_finite() {
            warn!(iteration = iters, "non-finite reconstruction error, stopping early");
            last_improvement = f64::NAN;
            break;
        }

        if best.as_ref().map_or(true, |(_, _, e)| error < *e) {
            best = Some((factors.clone(), weights.clone(), error));
        }

        let improvement = prev_error - error;
        last_improvement = improvement.to_f64().unwrap_or(f64::NAN);
        debug!(
            iteration = iters,
            relative_error = error.to_f64().unwrap_or(f64::NAN),
            improvement = last_improvement,
            "cp-als sweep"
        );

        if improvement.abs() < tol || error == T::zero() {
            converged = true;
            break;
        }
        prev_error = error;
    }

    let (factors, weights, relative_error) = best.ok_or_else(|| {
        CpError::NumericDegeneracy("no finite iterate was produced".to_string())
    })?;
    let weights = weights.mapv(|w| w * scale);

    let finite = factors.iter().all(|f| f.iter().all(|x| x.is_finite()))
        && weights.iter().all(|x| x.is_finite());
    if !finite {
        return Err(CpError::NumericDegeneracy(
            "factor matrices contain non-finite values".to_string(),
        ));
    }

    let status = if converged {
        ConvergenceStatus::Converged { iters }
    } else {
        warn!(
            iters,
            last_improvement,
            relative_error = relative_error.to_f64().unwrap_or(f64::NAN),
            "cp-als did not converge"
        );
        ConvergenceStatus::MaxIterationsReached {
            iters,
            last_improvement,
        }
    };

    info!(
        ?shape,
        rank,
        iters,
        relative_error = relative_error.to_f64().unwrap_or(f64::NAN),
        converged = status.is_converged(),
        "cp-als finished"
    );

    Ok(CpDecomp {
        factors,
        weights,
        relative_error,
        iters,
        status,
        error_history,
    })
}

/// Initialize factor matrices
fn initialize_factors<T>(
    tensor: &DenseND<T>,
    rank: usize,
    init: InitStrategy,
    rng: &mut StdRng,
) -> Result<Vec<Array2<T>>, CpError>
where
    T: Float
        + FloatConst
        + NumCast
        + NumAssign
        + Sum
        + ScalarOperand
        + Send
        + Sync
        + 'static,
{
    let shape = tensor.shape();
    let mut factors = Vec::with_capacity(shape.len());

    match init {
        InitStrategy::Random => {
            for &mode_size in shape.iter() {
                let factor = Array2::from_shape_fn((mode_size, rank), |_| {
                    T::from(rng.random::<f64>()).unwrap_or_else(T::zero)
                });
                factors.push(factor);
            }
        }
        InitStrategy::RandomNormal => {
            for &mode_size in shape.iter() {
                factors.push(normal_matrix(rng, mode_size, rank, 1.0)?);
            }
        }
        InitStrategy::Svd => {
            for (mode, &mode_size) in shape.iter().enumerate() {
                let unfolded = tensor
                    .unfold(mode)
                    .map_err(|e| CpError::ShapeMismatch(format!("Unfold failed: {}", e)))?;

                let (u, _s, _vt) = svd(&unfolded.view(), false, None)?;

                // Columns past the unfolding's rank are filled with small noise
                let leading = rank.min(u.ncols());
                let mut factor = normal_matrix(rng, mode_size, rank, 0.01)?;
                for i in 0..mode_size {
                    for j in 0..leading {
                        factor[[i, j]] = u[[i, j]];
                    }
                }
                factors.push(factor);
            }
        }
    }

    Ok(factors)
}

fn normal_matrix<T>(rng: &mut StdRng, rows: usize, cols: usize, std: f64) -> Result<Array2<T>, CpError>
where
    T: Float,
{
    let normal = Normal::new(0.0, std).map_err(|e| {
        CpError::NumericDegeneracy(format!("normal distribution with std {}: {}", std, e))
    })?;
    Ok(Array2::from_shape_fn((rows, cols), |_| {
        T::from(normal.sample(&mut *rng)).unwrap_or_else(T::zero)
    }))
}

/// Pseudo-inverse of a symmetric positive semi-definite Gram matrix
///
/// Eigenvalues at or below `R·ε·λ_max` are treated as zero.
fn pseudo_inverse<T>(gram: &Array2<T>) -> Result<Array2<T>, CpError>
where
    T: Float
        + FloatConst
        + NumCast
        + NumAssign
        + Sum
        + ScalarOperand
        + Send
        + Sync
        + 'static,
{
    let n = gram.nrows();
    let mut pinv = Array2::<T>::zeros((n, n));

    if gram.iter().any(|x| !x.is_finite()) {
        return Err(CpError::NumericDegeneracy(
            "Gram matrix contains non-finite values".to_string(),
        ));
    }

    let (eigenvalues, eigenvectors) = eigh(&gram.view(), None)?;
    let lambda_max = eigenvalues
        .iter()
        .fold(T::zero(), |acc, &x| acc.max(x.abs()));
    if lambda_max == T::zero() {
        return Ok(pinv);
    }

    let cutoff = T::from(n).unwrap_or_else(T::one) * T::epsilon() * lambda_max;
    for (k, &lambda) in eigenvalues.iter().enumerate() {
        if lambda <= cutoff {
            continue;
        }
        let inv = T::one() / lambda;
        let v = eigenvectors.column(k);
        for i in 0..n {
            for j in 0..n {
                pinv[[i, j]] += v[i] * v[j] * inv;
            }
        }
    }

    Ok(pinv)
}

/// Scale each column to unit norm and return the norms; zero columns stay zero
fn normalize_columns<T>(factor: &mut Array2<T>) -> Array1<T>
where
    T: Float,
{
    let mut norms = Array1::<T>::zeros(factor.ncols());
    for (r, mut column) in factor.axis_iter_mut(Axis(1)).enumerate() {
        let norm = column.iter().fold(T::zero(), |acc, &x| acc + x * x).sqrt();
        if norm > T::zero() {
            column.mapv_inplace(|x| x / norm);
        }
        norms[r] = norm;
    }
    norms
}

fn relative_error<T>(
    tensor: &DenseND<T>,
    factors: &[Array2<T>],
    weights: &Array1<T>,
) -> Result<T, CpError>
where
    T: Float + 'static,
{
    let views: Vec<ArrayView2<T>> = factors.iter().map(|f| f.view()).collect();
    let approx = cp_reconstruct(&views, Some(&weights.view()))?;
    Ok(reconstruction_error(&tensor.view(), &approx.view()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    fn rank2_tensor() -> DenseND<f64> {
        let a = array![[1.0, 0.2], [0.5, -1.0], [-0.3, 0.8], [0.9, 0.4]];
        let b = array![[0.7, 1.0], [-1.0, 0.3], [0.4, 0.6]];
        let c = array![[1.0, -0.5], [0.2, 1.0], [0.6, 0.6], [-0.8, 0.1], [0.3, 0.9]];
        let full = cp_reconstruct(&[a.view(), b.view(), c.view()], None).unwrap();
        DenseND::from_array(full)
    }

    #[test]
    fn test_cp_als_basic() {
        let tensor = DenseND::<f64>::random_uniform_seeded(&[5, 6, 4], 0.0, 1.0, 11);
        let cp = cp_als(&tensor, 3, &CpAlsConfig::default().with_seed(5)).unwrap();

        assert_eq!(cp.factors.len(), 3);
        assert_eq!(cp.factors[0].shape(), &[5, 3]);
        assert_eq!(cp.factors[1].shape(), &[6, 3]);
        assert_eq!(cp.factors[2].shape(), &[4, 3]);
        assert_eq!(cp.rank(), 3);
        assert!(cp.relative_error < 1.0);
        assert!(cp.iters > 0);
        assert_eq!(cp.error_history.len(), cp.iters);
    }

    #[test]
    fn test_cp_als_recovers_exact_rank() {
        let tensor = rank2_tensor();
        let config = CpAlsConfig::default()
            .with_max_iters(500)
            .with_tol(1e-14)
            .with_seed(3);
        let cp = cp_als(&tensor, 2, &config).unwrap();
        assert!(cp.relative_error < 1e-6, "error {}", cp.relative_error);

        let rebuilt = cp.reconstruct().unwrap();
        assert!(reconstruction_error(&tensor.view(), &rebuilt.view()) < 1e-6);
    }

    #[test]
    fn test_cp_als_weights_carry_the_magnitude() {
        let tensor = rank2_tensor();
        let config = CpAlsConfig::default()
            .with_max_iters(500)
            .with_tol(1e-14)
            .with_seed(3);
        let reference = cp_als(&tensor, 2, &config).unwrap();

        let tiny = DenseND::from_array(tensor.as_array().mapv(|x| x * 1e-200));
        let cp = cp_als(&tiny, 2, &config).unwrap();
        assert!(cp.iters > 0);
        assert!((cp.relative_error - reference.relative_error).abs() < 1e-6);

        let rebuilt = cp.reconstruct().unwrap();
        assert!(reconstruction_error(&tiny.view(), &rebuilt.view()) < 1e-6);
        for (w, w_ref) in cp.weights.iter().zip(reference.weights.iter()) {
            assert!((w / (w_ref * 1e-200) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_cp_als_normalized_columns() {
        let tensor = rank2_tensor();
        let cp = cp_als(&tensor, 2, &CpAlsConfig::default().with_seed(9)).unwrap();
        for factor in &cp.factors {
            for column in factor.axis_iter(Axis(1)) {
                let norm: f64 = column.iter().map(|x| x * x).sum::<f64>().sqrt();
                assert!((norm - 1.0).abs() < 1e-8 || norm == 0.0);
            }
        }
        assert!(cp.weights.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_cp_als_without_normalization() {
        let tensor = rank2_tensor();
        let config = CpAlsConfig::default().with_normalize(false).with_seed(2);
        let cp = cp_als(&tensor, 2, &config).unwrap();
        assert!(cp.weights.iter().all(|&w| w == 1.0));
        assert!(cp.relative_error < 0.1);
    }

    #[test]
    fn test_cp_als_invalid_rank() {
        let tensor = DenseND::<f64>::ones(&[3, 3, 3]);
        let result = cp_als(&tensor, 0, &CpAlsConfig::default());
        assert!(matches!(result, Err(CpError::InvalidRank(0))));
    }

    #[test]
    fn test_cp_als_invalid_tolerance() {
        let tensor = DenseND::<f64>::ones(&[3, 3, 3]);
        for tol in [-1e-3, f64::NAN, f64::INFINITY] {
            let result = cp_als(&tensor, 2, &CpAlsConfig::default().with_tol(tol));
            assert!(matches!(result, Err(CpError::InvalidTolerance(_))));
        }
    }

    #[test]
    fn test_cp_als_rank_exceeds_mode_size() {
        let tensor = DenseND::<f64>::random_uniform_seeded(&[2, 3, 2], -1.0, 1.0, 4);
        let cp = cp_als(&tensor, 5, &CpAlsConfig::default().with_seed(1)).unwrap();
        assert_eq!(cp.factors[0].shape(), &[2, 5]);
        assert_eq!(cp.factors[1].shape(), &[3, 5]);
        assert!(cp.relative_error.is_finite());
        assert!(cp.relative_error < 0.5);
    }

    #[test]
    fn test_cp_als_zero_tensor() {
        let tensor = DenseND::<f64>::zeros(&[3, 4, 2]);
        let cp = cp_als(&tensor, 2, &CpAlsConfig::default()).unwrap();
        assert_eq!(cp.relative_error, 0.0);
        assert_eq!(cp.status, ConvergenceStatus::Converged { iters: 0 });
        assert!(cp.factors.iter().all(|f| f.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn test_cp_als_rejects_empty_and_nan() {
        let empty = DenseND::<f64>::zeros(&[3, 0, 2]);
        assert!(matches!(
            cp_als(&empty, 1, &CpAlsConfig::default()),
            Err(CpError::ShapeMismatch(_))
        ));

        let mut bad = DenseND::<f64>::ones(&[2, 2, 2]);
        bad[&[0, 1, 1][..]] = f64::NAN;
        assert!(matches!(
            cp_als(&bad, 1, &CpAlsConfig::default()),
            Err(CpError::NumericDegeneracy(_))
        ));
    }

    #[test]
    fn test_cp_als_seeded_is_deterministic() {
        let tensor = DenseND::<f64>::random_uniform_seeded(&[4, 4, 4], 0.0, 1.0, 8);
        for init in [InitStrategy::Random, InitStrategy::RandomNormal, InitStrategy::Svd] {
            let config = CpAlsConfig::default()
                .with_init(init)
                .with_seed(42)
                .with_max_iters(20);
            let a = cp_als(&tensor, 3, &config).unwrap();
            let b = cp_als(&tensor, 3, &config).unwrap();
            assert_eq!(a.factors, b.factors);
            assert_eq!(a.error_history, b.error_history);
        }
    }

    #[test]
    fn test_cp_als_max_iters_status() {
        let tensor = DenseND::<f64>::random_uniform_seeded(&[6, 6, 6], 0.0, 1.0, 21);
        let config = CpAlsConfig::default()
            .with_max_iters(2)
            .with_tol(0.0)
            .with_seed(0);
        let cp = cp_als(&tensor, 2, &config).unwrap();
        assert_eq!(cp.iters, 2);
        assert!(matches!(
            cp.status,
            ConvergenceStatus::MaxIterationsReached { iters: 2, .. }
        ));
        assert!(!cp.status.is_converged());
    }

    #[test]
    fn test_cp_als_zero_iterations_returns_initialization() {
        let tensor = rank2_tensor();
        let config = CpAlsConfig::default().with_max_iters(0).with_seed(1);
        let cp = cp_als(&tensor, 2, &config).unwrap();
        assert_eq!(cp.iters, 0);
        assert!(cp.error_history.is_empty());
        assert!(cp.relative_error.is_finite());
    }

    #[test]
    fn test_cp_als_error_history_best_is_returned() {
        let tensor = DenseND::<f64>::random_uniform_seeded(&[5, 5, 5], 0.0, 1.0, 17);
        let cp = cp_als(&tensor, 3, &CpAlsConfig::default().with_seed(4)).unwrap();
        let best = cp
            .error_history
            .iter()
            .cloned()
            .fold(f64::INFINITY, f64::min);
        assert!(cp.relative_error <= best + 1e-15);
    }

    #[test]
    fn test_pseudo_inverse_identity_and_singular() {
        let identity = Array2::<f64>::eye(3);
        let pinv = pseudo_inverse(&identity).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((pinv[[i, j]] - expected).abs() < 1e-12);
            }
        }

        // Rank-1: [[1,1],[1,1]] has pseudo-inverse [[0.25,0.25],[0.25,0.25]]
        let singular = array![[1.0, 1.0], [1.0, 1.0]];
        let pinv = pseudo_inverse(&singular).unwrap();
        for &x in pinv.iter() {
            assert!((x - 0.25).abs() < 1e-10);
        }

        let zero = Array2::<f64>::zeros((2, 2));
        assert!(pseudo_inverse(&zero).unwrap().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_normalize_columns() {
        let mut factor = array![[3.0, 0.0], [4.0, 0.0]];
        let norms = normalize_columns(&mut factor);
        assert_eq!(norms, array![5.0, 0.0]);
        assert!((factor[[0, 0]] - 0.6).abs() < 1e-12);
        assert!((factor[[1, 0]] - 0.8).abs() < 1e-12);
        assert_eq!(factor[[0, 1]], 0.0);
    }

    #[test]
    fn test_config_defaults() {
        let config = CpAlsConfig::default();
        assert_eq!(config.max_iters, 200);
        assert_eq!(config.tol, 1e-10);
        assert_eq!(config.init, InitStrategy::Svd);
        assert!(config.normalize);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_convergence_status_display() {
        let s = ConvergenceStatus::Converged { iters: 4 };
        assert_eq!(s.iters(), 4);
        assert!(s.to_string().contains("converged"));

        let s = ConvergenceStatus::MaxIterationsReached {
            iters: 10,
            last_improvement: 1e-3,
        };
        assert_eq!(s.iters(), 10);
        assert!(s.to_string().contains("10 iterations"));
    }
}
