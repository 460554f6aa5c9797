//! Approximation metrics and timing helpers
//!
//! - [`reconstruction_error`]: relative Frobenius error of an approximation
//! - [`outputs_close`]: elementwise closeness in the `allclose` convention
//! - [`closeness_report`]: the numbers behind a closeness verdict
//! - [`time_operation`]: wall-clock timing of a closure

use scirs2_core::ndarray_ext::{ArrayView, Dimension};
use scirs2_core::numeric::Float;
use std::fmt;
use std::time::Instant;

/// Relative reconstruction error `‖original − approx‖_F / ‖original‖_F`
///
/// When `original` is all zeros the ratio is undefined; the result is `0` if
/// `approx` is all zeros as well and `+∞` otherwise. Mismatched shapes also
/// give `+∞`. Any NaN or infinite element gives NaN.
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::array;
/// use cpconv_kernels::reconstruction_error;
///
/// let a: scirs2_core::ndarray_ext::Array2<f64> = array![[3.0, 0.0], [0.0, 4.0]];
/// let b = array![[3.0, 0.0], [0.0, 3.0]];
/// assert!((reconstruction_error(&a.view(), &b.view()) - 0.2).abs() < 1e-12);
///
/// let z = array![[0.0, 0.0]];
/// assert_eq!(reconstruction_error(&z.view(), &z.view()), 0.0);
/// ```
pub fn reconstruction_error<T, D>(original: &ArrayView<T, D>, approx: &ArrayView<T, D>) -> T
where
    T: Float,
    D: Dimension,
{
    if original.shape() != approx.shape() {
        return T::infinity();
    }

    // One shared scale keeps both sums clear of underflow and overflow
    let scale = original
        .iter()
        .chain(approx.iter())
        .fold(T::zero(), |m, &x| if x.is_nan() || x.abs() > m { x.abs() } else { m });
    if scale.is_nan() {
        return T::nan();
    }
    if scale == T::zero() {
        return T::zero();
    }
    if original.iter().all(|x| x.is_zero()) {
        return T::infinity();
    }
    if scale.is_infinite() {
        return T::nan();
    }

    let (diff_sq, orig_sq) = original
        .iter()
        .zip(approx.iter())
        .fold((T::zero(), T::zero()), |(d, o), (&x, &y)| {
            let (xs, ys) = (x / scale, y / scale);
            let e = xs - ys;
            (d + e * e, o + xs * xs)
        });
    (diff_sq / orig_sq).sqrt()
}

/// True when `|a − b| ≤ abs_tol + rel_tol·|b|` holds for every element
///
/// `b` is the reference. Any NaN or a shape mismatch yields `false`.
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::array;
/// use cpconv_kernels::outputs_close;
///
/// let reference = array![1.0, 100.0];
/// let candidate = array![1.000001, 100.001];
/// assert!(outputs_close(&candidate.view(), &reference.view(), 1e-4, 1e-6));
/// assert!(!outputs_close(&candidate.view(), &reference.view(), 1e-9, 1e-9));
/// ```
pub fn outputs_close<T, D>(a: &ArrayView<T, D>, b: &ArrayView<T, D>, rel_tol: T, abs_tol: T) -> bool
where
    T: Float,
    D: Dimension,
{
    a.shape() == b.shape()
        && a
            .iter()
            .zip(b.iter())
            .all(|(&x, &y)| (x - y).abs() <= abs_tol + rel_tol * y.abs())
}

/// Diagnostic summary of how far two outputs are apart
#[derive(Debug, Clone, PartialEq)]
pub struct ClosenessReport {
    /// Largest `|a − b|`
    pub max_abs_diff: f64,
    /// Largest `|a − b| / |b|` over elements with nonzero reference
    pub max_rel_diff: f64,
    /// Elements failing the `outputs_close` criterion
    pub mismatches: usize,
    /// Elements compared
    pub total: usize,
    /// Verdict of [`outputs_close`] under the same tolerances
    pub close: bool,
}

impl fmt::Display for ClosenessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_abs={:.3e} max_rel={:.3e} mismatches={}/{} ({})",
            self.max_abs_diff,
            self.max_rel_diff,
            self.mismatches,
            self.total,
            if self.close { "close" } else { "not close" }
        )
    }
}

/// Compare `a` against the reference `b` and report the worst differences
///
/// A shape mismatch reports every element of the larger operand as a mismatch
/// with infinite differences.
pub fn closeness_report<T, D>(
    a: &ArrayView<T, D>,
    b: &ArrayView<T, D>,
    rel_tol: T,
    abs_tol: T,
) -> ClosenessReport
where
    T: Float,
    D: Dimension,
{
    if a.shape() != b.shape() {
        return ClosenessReport {
            max_abs_diff: f64::INFINITY,
            max_rel_diff: f64::INFINITY,
            mismatches: a.len().max(b.len()),
            total: a.len().max(b.len()),
            close: false,
        };
    }

    let mut report = ClosenessReport {
        max_abs_diff: 0.0,
        max_rel_diff: 0.0,
        mismatches: 0,
        total: a.len(),
        close: true,
    };

    for (&x, &y) in a.iter().zip(b.iter()) {
        let diff = (x - y).abs();
        let diff_f = diff.to_f64().unwrap_or(f64::NAN);
        let ref_f = y.abs().to_f64().unwrap_or(f64::NAN);

        if diff_f.is_nan() || diff_f > report.max_abs_diff {
            report.max_abs_diff = diff_f;
        }
        if ref_f > 0.0 {
            let rel = diff_f / ref_f;
            if rel.is_nan() || rel > report.max_rel_diff {
                report.max_rel_diff = rel;
            }
        }
        // NaN compares false, so it lands in the mismatch count
        let within = diff <= abs_tol + rel_tol * y.abs();
        if !within {
            report.mismatches += 1;
        }
    }

    report.close = report.mismatches == 0;
    report
}

/// Wall-clock timing of one operation
#[derive(Debug, Clone)]
pub struct TimingResult {
    /// Operation name
    pub operation: String,
    /// Elapsed time in milliseconds
    pub elapsed_ms: f64,
    /// Throughput in GFLOP/s when a FLOP count is known
    pub gflops: Option<f64>,
}

impl TimingResult {
    pub fn new(operation: impl Into<String>, elapsed_ms: f64) -> Self {
        TimingResult {
            operation: operation.into(),
            elapsed_ms,
            gflops: None,
        }
    }

    /// Attach a floating-point operation count
    pub fn with_flops(mut self, flops: u64) -> Self {
        self.gflops = if self.elapsed_ms > 0.0 {
            Some(flops as f64 / (self.elapsed_ms * 1e6))
        } else {
            None
        };
        self
    }
}

impl fmt::Display for TimingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.3} ms", self.operation, self.elapsed_ms)?;
        if let Some(gflops) = self.gflops {
            write!(f, " ({:.2} GFLOP/s)", gflops)?;
        }
        Ok(())
    }
}

/// Time an operation and return its result with the timing
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::Array2;
/// use cpconv_kernels::{khatri_rao, time_operation};
///
/// let a = Array2::<f64>::ones((100, 10));
/// let b = Array2::<f64>::ones((200, 10));
///
/// let (result, timing) = time_operation("khatri_rao", || khatri_rao(&a.view(), &b.view()));
/// assert_eq!(result.unwrap().shape(), &[20000, 10]);
/// assert!(timing.elapsed_ms >= 0.0);
/// ```
pub fn time_operation<F, R>(name: impl Into<String>, op: F) -> (R, TimingResult)
where
    F: FnOnce() -> R,
{
    let start = Instant::now();
    let result = op();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    (result, TimingResult::new(name, elapsed_ms))
}
