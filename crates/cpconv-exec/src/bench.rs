//! Benchmark driver for convolution backends
//!
//! [`run_benchmark`] generates a seeded kernel and input, factorizes the
//! kernel, times every requested backend and checks each output against the
//! direct convolution with the recomposed kernel.
//!
//! All parameters come from an explicit [`BenchConfig`].

use crate::backend::{build_backend, BackendKind};
use anyhow::{bail, Context, Result};
use cpconv_core::{DataLayout, FeatureMap, KernelTensor};
use cpconv_decomp::{factorize, ConvFactors, ConvergenceStatus, CpAlsConfig};
use cpconv_kernels::{
    closeness_report, conv2d_reference, time_operation, ClosenessReport, Conv2dConfig, Padding,
    TimingResult,
};
use scirs2_core::ndarray_ext::Array2;
use std::fmt;
use tracing::{info, warn};

/// How the benchmark kernel is generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum KernelSource {
    /// Entries drawn uniformly from [0, 1)
    #[default]
    Uniform,
    /// Sum of `rank` random rank-1 terms, so the factorization can be exact
    LowRank,
}

/// Problem geometry and run parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct BenchConfig {
    pub batch: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub height: usize,
    pub width: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub rank: usize,
    pub padding: Padding,
    pub stride_h: usize,
    pub stride_w: usize,
    pub layout: DataLayout,
    pub kernel_source: KernelSource,
    pub backends: Vec<BackendKind>,
    /// Untimed calls per backend before measuring
    pub warmup: usize,
    /// Timed calls per backend
    pub iterations: usize,
    pub seed: u64,
    pub cp: CpAlsConfig,
    pub rel_tol: f64,
    pub abs_tol: f64,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            batch: 1,
            in_channels: 4,
            out_channels: 8,
            height: 16,
            width: 16,
            kernel_h: 3,
            kernel_w: 3,
            rank: 2,
            padding: Padding::Same,
            stride_h: 1,
            stride_w: 1,
            layout: DataLayout::Nchw,
            kernel_source: KernelSource::Uniform,
            backends: BackendKind::ALL.to_vec(),
            warmup: 1,
            iterations: 5,
            seed: 0,
            cp: CpAlsConfig::default(),
            rel_tol: 1e-4,
            abs_tol: 1e-6,
        }
    }
}

impl BenchConfig {
    pub fn conv_config(&self) -> Conv2dConfig {
        Conv2dConfig {
            padding: self.padding,
            stride_h: self.stride_h,
            stride_w: self.stride_w,
        }
    }

    pub fn input_dims(&self) -> [usize; 4] {
        [self.batch, self.in_channels, self.height, self.width]
    }

    pub fn kernel_dims(&self) -> [usize; 4] {
        [self.kernel_h, self.kernel_w, self.in_channels, self.out_channels]
    }

    pub fn validate(&self) -> Result<()> {
        let sizes = [
            ("batch", self.batch),
            ("in_channels", self.in_channels),
            ("out_channels", self.out_channels),
            ("height", self.height),
            ("width", self.width),
            ("kernel_h", self.kernel_h),
            ("kernel_w", self.kernel_w),
            ("rank", self.rank),
            ("stride_h", self.stride_h),
            ("stride_w", self.stride_w),
            ("iterations", self.iterations),
        ];
        for (name, value) in sizes {
            if value == 0 {
                bail!("{} must be positive", name);
            }
        }
        if self.backends.is_empty() {
            bail!("no backends selected");
        }
        if !(self.rel_tol >= 0.0 && self.abs_tol >= 0.0) {
            bail!(
                "tolerances must be non-negative (rel {}, abs {})",
                self.rel_tol,
                self.abs_tol
            );
        }
        self.cp.validate()?;
        self.conv_config()
            .plan(self.height, self.width, self.kernel_h, self.kernel_w)?;
        Ok(())
    }
}

/// Timing and verification of one backend
#[derive(Debug, Clone)]
pub struct BackendReport {
    pub backend: BackendKind,
    /// Mean time per call
    pub timing: TimingResult,
    /// Fastest single call in milliseconds
    pub min_ms: f64,
    pub closeness: ClosenessReport,
}

impl BackendReport {
    pub fn matches_reference(&self) -> bool {
        self.closeness.close
    }
}

/// Result of [`run_benchmark`]
#[derive(Debug, Clone)]
pub struct BenchReport {
    pub config: BenchConfig,
    /// Relative error of the recomposed kernel against the generated one
    pub kernel_error: f64,
    pub status: ConvergenceStatus,
    pub factorization: TimingResult,
    pub compression_ratio: f64,
    pub backends: Vec<BackendReport>,
}

impl BenchReport {
    /// True when every backend output matched the reference
    pub fn all_match(&self) -> bool {
        self.backends.iter().all(BackendReport::matches_reference)
    }

    pub fn backend(&self, kind: BackendKind) -> Option<&BackendReport> {
        self.backends.iter().find(|b| b.backend == kind)
    }
}

impl fmt::Display for BenchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.config;
        writeln!(
            f,
            "conv2d {}x{}x{}x{} ({}) * {}x{}x{}x{} rank {} padding {:?} stride {}x{}",
            c.batch,
            c.in_channels,
            c.height,
            c.width,
            c.layout,
            c.kernel_h,
            c.kernel_w,
            c.in_channels,
            c.out_channels,
            c.rank,
            c.padding,
            c.stride_h,
            c.stride_w
        )?;
        writeln!(
            f,
            "factorization: {} | kernel error {:.3e} | compression {:.2}x | {}",
            self.factorization, self.kernel_error, self.compression_ratio, self.status
        )?;
        for b in &self.backends {
            writeln!(
                f,
                "  {:<14} mean {:>10.3} ms  min {:>10.3} ms  {}",
                b.backend.name(),
                b.timing.elapsed_ms,
                b.min_ms,
                b.closeness
            )?;
        }
        Ok(())
    }
}

/// Run the benchmark described by `config`
///
/// # Examples
///
/// ```
/// use cpconv_exec::{run_benchmark, BenchConfig, KernelSource};
///
/// let config = BenchConfig {
///     kernel_source: KernelSource::LowRank,
///     iterations: 1,
///     ..BenchConfig::default()
/// };
/// let report = run_benchmark(&config).unwrap();
/// assert!(report.all_match());
/// assert!(report.kernel_error < 1e-3);
/// ```
#[tracing::instrument(skip_all, fields(rank = config.rank, layout = %config.layout))]
pub fn run_benchmark(config: &BenchConfig) -> Result<BenchReport> {
    config.validate().context("invalid benchmark configuration")?;

    let kernel = generate_kernel(config)?;
    let input = FeatureMap::<f64>::random_uniform_seeded(
        config.layout,
        config.input_dims(),
        0.0,
        1.0,
        config.seed.wrapping_add(1),
    );
    let conv = config.conv_config();

    let (result, factorization) = time_operation("factorize", || {
        factorize(&kernel, config.rank, &config.cp)
    });
    let result = result.context("kernel factorization failed")?;
    if !result.is_converged() {
        warn!(status = %result.status, "factorization did not converge");
    }

    // Every backend computes the convolution with the kernel the factors represent
    let recomposed = result.factors.recompose()?;
    let reference = conv2d_reference(&input, &recomposed, &conv)?;

    let mut backends = Vec::with_capacity(config.backends.len());
    for &kind in &config.backends {
        let report = bench_backend(kind, &recomposed, &result.factors, &input, &reference, config)
            .with_context(|| format!("backend {} failed", kind))?;
        info!(
            backend = kind.name(),
            mean_ms = report.timing.elapsed_ms,
            matches = report.matches_reference(),
            "backend measured"
        );
        backends.push(report);
    }

    Ok(BenchReport {
        config: config.clone(),
        kernel_error: result.relative_error,
        status: result.status,
        factorization,
        compression_ratio: result.factors.compression_ratio(),
        backends,
    })
}

fn generate_kernel(config: &BenchConfig) -> Result<KernelTensor<f64>> {
    let dims = config.kernel_dims();
    match config.kernel_source {
        KernelSource::Uniform => Ok(KernelTensor::random_uniform_seeded(
            dims, 0.0, 1.0, config.seed,
        )),
        KernelSource::LowRank => {
            let [h, w, c, t] = dims;
            let r = config.rank;
            let factor = |rows: usize, cols: usize, offset: u64| -> Result<Array2<f64>> {
                let data = KernelTensor::<f64>::random_uniform_seeded(
                    [rows, cols, 1, 1],
                    -1.0,
                    1.0,
                    config.seed.wrapping_add(offset),
                )
                .into_array()
                .into_shape_with_order((rows, cols))?;
                Ok(data)
            };
            let factors = ConvFactors::new(
                factor(c, r, 10)?,
                factor(h, r, 11)?,
                factor(w, r, 12)?,
                factor(r, t, 13)?,
            )?;
            Ok(factors.recompose()?)
        }
    }
}

fn bench_backend(
    kind: BackendKind,
    kernel: &KernelTensor<f64>,
    factors: &ConvFactors<f64>,
    input: &FeatureMap<f64>,
    reference: &FeatureMap<f64>,
    config: &BenchConfig,
) -> Result<BackendReport> {
    let backend = build_backend(kind, kernel, factors);
    let conv = config.conv_config();

    for _ in 0..config.warmup {
        backend.conv2d(input, &conv)?;
    }

    let mut output = None;
    let mut total_ms = 0.0;
    let mut min_ms = f64::INFINITY;
    for _ in 0..config.iterations {
        let (out, timing) = time_operation(kind.name(), || backend.conv2d(input, &conv));
        output = Some(out?);
        total_ms += timing.elapsed_ms;
        min_ms = min_ms.min(timing.elapsed_ms);
    }

    let output = output.context("no timed iterations")?;
    let closeness = closeness_report(
        &output.view(),
        &reference.view(),
        config.rel_tol,
        config.abs_tol,
    );
    let mut timing = TimingResult::new(kind.name(), total_ms / config.iterations as f64);
    if let Some(flops) = backend.flops(input.dims(), &conv) {
        timing = timing.with_flops(flops);
    }

    Ok(BackendReport {
        backend: kind,
        timing,
        min_ms,
        closeness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BenchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.input_dims(), [1, 4, 16, 16]);
        assert_eq!(config.kernel_dims(), [3, 3, 4, 8]);
    }

    #[test]
    fn test_invalid_configs() {
        let zero_rank = BenchConfig {
            rank: 0,
            ..BenchConfig::default()
        };
        assert!(zero_rank.validate().is_err());

        let no_backends = BenchConfig {
            backends: Vec::new(),
            ..BenchConfig::default()
        };
        assert!(no_backends.validate().is_err());

        let kernel_too_big = BenchConfig {
            height: 2,
            padding: Padding::Valid,
            ..BenchConfig::default()
        };
        assert!(kernel_too_big.validate().is_err());

        let bad_tol = BenchConfig {
            cp: CpAlsConfig::default().with_tol(f64::NAN),
            ..BenchConfig::default()
        };
        assert!(run_benchmark(&bad_tol).is_err());
    }

    #[test]
    fn test_low_rank_benchmark_is_exact() {
        let config = BenchConfig {
            kernel_source: KernelSource::LowRank,
            cp: CpAlsConfig::default().with_max_iters(500).with_tol(1e-12).with_seed(3),
            iterations: 2,
            ..BenchConfig::default()
        };
        let report = run_benchmark(&config).unwrap();
        assert!(report.kernel_error < 1e-4, "kernel error {}", report.kernel_error);
        assert_eq!(report.backends.len(), 3);
        assert!(report.all_match());

        let seq = report.backend(BackendKind::SequencedCp).unwrap();
        assert!(seq.min_ms <= seq.timing.elapsed_ms + 1e-9);
        assert!(report.to_string().contains("sequenced_cp"));
    }

    #[test]
    fn test_uniform_kernel_backends_still_agree() {
        let config = BenchConfig {
            layout: DataLayout::Nhwc,
            stride_h: 2,
            stride_w: 2,
            backends: vec![BackendKind::SequencedCp, BackendKind::Reference],
            cp: CpAlsConfig::default().with_max_iters(20).with_seed(1),
            iterations: 1,
            warmup: 0,
            ..BenchConfig::default()
        };
        let report = run_benchmark(&config).unwrap();
        assert!(report.all_match());
        assert!(report.kernel_error > 0.0);
        assert!(report.backend(BackendKind::Recomposed).is_none());
    }
}
