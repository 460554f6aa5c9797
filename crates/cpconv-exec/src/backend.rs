//! Convolution backends
//!
//! Every way of computing the convolution implements [`ConvolutionBackend`],
//! so benchmarks and tests can treat them uniformly:
//!
//! - [`ReferenceBackend`]: direct convolution with a full HWIO kernel
//! - [`SequencedCpBackend`]: the three-stage factored evaluation
//! - [`RecomposedBackend`]: rebuilds the kernel from its factors on every
//!   call, then runs the direct convolution
//!
//! Backends are chosen with [`BackendKind`] and [`build_backend`].

use crate::error::{ExecError, ExecResult};
use crate::sequenced::{direct_flops, evaluate, sequenced_flops};
use cpconv_core::{FeatureMap, KernelTensor};
use cpconv_decomp::ConvFactors;
use cpconv_kernels::{conv2d_reference, Conv2dConfig};
use scirs2_core::numeric::Float;
use std::fmt;
use std::str::FromStr;

/// A strategy for computing a 2D convolution
pub trait ConvolutionBackend<T>: Send + Sync
where
    T: Float + Send + Sync + 'static,
{
    /// Short identifier used in reports
    fn name(&self) -> &str;

    /// Convolve `input`; the output uses the input's layout
    fn conv2d(&self, input: &FeatureMap<T>, config: &Conv2dConfig) -> ExecResult<FeatureMap<T>>;

    /// FLOPs of one [`conv2d`](Self::conv2d) call, if known
    fn flops(&self, _input_dims: [usize; 4], _config: &Conv2dConfig) -> Option<u64> {
        None
    }
}

/// Direct convolution with a full kernel
#[derive(Debug, Clone)]
pub struct ReferenceBackend<T> {
    kernel: KernelTensor<T>,
}

impl<T> ReferenceBackend<T> {
    pub fn new(kernel: KernelTensor<T>) -> Self {
        Self { kernel }
    }

    pub fn kernel(&self) -> &KernelTensor<T> {
        &self.kernel
    }
}

impl<T> ConvolutionBackend<T> for ReferenceBackend<T>
where
    T: Float + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "reference"
    }

    fn conv2d(&self, input: &FeatureMap<T>, config: &Conv2dConfig) -> ExecResult<FeatureMap<T>> {
        Ok(conv2d_reference(input, &self.kernel, config)?)
    }

    fn flops(&self, input_dims: [usize; 4], config: &Conv2dConfig) -> Option<u64> {
        let [kh, kw, _, _] = self.kernel.dims();
        let plan = config.plan(input_dims[2], input_dims[3], kh, kw).ok()?;
        Some(direct_flops(input_dims, self.kernel.dims(), &plan))
    }
}

/// Factored evaluation through [`evaluate`]
#[derive(Debug, Clone)]
pub struct SequencedCpBackend<T> {
    factors: ConvFactors<T>,
}

impl<T> SequencedCpBackend<T> {
    pub fn new(factors: ConvFactors<T>) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &ConvFactors<T> {
        &self.factors
    }
}

impl<T> ConvolutionBackend<T> for SequencedCpBackend<T>
where
    T: Float + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "sequenced_cp"
    }

    fn conv2d(&self, input: &FeatureMap<T>, config: &Conv2dConfig) -> ExecResult<FeatureMap<T>> {
        evaluate(input, &self.factors, config)
    }

    fn flops(&self, input_dims: [usize; 4], config: &Conv2dConfig) -> Option<u64> {
        let [kh, kw, _, _] = self.factors.kernel_dims();
        let plan = config.plan(input_dims[2], input_dims[3], kh, kw).ok()?;
        Some(sequenced_flops(input_dims, &self.factors, &plan))
    }
}

/// Kernel rebuild followed by direct convolution
#[derive(Debug, Clone)]
pub struct RecomposedBackend<T> {
    factors: ConvFactors<T>,
}

impl<T> RecomposedBackend<T> {
    pub fn new(factors: ConvFactors<T>) -> Self {
        Self { factors }
    }
}

impl<T> ConvolutionBackend<T> for RecomposedBackend<T>
where
    T: Float + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "recomposed"
    }

    fn conv2d(&self, input: &FeatureMap<T>, config: &Conv2dConfig) -> ExecResult<FeatureMap<T>> {
        let kernel = self.factors.recompose()?;
        if kernel.in_channels() != input.channels() {
            return Err(ExecError::ShapeMismatch(format!(
                "input has {} channels but the factors expect {}",
                input.channels(),
                kernel.in_channels()
            )));
        }
        Ok(conv2d_reference(input, &kernel, config)?)
    }

    fn flops(&self, input_dims: [usize; 4], config: &Conv2dConfig) -> Option<u64> {
        let dims = self.factors.kernel_dims();
        let plan = config.plan(input_dims[2], input_dims[3], dims[0], dims[1]).ok()?;
        let rebuild = 2 * (dims.iter().product::<usize>() * self.factors.rank()) as u64;
        Some(direct_flops(input_dims, dims, &plan) + rebuild)
    }
}

/// Backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum BackendKind {
    Reference,
    SequencedCp,
    Recomposed,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Reference,
        BackendKind::SequencedCp,
        BackendKind::Recomposed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Reference => "reference",
            BackendKind::SequencedCp => "sequenced_cp",
            BackendKind::Recomposed => "recomposed",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "reference" | "direct" => Ok(BackendKind::Reference),
            "sequenced_cp" | "sequenced" | "cp" => Ok(BackendKind::SequencedCp),
            "recomposed" | "rebuild" => Ok(BackendKind::Recomposed),
            other => anyhow::bail!("unknown backend '{}'", other),
        }
    }
}

/// Instantiate the backend selected by `kind`
///
/// `kernel` feeds the reference backend and `factors` the two factored ones.
///
/// # Examples
///
/// ```
/// use cpconv_core::{DataLayout, FeatureMap};
/// use cpconv_decomp::ConvFactors;
/// use cpconv_exec::{build_backend, BackendKind};
/// use cpconv_kernels::Conv2dConfig;
/// use scirs2_core::ndarray_ext::Array2;
///
/// let factors = ConvFactors::new(
///     Array2::<f64>::ones((2, 1)),
///     Array2::<f64>::ones((3, 1)),
///     Array2::<f64>::ones((3, 1)),
///     Array2::<f64>::ones((1, 4)),
/// )
/// .unwrap();
/// let kernel = factors.recompose().unwrap();
/// let input = FeatureMap::<f64>::random_uniform_seeded(DataLayout::Nhwc, [1, 2, 5, 5], 0.0, 1.0, 0);
///
/// for kind in BackendKind::ALL {
///     let backend = build_backend(kind, &kernel, &factors);
///     let out = backend.conv2d(&input, &Conv2dConfig::default()).unwrap();
///     assert_eq!(out.dims(), [1, 4, 5, 5]);
/// }
/// ```
pub fn build_backend<T>(
    kind: BackendKind,
    kernel: &KernelTensor<T>,
    factors: &ConvFactors<T>,
) -> Box<dyn ConvolutionBackend<T>>
where
    T: Float + Send + Sync + 'static,
{
    match kind {
        BackendKind::Reference => Box::new(ReferenceBackend::new(kernel.clone())),
        BackendKind::SequencedCp => Box::new(SequencedCpBackend::new(factors.clone())),
        BackendKind::Recomposed => Box::new(RecomposedBackend::new(factors.clone())),
    }
}
