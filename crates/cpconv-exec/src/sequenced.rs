//! Sequenced evaluation of a CP-factored convolution
//!
//! Instead of rebuilding the full HWIO kernel, the convolution is applied as
//! three cheap stages:
//!
//! 1. channel mixing `(N, C, H, W) × f_in → (N, R, H, W)`
//! 2. one separable `f_h[:, r] ⊗ f_w[:, r]` filter per rank slice
//! 3. output mixing `(N, R, H', W') × f_out → (N, T, H', W')`
//!
//! All stages run in the input's layout; the channel axis is taken from
//! [`DataLayout::channel_axis`](cpconv_core::DataLayout::channel_axis).

use crate::error::{ExecError, ExecResult};
use cpconv_core::FeatureMap;
use cpconv_decomp::ConvFactors;
use cpconv_kernels::{depthwise_separable, mode_product, Conv2dConfig, PaddingPlan};
use scirs2_core::ndarray_ext::{Array, Ix4, IxDyn};
use scirs2_core::numeric::Float;

/// Apply the factored convolution to `input`
///
/// Produces the same result as a full convolution with
/// `factors.recompose()` under the same `config`, up to rounding.
///
/// # Errors
///
/// - [`ExecError::ShapeMismatch`] if `f_in` does not match the input channels
/// - [`ExecError::Kernel`] for an invalid stride or a kernel larger than the
///   padded input
/// - [`ExecError::NumericDegeneracy`] if the output contains NaN or infinity
///
/// # Examples
///
/// ```
/// use cpconv_core::{DataLayout, FeatureMap};
/// use cpconv_decomp::ConvFactors;
/// use cpconv_exec::evaluate;
/// use cpconv_kernels::Conv2dConfig;
/// use scirs2_core::ndarray_ext::Array2;
///
/// let factors = ConvFactors::new(
///     Array2::<f64>::ones((4, 2)),
///     Array2::<f64>::ones((3, 2)),
///     Array2::<f64>::ones((3, 2)),
///     Array2::<f64>::ones((2, 8)),
/// )
/// .unwrap();
/// let input = FeatureMap::<f64>::random_uniform_seeded(DataLayout::Nchw, [1, 4, 16, 16], 0.0, 1.0, 0);
///
/// let out = evaluate(&input, &factors, &Conv2dConfig::default()).unwrap();
/// assert_eq!(out.dims(), [1, 8, 16, 16]);
/// ```
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(layout = %input.layout(), dims = ?input.dims(), rank = factors.rank())
)]
pub fn evaluate<T>(
    input: &FeatureMap<T>,
    factors: &ConvFactors<T>,
    config: &Conv2dConfig,
) -> ExecResult<FeatureMap<T>>
where
    T: Float + Send + Sync + 'static,
{
    let [batch, channels, in_h, in_w] = input.dims();
    let [k_h, k_w, k_c, out_channels] = factors.kernel_dims();
    if k_c != channels {
        return Err(ExecError::ShapeMismatch(format!(
            "input has {} channels but f_in has {} rows",
            channels, k_c
        )));
    }

    let plan = config.plan(in_h, in_w, k_h, k_w)?;
    let layout = input.layout();
    let channel_axis = layout.channel_axis();

    let mixed = mode_product(&input.view().into_dyn(), &factors.f_in().view(), channel_axis)?;
    let mixed = FeatureMap::from_array(into_4d(mixed)?, layout);

    let filtered = depthwise_separable(&mixed, &factors.f_h().view(), &factors.f_w().view(), config)?;

    let out = mode_product(&filtered.view().into_dyn(), &factors.f_out().view(), channel_axis)?;
    let out = FeatureMap::from_array(into_4d(out)?, layout);

    let expected = [batch, out_channels, plan.out_h, plan.out_w];
    if out.dims() != expected {
        return Err(ExecError::ShapeMismatch(format!(
            "output dims {:?} differ from planned {:?}",
            out.dims(),
            expected
        )));
    }
    if !out.as_array().iter().all(|x| x.is_finite()) {
        return Err(ExecError::NumericDegeneracy(
            "output contains non-finite values".to_string(),
        ));
    }

    tracing::debug!(out_dims = ?out.dims(), "sequenced convolution done");
    Ok(out)
}

/// Multiply-add count of [`evaluate`], counting a multiply-add as 2 FLOPs
pub fn sequenced_flops<T>(input_dims: [usize; 4], factors: &ConvFactors<T>, plan: &PaddingPlan) -> u64
where
    T: Float + 'static,
{
    let [n, c, h, w] = input_dims;
    let [k_h, k_w, _, t] = factors.kernel_dims();
    let r = factors.rank();
    let out_hw = plan.out_h * plan.out_w;
    let padded_h = h + plan.pad_top + plan.pad_bottom;

    let channel_mix = n * c * r * h * w;
    // Horizontal pass over every padded row, then the vertical pass
    let spatial = n * r * (padded_h * plan.out_w * k_w + out_hw * k_h);
    let output_mix = n * r * t * out_hw;
    2 * (channel_mix + spatial + output_mix) as u64
}

/// Multiply-add count of a direct convolution with the full kernel
pub fn direct_flops(input_dims: [usize; 4], kernel_dims: [usize; 4], plan: &PaddingPlan) -> u64 {
    let [n, c, _, _] = input_dims;
    let [k_h, k_w, _, t] = kernel_dims;
    2 * (n * t * plan.out_h * plan.out_w * k_h * k_w * c) as u64
}

fn into_4d<T>(array: Array<T, IxDyn>) -> ExecResult<Array<T, Ix4>> {
    array
        .into_dimensionality::<Ix4>()
        .map_err(|e| ExecError::ShapeMismatch(e.to_string()))
}
