//! 2D convolution kernels and padding arithmetic
//!
//! Convolution here is cross-correlation, the convention of deep-learning
//! frameworks:
//!
//! ```text
//! out[n, t, y, x] = Σ_{i, j, c} in[n, c, y·sh + i - pad_top, x·sw + j - pad_left] · K[i, j, c, t]
//! ```
//!
//! with zeros outside the input. Padding amounts and output sizes come from a
//! single [`Padding::plan`] so the full-kernel path and the factored path can
//! never disagree on geometry.
//!
//! # Padding conventions
//!
//! - `Same`: `out = ceil(in / stride)`, total padding
//!   `max((out - 1)·stride + k - in, 0)`, the odd pixel going to the bottom/right
//! - `Valid`: no padding, `out = (in - k) / stride + 1`
//! - `Explicit`: caller-chosen amounts per side
//!
//! # Performance
//!
//! [`conv2d_reference`] lowers to im2col + GEMM per batch item.
//! [`depthwise_separable`] runs two 1D passes per channel and, with the
//! `parallel` feature, processes channels concurrently.

#![allow(clippy::needless_range_loop)]

use crate::error::{KernelError, KernelResult};
use cpconv_core::{DataLayout, FeatureMap, KernelTensor};
use scirs2_core::ndarray_ext::{Array2, Array4, ArrayView1, ArrayView2, Axis};
use scirs2_core::numeric::Float;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Spatial padding mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Padding {
    /// Output covers `ceil(in / stride)` positions
    #[default]
    Same,
    /// No padding
    Valid,
    /// Fixed zero padding on each side
    Explicit {
        top: usize,
        bottom: usize,
        left: usize,
        right: usize,
    },
}

/// Resolved padding amounts and output size for one convolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingPlan {
    pub pad_top: usize,
    pub pad_bottom: usize,
    pub pad_left: usize,
    pub pad_right: usize,
    pub out_h: usize,
    pub out_w: usize,
}

fn same_axis(input: usize, kernel: usize, stride: usize) -> (usize, usize, usize) {
    let out = input.div_ceil(stride);
    let needed = (out.saturating_sub(1)) * stride + kernel;
    let total = needed.saturating_sub(input);
    let before = total / 2;
    (before, total - before, out)
}

fn padded_axis(
    input: usize,
    kernel: usize,
    stride: usize,
    before: usize,
    after: usize,
    axis: &str,
) -> KernelResult<usize> {
    let padded = input + before + after;
    if padded < kernel {
        return Err(KernelError::incompatible_shapes(
            "Padding::plan",
            vec![padded],
            vec![kernel],
            format!(
                "padded input {} ({}) is smaller than the kernel {}",
                axis, padded, kernel
            ),
        ));
    }
    Ok((padded - kernel) / stride + 1)
}

impl Padding {
    /// Resolve padding for an `in_h × in_w` input and `k_h × k_w` kernel
    ///
    /// # Errors
    ///
    /// - [`KernelError::InvalidArgument`] for a zero stride or kernel extent
    /// - [`KernelError::EmptyInput`] for an empty spatial extent
    /// - [`KernelError::IncompatibleShapes`] if the (padded) input is smaller
    ///   than the kernel
    ///
    /// # Examples
    ///
    /// ```
    /// use cpconv_kernels::Padding;
    ///
    /// let plan = Padding::Same.plan(16, 16, 3, 3, 1, 1).unwrap();
    /// assert_eq!((plan.out_h, plan.out_w), (16, 16));
    /// assert_eq!((plan.pad_top, plan.pad_bottom), (1, 1));
    ///
    /// // Even kernel: the extra row goes to the bottom
    /// let plan = Padding::Same.plan(5, 5, 2, 2, 1, 1).unwrap();
    /// assert_eq!((plan.pad_top, plan.pad_bottom), (0, 1));
    ///
    /// let plan = Padding::Valid.plan(16, 16, 3, 3, 1, 1).unwrap();
    /// assert_eq!((plan.out_h, plan.out_w), (14, 14));
    /// ```
    pub fn plan(
        &self,
        in_h: usize,
        in_w: usize,
        k_h: usize,
        k_w: usize,
        stride_h: usize,
        stride_w: usize,
    ) -> KernelResult<PaddingPlan> {
        if stride_h == 0 || stride_w == 0 {
            return Err(KernelError::invalid_argument(
                "Padding::plan",
                "stride",
                format!("strides must be >= 1, got ({}, {})", stride_h, stride_w),
            ));
        }
        if k_h == 0 || k_w == 0 {
            return Err(KernelError::invalid_argument(
                "Padding::plan",
                "kernel",
                format!("kernel extent must be >= 1, got ({}, {})", k_h, k_w),
            ));
        }
        if in_h == 0 || in_w == 0 {
            return Err(KernelError::empty_input("Padding::plan", "input"));
        }

        match *self {
            Padding::Same => {
                let (pad_top, pad_bottom, out_h) = same_axis(in_h, k_h, stride_h);
                let (pad_left, pad_right, out_w) = same_axis(in_w, k_w, stride_w);
                Ok(PaddingPlan {
                    pad_top,
                    pad_bottom,
                    pad_left,
                    pad_right,
                    out_h,
                    out_w,
                })
            }
            Padding::Valid => Ok(PaddingPlan {
                pad_top: 0,
                pad_bottom: 0,
                pad_left: 0,
                pad_right: 0,
                out_h: padded_axis(in_h, k_h, stride_h, 0, 0, "height")?,
                out_w: padded_axis(in_w, k_w, stride_w, 0, 0, "width")?,
            }),
            Padding::Explicit {
                top,
                bottom,
                left,
                right,
            } => Ok(PaddingPlan {
                pad_top: top,
                pad_bottom: bottom,
                pad_left: left,
                pad_right: right,
                out_h: padded_axis(in_h, k_h, stride_h, top, bottom, "height")?,
                out_w: padded_axis(in_w, k_w, stride_w, left, right, "width")?,
            }),
        }
    }
}

/// Geometry of a 2D convolution
///
/// # Examples
///
/// ```
/// use cpconv_kernels::{Conv2dConfig, Padding};
///
/// let config = Conv2dConfig::default()
///     .with_padding(Padding::Valid)
///     .with_stride(2);
/// assert_eq!((config.stride_h, config.stride_w), (2, 2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Conv2dConfig {
    pub padding: Padding,
    pub stride_h: usize,
    pub stride_w: usize,
}

impl Default for Conv2dConfig {
    fn default() -> Self {
        Self {
            padding: Padding::Same,
            stride_h: 1,
            stride_w: 1,
        }
    }
}

impl Conv2dConfig {
    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    /// Same stride on both axes
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride_h = stride;
        self.stride_w = stride;
        self
    }

    pub fn with_strides(mut self, stride_h: usize, stride_w: usize) -> Self {
        self.stride_h = stride_h;
        self.stride_w = stride_w;
        self
    }

    /// Plan this configuration for a given input and kernel extent
    pub fn plan(&self, in_h: usize, in_w: usize, k_h: usize, k_w: usize) -> KernelResult<PaddingPlan> {
        self.padding
            .plan(in_h, in_w, k_h, k_w, self.stride_h, self.stride_w)
    }
}

/// Input coordinate for output position `o` and kernel tap `k`, if inside the input
#[inline]
fn source_index(o: usize, k: usize, stride: usize, pad: usize, len: usize) -> Option<usize> {
    (o * stride + k).checked_sub(pad).filter(|&i| i < len)
}

/// Full 2D convolution of `input` with an HWIO `kernel`
///
/// The output is returned in the input's layout with `kernel.out_channels()`
/// channels.
///
/// # Errors
///
/// - [`KernelError::ShapeMismatch`] if input channels differ from the kernel's
/// - any error of [`Padding::plan`]
///
/// # Examples
///
/// ```
/// use cpconv_core::{DataLayout, FeatureMap, KernelTensor};
/// use cpconv_kernels::{conv2d_reference, Conv2dConfig};
///
/// let input = FeatureMap::<f64>::random_uniform_seeded(DataLayout::Nchw, [1, 4, 16, 16], -1.0, 1.0, 0);
/// let kernel = KernelTensor::<f64>::random_uniform_seeded([3, 3, 4, 8], -1.0, 1.0, 1);
/// let out = conv2d_reference(&input, &kernel, &Conv2dConfig::default()).unwrap();
/// assert_eq!(out.dims(), [1, 8, 16, 16]);
/// ```
pub fn conv2d_reference<T>(
    input: &FeatureMap<T>,
    kernel: &KernelTensor<T>,
    config: &Conv2dConfig,
) -> KernelResult<FeatureMap<T>>
where
    T: Float + 'static,
{
    let [n, c, h, w] = input.dims();
    let [kh, kw, kc, kt] = kernel.dims();
    if c != kc {
        return Err(KernelError::shape_mismatch(
            "conv2d_reference",
            vec![n, kc, h, w],
            vec![n, c, h, w],
            format!(
                "input has {} channels but the kernel expects {}",
                c, kc
            ),
        ));
    }

    let plan = config.plan(h, w, kh, kw)?;
    let x = input.nchw_view();

    // HWIO in standard layout flattens to rows ordered (i, j, c)
    let kernel_mat = kernel
        .as_array()
        .as_standard_layout()
        .into_owned()
        .into_shape_with_order((kh * kw * kc, kt))
        .map_err(|e| KernelError::operation_error("conv2d_reference", e.to_string()))?;

    let mut out = Array4::<T>::zeros((n, plan.out_h, plan.out_w, kt));
    let mut cols = Array2::<T>::zeros((plan.out_h * plan.out_w, kh * kw * kc));

    for b in 0..n {
        cols.fill(T::zero());
        for oy in 0..plan.out_h {
            for ox in 0..plan.out_w {
                let row = oy * plan.out_w + ox;
                for i in 0..kh {
                    let Some(y) = source_index(oy, i, config.stride_h, plan.pad_top, h) else {
                        continue;
                    };
                    for j in 0..kw {
                        let Some(xx) = source_index(ox, j, config.stride_w, plan.pad_left, w)
                        else {
                            continue;
                        };
                        let base = (i * kw + j) * kc;
                        for ch in 0..c {
                            cols[[row, base + ch]] = x[[b, ch, y, xx]];
                        }
                    }
                }
            }
        }

        let product = cols.dot(&kernel_mat);
        let mut out_b = out.index_axis_mut(Axis(0), b);
        for oy in 0..plan.out_h {
            for ox in 0..plan.out_w {
                let row = oy * plan.out_w + ox;
                for t in 0..kt {
                    out_b[[oy, ox, t]] = product[[row, t]];
                }
            }
        }
    }

    Ok(FeatureMap::from_array(out, DataLayout::Nhwc).to_layout(input.layout()))
}

/// Correlate one (H, W) plane with the separable filter `f_h ⊗ f_w`
fn separable_plane<T>(
    plane: ArrayView2<T>,
    f_h: ArrayView1<T>,
    f_w: ArrayView1<T>,
    plan: &PaddingPlan,
    stride_h: usize,
    stride_w: usize,
) -> Array2<T>
where
    T: Float,
{
    let (h, w) = plane.dim();

    // Horizontal pass over every input row
    let mut rows = Array2::<T>::zeros((h, plan.out_w));
    for y in 0..h {
        for ox in 0..plan.out_w {
            let mut acc = T::zero();
            for (j, &coef) in f_w.iter().enumerate() {
                if let Some(xx) = source_index(ox, j, stride_w, plan.pad_left, w) {
                    acc = acc + coef * plane[[y, xx]];
                }
            }
            rows[[y, ox]] = acc;
        }
    }

    // Vertical pass
    let mut out = Array2::<T>::zeros((plan.out_h, plan.out_w));
    for oy in 0..plan.out_h {
        for (i, &coef) in f_h.iter().enumerate() {
            if let Some(y) = source_index(oy, i, stride_h, plan.pad_top, h) {
                for ox in 0..plan.out_w {
                    out[[oy, ox]] = out[[oy, ox]] + coef * rows[[y, ox]];
                }
            }
        }
    }
    out
}

/// Depthwise convolution where channel `r` is filtered by `f_h[:, r] ⊗ f_w[:, r]`
///
/// `f_h` is (k_h × R) and `f_w` is (k_w × R) with R equal to the input's
/// channel count. The output keeps the input's layout and channel count.
///
/// # Errors
///
/// - [`KernelError::ShapeMismatch`] if the filter columns differ from the
///   input channels
/// - any error of [`Padding::plan`]
///
/// # Examples
///
/// ```
/// use scirs2_core::ndarray_ext::Array2;
/// use cpconv_core::{DataLayout, FeatureMap};
/// use cpconv_kernels::{depthwise_separable, Conv2dConfig};
///
/// let x = FeatureMap::<f64>::random_uniform_seeded(DataLayout::Nhwc, [1, 2, 8, 8], -1.0, 1.0, 3);
/// let f_h = Array2::<f64>::ones((3, 2));
/// let f_w = Array2::<f64>::ones((3, 2));
/// let y = depthwise_separable(&x, &f_h.view(), &f_w.view(), &Conv2dConfig::default()).unwrap();
/// assert_eq!(y.dims(), [1, 2, 8, 8]);
/// ```
pub fn depthwise_separable<T>(
    input: &FeatureMap<T>,
    f_h: &ArrayView2<T>,
    f_w: &ArrayView2<T>,
    config: &Conv2dConfig,
) -> KernelResult<FeatureMap<T>>
where
    T: Float + Send + Sync + 'static,
{
    let [n, r, h, w] = input.dims();
    if f_h.ncols() != r || f_w.ncols() != r {
        return Err(KernelError::shape_mismatch(
            "depthwise_separable",
            vec![r, r],
            vec![f_h.ncols(), f_w.ncols()],
            "one separable filter per input channel",
        ));
    }

    let plan = config.plan(h, w, f_h.nrows(), f_w.nrows())?;
    let x = input.nchw_view();
    let jobs: Vec<(usize, usize)> = (0..n)
        .flat_map(|b| (0..r).map(move |ch| (b, ch)))
        .collect();

    let run = |&(b, ch): &(usize, usize)| {
        separable_plane(
            x.index_axis(Axis(0), b).index_axis_move(Axis(0), ch),
            f_h.column(ch),
            f_w.column(ch),
            &plan,
            config.stride_h,
            config.stride_w,
        )
    };

    #[cfg(feature = "parallel")]
    let planes: Vec<Array2<T>> = {
        use scirs2_core::parallel_ops::*;
        jobs.par_iter().map(run).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let planes: Vec<Array2<T>> = jobs.iter().map(run).collect();

    let layout = input.layout();
    let mut out = Array4::<T>::zeros(layout.shape([n, r, plan.out_h, plan.out_w]));
    {
        let mut nchw = out.view_mut().permuted_axes(layout.to_nchw_axes());
        for (&(b, ch), plane) in jobs.iter().zip(&planes) {
            nchw.index_axis_mut(Axis(0), b)
                .index_axis_mut(Axis(0), ch)
                .assign(plane);
        }
    }

    Ok(FeatureMap::from_array(out, layout))
}
