//! Convolution kernel tensors in HWIO order.

use crate::dense::scaled_norm;
use crate::DenseND;
use scirs2_core::ndarray_ext::{Array4, ArrayView4, Ix4};
use scirs2_core::numeric::{Float, Num, NumCast};
use std::fmt;

/// Dense 2D convolution kernel with shape (Height, Width, InChannels, OutChannels).
///
/// The kernel is the immutable input to factorization. Convolution with it is
/// cross-correlation: output `(n, t, y, x)` sums `input(n, c, y+i, x+j) *
/// kernel(i, j, c, t)` over the padded input.
///
/// # Examples
///
/// ```
/// use cpconv_core::{DenseND, KernelTensor};
///
/// let kernel = KernelTensor::new(DenseND::<f32>::zeros(&[3, 3, 4, 8])).unwrap();
/// assert_eq!(kernel.dims(), [3, 3, 4, 8]);
///
/// // Only rank-4 tensors are kernels
/// assert!(KernelTensor::new(DenseND::<f32>::zeros(&[3, 3, 4])).is_err());
/// ```
#[derive(Clone, PartialEq)]
pub struct KernelTensor<T> {
    data: Array4<T>,
}

impl<T> KernelTensor<T>
where
    T: Clone + Num,
{
    /// Build a kernel from a rank-4 HWIO tensor
    pub fn new(tensor: DenseND<T>) -> anyhow::Result<Self> {
        if tensor.rank() != 4 {
            anyhow::bail!(
                "Kernel must be rank 4 (H, W, In, Out), got shape {:?}",
                tensor.shape()
            );
        }
        let data = tensor.into_array().into_dimensionality::<Ix4>()?;
        Ok(Self { data })
    }

    /// Wrap an HWIO array
    pub fn from_array(data: Array4<T>) -> Self {
        Self { data }
    }

    /// Zero kernel of the given `[h, w, in, out]` dims
    pub fn zeros(dims: [usize; 4]) -> Self {
        Self {
            data: Array4::zeros(dims),
        }
    }

    /// Kernel height
    pub fn height(&self) -> usize {
        self.data.shape()[0]
    }

    /// Kernel width
    pub fn width(&self) -> usize {
        self.data.shape()[1]
    }

    /// Input channels
    pub fn in_channels(&self) -> usize {
        self.data.shape()[2]
    }

    /// Output channels
    pub fn out_channels(&self) -> usize {
        self.data.shape()[3]
    }

    /// `[h, w, in, out]`
    pub fn dims(&self) -> [usize; 4] {
        [
            self.height(),
            self.width(),
            self.in_channels(),
            self.out_channels(),
        ]
    }

    /// Number of stored coefficients
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when any dimension is zero
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn view(&self) -> ArrayView4<'_, T> {
        self.data.view()
    }

    pub fn as_array(&self) -> &Array4<T> {
        &self.data
    }

    pub fn into_array(self) -> Array4<T> {
        self.data
    }

    /// Dynamic-rank copy for the generic tensor routines
    pub fn to_dense(&self) -> DenseND<T> {
        DenseND::from_array(self.data.clone().into_dyn())
    }
}

impl<T> KernelTensor<T>
where
    T: Clone + Num + NumCast,
{
    /// Seeded kernel with uniform entries in `[low, high)`
    pub fn random_uniform_seeded(dims: [usize; 4], low: f64, high: f64, seed: u64) -> Self {
        let dense = DenseND::<T>::random_uniform_seeded(&dims, low, high, seed);
        match dense.into_array().into_dimensionality::<Ix4>() {
            Ok(data) => Self { data },
            Err(_) => Self::zeros(dims),
        }
    }
}

impl<T: Float> KernelTensor<T> {
    /// Frobenius norm, scaled against underflow and overflow
    pub fn frobenius_norm(&self) -> T {
        scaled_norm(self.data.iter().copied(), self.max_abs())
    }

    pub fn max_abs(&self) -> T {
        self.data
            .iter()
            .fold(T::zero(), |acc, &x| if x.abs() > acc { x.abs() } else { acc })
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl<T: fmt::Debug> fmt::Debug for KernelTensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelTensor")
            .field("shape", &self.data.shape())
            .field("data", &self.data)
            .finish()
    }
}
