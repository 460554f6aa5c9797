//! Memory layouts and rank-4 feature maps.
//!
//! A [`FeatureMap`] always carries its [`DataLayout`]. Code that needs a
//! particular axis asks the layout for its index instead of assuming one, and
//! a canonical NCHW view is produced by permuting strides, never by copying.
//!
//! # Examples
//!
//! ```
//! use cpconv_core::{DataLayout, FeatureMap};
//!
//! let nhwc = FeatureMap::<f64>::zeros(DataLayout::Nhwc, [1, 4, 16, 16]);
//! assert_eq!(nhwc.shape(), &[1, 16, 16, 4]);
//! assert_eq!(nhwc.channels(), 4);
//! assert_eq!(nhwc.nchw_view().shape(), &[1, 4, 16, 16]);
//! ```

use crate::DenseND;
use scirs2_core::ndarray_ext::{Array4, ArrayView4, Ix4};
use scirs2_core::numeric::Num;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis order of a rank-4 activation tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DataLayout {
    /// (Batch, Channels, Height, Width)
    #[default]
    Nchw,
    /// (Batch, Height, Width, Channels)
    Nhwc,
}

impl DataLayout {
    /// Index of the batch axis
    pub fn batch_axis(self) -> usize {
        0
    }

    /// Index of the channel axis
    pub fn channel_axis(self) -> usize {
        match self {
            DataLayout::Nchw => 1,
            DataLayout::Nhwc => 3,
        }
    }

    /// Index of the height axis
    pub fn height_axis(self) -> usize {
        match self {
            DataLayout::Nchw => 2,
            DataLayout::Nhwc => 1,
        }
    }

    /// Index of the width axis
    pub fn width_axis(self) -> usize {
        match self {
            DataLayout::Nchw => 3,
            DataLayout::Nhwc => 2,
        }
    }

    /// Axis permutation taking this layout to NCHW.
    pub fn to_nchw_axes(self) -> [usize; 4] {
        match self {
            DataLayout::Nchw => [0, 1, 2, 3],
            DataLayout::Nhwc => [0, 3, 1, 2],
        }
    }

    /// Axis permutation taking NCHW to this layout.
    pub fn from_nchw_axes(self) -> [usize; 4] {
        match self {
            DataLayout::Nchw => [0, 1, 2, 3],
            DataLayout::Nhwc => [0, 2, 3, 1],
        }
    }

    /// Concrete shape for logical `[batch, channels, height, width]` dims.
    pub fn shape(self, [n, c, h, w]: [usize; 4]) -> [usize; 4] {
        match self {
            DataLayout::Nchw => [n, c, h, w],
            DataLayout::Nhwc => [n, h, w, c],
        }
    }
}

impl fmt::Display for DataLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataLayout::Nchw => write!(f, "NCHW"),
            DataLayout::Nhwc => write!(f, "NHWC"),
        }
    }
}

impl FromStr for DataLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NCHW" => Ok(DataLayout::Nchw),
            "NHWC" => Ok(DataLayout::Nhwc),
            other => anyhow::bail!("Unknown data layout '{}', expected NCHW or NHWC", other),
        }
    }
}

/// Rank-4 activation tensor tagged with its layout.
#[derive(Clone)]
pub struct FeatureMap<T> {
    data: Array4<T>,
    layout: DataLayout,
}

impl<T> FeatureMap<T>
where
    T: Clone + Num,
{
    /// Wrap a rank-4 dense tensor stored in `layout` order.
    ///
    /// Fails if the tensor is not rank 4.
    pub fn new(tensor: DenseND<T>, layout: DataLayout) -> anyhow::Result<Self> {
        if tensor.rank() != 4 {
            anyhow::bail!(
                "Feature map must be rank 4 ({}), got shape {:?}",
                layout,
                tensor.shape()
            );
        }
        let data = tensor.into_array().into_dimensionality::<Ix4>()?;
        Ok(Self { data, layout })
    }

    /// Wrap an array already stored in `layout` order.
    pub fn from_array(data: Array4<T>, layout: DataLayout) -> Self {
        Self { data, layout }
    }

    /// Store an NCHW array in `layout` order.
    ///
    /// The result is materialized in standard layout for the target order.
    pub fn from_nchw(data: Array4<T>, layout: DataLayout) -> Self {
        let data = match layout {
            DataLayout::Nchw => data,
            DataLayout::Nhwc => data
                .permuted_axes(layout.from_nchw_axes())
                .as_standard_layout()
                .into_owned(),
        };
        Self { data, layout }
    }

    /// Zero-filled map with logical dims `[batch, channels, height, width]`
    pub fn zeros(layout: DataLayout, dims: [usize; 4]) -> Self {
        Self {
            data: Array4::zeros(layout.shape(dims)),
            layout,
        }
    }

    /// Seeded uniform random map with logical dims `[batch, channels, height, width]`
    pub fn random_uniform_seeded(
        layout: DataLayout,
        dims: [usize; 4],
        low: f64,
        high: f64,
        seed: u64,
    ) -> Self
    where
        T: scirs2_core::numeric::NumCast,
    {
        let dense = DenseND::<T>::random_uniform_seeded(&layout.shape(dims), low, high, seed);
        match dense.into_array().into_dimensionality::<Ix4>() {
            Ok(data) => Self { data, layout },
            Err(_) => Self::zeros(layout, dims),
        }
    }

    /// Layout tag
    pub fn layout(&self) -> DataLayout {
        self.layout
    }

    /// Concrete shape in storage order
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Batch size
    pub fn batch(&self) -> usize {
        self.data.shape()[self.layout.batch_axis()]
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        self.data.shape()[self.layout.channel_axis()]
    }

    /// Spatial height
    pub fn height(&self) -> usize {
        self.data.shape()[self.layout.height_axis()]
    }

    /// Spatial width
    pub fn width(&self) -> usize {
        self.data.shape()[self.layout.width_axis()]
    }

    /// Logical dims `[batch, channels, height, width]`
    pub fn dims(&self) -> [usize; 4] {
        [self.batch(), self.channels(), self.height(), self.width()]
    }

    /// Storage-order view
    pub fn view(&self) -> ArrayView4<'_, T> {
        self.data.view()
    }

    /// NCHW view over the same buffer
    pub fn nchw_view(&self) -> ArrayView4<'_, T> {
        self.data.view().permuted_axes(self.layout.to_nchw_axes())
    }

    /// Copy into another layout
    pub fn to_layout(&self, layout: DataLayout) -> Self {
        if layout == self.layout {
            return self.clone();
        }
        Self::from_nchw(self.nchw_view().to_owned(), layout)
    }

    /// Underlying array in storage order
    pub fn as_array(&self) -> &Array4<T> {
        &self.data
    }

    /// Consume into the storage-order array
    pub fn into_array(self) -> Array4<T> {
        self.data
    }

    /// Convert into a dynamic-rank dense tensor in storage order
    pub fn to_dense(&self) -> DenseND<T> {
        DenseND::from_array(self.data.clone().into_dyn())
    }
}

impl<T: fmt::Debug> fmt::Debug for FeatureMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureMap")
            .field("layout", &self.layout)
            .field("shape", &self.data.shape())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_indices() {
        assert_eq!(DataLayout::Nchw.channel_axis(), 1);
        assert_eq!(DataLayout::Nhwc.channel_axis(), 3);
        assert_eq!(DataLayout::Nhwc.height_axis(), 1);
        assert_eq!(DataLayout::Nhwc.width_axis(), 2);
    }

    #[test]
    fn test_permutations_are_inverse() {
        for layout in [DataLayout::Nchw, DataLayout::Nhwc] {
            let to = layout.to_nchw_axes();
            let from = layout.from_nchw_axes();
            for (i, &axis) in from.iter().enumerate() {
                assert_eq!(to[axis], i);
            }
        }
    }

    #[test]
    fn test_parse_layout() {
        assert_eq!("nchw".parse::<DataLayout>().unwrap(), DataLayout::Nchw);
        assert_eq!("NHWC".parse::<DataLayout>().unwrap(), DataLayout::Nhwc);
        assert!("HWCN".parse::<DataLayout>().is_err());
        assert_eq!(DataLayout::Nhwc.to_string(), "NHWC");
    }

    #[test]
    fn test_new_rejects_wrong_rank() {
        let tensor = DenseND::<f64>::zeros(&[4, 16, 16]);
        assert!(FeatureMap::new(tensor, DataLayout::Nchw).is_err());
    }

    #[test]
    fn test_nchw_view_is_consistent() {
        let nchw = FeatureMap::<f64>::random_uniform_seeded(
            DataLayout::Nchw,
            [2, 3, 5, 4],
            -1.0,
            1.0,
            9,
        );
        let nhwc = nchw.to_layout(DataLayout::Nhwc);
        assert_eq!(nhwc.shape(), &[2, 5, 4, 3]);
        assert_eq!(nhwc.dims(), [2, 3, 5, 4]);
        assert_eq!(nhwc.nchw_view(), nchw.view());
        assert_eq!(nhwc.view()[[1, 4, 2, 0]], nchw.view()[[1, 0, 4, 2]]);

        let back = nhwc.to_layout(DataLayout::Nchw);
        assert_eq!(back.as_array(), nchw.as_array());
    }
}
