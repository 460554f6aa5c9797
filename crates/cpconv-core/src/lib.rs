//! # cpconv-core
//!
//! Core tensor types for CP-decomposed convolution.
//!
//! This crate provides the data model shared by the rest of the cpconv stack:
//!
//! - **Dense tensor representation** ([`DenseND`]) with views and strides
//! - **Shape operations** (reshape, permute) for tensor manipulation
//! - **Matricization** (unfold/fold) for decomposition algorithms
//! - **Layout-tagged feature maps** ([`FeatureMap`], [`DataLayout`]) for NCHW and NHWC activations
//! - **Convolution kernels** ([`KernelTensor`]) in HWIO order
//!
//! ## Core Principles
//!
//! ### SciRS2 Integration
//!
//! **CRITICAL:** This crate uses `scirs2-core` for all scientific computing operations.
//! Direct use of `ndarray`, `rand`, or `num-traits` is forbidden.
//!
//! ### Memory Layout
//!
//! Tensors default to C-contiguous (row-major) layout. Permuting axes and
//! taking the NCHW view of an NHWC feature map never copy.
//!
//! ## Quick Start
//!
//! ```
//! use cpconv_core::{DataLayout, DenseND, FeatureMap, KernelTensor};
//!
//! // A 3x3 kernel mapping 4 input channels to 8 output channels
//! let kernel = KernelTensor::new(DenseND::<f64>::ones(&[3, 3, 4, 8])).unwrap();
//! assert_eq!(kernel.dims(), [3, 3, 4, 8]);
//!
//! // A single 16x16 image with 4 channels, stored channels-last
//! let input = FeatureMap::<f64>::zeros(DataLayout::Nhwc, [1, 4, 16, 16]);
//! assert_eq!(input.channels(), kernel.in_channels());
//! ```
//!
//! ## Matricization (Unfold/Fold)
//!
//! ```
//! use cpconv_core::DenseND;
//!
//! let tensor = DenseND::<f64>::ones(&[3, 3, 4, 8]);
//!
//! // Unfold along the input-channel mode
//! let unfolded = tensor.unfold(2).unwrap();
//! assert_eq!(unfolded.shape(), &[4, 72]);
//!
//! let folded = DenseND::fold(&unfolded, &[3, 3, 4, 8], 2).unwrap();
//! assert_eq!(folded.shape(), &[3, 3, 4, 8]);
//! ```
//!
//! ## Error Handling
//!
//! Operations return `Result<T, anyhow::Error>`:
//!
//! ```
//! use cpconv_core::DenseND;
//!
//! let tensor = DenseND::<f64>::zeros(&[2, 3]);
//! assert!(tensor.reshape(&[7]).is_err());
//! assert!(tensor.unfold(10).is_err());
//! ```
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization of [`DataLayout`]

#![deny(warnings)]

pub mod dense;
pub mod kernel;
pub mod layout;


pub use dense::DenseND;
pub use kernel::KernelTensor;
pub use layout::{DataLayout, FeatureMap};
