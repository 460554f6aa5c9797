//! # cpconv-kernels
//!
//! Tensor kernels for CP-decomposed convolution.
//!
//! ## Overview
//!
//! This crate provides the primitives that factorization and evaluation are
//! built from:
//!
//! - **Outer products** and CP reconstruction ([`outer_product`], [`cp_reconstruct`])
//! - **Tensor contractions** ([`contract_tensors`], [`mode_product`])
//! - **Reshaping and matricization** ([`reshape`], [`reshape_view`], [`to_matrix`], [`from_matrix`])
//! - **Khatri-Rao product** (serial & parallel) and **MTTKRP**, the CP-ALS building blocks
//! - **2D convolution**: padding planning, a full-kernel reference path, and
//!   depthwise separable filtering ([`conv2d_reference`], [`depthwise_separable`])
//! - **Approximation metrics** ([`reconstruction_error`], [`outputs_close`])
//!
//! ## Quick Start
//!
//! ```rust
//! use scirs2_core::ndarray_ext::Array2;
//! use cpconv_core::DenseND;
//! use cpconv_kernels::{khatri_rao, mttkrp};
//!
//! let a = Array2::<f64>::ones((3, 2));
//! let b = Array2::<f64>::ones((4, 2));
//! let kr = khatri_rao(&a.view(), &b.view()).unwrap();
//! assert_eq!(kr.shape(), &[12, 2]);
//!
//! // MTTKRP on an HWIO kernel, input-channel mode
//! let kernel = DenseND::<f64>::ones(&[3, 3, 4, 8]);
//! let factors = vec![
//!     Array2::<f64>::ones((3, 2)),
//!     Array2::<f64>::ones((3, 2)),
//!     Array2::<f64>::ones((4, 2)),
//!     Array2::<f64>::ones((8, 2)),
//! ];
//! let views: Vec<_> = factors.iter().map(|f| f.view()).collect();
//! let v = mttkrp(&kernel.view(), &views, 2).unwrap();
//! assert_eq!(v.shape(), &[4, 2]);
//! ```
//!
//! ## Error Handling
//!
//! Every fallible routine returns [`KernelResult`]; see [`KernelError`].
//!
//! ## Features
//!
//! - `parallel` (default) - Parallel Khatri-Rao and per-channel depthwise filtering via rayon
//! - `serde` - Serialization of [`Padding`] and [`Conv2dConfig`]
//!
//! ## SciRS2 Integration
//!
//! This crate uses `scirs2-core` for all array operations and numerical computations.
//! Direct use of `ndarray`, `rand`, or `num-traits` is not permitted.

#![deny(warnings)]

pub mod contractions;
pub mod conv;
pub mod error;
pub mod khatri_rao;
pub mod metrics;
pub mod mttkrp;
pub mod outer;
pub mod shape_ops;

#[cfg(test)]
mod property_tests;

// Re-exports
pub use contractions::*;
pub use conv::*;
pub use error::{KernelError, KernelResult};
pub use khatri_rao::*;
pub use metrics::*;
pub use mttkrp::*;
pub use outer::*;
pub use shape_ops::*;
