//! # cpconv-exec
//!
//! Execution of CP-factored 2D convolutions.
//!
//! This crate provides:
//! - [`evaluate`] - the sequenced three-stage evaluation of a factored kernel
//! - [`ConvolutionBackend`] and its reference, sequenced and recomposed
//!   implementations, selected through [`BackendKind`]
//! - [`run_benchmark`] - the benchmark driver behind [`BenchConfig`]
//! - [`tracing_support`] - subscriber setup for binaries
//!
//! # Example
//!
//! ```
//! use cpconv_core::{DataLayout, FeatureMap, KernelTensor};
//! use cpconv_decomp::{factorize, CpAlsConfig};
//! use cpconv_exec::evaluate;
//! use cpconv_kernels::{conv2d_reference, outputs_close, Conv2dConfig};
//!
//! let kernel = KernelTensor::<f64>::random_uniform_seeded([3, 3, 4, 8], 0.0, 1.0, 0);
//! let result = factorize(&kernel, 2, &CpAlsConfig::default().with_seed(0)).unwrap();
//!
//! let input = FeatureMap::<f64>::random_uniform_seeded(DataLayout::Nchw, [1, 4, 16, 16], 0.0, 1.0, 1);
//! let config = Conv2dConfig::default();
//! let fast = evaluate(&input, &result.factors, &config).unwrap();
//!
//! let rebuilt = result.factors.recompose().unwrap();
//! let reference = conv2d_reference(&input, &rebuilt, &config).unwrap();
//! assert!(outputs_close(&fast.view(), &reference.view(), 1e-4, 1e-6));
//! ```

#![deny(warnings)]

pub mod backend;
pub mod bench;
pub mod error;
pub mod sequenced;
pub mod tracing_support;

#[cfg(test)]
mod property_tests;

pub use backend::*;
pub use bench::*;
pub use error::*;
pub use sequenced::*;
