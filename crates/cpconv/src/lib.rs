//! # cpconv - CP-decomposed 2D convolution
//!
//! Factor a 4-D convolution kernel into rank-1 components with CP-ALS and
//! evaluate the convolution as a sequence of cheap contractions instead of
//! one dense convolution.
//!
//! This is the **meta crate** that re-exports all cpconv components.
//!
//! ## Quick Start
//!
//! ```
//! use cpconv::prelude::*;
//!
//! let kernel = KernelTensor::<f64>::random_uniform_seeded([3, 3, 4, 8], 0.0, 1.0, 0);
//! let result = factorize(&kernel, 2, &CpAlsConfig::default().with_seed(0))?;
//! println!("relative error {:.3e} ({})", result.relative_error, result.status);
//!
//! let input = FeatureMap::<f64>::random_uniform_seeded(DataLayout::Nchw, [1, 4, 16, 16], 0.0, 1.0, 1);
//! let output = evaluate(&input, &result.factors, &Conv2dConfig::default())?;
//! assert_eq!(output.dims(), [1, 8, 16, 16]);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Tensor Types ([`core`])
//!
//! `DenseND`, layout-tagged `FeatureMap`s and HWIO `KernelTensor`s.
//!
//! ### Kernels ([`kernels`])
//!
//! Khatri-Rao, MTTKRP, mode products, the reference convolution, padding
//! plans and approximation metrics.
//!
//! ```
//! use cpconv::kernels::{outputs_close, reconstruction_error};
//! use scirs2_core::ndarray_ext::array;
//!
//! let a = array![1.0, 2.0, 3.0];
//! let b = array![1.0, 2.0, 3.0 + 1e-9];
//! assert!(outputs_close(&a.view(), &b.view(), 1e-6, 0.0));
//! assert!(reconstruction_error(&a.view(), &b.view()) < 1e-9);
//! ```
//!
//! ### Factorization ([`decomp`])
//!
//! CP-ALS, convolution factor sets, kernel recomposition and factor
//! persistence.
//!
//! ### Execution ([`exec`])
//!
//! Sequenced evaluation, pluggable backends and the benchmark driver.
//!
//! ## Features
//!
//! - `parallel` (default): data-parallel kernels through scirs2-core
//! - `serde`: serialization of configuration types
//! - `subscriber`: `tracing-subscriber` setup in `exec::tracing_support`

#![deny(warnings)]

pub use cpconv_core as core;
pub use cpconv_decomp as decomp;
pub use cpconv_exec as exec;
pub use cpconv_kernels as kernels;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use cpconv::prelude::*;
    //!
    //! let kernel = KernelTensor::<f64>::zeros([3, 3, 2, 2]);
    //! assert_eq!(kernel.dims(), [3, 3, 2, 2]);
    //! ```

    // Tensor types
    pub use crate::core::{DataLayout, DenseND, FeatureMap, KernelTensor};

    // Kernels and metrics
    pub use crate::kernels::{
        conv2d_reference, outputs_close, reconstruction_error, Conv2dConfig, Padding,
    };

    // Factorization
    pub use crate::decomp::{
        cp_als, factorize, recompose, ConvFactors, ConvergenceStatus, CpAlsConfig, InitStrategy,
    };

    // Execution
    pub use crate::exec::{
        build_backend, evaluate, run_benchmark, BackendKind, BenchConfig, ConvolutionBackend,
    };
}
