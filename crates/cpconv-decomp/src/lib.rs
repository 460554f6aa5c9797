//! # cpconv-decomp - CP Factorization of Convolution Kernels
//!
//! Low-rank CP (CANDECOMP/PARAFAC) factorization of 2D convolution kernels,
//! recomposition of the full kernel from its factors, and a compact binary
//! format for storing factor sets.
//!
//! ## Overview
//!
//! A kernel `K` of shape (H, W, C, T) is approximated by R rank-1 terms:
//!
//! ```text
//! K[h, w, c, t] ≈ Σᵣ f_h[h, r] · f_w[w, r] · f_in[c, r] · f_out[r, t]
//! ```
//!
//! **Algorithms:**
//! - [`cp_als`]: N-mode alternating least squares with SVD or random
//!   initialization, pseudo-inverse updates and best-iterate tracking
//! - [`factorize`]: `cp_als` on a kernel, returning a [`ConvFactors`] set
//! - [`recompose`]: rebuild the HWIO kernel from its factors
//!
//! ## Quick Start
//!
//! ```
//! use cpconv_core::KernelTensor;
//! use cpconv_decomp::{factorize, recompose, CpAlsConfig};
//! use cpconv_kernels::reconstruction_error;
//!
//! let kernel = KernelTensor::<f64>::random_uniform_seeded([3, 3, 16, 32], -1.0, 1.0, 42);
//! let config = CpAlsConfig::default().with_max_iters(50).with_seed(7);
//!
//! let result = factorize(&kernel, 8, &config)?;
//! println!("{} ({} parameters)", result.status, result.factors.num_parameters());
//!
//! let approx = recompose(&result.factors)?;
//! let err = reconstruction_error(&kernel.view(), &approx.view());
//! assert!((err - result.relative_error).abs() < 1e-9);
//! # Ok::<(), cpconv_decomp::CpError>(())
//! ```
//!
//! ## Convergence
//!
//! Running out of iterations is not an error: the result carries a
//! [`ConvergenceStatus`] and the best factors found. Errors are reserved for
//! invalid arguments ([`CpError::InvalidRank`], [`CpError::InvalidTolerance`])
//! and numeric breakdown ([`CpError::NumericDegeneracy`]).
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization of [`CpAlsConfig`], [`InitStrategy`] and [`ConvergenceStatus`]
//!
//! ## SciRS2 Integration
//!
//! All linear algebra operations use `scirs2_linalg` for SVD and symmetric
//! eigendecomposition. Random number generation uses `scirs2_core::random`.
//!
//! ## References
//!
//! - Kolda & Bader (2009), "Tensor Decompositions and Applications"
//! - Lebedev et al. (2015), "Speeding-up Convolutional Neural Networks Using
//!   Fine-tuned CP-Decomposition"

#![deny(warnings)]

pub mod conv_factors;
pub mod cp;
pub mod error;
pub mod io;


// Re-exports
pub use conv_factors::*;
pub use cp::*;
pub use error::CpError;
pub use io::*;
