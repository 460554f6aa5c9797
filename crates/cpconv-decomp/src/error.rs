//! Error type for factorization, recomposition and factor persistence

use cpconv_kernels::KernelError;
use scirs2_linalg::LinalgError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CpError {
    #[error("Invalid rank: {0}")]
    InvalidRank(usize),

    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(f64),

    #[error("Invalid factor set: {0}")]
    InvalidFactorSet(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("Linear algebra error: {0}")]
    Linalg(#[from] LinalgError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid factor file: {0}")]
    Format(String),
}
