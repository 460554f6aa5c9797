//! Errors raised while evaluating factored convolutions

use cpconv_decomp::CpError;
use cpconv_kernels::KernelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Numeric degeneracy: {0}")]
    NumericDegeneracy(String),

    #[error("Factor set error: {0}")]
    Factors(#[from] CpError),

    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
}

pub type ExecResult<T> = Result<T, ExecError>;
