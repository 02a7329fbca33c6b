//! Error types for fallible tensor, distribution and dataset operations.

use thiserror::Error;

use crate::tensor::DType;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, TensorError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    /// Two shapes cannot be broadcast together
    #[error("shape mismatch: {lhs:?} and {rhs:?} cannot be broadcast together")]
    ShapeMismatch { lhs: Vec<usize>, rhs: Vec<usize> },

    /// Operands carry different element types
    #[error("dtype mismatch: {lhs} vs {rhs}")]
    DTypeMismatch { lhs: DType, rhs: DType },

    /// Distribution parameter outside its domain
    #[error("invalid parameter `{param}`: {constraint} (got {value})")]
    InvalidParameter {
        param: &'static str,
        value: String,
        constraint: &'static str,
    },

    /// Integer result does not fit the output dtype
    #[error("integer overflow computing {op} for {dtype}")]
    Overflow { op: &'static str, dtype: DType },

    /// Unknown dataset module name
    #[error("unknown dataset module: {0}")]
    UnknownDataset(String),

    /// Unknown dtype name
    #[error("unknown dtype: {0}")]
    UnknownDType(String),

    /// Environment override could not be parsed
    #[error("invalid value for {var}: {value}")]
    InvalidConfig { var: String, value: String },
}
