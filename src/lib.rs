//! A small eager tensor runtime with probability distributions
//!
//! This library provides float tensors with reverse-mode gradients, integer
//! tensors with element-wise number-theoretic ops, probability distributions
//! built on top of them, and the dataset package registry.

pub mod config;
pub mod dataset;
pub mod distribution;
pub mod error;
pub mod random;
pub mod tensor;
pub mod testing;

// Re-export commonly used types for convenience
pub use distribution::{kl_divergence, Distribution, Exponential, ExponentialFamily};
pub use error::{Result, TensorError};
pub use tensor::ops::{gcd, lcm};
pub use tensor::{DType, IntTensor, Tensor};
