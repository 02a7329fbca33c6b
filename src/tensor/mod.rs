//! Tensor module containing the float and integer tensor types
//!
//! This module provides the core `Tensor` type with reverse-mode gradients,
//! integer tensors, broadcasting helpers and element-wise integer operations.

mod core;
mod dtype;
mod int;
pub mod ops;
pub mod shape;

pub use core::Tensor;
pub use dtype::DType;
pub use int::IntTensor;
