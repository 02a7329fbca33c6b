//! Integer tensors
//!
//! Values are stored as `i64` and tagged with the logical dtype; an `Int32`
//! tensor never holds a value outside the `i32` range.

use tracing::instrument;

use super::DType;
use crate::error::{Result, TensorError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntTensor {
    pub data: Vec<i64>,
    pub shape: Vec<usize>,
    dtype: DType,
}

impl IntTensor {
    /// Create an `Int64` tensor
    #[instrument(skip(data), fields(shape = ?shape, numel = data.len()))]
    pub fn new(data: Vec<i64>, shape: Vec<usize>) -> Self {
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            panic!(
                "Invalid shape: {:?} for data of length: {}",
                shape,
                data.len()
            )
        }

        IntTensor {
            data,
            shape,
            dtype: DType::Int64,
        }
    }

    /// Create an `Int32` tensor
    pub fn from_i32(data: Vec<i32>, shape: Vec<usize>) -> Self {
        let mut tensor = IntTensor::new(data.into_iter().map(i64::from).collect(), shape);
        tensor.dtype = DType::Int32;
        tensor
    }

    /// Create a 0-d `Int64` tensor
    pub fn scalar(value: i64) -> Self {
        IntTensor::new(vec![value], vec![])
    }

    /// `[0, 1, ..., end - 1]` as an `Int64` tensor
    pub fn arange(end: i64) -> Self {
        let data: Vec<i64> = (0..end.max(0)).collect();
        let len = data.len();
        IntTensor::new(data, vec![len])
    }

    /// Build a tensor of `dtype` from already range-checked values
    pub(crate) fn with_dtype(data: Vec<i64>, shape: Vec<usize>, dtype: DType) -> Self {
        let mut tensor = IntTensor::new(data, shape);
        tensor.dtype = dtype;
        tensor
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    /// Inclusive range of values the tensor's dtype can hold
    pub(crate) fn value_range(&self) -> (i64, i64) {
        match self.dtype {
            DType::Int32 => (i64::from(i32::MIN), i64::from(i32::MAX)),
            _ => (i64::MIN, i64::MAX),
        }
    }

    /// Convert to another integer dtype, failing if any value is out of range
    pub fn cast(&self, dtype: DType) -> Result<IntTensor> {
        let (min, max) = dtype.int_range().ok_or(TensorError::DTypeMismatch {
            lhs: self.dtype,
            rhs: dtype,
        })?;

        if self.data.iter().any(|&v| v < min || v > max) {
            return Err(TensorError::Overflow { op: "cast", dtype });
        }

        Ok(IntTensor::with_dtype(self.data.clone(), self.shape.clone(), dtype))
    }
}
