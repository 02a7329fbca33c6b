//! Element-wise integer operations
//!
//! `gcd` and `lcm` broadcast their operands like the float arithmetic in
//! [`Tensor`](super::Tensor) and ignore operand signs.

use tracing::{debug, instrument};

use super::{shape, IntTensor};
use crate::error::{Result, TensorError};

/// Greatest common divisor of two non-negative values
fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Apply a fallible element-wise kernel over two broadcast integer tensors
fn broadcast_int_op<F>(x: &IntTensor, y: &IntTensor, op: &'static str, kernel: F) -> Result<IntTensor>
where
    F: Fn(i64, i64) -> Option<u64>,
{
    if x.dtype() != y.dtype() {
        return Err(TensorError::DTypeMismatch {
            lhs: x.dtype(),
            rhs: y.dtype(),
        });
    }

    let dtype = x.dtype();
    let out_shape = shape::broadcast_shapes(&x.shape, &y.shape)?;
    let lhs_map = shape::broadcast_index_map(&x.shape, &out_shape);
    let rhs_map = shape::broadcast_index_map(&y.shape, &out_shape);
    let (_, max) = x.value_range();

    let data = lhs_map
        .iter()
        .zip(&rhs_map)
        .map(|(&l, &r)| {
            kernel(x.data[l], y.data[r])
                .and_then(|v| i64::try_from(v).ok())
                .filter(|&v| v <= max)
                .ok_or(TensorError::Overflow { op, dtype })
        })
        .collect::<Result<Vec<i64>>>()?;

    debug!(op, ?out_shape, %dtype, "integer op");
    Ok(IntTensor::with_dtype(data, out_shape, dtype))
}

/// Element-wise greatest common divisor
///
/// The result is non-negative and `gcd(0, 0) = 0`.
#[instrument(skip(x, y), fields(shape_x = ?x.shape, shape_y = ?y.shape))]
pub fn gcd(x: &IntTensor, y: &IntTensor) -> Result<IntTensor> {
    broadcast_int_op(x, y, "gcd", |a, b| {
        Some(gcd_u64(a.unsigned_abs(), b.unsigned_abs()))
    })
}

/// Element-wise least common multiple
///
/// `lcm(a, b) = |a / gcd(a, b) * b|`, zero when either operand is zero. A
/// result that does not fit the operand dtype is an overflow error.
#[instrument(skip(x, y), fields(shape_x = ?x.shape, shape_y = ?y.shape))]
pub fn lcm(x: &IntTensor, y: &IntTensor) -> Result<IntTensor> {
    broadcast_int_op(x, y, "lcm", |a, b| {
        let (a, b) = (a.unsigned_abs(), b.unsigned_abs());
        if a == 0 || b == 0 {
            return Some(0);
        }
        (a / gcd_u64(a, b)).checked_mul(b)
    })
}
