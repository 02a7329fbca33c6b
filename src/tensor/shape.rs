//! Shape arithmetic: strides, NumPy-style broadcasting and squeezing

use crate::error::{Result, TensorError};

/// Row-major strides for a shape
pub fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}

/// Compute the broadcast shape of two operands
///
/// Shapes are aligned on their trailing dimensions; a dimension of size 1
/// stretches to match the other operand.
pub fn broadcast_shapes(lhs: &[usize], rhs: &[usize]) -> Result<Vec<usize>> {
    let ndim = lhs.len().max(rhs.len());
    let mut out = vec![0; ndim];

    for i in 0..ndim {
        let l = if i < ndim - lhs.len() { 1 } else { lhs[i - (ndim - lhs.len())] };
        let r = if i < ndim - rhs.len() { 1 } else { rhs[i - (ndim - rhs.len())] };

        out[i] = match (l, r) {
            (a, b) if a == b => a,
            (1, b) => b,
            (a, 1) => a,
            _ => {
                return Err(TensorError::ShapeMismatch {
                    lhs: lhs.to_vec(),
                    rhs: rhs.to_vec(),
                })
            }
        };
    }

    Ok(out)
}

/// Map every flat index of `out_shape` to the flat index of `shape` it reads
/// from when `shape` is broadcast to `out_shape`.
///
/// `shape` must be broadcast-compatible with `out_shape`.
pub fn broadcast_index_map(shape: &[usize], out_shape: &[usize]) -> Vec<usize> {
    let out_numel: usize = out_shape.iter().product();
    if shape == out_shape {
        return (0..out_numel).collect();
    }

    let offset = out_shape.len() - shape.len();
    let in_strides = strides(shape);
    let out_strides = strides(out_shape);

    (0..out_numel)
        .map(|flat| {
            let mut src = 0;
            for (axis, &dim) in shape.iter().enumerate() {
                if dim != 1 {
                    let out_axis = axis + offset;
                    let coord = (flat / out_strides[out_axis]) % out_shape[out_axis];
                    src += coord * in_strides[axis];
                }
            }
            src
        })
        .collect()
}

/// Drop size-1 dimensions (all of them, or only `axis`)
pub fn squeeze_shape(shape: &[usize], axis: Option<usize>) -> Vec<usize> {
    match axis {
        None => shape.iter().copied().filter(|&d| d != 1).collect(),
        Some(ax) => shape
            .iter()
            .enumerate()
            .filter(|&(i, &d)| !(i == ax && d == 1))
            .map(|(_, &d)| d)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(strides(&[5]), vec![1]);
        assert!(strides(&[]).is_empty());
    }

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(broadcast_shapes(&[2, 3], &[2, 3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[6], &[1]).unwrap(), vec![6]);
        assert_eq!(broadcast_shapes(&[], &[2, 3]).unwrap(), vec![2, 3]);
        assert_eq!(broadcast_shapes(&[4, 1, 3], &[2, 1]).unwrap(), vec![4, 2, 3]);
        assert_eq!(broadcast_shapes(&[20000, 2], &[2]).unwrap(), vec![20000, 2]);
    }

    #[test]
    fn test_broadcast_shapes_mismatch() {
        let err = broadcast_shapes(&[2, 3], &[3, 2]).unwrap_err();
        assert_eq!(
            err,
            TensorError::ShapeMismatch {
                lhs: vec![2, 3],
                rhs: vec![3, 2]
            }
        );
    }

    #[test]
    fn test_broadcast_index_map_row() {
        // [3] broadcast over [2, 3] repeats the row
        assert_eq!(broadcast_index_map(&[3], &[2, 3]), vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_broadcast_index_map_column() {
        // [2, 1] broadcast over [2, 3] repeats each element along the row
        assert_eq!(broadcast_index_map(&[2, 1], &[2, 3]), vec![0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_broadcast_index_map_scalar() {
        assert_eq!(broadcast_index_map(&[], &[4]), vec![0, 0, 0, 0]);
        assert_eq!(broadcast_index_map(&[1], &[3]), vec![0, 0, 0]);
    }

    #[test]
    fn test_squeeze_shape() {
        assert_eq!(squeeze_shape(&[1, 2, 1, 3], None), vec![2, 3]);
        assert_eq!(squeeze_shape(&[1, 2, 1, 3], Some(2)), vec![1, 2, 3]);
        assert_eq!(squeeze_shape(&[2, 3], Some(0)), vec![2, 3]);
        assert!(squeeze_shape(&[1], None).is_empty());
    }
}
