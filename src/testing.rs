//! Numeric comparison helpers with NumPy `allclose` semantics
//!
//! Two values match when `|actual - expected| <= atol + rtol * |expected|`.
//! NaNs compare equal to each other, infinities compare equal when their
//! signs agree. `expected` is broadcast against `actual`.

use crate::config::{Config, Tolerance, ToleranceTable};
use crate::tensor::{shape, DType, Tensor};

thread_local! {
    static TOLERANCES: ToleranceTable = Config::default().tolerances;
}

/// Tolerance configured for `dtype`
///
/// The environment is read once per thread, on first use.
pub fn tolerance_for(dtype: DType) -> Tolerance {
    TOLERANCES.with(|table| table.get(dtype))
}

fn close(actual: f64, expected: f64, tol: Tolerance) -> bool {
    if actual.is_nan() || expected.is_nan() {
        return actual.is_nan() && expected.is_nan();
    }
    if actual.is_infinite() || expected.is_infinite() {
        return actual == expected;
    }
    (actual - expected).abs() <= tol.atol + tol.rtol * expected.abs()
}

/// Positions (in `actual`) whose values do not match, or `Err` on a shape mismatch
fn mismatches(actual: &Tensor, expected: &Tensor, tol: Tolerance) -> Result<Vec<usize>, String> {
    let out_shape = shape::broadcast_shapes(&actual.shape, &expected.shape)
        .map_err(|err| err.to_string())?;
    if out_shape != actual.shape {
        return Err(format!(
            "expected shape {:?} widens actual shape {:?}",
            expected.shape, actual.shape
        ));
    }

    let index_map = shape::broadcast_index_map(&expected.shape, &out_shape);
    Ok(actual
        .data
        .iter()
        .zip(&index_map)
        .enumerate()
        .filter(|(_, (a, e))| !close(f64::from(**a), f64::from(expected.data[**e]), tol))
        .map(|(i, _)| i)
        .collect())
}

/// Whether every element of `actual` matches `expected`
pub fn allclose(actual: &Tensor, expected: &Tensor, tol: Tolerance) -> bool {
    matches!(mismatches(actual, expected, tol), Ok(m) if m.is_empty())
}

/// Panic with a per-element report unless `actual` matches `expected`
#[track_caller]
pub fn assert_allclose(actual: &Tensor, expected: &Tensor, tol: Tolerance) {
    match mismatches(actual, expected, tol) {
        Err(msg) => panic!("Not equal to tolerance: {msg}"),
        Ok(bad) if !bad.is_empty() => {
            let index_map = shape::broadcast_index_map(&expected.shape, &actual.shape);
            let details: Vec<String> = bad
                .iter()
                .take(8)
                .map(|&i| format!("[{i}] {} vs {}", actual.data[i], expected.data[index_map[i]]))
                .collect();
            panic!(
                "Not equal to tolerance rtol={}, atol={}: {}/{} mismatched: {}",
                tol.rtol,
                tol.atol,
                bad.len(),
                actual.numel(),
                details.join(", ")
            );
        }
        Ok(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allclose_relative() {
        let a = Tensor::new(vec![1.0, 100.0], vec![2]);
        let b = Tensor::new(vec![1.0005, 100.09], vec![2]);
        assert!(allclose(&a, &b, Tolerance::new(1e-3, 0.0)));
        assert!(!allclose(&a, &b, Tolerance::new(1e-4, 0.0)));
    }

    #[test]
    fn test_allclose_broadcasts_expected() {
        let a = Tensor::new(vec![2.0, 2.0, 2.0, 2.0], vec![2, 2]);
        assert!(allclose(&a, &Tensor::scalar(2.0), Tolerance::EXACT));
        assert!(!allclose(&Tensor::scalar(2.0), &a, Tolerance::EXACT));
    }

    #[test]
    fn test_special_values() {
        let a = Tensor::new(vec![f32::NAN, f32::NEG_INFINITY], vec![2]);
        let b = Tensor::new(vec![f32::NAN, f32::NEG_INFINITY], vec![2]);
        assert!(allclose(&a, &b, Tolerance::EXACT));
        let c = Tensor::new(vec![0.0, f32::INFINITY], vec![2]);
        assert!(!allclose(&a, &c, Tolerance::new(1.0, 1.0)));
    }

    #[test]
    #[should_panic(expected = "1/2 mismatched")]
    fn test_assert_allclose_reports() {
        let a = Tensor::new(vec![1.0, 2.0], vec![2]);
        let b = Tensor::new(vec![1.0, 3.0], vec![2]);
        assert_allclose(&a, &b, Tolerance::new(1e-3, 0.0));
    }

    #[test]
    fn test_tolerance_for_integer_is_exact() {
        assert_eq!(tolerance_for(DType::Int64), Tolerance::EXACT);
    }

    #[test]
    fn test_tolerance_for_is_cached() {
        let first = tolerance_for(DType::Float32);
        TOLERANCES.with(|table| assert_eq!(table.get(DType::Float32), first));
        assert_eq!(tolerance_for(DType::Float32), first);
    }
}
