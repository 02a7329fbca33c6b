//! Exponential distribution
//!
//! Density `f(x; λ) = λ exp(-λx)` for `x >= 0`, parameterized by the rate
//! `λ > 0`. Equivalent to the `expon` family with `scale = 1/λ`.

use rand::distributions::OpenClosed01;
use rand::Rng;
use tracing::{debug, instrument};

use super::{value_shape, Distribution, ExponentialFamily, KlDivergence};
use crate::error::{Result, TensorError};
use crate::random;
use crate::tensor::{shape, Tensor};

#[derive(Debug, Clone)]
pub struct Exponential {
    rate: Tensor,
}

impl Exponential {
    /// Create an exponential distribution with a batch of rates
    ///
    /// Every rate must be positive and finite. Gradient tracking on `rate`
    /// is preserved, so `rsample` and the density methods differentiate
    /// with respect to it.
    #[instrument(skip(rate), fields(shape = ?rate.shape))]
    pub fn new(rate: Tensor) -> Result<Self> {
        if let Some(bad) = rate.data.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
            return Err(TensorError::InvalidParameter {
                param: "rate",
                value: bad.to_string(),
                constraint: "must be positive and finite",
            });
        }

        debug!(batch_shape = ?rate.shape, "created exponential distribution");
        Ok(Self { rate })
    }

    /// Create a distribution with a 0-d rate
    pub fn from_scalar(rate: f32) -> Result<Self> {
        Self::new(Tensor::scalar(rate))
    }

    pub fn rate(&self) -> &Tensor {
        &self.rate
    }

    /// `value` broadcast against the batch, plus a mask of the positions
    /// that fail `inside`
    fn broadcast_value(&self, value: &Tensor, inside: impl Fn(f32) -> bool) -> Result<(Tensor, Vec<bool>)> {
        let out_shape = value_shape(self.batch_shape(), value)?;
        let value = value.broadcast_to(&out_shape);
        let outside = value.data.iter().map(|&v| !inside(v)).collect();
        Ok((value, outside))
    }
}

impl Distribution for Exponential {
    fn batch_shape(&self) -> &[usize] {
        &self.rate.shape
    }

    /// `1/λ`
    fn mean(&self) -> Tensor {
        self.rate.reciprocal()
    }

    /// `1/λ²`
    fn variance(&self) -> Tensor {
        self.rate.pow(-2.0)
    }

    fn stddev(&self) -> Tensor {
        self.rate.reciprocal()
    }

    /// `1 - ln λ`
    #[instrument(skip(self), fields(batch_shape = ?self.rate.shape))]
    fn entropy(&self) -> Tensor {
        self.rate.ln().neg().add_scalar(1.0)
    }

    /// `ln λ - λx`, `-inf` for `x < 0`
    #[instrument(skip(self, value), fields(batch_shape = ?self.rate.shape, value_shape = ?value.shape))]
    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        let (value, outside) = self.broadcast_value(value, |v| v >= 0.0)?;
        let log_prob = self.rate.ln().sub(&self.rate.mul(&value));
        Ok(log_prob.masked_fill(&outside, f32::NEG_INFINITY))
    }

    /// `λ exp(-λx)`, `0` for `x < 0`
    #[instrument(skip(self, value), fields(batch_shape = ?self.rate.shape, value_shape = ?value.shape))]
    fn prob(&self, value: &Tensor) -> Result<Tensor> {
        let (value, outside) = self.broadcast_value(value, |v| v >= 0.0)?;
        let prob = self.rate.mul(&self.rate.mul(&value).neg().exp());
        Ok(prob.masked_fill(&outside, 0.0))
    }

    /// `1 - exp(-λx)` as `-expm1(-λx)`, `0` for `x < 0`
    #[instrument(skip(self, value), fields(batch_shape = ?self.rate.shape, value_shape = ?value.shape))]
    fn cdf(&self, value: &Tensor) -> Result<Tensor> {
        let (value, outside) = self.broadcast_value(value, |v| v >= 0.0)?;
        let cdf = self.rate.mul(&value).neg().exp_m1().neg();
        Ok(cdf.masked_fill(&outside, 0.0))
    }

    /// `-ln(1 - p)/λ` as `-log1p(-p)/λ`, NaN for `p` outside `[0, 1]`
    #[instrument(skip(self, value), fields(batch_shape = ?self.rate.shape, value_shape = ?value.shape))]
    fn icdf(&self, value: &Tensor) -> Result<Tensor> {
        let (value, outside) = self.broadcast_value(value, |p| (0.0..=1.0).contains(&p))?;
        let icdf = value.neg().ln_1p().neg().div(&self.rate);
        Ok(icdf.masked_fill(&outside, f32::NAN))
    }

    /// Inverse-transform draw `-ln(u)/λ` with `u ~ U(0, 1]`
    #[instrument(skip(self), fields(batch_shape = ?self.rate.shape, sample_shape = ?sample_shape))]
    fn rsample(&self, sample_shape: &[usize]) -> Tensor {
        let out_shape = self.extend_shape(sample_shape);
        let numel = out_shape.iter().product::<usize>();
        let data: Vec<f32> =
            random::with_rng(|rng| (0..numel).map(|_| rng.sample(OpenClosed01)).collect());
        let standard = Tensor::new(data, out_shape).ln().neg();
        standard.div(&self.rate)
    }
}

impl ExponentialFamily for Exponential {
    /// `θ = -λ`
    fn natural_parameters(&self) -> Vec<Tensor> {
        vec![self.rate.neg()]
    }

    /// `A(θ) = -ln(-θ)`
    fn log_normalizer(&self, natural_parameters: &[Tensor]) -> Tensor {
        natural_parameters[0].neg().ln().neg()
    }

    fn mean_carrier_measure(&self) -> f32 {
        0.0
    }
}

impl KlDivergence for Exponential {
    /// `ln λp - ln λq + λq/λp - 1`
    #[instrument(skip(self, other), fields(p = ?self.rate.shape, q = ?other.rate.shape))]
    fn kl_divergence(&self, other: &Exponential) -> Result<Tensor> {
        shape::broadcast_shapes(&self.rate.shape, &other.rate.shape)?;
        let ratio = other.rate.div(&self.rate);
        Ok(ratio.ln().neg().add(&ratio).add_scalar(-1.0))
    }
}
