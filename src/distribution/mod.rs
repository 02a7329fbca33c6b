//! Probability distributions over tensors
//!
//! A distribution is parameterized by tensors whose common shape is its
//! `batch_shape`. Query methods return tensors broadcast against that shape;
//! sampling prepends the requested sample shape.

pub mod exponential;

pub use exponential::Exponential;

use crate::error::Result;
use crate::tensor::{shape, Tensor};

/// Common interface of all distributions
pub trait Distribution {
    /// Shape of the parameter batch
    fn batch_shape(&self) -> &[usize];

    /// Shape of a single draw; scalar distributions have an empty event shape
    fn event_shape(&self) -> &[usize] {
        &[]
    }

    fn mean(&self) -> Tensor;

    fn variance(&self) -> Tensor;

    fn stddev(&self) -> Tensor {
        self.variance().pow(0.5)
    }

    /// Differential entropy
    fn entropy(&self) -> Tensor;

    /// Log-density evaluated at `value`
    fn log_prob(&self, value: &Tensor) -> Result<Tensor>;

    /// Density evaluated at `value`
    fn prob(&self, value: &Tensor) -> Result<Tensor> {
        Ok(self.log_prob(value)?.exp())
    }

    /// Cumulative distribution function
    fn cdf(&self, value: &Tensor) -> Result<Tensor>;

    /// Inverse cumulative distribution function
    fn icdf(&self, value: &Tensor) -> Result<Tensor>;

    /// Reparameterized draw of shape `sample_shape ++ batch_shape ++ event_shape`
    ///
    /// Gradients flow back to the distribution parameters.
    fn rsample(&self, sample_shape: &[usize]) -> Tensor;

    /// Draw detached from the computation graph
    fn sample(&self, sample_shape: &[usize]) -> Tensor {
        self.rsample(sample_shape).detach()
    }

    /// Output shape of a draw with the given sample shape
    fn extend_shape(&self, sample_shape: &[usize]) -> Vec<usize> {
        sample_shape
            .iter()
            .chain(self.batch_shape())
            .chain(self.event_shape())
            .copied()
            .collect()
    }
}

/// Distributions of the form `p(x) = h(x) exp(<θ, T(x)> - A(θ))`
///
/// Implementors supply the natural parameters `θ`, the log-normalizer `A`
/// and the expected carrier measure `E[ln h(x)]`; entropy and KL divergence
/// then follow from the gradient of `A`.
pub trait ExponentialFamily: Distribution {
    fn natural_parameters(&self) -> Vec<Tensor>;

    fn log_normalizer(&self, natural_parameters: &[Tensor]) -> Tensor;

    fn mean_carrier_measure(&self) -> f32;

    /// Entropy as `A(θ) - <θ, ∇A(θ)> - E[ln h(x)]`
    fn bregman_entropy(&self) -> Tensor {
        let params = detached_leaves(&self.natural_parameters());
        let log_norm = self.log_normalizer(&params);
        log_norm.backward();

        let mut entropy = log_norm.detach().add_scalar(-self.mean_carrier_measure());
        for param in &params {
            let term = param.detach().mul(&param.grad());
            entropy = entropy.sub(&sum_rightmost(&term, self.event_shape().len()));
        }
        entropy
    }

    /// KL divergence as the Bregman divergence of the log-normalizer
    fn bregman_kl(&self, other: &Self) -> Result<Tensor>
    where
        Self: Sized,
    {
        shape::broadcast_shapes(self.batch_shape(), other.batch_shape())?;

        let p_params = detached_leaves(&self.natural_parameters());
        let p_log_norm = self.log_normalizer(&p_params);
        p_log_norm.backward();

        let q_params: Vec<Tensor> = other.natural_parameters().iter().map(Tensor::detach).collect();
        let q_log_norm = other.log_normalizer(&q_params);

        let mut kl = q_log_norm.sub(&p_log_norm.detach());
        for (p_param, q_param) in p_params.iter().zip(&q_params) {
            let term = q_param.sub(&p_param.detach()).mul(&p_param.grad());
            kl = kl.sub(&sum_rightmost(&term, self.event_shape().len()));
        }
        Ok(kl)
    }
}

/// Closed-form KL divergence `KL(self || other)`
pub trait KlDivergence<Rhs = Self> {
    fn kl_divergence(&self, other: &Rhs) -> Result<Tensor>;
}

/// `KL(p || q)` for any registered pair of distributions
pub fn kl_divergence<P, Q>(p: &P, q: &Q) -> Result<Tensor>
where
    P: KlDivergence<Q>,
{
    p.kl_divergence(q)
}

/// Fresh gradient-tracking leaves holding the values of `params`
fn detached_leaves(params: &[Tensor]) -> Vec<Tensor> {
    params
        .iter()
        .map(|p| p.detach().requires_grad(true))
        .collect()
}

/// Sum over the trailing `n` dimensions
fn sum_rightmost(tensor: &Tensor, n: usize) -> Tensor {
    (0..n).fold(tensor.clone(), |acc, _| {
        let last = acc.ndim() - 1;
        acc.sum_axis(Some(last), false)
    })
}

/// Broadcast shape of a value against a batch shape
pub(crate) fn value_shape(batch_shape: &[usize], value: &Tensor) -> Result<Vec<usize>> {
    shape::broadcast_shapes(batch_shape, &value.shape)
}
