use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use rand::distributions::Uniform;
use rand::prelude::Distribution;
use tracing::instrument;

use super::shape;
use super::DType;
use crate::random;

/// Main tensor struct that holds data and gradient information
pub struct Tensor {
    pub data: Vec<f32>,
    pub shape: Vec<usize>,
    numel: usize,
    // Use RefCell for interior mutability of gradients
    pub grad: Rc<RefCell<Vec<f32>>>,
    pub requires_grad: bool,
    // Graph node for backward pass (only created when requires_grad is true)
    graph_node: Option<Rc<GraphNode>>,
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Tensor {
            data: self.data.clone(),
            shape: self.shape.clone(),
            numel: self.numel,
            grad: Rc::clone(&self.grad),
            requires_grad: self.requires_grad,
            graph_node: self.graph_node.clone(),
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape)
            .field("data", &self.data)
            .field("requires_grad", &self.requires_grad)
            .finish()
    }
}

/// Type alias for the backward function closure
/// Takes no arguments, returns nothing - it directly mutates gradients via captured references
type BackwardFn = Box<dyn Fn()>;

/// GraphNode represents a node in the computation graph
/// Separates graph structure from tensor data
pub struct GraphNode {
    // Name of the operation for tracing
    name: &'static str,
    backward_fn: BackwardFn,
    // Parent nodes in the computation graph (Rc since DAG has no cycles)
    prev: Vec<Rc<GraphNode>>,
}

impl Tensor {
    /// Create a new tensor from data and shape
    ///
    /// An empty shape describes a 0-d tensor holding a single value.
    #[instrument(skip(data), fields(shape = ?shape, numel = data.len()))]
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        let numel = shape.iter().product();
        if numel != data.len() {
            panic!(
                "Invalid shape: {:?} for data of length: {}",
                shape,
                data.len()
            )
        }

        Tensor {
            data,
            shape,
            numel,
            grad: Rc::new(RefCell::new(vec![0.0; numel])),
            requires_grad: false,
            graph_node: None,
        }
    }

    /// Create a 0-d tensor
    pub fn scalar(value: f32) -> Self {
        Tensor::new(vec![value], vec![])
    }

    pub fn numel(&self) -> usize {
        self.numel
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> DType {
        DType::Float32
    }

    /// The single value of a one-element tensor
    pub fn item(&self) -> f32 {
        assert_eq!(
            self.numel, 1,
            "item() requires a single-element tensor, got shape {:?}",
            self.shape
        );
        self.data[0]
    }

    /// Snapshot of the accumulated gradient as a tensor of the same shape
    pub fn grad(&self) -> Tensor {
        Tensor::new(self.grad.borrow().clone(), self.shape.clone())
    }

    /// Copy of this tensor cut off from the computation graph
    pub fn detach(&self) -> Tensor {
        Tensor::new(self.data.clone(), self.shape.clone())
    }

    /// Helper to attach gradient tracking to a result tensor
    /// Takes parent tensors and a backward closure, sets up the computation graph
    pub(crate) fn with_grad(
        mut result: Tensor,
        parents: Vec<&Tensor>,
        name: &'static str,
        backward_fn: BackwardFn,
    ) -> Tensor {
        result.requires_grad = true;

        // Collect parent graph nodes (use Rc since DAG has no cycles)
        let parent_nodes: Vec<Rc<GraphNode>> = parents
            .iter()
            .filter_map(|p| p.graph_node.as_ref().map(Rc::clone))
            .collect();

        let node = Rc::new(GraphNode {
            name,
            backward_fn,
            prev: parent_nodes,
        });

        result.graph_node = Some(node);
        result
    }

    /// Helper for element-wise unary operations with gradient tracking
    ///
    /// `grad_fn` receives (grad_output, input, output) and returns the input gradient.
    fn unary_op<F, G>(&self, op_name: &'static str, forward: F, grad_fn: G) -> Tensor
    where
        F: Fn(f32) -> f32,
        G: Fn(f32, f32, f32) -> f32 + 'static,
    {
        let data: Vec<f32> = self.data.iter().map(|&x| forward(x)).collect();
        let result = Tensor::new(data, self.shape.clone());

        if self.requires_grad {
            let self_grad = Rc::clone(&self.grad);
            let result_grad = Rc::clone(&result.grad);
            let input_data = self.data.clone();
            let output_data = result.data.clone();

            Self::with_grad(
                result,
                vec![self],
                op_name,
                Box::new(move || {
                    let _span = tracing::info_span!("UnaryBackward", op = op_name).entered();
                    let grad_output = result_grad.borrow();
                    let mut self_g = self_grad.borrow_mut();

                    for i in 0..grad_output.len() {
                        self_g[i] += grad_fn(grad_output[i], input_data[i], output_data[i]);
                    }
                }),
            )
        } else {
            result
        }
    }

    /// Helper for broadcasting binary operations with gradient tracking
    ///
    /// `grad_fn` receives (grad_output, lhs, rhs) and returns the pair of input
    /// gradients; contributions to broadcast inputs are summed.
    fn binary_op<F, G>(&self, other: &Tensor, op_name: &'static str, forward: F, grad_fn: G) -> Tensor
    where
        F: Fn(f32, f32) -> f32,
        G: Fn(f32, f32, f32) -> (f32, f32) + 'static,
    {
        let out_shape = match shape::broadcast_shapes(&self.shape, &other.shape) {
            Ok(s) => s,
            Err(err) => panic!("Shape mismatch: {err}"),
        };
        let lhs_map = shape::broadcast_index_map(&self.shape, &out_shape);
        let rhs_map = shape::broadcast_index_map(&other.shape, &out_shape);

        let data: Vec<f32> = lhs_map
            .iter()
            .zip(&rhs_map)
            .map(|(&l, &r)| forward(self.data[l], other.data[r]))
            .collect();
        let result = Tensor::new(data, out_shape);

        if self.requires_grad || other.requires_grad {
            let self_grad = Rc::clone(&self.grad);
            let other_grad = Rc::clone(&other.grad);
            let result_grad = Rc::clone(&result.grad);
            let self_data = self.data.clone();
            let other_data = other.data.clone();

            // Check if self and other share the same gradient (e.g., x.add(&x))
            let same_tensor = Rc::ptr_eq(&self_grad, &other_grad);

            Self::with_grad(
                result,
                vec![self, other],
                op_name,
                Box::new(move || {
                    let _span = tracing::info_span!("BinaryBackward", op = op_name).entered();
                    let grad_output = result_grad.borrow();

                    if same_tensor {
                        let mut grad = self_grad.borrow_mut();
                        for i in 0..grad_output.len() {
                            let (l, r) = (lhs_map[i], rhs_map[i]);
                            let (gl, gr) = grad_fn(grad_output[i], self_data[l], other_data[r]);
                            grad[l] += gl;
                            grad[r] += gr;
                        }
                    } else {
                        let mut self_g = self_grad.borrow_mut();
                        let mut other_g = other_grad.borrow_mut();
                        for i in 0..grad_output.len() {
                            let (l, r) = (lhs_map[i], rhs_map[i]);
                            let (gl, gr) = grad_fn(grad_output[i], self_data[l], other_data[r]);
                            self_g[l] += gl;
                            other_g[r] += gr;
                        }
                    }
                }),
            )
        } else {
            result
        }
    }

    /// Create a tensor filled with zeros
    #[instrument(fields(shape = ?shape, numel = shape.iter().product::<usize>()))]
    pub fn zeros(shape: Vec<usize>) -> Self {
        Tensor::full(shape, 0.0)
    }

    /// Create a tensor filled with ones
    #[instrument(fields(shape = ?shape, numel = shape.iter().product::<usize>()))]
    pub fn ones(shape: Vec<usize>) -> Self {
        Tensor::full(shape, 1.0)
    }

    /// Create a tensor filled with `value`
    pub fn full(shape: Vec<usize>, value: f32) -> Self {
        let numel = shape.iter().product();
        Tensor::new(vec![value; numel], shape)
    }

    /// Create a tensor with values drawn uniformly from `[low, high)`
    ///
    /// Draws from the crate's seeded generator (see [`crate::random::seed`]).
    #[instrument(fields(shape = ?shape, numel = shape.iter().product::<usize>()))]
    pub fn rand_uniform(shape: Vec<usize>, low: f32, high: f32) -> Self {
        let numel = shape.iter().product::<usize>();
        let uniform = Uniform::new(low, high);
        let data: Vec<f32> = random::with_rng(|rng| (0..numel).map(|_| uniform.sample(&mut *rng)).collect());

        Tensor::new(data, shape)
    }

    /// Builder method to enable gradient tracking
    #[instrument(skip(self), fields(shape = ?self.shape, req = req))]
    pub fn requires_grad(mut self, req: bool) -> Self {
        self.requires_grad = req;
        self
    }

    /// Zero out all gradients
    #[instrument(skip(self), fields(shape = ?self.shape, numel = self.numel))]
    pub fn zero_grad(&mut self) {
        for g in self.grad.borrow_mut().iter_mut() {
            *g = 0.0;
        }
    }

    /// Reshape tensor to new shape
    #[instrument(skip(self, new_shape), fields(old_shape = ?self.shape, new_shape = ?new_shape))]
    pub fn reshape(&self, new_shape: Vec<usize>) -> Self {
        let numel = new_shape.iter().product::<usize>();
        assert!(
            numel == self.numel,
            "Reshape error: total number of elements must remain the same."
        );

        let result = Tensor::new(self.data.clone(), new_shape);

        if self.requires_grad {
            let self_grad = Rc::clone(&self.grad);
            let result_grad = Rc::clone(&result.grad);

            Self::with_grad(
                result,
                vec![self],
                "reshape_backward",
                Box::new(move || {
                    let _span = tracing::info_span!("ReshapeBackward").entered();
                    let grad_output = result_grad.borrow();
                    let mut self_g = self_grad.borrow_mut();

                    // Same memory layout, gradient copies straight through
                    for i in 0..grad_output.len() {
                        self_g[i] += grad_output[i];
                    }
                }),
            )
        } else {
            result
        }
    }

    /// Remove size-1 dimensions (all of them, or only `axis`)
    pub fn squeeze(&self, axis: Option<usize>) -> Tensor {
        self.reshape(shape::squeeze_shape(&self.shape, axis))
    }

    /// Insert a size-1 dimension at `axis`
    pub fn unsqueeze(&self, axis: usize) -> Tensor {
        assert!(
            axis <= self.shape.len(),
            "Axis {} out of bounds for unsqueeze of {} dimensions",
            axis,
            self.shape.len()
        );
        let mut new_shape = self.shape.clone();
        new_shape.insert(axis, 1);
        self.reshape(new_shape)
    }

    /// Materialize this tensor broadcast to `target`
    #[instrument(skip(self, target), fields(shape = ?self.shape, target = ?target))]
    pub fn broadcast_to(&self, target: &[usize]) -> Tensor {
        match shape::broadcast_shapes(&self.shape, target) {
            Ok(s) if s == target => {}
            _ => panic!(
                "Cannot broadcast shape {:?} to {:?}",
                self.shape, target
            ),
        }

        let index_map = shape::broadcast_index_map(&self.shape, target);
        let data = index_map.iter().map(|&i| self.data[i]).collect();
        let result = Tensor::new(data, target.to_vec());

        if self.requires_grad {
            let self_grad = Rc::clone(&self.grad);
            let result_grad = Rc::clone(&result.grad);

            Self::with_grad(
                result,
                vec![self],
                "broadcast_to_backward",
                Box::new(move || {
                    let _span = tracing::info_span!("BroadcastBackward").entered();
                    let grad_output = result_grad.borrow();
                    let mut self_g = self_grad.borrow_mut();

                    // Sum over the broadcast positions
                    for (i, &src) in index_map.iter().enumerate() {
                        self_g[src] += grad_output[i];
                    }
                }),
            )
        } else {
            result
        }
    }

    /// Element-wise addition (broadcasting)
    #[instrument(skip(self, other), fields(shape_a = ?self.shape, shape_b = ?other.shape))]
    pub fn add(&self, other: &Tensor) -> Tensor {
        self.binary_op(other, "add_backward", |a, b| a + b, |g, _, _| (g, g))
    }

    /// Element-wise subtraction (broadcasting)
    #[instrument(skip(self, other), fields(shape_a = ?self.shape, shape_b = ?other.shape))]
    pub fn sub(&self, other: &Tensor) -> Tensor {
        self.binary_op(other, "sub_backward", |a, b| a - b, |g, _, _| (g, -g))
    }

    /// Element-wise multiplication (broadcasting)
    #[instrument(skip(self, other), fields(shape_a = ?self.shape, shape_b = ?other.shape))]
    pub fn mul(&self, other: &Tensor) -> Tensor {
        // d/dx(x*y) = y, d/dy(x*y) = x
        self.binary_op(other, "mul_backward", |a, b| a * b, |g, a, b| (g * b, g * a))
    }

    /// Element-wise division (broadcasting)
    #[instrument(skip(self, other), fields(shape_a = ?self.shape, shape_b = ?other.shape))]
    pub fn div(&self, other: &Tensor) -> Tensor {
        self.binary_op(
            other,
            "div_backward",
            |a, b| a / b,
            |g, a, b| (g / b, -g * a / (b * b)),
        )
    }

    /// Scalar multiplication
    pub fn mul_scalar(&self, scalar: f32) -> Tensor {
        self.unary_op("mul_scalar_backward", |x| x * scalar, move |g, _, _| g * scalar)
    }

    /// Scalar addition
    pub fn add_scalar(&self, scalar: f32) -> Tensor {
        self.unary_op("add_scalar_backward", |x| x + scalar, |g, _, _| g)
    }

    /// Element-wise power
    ///
    /// Gradient: d/dx(x^n) = n * x^(n-1)
    #[instrument(skip(self), fields(shape = ?self.shape, exponent = exponent))]
    pub fn pow(&self, exponent: f32) -> Tensor {
        self.unary_op(
            "pow_backward",
            |x| x.powf(exponent),
            move |g, x, _| g * exponent * x.powf(exponent - 1.0),
        )
    }

    /// Element-wise negation
    pub fn neg(&self) -> Tensor {
        self.unary_op("neg_backward", |x| -x, |g, _, _| -g)
    }

    /// Element-wise exponential
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn exp(&self) -> Tensor {
        self.unary_op("exp_backward", f32::exp, |g, _, y| g * y)
    }

    /// Element-wise natural logarithm
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn ln(&self) -> Tensor {
        self.unary_op("ln_backward", f32::ln, |g, x, _| g / x)
    }

    /// Element-wise `exp(x) - 1`, accurate near zero
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn exp_m1(&self) -> Tensor {
        self.unary_op("exp_m1_backward", f32::exp_m1, |g, _, y| g * (y + 1.0))
    }

    /// Element-wise `ln(1 + x)`, accurate near zero
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn ln_1p(&self) -> Tensor {
        self.unary_op("ln_1p_backward", f32::ln_1p, |g, x, _| g / (1.0 + x))
    }

    /// Element-wise reciprocal 1/x
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn reciprocal(&self) -> Tensor {
        self.unary_op("reciprocal_backward", |x| 1.0 / x, |g, _, y| -g * y * y)
    }

    /// Replace the elements where `mask` is true with `value`
    ///
    /// Filled positions receive no gradient.
    #[instrument(skip(self, mask), fields(shape = ?self.shape, value = value))]
    pub fn masked_fill(&self, mask: &[bool], value: f32) -> Tensor {
        assert_eq!(
            mask.len(),
            self.numel,
            "Mask length {} does not match tensor of {} elements",
            mask.len(),
            self.numel
        );

        let data = self
            .data
            .iter()
            .zip(mask)
            .map(|(&x, &m)| if m { value } else { x })
            .collect();
        let result = Tensor::new(data, self.shape.clone());

        if self.requires_grad {
            let self_grad = Rc::clone(&self.grad);
            let result_grad = Rc::clone(&result.grad);
            let mask = mask.to_vec();

            Self::with_grad(
                result,
                vec![self],
                "masked_fill_backward",
                Box::new(move || {
                    let _span = tracing::info_span!("MaskedFillBackward").entered();
                    let grad_output = result_grad.borrow();
                    let mut self_g = self_grad.borrow_mut();

                    for i in 0..grad_output.len() {
                        if !mask[i] {
                            self_g[i] += grad_output[i];
                        }
                    }
                }),
            )
        } else {
            result
        }
    }

    /// Sum all elements into a 0-d tensor
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn sum(&self) -> Tensor {
        self.sum_axis(None, false)
    }

    /// Sum along a specific axis
    ///
    /// # Arguments
    /// * `axis` - The axis to sum along (None means sum all elements)
    /// * `keepdims` - If true, keep the reduced dimension as size 1
    #[instrument(skip(self), fields(shape = ?self.shape, axis = ?axis, keepdims = keepdims))]
    pub fn sum_axis(&self, axis: Option<usize>, keepdims: bool) -> Tensor {
        match axis {
            None => {
                let data = self.data.iter().sum();
                let result = Tensor::new(vec![data], vec![]);

                if self.requires_grad {
                    let self_grad = Rc::clone(&self.grad);
                    let result_grad = Rc::clone(&result.grad);

                    Self::with_grad(
                        result,
                        vec![self],
                        "sum_backward",
                        Box::new(move || {
                            let _span = tracing::info_span!("SumBackward").entered();
                            let grad_output = result_grad.borrow();
                            let mut self_g = self_grad.borrow_mut();

                            for g in self_g.iter_mut() {
                                *g += grad_output[0];
                            }
                        }),
                    )
                } else {
                    result
                }
            }
            Some(ax) => {
                assert!(
                    ax < self.shape.len(),
                    "Axis {} out of bounds for tensor with {} dimensions",
                    ax,
                    self.shape.len()
                );

                let mut out_shape = Vec::new();
                for (i, &dim) in self.shape.iter().enumerate() {
                    if i == ax {
                        if keepdims {
                            out_shape.push(1);
                        }
                    } else {
                        out_shape.push(dim);
                    }
                }

                let out_numel = out_shape.iter().product();
                let mut data = vec![0.0; out_numel];

                let axis_size = self.shape[ax];
                let outer_size: usize = self.shape[..ax].iter().product();
                let inner_size: usize = self.shape[ax + 1..].iter().product();

                for outer in 0..outer_size {
                    for inner in 0..inner_size {
                        let mut sum = 0.0;
                        for axis_idx in 0..axis_size {
                            let idx =
                                outer * axis_size * inner_size + axis_idx * inner_size + inner;
                            sum += self.data[idx];
                        }
                        data[outer * inner_size + inner] = sum;
                    }
                }

                let result = Tensor::new(data, out_shape);

                if self.requires_grad {
                    let self_grad = Rc::clone(&self.grad);
                    let result_grad = Rc::clone(&result.grad);

                    Self::with_grad(
                        result,
                        vec![self],
                        "sum_axis_backward",
                        Box::new(move || {
                            let _span = tracing::info_span!("SumAxisBackward").entered();
                            let grad_output = result_grad.borrow();
                            let mut self_g = self_grad.borrow_mut();

                            for outer in 0..outer_size {
                                for inner in 0..inner_size {
                                    let grad_val = grad_output[outer * inner_size + inner];
                                    for axis_idx in 0..axis_size {
                                        let idx = outer * axis_size * inner_size
                                            + axis_idx * inner_size
                                            + inner;
                                        self_g[idx] += grad_val;
                                    }
                                }
                            }
                        }),
                    )
                } else {
                    result
                }
            }
        }
    }

    /// Mean of all elements into a 0-d tensor
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn mean(&self) -> Tensor {
        self.mean_axis(None, false)
    }

    /// Mean along a specific axis
    ///
    /// # Arguments
    /// * `axis` - The axis to take mean along (None means mean of all elements)
    /// * `keepdims` - If true, keep the reduced dimension as size 1
    #[instrument(skip(self), fields(shape = ?self.shape, axis = ?axis, keepdims = keepdims))]
    pub fn mean_axis(&self, axis: Option<usize>, keepdims: bool) -> Tensor {
        let count = match axis {
            None => self.numel as f32,
            Some(ax) => {
                assert!(
                    ax < self.shape.len(),
                    "Axis {} out of bounds for tensor with {} dimensions",
                    ax,
                    self.shape.len()
                );
                self.shape[ax] as f32
            }
        };

        self.sum_axis(axis, keepdims).mul_scalar(1.0 / count)
    }

    /// Population variance along `axis` (divides by N)
    #[instrument(skip(self), fields(shape = ?self.shape, axis = axis, keepdims = keepdims))]
    pub fn var_axis(&self, axis: usize, keepdims: bool) -> Tensor {
        let mean = self.mean_axis(Some(axis), true);
        let centered = self.sub(&mean);
        centered.pow(2.0).mean_axis(Some(axis), keepdims)
    }

    /// Backward pass - propagate gradients
    ///
    /// The root gradient is seeded with ones, so for non-scalar outputs this
    /// differentiates the sum of all elements.
    #[instrument(skip(self), fields(shape = ?self.shape))]
    pub fn backward(&self) {
        {
            let mut grad = self.grad.borrow_mut();
            for g in grad.iter_mut() {
                *g = 1.0;
            }
        }

        let root = match &self.graph_node {
            Some(node) => Rc::clone(node),
            None => return, // No graph node means no gradients to compute
        };

        // Build topological sort using DFS on GraphNodes
        let mut topo: Vec<Rc<GraphNode>> = Vec::new();
        let mut visited = HashSet::new();

        fn build_topo(
            v: &Rc<GraphNode>,
            visited: &mut HashSet<*const GraphNode>,
            topo: &mut Vec<Rc<GraphNode>>,
        ) {
            let ptr = Rc::as_ptr(v);
            if !visited.contains(&ptr) {
                visited.insert(ptr);
                for child in &v.prev {
                    build_topo(child, visited, topo);
                }
                topo.push(Rc::clone(v));
            }
        }

        build_topo(&root, &mut visited, &mut topo);

        // Call backward functions in reverse topological order
        for node in topo.iter().rev() {
            tracing::trace!(op = node.name, "backward");
            (node.backward_fn)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f32], expected: &[f32], eps: f32) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < eps, "{actual:?} != {expected:?}");
        }
    }

    // ========================================================================
    // Tensor Creation Tests
    // ========================================================================

    #[test]
    fn test_tensor_new() {
        let t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![2, 2]);
        assert_eq!(t.data.len(), 4);
        assert_eq!(t.shape, vec![2, 2]);
        assert_eq!(t.dtype(), DType::Float32);
    }

    #[test]
    fn test_tensor_scalar() {
        let t = Tensor::scalar(3.5);
        assert!(t.shape.is_empty());
        assert_eq!(t.numel(), 1);
        assert_eq!(t.item(), 3.5);
    }

    #[test]
    fn test_tensor_zeros_ones_full() {
        assert_eq!(Tensor::zeros(vec![2, 2]).data, vec![0.0; 4]);
        assert_eq!(Tensor::ones(vec![3]).data, vec![1.0; 3]);
        assert_eq!(Tensor::full(vec![2], 7.0).data, vec![7.0, 7.0]);
    }

    #[test]
    fn test_tensor_rand_uniform() {
        random::seed(0);
        let t = Tensor::rand_uniform(vec![16, 16], 5.0, 17.0);
        assert_eq!(t.numel(), 256);
        assert!(t.data.iter().all(|x| (5.0..17.0).contains(x)));
    }

    #[test]
    fn test_rand_uniform_reproducible() {
        random::seed(42);
        let a = Tensor::rand_uniform(vec![8], 0.0, 1.0);
        random::seed(42);
        let b = Tensor::rand_uniform(vec![8], 0.0, 1.0);
        assert_eq!(a.data, b.data);
    }

    #[test]
    #[should_panic(expected = "Invalid shape")]
    fn test_invalid_tensor_creation() {
        let _t = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![3, 2]);
    }

    // ========================================================================
    // Basic Autograd Tests
    // ========================================================================

    #[test]
    fn test_simple_backward() {
        let x = Tensor::new(vec![2.0], vec![1]).requires_grad(true);
        let y = Tensor::new(vec![3.0], vec![1]).requires_grad(true);
        let z = x.add(&y);
        assert_eq!(*x.grad.borrow(), vec![0.0]);
        z.backward();
        assert_eq!(*x.grad.borrow(), vec![1.0]);
        assert_eq!(*y.grad.borrow(), vec![1.0]);
    }

    #[test]
    fn test_gradient_accumulation() {
        let x = Tensor::new(vec![2.0], vec![1]).requires_grad(true);
        let y = Tensor::new(vec![3.0], vec![1]).requires_grad(true);
        let temp = x.add(&y);
        let z = temp.add(&x);
        z.backward();
        assert_eq!(*x.grad.borrow(), vec![2.0]); // x appears twice
        assert_eq!(*y.grad.borrow(), vec![1.0]);
    }

    #[test]
    fn test_zero_grad() {
        let mut x = Tensor::new(vec![1.0], vec![1]).requires_grad(true);
        let y = x.add(&x);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![2.0]);
        x.zero_grad();
        assert_eq!(*x.grad.borrow(), vec![0.0]);
    }

    #[test]
    fn test_self_mul_backward() {
        // d/dx(x*x) = 2x
        let x = Tensor::new(vec![3.0, -2.0], vec![2]).requires_grad(true);
        let y = x.mul(&x);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![6.0, -4.0]);
    }

    #[test]
    fn test_detach_stops_gradient() {
        let x = Tensor::new(vec![1.0, 2.0], vec![2]).requires_grad(true);
        let d = x.mul_scalar(3.0).detach();
        assert!(!d.requires_grad);
        assert_eq!(d.data, vec![3.0, 6.0]);
        d.backward();
        assert_eq!(*x.grad.borrow(), vec![0.0, 0.0]);
    }

    // ========================================================================
    // Broadcasting Tests
    // ========================================================================

    #[test]
    fn test_broadcast_add_row() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let bias = Tensor::new(vec![10.0, 20.0, 30.0], vec![3]);
        let z = x.add(&bias);
        assert_eq!(z.shape, vec![2, 3]);
        assert_eq!(z.data, vec![11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);
    }

    #[test]
    fn test_broadcast_mul_backward_sums() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).requires_grad(true);
        let w = Tensor::new(vec![2.0, 3.0, 4.0], vec![1, 3]).requires_grad(true);
        let z = x.mul(&w);
        z.backward();
        assert_eq!(*x.grad.borrow(), vec![2.0, 3.0, 4.0, 2.0, 3.0, 4.0]);
        // column sums of x
        assert_eq!(*w.grad.borrow(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn test_broadcast_scalar_tensor() {
        let x = Tensor::new(vec![1.0, 2.0], vec![2]).requires_grad(true);
        let s = Tensor::scalar(4.0).requires_grad(true);
        let z = x.div(&s);
        assert_eq!(z.data, vec![0.25, 0.5]);
        z.backward();
        assert_eq!(*x.grad.borrow(), vec![0.25, 0.25]);
        // -(1 + 2) / 16
        assert_close(&s.grad.borrow(), &[-0.1875], 1e-7);
    }

    #[test]
    #[should_panic(expected = "Shape mismatch")]
    fn test_broadcast_incompatible_panics() {
        let a = Tensor::ones(vec![2, 3]);
        let b = Tensor::ones(vec![3, 2]);
        let _ = a.add(&b);
    }

    #[test]
    fn test_broadcast_to_backward() {
        let x = Tensor::new(vec![1.0, 2.0], vec![2]).requires_grad(true);
        let y = x.broadcast_to(&[3, 2]);
        assert_eq!(y.data, vec![1.0, 2.0, 1.0, 2.0, 1.0, 2.0]);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![3.0, 3.0]);
    }

    #[test]
    #[should_panic(expected = "Cannot broadcast")]
    fn test_broadcast_to_shrinking_panics() {
        let x = Tensor::ones(vec![2, 3]);
        let _ = x.broadcast_to(&[3]);
    }

    // ========================================================================
    // Unary Operation Tests
    // ========================================================================

    #[test]
    fn test_exp_ln_backward() {
        let x = Tensor::new(vec![1.0, 2.0], vec![2]).requires_grad(true);
        let y = x.ln();
        assert_close(&y.data, &[0.0, std::f32::consts::LN_2], 1e-6);
        y.backward();
        assert_close(&x.grad.borrow(), &[1.0, 0.5], 1e-6);

        let a = Tensor::new(vec![0.0, 1.0], vec![2]).requires_grad(true);
        let b = a.exp();
        b.backward();
        assert_close(&a.grad.borrow(), &[1.0, std::f32::consts::E], 1e-6);
    }

    #[test]
    fn test_exp_m1_ln_1p_small_values() {
        let x = Tensor::new(vec![1e-8, -1e-8], vec![2]).requires_grad(true);
        let y = x.exp_m1();
        for (v, e) in y.data.iter().zip([1e-8f32, -1e-8]) {
            assert!(((v - e) / e).abs() < 1e-6, "{v} != {e}");
        }
        y.backward();
        assert_close(&x.grad.borrow(), &[1.0, 1.0], 1e-6);

        let a = Tensor::new(vec![1e-8, 1.0], vec![2]).requires_grad(true);
        let b = a.ln_1p();
        assert!((b.data[0] - 1e-8).abs() < 1e-14);
        assert_close(&b.data[1..], &[std::f32::consts::LN_2], 1e-6);
        b.backward();
        assert_close(&a.grad.borrow(), &[1.0, 0.5], 1e-6);
    }

    #[test]
    fn test_reciprocal_neg_backward() {
        let x = Tensor::new(vec![2.0, 4.0], vec![2]).requires_grad(true);
        let y = x.reciprocal().neg();
        assert_eq!(y.data, vec![-0.5, -0.25]);
        y.backward();
        // d/dx(-1/x) = 1/x^2
        assert_close(&x.grad.borrow(), &[0.25, 0.0625], 1e-7);
    }

    #[test]
    fn test_pow_backward() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]).requires_grad(true);
        let y = x.pow(2.0);
        assert_eq!(y.data, vec![1.0, 4.0, 9.0]);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_masked_fill() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0], vec![3]).requires_grad(true);
        let y = x.mul_scalar(2.0).masked_fill(&[false, true, false], f32::NEG_INFINITY);
        assert_eq!(y.data, vec![2.0, f32::NEG_INFINITY, 6.0]);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![2.0, 0.0, 2.0]);
    }

    // ========================================================================
    // Shape Manipulation Tests
    // ========================================================================

    #[test]
    fn test_reshape_backward() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).requires_grad(true);
        let y = x.reshape(vec![3, 2]);
        assert_eq!(y.shape, vec![3, 2]);
        let z = y.mul_scalar(2.0);
        z.backward();
        assert_eq!(*x.grad.borrow(), vec![2.0; 6]);
    }

    #[test]
    fn test_squeeze_unsqueeze() {
        let x = Tensor::ones(vec![1, 2, 1, 3]);
        assert_eq!(x.squeeze(None).shape, vec![2, 3]);
        assert_eq!(x.squeeze(Some(0)).shape, vec![2, 1, 3]);
        assert_eq!(x.squeeze(None).unsqueeze(0).shape, vec![1, 2, 3]);
        assert!(Tensor::ones(vec![1]).squeeze(None).shape.is_empty());
    }

    // ========================================================================
    // Reduction Operation Tests
    // ========================================================================

    #[test]
    fn test_sum_all() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![4]).requires_grad(true);
        let s = x.sum();
        assert_eq!(s.data, vec![10.0]);
        assert!(s.shape.is_empty());
        s.backward();
        assert_eq!(*x.grad.borrow(), vec![1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_sum_axis_0() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).requires_grad(true);
        let y = x.sum_axis(Some(0), false);
        assert_eq!(y.shape, vec![3]);
        assert_eq!(y.data, vec![5.0, 7.0, 9.0]);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![1.0; 6]);
    }

    #[test]
    fn test_sum_axis_keepdims() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
        let y = x.sum_axis(Some(1), true);
        assert_eq!(y.shape, vec![2, 1]);
        assert_eq!(y.data, vec![6.0, 15.0]);
    }

    #[test]
    fn test_sum_3d() {
        let x = Tensor::new((1..=12).map(|v| v as f32).collect(), vec![2, 2, 3]).requires_grad(true);
        let y = x.sum_axis(Some(2), false);
        assert_eq!(y.shape, vec![2, 2]);
        assert_eq!(y.data, vec![6.0, 15.0, 24.0, 33.0]);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![1.0; 12]);
    }

    #[test]
    fn test_mean_all() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0], vec![4]).requires_grad(true);
        let m = x.mean();
        assert_eq!(m.data, vec![2.5]);
        m.backward();
        assert_eq!(*x.grad.borrow(), vec![0.25, 0.25, 0.25, 0.25]);
    }

    #[test]
    fn test_mean_axis_0() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).requires_grad(true);
        let y = x.mean_axis(Some(0), false);
        assert_eq!(y.shape, vec![3]);
        assert_eq!(y.data, vec![2.5, 3.5, 4.5]);
        y.backward();
        assert_eq!(*x.grad.borrow(), vec![0.5; 6]);
    }

    #[test]
    fn test_var_axis() {
        let x = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![3, 2]);
        let v = x.var_axis(0, false);
        assert_eq!(v.shape, vec![2]);
        // population variance of [1, 3, 5] and [2, 4, 6]
        assert_close(&v.data, &[8.0 / 3.0, 8.0 / 3.0], 1e-5);
        assert_eq!(x.var_axis(1, true).shape, vec![3, 1]);
    }
}

// ============================================================================
// Operator Overloads
// ============================================================================

use std::ops::{Add, BitXor, Div, Mul, Neg, Sub};

/// Allows: &tensor1 + &tensor2
impl Add for &Tensor {
    type Output = Tensor;

    fn add(self, rhs: Self) -> Self::Output {
        self.add(rhs)
    }
}

/// Allows: &tensor1 - &tensor2
impl Sub for &Tensor {
    type Output = Tensor;

    fn sub(self, rhs: Self) -> Self::Output {
        self.sub(rhs)
    }
}

/// Allows: &tensor1 * &tensor2 (element-wise)
impl Mul for &Tensor {
    type Output = Tensor;

    fn mul(self, rhs: Self) -> Self::Output {
        self.mul(rhs)
    }
}

/// Allows: &tensor1 / &tensor2 (element-wise)
impl Div for &Tensor {
    type Output = Tensor;

    fn div(self, rhs: Self) -> Self::Output {
        self.div(rhs)
    }
}

/// Allows: &tensor * scalar
impl Mul<f32> for &Tensor {
    type Output = Tensor;

    fn mul(self, scalar: f32) -> Self::Output {
        self.mul_scalar(scalar)
    }
}

/// Allows: scalar * &tensor
impl Mul<&Tensor> for f32 {
    type Output = Tensor;

    fn mul(self, tensor: &Tensor) -> Self::Output {
        tensor.mul_scalar(self)
    }
}

/// Allows: -&tensor
impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Self::Output {
        Tensor::neg(self)
    }
}

/// Allows: &tensor ^ 2.0
impl BitXor<f32> for &Tensor {
    type Output = Tensor;

    fn bitxor(self, exponent: f32) -> Self::Output {
        self.pow(exponent)
    }
}
