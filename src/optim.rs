//! Optimizer(s)

use crate::values::Value;

/// Common interface for optimizers
/// Analogous to the torch.optim.Optimizer interface
/// <https://pytorch.org/docs/stable/optim.html#base-class>
pub trait Optim {
    /// Performs a single optimization step with accumulated gradients
    fn step(&mut self);
    /// Zeros gradients for all parameters
    fn zero_grad(&mut self);
}

/// Plain gradient descent, `param -= lr * grad`
pub struct SGD {
    params: Vec<Value>,
    lr: f64,
}

impl SGD {
    pub fn new(params: Vec<Value>, lr: f64) -> Self {
        Self { params, lr }
    }

    pub fn lr(&self) -> f64 {
        self.lr
    }
}

impl Optim for SGD {
    fn step(&mut self) {
        for param in self.params.iter_mut() {
            let new_val = param.data() - self.lr * param.grad();
            param.set_data(new_val);
        }
    }

    fn zero_grad(&mut self) {
        for param in self.params.iter_mut() {
            param.zero_grad();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::assert_eq_float;

    use super::*;

    #[test]
    fn test_sgd_step() {
        let a = Value::new(1.0);
        let b = Value::new(2.0);
        let c = &a * &b;
        c.backward();

        let mut optim = SGD::new(vec![a.clone(), b.clone()], 0.1);
        optim.step();
        // gradients are left untouched by a step
        assert_eq!(a.grad(), 2.0);
        assert_eq!(b.grad(), 1.0);
        assert_eq_float!(a.data(), 0.8);
        assert_eq_float!(b.data(), 1.9);

        // without zeroing, the same gradients are applied again
        optim.step();
        assert_eq_float!(a.data(), 0.6);
        assert_eq_float!(b.data(), 1.8);
    }

    #[test]
    fn test_sgd_zero_grad() {
        let a = Value::new(1.0);
        let b = Value::new(2.0);
        let c = &a + &b;
        c.backward();

        let mut optim = SGD::new(vec![a.clone(), b.clone()], 0.1);
        optim.zero_grad();
        assert_eq!(a.grad(), 0.0);
        assert_eq!(b.grad(), 0.0);
        optim.step();
        assert_eq!(a.data(), 1.0);
        assert_eq!(b.data(), 2.0);
    }
}
