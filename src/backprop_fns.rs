//! Incremental gradient update functions for backprop
//!
//! Applied depending on the operation which created outputs from inputs. Corresponds to
//! a node in the computation graph.

use std::fmt::{self, Display};

use crate::values::Value;

/// Represents the function in the computation graph
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackpropFunc {
    Add,
    Mul,
    /// Raise to a constant exponent
    Pow(f64),
    Tanh,
}

impl BackpropFunc {
    pub fn n_operands(&self) -> usize {
        match self {
            BackpropFunc::Add => 2,
            BackpropFunc::Mul => 2,
            BackpropFunc::Pow(_) => 1,
            BackpropFunc::Tanh => 1,
        }
    }

    /// Short symbol used when labelling operator nodes of a graph
    pub fn symbol(&self) -> String {
        match self {
            BackpropFunc::Add => "+".to_string(),
            BackpropFunc::Mul => "*".to_string(),
            BackpropFunc::Pow(n) => format!("**{}", n),
            BackpropFunc::Tanh => "tanh".to_string(),
        }
    }
}

impl Display for BackpropFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Takes two values and updates their gradients
/// Represents backprop for the operation `in1 + in2 = out`
pub fn add(in1: &Value, in2: &Value, out: &Value) {
    let grad = out.grad();
    in1.0.borrow_mut().grad += grad;
    in2.0.borrow_mut().grad += grad;
}

/// Represents backprop for the operation `in1 * in2 = out`
pub fn mul(in1: &Value, in2: &Value, out: &Value) {
    let grad = out.grad();
    let in1_data = in1.data();
    let in2_data = in2.data();
    // `in1` and `in2` may be the same node (e.g. `a * a`), so borrow one at a time
    in1.0.borrow_mut().grad += in2_data * grad;
    in2.0.borrow_mut().grad += in1_data * grad;
}

/// Represents backprop for the operation `in1^n = out`, the exponent is a constant
/// so no gradient flows into it
pub fn pow(in1: &Value, n: f64, out: &Value) {
    let grad = out.grad();
    let in1_data = in1.data();
    in1.0.borrow_mut().grad += n * in1_data.powf(n - 1.0) * grad;
}

/// Represents backprop for the operation `tanh(in) = out`
pub fn tanh(in1: &Value, out: &Value) {
    let grad = out.grad();
    let out_data = out.data(); // tanh(in)
    in1.0.borrow_mut().grad += (1.0 - out_data * out_data) * grad;
}

/// Applies a backprop function for operators with two operands
pub fn update_gradients_two_operands(in1: &Value, in2: &Value, out: &Value) {
    let backprop_fn = { out.0.borrow().backprop_fn };
    match backprop_fn {
        Some(BackpropFunc::Add) => add(in1, in2, out),
        Some(BackpropFunc::Mul) => mul(in1, in2, out),
        None => {}
        _ => panic!("Invalid backprop function: {:?}", backprop_fn),
    }
}

/// Applies a backprop function for operators with one operand
pub fn update_gradients_one_operand(in1: &Value, out: &Value) {
    let backprop_fn = { out.0.borrow().backprop_fn };
    match backprop_fn {
        Some(BackpropFunc::Pow(n)) => pow(in1, n, out),
        Some(BackpropFunc::Tanh) => tanh(in1, out),
        None => {}
        _ => panic!("Invalid backprop function: {:?}", backprop_fn),
    }
}
