//! A minimal reverse mode automatic differentiation engine over scalar values,
//! with small neural network building blocks on top of it.

pub mod backprop_fns;
pub mod loss;
pub mod nn;
pub mod optim;
pub mod plot;
pub mod trace;
pub mod train;
pub mod values;
