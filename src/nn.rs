//! Components to build a neural network

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use thiserror::Error;

use crate::values::Value;

/// Errors for the neural network
#[derive(Debug, Error)]
pub enum NNError {
    #[error("Input size mismatch: expected {expected}, got {got}")]
    InputSizeMismatch { expected: usize, got: usize },
    #[error("Got {predictions} predictions for {targets} targets")]
    OutputSizeMismatch { predictions: usize, targets: usize },
    #[error("A multi layer perceptron needs at least one layer")]
    EmptyArchitecture,
}

/// Represents the torch.nn.Module. NNs should implement this trait.
/// <https://github.com/pytorch/pytorch/blob/v2.6.0/torch/nn/modules/module.py#L402>
pub trait Module {
    fn zero_grad(&mut self) {
        for p in self.parameters().iter_mut() {
            p.zero_grad();
        }
    }

    fn parameters(&self) -> Vec<Value>;
    fn forward(&self, inputs: &[Value]) -> Result<Vec<Value>, NNError>;
}

/// A single tanh neuron in a layer of a NN
pub struct Neuron {
    /// weights of the neuron
    pub weights: Vec<Value>,
    /// bias of the neuron
    pub bias: Value,
}

impl Neuron {
    /// Weights are drawn uniformly from [-1, 1), the bias starts at zero
    pub fn new<R: Rng>(n_inputs: usize, rng: &mut R) -> Self {
        let weights = (0..n_inputs)
            .map(|_| Value::new(rng.random_range(-1.0..1.0)))
            .collect();
        Self {
            weights,
            bias: Value::new(0.0),
        }
    }

    // Testing utility for a deterministic and simple neuron
    #[cfg(test)]
    fn new_ones(n_inputs: usize) -> Self {
        Self {
            weights: (0..n_inputs).map(|_| Value::new(1.0)).collect(),
            bias: Value::new(1.0),
        }
    }

    pub fn parameters(&self) -> Vec<Value> {
        self.weights
            .iter()
            .chain(std::iter::once(&self.bias))
            .cloned()
            .collect()
    }

    /// `tanh(w . x + b)`
    pub fn forward(&self, inputs: &[Value]) -> Result<Value, NNError> {
        if inputs.len() != self.weights.len() {
            return Err(NNError::InputSizeMismatch {
                expected: self.weights.len(),
                got: inputs.len(),
            });
        }
        let output = self
            .weights
            .iter()
            .zip(inputs.iter())
            .fold(self.bias.clone(), |acc, (w, i)| &acc + &(w * i));
        Ok(output.tanh())
    }
}

/// A layer of a neural network
pub struct Layer {
    neurons: Vec<Neuron>,
}

impl Layer {
    /// Creates a new layer with the given number of inputs and outputs
    pub fn new<R: Rng>(n_inputs: usize, n_outputs: usize, rng: &mut R) -> Self {
        let neurons = (0..n_outputs).map(|_| Neuron::new(n_inputs, rng)).collect();
        Self { neurons }
    }

    #[cfg(test)]
    fn new_ones(n_inputs: usize, n_outputs: usize) -> Self {
        let neurons = (0..n_outputs).map(|_| Neuron::new_ones(n_inputs)).collect();
        Self { neurons }
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Returns all the parameters in the layer
    pub fn parameters(&self) -> Vec<Value> {
        self.neurons.iter().flat_map(|n| n.parameters()).collect()
    }

    /// Computes forward pass for a layer
    pub fn forward(&self, inputs: &[Value]) -> Result<Vec<Value>, NNError> {
        self.neurons.iter().map(|n| n.forward(inputs)).collect()
    }
}

/// Multi layer perceptron, a stack of fully connected tanh layers
pub struct MLP {
    layers: Vec<Layer>,
}

impl MLP {
    /// `layer_sizes` are the number of outputs of each layer, the last being the
    /// number of outputs of the network
    pub fn new(n_inputs: usize, layer_sizes: &[usize]) -> Result<Self, NNError> {
        Self::with_rng(n_inputs, layer_sizes, &mut rand::rng())
    }

    /// Same as `new`, but reproducible
    pub fn from_seed(n_inputs: usize, layer_sizes: &[usize], seed: u64) -> Result<Self, NNError> {
        Self::with_rng(n_inputs, layer_sizes, &mut Pcg64Mcg::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng>(
        n_inputs: usize,
        layer_sizes: &[usize],
        rng: &mut R,
    ) -> Result<Self, NNError> {
        if layer_sizes.is_empty() {
            return Err(NNError::EmptyArchitecture);
        }
        let sizes = std::iter::once(n_inputs).chain(layer_sizes.iter().copied());
        let layers = sizes
            .clone()
            .zip(sizes.skip(1))
            .map(|(n_in, n_out)| Layer::new(n_in, n_out, rng))
            .collect::<Vec<_>>();
        log::debug!(
            "built MLP with {} inputs and layers {:?}",
            n_inputs,
            layer_sizes
        );
        Ok(Self { layers })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }
}

impl Module for MLP {
    fn forward(&self, inputs: &[Value]) -> Result<Vec<Value>, NNError> {
        let mut out = inputs.to_vec();
        for layer in self.layers.iter() {
            out = layer.forward(&out)?;
        }
        Ok(out)
    }

    fn parameters(&self) -> Vec<Value> {
        self.layers.iter().flat_map(|l| l.parameters()).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::assert_eq_float;

    use super::*;

    #[test]
    fn test_neuron_forward() {
        let neuron = Neuron::new_ones(2);
        let inputs = vec![Value::new(1.0), Value::new(-1.5)];
        let output = neuron.forward(&inputs).unwrap();
        // tanh(1 - 1.5 + 1)
        assert_eq_float!(output.data(), 0.5_f64.tanh());

        output.backward();
        let dtanh = 1.0 - output.data().powi(2);
        assert_eq_float!(neuron.weights[0].grad(), dtanh * 1.0);
        assert_eq_float!(neuron.weights[1].grad(), dtanh * -1.5);
        assert_eq_float!(neuron.bias.grad(), dtanh);
    }

    #[test]
    fn test_neuron_init() {
        let neuron = Neuron::new(100, &mut Pcg64Mcg::seed_from_u64(0));
        assert_eq!(neuron.bias.data(), 0.0);
        assert!(
            neuron
                .weights
                .iter()
                .all(|w| (-1.0..1.0).contains(&w.data()))
        );
        assert_eq!(neuron.parameters().len(), 101);
    }

    #[test]
    fn test_layer_forward() {
        let layer = Layer::new_ones(2, 3);
        let inputs = vec![Value::new(1.0), Value::new(2.0)];
        let outputs = layer.forward(&inputs).unwrap();
        assert_eq!(outputs.len(), 3);
        for output in outputs {
            assert_eq_float!(output.data(), 4.0_f64.tanh());
        }
        assert_eq!(layer.parameters().len(), 9);
    }

    #[test]
    fn test_dim_mismatch() {
        let layer = Layer::new_ones(2, 3);
        let inputs = vec![Value::new(1.0)];
        let outputs = layer.forward(&inputs).unwrap_err();
        assert!(matches!(
            outputs,
            NNError::InputSizeMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_mlp_shapes() {
        let mlp = MLP::from_seed(3, &[4, 4, 1], 7).unwrap();
        assert_eq!(mlp.layers().len(), 3);
        assert_eq!(mlp.layers()[0].neurons().len(), 4);
        assert_eq!(mlp.layers()[0].neurons()[0].weights.len(), 3);
        assert_eq!(mlp.layers()[1].neurons()[0].weights.len(), 4);
        assert_eq!(mlp.layers()[2].neurons().len(), 1);
        // (3 + 1) * 4 + (4 + 1) * 4 + (4 + 1) * 1
        assert_eq!(mlp.parameters().len(), 41);

        let out = mlp
            .forward(&[Value::new(2.0), Value::new(3.0), Value::new(-1.0)])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].data().abs() < 1.0);
    }

    #[test]
    fn test_mlp_seed_is_reproducible() {
        let a = MLP::from_seed(3, &[4, 1], 42).unwrap();
        let b = MLP::from_seed(3, &[4, 1], 42).unwrap();
        let a_params = a.parameters().iter().map(|p| p.data()).collect::<Vec<_>>();
        let b_params = b.parameters().iter().map(|p| p.data()).collect::<Vec<_>>();
        assert_eq!(a_params, b_params);
    }

    #[test]
    fn test_mlp_errors() {
        assert!(matches!(
            MLP::from_seed(3, &[], 0),
            Err(NNError::EmptyArchitecture)
        ));

        let mlp = MLP::from_seed(3, &[2], 0).unwrap();
        assert!(matches!(
            mlp.forward(&[Value::new(1.0)]),
            Err(NNError::InputSizeMismatch {
                expected: 3,
                got: 1
            })
        ));
    }

    #[test]
    fn test_module_zero_grad() {
        let mut mlp = MLP::from_seed(2, &[2, 1], 3).unwrap();
        let out = mlp.forward(&[Value::new(0.5), Value::new(-0.5)]).unwrap();
        out[0].backward();
        assert!(mlp.parameters().iter().any(|p| p.grad() != 0.0));

        mlp.zero_grad();
        assert!(mlp.parameters().iter().all(|p| p.grad() == 0.0));
    }
}
