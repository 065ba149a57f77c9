//! Training loop for fitting a network to a small fixed dataset

use crate::{
    loss::SSELoss,
    nn::{Module, NNError},
    optim::{Optim, SGD},
    values::Value,
};

/// Hyperparameters of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainConfig {
    pub lr: f64,
    pub generations: usize,
    /// outputs of each layer, the last is the size of the prediction
    pub layer_sizes: Vec<usize>,
    /// fixes the initial weights when set
    pub seed: Option<u64>,
    /// log the loss every this many generations (the last one is always logged)
    pub print_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lr: 0.05,
            generations: 100,
            layer_sizes: vec![4, 4, 1],
            seed: None,
            print_every: 10,
        }
    }
}

/// Four 3-dimensional inputs and their scalar targets
pub fn toy_dataset() -> (Vec<Vec<f64>>, Vec<f64>) {
    let xs = vec![
        vec![2.0, 3.0, -1.0],
        vec![3.0, -1.0, 0.5],
        vec![0.5, 1.0, 1.0],
        vec![1.0, 1.0, -1.0],
    ];
    let ys = vec![1.0, -1.0, -1.0, 1.0];
    (xs, ys)
}

/// Fits `model` to predict `ys[i]` from `xs[i]` with plain gradient descent.
///
/// Returns the loss of every generation, each measured before that generation's update.
pub fn train(
    model: &dyn Module,
    xs: &[Vec<f64>],
    ys: &[f64],
    config: &TrainConfig,
) -> Result<Vec<f64>, NNError> {
    if xs.len() != ys.len() {
        return Err(NNError::OutputSizeMismatch {
            predictions: xs.len(),
            targets: ys.len(),
        });
    }
    let inputs = xs
        .iter()
        .map(|x| x.iter().map(|v| Value::new(*v)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let targets = ys.iter().map(|y| Value::new(*y)).collect::<Vec<_>>();

    let mut optim = SGD::new(model.parameters(), config.lr);
    let mut history = Vec::with_capacity(config.generations);

    for generation in 0..config.generations {
        let mut y_pred = Vec::with_capacity(inputs.len());
        for x in inputs.iter() {
            let out = model.forward(x)?;
            if out.len() != 1 {
                return Err(NNError::OutputSizeMismatch {
                    predictions: out.len(),
                    targets: 1,
                });
            }
            y_pred.extend(out);
        }
        let loss = SSELoss::call(&y_pred, &targets);

        // the graph is rebuilt every generation, so only the parameters carry stale gradients
        optim.zero_grad();
        loss.backward();
        optim.step();

        history.push(loss.data());
        log::debug!("generation: {}, loss: {}", generation + 1, loss.data());
        if config.print_every > 0
            && (generation % config.print_every == 0 || generation == config.generations - 1)
        {
            log::info!("generation: {}, loss: {:.4}", generation + 1, loss.data());
        }
    }
    Ok(history)
}
