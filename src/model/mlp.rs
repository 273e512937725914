//! Score regression network
//!
//! Architecture: Input(14) → [Linear → ReLU → Dropout] × n → Linear(1)

use burn::module::Module;
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::Tensor;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::features::FeatureVector;

static BACKEND_RNG: Mutex<()> = Mutex::new(());

/// Exclusive use of the backend's process-wide RNG.
///
/// Weight initialisation and dropout masks both draw from it, so a seeded
/// network is only reproducible while this guard is held.
pub fn backend_rng_lock() -> MutexGuard<'static, ()> {
    BACKEND_RNG.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Configuration for the score network
#[derive(Debug, Clone)]
pub struct ScoreNetConfig {
    pub input_dim: usize,
    /// Hidden layer widths, input side first
    pub hidden_dims: Vec<usize>,
    pub dropout: f64,
}

impl Default for ScoreNetConfig {
    fn default() -> Self {
        ScoreNetConfig {
            input_dim: FeatureVector::DIM,
            hidden_dims: vec![32],
            dropout: 0.1,
        }
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

/// Feed-forward regressor with a single scalar output
#[derive(Module, Debug)]
pub struct ScoreNet<B: Backend> {
    hidden: Vec<HiddenBlock<B>>,
    output: Linear<B>,
}

impl<B: Backend> ScoreNet<B> {
    pub fn new(device: &B::Device, config: &ScoreNetConfig) -> Self {
        let mut hidden = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &width in &config.hidden_dims {
            hidden.push(HiddenBlock::new(device, in_dim, width, config.dropout));
            in_dim = width;
        }

        ScoreNet {
            hidden,
            output: LinearConfig::new(in_dim, 1).init(device),
        }
    }

    /// Seed the backend RNG, then initialise. Equal seeds give equal weights.
    pub fn seeded(
        device: &B::Device,
        config: &ScoreNetConfig,
        seed: u64,
        _rng: &MutexGuard<'static, ()>,
    ) -> Self {
        B::seed(seed);
        Self::new(device, config)
    }

    /// [batch, input_dim] → [batch, 1]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.hidden.iter().fold(x, |x, block| block.forward(x));
        self.output.forward(x)
    }

    pub fn depth(&self) -> usize {
        self.hidden.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let config = ScoreNetConfig {
            input_dim: FeatureVector::DIM,
            hidden_dims: vec![64, 64, 32],
            dropout: 0.0,
        };
        let rng = backend_rng_lock();
        let model = ScoreNet::<TestBackend>::seeded(&device, &config, 1, &rng);
        assert_eq!(model.depth(), 3);

        let x = Tensor::<TestBackend, 2>::ones([5, FeatureVector::DIM], &device);
        assert_eq!(model.forward(x).dims(), [5, 1]);
    }

    #[test]
    fn test_linear_only() {
        let device = Default::default();
        let config = ScoreNetConfig {
            hidden_dims: vec![],
            ..ScoreNetConfig::default()
        };
        let rng = backend_rng_lock();
        let model = ScoreNet::<TestBackend>::seeded(&device, &config, 2, &rng);
        assert_eq!(model.depth(), 0);

        let x = Tensor::<TestBackend, 2>::zeros([2, FeatureVector::DIM], &device);
        assert_eq!(model.forward(x).dims(), [2, 1]);
    }

    #[test]
    fn test_equal_seeds_give_equal_weights() {
        let device = Default::default();
        let config = ScoreNetConfig {
            hidden_dims: vec![8, 4],
            dropout: 0.0,
            ..ScoreNetConfig::default()
        };
        let x = Tensor::<TestBackend, 2>::ones([3, FeatureVector::DIM], &device);

        let outputs: Vec<Vec<f32>> = [11, 11, 12]
            .iter()
            .map(|&seed| {
                let rng = backend_rng_lock();
                let model = ScoreNet::<TestBackend>::seeded(&device, &config, seed, &rng);
                model.forward(x.clone()).into_data().to_vec::<f32>().unwrap()
            })
            .collect();

        assert_eq!(outputs[0], outputs[1]);
        assert_ne!(outputs[0], outputs[2]);
    }
}
