//! Classifier network architecture
//!
//! A small 1-D convolutional network over the windowed feature vector,
//! treated as a single-channel sequence:
//! Conv1d(C, 64, k=5) -> ReLU -> MaxPool(2) -> Conv1d(64, 128, k=3) ->
//! ReLU -> AdaptiveAvgPool(1) -> Dropout -> Linear(128, classes).

use burn::{
    module::Module,
    nn::{
        conv::{Conv1d, Conv1dConfig},
        pool::{AdaptiveAvgPool1d, AdaptiveAvgPool1dConfig, MaxPool1d, MaxPool1dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig1d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvNetConfig {
    /// Input channels of the feature tensor
    pub in_channels: usize,
    /// Output classes
    pub num_classes: usize,
    /// Channels after the first convolution
    pub conv1_channels: usize,
    /// Channels after the second convolution
    pub conv2_channels: usize,
    /// Dropout before the classification head
    pub dropout: f64,
}

impl Default for ConvNetConfig {
    fn default() -> Self {
        Self {
            in_channels: 1,
            num_classes: 2,
            conv1_channels: 64,
            conv2_channels: 128,
            dropout: 0.2,
        }
    }
}

/// 1-D convolutional classifier
#[derive(Module, Debug)]
pub struct ConvNet<B: Backend> {
    conv1: Conv1d<B>,
    conv2: Conv1d<B>,
    pool: MaxPool1d,
    global_pool: AdaptiveAvgPool1d,
    dropout: Dropout,
    head: Linear<B>,
    activation: Relu,
}

impl<B: Backend> ConvNet<B> {
    pub fn new(config: &ConvNetConfig, device: &B::Device) -> Self {
        Self {
            conv1: Conv1dConfig::new(config.in_channels, config.conv1_channels, 5)
                .with_padding(PaddingConfig1d::Explicit(2))
                .init(device),
            conv2: Conv1dConfig::new(config.conv1_channels, config.conv2_channels, 3)
                .with_padding(PaddingConfig1d::Explicit(1))
                .init(device),
            pool: MaxPool1dConfig::new(2).with_stride(2).init(),
            global_pool: AdaptiveAvgPool1dConfig::new(1).init(),
            dropout: DropoutConfig::new(config.dropout).init(),
            head: LinearConfig::new(config.conv2_channels, config.num_classes).init(device),
            activation: Relu::new(),
        }
    }

    /// Forward pass over `[batch, channels, length]`, returning logits
    /// `[batch, num_classes]`.
    pub fn forward(&self, input: Tensor<B, 3>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.conv1.forward(input));
        let x = self.pool.forward(x);
        let x = self.activation.forward(self.conv2.forward(x));
        let x = self.global_pool.forward(x);
        let x: Tensor<B, 2> = x.flatten(1, 2);
        let x = self.dropout.forward(x);
        self.head.forward(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    #[test]
    fn test_forward_shape() {
        let device = NdArrayDevice::default();
        let model: ConvNet<NdArray> = ConvNet::new(&ConvNetConfig::default(), &device);

        let input: Tensor<NdArray, 3> = Tensor::from_data(
            TensorData::new(vec![0.5f32; 4 * 24], [4, 1, 24]),
            &device,
        );
        let logits = model.forward(input);
        assert_eq!(logits.dims(), [4, 2]);
    }

    #[test]
    fn test_forward_is_finite() {
        let device = NdArrayDevice::default();
        let model: ConvNet<NdArray> = ConvNet::new(&ConvNetConfig::default(), &device);

        let input: Tensor<NdArray, 3> = Tensor::from_data(
            TensorData::new(vec![1.0f32; 2 * 10], [2, 1, 10]),
            &device,
        );
        let logits: Vec<f32> = model.forward(input).into_data().to_vec().unwrap();
        assert_eq!(logits.len(), 4);
        assert!(logits.iter().all(|v| v.is_finite()));
    }
}
