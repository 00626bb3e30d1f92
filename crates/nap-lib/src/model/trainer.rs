//! Supervised training loop
//!
//! Cross-entropy + Adam over mini-batches from the train partition, with
//! validation metrics per epoch and test metrics at the end. Features are
//! standardized with train-partition statistics so the validation and test
//! partitions never leak into the scaler.

use super::metrics::{self, BinaryMetrics};
use super::network::{ConvNet, ConvNetConfig};
use crate::dataset::{LabeledDataset, SplitIndices};
use anyhow::{anyhow, bail, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Backend used for training (CPU with autodiff)
pub type TrainingBackend = Autodiff<NdArray>;
/// Backend used for evaluation
pub type InferenceBackend = NdArray;

/// Training configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TrainerConfig {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Standardize features with train-partition mean/std
    #[serde(default = "default_true")]
    pub standardize: bool,
    /// Optional per-class loss weights, index = class label
    #[serde(default)]
    pub class_weights: Option<Vec<f32>>,
}

fn default_epochs() -> usize {
    30
}

fn default_batch_size() -> usize {
    64
}

fn default_learning_rate() -> f64 {
    1e-3
}

fn default_seed() -> u64 {
    42
}

fn default_true() -> bool {
    true
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            batch_size: default_batch_size(),
            learning_rate: default_learning_rate(),
            seed: default_seed(),
            standardize: true,
            class_weights: None,
        }
    }
}

/// Metrics for one training epoch
#[derive(Debug, Clone, Serialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub train_loss: f64,
    pub train_accuracy: f64,
    pub val: BinaryMetrics,
}

/// Full training outcome
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub epochs: Vec<EpochReport>,
    pub test: BinaryMetrics,
}

/// Runs the training loop over a labeled dataset and persisted splits
pub struct Trainer {
    config: TrainerConfig,
    network: ConvNetConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            network: ConvNetConfig::default(),
        }
    }

    pub fn with_network(config: TrainerConfig, network: ConvNetConfig) -> Self {
        Self { config, network }
    }

    /// Train on the train partition, validate per epoch, test at the end.
    pub fn train(
        &self,
        dataset: &LabeledDataset,
        splits: &SplitIndices,
    ) -> Result<TrainingReport> {
        self.validate_inputs(dataset, splits)?;

        let scaler = if self.config.standardize {
            Scaler::fit(dataset, &splits.train)
        } else {
            Scaler::identity(dataset.num_features())
        };

        let device = NdArrayDevice::default();
        TrainingBackend::seed(self.config.seed);

        let mut model: ConvNet<TrainingBackend> = ConvNet::new(&self.network, &device);
        let loss_fn = CrossEntropyLossConfig::new()
            .with_weights(self.config.class_weights.clone())
            .init::<TrainingBackend>(&device);
        let mut optim = AdamConfig::new().init();

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order = splits.train.clone();
        let mut epochs = Vec::with_capacity(self.config.epochs);

        info!(
            train = splits.train.len(),
            val = splits.val.len(),
            test = splits.test.len(),
            features = dataset.num_features(),
            "starting training"
        );

        for epoch in 1..=self.config.epochs {
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0f64;
            let mut batches = 0usize;
            let mut train_preds = Vec::with_capacity(order.len());
            let mut train_targets = Vec::with_capacity(order.len());

            for batch in order.chunks(self.config.batch_size) {
                let inputs = batch_inputs::<TrainingBackend>(dataset, batch, &scaler, &device);
                let targets = batch_targets::<TrainingBackend>(dataset, batch, &device);

                let logits = model.forward(inputs);
                let loss = loss_fn.forward(logits.clone(), targets);

                loss_sum += f64::from(loss.clone().into_scalar());
                batches += 1;
                train_preds.extend(predictions(&logits)?);
                train_targets.extend(batch.iter().map(|&i| dataset.labels[i]));

                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optim.step(self.config.learning_rate, model, grads);
            }

            let train_loss = loss_sum / batches.max(1) as f64;
            let train_accuracy = metrics::accuracy(&train_preds, &train_targets);
            let val = self.evaluate(&model.valid(), dataset, &splits.val, &scaler, &device)?;

            info!(
                epoch,
                train_loss,
                train_accuracy,
                val_accuracy = val.accuracy,
                val_f1 = val.f1,
                val_auroc = val.auroc,
                "epoch complete"
            );
            epochs.push(EpochReport {
                epoch,
                train_loss,
                train_accuracy,
                val,
            });
        }

        let test = self.evaluate(&model.valid(), dataset, &splits.test, &scaler, &device)?;
        info!(
            test_accuracy = test.accuracy,
            test_f1 = test.f1,
            test_auroc = test.auroc,
            "training complete"
        );

        Ok(TrainingReport { epochs, test })
    }

    fn validate_inputs(&self, dataset: &LabeledDataset, splits: &SplitIndices) -> Result<()> {
        if dataset.is_empty() {
            bail!("labeled dataset is empty");
        }
        for (name, partition) in [
            ("train", &splits.train),
            ("val", &splits.val),
            ("test", &splits.test),
        ] {
            if partition.is_empty() {
                bail!("{name} partition is empty");
            }
            if let Some(&out_of_range) =
                partition.iter().find(|&&i| i >= dataset.len())
            {
                bail!(
                    "{name} partition references row {out_of_range}, dataset has {} rows",
                    dataset.len()
                );
            }
        }
        if self.config.epochs == 0 {
            bail!("epochs must be positive");
        }
        if self.config.batch_size == 0 {
            bail!("batch_size must be positive");
        }
        Ok(())
    }

    fn evaluate(
        &self,
        model: &ConvNet<InferenceBackend>,
        dataset: &LabeledDataset,
        indices: &[usize],
        scaler: &Scaler,
        device: &NdArrayDevice,
    ) -> Result<BinaryMetrics> {
        let mut preds = Vec::with_capacity(indices.len());
        let mut probs = Vec::with_capacity(indices.len());
        let mut targets = Vec::with_capacity(indices.len());

        for batch in indices.chunks(self.config.batch_size) {
            let inputs = batch_inputs::<InferenceBackend>(dataset, batch, scaler, device);
            let logits = model.forward(inputs);

            preds.extend(predictions(&logits)?);
            // positive-class probability from the softmax
            let softmaxed: Vec<f32> = softmax(logits, 1)
                .into_data()
                .to_vec()
                .map_err(|e| anyhow!("failed to read probabilities: {e:?}"))?;
            probs.extend(softmaxed.chunks(2).map(|pair| f64::from(pair[1])));
            targets.extend(batch.iter().map(|&i| dataset.labels[i]));
        }

        Ok(metrics::evaluate_binary(&probs, &preds, &targets))
    }
}

/// Per-feature standardization fitted on the train partition
struct Scaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl Scaler {
    fn fit(dataset: &LabeledDataset, indices: &[usize]) -> Self {
        let n_features = dataset.num_features();
        let count = indices.len().max(1) as f64;

        let mut mean = vec![0.0f64; n_features];
        for &i in indices {
            for (j, value) in dataset.features[i].iter().enumerate() {
                mean[j] += value;
            }
        }
        for m in &mut mean {
            *m /= count;
        }

        let mut std = vec![0.0f64; n_features];
        for &i in indices {
            for (j, value) in dataset.features[i].iter().enumerate() {
                std[j] += (value - mean[j]).powi(2);
            }
        }
        for s in &mut std {
            *s = (*s / count).sqrt();
            if *s < f64::EPSILON {
                *s = 1.0;
            }
        }

        Self { mean, std }
    }

    fn identity(n_features: usize) -> Self {
        Self {
            mean: vec![0.0; n_features],
            std: vec![1.0; n_features],
        }
    }

    fn apply(&self, feature: usize, value: f64) -> f32 {
        ((value - self.mean[feature]) / self.std[feature]) as f32
    }
}

/// Rows as a `[batch, 1, features]` tensor
fn batch_inputs<B: Backend>(
    dataset: &LabeledDataset,
    indices: &[usize],
    scaler: &Scaler,
    device: &B::Device,
) -> Tensor<B, 3> {
    let n_features = dataset.num_features();
    let mut flat = Vec::with_capacity(indices.len() * n_features);
    for &i in indices {
        for (j, value) in dataset.features[i].iter().enumerate() {
            flat.push(scaler.apply(j, *value));
        }
    }
    Tensor::from_data(
        TensorData::new(flat, [indices.len(), 1, n_features]),
        device,
    )
}

/// Labels as an integer tensor
fn batch_targets<B: Backend>(
    dataset: &LabeledDataset,
    indices: &[usize],
    device: &B::Device,
) -> Tensor<B, 1, Int> {
    let labels: Vec<i64> = indices.iter().map(|&i| dataset.labels[i]).collect();
    Tensor::from_data(TensorData::new(labels, [indices.len()]), device)
}

/// Hard class predictions from logits
fn predictions<B: Backend>(logits: &Tensor<B, 2>) -> Result<Vec<i64>> {
    let [n, _] = logits.dims();
    logits
        .clone()
        .argmax(1)
        .reshape([n])
        .into_data()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("failed to read predictions: {e:?}"))
}
