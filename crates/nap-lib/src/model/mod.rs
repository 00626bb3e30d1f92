//! Convolutional classifier and training harness

mod metrics;
mod network;
mod trainer;

pub use metrics::{accuracy, auroc, evaluate_binary, f1_score, BinaryMetrics};
pub use network::{ConvNet, ConvNetConfig};
pub use trainer::{
    EpochReport, InferenceBackend, Trainer, TrainerConfig, TrainingBackend, TrainingReport,
};
