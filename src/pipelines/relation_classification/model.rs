use std::path::{Path, PathBuf};

use burn::LearningRate;
use derive_new::new;

use super::batcher::Batch;

/// Learning rate and dropout keep probabilities for one step
#[derive(Clone, Copy, Debug, PartialEq, new)]
pub struct Hyperparameters {
    /// Optimizer learning rate
    pub learning_rate: LearningRate,

    /// Keep probability for the recurrent input
    pub rnn_dropout_keep_prob: f64,

    /// Keep probability for the rest of the network
    pub dropout_keep_prob: f64,
}

/// The result of one training step
#[derive(Clone, Copy, Debug, PartialEq, new)]
pub struct StepOutput {
    /// Mean loss over the batch
    pub loss: f64,

    /// Fraction of the batch predicted correctly
    pub accuracy: f64,
}

/// The result of evaluating one batch
#[derive(Clone, Debug, PartialEq, new)]
pub struct EvalOutput {
    /// Mean loss over the batch
    pub loss: f64,

    /// Fraction of the batch predicted correctly
    pub accuracy: f64,

    /// Predicted class ids, in batch order
    pub predictions: Vec<usize>,
}

/// A trainable classifier over the encoded feature streams
pub trait Predictor {
    /// Update the parameters on one batch
    fn train_step(
        &mut self,
        batch: &Batch,
        hyperparameters: &Hyperparameters,
    ) -> anyhow::Result<StepOutput>;

    /// Score one batch without updating parameters or applying dropout
    fn evaluate(&self, batch: &Batch) -> anyhow::Result<EvalOutput>;

    /// Persist the parameters under `path`, returning the file written
    fn save(&self, path: &Path) -> anyhow::Result<PathBuf>;

    /// Replace the parameters with ones saved under `path`
    fn load(&mut self, path: &Path) -> anyhow::Result<()>;
}
