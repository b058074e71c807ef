use std::path::{Path, PathBuf};

use anyhow::Context as _;
use burn::{config::Config as _, optim::AdamConfig, tensor::backend::AutodiffBackend};

use crate::{
    datasets::{semeval::OTHER, LoadableCorpus},
    models::attention_lstm::{self, BurnPredictor, Model},
    utils::files::write_lines,
};

use super::{
    config::Training,
    evaluation::{Evaluation, Evaluator},
    features::FeatureEncoder,
    model::Predictor,
    run::RunDirectory,
    vocab::Vocabularies,
};

/// Score a corpus with a checkpoint from a finished run and write its predictions.
///
/// The run directory supplies `config.json` and `vocab.json`; the corpus is encoded with those
/// frozen vocabularies. Predictions go to `output`, or `inference.txt` in the run directory when omitted.
pub async fn infer<B: AutodiffBackend>(
    device: B::Device,
    run: &RunDirectory,
    checkpoint: &Path,
    corpus_path: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<(PathBuf, Evaluation)> {
    let config = Training::load(run.config_path())
        .map_err(|e| anyhow!("Unable to load {}: {}", run.config_path().display(), e))?;
    let validated = config.validate()?;
    let vocabularies = Vocabularies::load(run.vocab_path())?;

    let corpus = validated.dataset.corpus();
    let labels = corpus.labels();
    let streams = corpus
        .load(corpus_path)
        .await
        .with_context(|| format!("Unable to load {}", corpus_path))?;

    let model_config =
        attention_lstm::Config::for_training(&config, &validated, &vocabularies, labels.len());
    let encoder = FeatureEncoder::from_vocabularies(
        vocabularies,
        config.max_sentence_length,
        config.max_word_length,
    );
    let encoded = encoder.encode(&streams)?;

    let model = model_config.init::<B>(&device);
    let optim = AdamConfig::new().init::<B, Model<B>>();
    let mut predictor = BurnPredictor::new(model, optim, &device);
    predictor.load(checkpoint)?;

    let evaluation =
        Evaluator::new(config.batch_size, labels.len(), OTHER).evaluate(&predictor, &encoded)?;

    let output = output.unwrap_or_else(|| run.root().join("inference.txt"));
    write_lines(
        &output,
        validated.output_format.lines(&evaluation.predictions, labels),
    )
    .with_context(|| format!("Unable to write predictions to {}", output.display()))?;

    log::info!(
        "Scored {} examples: loss {}, acc {}, macro-F1 {}",
        encoded.labels.len(),
        evaluation.loss,
        evaluation.accuracy,
        evaluation.f1
    );

    Ok((output, evaluation))
}
