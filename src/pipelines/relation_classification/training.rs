use std::path::Path;

use anyhow::Context as _;
use burn::{
    config::Config as _,
    optim::{decay::WeightDecayConfig, AdamConfig},
    tensor::backend::AutodiffBackend,
};

use crate::{
    cli::embeddings::EmbeddingSource,
    datasets::LoadableCorpus,
    models::attention_lstm::{self, BurnPredictor, Model},
    utils::{embeddings, files::write_lines, tensors::float_matrix},
};

use super::{
    config::{Training, Validated},
    features::FeatureEncoder,
    run::RunDirectory,
    session::{Outcome, TrainingSession},
    vocab::Vocabulary,
};

/// Define train function
pub async fn train<B: AutodiffBackend>(
    device: B::Device, // Device on which to perform computation (e.g., CPU or CUDA device)
    config: Training,  // Experiment configuration
) -> anyhow::Result<(RunDirectory, Outcome)> {
    // Malformed options fail here, before any data is read
    let validated = config.validate()?;

    let run = RunDirectory::create(Path::new(&config.runs_dir))
        .with_context(|| format!("Unable to create a run directory in {}", config.runs_dir))?;
    log::info!("Writing to {}", run.root().display());

    let corpus = validated.dataset.corpus();
    let labels = corpus.labels();

    let train_streams = corpus
        .load(&config.train_path)
        .await
        .with_context(|| format!("Unable to load the training split from {}", config.train_path))?;
    let test_streams = corpus
        .load(&config.test_path)
        .await
        .with_context(|| format!("Unable to load the test split from {}", config.test_path))?;

    let encoder = FeatureEncoder::fit(
        &train_streams,
        config.max_sentence_length,
        config.max_word_length,
    );
    let train = encoder.encode(&train_streams)?;
    let test = encoder.encode(&test_streams)?;

    log::info!(
        "Train/Test split: {}/{}",
        train.labels.len(),
        test.labels.len()
    );

    encoder.vocabularies.save(run.vocab_path())?;
    config
        .save(run.config_path())
        .with_context(|| format!("Unable to write {}", run.config_path().display()))?;
    write_lines(
        run.answer_keys_path(),
        validated.output_format.lines(&test.labels, labels),
    )
    .with_context(|| format!("Unable to write {}", run.answer_keys_path().display()))?;

    B::seed(config.seed);

    let model = build_model::<B>(
        &config,
        &validated,
        &encoder.vocabularies.words,
        attention_lstm::Config::for_training(&config, &validated, &encoder.vocabularies, labels.len()),
        &device,
    )?;

    let optim = AdamConfig::new()
        .with_weight_decay(Some(WeightDecayConfig::new(config.l2_reg_lambda as _)))
        .init::<B, Model<B>>();

    let predictor = BurnPredictor::new(model, optim, &device);
    let mut session = TrainingSession::new(predictor, &config, &validated, run.clone(), labels)?;

    let outcome = session.run(&train, &test).await?;

    log::info!(
        "Finished {} steps, best macro-F1 {} over {} checkpoints",
        outcome.steps,
        outcome.best_f1,
        outcome.checkpoints
    );

    Ok((run, outcome))
}

/// Initialize the model, loading pretrained word vectors when a source is configured
fn build_model<B: AutodiffBackend>(
    config: &Training,
    validated: &Validated,
    words: &Vocabulary,
    model_config: attention_lstm::Config,
    device: &B::Device,
) -> anyhow::Result<Model<B>> {
    let model = model_config.init::<B>(device);

    if validated.embeddings == EmbeddingSource::None {
        return Ok(model);
    }

    let path = config
        .embeddings_path
        .as_deref()
        .or_else(|| validated.embeddings.default_path())
        .ok_or_else(|| anyhow!("No vector file configured for {}", validated.embeddings))?;

    let vectors = embeddings::load(
        validated.embeddings,
        Path::new(path),
        words,
        config.embedding_size,
        config.seed,
    )
    .with_context(|| format!("Unable to load {} vectors", validated.embeddings))?;

    log::info!("Success to load pre-trained {} model!", validated.embeddings);

    Ok(model.with_word_vectors(float_matrix(
        &vectors.values,
        vectors.rows,
        vectors.dim,
        device,
    )))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use burn::backend::{Autodiff, NdArray};
    use pretty_assertions::assert_eq;

    use crate::pipelines::relation_classification::vocab::Vocabularies;

    use super::*;

    const CORPUS: &str = "\
1\t\"The <e1>kitchen</e1> is the last renovated part of the <e2>house</e2>.\"
Component-Whole(e2,e1)
Comment:

2\t\"The <e1>child</e1> was carefully wrapped and bound into the <e2>cradle</e2> by means of a cord.\"
Other
Comment:

3\t\"The <e1>author</e1> of a keygen uses a <e2>disassembler</e2> to look at the raw assembly code.\"
Instrument-Agency(e2,e1)
Comment:
";

    fn config(dir: &Path) -> Training {
        let corpus = dir.join("corpus.txt");
        fs::write(&corpus, CORPUS).unwrap();
        let corpus = corpus.display().to_string();

        Training::new(corpus.clone(), corpus)
            .with_max_sentence_length(12)
            .with_max_word_length(6)
            .with_embedding_size(6)
            .with_char_embedding_size(4)
            .with_dist_embedding_size(3)
            .with_filter_sizes("2,3".to_string())
            .with_num_filters(3)
            .with_hidden_size(5)
            .with_attention_size(4)
            .with_batch_size(2)
            .with_num_epochs(2)
            .with_evaluate_every(2)
            .with_scorer_command(Vec::new())
            .with_runs_dir(dir.join("runs").display().to_string())
    }

    #[tokio::test]
    async fn writes_the_run_artifacts() {
        let dir = tempfile::tempdir().unwrap();

        let (run, outcome) = train::<Autodiff<NdArray>>(Default::default(), config(dir.path()))
            .await
            .unwrap();

        assert_eq!(outcome.steps, 4);
        assert!(run.summaries_dir().join("train.csv").exists());
        assert!(run.summaries_dir().join("dev.csv").exists());

        let answers = fs::read_to_string(run.answer_keys_path()).unwrap();
        assert_eq!(answers, "12\n0\n6\n");

        let vocabularies = Vocabularies::load(run.vocab_path()).unwrap();
        assert!(vocabularies.words.id("kitchen") > 0);

        let saved = <Training as burn::config::Config>::load(run.config_path()).unwrap();
        assert_eq!(saved.hidden_size, 5);
    }

    #[tokio::test]
    async fn invalid_options_fail_before_loading_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path()).with_filter_sizes("3,x".to_string());
        config.train_path = dir.path().join("missing.txt").display().to_string();

        let err = train::<Autodiff<NdArray>>(Default::default(), config)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("filter sizes"));
        assert!(!dir.path().join("runs").exists());
    }
}
