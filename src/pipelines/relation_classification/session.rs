use std::{
    fs::File,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;
use burn::data::dataset::Dataset;
use serde::Serialize;

use crate::{
    cli::formats::LabelFormat,
    datasets::semeval::OTHER,
    utils::{files::write_lines, format::general},
};

use super::{
    batcher::BatchIter,
    checkpoint::{CheckpointPolicy, CheckpointStore},
    config::{Training, Validated},
    evaluation::{Evaluation, Evaluator},
    item::Item,
    model::{Hyperparameters, Predictor, StepOutput},
    run::RunDirectory,
    scorer::ExternalScorer,
};

#[derive(Serialize)]
struct TrainRecord {
    step: usize,
    loss: f64,
    accuracy: f64,
}

#[derive(Serialize)]
struct DevRecord {
    step: usize,
    loss: f64,
    accuracy: f64,
    f1: f64,
}

/// CSV logs of every training step and every evaluation
struct Summaries {
    train: csv::Writer<File>,
    dev: csv::Writer<File>,
}

impl Summaries {
    fn create(dir: &Path) -> anyhow::Result<Self> {
        let open = |name: &str| {
            let path = dir.join(name);

            csv::Writer::from_path(&path)
                .with_context(|| format!("Unable to create summary log {}", path.display()))
        };

        Ok(Self {
            train: open("train.csv")?,
            dev: open("dev.csv")?,
        })
    }

    fn train(&mut self, step: usize, output: &StepOutput) -> anyhow::Result<()> {
        self.train.serialize(TrainRecord {
            step,
            loss: output.loss,
            accuracy: output.accuracy,
        })?;
        self.train.flush()?;

        Ok(())
    }

    fn dev(&mut self, step: usize, evaluation: &Evaluation) -> anyhow::Result<()> {
        self.dev.serialize(DevRecord {
            step,
            loss: evaluation.loss,
            accuracy: evaluation.accuracy,
            f1: evaluation.f1,
        })?;
        self.dev.flush()?;

        Ok(())
    }
}

/// Where a finished session ended up
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    /// Training steps taken
    pub steps: usize,

    /// The best macro-F1 that earned a checkpoint
    pub best_f1: f64,

    /// Number of checkpoints written
    pub checkpoints: usize,
}

/// Owns the training loop state: the global step, the checkpoint policy and the run's outputs
pub struct TrainingSession<P: Predictor> {
    predictor: P,
    hyperparameters: Hyperparameters,
    evaluator: Evaluator,
    policy: CheckpointPolicy,
    store: CheckpointStore,
    run: RunDirectory,
    summaries: Summaries,
    scorer: Option<ExternalScorer>,
    output_format: LabelFormat,
    labels: &'static [&'static str],
    batch_size: usize,
    num_epochs: usize,
    display_every: usize,
    evaluate_every: usize,
    seed: u64,
    global_step: usize,
    checkpoints: usize,
}

impl<P: Predictor> TrainingSession<P> {
    /// Start a session writing into `run`. The scorer is disabled when no command is configured.
    pub fn new(
        predictor: P,
        config: &Training,
        validated: &Validated,
        run: RunDirectory,
        labels: &'static [&'static str],
    ) -> anyhow::Result<Self> {
        run.ensure_dirs()
            .with_context(|| format!("Unable to create run directory {}", run.root().display()))?;

        let summaries = Summaries::create(&run.summaries_dir())?;

        let scorer = if config.scorer_command.is_empty() {
            None
        } else {
            if config.scorer_expects_semeval(validated) {
                log::warn!(
                    "The SemEval scorer reads `<id>\\t<relation>` lines; set output_format to \"semeval\""
                );
            }

            let gold = config
                .scorer_gold_path
                .as_ref()
                .map(PathBuf::from)
                .unwrap_or_else(|| run.answer_keys_path());

            Some(ExternalScorer::new(
                config.scorer_command.clone(),
                gold,
                Duration::from_secs(config.scorer_timeout_secs),
            ))
        };

        Ok(Self {
            predictor,
            hyperparameters: Hyperparameters::new(
                config.learning_rate,
                config.rnn_dropout_keep_prob,
                config.dropout_keep_prob,
            ),
            evaluator: Evaluator::new(config.batch_size, labels.len(), OTHER),
            policy: CheckpointPolicy::default(),
            store: CheckpointStore::new(config.num_checkpoints),
            run,
            summaries,
            scorer,
            output_format: validated.output_format,
            labels,
            batch_size: config.batch_size,
            num_epochs: config.num_epochs,
            display_every: config.display_every,
            evaluate_every: config.evaluate_every,
            seed: config.seed,
            global_step: 0,
            checkpoints: 0,
        })
    }

    /// Steps taken so far
    pub fn global_step(&self) -> usize {
        self.global_step
    }

    /// Current checkpoint policy state
    pub fn policy(&self) -> CheckpointPolicy {
        self.policy
    }

    /// Give back the predictor
    pub fn into_predictor(self) -> P {
        self.predictor
    }

    /// Train over shuffled batches of `train`, evaluating on `test` every `evaluate_every`
    /// steps
    pub async fn run<D, T>(&mut self, train: &D, test: &T) -> anyhow::Result<Outcome>
    where
        D: Dataset<Item>,
        T: Dataset<Item>,
    {
        let batches = BatchIter::new(train, self.batch_size, self.num_epochs, true, self.seed);

        log::info!(
            "Training on {} examples for {} epochs ({} steps)",
            train.len(),
            self.num_epochs,
            batches.len()
        );

        for batch in batches {
            let output = self
                .predictor
                .train_step(&batch, &self.hyperparameters)?;

            self.global_step += 1;
            let step = self.global_step;

            self.summaries.train(step, &output)?;

            if step % self.display_every == 0 {
                log::info!(
                    "step {}, loss {}, acc {}",
                    step,
                    general(output.loss, 6),
                    general(output.accuracy, 6)
                );
            }

            if step % self.evaluate_every == 0 {
                self.evaluate(test).await?;
            }
        }

        Ok(Outcome {
            steps: self.global_step,
            best_f1: self.policy.best(),
            checkpoints: self.checkpoints,
        })
    }

    /// Evaluate on `test` at the current step and checkpoint if the score qualifies
    pub async fn evaluate<T: Dataset<Item>>(&mut self, test: &T) -> anyhow::Result<Evaluation> {
        let step = self.global_step;
        let evaluation = self.evaluator.evaluate(&self.predictor, test)?;

        log::info!(
            "Evaluation: step {}, loss {}, acc {}",
            step,
            general(evaluation.loss, 6),
            general(evaluation.accuracy, 6)
        );
        log::info!(
            "Macro-averaged F1 excluding {}: {}",
            self.labels.get(OTHER).copied().unwrap_or("Other"),
            general(evaluation.f1, 6)
        );

        self.summaries.dev(step, &evaluation)?;

        if self.policy.observe(evaluation.f1) {
            self.checkpoint(step, &evaluation).await?;
        }

        Ok(evaluation)
    }

    async fn checkpoint(&mut self, step: usize, evaluation: &Evaluation) -> anyhow::Result<()> {
        let saved = self
            .predictor
            .save(&self.run.model_path(evaluation.f1, step))?;

        for removed in self.store.push(saved.clone())? {
            log::debug!("Pruned {}", removed.display());
        }

        let predictions = self.run.predictions_path(evaluation.f1, step);
        write_lines(
            &predictions,
            self.output_format.lines(&evaluation.predictions, self.labels),
        )
        .with_context(|| format!("Unable to write predictions to {}", predictions.display()))?;

        if let Some(scorer) = &self.scorer {
            scorer.report(&predictions).await;
        }

        self.checkpoints += 1;
        log::info!("Saved model checkpoint to {}", saved.display());

        Ok(())
    }
}
