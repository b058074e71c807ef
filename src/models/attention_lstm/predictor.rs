use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use burn::{
    data::dataloader::batcher::Batcher as _,
    module::{AutodiffModule, Module},
    nn::loss::CrossEntropyLossConfig,
    optim::{GradientsParams, Optimizer},
    record::{CompactRecorder, FileRecorder, Recorder},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion, Int, Tensor,
    },
};

use crate::pipelines::relation_classification::{
    batcher::{Batch, Batcher},
    model::{EvalOutput, Hyperparameters, Predictor, StepOutput},
};

use super::model::{Keep, Model};

/// Trains an attention-LSTM with a burn optimizer and records it with [CompactRecorder]
pub struct BurnPredictor<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Model<B>, B>,
{
    model: Model<B>,
    optim: O,
    batcher: Batcher<B>,
    valid_batcher: Batcher<B::InnerBackend>,
}

impl<B, O> BurnPredictor<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Model<B>, B>,
{
    /// Wrap a model and its optimizer
    pub fn new(model: Model<B>, optim: O, device: &B::Device) -> Self {
        let batcher = Batcher::new(model.sentence_length, model.word_length, device.clone());
        let valid_batcher = Batcher::new(model.sentence_length, model.word_length, device.clone());

        Self {
            model,
            optim,
            batcher,
            valid_batcher,
        }
    }

    /// The model being trained
    pub fn model(&self) -> &Model<B> {
        &self.model
    }
}

impl<B, O> Predictor for BurnPredictor<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<Model<B>, B>,
{
    fn train_step(
        &mut self,
        batch: &Batch,
        hyperparameters: &Hyperparameters,
    ) -> anyhow::Result<StepOutput> {
        let input = self.batcher.batch(batch.items.clone());
        let keep = Keep {
            rnn: hyperparameters.rnn_dropout_keep_prob,
            output: hyperparameters.dropout_keep_prob,
        };

        let output = self.model.forward(input, keep);
        let accuracy = accuracy(output.output, output.targets);
        let loss = output.loss.clone().into_scalar().elem::<f64>();

        let grads = GradientsParams::from_grads(output.loss.backward(), &self.model);
        self.model = self
            .optim
            .step(hyperparameters.learning_rate, self.model.clone(), grads);

        Ok(StepOutput::new(loss, accuracy))
    }

    fn evaluate(&self, batch: &Batch) -> anyhow::Result<EvalOutput> {
        let model = self.model.valid();
        let input = self.valid_batcher.batch(batch.items.clone());

        let logits = model.logits(&input, Keep::ALL);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), input.targets.clone())
            .into_scalar()
            .elem::<f64>();

        let predicted = logits.argmax(1).flatten::<1>(0, 1);
        let predictions = predicted
            .clone()
            .into_data()
            .convert::<i64>()
            .value
            .into_iter()
            .map(|class| class.max(0) as usize)
            .collect();

        Ok(EvalOutput::new(
            loss,
            correct(predicted, input.targets),
            predictions,
        ))
    }

    fn save(&self, path: &Path) -> anyhow::Result<PathBuf> {
        let (target, file) = recorder_paths::<B>(path);

        CompactRecorder::new()
            .record(self.model.clone().into_record(), target)
            .map_err(|e| anyhow!("Unable to save checkpoint {}: {:?}", file.display(), e))?;

        Ok(file)
    }

    fn load(&mut self, path: &Path) -> anyhow::Result<()> {
        let (target, file) = recorder_paths::<B>(path);
        let device = &self.batcher.device;

        let record = CompactRecorder::new()
            .load(target, device)
            .map_err(|e| anyhow!("Unable to load checkpoint {}: {:?}", file.display(), e))?;

        self.model = self.model.clone().load_record(record);

        Ok(())
    }
}

/// The recorder replaces the last extension of its target with its own, so score-tagged names
/// like `model-0.812-300` get a placeholder extension first. Returns the target handed to the
/// recorder and the file it ends up at. Paths already carrying the recorder's extension are
/// accepted too.
fn recorder_paths<B: Backend>(path: &Path) -> (PathBuf, PathBuf) {
    let extension = <CompactRecorder as FileRecorder<B>>::file_extension();
    let suffix = format!(".{}", extension);

    let stem = path
        .to_str()
        .and_then(|name| name.strip_suffix(suffix.as_str()))
        .map(OsString::from)
        .unwrap_or_else(|| path.as_os_str().to_os_string());

    let mut target = stem.clone();
    target.push(".checkpoint");

    let mut file = stem;
    file.push(&suffix);

    (PathBuf::from(target), PathBuf::from(file))
}

fn accuracy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> f64 {
    correct(logits.argmax(1).flatten::<1>(0, 1), targets)
}

/// Fraction of matching class ids
fn correct<B: Backend>(predicted: Tensor<B, 1, Int>, targets: Tensor<B, 1, Int>) -> f64 {
    let [total] = targets.dims();
    if total == 0 {
        return 0.0;
    }

    let matches = predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<f64>();

    matches / total as f64
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        optim::AdamConfig,
    };
    use pretty_assertions::assert_eq;

    use crate::{
        datasets::EntitySpan,
        models::attention_lstm::Config,
        pipelines::relation_classification::item::Item,
    };

    use super::*;

    type TestBackend = Autodiff<NdArray>;

    fn config() -> Config {
        Config::new(12, 8, 10, 4, 5, 3, 6, 4, 3, vec![2, 3], 4, 8, 5)
    }

    fn batch() -> Batch {
        let items = (0..3)
            .map(|index| {
                let id = index as u32;

                Item::new(
                    index,
                    vec![id + 1, id + 2, id + 3, 0, 0],
                    index % 4,
                    vec![(id % 7) + 1; 15],
                    format!("sentence {index}"),
                    EntitySpan { start: 0, end: 1 },
                    EntitySpan { start: 2, end: 3 },
                    vec![1, 2, 3, 4, 5],
                    vec![3, 4, 5, 6, 7],
                )
            })
            .collect();

        Batch {
            indices: vec![0, 1, 2],
            items,
        }
    }

    fn predictor() -> BurnPredictor<TestBackend, impl Optimizer<Model<TestBackend>, TestBackend>> {
        let device = Default::default();
        let model = config().init::<TestBackend>(&device);
        let optim = AdamConfig::new().init::<TestBackend, Model<TestBackend>>();

        BurnPredictor::new(model, optim, &device)
    }

    fn extension() -> String {
        <CompactRecorder as FileRecorder<TestBackend>>::file_extension().to_string()
    }

    #[test]
    fn trains_and_evaluates_a_batch() {
        let mut predictor = predictor();
        let hyperparameters = Hyperparameters::new(1e-3, 0.7, 0.5);

        let step = predictor.train_step(&batch(), &hyperparameters).unwrap();
        assert!(step.loss.is_finite());
        assert!((0.0..=1.0).contains(&step.accuracy));

        let output = predictor.evaluate(&batch()).unwrap();
        assert_eq!(output.predictions.len(), 3);
        assert!(output.predictions.iter().all(|class| *class < 4));
        assert!(output.loss.is_finite());
    }

    #[test]
    fn pretrained_vectors_are_used_and_stay_trainable() {
        let device = Default::default();
        let model = config()
            .init::<TestBackend>(&device)
            .with_word_vectors(Tensor::ones([12, 6], &device));
        assert_eq!(
            model.word_embedding.weight.val().into_data().convert::<f32>().value,
            vec![1.0; 72]
        );

        let optim = AdamConfig::new().init::<TestBackend, Model<TestBackend>>();
        let mut predictor = BurnPredictor::new(model, optim, &device);
        predictor
            .train_step(&batch(), &Hyperparameters::new(1e-2, 1.0, 1.0))
            .unwrap();

        let table = predictor
            .model()
            .word_embedding
            .weight
            .val()
            .into_data()
            .convert::<f32>()
            .value;
        assert!(table.iter().any(|value| (value - 1.0).abs() > 1e-6));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let predictor = predictor();

        let first = predictor.evaluate(&batch()).unwrap();
        let second = predictor.evaluate(&batch()).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn restores_saved_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let mut trained = predictor();

        let file = trained.save(&dir.path().join("model-0.812-3")).unwrap();
        assert_eq!(file, dir.path().join(format!("model-0.812-3.{}", extension())));
        assert!(file.exists());

        // Records are stored at half precision, so compare two restored copies
        let mut restored = predictor();
        restored.load(&file).unwrap();
        trained.load(&file).unwrap();

        assert_eq!(
            trained.evaluate(&batch()).unwrap(),
            restored.evaluate(&batch()).unwrap()
        );
    }

    #[test]
    fn recorder_paths_keep_score_tags() {
        let (target, file) = recorder_paths::<NdArray>(Path::new("runs/1/model-0.5-10"));

        assert_eq!(target, PathBuf::from("runs/1/model-0.5-10.checkpoint"));
        assert_eq!(file, PathBuf::from("runs/1/model-0.5-10.mpk"));

        let (again, _) = recorder_paths::<NdArray>(&file);
        assert_eq!(again, target);
    }
}
