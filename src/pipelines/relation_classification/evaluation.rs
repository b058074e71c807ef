use burn::data::dataset::Dataset;
use derive_new::new;

use super::{
    batcher::BatchIter,
    item::Item,
    model::Predictor,
};

/// Aggregated results of one pass over the held-out split
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Summed batch loss over the number of full batches
    pub loss: f64,

    /// Summed batch accuracy over the number of full batches
    pub accuracy: f64,

    /// Macro-averaged F1 over every class except the excluded one
    pub f1: f64,

    /// Predicted class ids, in corpus order
    pub predictions: Vec<usize>,

    /// Gold class ids, in corpus order
    pub targets: Vec<usize>,
}

/// Runs a predictor over a whole split in fixed order
#[derive(Clone, Debug, new)]
pub struct Evaluator {
    /// Examples per batch
    pub batch_size: usize,

    /// Size of the closed label set
    pub num_classes: usize,

    /// The catch-all class left out of the F1 average
    pub excluded: usize,
}

impl Evaluator {
    /// Evaluate every example once, in original order.
    ///
    /// Loss and accuracy are divided by `len / batch_size` (integer division), so a trailing
    /// partial batch adds to the sums without adding to the divisor. A split smaller than one
    /// batch divides by 1.
    pub fn evaluate<P, D>(&self, predictor: &P, dataset: &D) -> anyhow::Result<Evaluation>
    where
        P: Predictor + ?Sized,
        D: Dataset<Item>,
    {
        let mut loss = 0.0;
        let mut accuracy = 0.0;
        let mut predictions = Vec::with_capacity(dataset.len());
        let mut targets = Vec::with_capacity(dataset.len());

        for batch in BatchIter::sequential(dataset, self.batch_size) {
            let output = predictor.evaluate(&batch)?;

            loss += output.loss;
            accuracy += output.accuracy;
            predictions.extend(output.predictions);
            targets.extend(batch.labels());
        }

        let divisor = (dataset.len() / self.batch_size).max(1) as f64;
        let labels: Vec<usize> = (0..self.num_classes)
            .filter(|label| *label != self.excluded)
            .collect();

        Ok(Evaluation {
            loss: loss / divisor,
            accuracy: accuracy / divisor,
            f1: macro_f1(&targets, &predictions, &labels),
            predictions,
            targets,
        })
    }
}

/// Unweighted mean of per-class F1 over `labels`.
///
/// A class with no predicted members has precision 0, one with no gold members has recall 0,
/// and F1 is 0 when both are 0. Classes outside `labels` are ignored.
pub fn macro_f1(targets: &[usize], predictions: &[usize], labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }

    let total: f64 = labels
        .iter()
        .map(|label| {
            let mut true_positives = 0usize;
            let mut predicted = 0usize;
            let mut actual = 0usize;

            for (target, prediction) in targets.iter().zip(predictions) {
                let hit_target = target == label;
                let hit_prediction = prediction == label;

                if hit_target && hit_prediction {
                    true_positives += 1;
                }
                predicted += hit_prediction as usize;
                actual += hit_target as usize;
            }

            let precision = ratio(true_positives, predicted);
            let recall = ratio(true_positives, actual);

            if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            }
        })
        .sum();

    total / labels.len() as f64
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use std::{
        cell::RefCell,
        path::{Path, PathBuf},
    };

    use burn::data::dataset::InMemDataset;
    use pretty_assertions::assert_eq;

    use crate::{
        datasets::EntitySpan,
        pipelines::relation_classification::{
            batcher::Batch,
            model::{EvalOutput, Hyperparameters, StepOutput},
        },
    };

    use super::*;

    /// Predicts `label + 1` for every item and reports fixed loss and accuracy
    struct Shifted {
        batch_sizes: RefCell<Vec<usize>>,
    }

    impl Predictor for Shifted {
        fn train_step(&mut self, _: &Batch, _: &Hyperparameters) -> anyhow::Result<StepOutput> {
            unreachable!()
        }

        fn evaluate(&self, batch: &Batch) -> anyhow::Result<EvalOutput> {
            self.batch_sizes.borrow_mut().push(batch.len());

            Ok(EvalOutput::new(
                1.0,
                0.5,
                batch.items.iter().map(|item| (item.label + 1) % 3).collect(),
            ))
        }

        fn save(&self, path: &Path) -> anyhow::Result<PathBuf> {
            Ok(path.to_path_buf())
        }

        fn load(&mut self, _: &Path) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn dataset(len: usize) -> InMemDataset<Item> {
        InMemDataset::new(
            (0..len)
                .map(|index| {
                    Item::new(
                        index,
                        vec![0; 4],
                        index % 3,
                        vec![0; 8],
                        String::new(),
                        EntitySpan::default(),
                        EntitySpan::default(),
                        vec![0; 4],
                        vec![0; 4],
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn divides_by_the_number_of_full_batches() {
        let predictor = Shifted {
            batch_sizes: RefCell::new(Vec::new()),
        };
        let evaluator = Evaluator::new(50, 3, 0);

        let evaluation = evaluator.evaluate(&predictor, &dataset(105)).unwrap();

        assert_eq!(*predictor.batch_sizes.borrow(), vec![50, 50, 5]);
        assert_eq!(evaluation.loss, 1.5);
        assert_eq!(evaluation.accuracy, 0.75);
    }

    #[test]
    fn a_split_smaller_than_one_batch_divides_by_one() {
        let predictor = Shifted {
            batch_sizes: RefCell::new(Vec::new()),
        };

        let evaluation = Evaluator::new(50, 3, 0)
            .evaluate(&predictor, &dataset(7))
            .unwrap();

        assert_eq!(evaluation.loss, 1.0);
    }

    #[test]
    fn predictions_stay_in_corpus_order() {
        let predictor = Shifted {
            batch_sizes: RefCell::new(Vec::new()),
        };

        let evaluation = Evaluator::new(4, 3, 0)
            .evaluate(&predictor, &dataset(10))
            .unwrap();

        assert_eq!(evaluation.targets, vec![0, 1, 2, 0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(evaluation.predictions, vec![1, 2, 0, 1, 2, 0, 1, 2, 0, 1]);
        assert_eq!(evaluation.f1, 0.0);
    }

    #[test]
    fn macro_f1_ignores_the_excluded_class() {
        let f1 = macro_f1(&[1, 2, 2, 0], &[1, 2, 1, 0], &[1, 2]);

        assert!((f1 - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn classes_without_members_count_as_zero() {
        // Class 3 is never predicted nor present, class 2 is never predicted
        let f1 = macro_f1(&[1, 1, 2], &[1, 1, 1], &[1, 2, 3]);

        let class_1 = 2.0 * (2.0 / 3.0) * 1.0 / (2.0 / 3.0 + 1.0);
        assert!((f1 - class_1 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_predictions_score_one() {
        let targets = [0, 1, 2, 3, 1];

        assert_eq!(macro_f1(&targets, &targets, &[1, 2, 3]), 1.0);
    }
}
