use std::marker::PhantomData;

use burn::{
    data::{dataloader, dataset::Dataset},
    tensor::{backend::Backend, Int, Tensor},
};
use derive_new::new;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::utils::tensors::{int_matrix, int_vector};

use super::item::Item;

/// A slice of aligned items. `indices[i]` is the original position of `items[i]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch<I = Item> {
    /// Original example indices, in batch order
    pub indices: Vec<usize>,

    /// Items gathered at those indices
    pub items: Vec<I>,
}

impl<I> Batch<I> {
    /// Returns the number of items in the batch
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the batch holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Batch<Item> {
    /// Gold class ids in batch order
    pub fn labels(&self) -> Vec<usize> {
        self.items.iter().map(|item| item.label).collect()
    }
}

/// The number of batches produced for `len` examples
pub fn num_batches(len: usize, batch_size: usize, num_epochs: usize) -> usize {
    num_epochs * len.div_ceil(batch_size)
}

/// A lazy, finite sequence of batches over every epoch.
///
/// Each epoch draws one permutation of the example indices (when shuffling) and gathers every
/// stream through it, so items stay aligned across streams. The last batch of an epoch may be
/// smaller than `batch_size`. Once exhausted the iterator stays exhausted.
pub struct BatchIter<'a, I, D: Dataset<I>> {
    dataset: &'a D,
    batch_size: usize,
    num_epochs: usize,
    shuffle: bool,
    rng: StdRng,
    epoch: usize,
    order: Vec<usize>,
    cursor: usize,
    produced: usize,
    _item: PhantomData<I>,
}

impl<'a, I, D: Dataset<I>> BatchIter<'a, I, D> {
    /// Create a batch iterator
    ///
    /// # Panics
    ///
    /// Panics if `batch_size` is 0.
    pub fn new(dataset: &'a D, batch_size: usize, num_epochs: usize, shuffle: bool, seed: u64) -> Self {
        assert!(batch_size > 0, "batch size must be non-zero");

        Self {
            dataset,
            batch_size,
            num_epochs,
            shuffle,
            rng: StdRng::seed_from_u64(seed),
            epoch: 0,
            order: Vec::new(),
            cursor: 0,
            produced: 0,
            _item: PhantomData,
        }
    }

    /// A single pass in original order
    pub fn sequential(dataset: &'a D, batch_size: usize) -> Self {
        Self::new(dataset, batch_size, 1, false, 0)
    }

    /// The epoch currently being iterated, starting at 1
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    fn start_epoch(&mut self) {
        self.order = (0..self.dataset.len()).collect();
        if self.shuffle {
            self.order.shuffle(&mut self.rng);
        }

        self.cursor = 0;
        self.epoch += 1;
    }
}

impl<'a, I, D: Dataset<I>> Iterator for BatchIter<'a, I, D> {
    type Item = Batch<I>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            if self.epoch >= self.num_epochs || self.dataset.is_empty() {
                return None;
            }

            self.start_epoch();
        }

        let end = (self.cursor + self.batch_size).min(self.order.len());
        let indices = self.order[self.cursor..end].to_vec();
        self.cursor = end;
        self.produced += 1;

        let items = indices
            .iter()
            .filter_map(|&index| self.dataset.get(index))
            .collect();

        Some(Batch { indices, items })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let total = num_batches(self.dataset.len(), self.batch_size, self.num_epochs);
        let remaining = total.saturating_sub(self.produced);

        (remaining, Some(remaining))
    }
}

impl<'a, I, D: Dataset<I>> ExactSizeIterator for BatchIter<'a, I, D> {}

/// A batch of feature tensors with gold targets
#[derive(Clone, Debug, new)]
pub struct Train<B: Backend> {
    /// Word ids: `[batch_size, sentence_length]`
    pub words: Tensor<B, 2, Int>,

    /// Character ids: `[batch_size, sentence_length * word_length]`
    pub chars: Tensor<B, 2, Int>,

    /// Entity 1 position ids: `[batch_size, sentence_length]`
    pub dist1: Tensor<B, 2, Int>,

    /// Entity 2 position ids: `[batch_size, sentence_length]`
    pub dist2: Tensor<B, 2, Int>,

    /// Class ids: `[batch_size]`
    pub targets: Tensor<B, 1, Int>,
}

/// Converts encoded items into tensors on a device
#[derive(Clone, Debug, new)]
pub struct Batcher<B: Backend> {
    /// Fixed number of tokens per sentence
    pub sentence_length: usize,

    /// Fixed number of characters per token
    pub word_length: usize,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    pub device: B::Device,
}

impl<B: Backend> dataloader::batcher::Batcher<Item, Train<B>> for Batcher<B> {
    /// Stacks every stream of the items, keeping their order
    fn batch(&self, items: Vec<Item>) -> Train<B> {
        let words: Vec<&[u32]> = items.iter().map(|item| item.words.as_slice()).collect();
        let chars: Vec<&[u32]> = items.iter().map(|item| item.chars.as_slice()).collect();
        let dist1: Vec<&[u32]> = items.iter().map(|item| item.dist1.as_slice()).collect();
        let dist2: Vec<&[u32]> = items.iter().map(|item| item.dist2.as_slice()).collect();
        let targets: Vec<usize> = items.iter().map(|item| item.label).collect();

        let char_width = self.sentence_length * self.word_length;

        Train {
            words: int_matrix(&words, self.sentence_length, &self.device),
            chars: int_matrix(&chars, char_width, &self.device),
            dist1: int_matrix(&dist1, self.sentence_length, &self.device),
            dist2: int_matrix(&dist2, self.sentence_length, &self.device),
            targets: int_vector(&targets, &self.device),
        }
    }
}
