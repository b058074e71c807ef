use burn::{
    module::{Module, Param},
    nn::{conv::Conv1d, loss::CrossEntropyLossConfig, DropoutConfig, Embedding, Linear, Lstm},
    tensor::{
        activation::{relu, softmax, tanh},
        backend::Backend,
        Int, Tensor,
    },
    train::ClassificationOutput,
};

use crate::pipelines::relation_classification::batcher::Train;

/// Dropout keep probabilities for one forward pass
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Keep {
    /// Applied to the LSTM input
    pub rnn: f64,

    /// Applied to the attention output
    pub output: f64,
}

impl Keep {
    /// No dropout
    pub const ALL: Keep = Keep {
        rnn: 1.0,
        output: 1.0,
    };
}

/// Attention-based LSTM over word, character and entity position features
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Word embedding table
    pub word_embedding: Embedding<B>,

    /// Character embedding table
    pub char_embedding: Embedding<B>,

    /// Position embedding table, shared by both entities
    pub dist_embedding: Embedding<B>,

    /// One convolution per character filter width
    pub char_convs: Vec<Conv1d<B>>,

    /// Sequence encoder
    pub lstm: Lstm<B>,

    /// Attention projection
    pub attention: Linear<B>,

    /// Attention scoring vector
    pub attention_context: Linear<B>,

    /// Linear layer for relation classification
    pub output: Linear<B>,

    /// Total number of classes
    pub num_classes: usize,

    /// Tokens per sentence
    pub sentence_length: usize,

    /// Characters per token
    pub word_length: usize,
}

/// Define model behavior
impl<B: Backend> Model<B> {
    /// Replace the word embedding table, keeping its shape
    pub fn with_word_vectors(mut self, vectors: Tensor<B, 2>) -> Self {
        self.word_embedding.weight = Param::from_tensor(vectors);
        self
    }

    /// Class scores, `[batch_size, num_classes]`
    pub fn logits(&self, input: &Train<B>, keep: Keep) -> Tensor<B, 2> {
        let [batch_size, sentence_length] = input.words.dims();

        let words = self.word_embedding.forward(input.words.clone());
        let chars = self.char_features(input.chars.clone(), batch_size, sentence_length);
        let dist1 = self.dist_embedding.forward(input.dist1.clone());
        let dist2 = self.dist_embedding.forward(input.dist2.clone());

        let features = dropout(Tensor::cat(vec![words, chars, dist1, dist2], 2), keep.rnn);

        // [batch_size, sentence_length, hidden_size]
        let (_, hidden) = self.lstm.forward(features, None);

        let scores = self
            .attention_context
            .forward(tanh(self.attention.forward(hidden.clone())));
        let padding = input
            .words
            .clone()
            .equal_elem(0)
            .reshape([batch_size, sentence_length, 1]);
        let weights = softmax(scores.mask_fill(padding, -1e9), 1);

        let [_, _, hidden_size] = hidden.dims();
        let attended = (hidden * weights)
            .sum_dim(1)
            .reshape([batch_size, hidden_size]);

        self.output.forward(dropout(tanh(attended), keep.output))
    }

    /// Max-pooled character convolutions, `[batch_size, sentence_length, filters]`
    fn char_features(
        &self,
        chars: Tensor<B, 2, Int>,
        batch_size: usize,
        sentence_length: usize,
    ) -> Tensor<B, 3> {
        let tokens = batch_size * sentence_length;

        // [tokens, char_embedding_size, word_length]
        let embedded = self
            .char_embedding
            .forward(chars.reshape([tokens, self.word_length]))
            .swap_dims(1, 2);

        let pooled = self
            .char_convs
            .iter()
            .map(|conv| {
                let [filters, _, _] = conv.weight.dims();

                relu(conv.forward(embedded.clone()))
                    .max_dim(2)
                    .reshape([batch_size, sentence_length, filters])
            })
            .collect();

        Tensor::cat(pooled, 2)
    }

    /// Defines forward pass for training
    pub fn forward(&self, input: Train<B>, keep: Keep) -> ClassificationOutput<B> {
        let output = self.logits(&input, keep);
        let targets = input.targets;

        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput {
            loss,
            output,
            targets,
        }
    }
}

/// Dropout driven by a keep probability; a no-op at 1.0
fn dropout<B: Backend, const D: usize>(input: Tensor<B, D>, keep: f64) -> Tensor<B, D> {
    if keep >= 1.0 {
        return input;
    }

    DropoutConfig::new(1.0 - keep).init().forward(input)
}

#[cfg(test)]
mod tests {
    use burn::backend::{Autodiff, NdArray};

    use super::*;

    #[test]
    fn full_keep_probability_leaves_input_untouched() {
        let input = Tensor::<Autodiff<NdArray>, 2>::ones([4, 4], &Default::default());

        let output = dropout(input, 1.0).into_data().convert::<f32>().value;

        assert!(output.iter().all(|value| *value == 1.0));
    }

    #[test]
    fn dropout_zeroes_and_rescales_while_training() {
        let input = Tensor::<Autodiff<NdArray>, 2>::ones([50, 50], &Default::default());

        let output = dropout(input, 0.5).into_data().convert::<f32>().value;

        assert!(output.iter().any(|value| *value == 0.0));
        assert!(output.iter().any(|value| (value - 2.0).abs() < 1e-6));
        assert!(output
            .iter()
            .all(|value| *value == 0.0 || (value - 2.0).abs() < 1e-6));
    }
}
