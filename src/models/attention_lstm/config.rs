use burn::{
    nn::{
        conv::Conv1dConfig, EmbeddingConfig, LinearConfig, LstmConfig, PaddingConfig1d,
    },
    tensor::backend::Backend,
};

use crate::pipelines::relation_classification::{
    config::{Training, Validated},
    vocab::Vocabularies,
};

use super::Model;

/// The Model Configuration
#[derive(burn::config::Config)]
pub struct Config {
    /// Size of the word vocabulary
    pub vocab_size: usize,
    /// Size of the character vocabulary
    pub char_vocab_size: usize,
    /// Size of the relative position vocabulary, shared by both entities
    pub dist_vocab_size: usize,
    /// Number of relation classes
    pub num_classes: usize,
    /// Tokens per sentence
    pub sentence_length: usize,
    /// Characters per token
    pub word_length: usize,
    /// Word embedding dimension
    pub embedding_size: usize,
    /// Character embedding dimension
    pub char_embedding_size: usize,
    /// Position embedding dimension
    pub dist_embedding_size: usize,
    /// Character convolution widths
    pub filter_sizes: Vec<usize>,
    /// Filters per convolution width
    pub num_filters: usize,
    /// LSTM hidden state size
    pub hidden_size: usize,
    /// Attention projection size
    pub attention_size: usize,
}

impl Config {
    /// Size the model for a training run and its fitted vocabularies
    pub fn for_training(
        training: &Training,
        validated: &Validated,
        vocabularies: &Vocabularies,
        num_classes: usize,
    ) -> Self {
        Self::new(
            vocabularies.words.len(),
            vocabularies.chars.len(),
            vocabularies.positions.len(),
            num_classes,
            training.max_sentence_length,
            training.max_word_length,
            training.embedding_size,
            training.char_embedding_size,
            training.dist_embedding_size,
            validated.filter_sizes.clone(),
            training.num_filters,
            training.hidden_size,
            training.attention_size,
        )
    }

    /// Width of one timestep fed to the LSTM
    pub fn input_size(&self) -> usize {
        self.embedding_size
            + self.num_filters * self.filter_sizes.len()
            + 2 * self.dist_embedding_size
    }

    /// Initialize the model
    pub fn init<B: Backend>(&self, device: &B::Device) -> Model<B> {
        let char_convs = self
            .filter_sizes
            .iter()
            .map(|&width| {
                Conv1dConfig::new(self.char_embedding_size, self.num_filters, width)
                    .with_padding(PaddingConfig1d::Explicit(width / 2))
                    .init(device)
            })
            .collect();

        Model {
            word_embedding: EmbeddingConfig::new(self.vocab_size, self.embedding_size).init(device),
            char_embedding: EmbeddingConfig::new(self.char_vocab_size, self.char_embedding_size)
                .init(device),
            dist_embedding: EmbeddingConfig::new(self.dist_vocab_size, self.dist_embedding_size)
                .init(device),
            char_convs,
            lstm: LstmConfig::new(self.input_size(), self.hidden_size, true).init(device),
            attention: LinearConfig::new(self.hidden_size, self.attention_size).init(device),
            attention_context: LinearConfig::new(self.attention_size, 1)
                .with_bias(false)
                .init(device),
            output: LinearConfig::new(self.hidden_size, self.num_classes).init(device),
            num_classes: self.num_classes,
            sentence_length: self.sentence_length,
            word_length: self.word_length,
        }
    }
}
