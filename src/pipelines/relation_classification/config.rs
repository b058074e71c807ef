use burn::LearningRate;

use crate::cli::{
    datasets::{Dataset, DatasetError},
    embeddings::{EmbeddingSource, EmbeddingSourceError},
    formats::{LabelFormat, LabelFormatError},
};

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Training {
    /// Path to the training split
    pub train_path: String,

    /// Path to the test split
    pub test_path: String,

    /// The corpus format (e.g., "semeval2010")
    #[config(default = "\"semeval2010\".to_string()")]
    pub dataset_name: String,

    /// Number of tokens kept per sentence
    #[config(default = 90)]
    pub max_sentence_length: usize,

    /// Number of characters kept per token
    #[config(default = 15)]
    pub max_word_length: usize,

    /// Pretrained word vectors: "none", "word2vec", "glove100" or "glove300"
    #[config(default = "\"none\".to_string()")]
    pub embeddings: String,

    /// Override for the pretrained vector file location
    #[config(default = "None")]
    pub embeddings_path: Option<String>,

    /// Word embedding dimension
    #[config(default = 300)]
    pub embedding_size: usize,

    /// Character embedding dimension
    #[config(default = 50)]
    pub char_embedding_size: usize,

    /// Position embedding dimension
    #[config(default = 50)]
    pub dist_embedding_size: usize,

    /// Comma-separated character convolution widths
    #[config(default = "\"3\".to_string()")]
    pub filter_sizes: String,

    /// Number of filters per convolution width
    #[config(default = 50)]
    pub num_filters: usize,

    /// LSTM hidden state size
    #[config(default = 300)]
    pub hidden_size: usize,

    /// Attention projection size
    #[config(default = 50)]
    pub attention_size: usize,

    /// L2 regularization strength, applied as weight decay
    #[config(default = 1e-5)]
    pub l2_reg_lambda: f64,

    /// Batch size
    #[config(default = 20)]
    pub batch_size: usize,

    /// Number of epochs
    #[config(default = 100)]
    pub num_epochs: usize,

    /// Initial learning rate
    #[config(default = 1e-3)]
    pub learning_rate: LearningRate,

    /// Keep probability for the recurrent input
    #[config(default = 0.7)]
    pub rnn_dropout_keep_prob: f64,

    /// Keep probability for the rest of the network
    #[config(default = 0.5)]
    pub dropout_keep_prob: f64,

    /// Number of model checkpoints kept on disk
    #[config(default = 5)]
    pub num_checkpoints: usize,

    /// Log training progress every this many steps
    #[config(default = 10)]
    pub display_every: usize,

    /// Evaluate on the test split every this many steps
    #[config(default = 100)]
    pub evaluate_every: usize,

    /// Fall back to the CPU when no GPU is available
    #[config(default = true)]
    pub allow_soft_placement: bool,

    /// Log the selected device
    #[config(default = false)]
    pub log_device_placement: bool,

    /// Let GPU memory grow on demand
    #[config(default = true)]
    pub gpu_allow_growth: bool,

    /// Seed for batch shuffling and model initialization
    #[config(default = 42)]
    pub seed: u64,

    /// Scorer program and leading arguments; the prediction and gold paths are appended.
    /// Empty disables the scorer. The default SemEval perl scorer only reads
    /// `<id>\t<relation>` lines, so it needs `output_format = "semeval"`.
    #[config(
        default = "vec![\"perl\".to_string(), \"SemEval2010_task8_all_data/SemEval2010_task8_scorer-v1.2/semeval2010_task8_scorer-v1.2.pl\".to_string()]"
    )]
    pub scorer_command: Vec<String>,

    /// Gold file handed to the scorer. Defaults to the answer key written into the run directory.
    #[config(default = "None")]
    pub scorer_gold_path: Option<String>,

    /// Seconds to wait for the scorer before giving up
    #[config(default = 60)]
    pub scorer_timeout_secs: u64,

    /// Prediction file format: "labels" or "semeval"
    #[config(default = "\"labels\".to_string()")]
    pub output_format: String,

    /// Parent directory for timestamped run directories
    #[config(default = "\"runs\".to_string()")]
    pub runs_dir: String,
}

/// Selectors and lists parsed out of a [Training] config
#[derive(Clone, Debug, PartialEq)]
pub struct Validated {
    /// The corpus format
    pub dataset: Dataset,

    /// Pretrained vectors source
    pub embeddings: EmbeddingSource,

    /// Character convolution widths
    pub filter_sizes: Vec<usize>,

    /// Prediction file format
    pub output_format: LabelFormat,
}

impl Training {
    /// Check every option once, before any data is loaded
    pub fn validate(&self) -> Result<Validated, ConfigError> {
        let sizes = [
            ("max_sentence_length", self.max_sentence_length),
            ("max_word_length", self.max_word_length),
            ("embedding_size", self.embedding_size),
            ("char_embedding_size", self.char_embedding_size),
            ("dist_embedding_size", self.dist_embedding_size),
            ("num_filters", self.num_filters),
            ("hidden_size", self.hidden_size),
            ("attention_size", self.attention_size),
            ("batch_size", self.batch_size),
            ("num_checkpoints", self.num_checkpoints),
            ("display_every", self.display_every),
            ("evaluate_every", self.evaluate_every),
        ];

        if let Some((field, _)) = sizes.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero(field));
        }

        for (field, value) in [
            ("rnn_dropout_keep_prob", self.rnn_dropout_keep_prob),
            ("dropout_keep_prob", self.dropout_keep_prob),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::KeepProbability { field, value });
            }
        }

        if !(self.learning_rate > 0.0) {
            return Err(ConfigError::LearningRate(self.learning_rate));
        }

        Ok(Validated {
            dataset: Dataset::try_from(self.dataset_name.as_str())?,
            embeddings: EmbeddingSource::try_from(self.embeddings.as_str())?,
            filter_sizes: parse_filter_sizes(&self.filter_sizes)?,
            output_format: LabelFormat::try_from(self.output_format.as_str())?,
        })
    }

    /// True when the configured scorer is the SemEval perl script but predictions are written as
    /// bare class ids, which it cannot parse
    pub fn scorer_expects_semeval(&self, validated: &Validated) -> bool {
        let semeval_scorer = self
            .scorer_command
            .iter()
            .any(|arg| arg.to_lowercase().contains("semeval2010_task8_scorer"));

        semeval_scorer && validated.output_format != LabelFormat::SemEval
    }
}

/// Parse a comma-separated list of positive convolution widths
pub fn parse_filter_sizes(value: &str) -> Result<Vec<usize>, ConfigError> {
    let sizes = value
        .split(',')
        .map(|size| match size.trim().parse::<usize>() {
            Ok(size) if size > 0 => Ok(size),
            _ => Err(ConfigError::FilterSizes(value.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sizes)
}

/// Config Error
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A size or cadence option set to zero
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// A keep probability outside of (0, 1]
    #[error("{field} must be in (0, 1], got {value}")]
    KeepProbability {
        /// The option name
        field: &'static str,

        /// The configured value
        value: f64,
    },

    /// A learning rate that is not positive
    #[error("learning_rate must be positive, got {0}")]
    LearningRate(f64),

    /// An unparsable filter size list
    #[error("invalid filter sizes {0:?}, expected a comma-separated list of positive integers")]
    FilterSizes(String),

    /// Unknown corpus format
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    /// Unknown embedding source
    #[error(transparent)]
    Embeddings(#[from] EmbeddingSourceError),

    /// Unknown prediction file format
    #[error(transparent)]
    OutputFormat(#[from] LabelFormatError),
}
