use std::fmt::Display;

/// Where pretrained word vectors come from
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EmbeddingSource {
    /// Randomly initialized word embeddings
    None,

    /// GoogleNews word2vec vectors, binary format
    Word2vec,

    /// 100-dimensional GloVe vectors, text format
    Glove100,

    /// 300-dimensional GloVe vectors, text format
    Glove300,
}

impl EmbeddingSource {
    /// The vector file used when no explicit path is configured
    pub fn default_path(&self) -> Option<&'static str> {
        match self {
            EmbeddingSource::None => None,
            EmbeddingSource::Word2vec => Some("resource/GoogleNews-vectors-negative300.bin"),
            EmbeddingSource::Glove100 => Some("resource/glove.6B.100d.txt"),
            EmbeddingSource::Glove300 => Some("resource/glove.840B.300d.txt"),
        }
    }

    /// Returns true for sources stored in word2vec's binary layout
    pub fn is_binary(&self) -> bool {
        matches!(self, EmbeddingSource::Word2vec)
    }
}

impl TryFrom<&str> for EmbeddingSource {
    type Error = EmbeddingSourceError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "none" | "" => Ok(EmbeddingSource::None),
            "word2vec" => Ok(EmbeddingSource::Word2vec),
            "glove100" => Ok(EmbeddingSource::Glove100),
            "glove300" => Ok(EmbeddingSource::Glove300),
            _ => Err(EmbeddingSourceError::Unknown(value.to_string())),
        }
    }
}

impl Display for EmbeddingSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EmbeddingSource::None => "none",
            EmbeddingSource::Word2vec => "word2vec",
            EmbeddingSource::Glove100 => "glove100",
            EmbeddingSource::Glove300 => "glove300",
        };

        write!(f, "{}", name)
    }
}

/// Embedding Source Error
#[derive(thiserror::Error, Debug)]
pub enum EmbeddingSourceError {
    /// No source found for the given string
    #[error("no embedding source found for {0}")]
    Unknown(String),
}
