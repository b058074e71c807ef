use burn::data::dataset::Dataset;

use crate::datasets::{CorpusError, EntitySpan, RawStreams};

use super::{
    item::Item,
    vocab::{Vocabularies, Vocabulary, PAD_ID},
};

/// Index-aligned encoded streams for one corpus split.
///
/// Row `i` of every field belongs to example `i`.
#[derive(Clone, Debug, Default)]
pub struct EncodedCorpus {
    /// Word ids: `[examples, sentence_length]`
    pub words: Vec<Vec<u32>>,

    /// Gold class ids
    pub labels: Vec<usize>,

    /// Character ids, flattened per example: `[examples, sentence_length * word_length]`
    pub chars: Vec<Vec<u32>>,

    /// Normalized sentence text
    pub text: Vec<String>,

    /// Entity 1 mentions
    pub e1: Vec<EntitySpan>,

    /// Entity 2 mentions
    pub e2: Vec<EntitySpan>,

    /// Position ids relative to entity 1: `[examples, sentence_length]`
    pub dist1: Vec<Vec<u32>>,

    /// Position ids relative to entity 2: `[examples, sentence_length]`
    pub dist2: Vec<Vec<u32>>,
}

impl Dataset<Item> for EncodedCorpus {
    /// Gathers row `index` from every stream
    fn get(&self, index: usize) -> Option<Item> {
        Some(Item {
            index,
            words: self.words.get(index)?.clone(),
            label: *self.labels.get(index)?,
            chars: self.chars.get(index)?.clone(),
            text: self.text.get(index)?.clone(),
            e1: *self.e1.get(index)?,
            e2: *self.e2.get(index)?,
            dist1: self.dist1.get(index)?.clone(),
            dist2: self.dist2.get(index)?.clone(),
        })
    }

    fn len(&self) -> usize {
        self.labels.len()
    }
}

/// Encodes raw streams with vocabularies fit on the training split
#[derive(Clone, Debug)]
pub struct FeatureEncoder {
    /// The frozen vocabularies
    pub vocabularies: Vocabularies,

    /// Fixed number of tokens per sentence
    pub sentence_length: usize,

    /// Fixed number of characters per token
    pub word_length: usize,
}

impl FeatureEncoder {
    /// Fit the word, character and position vocabularies on a training split
    pub fn fit(train: &RawStreams, sentence_length: usize, word_length: usize) -> Self {
        let words = Vocabulary::fit(train.text.iter().map(|text| text.split_whitespace()));
        let chars = Vocabulary::fit(train.chars.iter().flatten());
        let positions = Vocabulary::fit(train.dist1.iter().chain(train.dist2.iter()));

        log::info!("Text Vocabulary Size: {}", words.len());
        log::info!("Char Vocabulary Size: {}", chars.len());
        log::info!("Position Vocabulary Size: {}", positions.len());

        Self {
            vocabularies: Vocabularies {
                words,
                chars,
                positions,
            },
            sentence_length,
            word_length,
        }
    }

    /// Reuse previously fit vocabularies
    pub fn from_vocabularies(
        vocabularies: Vocabularies,
        sentence_length: usize,
        word_length: usize,
    ) -> Self {
        Self {
            vocabularies,
            sentence_length,
            word_length,
        }
    }

    /// Encode a split into fixed-width aligned streams. Each split is encoded from its own
    /// streams; the vocabularies are never modified.
    pub fn encode(&self, streams: &RawStreams) -> Result<EncodedCorpus, EncodeError> {
        streams.check_aligned()?;

        let tokens: Vec<Vec<&str>> = streams
            .text
            .iter()
            .map(|text| text.split_whitespace().collect())
            .collect();

        let encoded = EncodedCorpus {
            words: self.vocabularies.words.transform(&tokens, self.sentence_length),
            labels: streams.labels.clone(),
            chars: self.encode_chars(&streams.chars),
            text: streams.text.clone(),
            e1: streams.e1.clone(),
            e2: streams.e2.clone(),
            dist1: self
                .vocabularies
                .positions
                .transform(&streams.dist1, self.sentence_length),
            dist2: self
                .vocabularies
                .positions
                .transform(&streams.dist2, self.sentence_length),
        };

        let expected = streams.len();
        for (stream, rows) in [
            ("words", encoded.words.len()),
            ("chars", encoded.chars.len()),
            ("dist1", encoded.dist1.len()),
            ("dist2", encoded.dist2.len()),
        ] {
            if rows != expected {
                return Err(EncodeError::RowCount {
                    stream,
                    rows,
                    expected,
                });
            }
        }

        Ok(encoded)
    }

    /// Encode each sentence's characters to `sentence_length * word_length` ids
    fn encode_chars(&self, sentences: &[Vec<Vec<String>>]) -> Vec<Vec<u32>> {
        let width = self.sentence_length * self.word_length;

        sentences
            .iter()
            .map(|words| {
                let mut row: Vec<u32> = words
                    .iter()
                    .take(self.sentence_length)
                    .flat_map(|word| self.vocabularies.chars.encode(word, self.word_length))
                    .collect();

                row.resize(width, PAD_ID);
                row
            })
            .collect()
    }
}

/// Encode Error
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    /// The raw streams were not aligned
    #[error(transparent)]
    Corpus(#[from] CorpusError),

    /// An encoded stream lost or gained rows
    #[error("encoded {stream} has {rows} rows, expected {expected}")]
    RowCount {
        /// The stream name
        stream: &'static str,

        /// The encoded row count
        rows: usize,

        /// The number of examples
        expected: usize,
    },
}
