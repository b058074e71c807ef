use async_trait::async_trait;

/// The SemEval-2010 Task 8 relation corpus
pub mod semeval;

/// A token span marking one entity mention, as `start..end` token indices
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EntitySpan {
    /// Index of the first token of the mention
    pub start: usize,

    /// Index one past the last token of the mention
    pub end: usize,
}

impl EntitySpan {
    /// The signed offset of token `index` from this mention. Tokens inside the mention are at 0.
    pub fn distance(&self, index: usize) -> i64 {
        if index < self.start {
            index as i64 - self.start as i64
        } else if index >= self.end {
            index as i64 - (self.end as i64 - 1)
        } else {
            0
        }
    }
}

/// Seven index-aligned streams loaded from one split of a corpus. Entry `i` of every stream
/// describes the same example.
#[derive(Clone, Debug, Default)]
pub struct RawStreams {
    /// Normalized sentence text, with tokens separated by single spaces
    pub text: Vec<String>,

    /// Each sentence as a list of tokens, each token as a list of single-character symbols
    pub chars: Vec<Vec<Vec<String>>>,

    /// Gold class ids
    pub labels: Vec<usize>,

    /// Entity 1 mentions
    pub e1: Vec<EntitySpan>,

    /// Entity 2 mentions
    pub e2: Vec<EntitySpan>,

    /// Relative distance tokens from entity 1, one per sentence token
    pub dist1: Vec<Vec<String>>,

    /// Relative distance tokens from entity 2, one per sentence token
    pub dist2: Vec<Vec<String>>,
}

impl RawStreams {
    /// Returns the number of examples
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns true if there are no examples
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Checks that every stream holds exactly one entry per example
    pub fn check_aligned(&self) -> Result<(), CorpusError> {
        let expected = self.len();
        let streams = [
            ("text", self.text.len()),
            ("chars", self.chars.len()),
            ("e1", self.e1.len()),
            ("e2", self.e2.len()),
            ("dist1", self.dist1.len()),
            ("dist2", self.dist2.len()),
        ];

        for (name, len) in streams {
            if len != expected {
                return Err(CorpusError::Misaligned {
                    stream: name.to_string(),
                    len,
                    expected,
                });
            }
        }

        Ok(())
    }
}

/// A corpus split which can be loaded into aligned raw streams
#[async_trait]
pub trait LoadableCorpus {
    /// The closed label set, with the catch-all class first
    fn labels(&self) -> &'static [&'static str];

    /// Load one split from the given path
    async fn load(&self, path: &str) -> Result<RawStreams, CorpusError>;
}

/// Corpus Error
#[derive(thiserror::Error, Debug)]
pub enum CorpusError {
    /// The corpus file could not be read
    #[error("unable to read corpus file {path}: {source}")]
    Io {
        /// The corpus path
        path: String,

        /// The underlying error
        source: std::io::Error,
    },

    /// A sentence was missing one of its entity markers
    #[error("line {line}: missing entity marker {marker}")]
    MissingEntity {
        /// The 1-based line number
        line: usize,

        /// The marker that was not found
        marker: &'static str,
    },

    /// A relation name outside of the label set
    #[error("line {line}: unknown relation {relation}")]
    UnknownRelation {
        /// The 1-based line number
        line: usize,

        /// The relation name
        relation: String,
    },

    /// A sentence record with no relation line after it
    #[error("line {line}: sentence has no relation line")]
    MissingRelation {
        /// The 1-based line number
        line: usize,
    },

    /// Streams with differing lengths
    #[error("stream {stream} has {len} entries, expected {expected}")]
    Misaligned {
        /// The stream name
        stream: String,

        /// Its length
        len: usize,

        /// The number of examples
        expected: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_zero_inside_the_mention() {
        let span = EntitySpan { start: 2, end: 4 };

        let distances: Vec<i64> = (0..6).map(|i| span.distance(i)).collect();

        assert_eq!(distances, vec![-2, -1, 0, 0, 1, 2]);
    }

    #[test]
    fn misaligned_streams_are_reported() {
        let streams = RawStreams {
            text: vec!["a b".to_string()],
            labels: vec![0, 1],
            ..Default::default()
        };

        let err = streams.check_aligned().unwrap_err();

        assert!(matches!(err, CorpusError::Misaligned { len: 1, expected: 2, .. }));
    }
}
