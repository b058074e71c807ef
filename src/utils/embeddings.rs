use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    cli::embeddings::EmbeddingSource,
    pipelines::relation_classification::vocab::{Vocabulary, PAD_ID},
};

/// Rows for words without a pretrained vector are drawn from `[-SCALE, SCALE]`
const SCALE: f32 = 0.25;

/// A `[rows, dim]` word embedding matrix, row-major
#[derive(Clone, Debug, PartialEq)]
pub struct WordVectors {
    /// One row per vocabulary id
    pub rows: usize,

    /// Vector width
    pub dim: usize,

    /// Row-major values
    pub values: Vec<f32>,

    /// Number of vocabulary words found in the vector file
    pub found: usize,
}

impl WordVectors {
    fn random(rows: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let values = (0..rows * dim).map(|_| rng.gen_range(-SCALE..=SCALE)).collect();

        Self {
            rows,
            dim,
            values,
            found: 0,
        }
    }

    fn set(&mut self, id: u32, vector: &[f32]) {
        let start = id as usize * self.dim;
        self.values[start..start + self.dim].copy_from_slice(vector);
        self.found += 1;
    }

    /// The vector for one id
    pub fn row(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dim;
        &self.values[start..start + self.dim]
    }
}

/// Build an embedding matrix for `vocabulary` from the vector file at `path`
pub fn load(
    source: EmbeddingSource,
    path: &Path,
    vocabulary: &Vocabulary,
    dim: usize,
    seed: u64,
) -> Result<WordVectors, EmbeddingError> {
    let file = File::open(path).map_err(|source| EmbeddingError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);

    let vectors = if source.is_binary() {
        read_word2vec(reader, vocabulary, dim, seed)?
    } else {
        read_glove(reader, vocabulary, dim, seed)?
    };

    log::info!(
        "Loaded {} pre-trained {} vectors for {} words",
        vectors.found,
        source,
        vectors.rows
    );

    Ok(vectors)
}

/// Read whitespace-separated text vectors, one word per line. Words may contain spaces, so the
/// vector is taken from the last `dim` fields.
pub fn read_glove<R: BufRead>(
    reader: R,
    vocabulary: &Vocabulary,
    dim: usize,
    seed: u64,
) -> Result<WordVectors, EmbeddingError> {
    let mut vectors = WordVectors::random(vocabulary.len(), dim, seed);
    let mut vector = Vec::with_capacity(dim);

    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(EmbeddingError::Read)?;
        let fields: Vec<&str> = line.split_whitespace().collect();

        if fields.is_empty() {
            continue;
        }
        if fields.len() <= dim {
            return Err(EmbeddingError::Dimension {
                expected: dim,
                found: fields.len().saturating_sub(1),
            });
        }

        let (word, values) = fields.split_at(fields.len() - dim);
        let id = vocabulary.id(&word.join(" "));
        if id == PAD_ID {
            continue;
        }

        vector.clear();
        for value in values {
            vector.push(
                value
                    .parse::<f32>()
                    .map_err(|_| EmbeddingError::Parse { line: number + 1 })?,
            );
        }

        vectors.set(id, &vector);
    }

    Ok(vectors)
}

/// Read the word2vec binary layout: a `"<count> <dim>"` header line, then for each word its
/// bytes up to a space followed by `dim` little-endian `f32`s.
pub fn read_word2vec<R: BufRead>(
    mut reader: R,
    vocabulary: &Vocabulary,
    dim: usize,
    seed: u64,
) -> Result<WordVectors, EmbeddingError> {
    let mut header = String::new();
    reader.read_line(&mut header).map_err(EmbeddingError::Read)?;

    let mut fields = header.split_whitespace().map(str::parse::<usize>);
    let (count, width) = match (fields.next(), fields.next()) {
        (Some(Ok(count)), Some(Ok(width))) => (count, width),
        _ => return Err(EmbeddingError::Header(header.trim().to_string())),
    };

    if width != dim {
        return Err(EmbeddingError::Dimension {
            expected: dim,
            found: width,
        });
    }

    let mut vectors = WordVectors::random(vocabulary.len(), dim, seed);
    let mut word = Vec::new();
    let mut bytes = vec![0u8; dim * 4];
    let mut vector = vec![0f32; dim];

    for _ in 0..count {
        word.clear();
        reader
            .read_until(b' ', &mut word)
            .map_err(EmbeddingError::Read)?;

        if word.last() != Some(&b' ') {
            return Err(EmbeddingError::Truncated);
        }

        reader.read_exact(&mut bytes).map_err(|err| match err.kind() {
            io::ErrorKind::UnexpectedEof => EmbeddingError::Truncated,
            _ => EmbeddingError::Read(err),
        })?;

        let text = String::from_utf8_lossy(&word);
        let id = vocabulary.id(text.trim_start_matches('\n').trim_end());
        if id == PAD_ID {
            continue;
        }

        for (value, chunk) in vector.iter_mut().zip(bytes.chunks_exact(4)) {
            *value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }

        vectors.set(id, &vector);
    }

    Ok(vectors)
}

/// Embedding Error
#[derive(thiserror::Error, Debug)]
pub enum EmbeddingError {
    /// The vector file could not be opened
    #[error("unable to open {path}: {source}")]
    Io {
        /// The file path
        path: String,

        /// The underlying error
        source: io::Error,
    },

    /// Reading failed part way
    #[error("unable to read vectors: {0}")]
    Read(io::Error),

    /// The word2vec header is not `"<count> <dim>"`
    #[error("invalid word2vec header {0:?}")]
    Header(String),

    /// Vectors have a different width than the word embedding
    #[error("expected {expected}-dimensional vectors, found {found}")]
    Dimension {
        /// The configured embedding size
        expected: usize,

        /// The width in the file
        found: usize,
    },

    /// A vector component is not a number
    #[error("invalid vector on line {line}")]
    Parse {
        /// 1-based line number
        line: usize,
    },

    /// The file ends in the middle of an entry
    #[error("vector file is truncated")]
    Truncated,
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    fn vocabulary() -> Vocabulary {
        Vocabulary::fit([vec!["the", "cat", "new york"]])
    }

    #[test]
    fn glove_rows_replace_known_words() {
        let text = "cat 1 2 3\nunseen 7 7 7\nnew york 4 5 6\n";

        let vectors = read_glove(Cursor::new(text), &vocabulary(), 3, 0).unwrap();

        assert_eq!(vectors.rows, 4);
        assert_eq!(vectors.found, 2);
        assert_eq!(vectors.row(2).to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(vectors.row(3).to_vec(), vec![4.0, 5.0, 6.0]);
        assert!(vectors.row(1).iter().all(|v| (-SCALE..=SCALE).contains(v)));
    }

    #[test]
    fn glove_rejects_short_rows() {
        let err = read_glove(Cursor::new("cat 1 2\n"), &vocabulary(), 3, 0).unwrap_err();

        assert!(matches!(
            err,
            EmbeddingError::Dimension {
                expected: 3,
                found: 2
            }
        ));
    }

    fn word2vec(entries: &[(&str, [f32; 2])]) -> Vec<u8> {
        let mut bytes = format!("{} 2\n", entries.len()).into_bytes();
        for (word, vector) in entries {
            bytes.extend(word.as_bytes());
            bytes.push(b' ');
            for value in vector {
                bytes.extend(value.to_le_bytes());
            }
            bytes.push(b'\n');
        }
        bytes
    }

    #[test]
    fn word2vec_rows_replace_known_words() {
        let bytes = word2vec(&[("the", [0.5, -0.5]), ("dog", [9.0, 9.0]), ("cat", [1.5, 2.5])]);

        let vectors = read_word2vec(Cursor::new(bytes), &vocabulary(), 2, 0).unwrap();

        assert_eq!(vectors.found, 2);
        assert_eq!(vectors.row(1).to_vec(), vec![0.5, -0.5]);
        assert_eq!(vectors.row(2).to_vec(), vec![1.5, 2.5]);
    }

    #[test]
    fn word2vec_checks_the_header() {
        let bytes = word2vec(&[("the", [0.5, -0.5])]);

        assert!(matches!(
            read_word2vec(Cursor::new(bytes), &vocabulary(), 3, 0),
            Err(EmbeddingError::Dimension { .. })
        ));
        assert!(matches!(
            read_word2vec(Cursor::new(b"oops\n".to_vec()), &vocabulary(), 2, 0),
            Err(EmbeddingError::Header(_))
        ));
    }

    #[test]
    fn word2vec_detects_truncation() {
        let mut bytes = word2vec(&[("the", [0.5, -0.5])]);
        bytes.truncate(bytes.len() - 3);

        assert!(matches!(
            read_word2vec(Cursor::new(bytes), &vocabulary(), 2, 0),
            Err(EmbeddingError::Truncated)
        ));
    }
}
