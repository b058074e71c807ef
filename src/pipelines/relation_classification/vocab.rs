use std::{collections::HashMap, path::Path};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

/// The id shared by padding and out-of-vocabulary symbols
pub const PAD_ID: u32 = 0;

/// The symbol reserved for [PAD_ID]
pub static UNK: &str = "<UNK>";

/// A frozen mapping from symbols to integer ids.
///
/// Ids are assigned in order of first appearance in the fit corpus, starting after [PAD_ID].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    symbols: Vec<String>,

    #[serde(skip)]
    ids: HashMap<String, u32>,
}

impl Vocabulary {
    /// Builds a vocabulary from a corpus of symbol sequences
    pub fn fit<I, S, T>(corpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut symbols = vec![UNK.to_string()];
        let mut ids = HashMap::from([(UNK.to_string(), PAD_ID)]);

        for sequence in corpus {
            for symbol in sequence {
                let symbol = symbol.as_ref();
                if !ids.contains_key(symbol) {
                    ids.insert(symbol.to_string(), symbols.len() as u32);
                    symbols.push(symbol.to_string());
                }
            }
        }

        Self { symbols, ids }
    }

    /// The number of ids, including the reserved one
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Returns true if only the reserved id is present
    pub fn is_empty(&self) -> bool {
        self.symbols.len() <= 1
    }

    /// Returns the id for a symbol, or [PAD_ID] when it was never seen
    pub fn id(&self, symbol: &str) -> u32 {
        self.ids.get(symbol).copied().unwrap_or(PAD_ID)
    }

    /// Returns the symbol for an id
    pub fn symbol(&self, id: u32) -> Option<&str> {
        self.symbols.get(id as usize).map(String::as_str)
    }

    /// Iterate over `(symbol, id)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.as_str(), id as u32))
    }

    /// Encodes one sequence to exactly `length` ids, truncating or right-padding
    pub fn encode<S: AsRef<str>>(&self, sequence: &[S], length: usize) -> Vec<u32> {
        let mut ids: Vec<u32> = sequence
            .iter()
            .take(length)
            .map(|symbol| self.id(symbol.as_ref()))
            .collect();

        ids.resize(length, PAD_ID);
        ids
    }

    /// Encodes every sequence into a fixed-width array of shape `[sequences, length]`
    pub fn transform<S: AsRef<str>>(&self, sequences: &[Vec<S>], length: usize) -> Vec<Vec<u32>> {
        sequences
            .iter()
            .map(|sequence| self.encode(sequence, length))
            .collect()
    }

    fn reindex(&mut self) {
        self.ids = self
            .symbols
            .iter()
            .enumerate()
            .map(|(id, symbol)| (symbol.clone(), id as u32))
            .collect();
    }
}

/// The three vocabularies fit for one training run
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vocabularies {
    /// Word vocabulary
    pub words: Vocabulary,

    /// Character vocabulary
    pub chars: Vocabulary,

    /// Relative position vocabulary, shared by both entities
    pub positions: Vocabulary,
}

impl Vocabularies {
    /// Write the vocabularies as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string(self)?;

        std::fs::write(path, json)
            .with_context(|| format!("Unable to write vocabulary to {}", path.display()))?;

        Ok(())
    }

    /// Read vocabularies written by [Vocabularies::save]
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read vocabulary from {}", path.display()))?;

        let mut vocabularies: Self = serde_json::from_str(&json)?;
        vocabularies.words.reindex();
        vocabularies.chars.reindex();
        vocabularies.positions.reindex();

        Ok(vocabularies)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn corpus() -> Vec<Vec<&'static str>> {
        vec![
            vec!["a", "misty", "ridge", "uprises"],
            vec!["from", "the", "surge", "a"],
        ]
    }

    #[test]
    fn assigns_ids_in_order_of_first_appearance() {
        let vocab = Vocabulary::fit(corpus());

        assert_eq!(vocab.len(), 8);
        assert_eq!(vocab.id("a"), 1);
        assert_eq!(vocab.id("from"), 5);
        assert_eq!(vocab.symbol(7), Some("surge"));
        assert_eq!(vocab.symbol(PAD_ID), Some(UNK));
    }

    #[test]
    fn pads_and_truncates_to_the_fixed_width() {
        let vocab = Vocabulary::fit(corpus());

        let rows = vocab.transform(&[vec!["a", "ridge"], vec!["the", "surge", "a", "misty", "from"]], 4);

        assert_eq!(rows, vec![vec![1, 3, 0, 0], vec![6, 7, 1, 2]]);
        assert!(rows.iter().all(|row| row.len() == 4));
    }

    #[test]
    fn unseen_symbols_map_to_the_pad_id() {
        let vocab = Vocabulary::fit(corpus());

        assert_eq!(vocab.encode(&["cloud", "the"], 3), vec![PAD_ID, 6, PAD_ID]);
    }

    #[test]
    fn encoding_does_not_grow_the_vocabulary() {
        let vocab = Vocabulary::fit(corpus());
        let before = vocab.clone();

        vocab.transform(&[vec!["never", "seen", "before"]], 10);

        assert_eq!(vocab, before);
    }

    #[test]
    fn saved_vocabularies_load_with_the_same_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");

        let vocabularies = Vocabularies {
            words: Vocabulary::fit(corpus()),
            chars: Vocabulary::fit(vec![vec!["a", "b"]]),
            positions: Vocabulary::fit(vec![vec!["-1", "0", "1"]]),
        };

        vocabularies.save(&path).unwrap();
        let loaded = Vocabularies::load(&path).unwrap();

        assert_eq!(loaded, vocabularies);
        assert_eq!(loaded.positions.id("1"), 3);
    }
}
