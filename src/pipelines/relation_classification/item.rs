use derive_new::new;

use crate::datasets::EntitySpan;

/// One encoded example, gathered across every stream at the same index
#[derive(Clone, Debug, PartialEq, new)]
pub struct Item {
    /// The example's position in its corpus split
    pub index: usize,

    /// Word ids, `sentence_length` wide
    pub words: Vec<u32>,

    /// The gold class id
    pub label: usize,

    /// Character ids, `sentence_length * word_length` wide
    pub chars: Vec<u32>,

    /// The normalized sentence text
    pub text: String,

    /// Entity 1 mention
    pub e1: EntitySpan,

    /// Entity 2 mention
    pub e2: EntitySpan,

    /// Position ids relative to entity 1
    pub dist1: Vec<u32>,

    /// Position ids relative to entity 2
    pub dist2: Vec<u32>,
}
