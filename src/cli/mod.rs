/// Corpus selectors
pub mod datasets;

/// Pretrained embedding selectors
pub mod embeddings;

/// Prediction file formats
pub mod formats;
