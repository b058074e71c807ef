/// File utilities
pub mod files;

/// Number formatting
pub mod format;

/// Tensor Utilities
pub mod tensors;

/// Pretrained word vectors
pub mod embeddings;
