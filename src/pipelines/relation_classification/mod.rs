/// Fixed-width symbol vocabularies
pub mod vocab;

/// Feature encoding of raw corpus streams
pub mod features;

/// A single encoded example
pub mod item;

/// Seeded batch generation and tensor batching
pub mod batcher;

/// Configuration for training runs
pub mod config;

/// The predictor seam between the training loop and a model
pub mod model;

/// Held-out evaluation and macro-F1
pub mod evaluation;

/// Checkpoint policy and retention
pub mod checkpoint;

/// Run directory layout
pub mod run;

/// External scorer bridge
pub mod scorer;

/// The training loop
pub mod session;

/// Training entry point
pub mod training;

/// Scoring a corpus with a saved run
pub mod inference;

pub use item::Item;
pub use model::Predictor;
