/// The Model Configuration
pub mod config;

/// The attention-LSTM module
pub mod model;

/// Training and evaluation through the [Predictor](crate::pipelines::relation_classification::model::Predictor) seam
pub mod predictor;

pub use config::Config;
pub use model::{Keep, Model};
pub use predictor::BurnPredictor;
