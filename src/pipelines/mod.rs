/// Relation Classification
pub mod relation_classification;
