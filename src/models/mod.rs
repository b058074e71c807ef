/// Attention-based LSTM over word, character and position features
pub mod attention_lstm;
