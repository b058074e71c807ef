use std::fmt::Display;

use crate::datasets::{semeval, LoadableCorpus};

/// The Dataset enum
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dataset {
    /// SemEval-2010 Task 8
    SemEval2010,
}

impl Dataset {
    /// The loader for this corpus format
    pub fn corpus(&self) -> impl LoadableCorpus {
        match self {
            Dataset::SemEval2010 => semeval::Corpus,
        }
    }
}

impl TryFrom<&str> for Dataset {
    type Error = DatasetError;

    /// Try to convert a string to a Dataset
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.to_lowercase() == semeval::DATASET {
            Ok(Dataset::SemEval2010)
        } else {
            Err(Self::Error::Unknown(value.to_string()))
        }
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Dataset::SemEval2010 => semeval::DATASET,
        };

        write!(f, "{}", name)
    }
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// No dataset found for the given string
    #[error("no dataset found for {0}")]
    Unknown(String),
}
