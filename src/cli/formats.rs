use std::fmt::Display;

use crate::datasets::semeval;

/// How prediction and answer key files are laid out
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LabelFormat {
    /// One class id per line
    Labels,

    /// `<sentence id>\t<relation name>` per line, as read by the SemEval scorer
    SemEval,
}

impl LabelFormat {
    /// Render class ids as lines, in order
    pub fn lines(&self, labels: &[usize], names: &[&str]) -> Vec<String> {
        match self {
            LabelFormat::Labels => labels.iter().map(usize::to_string).collect(),
            LabelFormat::SemEval => labels
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let name = names
                        .get(*label)
                        .or_else(|| names.get(semeval::OTHER))
                        .copied()
                        .unwrap_or_default();

                    format!("{}\t{}", semeval::FIRST_TEST_ID + i, name)
                })
                .collect(),
        }
    }
}

impl TryFrom<&str> for LabelFormat {
    type Error = LabelFormatError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "labels" => Ok(LabelFormat::Labels),
            "semeval" => Ok(LabelFormat::SemEval),
            _ => Err(LabelFormatError::Unknown(value.to_string())),
        }
    }
}

impl Display for LabelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LabelFormat::Labels => "labels",
            LabelFormat::SemEval => "semeval",
        };

        write!(f, "{}", name)
    }
}

/// Label Format Error
#[derive(thiserror::Error, Debug)]
pub enum LabelFormatError {
    /// No format found for the given string
    #[error("no output format found for {0}")]
    Unknown(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn renders_each_format() {
        let labels = [3, 0];

        assert_eq!(LabelFormat::Labels.lines(&labels, semeval::RELATIONS), vec!["3", "0"]);
        assert_eq!(
            LabelFormat::SemEval.lines(&labels, semeval::RELATIONS),
            vec!["8001\tProduct-Producer(e1,e2)", "8002\tOther"]
        );
    }
}
