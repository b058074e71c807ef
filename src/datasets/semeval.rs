use async_trait::async_trait;

use crate::utils::files::read_file;

use super::{CorpusError, EntitySpan, LoadableCorpus, RawStreams};

/// The name of the SemEval-2010 Task 8 corpus
pub static DATASET: &str = "semeval2010";

/// The 19 relation classes. `Other` is id 0, each directed relation follows.
pub static RELATIONS: &[&str] = &[
    "Other",
    "Message-Topic(e1,e2)",
    "Message-Topic(e2,e1)",
    "Product-Producer(e1,e2)",
    "Product-Producer(e2,e1)",
    "Instrument-Agency(e1,e2)",
    "Instrument-Agency(e2,e1)",
    "Entity-Destination(e1,e2)",
    "Entity-Destination(e2,e1)",
    "Cause-Effect(e1,e2)",
    "Cause-Effect(e2,e1)",
    "Component-Whole(e1,e2)",
    "Component-Whole(e2,e1)",
    "Entity-Origin(e1,e2)",
    "Entity-Origin(e2,e1)",
    "Member-Collection(e1,e2)",
    "Member-Collection(e2,e1)",
    "Content-Container(e1,e2)",
    "Content-Container(e2,e1)",
];

/// The id of the catch-all relation
pub const OTHER: usize = 0;

/// Sentence ids in the official test key start here
pub const FIRST_TEST_ID: usize = 8001;

const MARKERS: [&str; 4] = ["<e1>", "</e1>", "<e2>", "</e2>"];

/// Loader for the tab-separated SemEval-2010 Task 8 files
#[derive(Clone, Copy, Debug, Default)]
pub struct Corpus;

#[async_trait]
impl LoadableCorpus for Corpus {
    fn labels(&self) -> &'static [&'static str] {
        RELATIONS
    }

    async fn load(&self, path: &str) -> Result<RawStreams, CorpusError> {
        let lines = read_file(path).await.map_err(|source| CorpusError::Io {
            path: path.to_string(),
            source,
        })?;

        let streams = parse(&lines.join("\n"))?;

        log::info!("Loaded {} examples from {}", streams.len(), path);

        Ok(streams)
    }
}

/// Parse the contents of a corpus file into aligned streams
pub fn parse(contents: &str) -> Result<RawStreams, CorpusError> {
    let mut streams = RawStreams::default();
    let mut lines = contents.lines().enumerate().peekable();

    while let Some((index, line)) = lines.next() {
        let Some((_, sentence)) = line.split_once('\t') else {
            continue;
        };

        let sentence_line = index + 1;
        let (tokens, e1, e2) = tokenize(sentence.trim().trim_matches('"'), sentence_line)?;

        let relation = loop {
            match lines.next() {
                Some((_, next)) if next.trim().is_empty() => continue,
                Some((i, next)) => break (i + 1, next.trim()),
                None => {
                    return Err(CorpusError::MissingRelation {
                        line: sentence_line,
                    })
                }
            }
        };

        let label = relation_id(relation.1).ok_or_else(|| CorpusError::UnknownRelation {
            line: relation.0,
            relation: relation.1.to_string(),
        })?;

        streams.dist1.push(distances(&e1, tokens.len()));
        streams.dist2.push(distances(&e2, tokens.len()));
        streams.chars.push(
            tokens
                .iter()
                .map(|token| token.chars().map(String::from).collect())
                .collect(),
        );
        streams.text.push(tokens.join(" "));
        streams.labels.push(label);
        streams.e1.push(e1);
        streams.e2.push(e2);
    }

    streams.check_aligned()?;

    Ok(streams)
}

/// Look up the class id for a relation name
pub fn relation_id(name: &str) -> Option<usize> {
    RELATIONS.iter().position(|relation| *relation == name)
}

/// Split a marked sentence into lowercase tokens and locate both entity mentions
fn tokenize(sentence: &str, line: usize) -> Result<(Vec<String>, EntitySpan, EntitySpan), CorpusError> {
    let mut spaced = sentence.to_string();
    for marker in MARKERS {
        spaced = spaced.replace(marker, &format!(" {marker} "));
    }

    let mut tokens = Vec::new();
    let mut starts = [None; 4];

    for chunk in spaced.split_whitespace() {
        if let Some(m) = MARKERS.iter().position(|marker| *marker == chunk) {
            starts[m] = Some(tokens.len());
            continue;
        }

        let mut word = String::new();
        for c in chunk.chars() {
            if c.is_alphanumeric() || c == '\'' {
                word.extend(c.to_lowercase());
            } else {
                if !word.is_empty() {
                    tokens.push(std::mem::take(&mut word));
                }
                tokens.push(c.to_string());
            }
        }
        if !word.is_empty() {
            tokens.push(word);
        }
    }

    let position = |m: usize| starts[m].ok_or(CorpusError::MissingEntity { line, marker: MARKERS[m] });

    let e1 = EntitySpan {
        start: position(0)?,
        end: position(1)?,
    };
    let e2 = EntitySpan {
        start: position(2)?,
        end: position(3)?,
    };

    Ok((tokens, e1, e2))
}

fn distances(span: &EntitySpan, len: usize) -> Vec<String> {
    (0..len).map(|i| span.distance(i).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = "\
1\t\"The system as described above has its greatest application in an arrayed <e1>configuration</e1> of antenna <e2>elements</e2>.\"
Component-Whole(e2,e1)
Comment: Not a collection: there is structure here, organisation.

2\t\"The <e1>child</e1> was carefully wrapped and bound into the <e2>cradle</e2> by means of a cord.\"
Other
Comment:
";

    #[test]
    fn parses_each_record_into_aligned_streams() {
        let streams = parse(SAMPLE).unwrap();

        assert_eq!(streams.len(), 2);
        assert_eq!(streams.labels, vec![12, OTHER]);
        assert_eq!(
            streams.text[1],
            "the child was carefully wrapped and bound into the cradle by means of a cord ."
        );
        assert_eq!(streams.e1[1], EntitySpan { start: 1, end: 2 });
        assert_eq!(streams.e2[1], EntitySpan { start: 9, end: 10 });
        assert_eq!(streams.dist1[1][0], "-1");
        assert_eq!(streams.dist2[1][10], "1");
        assert_eq!(streams.chars[1][1], vec!["c", "h", "i", "l", "d"]);
    }

    #[test]
    fn every_stream_has_one_token_entry_per_word() {
        let streams = parse(SAMPLE).unwrap();

        for i in 0..streams.len() {
            let words = streams.text[i].split(' ').count();
            assert_eq!(streams.chars[i].len(), words);
            assert_eq!(streams.dist1[i].len(), words);
            assert_eq!(streams.dist2[i].len(), words);
        }
    }

    #[test]
    fn rejects_unknown_relations() {
        let err = parse("1\t\"<e1>a</e1> b <e2>c</e2>\"\nLikes(e1,e2)\n").unwrap_err();

        assert!(matches!(err, CorpusError::UnknownRelation { line: 2, .. }));
    }

    #[test]
    fn rejects_sentences_without_entities() {
        let err = parse("1\t\"<e1>a</e1> b c\"\nOther\n").unwrap_err();

        assert!(matches!(
            err,
            CorpusError::MissingEntity {
                line: 1,
                marker: "<e2>"
            }
        ));
    }

    #[test]
    fn splits_punctuation_from_words() {
        let (tokens, e1, _) = tokenize("A <e1>misty ridge</e1>, from <e2>surge</e2>.", 1).unwrap();

        assert_eq!(tokens, vec!["a", "misty", "ridge", ",", "from", "surge", "."]);
        assert_eq!(e1, EntitySpan { start: 1, end: 3 });
    }
}
