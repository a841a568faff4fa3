//! Loading of CoNLL-style column files.
//!
//! One token per line, the first column is the word and the last column is
//! the BIO label; any columns in between are ignored. Blank lines separate
//! sentences and `-DOCSTART-` lines are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SeqTagError};

/// A sentence with one label per word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedSentence {
    pub words: Vec<String>,
    pub labels: Vec<String>,
}

impl TaggedSentence {
    pub fn new(words: Vec<String>, labels: Vec<String>) -> Self {
        Self { words, labels }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Load a labeled corpus from a column file.
pub fn load_conll<P: AsRef<Path>>(path: P) -> Result<Vec<TaggedSentence>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let sentences = read_conll(BufReader::new(file), path)?;
    debug!(path = %path.display(), sentences = sentences.len(), "loaded corpus");
    Ok(sentences)
}

/// Read a labeled corpus from any buffered reader. `path` is only used in errors.
pub fn read_conll<R: BufRead>(reader: R, path: &Path) -> Result<Vec<TaggedSentence>> {
    let mut sentences = Vec::new();
    let mut words = Vec::new();
    let mut labels = Vec::new();

    for (line_idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            if !words.is_empty() {
                sentences.push(TaggedSentence::new(
                    std::mem::take(&mut words),
                    std::mem::take(&mut labels),
                ));
            }
            continue;
        }

        if line.starts_with("-DOCSTART-") {
            continue;
        }

        let columns: Vec<&str> = line.split_whitespace().collect();
        match (columns.first(), columns.last()) {
            (Some(word), Some(label)) if columns.len() >= 2 => {
                words.push((*word).to_string());
                labels.push((*label).to_string());
            }
            _ => {
                return Err(SeqTagError::MalformedLine {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                });
            }
        }
    }

    // Don't forget the last sentence
    if !words.is_empty() {
        sentences.push(TaggedSentence::new(words, labels));
    }

    Ok(sentences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "-DOCSTART- -X- -X- O\n\
                          \n\
                          EU NNP B-NP B-ORG\n\
                          rejects VBZ B-VP O\n\
                          German JJ B-NP B-MISC\n\
                          \n\
                          \n\
                          Peter NNP B-NP B-PER\n\
                          Blackburn NNP I-NP I-PER\n";

    #[test]
    fn test_read_columns() {
        let sentences = read_conll(Cursor::new(SAMPLE), Path::new("sample")).unwrap();
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].words, ["EU", "rejects", "German"]);
        assert_eq!(sentences[0].labels, ["B-ORG", "O", "B-MISC"]);
        assert_eq!(sentences[1].words, ["Peter", "Blackburn"]);
        assert_eq!(sentences[1].labels, ["B-PER", "I-PER"]);
    }

    #[test]
    fn test_two_column_format() {
        let text = "Paris\tB-LOC\nis\tO\n";
        let sentences = read_conll(Cursor::new(text), Path::new("two")).unwrap();
        assert_eq!(sentences.len(), 1);
        assert_eq!(sentences[0].len(), 2);
    }

    #[test]
    fn test_single_column_is_malformed() {
        let text = "Paris B-LOC\nlonely\n";
        let err = read_conll(Cursor::new(text), Path::new("bad.txt")).unwrap_err();
        assert!(matches!(err, SeqTagError::MalformedLine { line: 2, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("seqtag-corpus-{}.txt", std::process::id()));
        std::fs::write(&path, SAMPLE).unwrap();
        let sentences = load_conll(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(sentences.len(), 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_conll("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, SeqTagError::Io(_)));
    }
}
