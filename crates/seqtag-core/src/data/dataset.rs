//! Vocabulary bundle and encoded datasets.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::batch::EncodedSentence;
use crate::data::corpus::TaggedSentence;
use crate::error::{Result, SeqTagError};
use crate::vocab::Vocabulary;

/// The vocabularies a tagger needs: words, labels and (optionally) characters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabularies {
    pub words: Vocabulary,
    pub labels: Vocabulary,
    pub chars: Option<Vocabulary>,
}

impl Vocabularies {
    /// Build word and character vocabularies from `train`, and the label
    /// vocabulary from every sentence in `train` and `extra_labels` so that
    /// validation labels never fall outside it.
    pub fn build(
        train: &[TaggedSentence],
        extra_labels: &[TaggedSentence],
        lowercase: bool,
        use_chars: bool,
    ) -> Result<Self> {
        let word_seqs: Vec<&[String]> = train.iter().map(|s| s.words.as_slice()).collect();
        let mut words = Vocabulary::new(true).with_lowercase(lowercase);
        words.build(&word_seqs);
        Self::with_words(words, train, extra_labels, use_chars)
    }

    /// Like [`Vocabularies::build`] but with a word vocabulary supplied from
    /// elsewhere (a pretrained table).
    pub fn with_words(
        words: Vocabulary,
        train: &[TaggedSentence],
        extra_labels: &[TaggedSentence],
        use_chars: bool,
    ) -> Result<Self> {
        let label_seqs: Vec<&[String]> = train
            .iter()
            .chain(extra_labels)
            .map(|s| s.labels.as_slice())
            .collect();
        let mut labels = Vocabulary::new(false);
        labels.build(&label_seqs);
        if labels.is_empty() {
            return Err(SeqTagError::EmptyVocabulary("labels"));
        }

        let chars = if use_chars {
            let word_seqs: Vec<&[String]> = train.iter().map(|s| s.words.as_slice()).collect();
            Some(Vocabulary::build_chars(&word_seqs))
        } else {
            None
        };

        debug!(
            words = words.len(),
            labels = labels.len(),
            chars = chars.as_ref().map_or(0, Vocabulary::len),
            "built vocabularies"
        );

        Ok(Self {
            words,
            labels,
            chars,
        })
    }

    /// Encode a labeled sentence.
    pub fn encode(&self, sentence: &TaggedSentence) -> Result<EncodedSentence> {
        if sentence.words.len() != sentence.labels.len() {
            return Err(SeqTagError::DimensionMismatch {
                expected: sentence.words.len(),
                actual: sentence.labels.len(),
            });
        }
        let mut encoded = self.encode_words(&sentence.words)?;
        encoded.labels = self.labels.encode(&sentence.labels)?;
        Ok(encoded)
    }

    /// Encode an unlabeled sentence; labels are filled with the pad id.
    pub fn encode_words<S: AsRef<str>>(&self, words: &[S]) -> Result<EncodedSentence> {
        let chars = match &self.chars {
            Some(vocab) => words.iter().map(|w| vocab.encode_chars(w.as_ref())).collect(),
            None => Vec::new(),
        };
        Ok(EncodedSentence {
            words: self.words.encode(words)?,
            labels: vec![self.labels.pad_id(); words.len()],
            chars,
        })
    }

    /// Label strings for predicted ids.
    pub fn decode_labels(&self, ids: &[u32]) -> Result<Vec<String>> {
        ids.iter()
            .map(|&id| self.labels.decode(id).map(str::to_string))
            .collect()
    }
}

/// Sentences paired with their encodings.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    pub sentences: Vec<TaggedSentence>,
    pub encoded: Vec<EncodedSentence>,
}

impl SequenceDataset {
    pub fn new(sentences: Vec<TaggedSentence>, vocabs: &Vocabularies) -> Result<Self> {
        let encoded = sentences
            .iter()
            .map(|s| vocabs.encode(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { sentences, encoded })
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    /// Total number of tokens.
    pub fn num_tokens(&self) -> usize {
        self.encoded.iter().map(EncodedSentence::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(pairs: &[(&str, &str)]) -> TaggedSentence {
        TaggedSentence::new(
            pairs.iter().map(|(w, _)| w.to_string()).collect(),
            pairs.iter().map(|(_, l)| l.to_string()).collect(),
        )
    }

    #[test]
    fn test_build_and_encode() {
        let train = vec![tagged(&[("John", "B-PER"), ("runs", "O")])];
        let val = vec![tagged(&[("Rome", "B-LOC")])];
        let vocabs = Vocabularies::build(&train, &val, false, true).unwrap();

        // Label vocabulary covers validation labels too.
        assert!(vocabs.labels.encode_token("B-LOC").is_ok());
        assert_eq!(vocabs.labels.unknown_id(), None);

        let encoded = vocabs.encode(&val[0]).unwrap();
        assert_eq!(encoded.words, vec![vocabs.words.unknown_id().unwrap()]);
        assert_eq!(encoded.chars.len(), 1);
        assert_eq!(encoded.chars[0].len(), 4);

        let dataset = SequenceDataset::new(train, &vocabs).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.num_tokens(), 2);
    }

    #[test]
    fn test_encode_words_uses_pad_labels() {
        let train = vec![tagged(&[("a", "O"), ("b", "B-X")])];
        let vocabs = Vocabularies::build(&train, &[], false, false).unwrap();
        let encoded = vocabs.encode_words(&["a", "b", "c"]).unwrap();
        assert_eq!(encoded.labels, vec![0, 0, 0]);
        assert!(encoded.chars.is_empty());
    }

    #[test]
    fn test_label_roundtrip() {
        let train = vec![tagged(&[("a", "O"), ("b", "B-X"), ("c", "I-X")])];
        let vocabs = Vocabularies::build(&train, &[], false, false).unwrap();
        let ids = vocabs.labels.encode(&["I-X", "O", "B-X"]).unwrap();
        assert_eq!(vocabs.decode_labels(&ids).unwrap(), ["I-X", "O", "B-X"]);
    }

    #[test]
    fn test_empty_training_set_has_no_labels() {
        let err = Vocabularies::build(&[], &[], false, false).unwrap_err();
        assert!(matches!(err, SeqTagError::EmptyVocabulary("labels")));
    }
}
