use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during seqtag core operations.
#[derive(Debug, Error)]
pub enum SeqTagError {
    /// Reading a corpus or embedding file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A non-blank corpus line did not carry both a word and a label column.
    #[error("malformed line {line} in {path:?}: expected at least two columns")]
    MalformedLine {
        /// The file being read.
        path: PathBuf,
        /// One-based line number.
        line: usize,
    },

    /// A token was looked up in a vocabulary that has no unknown id.
    #[error("token {token:?} is not in the vocabulary")]
    UnknownToken {
        /// The token that could not be encoded.
        token: String,
    },

    /// An id was outside the vocabulary range.
    #[error("id {id} is out of range for a vocabulary of size {size}")]
    UnknownId {
        /// The offending id.
        id: u32,
        /// Vocabulary size.
        size: usize,
    },

    /// The vocabulary holds no real tokens (only reserved ids).
    #[error("vocabulary {0} is empty")]
    EmptyVocabulary(&'static str),

    /// Two sequences that must line up had different lengths.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected length.
        expected: usize,
        /// Observed length.
        actual: usize,
    },

    /// A pretrained embedding file could not be used.
    #[error("invalid pretrained embeddings: {0}")]
    InvalidPretrained(String),

    /// A model was configured inconsistently (e.g. characters requested without a char vocabulary).
    #[error("invalid model configuration: {0}")]
    InvalidModel(String),

    /// Candle ML framework error.
    #[error("tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    /// Manifest (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for seqtag operations.
pub type Result<T> = std::result::Result<T, SeqTagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = SeqTagError::UnknownToken {
            token: "zebra".into(),
        };
        assert!(err.to_string().contains("zebra"));

        let err = SeqTagError::MalformedLine {
            path: PathBuf::from("train.txt"),
            line: 7,
        };
        assert!(err.to_string().contains("line 7"));

        let err = SeqTagError::EmptyVocabulary("labels");
        assert_eq!(err.to_string(), "vocabulary labels is empty");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SeqTagError>();
    }
}
