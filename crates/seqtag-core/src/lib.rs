//! # Seqtag Core
//!
//! Neural sequence labeling for named entities: vocabularies, padded
//! batching, four tagger variants (per-word, window, bidirectional LSTM and
//! character-augmented), chunk-level BIO evaluation and batched prediction.
//!
//! ## Quick Start
//!
//! ```rust
//! use seqtag_core::tagging::EvaluationStats;
//!
//! let mut stats = EvaluationStats::new();
//! stats
//!     .update(&["B-PER", "I-PER", "O", "B-LOC"], &["B-PER", "I-PER", "O", "O"])
//!     .unwrap();
//!
//! let total = stats.total();
//! assert_eq!(total.true_positives, 1);
//! assert_eq!(total.false_negatives, 1);
//! assert_eq!(total.precision(), 1.0);
//! ```
pub mod data;
pub mod embeddings;
pub mod error;
pub mod model;
pub mod predict;
pub mod tagging;
pub mod vocab;

// Re-export primary API
pub use data::{
    Batch, Batcher, EncodedSentence, SequenceDataset, TaggedSentence, Tokenizer, Vocabularies,
    WordDropout, load_conll,
};
pub use embeddings::{EmbeddingSource, PretrainedEmbeddings, trainable_variables};
pub use error::{Result, SeqTagError};
pub use model::{
    CharSpec, ModelKind, ModelSpec, SequenceTagger, build_tagger, decode, masked_cross_entropy,
};
pub use predict::Predictor;
pub use tagging::{BioTag, Chunk, ChunkCounts, EvaluationReport, EvaluationStats};
pub use vocab::Vocabulary;
