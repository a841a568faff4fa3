pub mod batch;
pub mod corpus;
pub mod dataset;
pub mod tokenizer;

pub use batch::{Batch, Batcher, EncodedSentence, WordDropout};
pub use corpus::{TaggedSentence, load_conll, read_conll};
pub use dataset::{SequenceDataset, Vocabularies};
pub use tokenizer::{Token, Tokenizer};
