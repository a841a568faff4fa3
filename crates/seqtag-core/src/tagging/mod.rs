pub mod bio_tags;
pub mod evaluation;

pub use bio_tags::{BioTag, Chunk, chunks_to_labels, extract_chunks, is_well_formed};
pub use evaluation::{ChunkCounts, EvaluationReport, EvaluationStats, TOTAL, TypeScores};
