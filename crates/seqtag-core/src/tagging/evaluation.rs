//! # Chunk-level Evaluation
//!
//! Exact-match precision/recall/F1 over BIO chunks, per entity type and in
//! total. A predicted chunk only counts when both its span and its type match
//! a gold chunk; there is no partial credit.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SeqTagError};
use crate::tagging::bio_tags::{Chunk, extract_chunks};

/// Row name used for the aggregate over all entity types.
pub const TOTAL: &str = "total";

/// True positive / false positive / false negative counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl ChunkCounts {
    /// TP / (TP + FP), or 0 when nothing was predicted.
    pub fn precision(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_positives,
        )
    }

    /// TP / (TP + FN), or 0 when there was nothing to find.
    pub fn recall(&self) -> f64 {
        ratio(
            self.true_positives,
            self.true_positives + self.false_negatives,
        )
    }

    /// Harmonic mean of precision and recall, or 0 when both are 0.
    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn merge(&mut self, other: &ChunkCounts) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Running chunk counts for one validation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationStats {
    per_type: BTreeMap<String, ChunkCounts>,
}

impl EvaluationStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything accumulated so far.
    pub fn reset(&mut self) {
        self.per_type.clear();
    }

    /// Compare one gold label sequence with the predicted one.
    ///
    /// Both sequences must cover exactly the real (unpadded) tokens of a sentence.
    pub fn update<G: AsRef<str>, P: AsRef<str>>(&mut self, gold: &[G], predicted: &[P]) -> Result<()> {
        if gold.len() != predicted.len() {
            return Err(SeqTagError::DimensionMismatch {
                expected: gold.len(),
                actual: predicted.len(),
            });
        }

        let gold_chunks: HashSet<Chunk> = extract_chunks(gold).into_iter().collect();
        let predicted_chunks: HashSet<Chunk> = extract_chunks(predicted).into_iter().collect();

        for chunk in &predicted_chunks {
            let counts = self.entry(&chunk.entity_type);
            if gold_chunks.contains(chunk) {
                counts.true_positives += 1;
            } else {
                counts.false_positives += 1;
            }
        }
        for chunk in gold_chunks.difference(&predicted_chunks) {
            self.entry(&chunk.entity_type).false_negatives += 1;
        }

        Ok(())
    }

    fn entry(&mut self, entity_type: &str) -> &mut ChunkCounts {
        self.per_type.entry(entity_type.to_string()).or_default()
    }

    /// Counts for one entity type; all zero if the type was never seen.
    pub fn counts(&self, entity_type: &str) -> ChunkCounts {
        self.per_type.get(entity_type).copied().unwrap_or_default()
    }

    /// Counts summed over every entity type.
    pub fn total(&self) -> ChunkCounts {
        let mut total = ChunkCounts::default();
        for counts in self.per_type.values() {
            total.merge(counts);
        }
        total
    }

    /// Entity types seen in gold or predicted chunks, sorted.
    pub fn entity_types(&self) -> impl Iterator<Item = &str> {
        self.per_type.keys().map(String::as_str)
    }

    pub fn report(&self) -> EvaluationReport {
        EvaluationReport {
            rows: self
                .per_type
                .iter()
                .map(|(ty, counts)| TypeScores::new(ty, *counts))
                .collect(),
            total: TypeScores::new(TOTAL, self.total()),
        }
    }
}

/// Precision/recall/F1 for one row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeScores {
    pub entity_type: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub counts: ChunkCounts,
}

impl TypeScores {
    fn new(entity_type: &str, counts: ChunkCounts) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1(),
            counts,
        }
    }
}

/// Final per-type table plus the total row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub rows: Vec<TypeScores>,
    pub total: TypeScores,
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<12} {:>9} {:>9} {:>9} {:>6} {:>6} {:>6}",
            "type", "precision", "recall", "f1", "tp", "fp", "fn"
        )?;
        for row in self.rows.iter().chain(std::iter::once(&self.total)) {
            writeln!(
                f,
                "{:<12} {:>9.4} {:>9.4} {:>9.4} {:>6} {:>6} {:>6}",
                row.entity_type,
                row.precision,
                row.recall,
                row.f1,
                row.counts.true_positives,
                row.counts.false_positives,
                row.counts.false_negatives
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_prediction() {
        let mut stats = EvaluationStats::new();
        let gold = ["B-PER", "O", "B-LOC"];
        stats.update(&gold, &gold).unwrap();

        let total = stats.total();
        assert_eq!(total.true_positives, 2);
        assert_eq!(total.false_positives, 0);
        assert_eq!(total.false_negatives, 0);
        assert_eq!(total.f1(), 1.0);
    }

    #[test]
    fn test_shorter_prediction_gets_no_partial_credit() {
        let mut stats = EvaluationStats::new();
        stats
            .update(&["B-PER", "I-PER", "O"], &["B-PER", "O", "O"])
            .unwrap();

        let per = stats.counts("PER");
        assert_eq!(per.true_positives, 0);
        assert_eq!(per.false_positives, 1);
        assert_eq!(per.false_negatives, 1);
        assert_eq!(per.f1(), 0.0);
    }

    #[test]
    fn test_type_mismatch_is_fp_and_fn() {
        let mut stats = EvaluationStats::new();
        stats.update(&["B-PER", "O"], &["B-ORG", "O"]).unwrap();
        assert_eq!(stats.counts("ORG").false_positives, 1);
        assert_eq!(stats.counts("PER").false_negatives, 1);
        assert_eq!(stats.total().true_positives, 0);
    }

    #[test]
    fn test_zero_denominators_default_to_zero() {
        let mut stats = EvaluationStats::new();
        stats.update(&["O", "O"], &["O", "O"]).unwrap();

        let misc = stats.counts("MISC");
        assert_eq!(misc.precision(), 0.0);
        assert_eq!(misc.recall(), 0.0);
        assert_eq!(misc.f1(), 0.0);
        assert_eq!(stats.total().f1(), 0.0);
    }

    #[test]
    fn test_accumulates_and_resets() {
        let mut stats = EvaluationStats::new();
        stats.update(&["B-LOC"], &["B-LOC"]).unwrap();
        stats.update(&["B-LOC", "I-LOC"], &["O", "B-LOC"]).unwrap();

        let loc = stats.counts("LOC");
        assert_eq!(loc.true_positives, 1);
        assert_eq!(loc.false_positives, 1);
        assert_eq!(loc.false_negatives, 1);
        assert!((loc.precision() - 0.5).abs() < 1e-12);
        assert!((loc.recall() - 0.5).abs() < 1e-12);

        stats.reset();
        assert_eq!(stats.total(), ChunkCounts::default());
        assert_eq!(stats.entity_types().count(), 0);
    }

    #[test]
    fn test_length_mismatch_is_error() {
        let mut stats = EvaluationStats::new();
        let err = stats.update(&["O", "O"], &["O"]).unwrap_err();
        assert!(matches!(
            err,
            SeqTagError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_report_rows_sorted_with_total_last() {
        let mut stats = EvaluationStats::new();
        stats
            .update(&["B-PER", "O", "B-LOC"], &["B-PER", "O", "O"])
            .unwrap();

        let report = stats.report();
        let types: Vec<_> = report.rows.iter().map(|r| r.entity_type.as_str()).collect();
        assert_eq!(types, ["LOC", "PER"]);
        assert_eq!(report.total.entity_type, TOTAL);
        assert_eq!(report.total.counts.true_positives, 1);
        assert_eq!(report.total.counts.false_negatives, 1);

        let rendered = report.to_string();
        assert!(rendered.lines().last().unwrap().starts_with("total"));
        assert_eq!(rendered.lines().count(), 4);
    }
}
