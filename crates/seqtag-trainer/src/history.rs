//! Per-epoch training history.

use std::fs;
use std::path::Path;

use anyhow::Context;
use seqtag_core::tagging::EvaluationReport;
use serde::{Deserialize, Serialize};

/// Loss, validation F1 and wall time of one epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    /// Mean of the per-batch losses.
    pub train_loss: f64,
    pub val_f1: f64,
    pub seconds: f64,
}

/// Everything a run reports: one record per epoch and the final per-type table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochRecord>,
    pub report: Option<EvaluationReport>,
}

impl TrainingHistory {
    pub fn best_epoch(&self) -> Option<&EpochRecord> {
        self.epochs
            .iter()
            .max_by(|a, b| a.val_f1.total_cmp(&b.val_f1))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }
}
