//! # Seqtag Trainer
//!
//! Training workflow for the taggers in `seqtag-core`: configuration,
//! seeded initialization, the epoch loop with validation, training history
//! and checkpoints that can be reloaded for prediction.

pub mod checkpoint;
pub mod config;
pub mod history;
pub mod init;
pub mod trainer;

pub use checkpoint::{Manifest, TrainedModel, save_checkpoint};
pub use config::TrainConfig;
pub use history::{EpochRecord, TrainingHistory};
pub use trainer::{Trainer, run_training};
