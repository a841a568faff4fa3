//! Training configuration.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use candle_core::Device;
use seqtag_core::model::ModelKind;
use serde::{Deserialize, Serialize};

/// Hyperparameters and file locations for one training run.
///
/// Built once (defaults, then an optional JSON file, then command-line
/// overrides) and handed to the [`Trainer`](crate::Trainer), which never
/// changes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// `cpu`, `cuda`, `cuda:N`, `metal` or `metal:N`.
    pub device: String,
    /// Seeds shuffling, word dropout and parameter initialization.
    pub seed: u64,
    pub train_path: PathBuf,
    pub val_path: PathBuf,
    pub model: ModelKind,
    pub use_characters: bool,
    /// Ignored when a pretrained table is given; its width wins.
    pub embedding_dim: usize,
    pub hidden_dim: usize,
    pub char_embedding_dim: usize,
    pub char_filters: usize,
    pub char_kernel: usize,
    /// word2vec/GloVe text file.
    pub pretrained: Option<PathBuf>,
    /// Update the pretrained table during training.
    pub fine_tune: bool,
    pub lowercase: bool,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub weight_decay: f64,
    pub word_dropout: f32,
    pub leading_pad: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            device: "cpu".to_string(),
            seed: 0,
            train_path: PathBuf::from("data/train.txt"),
            val_path: PathBuf::from("data/val.txt"),
            model: ModelKind::Recurrent,
            use_characters: false,
            embedding_dim: 100,
            hidden_dim: 128,
            char_embedding_dim: 16,
            char_filters: 32,
            char_kernel: 3,
            pretrained: None,
            fine_tune: false,
            lowercase: false,
            epochs: 10,
            batch_size: 64,
            learning_rate: 0.005,
            weight_decay: 0.0,
            word_dropout: 0.0,
            leading_pad: false,
        }
    }
}

impl TrainConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn with_model(mut self, model: ModelKind) -> Self {
        self.model = model;
        self
    }

    pub fn with_characters(mut self, enabled: bool) -> Self {
        self.use_characters = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_paths(mut self, train: impl Into<PathBuf>, val: impl Into<PathBuf>) -> Self {
        self.train_path = train.into();
        self.val_path = val.into();
        self
    }

    pub fn with_dimensions(mut self, embedding_dim: usize, hidden_dim: usize) -> Self {
        self.embedding_dim = embedding_dim;
        self.hidden_dim = hidden_dim;
        self
    }

    pub fn with_pretrained(mut self, path: impl Into<PathBuf>, fine_tune: bool) -> Self {
        self.pretrained = Some(path.into());
        self.fine_tune = fine_tune;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_word_dropout(mut self, probability: f32) -> Self {
        self.word_dropout = probability;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if !(0.0..1.0).contains(&self.word_dropout) {
            bail!("word_dropout must be in [0, 1), got {}", self.word_dropout);
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            bail!("learning_rate must be positive, got {}", self.learning_rate);
        }
        if self.weight_decay < 0.0 {
            bail!("weight_decay must not be negative, got {}", self.weight_decay);
        }
        if self.use_characters && self.char_kernel % 2 == 0 {
            bail!("char_kernel must be odd, got {}", self.char_kernel);
        }
        Ok(())
    }

    /// Open the configured device.
    pub fn device(&self) -> anyhow::Result<Device> {
        parse_device(&self.device)
    }
}

pub fn parse_device(name: &str) -> anyhow::Result<Device> {
    let name = name.trim().to_ascii_lowercase();
    let (kind, ordinal) = match name.split_once(':') {
        Some((kind, ordinal)) => {
            let ordinal = ordinal
                .parse::<usize>()
                .with_context(|| format!("invalid device ordinal in {name:?}"))?;
            (kind, ordinal)
        }
        None => (name.as_str(), 0),
    };

    let device = match kind {
        "cpu" => Device::Cpu,
        "cuda" => Device::new_cuda(ordinal).context("CUDA device unavailable")?,
        "metal" => Device::new_metal(ordinal).context("Metal device unavailable")?,
        other => bail!("unknown device {other:?}"),
    };
    Ok(device)
}
