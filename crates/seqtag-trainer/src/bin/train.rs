//! Train a tagger from CoNLL column files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use seqtag_core::model::ModelKind;
use seqtag_trainer::{TrainConfig, run_training};
use tracing::info;

#[derive(Parser)]
#[command(name = "train")]
#[command(about = "Train a BIO sequence tagger")]
#[command(version)]
struct Cli {
    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Checkpoint output directory
    #[arg(short, long, default_value = "models/seqtag")]
    output: PathBuf,

    /// Training corpus
    #[arg(long)]
    train: Option<PathBuf>,

    /// Validation corpus
    #[arg(long)]
    val: Option<PathBuf>,

    /// Tagger variant: word, window or recurrent
    #[arg(short, long)]
    model: Option<ModelKind>,

    /// Add character features
    #[arg(long)]
    characters: bool,

    /// Pretrained word vectors (word2vec/GloVe text format)
    #[arg(long)]
    pretrained: Option<PathBuf>,

    /// Update the pretrained vectors during training
    #[arg(long)]
    fine_tune: bool,

    /// Lowercase words before vocabulary lookup
    #[arg(long)]
    lowercase: bool,

    #[arg(long)]
    device: Option<String>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    embedding_dim: Option<usize>,

    #[arg(long)]
    hidden_dim: Option<usize>,

    #[arg(short, long)]
    epochs: Option<usize>,

    #[arg(short, long)]
    batch_size: Option<usize>,

    #[arg(long)]
    learning_rate: Option<f64>,

    #[arg(long)]
    weight_decay: Option<f64>,

    /// Probability of replacing a training word with the unknown id
    #[arg(long)]
    word_dropout: Option<f32>,

    /// Reserve a pad slot before every sentence
    #[arg(long)]
    leading_pad: bool,
}

impl Cli {
    fn into_config(self) -> Result<(TrainConfig, PathBuf)> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::from_file(path)?,
            None => TrainConfig::default(),
        };

        if let Some(path) = self.train {
            config.train_path = path;
        }
        if let Some(path) = self.val {
            config.val_path = path;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(path) = self.pretrained {
            config.pretrained = Some(path);
        }
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(dim) = self.embedding_dim {
            config.embedding_dim = dim;
        }
        if let Some(dim) = self.hidden_dim {
            config.hidden_dim = dim;
        }
        if let Some(epochs) = self.epochs {
            config.epochs = epochs;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(lr) = self.learning_rate {
            config.learning_rate = lr;
        }
        if let Some(decay) = self.weight_decay {
            config.weight_decay = decay;
        }
        if let Some(p) = self.word_dropout {
            config.word_dropout = p;
        }
        config.use_characters |= self.characters;
        config.fine_tune |= self.fine_tune;
        config.lowercase |= self.lowercase;
        config.leading_pad |= self.leading_pad;

        config.validate()?;
        Ok((config, self.output))
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let (config, output) = Cli::parse().into_config()?;
    info!(model = %config.model, epochs = config.epochs, "starting training");

    let history = run_training(config, &output)?;
    if let Some(best) = history.best_epoch() {
        info!(epoch = best.epoch, val_f1 = best.val_f1, "best validation epoch");
    }
    if let Some(report) = &history.report {
        print!("{report}");
    }
    info!(path = %output.display(), "done");
    Ok(())
}
