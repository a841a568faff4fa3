//! Tag raw text with a trained checkpoint, one sentence per input line.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use seqtag_core::data::Tokenizer;
use seqtag_trainer::TrainedModel;
use seqtag_trainer::config::parse_device;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "tag")]
#[command(about = "Label entities in text read from stdin")]
#[command(version)]
struct Cli {
    /// Checkpoint directory written by `train`
    #[arg(short, long, default_value = "models/seqtag")]
    model: PathBuf,

    #[arg(long, default_value = "cpu")]
    device: String,

    /// Input lines are already whitespace-tokenized
    #[arg(long)]
    pretokenized: bool,

    /// Print one JSON object per line instead of word/LABEL pairs
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Tagged<'a> {
    words: &'a [String],
    labels: &'a [String],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let cli = Cli::parse();
    let device = parse_device(&cli.device)?;
    let model = TrainedModel::load(&cli.model, device)?;
    let tokenizer = Tokenizer::new()?;

    let mut sentences = Vec::new();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let words: Vec<String> = if cli.pretokenized {
            line.split_whitespace().map(str::to_string).collect()
        } else {
            tokenizer.words(&line)
        };
        sentences.push(words);
    }

    let labels = model.predictor().predict(&sentences)?;

    let mut out = io::stdout().lock();
    for (words, labels) in sentences.iter().zip(&labels) {
        if cli.json {
            serde_json::to_writer(&mut out, &Tagged { words, labels })?;
            writeln!(out)?;
        } else {
            let pairs: Vec<String> = words
                .iter()
                .zip(labels)
                .map(|(word, label)| format!("{word}/{label}"))
                .collect();
            writeln!(out, "{}", pairs.join(" "))?;
        }
    }
    Ok(())
}
