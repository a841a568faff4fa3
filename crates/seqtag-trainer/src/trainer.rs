//! Training loop for the neural taggers.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use candle_core::{DType, Device};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use oorandom::Rand32;
use seqtag_core::data::{
    Batcher, EncodedSentence, SequenceDataset, TaggedSentence, Vocabularies, WordDropout,
    load_conll,
};
use seqtag_core::embeddings::{EmbeddingSource, PretrainedEmbeddings, trainable_variables};
use seqtag_core::model::{CharSpec, ModelSpec, SequenceTagger, build_tagger, masked_cross_entropy};
use seqtag_core::predict::Predictor;
use seqtag_core::tagging::EvaluationStats;
use tracing::{debug, info, warn};

use crate::checkpoint::{Manifest, save_checkpoint};
use crate::config::TrainConfig;
use crate::history::{EpochRecord, TrainingHistory};
use crate::init::reseed;

/// Owns the parameters, optimizer and data of one training run.
pub struct Trainer {
    config: TrainConfig,
    device: Device,
    varmap: VarMap,
    spec: ModelSpec,
    tagger: Box<dyn SequenceTagger>,
    vocabs: Vocabularies,
    batcher: Batcher,
    train: SequenceDataset,
    val: SequenceDataset,
    optimizer: AdamW,
}

impl Trainer {
    /// Load the corpora (and pretrained vectors) named in `config` and set up the model.
    pub fn new(config: TrainConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let train = load_conll(&config.train_path)
            .with_context(|| format!("failed to load {}", config.train_path.display()))?;
        let val = load_conll(&config.val_path)
            .with_context(|| format!("failed to load {}", config.val_path.display()))?;
        let pretrained = match &config.pretrained {
            Some(path) => Some(
                PretrainedEmbeddings::load(path)
                    .with_context(|| format!("failed to load {}", path.display()))?,
            ),
            None => None,
        };
        Self::from_corpora(config, train, val, pretrained)
    }

    /// Set up the model from in-memory corpora.
    pub fn from_corpora(
        config: TrainConfig,
        train: Vec<TaggedSentence>,
        val: Vec<TaggedSentence>,
        pretrained: Option<PretrainedEmbeddings>,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        if train.is_empty() {
            warn!("training corpus is empty");
        }
        if val.is_empty() {
            warn!("validation corpus is empty");
        }
        let device = config.device()?;

        let (vocabs, source, embedding_dim) = match &pretrained {
            Some(embeddings) => {
                let words = embeddings.vocabulary(config.lowercase);
                let vocabs = Vocabularies::with_words(words, &train, &val, config.use_characters)?;
                if embeddings.dim() != config.embedding_dim {
                    warn!(
                        configured = config.embedding_dim,
                        pretrained = embeddings.dim(),
                        "using the pretrained embedding width"
                    );
                }
                let table = embeddings.table(&vocabs.words, &device)?;
                (vocabs, EmbeddingSource::Pretrained(table), embeddings.dim())
            }
            None => {
                let vocabs = Vocabularies::build(&train, &val, config.lowercase, config.use_characters)?;
                (vocabs, EmbeddingSource::Random, config.embedding_dim)
            }
        };

        let spec = ModelSpec {
            kind: config.model,
            vocab_size: vocabs.words.len(),
            embedding_dim,
            hidden_dim: config.hidden_dim,
            num_labels: vocabs.labels.len(),
            chars: vocabs.chars.as_ref().map(|chars| CharSpec {
                vocab_size: chars.len(),
                embedding_dim: config.char_embedding_dim,
                filters: config.char_filters,
                kernel_size: config.char_kernel,
            }),
            pretrained: source.is_pretrained(),
        };

        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let tagger = build_tagger(&spec, &source, &varmap, vb)?;
        let reset = reseed(&varmap, config.seed)?;

        let params = ParamsAdamW {
            lr: config.learning_rate,
            weight_decay: config.weight_decay,
            ..Default::default()
        };
        let trainable = trainable_variables(&varmap, config.fine_tune)?;
        debug!(initialized = reset, trainable = trainable.len(), "prepared parameters");
        let optimizer = AdamW::new(trainable, params)?;

        let batcher = Batcher::new(vocabs.words.pad_id())
            .with_leading_pad(config.leading_pad)
            .with_chars(config.use_characters);
        let train = SequenceDataset::new(train, &vocabs)?;
        let val = SequenceDataset::new(val, &vocabs)?;

        info!(
            model = %spec.kind,
            words = spec.vocab_size,
            labels = spec.num_labels,
            train_sentences = train.len(),
            val_sentences = val.len(),
            "trainer ready"
        );

        Ok(Self {
            config,
            device,
            varmap,
            spec,
            tagger,
            vocabs,
            batcher,
            train,
            val,
            optimizer,
        })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn vocabularies(&self) -> &Vocabularies {
        &self.vocabs
    }

    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Run all configured epochs. Each epoch trains on a seeded shuffle of
    /// the training set, then evaluates on the validation set.
    pub fn train(&mut self) -> anyhow::Result<TrainingHistory> {
        let epochs = self.config.epochs;
        let mut rng = Rand32::new(self.config.seed);
        let unknown = self
            .vocabs
            .words
            .unknown_id()
            .context("word vocabulary has no unknown id")?;
        let mut dropout = WordDropout::new(self.config.word_dropout, unknown, self.config.seed.wrapping_add(1));

        let mut history = TrainingHistory::default();
        let mut stats = EvaluationStats::new();

        for epoch in 1..=epochs {
            let start = Instant::now();
            let train_loss = self.train_epoch(&mut rng, &mut dropout)?;
            stats = self.evaluate()?;
            let val_f1 = stats.total().f1();
            let seconds = start.elapsed().as_secs_f64();

            info!(epoch, epochs, train_loss, val_f1, seconds, "epoch complete");
            history.epochs.push(EpochRecord {
                epoch,
                train_loss,
                val_f1,
                seconds,
            });
        }

        history.report = Some(stats.report());
        Ok(history)
    }

    fn train_epoch(&mut self, rng: &mut Rand32, dropout: &mut WordDropout) -> anyhow::Result<f64> {
        let mut order: Vec<usize> = (0..self.train.len()).collect();
        shuffle(&mut order, rng);

        let mut total = 0.0;
        let mut batches = 0usize;
        for chunk in order.chunks(self.config.batch_size) {
            let sentences: Vec<EncodedSentence> = chunk
                .iter()
                .map(|&i| dropout.apply(&self.train.encoded[i]))
                .collect();
            if sentences.iter().all(EncodedSentence::is_empty) {
                continue;
            }
            let refs: Vec<&EncodedSentence> = sentences.iter().collect();
            let batch = self.batcher.batch(&refs, &self.device)?;

            let scores = self.tagger.forward(&batch)?;
            let loss = masked_cross_entropy(&scores, &batch.labels, &batch.mask)?;
            self.optimizer.backward_step(&loss)?;

            total += f64::from(loss.to_scalar::<f32>()?);
            batches += 1;
        }

        debug!(batches, "finished training pass");
        Ok(if batches == 0 { 0.0 } else { total / batches as f64 })
    }

    /// Chunk statistics on the validation set; parameters are not touched.
    pub fn evaluate(&self) -> anyhow::Result<EvaluationStats> {
        Ok(self.predictor().evaluate(&self.val)?)
    }

    pub fn predictor(&self) -> Predictor<'_> {
        Predictor::new(self.tagger.as_ref(), &self.vocabs, self.batcher, &self.device)
            .with_batch_size(self.config.batch_size)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            model: self.spec.clone(),
            vocabularies: self.vocabs.clone(),
            batcher: self.batcher,
        }
    }

    /// Write a checkpoint into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> anyhow::Result<()> {
        save_checkpoint(dir, &self.varmap, &self.manifest())
    }
}

/// Fisher-Yates shuffle driven by `rng`.
fn shuffle(items: &mut [usize], rng: &mut Rand32) {
    for i in (1..items.len()).rev() {
        let j = rng.rand_range(0..(i as u32 + 1)) as usize;
        items.swap(i, j);
    }
}

/// Train with `config`, save the checkpoint and history into `output`, and
/// return the history.
pub fn run_training<P: AsRef<Path>>(config: TrainConfig, output: P) -> anyhow::Result<TrainingHistory> {
    let output = output.as_ref();
    let mut trainer = Trainer::new(config)?;
    let history = trainer.train()?;
    trainer.save(output)?;
    history.save(output.join("history.json"))?;
    Ok(history)
}
