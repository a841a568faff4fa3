//! Saving and loading trained taggers.
//!
//! A checkpoint directory holds `model.safetensors` (every parameter,
//! pretrained tables included) and `manifest.json` (what is needed to
//! rebuild the tagger and encode its input).

use std::fs;
use std::path::Path;

use anyhow::Context;
use candle_core::{DType, Device};
use candle_nn::{VarBuilder, VarMap};
use seqtag_core::data::{Batcher, Vocabularies};
use seqtag_core::embeddings::EmbeddingSource;
use seqtag_core::model::{ModelSpec, SequenceTagger, build_tagger};
use seqtag_core::predict::Predictor;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const WEIGHTS_FILE: &str = "model.safetensors";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Tagger layout, vocabularies and batching options of a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub model: ModelSpec,
    pub vocabularies: Vocabularies,
    pub batcher: Batcher,
}

/// Write `varmap` and `manifest` into `dir`, creating it if needed.
pub fn save_checkpoint<P: AsRef<Path>>(dir: P, varmap: &VarMap, manifest: &Manifest) -> anyhow::Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    varmap
        .save(dir.join(WEIGHTS_FILE))
        .with_context(|| format!("failed to write weights to {}", dir.display()))?;
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(dir.join(MANIFEST_FILE), json)?;

    info!(path = %dir.display(), kind = %manifest.model.kind, "saved checkpoint");
    Ok(())
}

/// A tagger restored from a checkpoint directory, ready for prediction.
pub struct TrainedModel {
    manifest: Manifest,
    tagger: Box<dyn SequenceTagger>,
    device: Device,
    // Owns the parameters the tagger reads.
    _varmap: VarMap,
}

impl TrainedModel {
    pub fn load<P: AsRef<Path>>(dir: P, device: Device) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let manifest_path = dir.join(MANIFEST_FILE);
        let text = fs::read_to_string(&manifest_path)
            .with_context(|| format!("failed to read {}", manifest_path.display()))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("invalid manifest {}", manifest_path.display()))?;

        let spec = &manifest.model;
        // A pretrained table is rebuilt as a placeholder and overwritten by the saved weights.
        let source = if spec.pretrained {
            EmbeddingSource::placeholder(spec.vocab_size, spec.embedding_dim, &device)?
        } else {
            EmbeddingSource::Random
        };

        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let tagger = build_tagger(spec, &source, &varmap, vb)?;
        varmap
            .load(dir.join(WEIGHTS_FILE))
            .with_context(|| format!("failed to load weights from {}", dir.display()))?;

        info!(path = %dir.display(), kind = %spec.kind, "loaded checkpoint");
        Ok(Self {
            manifest,
            tagger,
            device,
            _varmap: varmap,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn predictor(&self) -> Predictor<'_> {
        Predictor::new(
            self.tagger.as_ref(),
            &self.manifest.vocabularies,
            self.manifest.batcher,
            &self.device,
        )
    }
}
