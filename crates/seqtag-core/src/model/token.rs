//! Per-token input features shared by every tagger variant.

use candle_core::{Module, Tensor};
use candle_nn::{Embedding, VarBuilder, VarMap};

use crate::data::Batch;
use crate::embeddings::{EmbeddingSource, build_embedding};
use crate::error::Result;
use crate::model::{CharEncoder, ModelSpec};

/// Word embedding, optionally concatenated with a character encoding.
/// Padded positions come out as zero vectors.
pub struct TokenEncoder {
    words: Embedding,
    chars: Option<CharEncoder>,
    output_dim: usize,
}

impl TokenEncoder {
    pub fn new(
        spec: &ModelSpec,
        source: &EmbeddingSource,
        varmap: &VarMap,
        vb: VarBuilder,
    ) -> Result<Self> {
        let words = build_embedding(
            source,
            "word_embedding",
            spec.vocab_size,
            spec.embedding_dim,
            varmap,
            vb.clone(),
        )?;
        let chars = match &spec.chars {
            Some(char_spec) => Some(CharEncoder::new(char_spec, vb.pp("char_encoder"))?),
            None => None,
        };
        let output_dim = spec.embedding_dim + chars.as_ref().map_or(0, CharEncoder::output_dim);

        Ok(Self {
            words,
            chars,
            output_dim,
        })
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// `(B, T, output_dim)` features for the batch.
    pub fn forward(&self, batch: &Batch) -> candle_core::Result<Tensor> {
        let mut features = self.words.forward(&batch.words)?;

        if let Some(encoder) = &self.chars {
            let (Some(ids), Some(mask)) = (&batch.chars, &batch.char_mask) else {
                candle_core::bail!("model uses characters but the batch has none");
            };
            let char_features = encoder.forward(ids, mask)?;
            features = Tensor::cat(&[&features, &char_features], 2)?;
        }

        features.broadcast_mul(&batch.mask.unsqueeze(2)?)
    }
}
