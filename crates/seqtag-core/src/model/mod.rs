//! # Sequence Taggers
//!
//! Every tagger maps a padded [`Batch`] to emission scores of shape
//! `(sentences, positions, labels)`. Which variant is used is decided once,
//! from a [`ModelSpec`], by [`build_tagger`].
//!
//! Label id 0 is the padding label: it is trained against only at masked
//! positions (which carry no loss) and is never decoded.

pub mod chars;
pub mod recurrent;
pub mod token;
pub mod window;
pub mod word;

use std::fmt;
use std::str::FromStr;

use candle_core::{D, Tensor};
use candle_nn::{VarBuilder, VarMap};
use serde::{Deserialize, Serialize};

use crate::data::Batch;
use crate::embeddings::EmbeddingSource;
use crate::error::{Result, SeqTagError};

pub use chars::CharEncoder;
pub use recurrent::RecurrentTagger;
pub use token::TokenEncoder;
pub use window::WindowTagger;
pub use word::WordTagger;

/// Common scoring interface of all tagger variants.
pub trait SequenceTagger {
    /// Emission scores `(B, T, num_labels)` for a batch.
    fn forward(&self, batch: &Batch) -> candle_core::Result<Tensor>;

    fn kind(&self) -> ModelKind;
}

/// How context around a position is mixed into its representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Each word on its own.
    Word,
    /// The word and its immediate neighbors.
    Window,
    /// A bidirectional LSTM over the sentence.
    #[default]
    Recurrent,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Word => write!(f, "word"),
            ModelKind::Window => write!(f, "window"),
            ModelKind::Recurrent => write!(f, "recurrent"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = SeqTagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "word" => Ok(ModelKind::Word),
            "window" => Ok(ModelKind::Window),
            "recurrent" | "rnn" | "lstm" => Ok(ModelKind::Recurrent),
            other => Err(SeqTagError::InvalidModel(format!("unknown model kind {other:?}"))),
        }
    }
}

/// Character sub-encoder dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharSpec {
    pub vocab_size: usize,
    pub embedding_dim: usize,
    pub filters: usize,
    /// Convolution width; must be odd so outputs line up with characters.
    pub kernel_size: usize,
}

/// Everything needed to rebuild a tagger's parameter layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub kind: ModelKind,
    pub vocab_size: usize,
    pub embedding_dim: usize,
    /// Per-direction LSTM size; unused by the other variants.
    pub hidden_dim: usize,
    pub num_labels: usize,
    pub chars: Option<CharSpec>,
    /// The word table was pretrained (stored under the pretrained prefix).
    pub pretrained: bool,
}

impl ModelSpec {
    fn validate(&self) -> Result<()> {
        if self.num_labels < 2 {
            return Err(SeqTagError::InvalidModel(
                "need at least one label besides padding".into(),
            ));
        }
        if self.embedding_dim == 0 || self.vocab_size == 0 {
            return Err(SeqTagError::InvalidModel("empty word embedding".into()));
        }
        if self.kind == ModelKind::Recurrent && self.hidden_dim == 0 {
            return Err(SeqTagError::InvalidModel("hidden_dim must be positive".into()));
        }
        if let Some(chars) = &self.chars {
            if chars.kernel_size % 2 == 0 {
                return Err(SeqTagError::InvalidModel(format!(
                    "char kernel size must be odd, got {}",
                    chars.kernel_size
                )));
            }
            if chars.filters == 0 || chars.embedding_dim == 0 {
                return Err(SeqTagError::InvalidModel("empty character encoder".into()));
            }
        }
        Ok(())
    }
}

/// Build the tagger described by `spec`. Parameters are registered in
/// `varmap`, through `vb` for fresh ones.
pub fn build_tagger(
    spec: &ModelSpec,
    source: &EmbeddingSource,
    varmap: &VarMap,
    vb: VarBuilder,
) -> Result<Box<dyn SequenceTagger>> {
    spec.validate()?;
    let tokens = TokenEncoder::new(spec, source, varmap, vb.clone())?;
    let tagger: Box<dyn SequenceTagger> = match spec.kind {
        ModelKind::Word => Box::new(WordTagger::new(tokens, spec.num_labels, vb)?),
        ModelKind::Window => Box::new(WindowTagger::new(tokens, spec.num_labels, vb)?),
        ModelKind::Recurrent => Box::new(RecurrentTagger::new(
            tokens,
            spec.hidden_dim,
            spec.num_labels,
            vb,
        )?),
    };
    Ok(tagger)
}

/// Mean token-level cross-entropy over real positions only.
///
/// `scores`: `(B, T, L)`, `labels`: `(B, T)` u32, `mask`: `(B, T)` f32.
pub fn masked_cross_entropy(
    scores: &Tensor,
    labels: &Tensor,
    mask: &Tensor,
) -> candle_core::Result<Tensor> {
    let (b, t, l) = scores.dims3()?;
    let log_probs = candle_nn::ops::log_softmax(&scores.reshape((b * t, l))?, D::Minus1)?;
    let gold = log_probs
        .gather(&labels.reshape((b * t, 1))?.contiguous()?, 1)?
        .squeeze(1)?;
    let mask = mask.reshape(b * t)?;
    let total = gold.mul(&mask)?.sum_all()?;
    let count = mask.sum_all()?.maximum(1.0)?;
    total.neg()?.div(&count)
}

/// Highest-scoring label id per real position, one vector per sentence.
pub fn decode(scores: &Tensor, batch: &Batch) -> Result<Vec<Vec<u32>>> {
    let (_, _, num_labels) = scores.dims3()?;
    if num_labels < 2 {
        return Err(SeqTagError::InvalidModel(
            "need at least one label besides padding".into(),
        ));
    }
    // Column 0 is the padding label and is never predicted.
    let best = scores
        .narrow(2, 1, num_labels - 1)?
        .contiguous()?
        .argmax(D::Minus1)?
        .to_vec2::<u32>()?;

    Ok(best
        .iter()
        .enumerate()
        .map(|(i, row)| row[batch.span(i)].iter().map(|&id| id + 1).collect())
        .collect())
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use candle_core::Device;

    #[test]
    fn test_model_kind_parse() {
        assert_eq!("Window".parse::<ModelKind>().unwrap(), ModelKind::Window);
        assert_eq!("lstm".parse::<ModelKind>().unwrap(), ModelKind::Recurrent);
        assert!("crf".parse::<ModelKind>().is_err());
        assert_eq!(ModelKind::Word.to_string(), "word");
    }

    #[test]
    fn test_spec_validation() {
        let mut bad = spec(ModelKind::Word, true);
        bad.chars.as_mut().unwrap().kernel_size = 2;
        assert!(bad.validate().is_err());

        let mut bad = spec(ModelKind::Word, false);
        bad.num_labels = 1;
        assert!(bad.validate().is_err());

        assert!(spec(ModelKind::Recurrent, true).validate().is_ok());
    }

    #[test]
    fn test_masked_loss_ignores_padding() {
        let device = Device::Cpu;
        // Two positions; the second is padding with a terrible score for its label.
        let scores = Tensor::new(&[[[0.0f32, 2.0, 0.0], [50.0, -50.0, 0.0]]], &device).unwrap();
        let labels = Tensor::new(&[[1u32, 1]], &device).unwrap();
        let mask = Tensor::new(&[[1.0f32, 0.0]], &device).unwrap();

        let loss = masked_cross_entropy(&scores, &labels, &mask)
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        let expected = -(2.0f32.exp() / (2.0 + 2.0f32.exp())).ln();
        assert!((loss - expected).abs() < 1e-5);
    }

    #[test]
    fn test_decode_skips_pad_label_and_padding() {
        let sentences = [sentence(&[3, 4]), sentence(&[5])];
        let refs: Vec<_> = sentences.iter().collect();
        let batch = batcher(false).batch(&refs, &Device::Cpu).unwrap();
        let scores = Tensor::new(
            &[
                [[9.0f32, 1.0, 0.0, 0.0], [9.0, 0.0, 0.0, 3.0]],
                [[9.0, 0.0, 2.0, 0.0], [9.0, 0.0, 0.0, 0.0]],
            ],
            &Device::Cpu,
        )
        .unwrap();
        let decoded = decode(&scores, &batch).unwrap();
        assert_eq!(decoded, vec![vec![1, 3], vec![2]]);
    }

    #[test]
    fn test_factory_selects_variant() {
        for kind in [ModelKind::Word, ModelKind::Window, ModelKind::Recurrent] {
            let (_, tagger) = build(&spec(kind, false));
            assert_eq!(tagger.kind(), kind);
        }
    }
}
