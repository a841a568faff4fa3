//! Per-word tagger: no context at all.

use candle_core::{Module, Tensor};
use candle_nn::{Linear, VarBuilder};

use crate::data::Batch;
use crate::model::{ModelKind, SequenceTagger, TokenEncoder};

/// Classifies each position from its own token features.
pub struct WordTagger {
    tokens: TokenEncoder,
    output: Linear,
}

impl WordTagger {
    pub fn new(tokens: TokenEncoder, num_labels: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let output = candle_nn::linear(tokens.output_dim(), num_labels, vb.pp("output"))?;
        Ok(Self { tokens, output })
    }
}

impl SequenceTagger for WordTagger {
    fn forward(&self, batch: &Batch) -> candle_core::Result<Tensor> {
        self.output.forward(&self.tokens.forward(batch)?)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Word
    }
}

#[cfg(test)]
mod tests {
    use crate::model::ModelKind;
    use crate::model::test_support::*;

    #[test]
    fn test_padding_invariant() {
        let (_varmap, tagger) = build(&spec(ModelKind::Word, false));
        assert_padding_invariant(tagger.as_ref(), false, false);
    }

    #[test]
    fn test_padding_invariant_with_chars() {
        let (_varmap, tagger) = build(&spec(ModelKind::Word, true));
        assert_padding_invariant(tagger.as_ref(), true, false);
    }
}
