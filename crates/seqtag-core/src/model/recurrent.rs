//! Bidirectional LSTM tagger.

use candle_core::{Module, Tensor};
use candle_nn::{LSTM, LSTMConfig, Linear, RNN, VarBuilder};

use crate::data::Batch;
use crate::model::{ModelKind, SequenceTagger, TokenEncoder};

/// Forward and backward LSTMs over the token features; their states are
/// concatenated per position before the classifier.
///
/// The backward LSTM reads each sentence's real tokens in reverse and only
/// then the trailing padding, so padding never reaches a real position.
pub struct RecurrentTagger {
    tokens: TokenEncoder,
    forward_rnn: LSTM,
    backward_rnn: LSTM,
    output: Linear,
}

impl RecurrentTagger {
    pub fn new(
        tokens: TokenEncoder,
        hidden_dim: usize,
        num_labels: usize,
        vb: VarBuilder,
    ) -> candle_core::Result<Self> {
        let input_dim = tokens.output_dim();
        let forward_rnn = candle_nn::lstm(input_dim, hidden_dim, LSTMConfig::default(), vb.pp("lstm_forward"))?;
        let backward_rnn = candle_nn::lstm(input_dim, hidden_dim, LSTMConfig::default(), vb.pp("lstm_backward"))?;
        let output = candle_nn::linear(2 * hidden_dim, num_labels, vb.pp("output"))?;
        Ok(Self {
            tokens,
            forward_rnn,
            backward_rnn,
            output,
        })
    }
}

/// Flat row indices that reverse the real tokens of every sentence in place
/// and leave padding where it is. Applying it twice is the identity.
fn reversal_index(batch: &Batch) -> Vec<u32> {
    let seq_len = batch.seq_len();
    let mut index = Vec::with_capacity(batch.batch_size() * seq_len);
    for i in 0..batch.batch_size() {
        let span = batch.span(i);
        let base = i * seq_len;
        for pos in 0..seq_len {
            let source = if span.contains(&pos) {
                span.start + span.end - 1 - pos
            } else {
                pos
            };
            index.push((base + source) as u32);
        }
    }
    index
}

/// Reorder the positions of `x` (`(B, T, D)`) by a flat row index.
fn permute_positions(x: &Tensor, index: &Tensor) -> candle_core::Result<Tensor> {
    let (b, t, d) = x.dims3()?;
    x.reshape((b * t, d))?
        .index_select(index, 0)?
        .reshape((b, t, d))
}

impl SequenceTagger for RecurrentTagger {
    fn forward(&self, batch: &Batch) -> candle_core::Result<Tensor> {
        let features = self.tokens.forward(batch)?;

        let states = self.forward_rnn.seq(&features)?;
        let forward = self.forward_rnn.states_to_tensor(&states)?;

        let index = Tensor::new(reversal_index(batch), features.device())?;
        let reversed = permute_positions(&features, &index)?;
        let states = self.backward_rnn.seq(&reversed)?;
        let backward = permute_positions(&self.backward_rnn.states_to_tensor(&states)?, &index)?;

        let hidden = Tensor::cat(&[&forward, &backward], 2)?;
        self.output.forward(&hidden)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Recurrent
    }
}
