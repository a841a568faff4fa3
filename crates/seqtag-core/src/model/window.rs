//! Window tagger: each position sees its left and right neighbor.

use candle_core::{Module, Tensor};
use candle_nn::{Linear, VarBuilder};

use crate::data::Batch;
use crate::model::{ModelKind, SequenceTagger, TokenEncoder};

/// Concatenates `[left, self, right]` token features before the classifier.
/// Missing neighbors (sentence edges, padding) are zero vectors.
pub struct WindowTagger {
    tokens: TokenEncoder,
    output: Linear,
}

impl WindowTagger {
    pub fn new(tokens: TokenEncoder, num_labels: usize, vb: VarBuilder) -> candle_core::Result<Self> {
        let output = candle_nn::linear(3 * tokens.output_dim(), num_labels, vb.pp("output"))?;
        Ok(Self { tokens, output })
    }
}

/// `[left, x, right]` along the feature axis for `x` of shape `(B, T, D)`.
fn windows(x: &Tensor) -> candle_core::Result<Tensor> {
    let (b, t, d) = x.dims3()?;
    let zeros = Tensor::zeros((b, 1, d), x.dtype(), x.device())?;
    let (left, right) = if t > 1 {
        (
            Tensor::cat(&[&zeros, &x.narrow(1, 0, t - 1)?], 1)?,
            Tensor::cat(&[&x.narrow(1, 1, t - 1)?, &zeros], 1)?,
        )
    } else {
        (zeros.clone(), zeros)
    };
    Tensor::cat(&[&left, x, &right], 2)
}

impl SequenceTagger for WindowTagger {
    fn forward(&self, batch: &Batch) -> candle_core::Result<Tensor> {
        let features = self.tokens.forward(batch)?;
        self.output.forward(&windows(&features)?)
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_support::*;
    use candle_core::Device;

    #[test]
    fn test_windows_shift_with_zero_edges() {
        let x = Tensor::new(&[[[1f32], [2.0], [3.0]]], &Device::Cpu).unwrap();
        let w = windows(&x).unwrap().to_vec3::<f32>().unwrap();
        assert_eq!(
            w,
            vec![vec![vec![0.0, 1.0, 2.0], vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 0.0]]]
        );
    }

    #[test]
    fn test_single_position() {
        let x = Tensor::new(&[[[4f32, 5.0]]], &Device::Cpu).unwrap();
        let w = windows(&x).unwrap().to_vec3::<f32>().unwrap();
        assert_eq!(w, vec![vec![vec![0.0, 0.0, 4.0, 5.0, 0.0, 0.0]]]);
    }

    #[test]
    fn test_padding_invariant() {
        let (_varmap, tagger) = build(&spec(ModelKind::Window, false));
        assert_padding_invariant(tagger.as_ref(), false, false);
        assert_padding_invariant(tagger.as_ref(), false, true);
    }

    #[test]
    fn test_padding_invariant_with_chars() {
        let (_varmap, tagger) = build(&spec(ModelKind::Window, true));
        assert_padding_invariant(tagger.as_ref(), true, false);
    }
}
