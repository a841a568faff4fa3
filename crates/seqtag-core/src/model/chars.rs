//! Convolutional character encoder: one fixed-size vector per word.

use candle_core::{Module, Tensor};
use candle_nn::{Conv1d, Conv1dConfig, Embedding, VarBuilder};

use crate::model::CharSpec;

/// Character embeddings, a width-`k` convolution with ReLU, then max pooling
/// over the characters of each word.
pub struct CharEncoder {
    embedding: Embedding,
    conv: Conv1d,
    filters: usize,
}

impl CharEncoder {
    pub fn new(spec: &CharSpec, vb: VarBuilder) -> candle_core::Result<Self> {
        let embedding = candle_nn::embedding(spec.vocab_size, spec.embedding_dim, vb.pp("embedding"))?;
        let config = Conv1dConfig {
            padding: spec.kernel_size / 2,
            ..Default::default()
        };
        let conv = candle_nn::conv1d(
            spec.embedding_dim,
            spec.filters,
            spec.kernel_size,
            config,
            vb.pp("conv"),
        )?;
        Ok(Self {
            embedding,
            conv,
            filters: spec.filters,
        })
    }

    pub fn output_dim(&self) -> usize {
        self.filters
    }

    /// `ids`, `mask`: `(B, T, W)`; returns `(B, T, filters)`.
    ///
    /// Padded characters are zeroed before the convolution, so a word's
    /// vector does not depend on how long the other words in the batch are.
    pub fn forward(&self, ids: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let (b, t, w) = ids.dims3()?;
        let mask = mask.reshape((b * t, w))?;

        let embedded = self
            .embedding
            .forward(&ids.reshape((b * t, w))?)?
            .broadcast_mul(&mask.unsqueeze(2)?)?;
        // (N, W, E) -> (N, E, W) for the convolution.
        let features = self
            .conv
            .forward(&embedded.transpose(1, 2)?.contiguous()?)?
            .relu()?
            .broadcast_mul(&mask.unsqueeze(1)?)?;

        // ReLU outputs are non-negative, so zeroed padding never wins the max.
        features.max(2)?.reshape((b, t, self.filters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    fn encoder() -> (VarMap, CharEncoder) {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let spec = CharSpec {
            vocab_size: 10,
            embedding_dim: 4,
            filters: 6,
            kernel_size: 3,
        };
        let encoder = CharEncoder::new(&spec, vb).unwrap();
        (varmap, encoder)
    }

    #[test]
    fn test_output_shape() {
        let (_varmap, encoder) = encoder();
        let ids = Tensor::new(&[[[2u32, 3, 0], [4, 0, 0]]], &Device::Cpu).unwrap();
        let mask = Tensor::new(&[[[1f32, 1.0, 0.0], [1.0, 0.0, 0.0]]], &Device::Cpu).unwrap();
        let out = encoder.forward(&ids, &mask).unwrap();
        assert_eq!(out.dims(), &[1, 2, 6]);
        assert_eq!(encoder.output_dim(), 6);
    }

    #[test]
    fn test_independent_of_padding_width() {
        let (_varmap, encoder) = encoder();
        let narrow_ids = Tensor::new(&[[[5u32, 6]]], &Device::Cpu).unwrap();
        let narrow_mask = Tensor::new(&[[[1f32, 1.0]]], &Device::Cpu).unwrap();
        let wide_ids = Tensor::new(&[[[5u32, 6, 0, 0, 0]]], &Device::Cpu).unwrap();
        let wide_mask = Tensor::new(&[[[1f32, 1.0, 0.0, 0.0, 0.0]]], &Device::Cpu).unwrap();

        let narrow = encoder.forward(&narrow_ids, &narrow_mask).unwrap();
        let wide = encoder.forward(&wide_ids, &wide_mask).unwrap();
        let diff = (narrow - wide)
            .unwrap()
            .abs()
            .unwrap()
            .max_all()
            .unwrap()
            .to_scalar::<f32>()
            .unwrap();
        assert!(diff < 1e-5);
    }

    #[test]
    fn test_fully_padded_word_is_zero() {
        let (_varmap, encoder) = encoder();
        let ids = Tensor::new(&[[[0u32, 0]]], &Device::Cpu).unwrap();
        let mask = Tensor::zeros((1, 1, 2), DType::F32, &Device::Cpu).unwrap();
        let out = encoder.forward(&ids, &mask).unwrap();
        assert_eq!(out.to_vec3::<f32>().unwrap(), vec![vec![vec![0.0; 6]]]);
    }
}
