//! Padding of variable-length encoded sentences into rectangular tensors.

use std::ops::Range;

use candle_core::{Device, Tensor};
use oorandom::Rand32;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A sentence after vocabulary lookup.
///
/// `chars` holds one id sequence per word, or is empty when character
/// features are not used.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncodedSentence {
    pub words: Vec<u32>,
    pub labels: Vec<u32>,
    pub chars: Vec<Vec<u32>>,
}

impl EncodedSentence {
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Padded tensors for one minibatch.
///
/// With `B` sentences, `T` positions and `W` characters per word:
/// `words`, `labels`: `(B, T)` u32; `mask`: `(B, T)` f32, 1.0 on real tokens;
/// `chars`, `char_mask`: `(B, T, W)`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub words: Tensor,
    pub labels: Tensor,
    pub mask: Tensor,
    pub chars: Option<Tensor>,
    pub char_mask: Option<Tensor>,
    pub lengths: Vec<usize>,
    /// Number of leading pad slots before the first real token.
    pub offset: usize,
}

impl Batch {
    pub fn batch_size(&self) -> usize {
        self.lengths.len()
    }

    pub fn seq_len(&self) -> usize {
        self.words.dims().get(1).copied().unwrap_or(0)
    }

    /// Positions of the real tokens of sentence `i`.
    pub fn span(&self, i: usize) -> Range<usize> {
        self.offset..self.offset + self.lengths[i]
    }
}

/// Builds [`Batch`]es. Deterministic: identical input order gives identical tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batcher {
    pub pad_id: u32,
    /// Reserve one pad slot in front of every sentence.
    pub leading_pad: bool,
    /// Produce character tensors.
    pub chars: bool,
}

impl Default for Batcher {
    fn default() -> Self {
        Self {
            pad_id: 0,
            leading_pad: false,
            chars: false,
        }
    }
}

impl Batcher {
    pub fn new(pad_id: u32) -> Self {
        Self {
            pad_id,
            ..Self::default()
        }
    }

    pub fn with_leading_pad(mut self, leading_pad: bool) -> Self {
        self.leading_pad = leading_pad;
        self
    }

    pub fn with_chars(mut self, chars: bool) -> Self {
        self.chars = chars;
        self
    }

    /// Pad `sentences` (in order) into one batch on `device`.
    pub fn batch(&self, sentences: &[&EncodedSentence], device: &Device) -> Result<Batch> {
        let offset = usize::from(self.leading_pad);
        let lengths: Vec<usize> = sentences.iter().map(|s| s.len()).collect();
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        // Keep at least one column so an all-empty batch still has a valid shape.
        let seq_len = (max_len + offset).max(1);
        let batch_size = sentences.len();

        let mut words = vec![self.pad_id; batch_size * seq_len];
        let mut labels = vec![self.pad_id; batch_size * seq_len];
        let mut mask = vec![0f32; batch_size * seq_len];

        for (row, sentence) in sentences.iter().enumerate() {
            let base = row * seq_len + offset;
            for (pos, (&word, &label)) in sentence.words.iter().zip(&sentence.labels).enumerate() {
                words[base + pos] = word;
                labels[base + pos] = label;
                mask[base + pos] = 1.0;
            }
        }

        let shape = (batch_size, seq_len);
        let (chars, char_mask) = if self.chars {
            let (chars, char_mask) = self.pad_chars(sentences, seq_len, offset, device)?;
            (Some(chars), Some(char_mask))
        } else {
            (None, None)
        };

        Ok(Batch {
            words: Tensor::from_vec(words, shape, device)?,
            labels: Tensor::from_vec(labels, shape, device)?,
            mask: Tensor::from_vec(mask, shape, device)?,
            chars,
            char_mask,
            lengths,
            offset,
        })
    }

    fn pad_chars(
        &self,
        sentences: &[&EncodedSentence],
        seq_len: usize,
        offset: usize,
        device: &Device,
    ) -> Result<(Tensor, Tensor)> {
        let word_len = sentences
            .iter()
            .flat_map(|s| s.chars.iter().map(Vec::len))
            .max()
            .unwrap_or(0)
            .max(1);
        let batch_size = sentences.len();

        let mut chars = vec![self.pad_id; batch_size * seq_len * word_len];
        let mut mask = vec![0f32; batch_size * seq_len * word_len];

        for (row, sentence) in sentences.iter().enumerate() {
            for (pos, word) in sentence.chars.iter().enumerate() {
                let base = (row * seq_len + offset + pos) * word_len;
                for (k, &c) in word.iter().enumerate() {
                    chars[base + k] = c;
                    mask[base + k] = 1.0;
                }
            }
        }

        let shape = (batch_size, seq_len, word_len);
        Ok((
            Tensor::from_vec(chars, shape, device)?,
            Tensor::from_vec(mask, shape, device)?,
        ))
    }
}

/// Randomly replaces word ids with the unknown id during training.
#[derive(Debug, Clone)]
pub struct WordDropout {
    probability: f32,
    unknown_id: u32,
    rng: Rand32,
}

impl WordDropout {
    pub fn new(probability: f32, unknown_id: u32, seed: u64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
            unknown_id,
            rng: Rand32::new(seed),
        }
    }

    pub fn probability(&self) -> f32 {
        self.probability
    }

    /// A copy of `sentence` with some words swapped for the unknown id.
    /// Labels and characters are left untouched.
    pub fn apply(&mut self, sentence: &EncodedSentence) -> EncodedSentence {
        let mut dropped = sentence.clone();
        if self.probability > 0.0 {
            for word in &mut dropped.words {
                if self.rng.rand_float() < self.probability {
                    *word = self.unknown_id;
                }
            }
        }
        dropped
    }
}
