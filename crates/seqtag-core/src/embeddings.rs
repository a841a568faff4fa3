//! # Word Embeddings
//!
//! Pretrained vectors in the word2vec/GloVe text format, and a factory that
//! turns either a fresh table or a pretrained one into a single
//! [`candle_nn::Embedding`]. Model code never knows where its vectors came from.
//!
//! Pretrained tables live in the parameter store under [`PRETRAINED_PREFIX`]
//! so they are saved with the checkpoint; whether they are updated is decided
//! by [`trainable_variables`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use candle_core::{DType, Device, Tensor, Var};
use candle_nn::{Embedding, VarBuilder, VarMap};
use tracing::{debug, warn};

use crate::error::{Result, SeqTagError};
use crate::vocab::Vocabulary;

/// Name prefix of pretrained tables inside a [`VarMap`].
pub const PRETRAINED_PREFIX: &str = "pretrained";

/// Vectors read from a text embedding file.
#[derive(Debug, Clone)]
pub struct PretrainedEmbeddings {
    tokens: Vec<String>,
    vectors: Vec<f32>,
    dim: usize,
}

impl PretrainedEmbeddings {
    /// Load `token v1 .. vD` lines, with an optional `count dim` header.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let embeddings = Self::read(BufReader::new(File::open(path)?))?;
        debug!(
            path = %path.display(),
            tokens = embeddings.len(),
            dim = embeddings.dim(),
            "loaded pretrained embeddings"
        );
        Ok(embeddings)
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut tokens = Vec::new();
        let mut vectors = Vec::new();
        let mut dim = 0;

        for (line_idx, line) in reader.lines().enumerate() {
            let line = line?;
            let mut fields = line.split_whitespace();
            let Some(token) = fields.next() else {
                continue;
            };
            let values: std::result::Result<Vec<f32>, _> = fields.map(str::parse::<f32>).collect();

            let Ok(values) = values else {
                warn!(line = line_idx + 1, "skipping embedding row with non-numeric values");
                continue;
            };
            // word2vec header: "<count> <dim>"
            if line_idx == 0 && values.len() == 1 && token.parse::<usize>().is_ok() {
                continue;
            }
            if values.is_empty() {
                warn!(line = line_idx + 1, "skipping embedding row without values");
                continue;
            }
            if dim == 0 {
                dim = values.len();
            } else if values.len() != dim {
                warn!(
                    line = line_idx + 1,
                    expected = dim,
                    actual = values.len(),
                    "skipping embedding row with wrong dimension"
                );
                continue;
            }

            tokens.push(token.to_string());
            vectors.extend(values);
        }

        Self::from_parts(tokens, vectors, dim)
    }

    /// Build from an in-memory token list and row-major vectors.
    pub fn from_parts(tokens: Vec<String>, vectors: Vec<f32>, dim: usize) -> Result<Self> {
        if tokens.is_empty() || dim == 0 {
            return Err(SeqTagError::InvalidPretrained("no vectors found".into()));
        }
        if vectors.len() != tokens.len() * dim {
            return Err(SeqTagError::DimensionMismatch {
                expected: tokens.len() * dim,
                actual: vectors.len(),
            });
        }
        Ok(Self {
            tokens,
            vectors,
            dim,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// A word vocabulary over exactly the pretrained tokens.
    pub fn vocabulary(&self, lowercase: bool) -> Vocabulary {
        Vocabulary::from_tokens(self.tokens.iter().cloned(), lowercase)
    }

    /// The `(vocab.len(), dim)` table aligned with `vocab`. Reserved rows and
    /// tokens without a vector are zero.
    pub fn table(&self, vocab: &Vocabulary, device: &Device) -> Result<Tensor> {
        let mut rows: HashMap<String, usize> = HashMap::with_capacity(self.tokens.len());
        for (row, token) in self.tokens.iter().enumerate() {
            let key = if vocab.lowercase() {
                token.to_lowercase()
            } else {
                token.clone()
            };
            rows.entry(key).or_insert(row);
        }

        let mut data = vec![0f32; vocab.len() * self.dim];
        for (offset, token) in vocab.tokens().iter().enumerate() {
            if let Some(&row) = rows.get(token) {
                let id = offset + vocab.num_reserved();
                data[id * self.dim..(id + 1) * self.dim]
                    .copy_from_slice(&self.vectors[row * self.dim..(row + 1) * self.dim]);
            }
        }

        Ok(Tensor::from_vec(data, (vocab.len(), self.dim), device)?)
    }
}

/// Where a word embedding table comes from.
#[derive(Debug, Clone)]
pub enum EmbeddingSource {
    /// A freshly initialized table.
    Random,
    /// A ready-made `(vocab_size, dim)` table.
    Pretrained(Tensor),
}

impl EmbeddingSource {
    pub fn is_pretrained(&self) -> bool {
        matches!(self, EmbeddingSource::Pretrained(_))
    }

    /// A zero placeholder of the right shape, to be overwritten when weights are loaded.
    pub fn placeholder(vocab_size: usize, dim: usize, device: &Device) -> Result<Self> {
        Ok(EmbeddingSource::Pretrained(Tensor::zeros(
            (vocab_size, dim),
            DType::F32,
            device,
        )?))
    }
}

/// Produce the embedding layer `name` of shape `(vocab_size, dim)`.
///
/// Random tables are created through `vb`; pretrained tables are registered
/// in `varmap` as `pretrained.<name>.weight`.
pub fn build_embedding(
    source: &EmbeddingSource,
    name: &str,
    vocab_size: usize,
    dim: usize,
    varmap: &VarMap,
    vb: VarBuilder,
) -> Result<Embedding> {
    match source {
        EmbeddingSource::Random => Ok(candle_nn::embedding(vocab_size, dim, vb.pp(name))?),
        EmbeddingSource::Pretrained(table) => {
            let (rows, cols) = table.dims2()?;
            if rows != vocab_size {
                return Err(SeqTagError::DimensionMismatch {
                    expected: vocab_size,
                    actual: rows,
                });
            }
            if cols != dim {
                return Err(SeqTagError::DimensionMismatch {
                    expected: dim,
                    actual: cols,
                });
            }

            let key = format!("{PRETRAINED_PREFIX}.{name}.weight");
            let table = table.to_dtype(DType::F32)?.contiguous()?;
            let mut params = varmap
                .data()
                .lock()
                .map_err(|_| SeqTagError::InvalidModel("parameter store lock poisoned".into()))?;
            let var = match params.get(&key) {
                Some(var) => {
                    var.set(&table)?;
                    var.clone()
                }
                None => {
                    let var = Var::from_tensor(&table)?;
                    params.insert(key, var.clone());
                    var
                }
            };
            Ok(Embedding::new(var.as_tensor().clone(), dim))
        }
    }
}

/// The variables an optimizer should update, sorted by name. Pretrained
/// tables are only included when `fine_tune` is set.
pub fn trainable_variables(varmap: &VarMap, fine_tune: bool) -> Result<Vec<Var>> {
    let params = varmap
        .data()
        .lock()
        .map_err(|_| SeqTagError::InvalidModel("parameter store lock poisoned".into()))?;
    let mut named: Vec<(&String, &Var)> = params
        .iter()
        .filter(|(name, _)| fine_tune || !is_pretrained_name(name))
        .collect();
    named.sort_by(|a, b| a.0.cmp(b.0));
    Ok(named.into_iter().map(|(_, var)| var.clone()).collect())
}

/// True for parameter names that hold a pretrained table.
pub fn is_pretrained_name(name: &str) -> bool {
    name.strip_prefix(PRETRAINED_PREFIX)
        .is_some_and(|rest| rest.starts_with('.'))
}
