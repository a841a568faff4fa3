//! Seeded parameter initialization.
//!
//! Candle's CPU backend cannot be seeded, so freshly created parameters are
//! overwritten here from an `oorandom` generator. Pretrained tables are left
//! alone.

use candle_core::{Tensor, Var};
use candle_nn::VarMap;
use oorandom::Rand32;
use seqtag_core::embeddings::is_pretrained_name;
use tracing::debug;

/// Re-initialize every non-pretrained parameter of `varmap`.
///
/// Matrices and higher-rank weights are drawn uniformly from
/// `[-1/sqrt(fan_in), 1/sqrt(fan_in)]` where `fan_in` is the product of all
/// but the first dimension; vectors (biases) are zeroed. Parameters are
/// visited in name order so the result only depends on `seed`.
///
/// Returns the number of parameters that were reset.
pub fn reseed(varmap: &VarMap, seed: u64) -> anyhow::Result<usize> {
    let params = varmap
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("parameter store lock poisoned"))?;
    let mut named: Vec<(&String, &Var)> = params
        .iter()
        .filter(|(name, _)| !is_pretrained_name(name))
        .collect();
    named.sort_by(|a, b| a.0.cmp(b.0));

    let mut rng = Rand32::new(seed);
    for (name, var) in &named {
        let dims = var.dims().to_vec();
        let count: usize = dims.iter().product();
        let values: Vec<f32> = if dims.len() >= 2 {
            let fan_in: usize = dims[1..].iter().product();
            let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
            (0..count)
                .map(|_| (rng.rand_float() * 2.0 - 1.0) * bound)
                .collect()
        } else {
            vec![0.0; count]
        };

        let value = Tensor::from_vec(values, dims.as_slice(), var.device())?.to_dtype(var.dtype())?;
        var.set(&value)?;
        debug!(name = %name, shape = ?dims, "initialized parameter");
    }

    Ok(named.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarBuilder;
    use seqtag_core::embeddings::{EmbeddingSource, build_embedding};

    fn params(varmap: &VarMap) -> Vec<(String, Vec<f32>)> {
        let data = varmap.data().lock().unwrap();
        let mut out: Vec<(String, Vec<f32>)> = data
            .iter()
            .map(|(name, var)| {
                let flat = var.as_tensor().flatten_all().unwrap().to_vec1::<f32>().unwrap();
                (name.clone(), flat)
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn layers(varmap: &VarMap) {
        let vb = VarBuilder::from_varmap(varmap, DType::F32, &Device::Cpu);
        candle_nn::linear(4, 3, vb.pp("output")).unwrap();
        candle_nn::conv1d(2, 5, 3, Default::default(), vb.pp("conv")).unwrap();
    }

    #[test]
    fn test_same_seed_same_parameters() {
        let a = VarMap::new();
        let b = VarMap::new();
        layers(&a);
        layers(&b);
        assert_eq!(reseed(&a, 7).unwrap(), 4);
        reseed(&b, 7).unwrap();
        assert_eq!(params(&a), params(&b));

        let c = VarMap::new();
        layers(&c);
        reseed(&c, 8).unwrap();
        assert_ne!(params(&a), params(&c));
    }

    #[test]
    fn test_bounds_and_zero_biases() {
        let varmap = VarMap::new();
        layers(&varmap);
        reseed(&varmap, 1).unwrap();

        for (name, values) in params(&varmap) {
            if name.ends_with("bias") {
                assert!(values.iter().all(|&v| v == 0.0), "{name}");
            } else {
                // output: fan_in 4; conv: fan_in 2 * 3
                let fan_in = if name.starts_with("output") { 4.0 } else { 6.0 };
                let bound = 1.0 / f32::sqrt(fan_in);
                assert!(values.iter().all(|v| v.abs() <= bound), "{name}");
                assert!(values.iter().any(|&v| v != 0.0), "{name}");
            }
        }
    }

    #[test]
    fn test_pretrained_tables_untouched() {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let table = Tensor::ones((3, 2), DType::F32, &Device::Cpu).unwrap();
        build_embedding(&EmbeddingSource::Pretrained(table), "words", 3, 2, &varmap, vb.clone())
            .unwrap();
        candle_nn::linear(2, 2, vb.pp("output")).unwrap();

        assert_eq!(reseed(&varmap, 3).unwrap(), 2);
        let pretrained = params(&varmap)
            .into_iter()
            .find(|(name, _)| is_pretrained_name(name))
            .unwrap();
        assert_eq!(pretrained.1, vec![1.0; 6]);
    }
}
