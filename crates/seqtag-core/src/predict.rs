//! # Inference
//!
//! Runs a trained tagger over sentences without touching its parameters:
//! label prediction for raw token lists and chunk evaluation for labeled data.

use candle_core::Device;

use crate::data::{Batcher, EncodedSentence, SequenceDataset, Vocabularies};
use crate::error::Result;
use crate::model::{SequenceTagger, decode};
use crate::tagging::EvaluationStats;

/// Default number of sentences per inference batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Read-only view of a tagger and its vocabularies.
pub struct Predictor<'a> {
    tagger: &'a dyn SequenceTagger,
    vocabs: &'a Vocabularies,
    batcher: Batcher,
    device: &'a Device,
    batch_size: usize,
}

impl<'a> Predictor<'a> {
    pub fn new(
        tagger: &'a dyn SequenceTagger,
        vocabs: &'a Vocabularies,
        batcher: Batcher,
        device: &'a Device,
    ) -> Self {
        Self {
            tagger,
            vocabs,
            batcher,
            device,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// One label sequence per input sentence, in input order, each as long
    /// as its sentence. Unknown words go through the unknown id.
    pub fn predict<T, S>(&self, sentences: &[T]) -> Result<Vec<Vec<String>>>
    where
        T: AsRef<[S]>,
        S: AsRef<str>,
    {
        let encoded = sentences
            .iter()
            .map(|s| self.vocabs.encode_words(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let refs: Vec<&EncodedSentence> = encoded.iter().collect();

        self.predict_ids(&refs)?
            .iter()
            .map(|ids| self.vocabs.decode_labels(ids))
            .collect()
    }

    /// Predicted label ids for already-encoded sentences, in input order.
    /// Empty sentences get empty predictions without reaching the model.
    pub fn predict_ids(&self, sentences: &[&EncodedSentence]) -> Result<Vec<Vec<u32>>> {
        let mut predictions = vec![Vec::new(); sentences.len()];
        let non_empty: Vec<usize> = (0..sentences.len())
            .filter(|&i| !sentences[i].is_empty())
            .collect();

        for chunk in non_empty.chunks(self.batch_size) {
            let members: Vec<&EncodedSentence> = chunk.iter().map(|&i| sentences[i]).collect();
            let batch = self.batcher.batch(&members, self.device)?;
            let scores = self.tagger.forward(&batch)?;
            for (&i, ids) in chunk.iter().zip(decode(&scores, &batch)?) {
                predictions[i] = ids;
            }
        }

        Ok(predictions)
    }

    /// Chunk statistics of the tagger's predictions against the gold labels of `dataset`.
    pub fn evaluate(&self, dataset: &SequenceDataset) -> Result<EvaluationStats> {
        let refs: Vec<&EncodedSentence> = dataset.encoded.iter().collect();
        let predictions = self.predict_ids(&refs)?;

        let mut stats = EvaluationStats::new();
        for (sentence, ids) in dataset.sentences.iter().zip(&predictions) {
            let predicted = self.vocabs.decode_labels(ids)?;
            stats.update(&sentence.labels, &predicted)?;
        }
        Ok(stats)
    }
}
