use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::{Dataset, InMemDataset};
use burn::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sentences generated when no external corpus is given.
pub const TRAIN_SENTENCES: usize = 2000;
/// Held-out sentences evaluated after each epoch.
pub const VALID_SENTENCES: usize = 200;

const SYNTH_MIN_LEN: usize = 4;
const SYNTH_MAX_LEN: usize = 12;

/// A tokenized sentence with one label per token.
///
/// Token ids come from an external tokenizer; labels below zero mark
/// positions excluded from the loss and the evaluation.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TaggedSentence {
    pub tokens: Vec<i64>,
    pub labels: Vec<i64>,
}

pub struct NerDataset {
    dataset: InMemDataset<TaggedSentence>,
}

impl Dataset<TaggedSentence> for NerDataset {
    fn get(&self, index: usize) -> Option<TaggedSentence> {
        self.dataset.get(index)
    }

    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl NerDataset {
    /// Reads a corpus of newline-delimited JSON [TaggedSentence] rows.
    pub fn from_file(path: &Path) -> Self {
        println!("Loading corpus from {path:?}");
        let dataset =
            InMemDataset::from_json_rows(path).expect("Failed to read the corpus file");
        Self { dataset }
    }

    /// A generated stand-in corpus for running the demo without external
    /// data: each token id determines its tag, so the mapping is learnable.
    pub fn synthetic(
        num_sentences: usize,
        vocab_size: usize,
        class_num: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let items = (0..num_sentences)
            .map(|_| {
                let len = rng.random_range(SYNTH_MIN_LEN..=SYNTH_MAX_LEN);
                // token id 0 is reserved for padding
                let tokens: Vec<i64> =
                    (0..len).map(|_| rng.random_range(1..vocab_size as i64)).collect();
                let labels = tokens.iter().map(|token| token % class_num as i64).collect();
                TaggedSentence { tokens, labels }
            })
            .collect();
        Self {
            dataset: InMemDataset::new(items),
        }
    }
}

#[derive(Clone)]
pub struct NerBatcher {
    /// Sentences longer than this are truncated.
    pub max_seq_len: usize,
    pub pad_token: i64,
    pub ignore_index: i64,
}

impl Default for NerBatcher {
    fn default() -> Self {
        Self {
            max_seq_len: 128,
            pad_token: 0,
            ignore_index: -1,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NerBatch<B: Backend> {
    /// Token ids, padded with the pad token to the longest sentence.
    /// # Shape
    /// [batch_size, seq_len]
    pub tokens: Tensor<B, 2, Int>,
    /// Labels, padded with the ignore sentinel.
    /// # Shape
    /// [batch_size, seq_len]
    pub targets: Tensor<B, 2, Int>,
}

impl<B: Backend> Batcher<B, TaggedSentence, NerBatch<B>> for NerBatcher {
    fn batch(&self, items: Vec<TaggedSentence>, device: &B::Device) -> NerBatch<B> {
        let seq_len = items
            .iter()
            .map(|item| item.tokens.len())
            .max()
            .unwrap_or(1)
            .min(self.max_seq_len);

        let mut tokens = Vec::with_capacity(items.len());
        let mut targets = Vec::with_capacity(items.len());
        for item in items {
            debug_assert_eq!(item.tokens.len(), item.labels.len());
            tokens.push(to_row::<B>(&item.tokens, seq_len, self.pad_token, device));
            targets.push(to_row::<B>(&item.labels, seq_len, self.ignore_index, device));
        }

        NerBatch {
            tokens: Tensor::cat(tokens, 0),
            targets: Tensor::cat(targets, 0),
        }
    }
}

/// # Shapes
///   - Output [1, seq_len]
fn to_row<B: Backend>(
    values: &[i64],
    seq_len: usize,
    fill: i64,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let mut row: Vec<i64> = values.iter().copied().take(seq_len).collect();
    row.resize(seq_len, fill);
    Tensor::from_data(
        TensorData::new(row, [1, seq_len]).convert::<B::IntElem>(),
        device,
    )
}
