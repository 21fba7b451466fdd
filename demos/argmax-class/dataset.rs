use crate::common::backend::Element;
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use num_traits::AsPrimitive;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// The number of components in each sample vector.
pub const INPUT_SIZE: usize = 5;

/// Index of the largest component.
pub fn max_index(features: &[Element]) -> usize {
    features
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).expect("features must not be NaN"))
        .map(|(index, _)| index)
        .expect("features must not be empty")
}

/// A synthetic sample: a vector drawn uniformly from `[0, 1)`, labeled with
/// the index of its largest component.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ArgmaxItem {
    /// # Shape
    /// [INPUT_SIZE]
    pub features: Vec<Element>,

    /// Label of the vector, in between 0 and INPUT_SIZE - 1.
    pub label: u8,
}

/// Freshly generated in-memory samples. The rule to learn is the generation
/// rule itself, so the data is never persisted as an artifact.
pub struct ArgmaxDataset {
    items: Vec<ArgmaxItem>,
}

impl ArgmaxDataset {
    pub fn new(num_samples: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let items = (0..num_samples)
            .map(|_| {
                let features: Vec<Element> = (0..INPUT_SIZE).map(|_| rng.random()).collect();
                let label = max_index(&features) as u8;
                ArgmaxItem { features, label }
            })
            .collect();
        Self { items }
    }
}

impl Dataset<ArgmaxItem> for ArgmaxDataset {
    fn get(&self, index: usize) -> Option<ArgmaxItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[derive(Clone, Default)]
pub struct ArgmaxBatcher {}

#[derive(Clone, Debug)]
pub struct ArgmaxBatch<B: Backend> {
    /// # Shape
    /// [batch_size, INPUT_SIZE]
    pub vectors: Tensor<B, 2>,
    /// # Shape
    /// [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> Batcher<B, ArgmaxItem, ArgmaxBatch<B>> for ArgmaxBatcher {
    fn batch(&self, items: Vec<ArgmaxItem>, device: &B::Device) -> ArgmaxBatch<B> {
        let (items_features, items_label): (Vec<_>, Vec<_>) = items
            .into_iter()
            .map(|item| (item.features, item.label))
            .unzip();
        let vectors = items_features
            .into_iter()
            .map(|features: Vec<Element>| {
                TensorData::new(features, [1, INPUT_SIZE]).convert::<B::FloatElem>()
            })
            .map(|data| Tensor::<B, 2>::from_data(data, device))
            .collect();

        let targets = items_label
            .into_iter()
            .map(|label: u8| {
                let index: i64 = label.as_();
                Tensor::<B, 1, Int>::from_data([index.elem::<B::IntElem>()], device)
            })
            .collect();

        ArgmaxBatch {
            vectors: Tensor::cat(vectors, 0),
            targets: Tensor::cat(targets, 0),
        }
    }
}
