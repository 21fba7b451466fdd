use crate::common::model::ModelConfigExt;
use crate::dataset::INPUT_SIZE;
use burn::prelude::*;
use burn_tagger::classifier::{DenseClassifier, DenseClassifierConfig};

/// Five input components, five classes: the label space is the component
/// index itself, so a single linear layer is all the capacity the rule needs.
pub fn model_config() -> DenseClassifierConfig {
    DenseClassifierConfig::new(INPUT_SIZE, INPUT_SIZE)
}

impl<B: Backend> ModelConfigExt<B> for DenseClassifierConfig {
    type Model = DenseClassifier<B>;

    fn init(&self, device: &B::Device) -> Self::Model {
        DenseClassifierConfig::init(self, device)
    }
}
