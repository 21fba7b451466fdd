#![cfg(feature = "classifier")]

use burn::backend::{Autodiff, NdArray};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::Distribution;
use burn_tagger::classifier::{DenseClassifier, DenseClassifierConfig};

type AutoB = Autodiff<NdArray>;

/// Vectors drawn uniformly from `[0, 1)`, labeled with the index of their
/// largest component.
fn batch(
    batch_size: usize,
    device: &<AutoB as Backend>::Device,
) -> (Tensor<AutoB, 2>, Tensor<AutoB, 1, Int>) {
    let vectors = Tensor::<AutoB, 2>::random([batch_size, 5], Distribution::Default, device);
    let targets = vectors.clone().argmax(1).reshape([batch_size]);
    (vectors, targets)
}

#[test]
fn training_beats_the_random_baseline() {
    let device = Default::default();
    AutoB::seed(7);

    let mut model = DenseClassifierConfig::new(5, 5).init::<AutoB>(&device);
    let mut optim = AdamConfig::new().init::<AutoB, DenseClassifier<AutoB>>();
    let criterion = CrossEntropyLossConfig::new().init(&device);

    for _iteration in 0..300 {
        let (vectors, targets) = batch(32, &device);
        let loss = criterion.forward(model.forward(vectors), targets);
        let grads = GradientsParams::from_grads(loss.backward(), &model);
        model = optim.step(5e-2, model, grads);
    }

    // held-out accuracy; guessing one of five classes would score ~0.2
    let (vectors, targets) = batch(500, &device);
    let predicted = model.forward(vectors).argmax(1).reshape([500]);
    let correct: i64 = predicted.equal(targets).int().sum().into_scalar().elem();
    let accuracy = correct as f64 / 500.0;

    assert!(accuracy > 0.5, "accuracy {accuracy} not above baseline");
}
