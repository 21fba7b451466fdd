use crate::common::{backend::Element, cli::AppArgs};
use crate::dataset::{ArgmaxBatch, ArgmaxBatcher, ArgmaxItem, INPUT_SIZE, max_index};
use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use burn::tensor::activation::softmax;
use burn_tagger::classifier::DenseClassifierConfig;

/// Probe vectors checked after training; the expected class is the index of
/// the largest component.
pub const PROBES: [[Element; INPUT_SIZE]; 4] = [
    [0.97, 0.15, 0.31, 0.03, 0.88],
    [0.74, 0.55, 0.95, 0.94, 0.84],
    [0.00, 0.67, 0.13, 0.34, 0.19],
    [0.09, 0.59, 0.92, 0.41, 0.13],
];

pub fn infer<B: Backend>(
    model_config: DenseClassifierConfig,
    device: B::Device,
    app_args: &AppArgs,
) {
    let model = app_args
        .load_model::<B, _>(&model_config, &device)
        .expect("Trained model should exist; run train first");

    let items = PROBES
        .iter()
        .map(|features| ArgmaxItem {
            features: features.to_vec(),
            label: max_index(features) as u8,
        })
        .collect();
    let batch: ArgmaxBatch<B> = ArgmaxBatcher::default().batch(items, &device);

    let output = model.forward(batch.vectors);
    let confidence = softmax(output.clone(), 1);
    let predicted: Vec<i64> = output
        .argmax(1)
        .reshape([PROBES.len()])
        .into_data()
        .iter::<i64>()
        .collect();
    let confidence: Vec<Element> = confidence.into_data().iter::<Element>().collect();

    println!("input / predicted class / confidence / expected class:");
    for (i, features) in PROBES.iter().enumerate() {
        let class = predicted[i] as usize;
        println!(
            "- {features:.2?} / {class} / {:.3} / {}",
            confidence[i * INPUT_SIZE + class],
            max_index(features),
        );
    }
}
