use crate::common::cli::AppArgs;
use crate::dataset::{NerBatch, NerBatcher, NerDataset, TaggedSentence};
use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use burn_tagger::tagger::{TaggerNetwork, TaggerNetworkConfig};

pub fn infer<B: Backend>(
    model_config: TaggerNetworkConfig,
    dataset: NerDataset,
    device: B::Device,
    app_args: &AppArgs,
) {
    let model: TaggerNetwork<B> = app_args
        .load_model(&model_config, &device)
        .expect("Trained model should exist; run train first");

    let show = dataset.len().min(5);
    let items: Vec<TaggedSentence> = dataset.iter().take(show).collect();
    let batch: NerBatch<B> = NerBatcher::default().batch(items.clone(), &device);

    let mask = model.pad_mask(&batch.tokens).bool_not();
    let emissions = model.forward(batch.tokens);
    let decoded = model.decode(emissions, mask);

    // Display the predicted vs expected tags
    println!("predicted/expected tags:");
    for (sentence, path) in items.iter().zip(decoded) {
        println!("- tokens    {:?}", sentence.tokens);
        println!("  predicted {path:?}");
        println!("  expected  {:?}", sentence.labels);
    }
}
