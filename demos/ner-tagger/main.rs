use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
pub use common::{
    backend::{MainAutoBackend, MainBackend, MainDevice},
    cli::AppArgs,
    training::TrainingConfig,
};
use model::{CLASS_NUM, VOCAB_SIZE};

pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;

#[path = "../common/mod.rs"]
pub mod common;

use burn_tagger::tagger::{TaggerNetwork, TaggerNetworkConfig};
use dataset::{NerDataset, TRAIN_SENTENCES, VALID_SENTENCES};

pub fn launch<B, AutoB>(app_args: &AppArgs)
where
    B: Backend + MainDevice,
    AutoB: AutodiffBackend + MainDevice,
{
    app_args.create_artifact_dir();

    // setup training and model configs
    let training_config = app_args.load_training_config().unwrap_or_else(|| {
        TrainingConfig::new()
            .with_num_epochs(10)
            .with_batch_size(16)
            .with_lr(1e-4)
    });
    let model_config = app_args
        .load_model_config::<AutoB, _>()
        .unwrap_or_else(model::model_config);
    // save configs
    app_args.save_training_config(&training_config);
    app_args.save_model_config(&model_config);

    if app_args.training {
        let training_device = AutoB::main_device();
        let model = load_or_init::<AutoB>(&model_config, &training_device, app_args);
        training::train::<AutoB>(
            training_config.clone(),
            model,
            train_dataset(app_args, training_config.seed),
            valid_dataset(app_args, training_config.seed),
            training_device,
            app_args,
        );
    }

    if app_args.inference {
        let infer_device = B::main_device();
        inference::infer::<B>(
            model_config,
            valid_dataset(app_args, training_config.seed),
            infer_device,
            app_args,
        );
    }

    if !app_args.inference && !app_args.training {
        println!("neither training nor inference were enabled");
        println!("{}", common::cli::HELP);
    }
}

/// The corpus given with `--data`, or a generated stand-in.
fn train_dataset(app_args: &AppArgs, seed: u64) -> NerDataset {
    match &app_args.data_path {
        Some(dir) => NerDataset::from_file(&dir.join("train.jsonl")),
        None => NerDataset::synthetic(TRAIN_SENTENCES, VOCAB_SIZE, CLASS_NUM, seed),
    }
}

fn valid_dataset(app_args: &AppArgs, seed: u64) -> NerDataset {
    match &app_args.data_path {
        Some(dir) => NerDataset::from_file(&dir.join("valid.jsonl")),
        None => NerDataset::synthetic(VALID_SENTENCES, VOCAB_SIZE, CLASS_NUM, seed + 1),
    }
}

fn load_or_init<B: Backend>(
    model_config: &TaggerNetworkConfig,
    device: &B::Device,
    app_args: &AppArgs,
) -> TaggerNetwork<B> {
    app_args.load_model(model_config, device).unwrap_or_else(|| {
        println!("Initializing new model");
        let mut model = TaggerNetworkConfig::init(model_config, device);
        if let Some(path) = &model_config.pretrained {
            println!("Loading pretrained encoder from {path:?}");
            model.encoder = model
                .encoder
                .clone()
                .load_pretrained(path.into(), device)
                .expect("Failed to load the pretrained encoder");
        }
        app_args.save_model(&model);
        model
    })
}

fn main() {
    let app_args = AppArgs::parse().unwrap();
    launch::<MainBackend, MainAutoBackend>(&app_args);
}
