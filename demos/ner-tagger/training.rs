use crate::common::{
    cli::AppArgs,
    optim::{OptimConfigExt, OptimizerChoice, adam_config, sgd_config},
    training::TrainingConfig,
};
use crate::dataset::{NerBatch, NerBatcher, NerDataset, TaggedSentence};
use burn::prelude::*;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder, batcher::Batcher},
    data::dataset::Dataset,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
    train::metric::{LossInput, Metric, MetricMetadata, Numeric},
};
use burn_tagger::tagger::TaggerNetwork;

type Dataloader<B> = std::sync::Arc<dyn DataLoader<B, NerBatch<B>> + 'static>;

pub fn train<AutoB: AutodiffBackend>(
    training_config: TrainingConfig,
    model: TaggerNetwork<AutoB>,
    dataset_train: NerDataset,
    dataset_valid: NerDataset,
    training_device: AutoB::Device,
    app_args: &AppArgs,
) {
    match training_config.optimizer {
        OptimizerChoice::Adam => run::<AutoB, _>(
            training_config,
            model,
            dataset_train,
            dataset_valid,
            training_device,
            app_args,
            adam_config(),
        ),
        OptimizerChoice::Sgd => run::<AutoB, _>(
            training_config,
            model,
            dataset_train,
            dataset_valid,
            training_device,
            app_args,
            sgd_config(),
        ),
    }
}

fn run<AutoB, OptimConfig>(
    training_config: TrainingConfig,
    mut model: TaggerNetwork<AutoB>,
    dataset_train: NerDataset,
    dataset_valid: NerDataset,
    training_device: AutoB::Device,
    app_args: &AppArgs,
    optim_config: OptimConfig,
) where
    AutoB: AutodiffBackend,
    OptimConfig: OptimConfigExt<AutoB, TaggerNetwork<AutoB>>,
{
    AutoB::seed(&training_device, training_config.seed);

    let mut optim = optim_config.init();

    let dataloader_train: Dataloader<AutoB> = DataLoaderBuilder::new(NerBatcher::default())
        .batch_size(training_config.batch_size)
        .shuffle(training_config.seed)
        .num_workers(training_config.num_workers)
        .build(dataset_train);
    let valid_items: Vec<TaggedSentence> = dataset_valid.iter().collect();

    let training_num_items = dataloader_train.num_items();
    let mut metric_meta = MetricMetadata {
        progress: burn::data::dataloader::Progress::new(0, training_num_items),
        epoch: 1,
        epoch_total: training_config.num_epochs,
        iteration: 0,
        lr: Some(training_config.lr),
    };

    println!("Starting training...");
    for epoch in 1..training_config.num_epochs + 1 {
        metric_meta.epoch = epoch;

        let mut loss_metric = burn::train::metric::LossMetric::<AutoB>::new();

        // training loop
        for (mut b, batch) in dataloader_train.iter().enumerate() {
            b += 1;
            let [batch_size, _seq_len] = batch.tokens.dims();

            metric_meta.iteration += 1;
            metric_meta.progress.items_processed += batch_size;

            let emissions = model.forward(batch.tokens);
            let loss = model.loss(emissions, batch.targets);
            loss_metric.update(&LossInput::new(loss.clone()), &metric_meta);

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(training_config.lr, model, grads);

            if b % 25 == 0 {
                println!(
                    "Epoch {}/{}, Batch {b:0>3}/{}, Loss {:.4}",
                    metric_meta.epoch,
                    metric_meta.epoch_total,
                    training_num_items / training_config.batch_size + 1,
                    loss_metric.value().current(),
                );
            }
        }

        // Display the averaged training metrics
        println!(
            "Epoch {}/{}, Avg Loss {:.4}",
            metric_meta.epoch,
            metric_meta.epoch_total,
            loss_metric.running_value().current(),
        );

        // save assets
        app_args.save_model(&model);

        evaluate::<AutoB::InnerBackend>(model.valid(), &valid_items, &training_device);
    }
    println!("Training finished.");
}

/// Token-level accuracy over the non-sentinel positions of the held-out set.
pub fn evaluate<B: Backend>(
    model: TaggerNetwork<B>,
    items: &[TaggedSentence],
    device: &B::Device,
) -> f64 {
    let batcher = NerBatcher::default();
    let mut correct = 0usize;
    let mut total = 0usize;

    for chunk in items.chunks(32) {
        let batch: NerBatch<B> = batcher.batch(chunk.to_vec(), device);
        let mask = model.pad_mask(&batch.tokens).bool_not();
        let emissions = model.forward(batch.tokens);

        for (sentence, path) in chunk.iter().zip(model.decode(emissions, mask)) {
            for (position, &tag) in path.iter().enumerate() {
                let Some(&gold) = sentence.labels.get(position) else {
                    break;
                };
                if gold < 0 {
                    continue;
                }
                total += 1;
                if gold as usize == tag {
                    correct += 1;
                }
            }
        }
    }

    let accuracy = correct as f64 / total.max(1) as f64;
    println!("valid tokens correct: {correct}/{total}, accuracy: {accuracy:.3}");
    accuracy
}
