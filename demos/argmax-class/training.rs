use crate::common::{
    cli::AppArgs,
    optim::{OptimConfigExt, OptimizerChoice, adam_config, sgd_config},
    training::TrainingConfig,
};
use crate::dataset::{ArgmaxBatch, ArgmaxBatcher, ArgmaxDataset, INPUT_SIZE};
use burn::prelude::*;
use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder, batcher::Batcher},
    data::dataset::Dataset,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
    train::ClassificationOutput,
    train::metric::{Adaptor, Metric, MetricMetadata, Numeric},
};
use burn_tagger::classifier::{DenseClassifier, DenseClassifierConfig};

type Dataloader<B> = std::sync::Arc<dyn DataLoader<B, ArgmaxBatch<B>> + 'static>;

/// Samples generated per epoch.
pub const TRAIN_SAMPLES: usize = 5000;
/// Fresh held-out samples evaluated after each epoch.
pub const VALID_SAMPLES: usize = 100;

pub fn train<AutoB: AutodiffBackend>(
    training_config: TrainingConfig,
    model_config: DenseClassifierConfig,
    training_device: AutoB::Device,
    app_args: &AppArgs,
) {
    match training_config.optimizer {
        OptimizerChoice::Adam => run::<AutoB, _>(
            training_config,
            model_config,
            training_device,
            app_args,
            adam_config(),
        ),
        OptimizerChoice::Sgd => run::<AutoB, _>(
            training_config,
            model_config,
            training_device,
            app_args,
            sgd_config(),
        ),
    }
}

fn run<AutoB, OptimConfig>(
    training_config: TrainingConfig,
    model_config: DenseClassifierConfig,
    training_device: AutoB::Device,
    app_args: &AppArgs,
    optim_config: OptimConfig,
) where
    AutoB: AutodiffBackend,
    OptimConfig: OptimConfigExt<AutoB, DenseClassifier<AutoB>>,
{
    AutoB::seed(&training_device, training_config.seed);

    // load (or init and save) the model
    let model: DenseClassifier<AutoB> =
        app_args.load_or_save_model(&model_config, &training_device);
    let mut optim = optim_config.init();
    let mut model = Wrap(model);

    let batcher = ArgmaxBatcher::default();
    let dataloader_train: Dataloader<AutoB> = DataLoaderBuilder::new(batcher)
        .batch_size(training_config.batch_size)
        .shuffle(training_config.seed)
        .num_workers(training_config.num_workers)
        .build(ArgmaxDataset::new(TRAIN_SAMPLES, training_config.seed));

    let training_num_items = dataloader_train.num_items();
    let mut metric_meta = MetricMetadata {
        progress: burn::data::dataloader::Progress::new(0, training_num_items),
        epoch: 1,
        epoch_total: training_config.num_epochs,
        iteration: 0,
        lr: Some(training_config.lr),
    };

    // per-epoch [accuracy, avg loss] pairs, reported at the end
    let mut history = Vec::with_capacity(training_config.num_epochs);

    println!("Starting training...");
    for epoch in 1..training_config.num_epochs + 1 {
        metric_meta.epoch = epoch;

        let mut loss_metric = burn::train::metric::LossMetric::<AutoB>::new();
        let mut acc_metric = burn::train::metric::AccuracyMetric::<AutoB>::new();

        // training loop
        for (mut b, batch) in dataloader_train.iter().enumerate() {
            b += 1;
            let [batch_size, INPUT_SIZE] = batch.vectors.dims() else {
                panic!()
            };

            metric_meta.iteration += 1;
            metric_meta.progress.items_processed += batch_size;

            let pre_metrics = model.forward_classification(batch.vectors, batch.targets);
            acc_metric.update(&pre_metrics.adapt(), &metric_meta);
            loss_metric.update(&pre_metrics.adapt(), &metric_meta);

            let loss = pre_metrics.loss.clone();
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model.0);
            model.0 = optim.step(training_config.lr, model.0, grads);

            if b % 100 == 0 {
                println!(
                    "Epoch {}/{}, Batch {b:0>3}/{}, Loss {:.4}, Acc {:0>6.2}",
                    metric_meta.epoch,
                    metric_meta.epoch_total,
                    training_num_items / training_config.batch_size + 1,
                    loss_metric.value().current(),
                    acc_metric.value().current(),
                );
            }
        }

        // Display the averaged training metrics
        println!(
            "Epoch {}/{}, Avg Loss {:.4}, Avg Acc: {}",
            metric_meta.epoch,
            metric_meta.epoch_total,
            loss_metric.running_value().current(),
            acc_metric.running_value().current(),
        );

        // save assets
        app_args.save_model(&model.0);

        let accuracy = evaluate::<AutoB::InnerBackend>(
            model.0.valid(),
            VALID_SAMPLES,
            training_config.seed.wrapping_add(epoch as u64),
            &training_device,
        );
        history.push((accuracy, loss_metric.running_value().current()));
    }

    println!("Training finished.");
    println!("[accuracy, avg loss] per epoch:");
    for (epoch, (accuracy, loss)) in history.iter().enumerate() {
        println!("- {:0>2}: [{accuracy:.3}, {loss:.4}]", epoch + 1);
    }
}

/// Accuracy over a freshly generated held-out set.
pub fn evaluate<B: Backend>(
    model: DenseClassifier<B>,
    num_samples: usize,
    seed: u64,
    device: &B::Device,
) -> f64 {
    let items: Vec<_> = ArgmaxDataset::new(num_samples, seed).iter().collect();
    let batch: ArgmaxBatch<B> = ArgmaxBatcher::default().batch(items, device);

    let predicted = model.forward(batch.vectors).argmax(1).reshape([num_samples]);
    let correct: i64 = predicted
        .equal(batch.targets)
        .int()
        .sum()
        .into_scalar()
        .elem();

    let accuracy = correct as f64 / num_samples as f64;
    println!("correct predictions: {correct}/{num_samples}, accuracy: {accuracy:.3}");
    accuracy
}

/// Wrapper over [`DenseClassifier`] for custom implementations.
pub struct Wrap<B: Backend>(pub DenseClassifier<B>);

impl<B: Backend> Wrap<B> {
    pub fn forward_classification(
        &self,
        vectors: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationOutput<B> {
        let [batch_size, _input_size] = vectors.dims();
        debug_assert_eq!([batch_size], targets.dims());

        let output = self.0.forward(vectors);
        let loss = burn::nn::loss::CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), targets.clone());

        ClassificationOutput::new(loss, output, targets)
    }
}
