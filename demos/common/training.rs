use crate::common::optim::OptimizerChoice;
use burn::prelude::*;

#[derive(Config, Debug)]
pub struct TrainingConfig {
    /// Which optimizer updates the weights.
    #[config(default = "OptimizerChoice::Adam")]
    pub optimizer: OptimizerChoice,
    #[config(default = 10)]
    pub num_epochs: usize,
    #[config(default = 32)]
    pub batch_size: usize,
    #[config(default = 2)]
    pub num_workers: usize,
    #[config(default = 1e-3)]
    pub lr: f64,
    #[config(default = 0)]
    pub seed: u64,
}
