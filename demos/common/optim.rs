use burn::prelude::*;
use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{self, Optimizer, SimpleOptimizer, adaptor::OptimizerAdaptor},
    tensor::backend::AutodiffBackend,
};

pub trait OptimConfigExt<AutoB, AutoM>
where
    Self: Config,
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Optim: SimpleOptimizer<AutoB::InnerBackend>;
    type Adaptor: Optimizer<AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor;
}

impl<AutoB, AutoM> OptimConfigExt<AutoB, AutoM> for optim::AdamConfig
where
    Self: Config,
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Optim = optim::Adam;
    type Adaptor = OptimizerAdaptor<Self::Optim, AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor {
        optim::AdamConfig::init::<AutoB, AutoM>(self)
    }
}

impl<AutoB, AutoM> OptimConfigExt<AutoB, AutoM> for optim::SgdConfig
where
    Self: Config,
    AutoB: AutodiffBackend,
    AutoM: AutodiffModule<AutoB>,
{
    type Optim = optim::Sgd<AutoB::InnerBackend>;
    type Adaptor = OptimizerAdaptor<Self::Optim, AutoM, AutoB>;
    fn init(&self) -> Self::Adaptor {
        optim::SgdConfig::init::<AutoB, AutoM>(self)
    }
}

/// Which optimizer updates the weights during training.
#[derive(Config, Debug)]
pub enum OptimizerChoice {
    Adam,
    Sgd,
}

pub fn adam_config() -> optim::AdamConfig {
    optim::AdamConfig::new()
        .with_grad_clipping(Some(GradientClippingConfig::Norm(1.0)))
}

pub fn sgd_config() -> optim::SgdConfig {
    optim::SgdConfig::new().with_gradient_clipping(Some(GradientClippingConfig::Norm(1.0)))
}
