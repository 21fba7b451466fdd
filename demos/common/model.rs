use burn::prelude::*;

/// Seam between the CLI's artifact handling and the concrete model of each
/// demo binary.
pub trait ModelConfigExt<B: Backend>: Config {
    type Model: Module<B>;
    fn init(&self, device: &B::Device) -> Self::Model;
}
