use burn::module::Module;
use burn::prelude::*;
use burn::tensor::activation::log_softmax;

/// Configuration to create a [masked cross-entropy loss](MaskedCrossEntropyLoss) using the [init function](MaskedCrossEntropyLossConfig::init).
#[derive(Config, Debug)]
pub struct MaskedCrossEntropyLossConfig {
    /// Target value marking positions excluded from the loss.
    #[config(default = -1)]
    pub ignore_index: i64,
}

impl MaskedCrossEntropyLossConfig {
    /// Initialize [masked cross-entropy loss](MaskedCrossEntropyLoss).
    pub fn init(&self) -> MaskedCrossEntropyLoss {
        MaskedCrossEntropyLoss {
            ignore_index: self.ignore_index,
        }
    }
}

/// Calculate the cross entropy loss from the input logits and the targets,
/// skipping every position whose target equals the ignore sentinel.
///
/// Should be created using [MaskedCrossEntropyLossConfig].
#[derive(Module, Clone, Debug)]
pub struct MaskedCrossEntropyLoss {
    /// Target value marking positions excluded from the loss.
    pub ignore_index: i64,
}

impl MaskedCrossEntropyLoss {
    /// Compute the criterion on the input tensor.
    ///
    /// Returns the mean over the valid positions, or zero when every
    /// position carries the ignore sentinel.
    ///
    /// # Shapes
    /// - logits: `[num_positions, num_classes]`
    /// - targets: `[num_positions]`
    pub fn forward<B: Backend>(
        &self,
        logits: Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let [num_positions, _num_classes] = logits.dims();
        debug_assert_eq!([num_positions], targets.dims());

        let valid = targets.clone().not_equal_elem(self.ignore_index).float();
        // sentinel targets would gather out of bounds, so they are clamped
        // away and their terms zeroed by the mask
        let picked: Tensor<B, 1> = log_softmax(logits, 1)
            .gather(1, targets.clamp_min(0).unsqueeze_dim(1))
            .squeeze(1);

        (picked * valid.clone()).sum().neg() / valid.sum().clamp_min(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn matches_manual_computation() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_floats([[2.0, 0.0]], &device);
        let targets = Tensor::<B, 1, Int>::from_ints([0], &device);

        let loss = MaskedCrossEntropyLossConfig::new()
            .init()
            .forward(logits, targets)
            .into_scalar();
        let expected = -(2f32.exp() / (2f32.exp() + 1.0)).ln();
        assert!((loss - expected).abs() < 1e-5, "{loss} vs {expected}");
    }

    #[test]
    fn sentinel_positions_contribute_nothing() {
        let device = Default::default();
        let loss = MaskedCrossEntropyLossConfig::new().init();

        let logits = Tensor::<B, 2>::from_floats([[2.0, 0.0], [0.0, 3.0], [5.0, 1.0]], &device);
        let targets = Tensor::<B, 1, Int>::from_ints([0, 1, -1], &device);
        let masked = loss.forward(logits.clone(), targets).into_scalar();

        let unmasked = loss
            .forward(
                logits.narrow(0, 0, 2),
                Tensor::<B, 1, Int>::from_ints([0, 1], &device),
            )
            .into_scalar();
        assert!((masked - unmasked).abs() < 1e-6);
    }

    #[test]
    fn all_sentinel_is_zero() {
        let device = Default::default();
        let logits = Tensor::<B, 2>::from_floats([[2.0, 0.0], [0.0, 3.0]], &device);
        let targets = Tensor::<B, 1, Int>::from_ints([-1, -1], &device);

        let loss = MaskedCrossEntropyLossConfig::new()
            .init()
            .forward(logits, targets)
            .into_scalar();
        assert_eq!(loss, 0.0);
    }
}
