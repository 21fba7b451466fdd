use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

/// A single biased linear projection from feature vectors to class logits,
/// enough capacity for simple vector rules such as "which component is the
/// largest".
#[derive(Module, Debug)]
pub struct DenseClassifier<B: Backend> {
    pub linear: Linear<B>,
}

/// Configuration to create a [DenseClassifier] using the [init function](DenseClassifierConfig::init).
#[derive(Config, Debug)]
pub struct DenseClassifierConfig {
    /// The size of the input feature vectors.
    pub input_size: usize,
    /// The number of output classes.
    pub class_num: usize,
}

impl DenseClassifierConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> DenseClassifier<B> {
        DenseClassifier {
            linear: LinearConfig::new(self.input_size, self.class_num)
                .with_bias(true)
                .init(device),
        }
    }
}

impl<B: Backend> DenseClassifier<B> {
    /// # Shapes
    ///   - Input [batch, input_size]
    ///   - Output [batch, class_num]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _input_size] = x.dims();
        let [_input_size, class_num] = self.linear.weight.dims();

        let x = self.linear.forward(x);
        debug_assert_eq!([batch, class_num], x.dims());

        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn forward_shape() {
        let device = Default::default();
        let model = DenseClassifierConfig::new(5, 5).init::<B>(&device);

        let x = Tensor::<B, 2>::zeros([4, 5], &device);
        assert_eq!([4, 5], model.forward(x).dims());
    }
}
