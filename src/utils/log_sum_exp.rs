use burn::prelude::*;

/// Computes `log(Σ exp(x))` along `dim`, keeping the reduced dimension.
///
/// The maximum is subtracted before exponentiation so that large score
/// magnitudes do not overflow the exponential.
pub fn log_sum_exp<const D: usize, B: Backend>(x: Tensor<B, D>, dim: usize) -> Tensor<B, D> {
    let max = x.clone().max_dim(dim).detach();
    (x - max.clone()).exp().sum_dim(dim).log() + max
}

#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn matches_direct_computation() {
        let device = Default::default();
        let x = Tensor::<B, 2>::from_floats([[0.0, 1.0, 2.0], [-1.0, -1.0, -1.0]], &device);

        let got: Vec<f32> = log_sum_exp(x, 1).into_data().iter::<f32>().collect();
        let expected = [
            (0f32.exp() + 1f32.exp() + 2f32.exp()).ln(),
            (3.0 * (-1f32).exp()).ln(),
        ];
        for (g, e) in got.iter().zip(expected) {
            assert!((g - e).abs() < 1e-5, "{g} vs {e}");
        }
    }

    #[test]
    fn is_stable_for_large_magnitudes() {
        let device = Default::default();
        let x = Tensor::<B, 2>::from_floats([[1000.0, 1000.0]], &device);

        let got = log_sum_exp(x, 1).into_scalar();
        assert!((got - (1000.0 + 2f32.ln())).abs() < 1e-3);
    }
}
