//! Combines the token encoder with a per-token classification head and an
//! optional CRF decoding layer, the model of the named-entity exercise.

use crate::crf::{Crf, CrfConfig};
use crate::tagger::{TokenEncoder, TokenEncoderConfig};
use crate::utils::loss::{MaskedCrossEntropyLoss, MaskedCrossEntropyLossConfig};
use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;

#[derive(Module, Debug)]
pub struct TaggerNetwork<B: Backend> {
    pub encoder: TokenEncoder<B>,
    pub classify: Linear<B>,
    /// If missing, tags are scored and decoded position-by-position.
    pub crf: Option<Crf<B>>,
    pub loss: MaskedCrossEntropyLoss,
    pub pad_token: usize,
}

#[derive(Config, Debug)]
pub struct TaggerNetworkConfig {
    /// Configuration of the token encoder.
    pub encoder: TokenEncoderConfig,

    /// The number of tag classes.
    pub class_num: usize,

    /// If set to true, tag sequences are scored and decoded by a [Crf] layer.
    #[config(default = false)]
    pub use_crf: bool,

    /// Label value marking positions excluded from the loss.
    #[config(default = -1)]
    pub ignore_index: i64,

    /// Token id used for padding; padded positions are masked out of attention.
    #[config(default = 0)]
    pub pad_token: usize,

    /// Path of a recorded encoder checkpoint to apply to freshly initialized
    /// weights, see [TokenEncoder::load_pretrained].
    #[config(default = "None")]
    pub pretrained: Option<String>,
}

impl TaggerNetworkConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TaggerNetwork<B> {
        TaggerNetwork {
            encoder: self.encoder.init(device),
            classify: LinearConfig::new(self.encoder.d_model, self.class_num).init(device),
            crf: self
                .use_crf
                .then(|| CrfConfig::new(self.class_num).init(device)),
            loss: MaskedCrossEntropyLossConfig::new()
                .with_ignore_index(self.ignore_index)
                .init(),
            pad_token: self.pad_token,
        }
    }
}

impl<B: Backend> TaggerNetwork<B> {
    /// Per-token tag scores ("emissions").
    ///
    /// # Shapes
    ///   - Input [batch, sequence]
    ///   - Output [batch, sequence, class_num]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch, sequence] = tokens.dims();
        let [_d_model, class_num] = self.classify.weight.dims();

        let pad_mask = self.pad_mask(&tokens);
        let x = self.encoder.forward(tokens, Some(pad_mask));
        let x = self.classify.forward(x);
        debug_assert_eq!([batch, sequence, class_num], x.dims());

        x
    }

    /// Mask of padded token positions.
    ///
    /// # Shapes
    ///   - Input [batch, sequence]
    ///   - Output [batch, sequence]
    pub fn pad_mask(&self, tokens: &Tensor<B, 2, Int>) -> Tensor<B, 2, Bool> {
        tokens.clone().equal_elem(self.pad_token as i64)
    }

    /// Training criterion over a batch of label sequences.
    ///
    /// Positions labeled with the ignore sentinel contribute nothing. With a
    /// CRF layer this is the mean negative log-likelihood of the gold paths;
    /// without, cross-entropy over every valid position.
    ///
    /// # Shapes
    ///   - emissions [batch, sequence, class_num]
    ///   - targets [batch, sequence]
    ///   - Output [1]
    pub fn loss(&self, emissions: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Tensor<B, 1> {
        let [batch, sequence, class_num] = emissions.dims();
        debug_assert_eq!([batch, sequence], targets.dims());

        match &self.crf {
            Some(crf) => {
                let mask = targets.clone().greater_elem(self.loss.ignore_index);
                // sentinel tags would gather out of bounds even when masked
                crf.forward(emissions, targets.clamp_min(0), mask)
            }
            None => self.loss.forward(
                emissions.reshape([batch * sequence, class_num]),
                targets.reshape([batch * sequence]),
            ),
        }
    }

    /// Most likely tag path per sequence, trimmed to its unmasked length.
    ///
    /// # Shapes
    ///   - emissions [batch, sequence, class_num]
    ///   - mask [batch, sequence]
    pub fn decode(&self, emissions: Tensor<B, 3>, mask: Tensor<B, 2, Bool>) -> Vec<Vec<usize>> {
        match &self.crf {
            Some(crf) => crf.decode(emissions, mask),
            None => {
                let [batch, sequence, _class_num] = emissions.dims();
                let best: Vec<i64> = emissions
                    .argmax(2)
                    .reshape([batch * sequence])
                    .into_data()
                    .iter::<i64>()
                    .collect();
                let lengths: Vec<i64> = mask
                    .int()
                    .sum_dim(1)
                    .reshape([batch])
                    .into_data()
                    .iter::<i64>()
                    .collect();

                (0..batch)
                    .map(|b| {
                        (0..lengths[b] as usize)
                            .map(|i| best[b * sequence + i] as usize)
                            .collect()
                    })
                    .collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    fn model_config(use_crf: bool) -> TaggerNetworkConfig {
        TaggerNetworkConfig::new(
            TokenEncoderConfig::new(30)
                .with_d_model(16)
                .with_d_ff(32)
                .with_n_heads(2)
                .with_n_layers(1)
                .with_max_seq_len(8),
            5,
        )
        .with_use_crf(use_crf)
    }

    fn tokens() -> Tensor<B, 2, Int> {
        Tensor::from_ints([[5, 9, 2, 0], [7, 3, 0, 0]], &Default::default())
    }

    #[test]
    fn emissions_shape() {
        let model = model_config(false).init::<B>(&Default::default());
        assert_eq!([2, 4, 5], model.forward(tokens()).dims());
    }

    #[test]
    fn loss_is_finite_on_both_paths() {
        let device = Default::default();
        let targets = Tensor::<B, 2, Int>::from_ints([[1, 0, 3, -1], [2, 2, -1, -1]], &device);

        for use_crf in [false, true] {
            let model = model_config(use_crf).init::<B>(&device);
            let loss = model
                .loss(model.forward(tokens()), targets.clone())
                .into_scalar();
            assert!(loss.is_finite(), "use_crf={use_crf}");
        }
    }

    #[test]
    fn decode_respects_sequence_lengths() {
        let device = Default::default();

        for use_crf in [false, true] {
            let model = model_config(use_crf).init::<B>(&device);
            let tokens = tokens();
            let mask = model.pad_mask(&tokens).bool_not();
            let paths = model.decode(model.forward(tokens), mask);

            assert_eq!(paths[0].len(), 3, "use_crf={use_crf}");
            assert_eq!(paths[1].len(), 2, "use_crf={use_crf}");
            assert!(paths.iter().flatten().all(|&tag| tag < 5));
        }
    }
}
