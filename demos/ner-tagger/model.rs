use crate::common::model::ModelConfigExt;
use burn::prelude::*;
use burn_tagger::tagger::{TaggerNetwork, TaggerNetworkConfig, TokenEncoderConfig};

/// The number of distinct tags: O plus B-/I- over four entity categories.
pub const CLASS_NUM: usize = 9;
/// The number of distinct token ids the synthetic corpus draws from.
pub const VOCAB_SIZE: usize = 1000;

/// A deliberately small encoder, so the demo trains on CPU in minutes.
///
/// Replace `pretrained` with a recorded encoder checkpoint path to start from
/// trained weights instead of a random initialization.
pub fn model_config() -> TaggerNetworkConfig {
    TaggerNetworkConfig::new(
        TokenEncoderConfig::new(VOCAB_SIZE)
            .with_d_model(128)
            .with_d_ff(512)
            .with_n_heads(4)
            .with_n_layers(2)
            .with_max_seq_len(128),
        CLASS_NUM,
    )
    .with_use_crf(true)
}

impl<B: Backend> ModelConfigExt<B> for TaggerNetworkConfig {
    type Model = TaggerNetwork<B>;

    fn init(&self, device: &B::Device) -> Self::Model {
        TaggerNetworkConfig::init(self, device)
    }
}
