//! A transformer token encoder filling the role of a pretrained language
//! model: it maps token ids to contextual hidden states, and its weights can
//! be restored from a recorded checkpoint path.

use burn::nn::transformer::{
    TransformerEncoder, TransformerEncoderConfig, TransformerEncoderInput,
};
use burn::nn::{Embedding, EmbeddingConfig};
use burn::prelude::*;
use burn::record::{BinFileRecorder, FullPrecisionSettings, RecorderError};
use std::path::PathBuf;

#[derive(Module, Debug)]
pub struct TokenEncoder<B: Backend> {
    pub token_embedding: Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub transformer: TransformerEncoder<B>,
}

#[derive(Config, Debug)]
pub struct TokenEncoderConfig {
    /// The number of distinct token ids.
    pub vocab_size: usize,

    /// The size of the hidden representations.
    #[config(default = 256)]
    pub d_model: usize,

    /// The size of the position-wise feed-forward layers.
    #[config(default = 1024)]
    pub d_ff: usize,

    /// The number of attention heads.
    #[config(default = 4)]
    pub n_heads: usize,

    /// The number of transformer layers.
    #[config(default = 2)]
    pub n_layers: usize,

    /// The longest token sequence the position table covers.
    #[config(default = 512)]
    pub max_seq_len: usize,

    #[config(default = 0.1)]
    pub dropout: f64,
}

impl TokenEncoderConfig {
    /// Returns the initialized model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TokenEncoder<B> {
        TokenEncoder {
            token_embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            transformer: TransformerEncoderConfig::new(
                self.d_model,
                self.d_ff,
                self.n_heads,
                self.n_layers,
            )
            .with_dropout(self.dropout)
            .init(device),
        }
    }
}

impl<B: Backend> TokenEncoder<B> {
    /// Contextual hidden states for the given token ids.
    ///
    /// `pad_mask` marks padded positions, which are excluded from attention.
    ///
    /// # Shapes
    ///   - Input [batch, sequence]
    ///   - Output [batch, sequence, d_model]
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        pad_mask: Option<Tensor<B, 2, Bool>>,
    ) -> Tensor<B, 3> {
        let [batch, sequence] = tokens.dims();
        let [_vocab, d_model] = self.token_embedding.weight.dims();
        let device = tokens.device();

        let positions = Tensor::<B, 1, Int>::arange(0..sequence as i64, &device)
            .reshape([1, sequence])
            .expand([batch, sequence]);
        let x = self.token_embedding.forward(tokens) + self.position_embedding.forward(positions);
        debug_assert_eq!([batch, sequence, d_model], x.dims());

        let mut input = TransformerEncoderInput::new(x);
        if let Some(pad_mask) = pad_mask {
            input = input.mask_pad(pad_mask);
        }
        let x = self.transformer.forward(input);
        debug_assert_eq!([batch, sequence, d_model], x.dims());

        x
    }

    /// Replaces the encoder weights with ones recorded at `path`.
    pub fn load_pretrained(
        self,
        path: PathBuf,
        device: &B::Device,
    ) -> Result<Self, RecorderError> {
        self.load_file(path, &BinFileRecorder::<FullPrecisionSettings>::new(), device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type B = burn::backend::NdArray;

    #[test]
    fn forward_shape() {
        let device = Default::default();
        let encoder = TokenEncoderConfig::new(50)
            .with_d_model(16)
            .with_d_ff(32)
            .with_n_heads(2)
            .with_n_layers(1)
            .with_max_seq_len(8)
            .init::<B>(&device);

        let tokens = Tensor::<B, 2, Int>::from_ints([[3, 7, 0, 0], [1, 2, 4, 0]], &device);
        let pad_mask = tokens.clone().equal_elem(0);
        assert_eq!([2, 4, 16], encoder.forward(tokens, Some(pad_mask)).dims());
    }
}
