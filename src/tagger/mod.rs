mod encoder;
mod network;

pub use encoder::{TokenEncoder, TokenEncoderConfig};
pub use network::{TaggerNetwork, TaggerNetworkConfig};
