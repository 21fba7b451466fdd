#[cfg(feature = "classifier")]
pub mod classifier;
#[cfg(feature = "tagger")]
pub mod crf;
#[cfg(feature = "tagger")]
pub mod tagger;

pub mod prelude {
    #[cfg(feature = "classifier")]
    pub use crate::classifier::*;

    #[cfg(feature = "tagger")]
    pub use crate::crf::*;
    #[cfg(feature = "tagger")]
    pub use crate::tagger::*;
}

pub mod utils;
