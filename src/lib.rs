pub mod decode;
pub mod encode;
pub mod error;
pub mod midi;

pub use decode::{DecodeConfig, Mode, Normalization};
pub use encode::{EncodeConfig, NoteTensor, Tempos};
pub use error::Error;
