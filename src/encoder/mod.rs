mod core;
mod error;
mod head;
mod layers;

pub use core::{EncodedStructure, EncoderConfig, GeometricEncoder};
pub use error::Error;
pub use head::{
    BackmappingHead, EnergyKernelHead, HeadOutput, InitPolicy, ModelType, ParseModelTypeError,
    VariantHead,
};
pub use layers::{LayerNorm, Linear};
