//! 16-bit to 8-bit quantization module

mod quantizer;

pub use quantizer::Quantizer;
