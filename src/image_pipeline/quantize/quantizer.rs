use crate::image_pipeline::band::{ClipBounds, IntensityRange};
use crate::image_pipeline::common::error::{CompositeError, Result};

/// Linear 16-bit to 8-bit transform with clip filtering.
///
/// A sample strictly outside the clip bounds becomes 0. Any other sample `s`
/// maps to `(s / δ) × 255`, truncated toward zero, where δ is the dynamic
/// range of the channel's native samples. The cast to `u8` saturates, so
/// samples above δ map to 255.
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    bounds: ClipBounds,
    delta: f64,
}

impl Quantizer {
    /// Fails with `DegenerateRange` when the band is constant.
    pub fn new(bounds: ClipBounds, range: IntensityRange) -> Result<Self> {
        if range.is_degenerate() {
            return Err(CompositeError::DegenerateRange { value: range.min });
        }
        Ok(Self {
            bounds,
            delta: range.delta() as f64,
        })
    }

    #[inline]
    pub fn apply(&self, sample: u16) -> u8 {
        let s = sample as f64;
        if !self.bounds.contains(s) {
            return 0;
        }
        ((s / self.delta) * 255.0) as u8
    }

    /// Quantizes `samples` into `output`, one byte per sample.
    ///
    /// `samples` must yield exactly `output.len()` values.
    pub fn quantize_into<I>(&self, samples: I, output: &mut [u8]) -> Result<()>
    where
        I: ExactSizeIterator<Item = u16>,
    {
        if samples.len() != output.len() {
            return Err(CompositeError::InvalidDimensions(samples.len(), output.len()));
        }
        for (dst, sample) in output.iter_mut().zip(samples) {
            *dst = self.apply(sample);
        }
        Ok(())
    }
}
