use std::iter::Copied;
use std::slice::Iter;

use tracing::trace;

use crate::image_pipeline::band::BandBuffer;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::resample::tiers::ResolutionTiers;

/// Lazily produced samples of a band on a `target`×`target` grid.
pub enum Resampled<'a> {
    /// Native side equals the target; samples are read straight through.
    Identity(Copied<Iter<'a, u16>>),
    /// Each native sample replicated into a `ratio`×`ratio` block.
    Replicated(Replicate<'a>),
}

impl Iterator for Resampled<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        match self {
            Resampled::Identity(iter) => iter.next(),
            Resampled::Replicated(iter) => iter.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Resampled::Identity(iter) => iter.size_hint(),
            Resampled::Replicated(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for Resampled<'_> {}

/// Aligns `buffer` to a `target` side length without materialising the
/// expanded raster.
pub fn resample<'a>(
    buffer: &'a BandBuffer,
    target: usize,
    tiers: &ResolutionTiers,
) -> Result<Resampled<'a>> {
    let native = buffer.side();
    let ratio = tiers.ratio(native, target)?;

    trace!(native, target, ratio, "Aligning band");

    if ratio == 1 {
        return Ok(Resampled::Identity(buffer.samples().iter().copied()));
    }
    Ok(Resampled::Replicated(Replicate::new(buffer.samples(), native, ratio)))
}

/// Nearest-neighbour replication walked in output raster order.
///
/// Two countdown counters track how many more output columns reuse the
/// current native column and how many more output rows reuse the current
/// native row.
pub struct Replicate<'a> {
    samples: &'a [u16],
    native: usize,
    ratio: usize,
    row_start: usize,
    col: usize,
    cols_left: usize,
    rows_left: usize,
    remaining: usize,
}

impl<'a> Replicate<'a> {
    fn new(samples: &'a [u16], native: usize, ratio: usize) -> Self {
        let target = native * ratio;
        Self {
            samples,
            native,
            ratio,
            row_start: 0,
            col: 0,
            cols_left: ratio,
            rows_left: ratio,
            remaining: target * target,
        }
    }
}

impl Iterator for Replicate<'_> {
    type Item = u16;

    #[inline]
    fn next(&mut self) -> Option<u16> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.samples[self.row_start + self.col];
        self.remaining -= 1;

        self.cols_left -= 1;
        if self.cols_left == 0 {
            self.cols_left = self.ratio;
            self.col += 1;

            // end of an output row
            if self.col == self.native {
                self.col = 0;
                self.rows_left -= 1;
                if self.rows_left == 0 {
                    self.rows_left = self.ratio;
                    self.row_start += self.native;
                }
            }
        }

        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Replicate<'_> {}
