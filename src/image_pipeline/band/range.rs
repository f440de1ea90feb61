use crate::image_pipeline::band::types::BandBuffer;

/// Observed minimum and maximum of a band's native samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IntensityRange {
    pub min: u16,
    pub max: u16,
}

impl IntensityRange {
    /// Full single-pass scan. An empty slice yields `(0, 0)`.
    pub fn scan(samples: &[u16]) -> Self {
        let mut iter = samples.iter().copied();
        let Some(first) = iter.next() else {
            return Self::default();
        };

        let (min, max) = iter.fold((first, first), |(min, max), s| (min.min(s), max.max(s)));
        Self { min, max }
    }

    pub fn of(buffer: &BandBuffer) -> Self {
        Self::scan(buffer.samples())
    }

    /// Dynamic range δ = max − min.
    pub fn delta(&self) -> u16 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.delta() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slice() {
        assert_eq!(IntensityRange::scan(&[]), IntensityRange { min: 0, max: 0 });
    }

    #[test]
    fn test_true_minimum_is_found() {
        let range = IntensityRange::scan(&[5000, 5000, 10000, 5000]);
        assert_eq!(range.min, 5000);
        assert_eq!(range.max, 10000);
        assert_eq!(range.delta(), 5000);
    }

    #[test]
    fn test_extremes_anywhere_in_buffer() {
        let range = IntensityRange::scan(&[300, 7, 65535, 12, 0, 900]);
        assert_eq!(range, IntensityRange { min: 0, max: 65535 });
    }

    #[test]
    fn test_constant_band_is_degenerate() {
        let buffer = BandBuffer::filled(4, 1234);
        let range = IntensityRange::of(&buffer);
        assert!(range.is_degenerate());
        assert_eq!(range.delta(), 0);
    }
}
