//! Waveform previews are produced elsewhere; region views only keep the last result.

use crate::data::PlaybackRegion;
use crate::timeline::TimeRange;
use rand::{rngs::StdRng, Rng, SeedableRng};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Peak {
    pub min: f32,
    pub max: f32,
}

pub trait WaveformPreviewProvider {
    /// Peaks of `region` over `source_range`, seconds relative to the region start, split
    /// into `buckets` equal parts.
    fn peaks(&self, region: &PlaybackRegion, source_range: TimeRange, buckets: usize) -> Vec<Peak>;
}

/// Deterministic decaying noise, one hit per half second. Used when no audio is available.
#[derive(Clone, Debug)]
pub struct SyntheticPreview {
    pub hits_per_second: f64,
}

impl Default for SyntheticPreview {
    fn default() -> Self {
        Self {
            hits_per_second: 2.0,
        }
    }
}

impl WaveformPreviewProvider for SyntheticPreview {
    fn peaks(&self, region: &PlaybackRegion, source_range: TimeRange, buckets: usize) -> Vec<Peak> {
        if buckets == 0 || source_range.is_empty() {
            return vec![];
        }
        let step = source_range.length() / buckets as f64;
        (0..buckets)
            .map(|i| {
                let t = region.start_in_modification_time + source_range.start + (i as f64 + 0.5) * step;
                let phase = t * self.hits_per_second;
                let envelope = 0.1 + 0.8 * (1.0 - phase.rem_euclid(1.0)).powi(3);
                let seed = region.id.0.wrapping_mul(0x9e37_79b9) ^ (t * 1000.0) as i64 as u64;
                let mut rng = StdRng::seed_from_u64(seed);
                let amp = (envelope * rng.gen_range(0.6..1.0)) as f32;
                Peak {
                    min: -amp * rng.gen_range(0.8..1.0),
                    max: amp,
                }
            })
            .collect()
    }
}

/// Remembers the peaks for one region until its content or the requested range changes.
#[derive(Debug, Default)]
pub struct WaveformCache {
    key: Option<(u64, u64, usize)>,
    peaks: Vec<Peak>,
    fills: usize,
}

impl WaveformCache {
    pub fn invalidate(&mut self) {
        self.key = None;
    }

    pub fn peaks(
        &mut self,
        provider: &dyn WaveformPreviewProvider,
        region: &PlaybackRegion,
        source_range: TimeRange,
        buckets: usize,
    ) -> &[Peak] {
        let key = (
            source_range.start.to_bits(),
            source_range.end.to_bits(),
            buckets,
        );
        if self.key != Some(key) {
            self.peaks = provider.peaks(region, source_range, buckets);
            self.key = Some(key);
            self.fills += 1;
        }
        &self.peaks
    }

    /// How often the provider was asked.
    pub fn fill_count(&self) -> usize {
        self.fills
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::PlaybackRegionId;

    #[test]
    fn synthetic_preview_is_deterministic() {
        let region = PlaybackRegion::new(PlaybackRegionId(4), 0.0, 4.0);
        let preview = SyntheticPreview::default();
        let a = preview.peaks(&region, TimeRange::new(0.0, 4.0), 64);
        let b = preview.peaks(&region, TimeRange::new(0.0, 4.0), 64);
        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
        assert!(a.iter().all(|p| p.min <= 0.0 && p.max >= 0.0 && p.max <= 1.0));
        assert!(preview.peaks(&region, TimeRange::EMPTY, 8).is_empty());
    }

    #[test]
    fn cache_asks_provider_once_per_range() {
        let region = PlaybackRegion::new(PlaybackRegionId(1), 0.0, 4.0);
        let preview = SyntheticPreview::default();
        let mut cache = WaveformCache::default();
        cache.peaks(&preview, &region, TimeRange::new(0.0, 2.0), 16);
        cache.peaks(&preview, &region, TimeRange::new(0.0, 2.0), 16);
        assert_eq!(cache.fill_count(), 1);
        cache.peaks(&preview, &region, TimeRange::new(0.0, 3.0), 16);
        assert_eq!(cache.fill_count(), 2);
        cache.invalidate();
        cache.peaks(&preview, &region, TimeRange::new(0.0, 3.0), 16);
        assert_eq!(cache.fill_count(), 3);
    }
}
