use super::waveform::WaveformCache;
use crate::data::{
    Color, PlaybackRegion, PlaybackRegionId, RegionSequence, RegionSequenceId, ViewSelection,
};
use crate::timeline::{PixelSpan, TimeRange};

/// View-model of one playback region. Pixel bounds are derived from the viewport on
/// every layout and never written back.
#[derive(Debug)]
pub struct PlaybackRegionView {
    id: PlaybackRegionId,
    sequence: RegionSequenceId,
    time_range: TimeRange,
    start_in_source: f64,
    name: Option<String>,
    color: Option<Color>,
    selected: bool,
    bounds: Option<PixelSpan>,
    waveform: WaveformCache,
}

fn effective_name(region: &PlaybackRegion) -> Option<String> {
    region
        .name
        .as_ref()
        .or(region.audio_modification_name.as_ref())
        .or(region.audio_source_name.as_ref())
        .cloned()
}

impl PlaybackRegionView {
    pub fn new(region: &PlaybackRegion, sequence: &RegionSequence, selection: &ViewSelection) -> Self {
        Self {
            id: region.id,
            sequence: sequence.id,
            time_range: region.time_range(),
            start_in_source: region.start_in_modification_time,
            name: effective_name(region),
            color: region.color.or(sequence.color),
            selected: selection.playback_regions.contains(&region.id),
            bounds: None,
            waveform: WaveformCache::default(),
        }
    }

    /// Takes over changed properties. Returns true when the time range moved.
    pub fn update_properties(&mut self, region: &PlaybackRegion, sequence: &RegionSequence) -> bool {
        debug_assert_eq!(self.id, region.id);
        self.sequence = sequence.id;
        self.name = effective_name(region);
        self.color = region.color.or(sequence.color);
        let range = region.time_range();
        let moved = range != self.time_range || region.start_in_modification_time != self.start_in_source;
        if moved {
            self.time_range = range;
            self.start_in_source = region.start_in_modification_time;
            self.waveform.invalidate();
        }
        moved
    }

    pub fn id(&self) -> PlaybackRegionId {
        self.id
    }
    pub fn sequence(&self) -> RegionSequenceId {
        self.sequence
    }
    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }
    pub fn start_in_source(&self) -> f64 {
        self.start_in_source
    }
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    /// The region's color, else its sequence's.
    pub fn color(&self) -> Option<Color> {
        self.color
    }
    pub fn is_selected(&self) -> bool {
        self.selected
    }
    /// Returns true when the state flipped.
    pub fn set_selected(&mut self, selected: bool) -> bool {
        std::mem::replace(&mut self.selected, selected) != selected
    }

    /// `None` while the region is outside the visible range.
    pub fn bounds(&self) -> Option<PixelSpan> {
        self.bounds
    }
    pub fn is_visible(&self) -> bool {
        self.bounds.is_some()
    }
    pub(super) fn set_bounds(&mut self, bounds: Option<PixelSpan>) {
        self.bounds = bounds;
    }

    pub fn waveform_mut(&mut self) -> &mut WaveformCache {
        &mut self.waveform
    }
    pub fn waveform(&self) -> &WaveformCache {
        &self.waveform
    }
}
