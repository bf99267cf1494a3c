use super::coordinator::RebuildStats;
use super::region::PlaybackRegionView;
use crate::data::{Color, PlaybackRegionId, RegionSequence, RegionSequenceId, ViewSelection};
use crate::timeline::TimeRange;
use indexmap::IndexMap;

/// View-model of a track: its header state and the region views in document order.
#[derive(Debug)]
pub struct RegionSequenceView {
    id: RegionSequenceId,
    name: Option<String>,
    color: Option<Color>,
    order_index: i32,
    selected: bool,
    regions: IndexMap<PlaybackRegionId, PlaybackRegionView>,
    y: i32,
    height: i32,
}

impl RegionSequenceView {
    pub fn new(sequence: &RegionSequence, selection: &ViewSelection, stats: &mut RebuildStats) -> Self {
        let mut view = Self {
            id: sequence.id,
            name: None,
            color: None,
            order_index: 0,
            selected: false,
            regions: IndexMap::new(),
            y: 0,
            height: 0,
        };
        view.sync(sequence, selection, stats);
        view
    }

    /// Brings properties and region views in line with `sequence`, keeping the views of
    /// regions that still exist.
    pub fn sync(&mut self, sequence: &RegionSequence, selection: &ViewSelection, stats: &mut RebuildStats) {
        debug_assert_eq!(self.id, sequence.id);
        self.update_properties(sequence);
        self.update_selection(selection);

        let mut old = std::mem::take(&mut self.regions);
        for region in &sequence.playback_regions {
            if self.regions.contains_key(&region.id) {
                log::warn!("playback region {} listed twice in sequence {}", region.id.0, self.id.0);
                continue;
            }
            let view = match old.swap_remove(&region.id) {
                Some(mut view) => {
                    stats.regions.reused += 1;
                    view.update_properties(region, sequence);
                    view.set_selected(selection.playback_regions.contains(&region.id));
                    view
                }
                None => {
                    stats.regions.created += 1;
                    PlaybackRegionView::new(region, sequence, selection)
                }
            };
            self.regions.insert(region.id, view);
        }
        stats.regions.destroyed += old.len();
    }

    /// Name, color and order. Regions without their own color follow the new one.
    pub fn update_properties(&mut self, sequence: &RegionSequence) {
        self.name = sequence.name.clone();
        self.color = sequence.color;
        self.order_index = sequence.order_index;
        for view in self.regions.values_mut() {
            if let Some(region) = sequence.playback_region(view.id()) {
                view.update_properties(region, sequence);
            }
        }
    }

    /// Returns true when any header or region selection flag changed.
    pub fn update_selection(&mut self, selection: &ViewSelection) -> bool {
        let selected = selection.region_sequences.contains(&self.id);
        let mut changed = std::mem::replace(&mut self.selected, selected) != selected;
        for view in self.regions.values_mut() {
            changed |= view.set_selected(selection.playback_regions.contains(&view.id()));
        }
        changed
    }

    pub fn id(&self) -> RegionSequenceId {
        self.id
    }
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
    pub fn color(&self) -> Option<Color> {
        self.color
    }
    pub fn order_index(&self) -> i32 {
        self.order_index
    }
    pub fn is_selected(&self) -> bool {
        self.selected
    }
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
    pub fn region_count(&self) -> usize {
        self.regions.len()
    }

    /// Union of the region ranges, [`TimeRange::EMPTY`] without regions.
    pub fn time_range(&self) -> TimeRange {
        self.regions
            .values()
            .map(PlaybackRegionView::time_range)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(TimeRange::EMPTY)
    }

    pub fn regions(&self) -> impl Iterator<Item = &PlaybackRegionView> {
        self.regions.values()
    }
    pub fn regions_mut(&mut self) -> impl Iterator<Item = &mut PlaybackRegionView> {
        self.regions.values_mut()
    }
    pub fn region(&self, id: PlaybackRegionId) -> Option<&PlaybackRegionView> {
        self.regions.get(&id)
    }
    pub fn region_mut(&mut self, id: PlaybackRegionId) -> Option<&mut PlaybackRegionView> {
        self.regions.get_mut(&id)
    }

    /// Vertical lane in content coordinates, shared by the header and the regions.
    pub fn set_y_range(&mut self, y: i32, height: i32) {
        self.y = y;
        self.height = height;
    }
    pub fn y(&self) -> i32 {
        self.y
    }
    pub fn height(&self) -> i32 {
        self.height
    }
}
