//! Keeps the track and region view-models in step with the document.
//!
//! Structural notifications only mark the views invalid while the host is editing; the
//! rebuild runs once the edit cycle ends. A rebuild diffs the wanted sequences against
//! the existing views by id, so views of surviving sequences and regions (and their
//! waveform caches) are kept.

use super::region::PlaybackRegionView;
use super::sequence::RegionSequenceView;
use crate::data::{Document, DocumentEvent, PlaybackRegionId, RegionSequenceId};
use crate::timeline::{PixelMapper, PixelSpan, TimeRange, TimelineViewport};
use indexmap::IndexMap;

/// Space added left and right of the outermost regions, in seconds.
pub const TIME_RANGE_BORDER: f64 = 1.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewCounts {
    pub created: usize,
    pub reused: usize,
    pub destroyed: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildStats {
    pub sequences: ViewCounts,
    pub regions: ViewCounts,
}

/// What handling a notification changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Changes {
    pub rebuilt: bool,
    pub time_range_changed: bool,
    /// Every region needs new bounds.
    pub layout_all: bool,
    /// Regions needing new bounds.
    pub regions: Vec<PlaybackRegionId>,
    pub repaint: bool,
}

impl Changes {
    pub fn merge(&mut self, other: Changes) {
        self.rebuilt |= other.rebuilt;
        self.time_range_changed |= other.time_range_changed;
        self.layout_all |= other.layout_all;
        self.repaint |= other.repaint;
        for id in other.regions {
            if !self.regions.contains(&id) {
                self.regions.push(id);
            }
        }
    }
    pub fn is_empty(&self) -> bool {
        *self == Changes::default()
    }
}

pub struct DocumentViewCoordinator {
    sequences: IndexMap<RegionSequenceId, RegionSequenceView>,
    views_invalid: bool,
    time_range_invalid: bool,
    host_editing: bool,
    attached: bool,
    document_alive: bool,
    show_only_selected: bool,
    time_range: TimeRange,
    last_rebuild: RebuildStats,
    rebuild_count: usize,
}

impl DocumentViewCoordinator {
    /// Starts detached with nothing built; [`DocumentViewCoordinator::attach`] builds lazily.
    pub fn new(show_only_selected: bool) -> Self {
        Self {
            sequences: IndexMap::new(),
            views_invalid: true,
            time_range_invalid: true,
            host_editing: false,
            attached: false,
            document_alive: true,
            show_only_selected,
            time_range: TimeRange::EMPTY.expanded(TIME_RANGE_BORDER),
            last_rebuild: RebuildStats::default(),
            rebuild_count: 0,
        }
    }

    /// The view got its place on screen. Runs the initial build unless the host is
    /// editing.
    pub fn attach(&mut self, document: &Document) -> Changes {
        let mut changes = Changes::default();
        self.attached = true;
        self.host_editing |= document.is_editing();
        if self.views_invalid && !self.host_editing {
            self.rebuild(document, &mut changes);
        }
        changes
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
    pub fn views_invalid(&self) -> bool {
        self.views_invalid
    }
    pub fn show_only_selected(&self) -> bool {
        self.show_only_selected
    }

    pub fn set_show_only_selected(&mut self, document: &Document, show_only_selected: bool) -> Changes {
        let mut changes = Changes::default();
        if self.show_only_selected != show_only_selected {
            self.show_only_selected = show_only_selected;
            self.invalidate_region_sequence_views(document, &mut changes);
        }
        changes
    }

    fn invalidate_region_sequence_views(&mut self, document: &Document, changes: &mut Changes) {
        if self.host_editing || !self.attached || !self.document_alive {
            if !self.views_invalid {
                log::trace!("region sequence views invalidated, rebuild deferred");
            }
            self.views_invalid = true;
        } else {
            self.rebuild(document, changes);
        }
    }

    fn wanted_sequences(&self, document: &Document) -> Vec<RegionSequenceId> {
        if self.show_only_selected {
            document.selection().effective_region_sequences(document)
        } else {
            document
                .region_sequences()
                .iter()
                .filter(|s| !document.is_hidden(s.id))
                .map(|s| s.id)
                .collect()
        }
    }

    fn rebuild(&mut self, document: &Document, changes: &mut Changes) {
        let selection = document.selection();
        let mut stats = RebuildStats::default();
        let mut old = std::mem::take(&mut self.sequences);
        for id in self.wanted_sequences(document) {
            let Some(sequence) = document.region_sequence(id) else {
                log::warn!("selection refers to unknown region sequence {}", id.0);
                continue;
            };
            if self.sequences.contains_key(&id) {
                continue;
            }
            let view = match old.swap_remove(&id) {
                Some(mut view) => {
                    stats.sequences.reused += 1;
                    view.sync(sequence, selection, &mut stats);
                    view
                }
                None => {
                    stats.sequences.created += 1;
                    RegionSequenceView::new(sequence, selection, &mut stats)
                }
            };
            self.sequences.insert(id, view);
        }
        stats.sequences.destroyed += old.len();
        stats.regions.destroyed += old.values().map(RegionSequenceView::region_count).sum::<usize>();

        log::debug!(
            "rebuilt region sequence views: sequences {:?}, regions {:?}",
            stats.sequences,
            stats.regions
        );
        self.views_invalid = false;
        self.last_rebuild = stats;
        self.rebuild_count += 1;
        changes.rebuilt = true;
        changes.layout_all = true;
        changes.repaint = true;
        self.calculate_time_range(changes);
    }

    /// Union of all non-empty sequences plus a border. Without any regions this is the
    /// minimum window around zero.
    fn calculate_time_range(&mut self, changes: &mut Changes) {
        let range = self
            .sequences
            .values()
            .filter(|s| !s.is_empty())
            .map(RegionSequenceView::time_range)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(TimeRange::EMPTY)
            .expanded(TIME_RANGE_BORDER);
        self.time_range_invalid = false;
        if range != self.time_range {
            log::debug!("document time range {} -> {}", self.time_range, range);
            self.time_range = range;
            changes.time_range_changed = true;
            changes.layout_all = true;
        }
    }

    /// Applies one host notification.
    pub fn handle_event(&mut self, document: &Document, event: &DocumentEvent) -> Changes {
        let mut changes = Changes::default();
        if !self.document_alive {
            return changes;
        }
        match event {
            DocumentEvent::NewSelection => {
                if self.show_only_selected {
                    self.invalidate_region_sequence_views(document, &mut changes);
                }
                for view in self.sequences.values_mut() {
                    changes.repaint |= view.update_selection(document.selection());
                }
                // the selection overlay may have moved
                changes.repaint = true;
            }
            DocumentEvent::HideRegionSequences(_)
            | DocumentEvent::DidAddRegionSequence(_)
            | DocumentEvent::WillRemoveRegionSequence(_)
            | DocumentEvent::DidReorderRegionSequences
            | DocumentEvent::DidAddPlaybackRegion { .. }
            | DocumentEvent::WillRemovePlaybackRegion { .. } => {
                self.invalidate_region_sequence_views(document, &mut changes);
            }
            DocumentEvent::WillBeginEditing => self.host_editing = true,
            DocumentEvent::DidEndEditing => {
                self.host_editing = false;
                if self.views_invalid && self.attached {
                    self.rebuild(document, &mut changes);
                }
                if self.time_range_invalid {
                    self.calculate_time_range(&mut changes);
                }
                changes.layout_all = true;
            }
            DocumentEvent::DidUpdateRegionSequenceProperties(id) => {
                match (self.sequences.get_mut(id), document.region_sequence(*id)) {
                    (Some(view), Some(sequence)) => {
                        view.update_properties(sequence);
                        changes.repaint = true;
                    }
                    (_, None) => log::warn!("update for unknown region sequence {}", id.0),
                    (None, Some(_)) => {}
                }
            }
            DocumentEvent::DidUpdatePlaybackRegionProperties(id) => {
                let Some(sequence) = document.sequence_for_region(*id) else {
                    log::warn!("update for unknown playback region {}", id.0);
                    return changes;
                };
                let region = sequence.playback_region(*id);
                let view = self
                    .sequences
                    .get_mut(&sequence.id)
                    .and_then(|v| v.region_mut(*id));
                if let (Some(view), Some(region)) = (view, region) {
                    if view.update_properties(region, sequence) {
                        self.time_range_invalid = true;
                        if !self.host_editing {
                            self.calculate_time_range(&mut changes);
                        }
                    }
                    changes.regions.push(*id);
                    changes.repaint = true;
                }
            }
            DocumentEvent::DidUpdatePlaybackRegionContent(id, scopes) => {
                if let Some(view) = self.region_mut(*id) {
                    if scopes.samples {
                        view.waveform_mut().invalidate();
                    }
                    if scopes.samples && !self.host_editing {
                        changes.regions.push(*id);
                        changes.repaint = true;
                    }
                }
            }
            DocumentEvent::DidAddMusicalContext(_)
            | DocumentEvent::WillRemoveMusicalContext(_)
            | DocumentEvent::DidReorderMusicalContexts
            | DocumentEvent::DidUpdateMusicalContextContent(..) => {
                changes.repaint = true;
            }
            DocumentEvent::WillDestroyDocument => {
                log::debug!("document destroyed, dropping {} sequence views", self.sequences.len());
                self.sequences.clear();
                self.document_alive = false;
                self.views_invalid = false;
                changes.repaint = true;
            }
        }
        changes
    }

    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }
    pub fn last_rebuild(&self) -> RebuildStats {
        self.last_rebuild
    }
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    pub fn sequences(&self) -> impl Iterator<Item = &RegionSequenceView> {
        self.sequences.values()
    }
    pub fn sequence_ids(&self) -> Vec<RegionSequenceId> {
        self.sequences.keys().copied().collect()
    }
    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }
    pub fn sequence(&self, id: RegionSequenceId) -> Option<&RegionSequenceView> {
        self.sequences.get(&id)
    }
    pub fn region(&self, id: PlaybackRegionId) -> Option<&PlaybackRegionView> {
        self.sequences.values().find_map(|s| s.region(id))
    }
    pub fn region_mut(&mut self, id: PlaybackRegionId) -> Option<&mut PlaybackRegionView> {
        self.sequences.values_mut().find_map(|s| s.region_mut(id))
    }
    pub fn sequences_mut(&mut self) -> impl Iterator<Item = &mut RegionSequenceView> {
        self.sequences.values_mut()
    }

    /// Stacks the tracks from y = 0 and returns the total content height.
    pub fn layout_tracks(&mut self, track_height: i32) -> i32 {
        let mut y = 0;
        for view in self.sequences.values_mut() {
            view.set_y_range(y, track_height);
            y += track_height;
        }
        y
    }

    pub fn update_all_region_bounds<M: PixelMapper>(&mut self, viewport: &TimelineViewport<M>) {
        let visible = viewport.visible_range();
        for region in self.sequences.values_mut().flat_map(|s| s.regions_mut()) {
            set_region_bounds(region, viewport, visible);
        }
    }

    pub fn update_region_bounds<M: PixelMapper>(&mut self, id: PlaybackRegionId, viewport: &TimelineViewport<M>) {
        let visible = viewport.visible_range();
        if let Some(region) = self.region_mut(id) {
            set_region_bounds(region, viewport, visible);
        }
    }
}

/// Pixel span of the visible part of `range`, `None` when nothing of it is visible.
pub fn region_bounds<M: PixelMapper>(
    viewport: &TimelineViewport<M>,
    range: TimeRange,
    visible_range: TimeRange,
) -> Option<PixelSpan> {
    let visible = range.intersection(&visible_range);
    if visible.is_empty() {
        return None;
    }
    let x = viewport.pixel_for_position(visible.start);
    let width = viewport.pixel_for_position(visible.end) - x;
    Some(PixelSpan { x, width })
}

/// Places a region view for the given visible range, hiding it when outside.
pub fn set_region_bounds<M: PixelMapper>(
    view: &mut PlaybackRegionView,
    viewport: &TimelineViewport<M>,
    visible_range: TimeRange,
) {
    view.set_bounds(region_bounds(viewport, view.time_range(), visible_range));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{ContentUpdateScopes, PlaybackRegion, RegionSequence, ViewSelection};
    use crate::timeline::SecondsPixelMapper;
    use proptest::prelude::*;

    fn sequence(id: u64, regions: &[(u64, f64, f64)]) -> RegionSequence {
        let mut s = RegionSequence::new(RegionSequenceId(id), &format!("track {id}"));
        s.playback_regions = regions
            .iter()
            .map(|&(rid, start, len)| PlaybackRegion::new(PlaybackRegionId(rid), start, len))
            .collect();
        s
    }

    fn pump(coordinator: &mut DocumentViewCoordinator, document: &mut Document) -> Changes {
        let mut changes = Changes::default();
        for event in document.drain_events() {
            changes.merge(coordinator.handle_event(document, &event));
        }
        changes
    }

    #[test]
    fn scenario_d_empty_document_has_minimum_window() {
        let document = Document::new("empty");
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);
        assert_eq!(coordinator.sequence_count(), 0);
        assert_eq!(coordinator.time_range(), TimeRange::new(-1.0, 1.0));
        assert!(!coordinator.time_range().is_empty());
    }

    #[test]
    fn time_range_is_union_with_border() {
        let mut document = Document::new("doc");
        document.add_region_sequence(sequence(1, &[(1, 2.0, 3.0)]));
        document.add_region_sequence(sequence(2, &[(2, 10.0, 2.0)]));
        document.add_region_sequence(sequence(3, &[]));
        document.drain_events();
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);
        assert_eq!(coordinator.sequence_count(), 3);
        assert_eq!(coordinator.time_range(), TimeRange::new(1.0, 13.0));
    }

    #[test]
    fn rebuild_is_deferred_until_edit_ends() {
        let mut document = Document::new("doc");
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);
        let rebuilds = coordinator.rebuild_count();

        document.begin_editing();
        document.add_region_sequence(sequence(1, &[(1, 0.0, 1.0)]));
        document.add_region_sequence(sequence(2, &[(2, 0.0, 1.0)]));
        pump(&mut coordinator, &mut document);
        assert!(coordinator.views_invalid());
        assert_eq!(coordinator.rebuild_count(), rebuilds);
        assert_eq!(coordinator.sequence_count(), 0);

        document.end_editing();
        let changes = pump(&mut coordinator, &mut document);
        assert!(changes.rebuilt && changes.time_range_changed);
        assert_eq!(coordinator.rebuild_count(), rebuilds + 1);
        assert_eq!(coordinator.sequence_ids(), vec![RegionSequenceId(1), RegionSequenceId(2)]);
    }

    #[test]
    fn detached_view_builds_on_attach() {
        let document = Document::demo();
        let mut coordinator = DocumentViewCoordinator::new(false);
        assert_eq!(coordinator.sequence_count(), 0);
        let changes = coordinator.attach(&document);
        assert!(changes.rebuilt);
        assert_eq!(coordinator.sequence_count(), 3);
        assert_eq!(coordinator.last_rebuild().regions.created, 9);
    }

    #[test]
    fn rebuild_reuses_surviving_views() {
        let mut document = Document::demo();
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);

        document.begin_editing();
        document.remove_region_sequence(RegionSequenceId(2));
        document.move_region_sequence(RegionSequenceId(3), 0);
        document.end_editing();
        pump(&mut coordinator, &mut document);

        let stats = coordinator.last_rebuild();
        assert_eq!(stats.sequences, ViewCounts { created: 0, reused: 2, destroyed: 1 });
        assert_eq!(stats.regions, ViewCounts { created: 0, reused: 6, destroyed: 3 });
        assert_eq!(coordinator.sequence_ids(), vec![RegionSequenceId(3), RegionSequenceId(1)]);
    }

    #[test]
    fn hidden_and_selected_only_modes() {
        let mut document = Document::demo();
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);

        document.hide_region_sequences(vec![RegionSequenceId(1)]);
        pump(&mut coordinator, &mut document);
        assert_eq!(coordinator.sequence_ids(), vec![RegionSequenceId(2), RegionSequenceId(3)]);

        document.set_selection(ViewSelection {
            playback_regions: vec![PlaybackRegionId(1)],
            ..Default::default()
        });
        pump(&mut coordinator, &mut document);
        // selection alone does not rebuild in the default mode
        assert_eq!(coordinator.sequence_count(), 2);

        coordinator.set_show_only_selected(&document, true);
        assert_eq!(coordinator.sequence_ids(), vec![RegionSequenceId(1)]);
        assert!(coordinator.region(PlaybackRegionId(1)).is_some_and(|r| r.is_selected()));
    }

    #[test]
    fn region_move_updates_time_range() {
        let mut document = Document::new("doc");
        document.add_region_sequence(sequence(1, &[(1, 0.0, 2.0)]));
        document.drain_events();
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);
        assert_eq!(coordinator.time_range(), TimeRange::new(-1.0, 3.0));

        document.update_playback_region(PlaybackRegionId(1), |r| r.duration_in_playback_time = 5.0);
        let changes = pump(&mut coordinator, &mut document);
        assert!(changes.time_range_changed);
        assert_eq!(changes.regions, vec![PlaybackRegionId(1)]);
        assert!(!changes.rebuilt);
        assert_eq!(coordinator.time_range(), TimeRange::new(-1.0, 6.0));
    }

    #[test]
    fn sample_update_invalidates_waveform_only() {
        let mut document = Document::demo();
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);
        let rebuilds = coordinator.rebuild_count();
        document.update_playback_region_content(PlaybackRegionId(4), ContentUpdateScopes::timing());
        assert!(pump(&mut coordinator, &mut document).regions.is_empty());
        document.update_playback_region_content(PlaybackRegionId(4), ContentUpdateScopes::everything());
        assert_eq!(pump(&mut coordinator, &mut document).regions, vec![PlaybackRegionId(4)]);
        assert_eq!(coordinator.rebuild_count(), rebuilds);
    }

    #[test]
    fn destroyed_document_drops_views() {
        let mut document = Document::demo();
        let mut coordinator = DocumentViewCoordinator::new(false);
        coordinator.attach(&document);
        document.destroy();
        pump(&mut coordinator, &mut document);
        assert_eq!(coordinator.sequence_count(), 0);
        // later notifications are ignored
        assert!(coordinator
            .handle_event(&document, &DocumentEvent::DidEndEditing)
            .is_empty());
    }

    #[test]
    fn region_bounds_are_clipped_to_visible_range() {
        let mut viewport = TimelineViewport::new(SecondsPixelMapper::new());
        viewport.set_size(1000, 200);
        viewport.set_timeline_range(TimeRange::new(0.0, 100.0));
        viewport.set_visible_range(TimeRange::new(0.0, 10.0), None);
        let visible = viewport.visible_range();

        let span = region_bounds(&viewport, TimeRange::new(2.0, 4.0), visible);
        assert_eq!(span, Some(PixelSpan { x: 200, width: 200 }));
        let span = region_bounds(&viewport, TimeRange::new(8.0, 20.0), visible);
        assert_eq!(span, Some(PixelSpan { x: 800, width: 200 }));
        assert_eq!(region_bounds(&viewport, TimeRange::new(20.0, 30.0), visible), None);
    }

    #[derive(Clone, Debug)]
    enum Op {
        Add,
        Remove(usize),
        Move(usize, usize),
        Hide(usize),
        AddRegion(usize),
        RemoveRegion(usize),
        SelectSequence(usize),
        SelectRegion(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Add),
            (0usize..8).prop_map(Op::Remove),
            (0usize..8, 0usize..8).prop_map(|(a, b)| Op::Move(a, b)),
            (0usize..8).prop_map(Op::Hide),
            (0usize..8).prop_map(Op::AddRegion),
            (0usize..16).prop_map(Op::RemoveRegion),
            (0usize..8).prop_map(Op::SelectSequence),
            (0usize..16).prop_map(Op::SelectRegion),
        ]
    }

    fn apply(document: &mut Document, op: Op, next_id: &mut u64) {
        let ids: Vec<_> = document.region_sequences().iter().map(|s| s.id).collect();
        let region_ids: Vec<_> = document
            .region_sequences()
            .iter()
            .flat_map(|s| s.playback_regions.iter().map(|r| r.id))
            .collect();
        let id = *next_id;
        match op {
            Op::Add => {
                document.add_region_sequence(sequence(id, &[(id, id as f64, 1.0)]));
                *next_id += 1;
            }
            Op::Remove(i) if !ids.is_empty() => {
                document.remove_region_sequence(ids[i % ids.len()]);
            }
            Op::Move(i, to) if !ids.is_empty() => {
                document.move_region_sequence(ids[i % ids.len()], to);
            }
            Op::Hide(i) if !ids.is_empty() => {
                document.hide_region_sequences(vec![ids[i % ids.len()]]);
            }
            Op::AddRegion(i) if !ids.is_empty() => {
                let region = PlaybackRegion::new(PlaybackRegionId(id), id as f64, 2.0);
                document.add_playback_region(ids[i % ids.len()], region);
                *next_id += 1;
            }
            Op::RemoveRegion(i) if !region_ids.is_empty() => {
                document.remove_playback_region(region_ids[i % region_ids.len()]);
            }
            Op::SelectSequence(i) if !ids.is_empty() => {
                document.set_selection(ViewSelection {
                    region_sequences: vec![ids[i % ids.len()]],
                    ..Default::default()
                });
            }
            Op::SelectRegion(i) if !region_ids.is_empty() => {
                document.set_selection(ViewSelection {
                    playback_regions: vec![region_ids[i % region_ids.len()]],
                    ..Default::default()
                });
            }
            _ => {}
        }
    }

    fn expected_sequences(document: &Document, show_only_selected: bool) -> Vec<RegionSequenceId> {
        let candidates = if show_only_selected {
            document.selection().effective_region_sequences(document)
        } else {
            document
                .region_sequences()
                .iter()
                .filter(|s| !document.is_hidden(s.id))
                .map(|s| s.id)
                .collect()
        };
        let mut result = vec![];
        for id in candidates {
            if document.region_sequence(id).is_some() && !result.contains(&id) {
                result.push(id);
            }
        }
        result
    }

    proptest! {
        #[test]
        fn rebuild_matches_document_after_edit(
            show_only_selected in any::<bool>(),
            batches in prop::collection::vec(prop::collection::vec(op(), 1..8), 1..6),
        ) {
            let mut document = Document::new("doc");
            let mut coordinator = DocumentViewCoordinator::new(show_only_selected);
            coordinator.attach(&document);
            let mut next_id = 1;
            for batch in batches {
                document.begin_editing();
                for op in batch {
                    apply(&mut document, op, &mut next_id);
                }
                document.end_editing();
                pump(&mut coordinator, &mut document);

                prop_assert!(!coordinator.views_invalid());
                prop_assert_eq!(
                    coordinator.sequence_ids(),
                    expected_sequences(&document, show_only_selected)
                );
                for id in coordinator.sequence_ids() {
                    let shown: Vec<_> = coordinator
                        .sequence(id)
                        .into_iter()
                        .flat_map(|view| view.regions().map(|r| r.id()))
                        .collect();
                    let wanted: Vec<_> = document
                        .region_sequence(id)
                        .map(|s| s.playback_regions.iter().map(|r| r.id).collect())
                        .unwrap_or_default();
                    prop_assert_eq!(shown, wanted);
                }
            }
        }
    }
}
