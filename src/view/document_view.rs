//! The arrangement as a whole: rulers on top, track headers on the left and the region
//! lanes in the scrolled area. Ties the viewport, the view-models and the musical context
//! together and reports what changed as [`ViewNotification`]s.

use super::coordinator::{Changes, DocumentViewCoordinator};
use super::playback::PlaybackController;
use super::ruler::{layout_rulers, RulersLayout};
use super::status::{format_musical_position, format_timecode};
use crate::data::Document;
use crate::musical::MusicalContextAdapter;
use crate::settings::{
    ViewSettings, RULERS_HEIGHT_MAX, RULERS_HEIGHT_MIN, TRACK_HEADER_WIDTH_MAX, TRACK_HEADER_WIDTH_MIN,
    TRACK_HEIGHT_MAX, TRACK_HEIGHT_MIN,
};
use crate::timeline::{Borders, PixelSpan, SecondsPixelMapper, TimeRange, TimelineViewport};
use crate::transport::PlayHead;
use std::sync::Arc;

/// Told to whoever embeds the view, e.g. to persist settings.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewNotification {
    /// The visible range and the pixels per second showing it.
    VisibleTimeRangeChanged(TimeRange, f64),
    TrackHeightChanged(i32),
    RulersHeightChanged(i32),
}

pub struct DocumentView {
    viewport: TimelineViewport<SecondsPixelMapper>,
    coordinator: DocumentViewCoordinator,
    adapter: MusicalContextAdapter,
    settings: ViewSettings,
    play_head: Arc<PlayHead>,
    last_reported_position: f64,
    laid_out: bool,
    notifications: Vec<ViewNotification>,
}

impl DocumentView {
    pub fn new(settings: ViewSettings, play_head: Arc<PlayHead>) -> Self {
        let mut viewport = TimelineViewport::new(SecondsPixelMapper::new());
        viewport.set_scroll_on_drag_enabled(true);
        Self {
            viewport,
            coordinator: DocumentViewCoordinator::new(settings.show_only_selected),
            adapter: MusicalContextAdapter::new(),
            settings,
            play_head,
            last_reported_position: 0.0,
            laid_out: false,
            notifications: vec![],
        }
    }

    pub fn attach(&mut self, document: &mut Document) {
        // anything queued so far is already reflected by the initial build
        document.drain_events();
        self.adapter.find_musical_context(document);
        self.coordinator.attach(document);
        self.layout();
    }

    pub fn detach(&mut self) {
        self.coordinator.detach();
    }

    /// Feeds every queued host notification to the musical context and the view-models,
    /// then lays out whatever they changed. Returns true when a repaint is due.
    pub fn handle_document_events(&mut self, document: &mut Document) -> bool {
        let events = document.drain_events();
        if events.is_empty() {
            return false;
        }
        let mut changes = Changes::default();
        for event in &events {
            log::trace!("document event {event:?}");
            changes.repaint |= self.adapter.handle_event(document, event);
            changes.merge(self.coordinator.handle_event(document, event));
        }
        self.apply(&changes);
        changes.repaint || !changes.is_empty()
    }

    fn apply(&mut self, changes: &Changes) {
        if changes.rebuilt || changes.time_range_changed || changes.layout_all {
            self.layout();
        } else {
            for id in &changes.regions {
                self.coordinator.update_region_bounds(*id, &self.viewport);
            }
        }
    }

    fn borders(&self) -> Borders {
        Borders {
            top: self.settings.rulers_height,
            left: if self.settings.track_headers_visible {
                self.settings.track_header_width
            } else {
                0
            },
            ..Default::default()
        }
    }

    /// Full layout pass. The play head keeps its horizontal position on screen.
    fn layout(&mut self) {
        if !self.coordinator.is_attached() {
            return;
        }
        let previous_play_head_x = self.play_head_x();

        self.viewport.set_viewed_component_borders(self.borders());
        self.viewport.set_timeline_range(self.coordinator.time_range());
        let content_height = self.coordinator.layout_tracks(self.settings.track_height);
        self.viewport.set_content_height(content_height);

        if self.viewport.width_excluding_borders() > 0 {
            let zoom = self.viewport.constrain_zoom_factor(self.settings.zoom_factor);
            self.viewport.set_zoom_factor(zoom);
            let start = if self.laid_out {
                self.last_reported_position - previous_play_head_x as f64 / zoom
            } else {
                self.viewport.timeline_range().start
            };
            self.viewport.scroll_to(start);
            self.laid_out = true;
        }
        self.viewport_changed();
    }

    /// To be called after the viewport was moved directly, e.g. by input.
    pub fn viewport_changed(&mut self) {
        self.coordinator.update_all_region_bounds(&self.viewport);
        if let Some(range) = self.viewport.take_visible_range_change() {
            let zoom = self.viewport.zoom_factor();
            self.settings.zoom_factor = zoom;
            self.notifications
                .push(ViewNotification::VisibleTimeRangeChanged(range, zoom));
        }
    }

    /// Runs `f` on the viewport and updates everything depending on it.
    pub fn update_viewport<R>(&mut self, f: impl FnOnce(&mut TimelineViewport<SecondsPixelMapper>) -> R) -> R {
        let result = f(&mut self.viewport);
        let zoom = self.viewport.zoom_factor();
        let constrained = self.viewport.constrain_zoom_factor(zoom);
        if constrained != zoom {
            let anchor = self.viewport.visible_range().start;
            self.viewport.set_zoom_factor_around_position(constrained, anchor);
            self.viewport.scroll_to(self.viewport.scroll_start());
        }
        self.viewport_changed();
        result
    }

    /// Whole size of the view including rulers and headers.
    pub fn set_size(&mut self, width: i32, height: i32) {
        if self.viewport.width() != width || self.viewport.height() != height {
            self.viewport.set_size(width, height);
            self.layout();
        }
    }

    /// Multiplies the zoom, keeping the play head in place when it is visible and the
    /// left edge otherwise.
    pub fn zoom_by(&mut self, factor: f64) {
        let zoom = self.viewport.constrain_zoom_factor(self.viewport.zoom_factor() * factor);
        let visible = self.viewport.visible_range();
        let anchor = if is_within(&visible, self.last_reported_position) {
            self.last_reported_position
        } else {
            visible.start
        };
        self.viewport.set_zoom_factor_around_position(zoom, anchor);
        self.viewport.scroll_to(self.viewport.scroll_start());
        self.viewport_changed();
    }

    pub fn set_track_height(&mut self, height: i32) {
        let height = height.clamp(TRACK_HEIGHT_MIN, TRACK_HEIGHT_MAX);
        if height != self.settings.track_height {
            self.settings.track_height = height;
            self.notifications.push(ViewNotification::TrackHeightChanged(height));
            self.layout();
        }
    }

    pub fn set_rulers_height(&mut self, height: i32) {
        let height = height.clamp(RULERS_HEIGHT_MIN, RULERS_HEIGHT_MAX);
        if height != self.settings.rulers_height {
            self.settings.rulers_height = height;
            self.notifications.push(ViewNotification::RulersHeightChanged(height));
            self.layout();
        }
    }

    pub fn set_track_header_width(&mut self, width: i32) {
        let width = width.clamp(TRACK_HEADER_WIDTH_MIN, TRACK_HEADER_WIDTH_MAX);
        if width != self.settings.track_header_width {
            self.settings.track_header_width = width;
            self.layout();
        }
    }

    pub fn set_track_headers_visible(&mut self, visible: bool) {
        if visible != self.settings.track_headers_visible {
            self.settings.track_headers_visible = visible;
            self.layout();
        }
    }

    pub fn set_show_only_selected(&mut self, document: &Document, show_only_selected: bool) {
        self.settings.show_only_selected = show_only_selected;
        let changes = self.coordinator.set_show_only_selected(document, show_only_selected);
        self.apply(&changes);
    }

    pub fn set_scroll_follows_play_head(&mut self, follow: bool) {
        self.settings.scroll_follows_playhead = follow;
    }

    /// Picks up the host's play head position. Returns true when it moved.
    pub fn poll_play_head(&mut self) -> bool {
        let position = self.play_head.read().time_in_seconds;
        if position == self.last_reported_position {
            return false;
        }
        self.last_reported_position = position;
        if self.settings.scroll_follows_playhead && !is_within(&self.viewport.visible_range(), position) {
            self.viewport.scroll_to(position);
            self.viewport_changed();
        }
        true
    }

    pub fn play_head_position(&self) -> f64 {
        self.last_reported_position
    }

    /// Play head x relative to the region area.
    pub fn play_head_x(&self) -> i32 {
        self.viewport.pixel_for_position(self.last_reported_position)
    }

    /// Bounds of the selected time range, relative to the region area.
    pub fn selection_overlay(&self, document: &Document) -> Option<PixelSpan> {
        let range = document.selection().time_range?;
        if range.is_empty() {
            return None;
        }
        let x = self.viewport.pixel_for_position(range.start);
        Some(PixelSpan {
            x,
            width: self.viewport.pixel_for_position(range.end) - x,
        })
    }

    /// `x` is relative to the rulers' left edge.
    pub fn ruler_clicked(&self, x: i32, controller: &dyn PlaybackController) {
        let time = self.viewport.position_for_pixel(x);
        log::debug!("ruler click at {time:.3}s");
        controller.request_set_playback_position(time);
    }

    pub fn ruler_double_clicked(&self, controller: &dyn PlaybackController) {
        controller.request_start_playback();
    }

    pub fn rulers(&self) -> RulersLayout {
        layout_rulers(
            &self.viewport,
            &self.adapter,
            self.viewport.width_excluding_borders(),
            self.settings.rulers_height,
        )
    }

    /// Timecode and, with a tempo map, the musical position of the play head.
    pub fn position_text(&self) -> (String, Option<String>) {
        let time = self.last_reported_position;
        (format_timecode(time), format_musical_position(&self.adapter, time))
    }

    pub fn take_notifications(&mut self) -> Vec<ViewNotification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }
    pub fn viewport(&self) -> &TimelineViewport<SecondsPixelMapper> {
        &self.viewport
    }
    pub fn coordinator(&self) -> &DocumentViewCoordinator {
        &self.coordinator
    }
    pub fn coordinator_mut(&mut self) -> &mut DocumentViewCoordinator {
        &mut self.coordinator
    }
    pub fn adapter(&self) -> &MusicalContextAdapter {
        &self.adapter
    }
}

fn is_within(range: &TimeRange, position: f64) -> bool {
    position >= range.start && position <= range.end
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{PlaybackRegion, PlaybackRegionId, RegionSequenceId, ViewSelection};
    use crate::transport::{PlayHeadState, PlayHeadWriter};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingController {
        requests: RefCell<Vec<String>>,
    }

    impl PlaybackController for RecordingController {
        fn request_set_playback_position(&self, time_in_seconds: f64) {
            self.requests.borrow_mut().push(format!("position {time_in_seconds}"));
        }
        fn request_start_playback(&self) {
            self.requests.borrow_mut().push("start".to_string());
        }
        fn request_stop_playback(&self) {
            self.requests.borrow_mut().push("stop".to_string());
        }
    }

    fn attached_view() -> (DocumentView, Document, PlayHeadWriter) {
        let (play_head, writer) = PlayHead::new();
        let mut document = Document::demo();
        let mut view = DocumentView::new(ViewSettings::default(), play_head);
        view.set_size(1200, 600);
        view.attach(&mut document);
        (view, document, writer)
    }

    fn move_play_head(writer: &mut PlayHeadWriter, time: f64) {
        writer.write(PlayHeadState {
            time_in_seconds: time,
            is_playing: false,
        });
    }

    #[test]
    fn initial_layout() {
        let (view, _, _) = attached_view();
        assert_eq!(view.coordinator().sequence_count(), 3);
        assert_eq!(view.viewport().timeline_range(), TimeRange::new(1.0, 40.0));
        assert_eq!(view.viewport().zoom_factor(), 100.0);
        assert_eq!(view.viewport().width_excluding_borders(), 1080);
        assert_eq!(view.viewport().visible_range(), TimeRange::new(1.0, 11.8));
        assert_eq!(view.viewport().content_height(), 540);
        let first = view.coordinator().region(PlaybackRegionId(1)).unwrap();
        assert_eq!(first.bounds(), Some(PixelSpan { x: 100, width: 800 }));
        assert!(view.adapter().can_tempo_map());
    }

    #[test]
    fn zoom_keeps_play_head_in_place() {
        let (mut view, _, mut writer) = attached_view();
        move_play_head(&mut writer, 5.0);
        assert!(view.poll_play_head());
        assert!(!view.poll_play_head());
        assert_eq!(view.play_head_x(), 400);
        view.take_notifications();

        view.zoom_by(2.0);
        assert_eq!(view.viewport().zoom_factor(), 200.0);
        assert_eq!(view.play_head_x(), 400);
        assert_eq!(view.settings().zoom_factor, 200.0);
        assert!(matches!(
            view.take_notifications().as_slice(),
            [ViewNotification::VisibleTimeRangeChanged(_, zoom)] if *zoom == 200.0
        ));
    }

    #[test]
    fn zoom_out_stops_at_whole_timeline() {
        let (mut view, _, _) = attached_view();
        view.zoom_by(0.001);
        let zoom = view.viewport().zoom_factor();
        assert!((zoom - 1080.0 / 39.0).abs() < 1e-9);
        let visible = view.viewport().visible_range();
        assert_eq!(visible.start, 1.0);
        assert!((visible.end - 40.0).abs() < 1e-9);
    }

    #[test]
    fn scroll_follows_play_head() {
        let (mut view, _, mut writer) = attached_view();
        move_play_head(&mut writer, 30.0);
        assert!(view.poll_play_head());
        let visible = view.viewport().visible_range();
        assert!(visible.start <= 30.0 && 30.0 <= visible.end);

        view.set_scroll_follows_play_head(false);
        move_play_head(&mut writer, 2.0);
        assert!(view.poll_play_head());
        assert_eq!(view.viewport().visible_range(), visible);
    }

    #[test]
    fn play_head_stable_across_relayout() {
        let (mut view, _, mut writer) = attached_view();
        move_play_head(&mut writer, 6.0);
        view.poll_play_head();
        let x = view.play_head_x();
        view.set_size(1000, 600);
        assert_eq!(view.play_head_x(), x);
    }

    #[test]
    fn track_and_ruler_sizes_are_clamped() {
        let (mut view, _, _) = attached_view();
        view.take_notifications();
        view.set_track_height(1000);
        assert_eq!(view.settings().track_height, TRACK_HEIGHT_MAX);
        assert_eq!(view.viewport().content_height(), 3 * TRACK_HEIGHT_MAX);
        view.set_rulers_height(0);
        assert_eq!(view.viewport().viewed_component_borders().top, RULERS_HEIGHT_MIN);
        assert_eq!(
            view.take_notifications(),
            vec![
                ViewNotification::TrackHeightChanged(TRACK_HEIGHT_MAX),
                ViewNotification::RulersHeightChanged(RULERS_HEIGHT_MIN),
            ]
        );
        view.set_track_headers_visible(false);
        assert_eq!(view.viewport().width_excluding_borders(), 1200);
        view.set_track_header_width(1);
        assert_eq!(view.settings().track_header_width, TRACK_HEADER_WIDTH_MIN);
    }

    #[test]
    fn ruler_clicks_request_playback() {
        let (view, _, _) = attached_view();
        let controller = RecordingController::default();
        view.ruler_clicked(250, &controller);
        view.ruler_double_clicked(&controller);
        assert_eq!(*controller.requests.borrow(), vec!["position 3.5", "start"]);
    }

    #[test]
    fn selection_overlay_follows_selection() {
        let (mut view, mut document, _) = attached_view();
        assert_eq!(view.selection_overlay(&document), None);
        document.set_selection(ViewSelection {
            time_range: Some(TimeRange::new(2.0, 4.0)),
            ..Default::default()
        });
        assert!(view.handle_document_events(&mut document));
        assert_eq!(
            view.selection_overlay(&document),
            Some(PixelSpan { x: 100, width: 200 })
        );
    }

    #[test]
    fn document_growth_extends_timeline() {
        let (mut view, mut document, _) = attached_view();
        document.begin_editing();
        document.add_playback_region(
            RegionSequenceId(1),
            PlaybackRegion::new(PlaybackRegionId(100), 60.0, 5.0),
        );
        document.end_editing();
        assert!(view.handle_document_events(&mut document));
        assert_eq!(view.viewport().timeline_range(), TimeRange::new(1.0, 66.0));
        assert_eq!(view.coordinator().rebuild_count(), 2);
        // outside the visible range
        assert!(!view.coordinator().region(PlaybackRegionId(100)).unwrap().is_visible());
    }

    #[test]
    fn show_only_selected() {
        let (mut view, mut document, _) = attached_view();
        document.set_selection(ViewSelection {
            region_sequences: vec![RegionSequenceId(2)],
            ..Default::default()
        });
        view.handle_document_events(&mut document);
        view.set_show_only_selected(&document, true);
        assert_eq!(view.coordinator().sequence_ids(), vec![RegionSequenceId(2)]);
        assert!(view.settings().show_only_selected);
        assert_eq!(view.viewport().content_height(), 540);
    }

    #[test]
    fn position_text() {
        let (mut view, _, mut writer) = attached_view();
        move_play_head(&mut writer, 2.25);
        view.poll_play_head();
        let (timecode, musical) = view.position_text();
        assert_eq!(timecode, "00h:00m:02s.250ms");
        assert_eq!(musical.as_deref(), Some("bar 2 | beat 1 | tick 481"));
    }
}
