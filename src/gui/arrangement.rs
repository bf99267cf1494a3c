use super::{to_color32, HEADER_BORDER_GRAB_WIDTH, SELECTION_OVERLAY_COLOR};
use crate::data::{Document, PlaybackRegionId, RegionSequenceId, ViewSelection};
use crate::timeline::viewport::SINGLE_STEP;
use crate::timeline::{Modifiers, WheelDelta};
use crate::view::{DocumentView, PlaybackController, RulersContent, RulersLayout, WaveformPreviewProvider};
use egui::{pos2, vec2, Align2, FontId, Rect, Stroke};
use std::time::Instant;

/// egui reports wheel movement in points, the viewport expects notches.
const WHEEL_POINTS_PER_NOTCH: f32 = 14.0 * SINGLE_STEP as f32;

struct Areas {
    rulers: Rect,
    headers: Rect,
    lanes: Rect,
}

fn areas(rect: Rect, view: &DocumentView) -> Areas {
    let borders = view.viewport().viewed_component_borders();
    let left = rect.left() + borders.left as f32;
    let top = rect.top() + borders.top as f32;
    Areas {
        rulers: Rect::from_min_max(pos2(left, rect.top()), pos2(rect.right(), top)),
        headers: Rect::from_min_max(pos2(rect.left(), top), pos2(left, rect.bottom())),
        lanes: Rect::from_min_max(pos2(left, top), rect.max),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Hit {
    Sequence(RegionSequenceId),
    Region(RegionSequenceId, PlaybackRegionId),
}

/// What lies under a point of the lanes, `x` and `y` relative to their top left corner.
pub fn hit_test(view: &DocumentView, x: i32, y: i32) -> Option<Hit> {
    let y = y - view.viewport().content_y();
    let sequence = view
        .coordinator()
        .sequences()
        .find(|s| y >= s.y() && y < s.y() + s.height())?;
    // later regions are painted on top
    let region = sequence
        .regions()
        .filter(|r| r.bounds().is_some_and(|b| x >= b.x && x < b.right()))
        .last();
    Some(match region {
        Some(region) => Hit::Region(sequence.id(), region.id()),
        None => Hit::Sequence(sequence.id()),
    })
}

/// Rulers, track headers and region lanes of a [`DocumentView`]. Clicking a region or a
/// header selects it in the document.
pub struct Model<'a> {
    view: &'a mut DocumentView,
    document: &'a mut Document,
    preview: &'a dyn WaveformPreviewProvider,
    controller: &'a dyn PlaybackController,
}

impl<'a> Model<'a> {
    pub fn new(
        view: &'a mut DocumentView,
        document: &'a mut Document,
        preview: &'a dyn WaveformPreviewProvider,
        controller: &'a dyn PlaybackController,
    ) -> Self {
        Self {
            view,
            document,
            preview,
            controller,
        }
    }

    fn handle_input(&mut self, ui: &egui::Ui, response: &egui::Response, areas: &Areas) {
        let now = Instant::now();
        let (scroll, zoom, modifiers, hover, press_origin) = ui.input(|i| {
            (
                i.scroll_delta,
                i.zoom_delta(),
                i.modifiers,
                i.pointer.hover_pos(),
                i.pointer.press_origin(),
            )
        });

        if self.view.settings().track_headers_visible {
            let border = Rect::from_center_size(
                pos2(areas.headers.right(), areas.headers.center().y),
                vec2(HEADER_BORDER_GRAB_WIDTH, areas.headers.height()),
            );
            let border_response = ui
                .interact(border, response.id.with("header_border"), egui::Sense::drag())
                .on_hover_cursor(egui::CursorIcon::ResizeHorizontal);
            if border_response.dragged() {
                let width = self.view.settings().track_header_width as f32 + border_response.drag_delta().x;
                self.view.set_track_header_width(width.round() as i32);
                return;
            }
        }

        let over_timeline = hover.is_some_and(|p| areas.lanes.contains(p) || areas.rulers.contains(p));
        if response.hovered() && over_timeline {
            if zoom != 1.0 {
                if let Some(pointer) = hover {
                    let x = (pointer.x - response.rect.left()) as i32;
                    self.view.update_viewport(|v| v.mouse_magnify(x, zoom as f64));
                }
            } else if scroll != egui::Vec2::ZERO {
                let wheel = WheelDelta {
                    x: scroll.x / WHEEL_POINTS_PER_NOTCH,
                    y: scroll.y / WHEEL_POINTS_PER_NOTCH,
                };
                let mods = Modifiers {
                    shift: modifiers.shift,
                    alt: modifiers.alt,
                    ctrl: modifiers.ctrl,
                    command: modifiers.mac_cmd,
                };
                self.view.update_viewport(|v| v.mouse_wheel_move(wheel, mods));
            }
        }

        if press_origin.is_some_and(|p| areas.lanes.contains(p)) {
            if response.drag_started() {
                self.view.update_viewport(|v| v.mouse_down());
            }
            if response.dragged() {
                if let (Some(origin), Some(pointer)) = (press_origin, response.interact_pointer_pos()) {
                    let offset = pointer - origin;
                    self.view
                        .update_viewport(|v| v.mouse_drag((offset.x, offset.y), now));
                }
            }
            if response.drag_released() {
                self.view.update_viewport(|v| v.mouse_up(now));
            }
        }
        if self.view.update_viewport(|v| v.update_drag_momentum(now)) {
            ui.ctx().request_repaint();
        }

        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };
        if areas.rulers.contains(pointer) {
            if response.double_clicked() {
                self.view.ruler_double_clicked(self.controller);
            } else if response.clicked() {
                self.view
                    .ruler_clicked((pointer.x - areas.rulers.left()) as i32, self.controller);
            }
        } else if response.clicked() {
            let hit = if areas.lanes.contains(pointer) {
                hit_test(
                    self.view,
                    (pointer.x - areas.lanes.left()) as i32,
                    (pointer.y - areas.lanes.top()) as i32,
                )
            } else if areas.headers.contains(pointer) {
                hit_test(self.view, -1, (pointer.y - areas.headers.top()) as i32)
            } else {
                return;
            };
            let mut selection = ViewSelection {
                time_range: self.document.selection().time_range,
                ..Default::default()
            };
            match hit {
                Some(Hit::Region(_, region)) => selection.playback_regions.push(region),
                Some(Hit::Sequence(sequence)) => selection.region_sequences.push(sequence),
                None => {}
            }
            log::debug!("select {hit:?}");
            self.document.set_selection(selection);
        }
    }

    fn paint_lanes(&mut self, ui: &egui::Ui, painter: &egui::Painter, lanes: Rect) {
        let visuals = ui.visuals();
        let visible = self.view.viewport().visible_range();
        let content_y = self.view.viewport().content_y() as f32;
        let overlay = self.view.selection_overlay(self.document);
        let document = &*self.document;
        let preview = self.preview;

        for sequence in self.view.coordinator_mut().sequences_mut() {
            let top = lanes.top() + content_y + sequence.y() as f32;
            let lane = Rect::from_min_size(pos2(lanes.left(), top), vec2(lanes.width(), sequence.height() as f32));
            painter.line_segment(
                [lane.left_bottom(), lane.right_bottom()],
                visuals.widgets.noninteractive.bg_stroke,
            );
            let Some(host_sequence) = document.region_sequence(sequence.id()) else {
                continue;
            };
            for region in sequence.regions_mut() {
                let Some(bounds) = region.bounds() else {
                    continue;
                };
                let rect = Rect::from_min_size(
                    pos2(lanes.left() + bounds.x as f32, lane.top() + 2.0),
                    vec2(bounds.width.max(1) as f32, (lane.height() - 4.0).max(0.0)),
                );
                let color = to_color32(region.color());
                painter.rect_filled(rect, 3.0, color.linear_multiply(0.35));

                if let Some(host_region) = host_sequence.playback_region(region.id()) {
                    let range = region.time_range();
                    let shown = range.intersection(&visible).shifted(-range.start);
                    let mid = rect.center().y;
                    let half = rect.height() * 0.4;
                    let peaks = region
                        .waveform_mut()
                        .peaks(preview, host_region, shown, bounds.width.max(0) as usize);
                    for (i, peak) in peaks.iter().enumerate() {
                        let x = rect.left() + i as f32 + 0.5;
                        painter.line_segment(
                            [pos2(x, mid - peak.max * half), pos2(x, mid - peak.min * half)],
                            Stroke::new(1.0, color),
                        );
                    }
                }
                if region.is_selected() {
                    painter.rect_stroke(rect, 3.0, Stroke::new(2.0, visuals.strong_text_color()));
                }
                if let Some(name) = region.name() {
                    painter.text(
                        rect.left_top() + vec2(4.0, 2.0),
                        Align2::LEFT_TOP,
                        name,
                        FontId::proportional(11.0),
                        visuals.text_color(),
                    );
                }
            }
        }

        if let Some(span) = overlay {
            let rect = Rect::from_min_max(
                pos2(lanes.left() + span.x as f32, lanes.top()),
                pos2(lanes.left() + span.right() as f32, lanes.bottom()),
            );
            painter.rect_filled(rect, 0.0, SELECTION_OVERLAY_COLOR);
        }
    }

    fn paint_headers(&self, ui: &egui::Ui, painter: &egui::Painter, headers: Rect) {
        if headers.width() <= 0.0 {
            return;
        }
        let visuals = ui.visuals();
        let content_y = self.view.viewport().content_y() as f32;
        for sequence in self.view.coordinator().sequences() {
            let rect = Rect::from_min_size(
                pos2(headers.left(), headers.top() + content_y + sequence.y() as f32),
                vec2(headers.width(), sequence.height() as f32),
            )
            .shrink(1.0);
            let fill = if sequence.is_selected() {
                visuals.selection.bg_fill
            } else {
                visuals.faint_bg_color
            };
            painter.rect_filled(rect, 2.0, fill);
            painter.rect_filled(
                Rect::from_min_size(rect.min, vec2(6.0, rect.height())),
                0.0,
                to_color32(sequence.color()),
            );
            painter.text(
                rect.left_top() + vec2(10.0, 4.0),
                Align2::LEFT_TOP,
                sequence.name().unwrap_or("(unnamed)"),
                FontId::proportional(13.0),
                visuals.text_color(),
            );
        }
    }
}

fn paint_rulers(ui: &egui::Ui, painter: &egui::Painter, rect: Rect, layout: &RulersLayout) {
    let visuals = ui.visuals();
    painter.rect_filled(rect, 0.0, visuals.extreme_bg_color);
    match &layout.content {
        RulersContent::Placeholder(text) => {
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                *text,
                FontId::proportional(14.0),
                visuals.warn_fg_color,
            );
        }
        RulersContent::Rulers {
            seconds,
            beats,
            chords,
        } => {
            let band = layout.bands.chords;
            for chord in chords {
                let segment = Rect::from_min_max(
                    pos2(rect.left() + chord.x as f32, rect.top() + band.y as f32),
                    pos2(rect.left() + chord.right as f32, rect.top() + (band.y + band.height) as f32),
                );
                let [r, g, b] = chord.color;
                painter.rect_filled(segment.shrink(0.5), 2.0, egui::Color32::from_rgb(r, g, b));
                painter.text(
                    segment.left_center() + vec2(4.0, 0.0),
                    Align2::LEFT_CENTER,
                    &chord.name,
                    FontId::proportional(11.0),
                    egui::Color32::BLACK,
                );
            }
            for tick in beats.iter().chain(seconds) {
                painter.rect_filled(
                    Rect::from_min_size(
                        pos2(rect.left() + tick.x as f32, rect.top() + tick.y as f32),
                        vec2(tick.width as f32, tick.height as f32),
                    ),
                    0.0,
                    visuals.text_color(),
                );
            }
        }
    }
}

impl<'a> egui::Widget for Model<'a> {
    fn ui(mut self, ui: &mut egui::Ui) -> egui::Response {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        self.view.set_size(rect.width() as i32, rect.height() as i32);
        let input_areas = areas(rect, self.view);
        self.handle_input(ui, &response, &input_areas);

        // input may have resized the headers
        let areas = areas(rect, self.view);
        self.paint_lanes(ui, &painter.with_clip_rect(areas.lanes), areas.lanes);
        self.paint_headers(ui, &painter.with_clip_rect(areas.headers), areas.headers);
        paint_rulers(ui, &painter.with_clip_rect(areas.rulers), areas.rulers, &self.view.rulers());

        let x = areas.lanes.left() + self.view.play_head_x() as f32;
        if x >= areas.lanes.left() && x <= areas.lanes.right() {
            painter.line_segment(
                [pos2(x, rect.top()), pos2(x, rect.bottom())],
                Stroke::new(1.0, ui.visuals().strong_text_color()),
            );
        }
        response
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::settings::ViewSettings;
    use crate::transport::PlayHead;

    #[test]
    fn hit_test_finds_regions_and_tracks() {
        let (play_head, _writer) = PlayHead::new();
        let mut document = Document::demo();
        let mut view = DocumentView::new(ViewSettings::default(), play_head);
        view.set_size(1200, 600);
        view.attach(&mut document);

        // region 1 spans 2..10 s, i.e. x 100..900 on the first 80 px lane
        assert_eq!(
            hit_test(&view, 150, 10),
            Some(Hit::Region(RegionSequenceId(1), PlaybackRegionId(1)))
        );
        assert_eq!(hit_test(&view, 50, 10), Some(Hit::Sequence(RegionSequenceId(1))));
        assert_eq!(hit_test(&view, 150, 90), Some(Hit::Sequence(RegionSequenceId(2))));
        assert_eq!(
            hit_test(&view, 300, 90),
            Some(Hit::Region(RegionSequenceId(2), PlaybackRegionId(4)))
        );
        assert_eq!(hit_test(&view, 10, 500), None);
    }
}
