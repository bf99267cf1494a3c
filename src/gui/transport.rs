use crate::view::{DocumentView, PlaybackController};

/// Play/stop and the play head position as timecode and bars.
pub struct Model<'a> {
    view: &'a DocumentView,
    is_playing: bool,
    controller: &'a dyn PlaybackController,
}

impl<'a> Model<'a> {
    pub fn new(view: &'a DocumentView, is_playing: bool, controller: &'a dyn PlaybackController) -> Self {
        Self {
            view,
            is_playing,
            controller,
        }
    }
}

impl<'a> egui::Widget for Model<'a> {
    fn ui(self, ui: &mut egui::Ui) -> egui::Response {
        ui.horizontal(|ui| {
            let text = if self.is_playing { "■" } else { "▶" };
            if ui.button(text).clicked() {
                if self.is_playing {
                    self.controller.request_stop_playback();
                } else {
                    self.controller.request_start_playback();
                }
            }
            if ui.button("|◀").clicked() {
                self.controller.request_set_playback_position(0.0);
            }
            let (timecode, musical) = self.view.position_text();
            ui.monospace(timecode);
            if let Some(musical) = musical {
                ui.separator();
                ui.monospace(musical);
            }
        })
        .response
    }
}
