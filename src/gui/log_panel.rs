use crate::utils::logger::{Logger, GLOBAL_LOGGER};

/// Recent log lines, newest on top.
pub struct Model;

impl egui::Widget for Model {
    fn ui(self, ui: &mut egui::Ui) -> egui::Response {
        ui.vertical(|ui| {
            let Some(logger) = GLOBAL_LOGGER.get() else {
                ui.label("logging is not set up");
                return;
            };
            ui.horizontal(|ui| {
                ui.label("Log");
                if ui.button("clear").clicked() {
                    log::logger().flush();
                }
            });
            egui::ScrollArea::vertical().show(ui, |ui| {
                for (line, level) in logger.lines() {
                    ui.colored_label(Logger::get_color(level), line);
                }
            });
        })
        .response
    }
}
