//! Painting and input routing for the document view.
//! Currently implemented on [`egui`].

use crate::data::Color;

pub mod arrangement;
pub mod log_panel;
pub mod transport;

/// Region and track color when the document has none.
pub(crate) const DEFAULT_REGION_COLOR: egui::Color32 = egui::Color32::from_rgb(120, 120, 130);
pub(crate) const SELECTION_OVERLAY_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(51, 51, 0, 51);
/// Width of the grab area between the track headers and the lanes.
pub(crate) const HEADER_BORDER_GRAB_WIDTH: f32 = 6.0;

fn to_color32(color: Option<Color>) -> egui::Color32 {
    match color {
        Some(color) => {
            let [r, g, b] = color.to_rgb8();
            egui::Color32::from_rgb(r, g, b)
        }
        None => DEFAULT_REGION_COLOR,
    }
}
