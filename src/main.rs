use arrangement_view::cli::{Args, Parser};
use arrangement_view::data::LaunchArg;
use arrangement_view::{app, utils::logger};

fn main() -> Result<(), eframe::Error> {
    let arg: LaunchArg = Args::parse().into();
    logger::init(arg.log_level_filter());
    log::info!("starting with {arg:?}");

    let mut native_options = eframe::NativeOptions::default();
    native_options.initial_window_size = Some(egui::vec2(1200., 900.));
    eframe::run_native(
        "arrangement-view",
        native_options,
        Box::new(|cc| Box::new(app::Model::new(cc, arg))),
    )
}
