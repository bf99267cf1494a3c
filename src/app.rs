use crate::data::{Document, LaunchArg};
use crate::gui;
use crate::settings::{JsonFileStore, MemoryStore, SettingsStore, ViewSettings};
use crate::transport::{spawn_host_transport, PlayHead, TransportController};
use crate::view::{DocumentView, SyntheticPreview, ViewNotification};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

extern crate eframe;

/// Stands in for the host's 60 Hz play head timer.
const PLAY_HEAD_POLL_INTERVAL: Duration = Duration::from_millis(16);

pub struct Model {
    document: Document,
    view: DocumentView,
    play_head: Arc<PlayHead>,
    transport: TransportController,
    host: Option<JoinHandle<()>>,
    settings: Box<dyn SettingsStore>,
    preview: SyntheticPreview,
    log_open: bool,
}

fn load_document(arg: &LaunchArg) -> Document {
    let Some(path) = &arg.file else {
        return Document::demo();
    };
    match Document::load(path) {
        Ok(document) => {
            log::info!("opened {}", path.display());
            document
        }
        Err(e) => {
            log::error!("failed to open {}: {e}, showing the demo instead", path.display());
            Document::demo()
        }
    }
}

fn open_settings(arg: &LaunchArg) -> Box<dyn SettingsStore> {
    let Some(dir) = &arg.config_dir else {
        log::warn!("no config directory, settings are not kept");
        return Box::new(MemoryStore::new());
    };
    match JsonFileStore::open(dir) {
        Ok(store) => Box::new(store),
        Err(e) => {
            log::error!("failed to read settings in {}: {e}", dir.display());
            Box::new(MemoryStore::new())
        }
    }
}

impl Model {
    pub fn new(_cc: &eframe::CreationContext<'_>, arg: LaunchArg) -> Self {
        let mut document = load_document(&arg);
        let settings = open_settings(&arg);
        let mut view_settings = ViewSettings::load(settings.as_ref());
        if arg.show_all {
            view_settings.show_only_selected = false;
        }

        let (play_head, writer) = PlayHead::new();
        let (transport, host) = spawn_host_transport(writer);
        let mut view = DocumentView::new(view_settings, Arc::clone(&play_head));
        view.attach(&mut document);

        Self {
            document,
            view,
            play_head,
            transport,
            host: Some(host),
            settings,
            preview: SyntheticPreview::default(),
            log_open: false,
        }
    }

    fn persist_settings(&mut self) {
        self.view.settings().save(self.settings.as_mut());
        if let Err(e) = self.settings.flush() {
            log::error!("failed to write settings: {e}");
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        use crate::view::PlaybackController;
        let shortcut = |modifiers: egui::Modifiers, key: egui::Key| {
            ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(modifiers, key)))
        };
        if shortcut(egui::Modifiers::NONE, egui::Key::Space) {
            if self.play_head.read().is_playing {
                self.transport.request_stop_playback();
            } else {
                self.transport.request_start_playback();
            }
        }
        if shortcut(egui::Modifiers::NONE, egui::Key::ArrowLeft) {
            self.transport.request_set_playback_position(0.0);
        }
        if shortcut(egui::Modifiers::COMMAND, egui::Key::PlusEquals) {
            self.view.zoom_by(2.0);
        }
        if shortcut(egui::Modifiers::COMMAND, egui::Key::Minus) {
            self.view.zoom_by(0.5);
        }
    }

    fn header_ui(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(format!("arrangement-view: {}", self.document.name));
            ui.separator();
            let settings = self.view.settings().clone();

            let mut follow = settings.scroll_follows_playhead;
            if ui.checkbox(&mut follow, "follow play head").changed() {
                self.view.set_scroll_follows_play_head(follow);
                self.persist_settings();
            }
            let mut headers = settings.track_headers_visible;
            if ui.checkbox(&mut headers, "track headers").changed() {
                self.view.set_track_headers_visible(headers);
                self.persist_settings();
            }
            let mut selected_only = settings.show_only_selected;
            if ui.checkbox(&mut selected_only, "selected tracks only").changed() {
                self.view.set_show_only_selected(&self.document, selected_only);
                self.persist_settings();
            }
            ui.separator();
            let mut track_height = settings.track_height;
            let response = ui.add(
                egui::Slider::new(
                    &mut track_height,
                    crate::settings::TRACK_HEIGHT_MIN..=crate::settings::TRACK_HEIGHT_MAX,
                )
                .text("track height"),
            );
            if response.changed() {
                self.view.set_track_height(track_height);
            }
            let mut rulers_height = settings.rulers_height;
            let response = ui.add(
                egui::Slider::new(
                    &mut rulers_height,
                    crate::settings::RULERS_HEIGHT_MIN..=crate::settings::RULERS_HEIGHT_MAX,
                )
                .text("rulers"),
            );
            if response.changed() {
                self.view.set_rulers_height(rulers_height);
            }
            ui.separator();
            if ui.button("−").clicked() {
                self.view.zoom_by(0.5);
            }
            if ui.button("+").clicked() {
                self.view.zoom_by(2.0);
            }
            ui.separator();
            ui.toggle_value(&mut self.log_open, "log");
        });
    }
}

impl eframe::App for Model {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);
        self.view.handle_document_events(&mut self.document);
        self.view.poll_play_head();

        egui::panel::TopBottomPanel::top("header").show(ctx, |ui| self.header_ui(ui));
        egui::panel::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.add(gui::transport::Model::new(
                &self.view,
                self.play_head.read().is_playing,
                &self.transport,
            ))
        });
        let _panel = egui::panel::SidePanel::right("log")
            .default_width(400.)
            .max_width(1920.)
            .resizable(true)
            .show_animated(ctx, self.log_open, |ui| ui.add(gui::log_panel::Model));
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add(gui::arrangement::Model::new(
                &mut self.view,
                &mut self.document,
                &self.preview,
                &self.transport,
            ))
        });

        let notifications = self.view.take_notifications();
        for notification in &notifications {
            log::trace!("{notification:?}");
        }
        // zoom changes arrive continuously while scrolling, sizes only on release
        if notifications
            .iter()
            .any(|n| !matches!(n, ViewNotification::VisibleTimeRangeChanged(..)))
            || ctx.input(|i| i.pointer.any_released())
        {
            self.persist_settings();
        }

        ctx.request_repaint_after(PLAY_HEAD_POLL_INTERVAL);
    }
}

impl Drop for Model {
    fn drop(&mut self) {
        self.persist_settings();
        self.transport.quit();
        if let Some(host) = self.host.take() {
            if host.join().is_err() {
                log::error!("host transport thread panicked");
            }
        }
    }
}
