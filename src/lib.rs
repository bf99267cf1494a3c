//! Arrangement view of a host document: tracks and regions on a zoomable timeline with
//! seconds, beats and chords rulers.
//!

extern crate eframe;
extern crate egui;
extern crate serde_json;

pub mod app;
#[cfg(not(target_arch = "wasm32"))]
pub mod cli;
pub mod data;
pub mod error;
pub mod gui;
pub mod musical;
pub mod settings;
pub mod timeline;
pub mod transport;
pub mod utils;
pub mod view;
