//! Persisted UI preferences.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "settings.json";

pub const ZOOM_FACTOR_DEFAULT: f64 = 100.0;

pub const TRACK_HEIGHT_DEFAULT: i32 = 80;
pub const TRACK_HEIGHT_MIN: i32 = 20;
pub const TRACK_HEIGHT_MAX: i32 = 400;

pub const RULERS_HEIGHT_DEFAULT: i32 = 60;
pub const RULERS_HEIGHT_MIN: i32 = 30;
pub const RULERS_HEIGHT_MAX: i32 = 150;

pub const TRACK_HEADER_WIDTH_DEFAULT: i32 = 120;
pub const TRACK_HEADER_WIDTH_MIN: i32 = 60;
pub const TRACK_HEADER_WIDTH_MAX: i32 = 400;

pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
    /// Makes the values set so far durable.
    fn flush(&mut self) -> Result<()>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A JSON object in `settings.json`, read once on open and rewritten on flush.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Map<String, Value>,
    dirty: bool,
}

impl JsonFileStore {
    /// A missing file is an empty store. A file that is not a JSON object is an error.
    pub fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE_NAME);
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no settings at {}, using defaults", path.display());
                Map::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }
    fn set(&mut self, key: &str, value: Value) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
    }
    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, text)?;
        log::debug!("settings written to {}", self.path.display());
        self.dirty = false;
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewSettings {
    /// Pixels per second last used.
    pub zoom_factor: f64,
    pub track_height: i32,
    pub track_header_width: i32,
    pub track_headers_visible: bool,
    pub show_only_selected: bool,
    pub scroll_follows_playhead: bool,
    pub rulers_height: i32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            zoom_factor: ZOOM_FACTOR_DEFAULT,
            track_height: TRACK_HEIGHT_DEFAULT,
            track_header_width: TRACK_HEADER_WIDTH_DEFAULT,
            track_headers_visible: true,
            show_only_selected: false,
            scroll_follows_playhead: true,
            rulers_height: RULERS_HEIGHT_DEFAULT,
        }
    }
}

fn read_or<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str, default: T) -> T {
    match store.get(key) {
        None => {
            log::debug!("setting {key} not stored, using default");
            default
        }
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("setting {key} is unreadable ({e}), using default");
            default
        }),
    }
}

fn clamp_logged(key: &str, value: i32, min: i32, max: i32) -> i32 {
    let clamped = value.clamp(min, max);
    if clamped != value {
        log::warn!("setting {key}={value} out of range, clamped to {clamped}");
    }
    clamped
}

fn write<T: Serialize>(store: &mut dyn SettingsStore, key: &str, value: T) {
    match serde_json::to_value(value) {
        Ok(value) => store.set(key, value),
        Err(e) => log::error!("failed to serialize setting {key}: {e}"),
    }
}

impl ViewSettings {
    pub fn load(store: &dyn SettingsStore) -> Self {
        let d = Self::default();
        let zoom_factor = read_or(store, "zoom_factor", d.zoom_factor);
        let zoom_factor = if zoom_factor.is_finite() && zoom_factor > 0.0 {
            zoom_factor
        } else {
            log::warn!("setting zoom_factor={zoom_factor} is not a usable zoom, using default");
            d.zoom_factor
        };
        Self {
            zoom_factor,
            track_height: clamp_logged(
                "track_height",
                read_or(store, "track_height", d.track_height),
                TRACK_HEIGHT_MIN,
                TRACK_HEIGHT_MAX,
            ),
            track_header_width: clamp_logged(
                "track_header_width",
                read_or(store, "track_header_width", d.track_header_width),
                TRACK_HEADER_WIDTH_MIN,
                TRACK_HEADER_WIDTH_MAX,
            ),
            track_headers_visible: read_or(store, "track_headers_visible", d.track_headers_visible),
            show_only_selected: read_or(store, "show_only_selected", d.show_only_selected),
            scroll_follows_playhead: read_or(store, "scroll_follows_playhead", d.scroll_follows_playhead),
            rulers_height: clamp_logged(
                "rulers_height",
                read_or(store, "rulers_height", d.rulers_height),
                RULERS_HEIGHT_MIN,
                RULERS_HEIGHT_MAX,
            ),
        }
    }

    pub fn save(&self, store: &mut dyn SettingsStore) {
        write(store, "zoom_factor", self.zoom_factor);
        write(store, "track_height", self.track_height);
        write(store, "track_header_width", self.track_header_width);
        write(store, "track_headers_visible", self.track_headers_visible);
        write(store, "show_only_selected", self.show_only_selected);
        write(store, "scroll_follows_playhead", self.scroll_follows_playhead);
        write(store, "rulers_height", self.rulers_height);
    }
}
