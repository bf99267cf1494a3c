//! The host document and the notifications it sends.
//! Serialized to json with serde so documents can be loaded from files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod document;
pub mod event;
pub mod musical_context;

pub use document::{Document, PlaybackRegion, RegionSequence, ViewSelection};
pub use event::{ContentUpdateScopes, DocumentEvent};
pub use musical_context::{MusicalContent, MusicalContext};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct RegionSequenceId(pub u64);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct PlaybackRegionId(pub u64);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MusicalContextId(pub u64);

/// Linear RGB in `0.0..=1.0`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
    pub fn to_rgb8(self) -> [u8; 3] {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [c(self.r), c(self.g), c(self.b)]
    }
}

/// What the binary was started with.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchArg {
    /// Document to show, the built-in demo when `None`.
    pub file: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    /// 1:trace 2:info 3:warn 4:error 5:off
    pub log_level: u8,
    pub show_all: bool,
}

impl Default for LaunchArg {
    fn default() -> Self {
        Self {
            file: None,
            config_dir: default_config_dir(),
            log_level: 3,
            show_all: false,
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn default_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("arrangement-view"))
}

#[cfg(target_arch = "wasm32")]
fn default_config_dir() -> Option<PathBuf> {
    None
}

impl LaunchArg {
    pub fn log_level_filter(&self) -> log::LevelFilter {
        match self.log_level {
            0 | 1 => log::LevelFilter::Trace,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Warn,
            4 => log::LevelFilter::Error,
            _ => log::LevelFilter::Off,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&RegionSequenceId(3)).unwrap(), "3");
        let id: PlaybackRegionId = serde_json::from_str("12").unwrap();
        assert_eq!(id, PlaybackRegionId(12));
    }

    #[test]
    fn log_levels() {
        let mut arg = LaunchArg::default();
        assert_eq!(arg.log_level_filter(), log::LevelFilter::Warn);
        arg.log_level = 1;
        assert_eq!(arg.log_level_filter(), log::LevelFilter::Trace);
        arg.log_level = 5;
        assert_eq!(arg.log_level_filter(), log::LevelFilter::Off);
    }

    #[test]
    fn color_to_rgb8() {
        assert_eq!(Color::new(1.0, 0.0, 0.5).to_rgb8(), [255, 0, 128]);
    }
}
