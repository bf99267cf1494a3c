//! View-models of the arrangement: what the GUI draws, independent of how it draws it.

pub mod coordinator;
pub mod document_view;
pub mod playback;
pub mod region;
pub mod ruler;
pub mod sequence;
pub mod status;
pub mod waveform;

pub use coordinator::{Changes, DocumentViewCoordinator, RebuildStats, ViewCounts};
pub use document_view::{DocumentView, ViewNotification};
pub use playback::PlaybackController;
pub use region::PlaybackRegionView;
pub use ruler::{layout_rulers, RulersContent, RulersLayout};
pub use sequence::RegionSequenceView;
pub use waveform::{Peak, SyntheticPreview, WaveformCache, WaveformPreviewProvider};
