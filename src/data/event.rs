use super::{MusicalContextId, PlaybackRegionId, RegionSequenceId};

/// Which parts of some content changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentUpdateScopes {
    pub samples: bool,
    pub notes: bool,
    pub tempo: bool,
    pub bar_signatures: bool,
    pub chords: bool,
}

impl ContentUpdateScopes {
    pub fn everything() -> Self {
        Self {
            samples: true,
            notes: true,
            tempo: true,
            bar_signatures: true,
            chords: true,
        }
    }
    pub fn timing() -> Self {
        Self {
            tempo: true,
            bar_signatures: true,
            ..Default::default()
        }
    }
    pub fn affects_timing(&self) -> bool {
        self.tempo || self.bar_signatures
    }
}

/// Notifications from the host document, in the order the host emits them.
///
/// Structural notifications arrive between [`DocumentEvent::WillBeginEditing`] and
/// [`DocumentEvent::DidEndEditing`]. Selection and visibility changes may come at any time.
#[derive(Clone, Debug, PartialEq)]
pub enum DocumentEvent {
    /// The view selection of the document changed.
    NewSelection,
    HideRegionSequences(Vec<RegionSequenceId>),
    WillBeginEditing,
    DidEndEditing,

    DidAddRegionSequence(RegionSequenceId),
    WillRemoveRegionSequence(RegionSequenceId),
    DidReorderRegionSequences,
    DidUpdateRegionSequenceProperties(RegionSequenceId),

    DidAddPlaybackRegion {
        sequence: RegionSequenceId,
        region: PlaybackRegionId,
    },
    WillRemovePlaybackRegion {
        sequence: RegionSequenceId,
        region: PlaybackRegionId,
    },
    DidUpdatePlaybackRegionProperties(PlaybackRegionId),
    DidUpdatePlaybackRegionContent(PlaybackRegionId, ContentUpdateScopes),

    DidAddMusicalContext(MusicalContextId),
    WillRemoveMusicalContext(MusicalContextId),
    DidReorderMusicalContexts,
    DidUpdateMusicalContextContent(MusicalContextId, ContentUpdateScopes),

    WillDestroyDocument,
}

impl DocumentEvent {
    /// Events that change which sequences or regions exist or their order.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::DidAddRegionSequence(_)
                | Self::WillRemoveRegionSequence(_)
                | Self::DidReorderRegionSequences
                | Self::DidAddPlaybackRegion { .. }
                | Self::WillRemovePlaybackRegion { .. }
                | Self::HideRegionSequences(_)
        )
    }
}
