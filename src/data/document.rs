use super::{
    Color, ContentUpdateScopes, DocumentEvent, MusicalContent, MusicalContext, MusicalContextId,
    PlaybackRegionId, RegionSequenceId,
};
use crate::error::{Error, Result};
use crate::musical::{BarSignature, Chord, TempoEntry};
use crate::timeline::TimeRange;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

/// Roots on the circle of fifths and chord tones of the demo song, one bar each.
const PROGRESSION: [(i8, &[u8]); 4] = [
    (0, &[0, 4, 7]),
    (3, &[0, 3, 7]),
    (-1, &[0, 4, 7]),
    (1, &[0, 4, 7, 10]),
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlaybackRegion {
    pub id: PlaybackRegionId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<Color>,
    pub start_in_playback_time: f64,
    pub duration_in_playback_time: f64,
    #[serde(default)]
    pub start_in_modification_time: f64,
    #[serde(default)]
    pub audio_modification_name: Option<String>,
    #[serde(default)]
    pub audio_source_name: Option<String>,
}

impl PlaybackRegion {
    pub fn new(id: PlaybackRegionId, start: f64, duration: f64) -> Self {
        Self {
            id,
            name: None,
            color: None,
            start_in_playback_time: start,
            duration_in_playback_time: duration,
            start_in_modification_time: 0.0,
            audio_modification_name: None,
            audio_source_name: None,
        }
    }
    pub fn time_range(&self) -> TimeRange {
        TimeRange::with_length(self.start_in_playback_time, self.duration_in_playback_time)
    }
}

/// A track: regions sharing one lane.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RegionSequence {
    pub id: RegionSequenceId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub order_index: i32,
    #[serde(default)]
    pub musical_context: Option<MusicalContextId>,
    #[serde(default)]
    pub playback_regions: Vec<PlaybackRegion>,
}

impl RegionSequence {
    pub fn new(id: RegionSequenceId, name: &str) -> Self {
        Self {
            id,
            name: Some(name.to_string()),
            color: None,
            order_index: 0,
            musical_context: None,
            playback_regions: vec![],
        }
    }
    pub fn is_empty(&self) -> bool {
        self.playback_regions.is_empty()
    }
    /// Union of all region ranges, [`TimeRange::EMPTY`] without regions.
    pub fn time_range(&self) -> TimeRange {
        self.playback_regions
            .iter()
            .map(PlaybackRegion::time_range)
            .reduce(|a, b| a.union(&b))
            .unwrap_or(TimeRange::EMPTY)
    }
    pub fn playback_region(&self, id: PlaybackRegionId) -> Option<&PlaybackRegion> {
        self.playback_regions.iter().find(|r| r.id == id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ViewSelection {
    #[serde(default)]
    pub playback_regions: Vec<PlaybackRegionId>,
    #[serde(default)]
    pub region_sequences: Vec<RegionSequenceId>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
}

impl ViewSelection {
    pub fn is_empty(&self) -> bool {
        self.playback_regions.is_empty() && self.region_sequences.is_empty()
    }

    /// The explicitly selected sequences, or else the sequences owning selected regions.
    pub fn effective_region_sequences(&self, document: &Document) -> Vec<RegionSequenceId> {
        if !self.region_sequences.is_empty() {
            return self.region_sequences.clone();
        }
        let mut result: Vec<RegionSequenceId> = vec![];
        for region in &self.playback_regions {
            if let Some(sequence) = document.sequence_for_region(*region) {
                if !result.contains(&sequence.id) {
                    result.push(sequence.id);
                }
            }
        }
        result
    }
}

/// The host document. Mutators stand in for the host and queue the notifications a host
/// would send; views receive them through [`Document::drain_events`].
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct Document {
    pub name: String,
    #[serde(default)]
    region_sequences: Vec<RegionSequence>,
    #[serde(default)]
    musical_contexts: Vec<Arc<MusicalContext>>,
    #[serde(default)]
    selection: ViewSelection,
    #[serde(default)]
    hidden_region_sequences: Vec<RegionSequenceId>,
    #[serde(skip)]
    editing: bool,
    #[serde(skip)]
    events: Vec<DocumentEvent>,
}

impl Document {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: Document = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let document = Self::from_json(&json)?;
        log::info!(
            "loaded {} with {} region sequences",
            path.display(),
            document.region_sequences.len()
        );
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        let mut sequence_ids = HashSet::new();
        let mut region_ids = HashSet::new();
        let mut context_ids = HashSet::new();
        for context in &self.musical_contexts {
            if !context_ids.insert(context.id) {
                return Err(Error::InvalidDocument(format!(
                    "duplicate musical context id {}",
                    context.id.0
                )));
            }
            context.content().validate()?;
        }
        for sequence in &self.region_sequences {
            if !sequence_ids.insert(sequence.id) {
                return Err(Error::InvalidDocument(format!(
                    "duplicate region sequence id {}",
                    sequence.id.0
                )));
            }
            if let Some(context) = sequence.musical_context {
                if !context_ids.contains(&context) {
                    return Err(Error::InvalidDocument(format!(
                        "region sequence {} refers to unknown musical context {}",
                        sequence.id.0, context.0
                    )));
                }
            }
            for region in &sequence.playback_regions {
                if !region_ids.insert(region.id) {
                    return Err(Error::InvalidDocument(format!(
                        "duplicate playback region id {}",
                        region.id.0
                    )));
                }
                let duration = region.duration_in_playback_time;
                if duration.is_nan() || duration < 0.0 {
                    return Err(Error::InvalidDocument(format!(
                        "playback region {} has negative duration",
                        region.id.0
                    )));
                }
            }
        }
        Ok(())
    }

    // queries

    pub fn region_sequences(&self) -> &[RegionSequence] {
        &self.region_sequences
    }
    pub fn region_sequence(&self, id: RegionSequenceId) -> Option<&RegionSequence> {
        self.region_sequences.iter().find(|s| s.id == id)
    }
    pub fn sequence_for_region(&self, id: PlaybackRegionId) -> Option<&RegionSequence> {
        self.region_sequences
            .iter()
            .find(|s| s.playback_region(id).is_some())
    }
    pub fn playback_region(&self, id: PlaybackRegionId) -> Option<&PlaybackRegion> {
        self.region_sequences
            .iter()
            .find_map(|s| s.playback_region(id))
    }
    pub fn musical_contexts(&self) -> &[Arc<MusicalContext>] {
        &self.musical_contexts
    }
    pub fn musical_context(&self, id: MusicalContextId) -> Option<&Arc<MusicalContext>> {
        self.musical_contexts.iter().find(|c| c.id == id)
    }
    pub fn selection(&self) -> &ViewSelection {
        &self.selection
    }
    pub fn hidden_region_sequences(&self) -> &[RegionSequenceId] {
        &self.hidden_region_sequences
    }
    pub fn is_hidden(&self, id: RegionSequenceId) -> bool {
        self.hidden_region_sequences.contains(&id)
    }
    /// True between [`Document::begin_editing`] and [`Document::end_editing`].
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn drain_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    // host side mutations

    pub fn begin_editing(&mut self) {
        debug_assert!(!self.editing, "edit cycles do not nest");
        self.editing = true;
        self.events.push(DocumentEvent::WillBeginEditing);
    }
    pub fn end_editing(&mut self) {
        self.editing = false;
        self.events.push(DocumentEvent::DidEndEditing);
    }

    pub fn add_region_sequence(&mut self, sequence: RegionSequence) {
        let id = sequence.id;
        self.region_sequences.push(sequence);
        self.events.push(DocumentEvent::DidAddRegionSequence(id));
    }

    pub fn remove_region_sequence(&mut self, id: RegionSequenceId) -> Option<RegionSequence> {
        let index = self.region_sequences.iter().position(|s| s.id == id)?;
        self.events.push(DocumentEvent::WillRemoveRegionSequence(id));
        self.hidden_region_sequences.retain(|h| *h != id);
        Some(self.region_sequences.remove(index))
    }

    /// Moves a sequence to `new_index` (clamped) and renumbers the order indices.
    pub fn move_region_sequence(&mut self, id: RegionSequenceId, new_index: usize) -> bool {
        let Some(index) = self.region_sequences.iter().position(|s| s.id == id) else {
            return false;
        };
        let sequence = self.region_sequences.remove(index);
        let new_index = new_index.min(self.region_sequences.len());
        self.region_sequences.insert(new_index, sequence);
        for (i, s) in self.region_sequences.iter_mut().enumerate() {
            s.order_index = i as i32;
        }
        self.events.push(DocumentEvent::DidReorderRegionSequences);
        true
    }

    pub fn update_region_sequence(
        &mut self,
        id: RegionSequenceId,
        update: impl FnOnce(&mut RegionSequence),
    ) -> bool {
        let Some(sequence) = self.region_sequences.iter_mut().find(|s| s.id == id) else {
            return false;
        };
        update(sequence);
        self.events
            .push(DocumentEvent::DidUpdateRegionSequenceProperties(id));
        true
    }

    pub fn add_playback_region(
        &mut self,
        sequence: RegionSequenceId,
        region: PlaybackRegion,
    ) -> bool {
        let Some(target) = self.region_sequences.iter_mut().find(|s| s.id == sequence) else {
            return false;
        };
        let id = region.id;
        target.playback_regions.push(region);
        self.events.push(DocumentEvent::DidAddPlaybackRegion {
            sequence,
            region: id,
        });
        true
    }

    pub fn remove_playback_region(&mut self, id: PlaybackRegionId) -> Option<PlaybackRegion> {
        let sequence = self
            .region_sequences
            .iter_mut()
            .find(|s| s.playback_region(id).is_some())?;
        let index = sequence.playback_regions.iter().position(|r| r.id == id)?;
        self.events.push(DocumentEvent::WillRemovePlaybackRegion {
            sequence: sequence.id,
            region: id,
        });
        self.selection.playback_regions.retain(|r| *r != id);
        Some(sequence.playback_regions.remove(index))
    }

    pub fn update_playback_region(
        &mut self,
        id: PlaybackRegionId,
        update: impl FnOnce(&mut PlaybackRegion),
    ) -> bool {
        let Some(region) = self
            .region_sequences
            .iter_mut()
            .find_map(|s| s.playback_regions.iter_mut().find(|r| r.id == id))
        else {
            return false;
        };
        update(region);
        self.events
            .push(DocumentEvent::DidUpdatePlaybackRegionProperties(id));
        true
    }

    pub fn update_playback_region_content(
        &mut self,
        id: PlaybackRegionId,
        scopes: ContentUpdateScopes,
    ) {
        if self.playback_region(id).is_some() {
            self.events
                .push(DocumentEvent::DidUpdatePlaybackRegionContent(id, scopes));
        }
    }

    pub fn add_musical_context(&mut self, context: MusicalContext) -> Arc<MusicalContext> {
        let context = Arc::new(context);
        self.musical_contexts.push(Arc::clone(&context));
        self.events
            .push(DocumentEvent::DidAddMusicalContext(context.id));
        context
    }

    pub fn remove_musical_context(&mut self, id: MusicalContextId) -> Option<Arc<MusicalContext>> {
        let index = self.musical_contexts.iter().position(|c| c.id == id)?;
        self.events.push(DocumentEvent::WillRemoveMusicalContext(id));
        for sequence in self.region_sequences.iter_mut() {
            if sequence.musical_context == Some(id) {
                sequence.musical_context = None;
            }
        }
        Some(self.musical_contexts.remove(index))
    }

    pub fn move_musical_context(&mut self, id: MusicalContextId, new_index: usize) -> bool {
        let Some(index) = self.musical_contexts.iter().position(|c| c.id == id) else {
            return false;
        };
        let context = self.musical_contexts.remove(index);
        let new_index = new_index.min(self.musical_contexts.len());
        self.musical_contexts.insert(new_index, context);
        self.events.push(DocumentEvent::DidReorderMusicalContexts);
        true
    }

    pub fn update_musical_context_content(
        &mut self,
        id: MusicalContextId,
        content: MusicalContent,
        scopes: ContentUpdateScopes,
    ) -> bool {
        let Some(context) = self.musical_context(id) else {
            return false;
        };
        context.replace_content(content);
        self.events
            .push(DocumentEvent::DidUpdateMusicalContextContent(id, scopes));
        true
    }

    pub fn set_selection(&mut self, selection: ViewSelection) {
        self.selection = selection;
        self.events.push(DocumentEvent::NewSelection);
    }

    pub fn hide_region_sequences(&mut self, ids: Vec<RegionSequenceId>) {
        self.hidden_region_sequences = ids.clone();
        self.events.push(DocumentEvent::HideRegionSequences(ids));
    }

    /// Announces destruction. Views detach and must not query the document afterwards.
    pub fn destroy(&mut self) {
        self.events.push(DocumentEvent::WillDestroyDocument);
    }

    /// A small song used when no file is given: three tracks, a tempo change from 120 to
    /// 90 bpm, a switch to 3/4 and a chord progression.
    pub fn demo() -> Self {
        let mut document = Document::new("demo");
        let context_id = MusicalContextId(1);
        let content = MusicalContent {
            tempo_entries: vec![
                TempoEntry {
                    time_position: 0.0,
                    quarter_position: 0.0,
                },
                TempoEntry {
                    time_position: 16.0,
                    quarter_position: 32.0,
                },
                TempoEntry {
                    time_position: 32.0,
                    quarter_position: 56.0,
                },
            ],
            bar_signatures: vec![
                BarSignature {
                    position: 0.0,
                    numerator: 4,
                    denominator: 4,
                },
                BarSignature {
                    position: 32.0,
                    numerator: 3,
                    denominator: 4,
                },
            ],
            chords: PROGRESSION
                .iter()
                .cycle()
                .take(14)
                .enumerate()
                .map(|(i, &(root, semitones))| {
                    Chord::from_semitones(i as f64 * 4.0, root, semitones)
                })
                .collect(),
        };
        document.musical_contexts.push(Arc::new(MusicalContext::new(
            context_id,
            Some("Song".to_string()),
            content,
        )));

        let palette = [
            Color::new(0.85, 0.45, 0.3),
            Color::new(0.35, 0.6, 0.85),
            Color::new(0.5, 0.8, 0.45),
        ];
        let mut region_id = 0;
        for (i, (name, color)) in ["Drums", "Bass", "Keys"].iter().zip(palette).enumerate() {
            let mut sequence = RegionSequence::new(RegionSequenceId(i as u64 + 1), name);
            sequence.color = Some(color);
            sequence.order_index = i as i32;
            sequence.musical_context = Some(context_id);
            for k in 0..3 {
                region_id += 1;
                let start = 2.0 + i as f64 * 1.5 + k as f64 * 12.0;
                let mut region =
                    PlaybackRegion::new(PlaybackRegionId(region_id), start, 8.0 + i as f64);
                region.name = Some(format!("{name} {}", k + 1));
                region.audio_source_name = Some(format!("{}.wav", name.to_lowercase()));
                sequence.playback_regions.push(region);
            }
            document.region_sequences.push(sequence);
        }
        document
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn two_tracks() -> Document {
        let mut doc = Document::new("test");
        let mut a = RegionSequence::new(RegionSequenceId(1), "a");
        a.playback_regions
            .push(PlaybackRegion::new(PlaybackRegionId(10), 1.0, 2.0));
        a.playback_regions
            .push(PlaybackRegion::new(PlaybackRegionId(11), 5.0, 1.0));
        let mut b = RegionSequence::new(RegionSequenceId(2), "b");
        b.playback_regions
            .push(PlaybackRegion::new(PlaybackRegionId(20), 0.5, 1.0));
        doc.add_region_sequence(a);
        doc.add_region_sequence(b);
        doc.drain_events();
        doc
    }

    #[test]
    fn sequence_time_range_is_union_of_regions() {
        let doc = two_tracks();
        assert_eq!(
            doc.region_sequence(RegionSequenceId(1)).unwrap().time_range(),
            TimeRange::new(1.0, 6.0)
        );
        assert_eq!(
            RegionSequence::new(RegionSequenceId(3), "empty").time_range(),
            TimeRange::EMPTY
        );
    }

    #[test]
    fn mutations_queue_events() {
        let mut doc = two_tracks();
        doc.begin_editing();
        assert!(doc.is_editing());
        assert!(doc.move_region_sequence(RegionSequenceId(2), 0));
        assert!(doc.remove_playback_region(PlaybackRegionId(11)).is_some());
        doc.end_editing();
        assert_eq!(
            doc.drain_events(),
            vec![
                DocumentEvent::WillBeginEditing,
                DocumentEvent::DidReorderRegionSequences,
                DocumentEvent::WillRemovePlaybackRegion {
                    sequence: RegionSequenceId(1),
                    region: PlaybackRegionId(11)
                },
                DocumentEvent::DidEndEditing,
            ]
        );
        assert!(doc.drain_events().is_empty());
        assert_eq!(doc.region_sequences()[0].id, RegionSequenceId(2));
        assert_eq!(doc.region_sequences()[1].order_index, 1);
    }

    #[test]
    fn effective_selection_falls_back_to_region_owners() {
        let doc = two_tracks();
        let selection = ViewSelection {
            playback_regions: vec![PlaybackRegionId(20), PlaybackRegionId(10), PlaybackRegionId(11)],
            ..Default::default()
        };
        assert_eq!(
            selection.effective_region_sequences(&doc),
            vec![RegionSequenceId(2), RegionSequenceId(1)]
        );
        let explicit = ViewSelection {
            region_sequences: vec![RegionSequenceId(1)],
            playback_regions: vec![PlaybackRegionId(20)],
            ..Default::default()
        };
        assert_eq!(
            explicit.effective_region_sequences(&doc),
            vec![RegionSequenceId(1)]
        );
    }

    #[test]
    fn removing_context_clears_sequence_references() {
        let mut doc = Document::demo();
        assert!(doc.remove_musical_context(MusicalContextId(1)).is_some());
        assert!(doc
            .region_sequences()
            .iter()
            .all(|s| s.musical_context.is_none()));
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn demo_document_is_valid_and_round_trips() {
        let doc = Document::demo();
        assert!(doc.validate().is_ok());
        let json = doc.to_json().unwrap();
        let back = Document::from_json(&json).unwrap();
        assert_eq!(back.region_sequences(), doc.region_sequences());
        assert_eq!(back.musical_contexts().len(), 1);
        assert!(!back.is_editing());
    }

    #[test]
    fn invalid_documents_are_rejected() {
        let mut doc = two_tracks();
        doc.add_playback_region(
            RegionSequenceId(2),
            PlaybackRegion::new(PlaybackRegionId(10), 0.0, 1.0),
        );
        assert!(matches!(doc.validate(), Err(Error::InvalidDocument(_))));

        let json = r#"{"name":"x","region_sequences":[{"id":1,"playback_regions":[
            {"id":1,"start_in_playback_time":0.0,"duration_in_playback_time":-1.0}]}]}"#;
        assert!(matches!(
            Document::from_json(json),
            Err(Error::InvalidDocument(_))
        ));
        assert!(matches!(Document::from_json("{"), Err(Error::Json(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = Document::load(Path::new("/nonexistent/arrangement.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
