use super::{chord_index_at, BarSignature, BarSignatureConverter, Chord, TempoConverter};
use crate::data::{Document, DocumentEvent, MusicalContent, MusicalContext, MusicalContextId};
use crate::timeline::PixelMapper;
use std::cell::OnceCell;
use std::sync::{Arc, Weak};

enum Binding {
    Unbound,
    Bound {
        id: MusicalContextId,
        context: Weak<MusicalContext>,
        /// Taken on first query, dropped when the host reports new content.
        snapshot: OnceCell<Arc<MusicalContent>>,
    },
}

/// Converters borrowed from the current snapshot.
pub struct MusicalMap<'a> {
    pub tempo: TempoConverter<'a>,
    pub bars: BarSignatureConverter<'a>,
    pub chords: &'a [Chord],
}

/// Follows the musical context relevant to the current selection and answers time
/// conversions against it.
///
/// Only a weak reference to the host's context is held. Removal or reordering of the
/// bound context detaches the adapter; the next end of an edit cycle resolves a new one.
pub struct MusicalContextAdapter {
    binding: Binding,
    document_attached: bool,
}

impl Default for MusicalContextAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl MusicalContextAdapter {
    pub fn new() -> Self {
        Self {
            binding: Binding::Unbound,
            document_attached: true,
        }
    }

    pub fn current_context_id(&self) -> Option<MusicalContextId> {
        match &self.binding {
            Binding::Bound { id, .. } => Some(*id),
            Binding::Unbound => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        self.current_context_id().is_some()
    }

    fn bind(&mut self, context: &Arc<MusicalContext>) {
        log::debug!("musical context {} bound", context.id.0);
        self.binding = Binding::Bound {
            id: context.id,
            context: Arc::downgrade(context),
            snapshot: OnceCell::new(),
        };
    }

    fn detach(&mut self) {
        if let Binding::Bound { id, .. } = &self.binding {
            log::debug!("musical context {} unbound", id.0);
        }
        self.binding = Binding::Unbound;
    }

    /// Picks the context of the first selected sequence, else of the sequence owning the
    /// first selected region. With nothing bound and nothing found, falls back to the
    /// document's first context. A binding is only replaced by another context, never
    /// cleared here.
    pub fn find_musical_context(&mut self, document: &Document) {
        if !self.document_attached {
            return;
        }
        let selection = document.selection();
        let from_sequences = selection
            .region_sequences
            .iter()
            .find_map(|id| document.region_sequence(*id)?.musical_context);
        let from_regions = || {
            selection
                .playback_regions
                .iter()
                .find_map(|id| document.sequence_for_region(*id)?.musical_context)
        };
        let found = from_sequences
            .or_else(from_regions)
            .and_then(|id| document.musical_context(id));
        let found = match found {
            Some(context) => Some(context),
            None if !self.is_bound() => document.musical_contexts().first(),
            None => None,
        };
        if let Some(context) = found {
            if self.current_context_id() != Some(context.id) {
                let context = Arc::clone(context);
                self.bind(&context);
            }
        }
    }

    /// Applies a host notification. Returns true when the bound context or its content
    /// changed, so dependents should redraw.
    pub fn handle_event(&mut self, document: &Document, event: &DocumentEvent) -> bool {
        let before = self.current_context_id();
        match event {
            DocumentEvent::NewSelection => self.find_musical_context(document),
            DocumentEvent::DidEndEditing => {
                if !self.is_bound() {
                    self.find_musical_context(document);
                }
            }
            DocumentEvent::WillRemoveMusicalContext(id) => {
                if before == Some(*id) {
                    self.detach();
                }
            }
            DocumentEvent::DidReorderMusicalContexts => {
                let first = document.musical_contexts().first().map(|c| c.id);
                if before.is_some() && first != before {
                    self.detach();
                }
            }
            DocumentEvent::WillDestroyDocument => {
                self.detach();
                self.document_attached = false;
            }
            DocumentEvent::DidUpdateMusicalContextContent(id, _) => {
                if let Binding::Bound {
                    id: bound,
                    snapshot,
                    ..
                } = &mut self.binding
                {
                    if bound == id {
                        log::trace!("musical context {} content changed", id.0);
                        snapshot.take();
                        return true;
                    }
                }
            }
            _ => {}
        }
        before != self.current_context_id()
    }

    /// The bound content, if the context is still alive. Checked on every call: a
    /// snapshot taken earlier is not handed out once the host dropped its context.
    pub fn content(&self) -> Option<&MusicalContent> {
        match &self.binding {
            Binding::Bound {
                context, snapshot, ..
            } => {
                let context = context.upgrade()?;
                Some(snapshot.get_or_init(|| context.content()))
            }
            Binding::Unbound => None,
        }
    }

    /// Tempo and bar queries are valid only when this holds.
    pub fn can_tempo_map(&self) -> bool {
        self.musical_map().is_some()
    }

    pub fn musical_map(&self) -> Option<MusicalMap<'_>> {
        let content = self.content()?;
        Some(MusicalMap {
            tempo: TempoConverter::new(&content.tempo_entries)?,
            bars: BarSignatureConverter::new(&content.bar_signatures)?,
            chords: &content.chords,
        })
    }

    fn tempo(&self) -> TempoConverter<'_> {
        debug_assert!(self.can_tempo_map(), "no musical context");
        self.musical_map()
            .map_or(TempoConverter::CONSTANT_120_BPM, |m| m.tempo)
    }

    fn bars(&self) -> BarSignatureConverter<'_> {
        debug_assert!(self.can_tempo_map(), "no musical context");
        self.musical_map()
            .map_or(BarSignatureConverter::FOUR_FOUR, |m| m.bars)
    }

    // The queries below require can_tempo_map(). Release builds answer for 120 bpm in 4/4.

    pub fn quarter_for_time(&self, time: f64) -> f64 {
        self.tempo().quarter_for_time(time)
    }
    pub fn time_for_quarter(&self, quarter: f64) -> f64 {
        self.tempo().time_for_quarter(quarter)
    }
    pub fn beat_for_quarter(&self, quarter: f64) -> f64 {
        self.bars().beat_for_quarter(quarter)
    }
    pub fn quarter_for_beat(&self, beat: f64) -> f64 {
        self.bars().quarter_for_beat(beat)
    }
    pub fn bar_signature_for_quarter(&self, quarter: f64) -> BarSignature {
        self.bars().bar_signature_for_quarter(quarter)
    }
    pub fn beat_distance_from_bar_start_for_quarter(&self, quarter: f64) -> f64 {
        self.bars().beat_distance_from_bar_start_for_quarter(quarter)
    }
    pub fn bar_index_for_quarter(&self, quarter: f64) -> i32 {
        self.bars().bar_index_for_quarter(quarter)
    }

    /// `mapper` works in seconds.
    pub fn pixel_for_quarter<M: PixelMapper>(&self, mapper: &M, quarter: f64) -> i32 {
        mapper.pixel_for_position(self.time_for_quarter(quarter))
    }
    pub fn quarter_for_pixel<M: PixelMapper>(&self, mapper: &M, pixel: i32) -> f64 {
        self.quarter_for_time(mapper.position_for_pixel(pixel))
    }

    /// The chord sounding at `quarter`. No context or no chord yet gives `None`.
    pub fn chord_at_quarter(&self, quarter: f64) -> Option<Chord> {
        let chords = &self.content()?.chords;
        chord_index_at(chords, quarter).map(|i| chords[i])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data::{ContentUpdateScopes, RegionSequence, RegionSequenceId, ViewSelection};
    use crate::musical::TempoEntry;
    use crate::timeline::SecondsPixelMapper;

    fn context(id: u64, bpm: f64) -> MusicalContext {
        MusicalContext::new(
            MusicalContextId(id),
            None,
            MusicalContent::constant(bpm, 4, 4),
        )
    }

    fn document_with_contexts() -> Document {
        let mut doc = Document::new("test");
        doc.add_musical_context(context(1, 120.0));
        doc.add_musical_context(context(2, 60.0));
        let mut a = RegionSequence::new(RegionSequenceId(1), "a");
        a.musical_context = Some(MusicalContextId(2));
        doc.add_region_sequence(a);
        doc.drain_events();
        doc
    }

    #[test]
    fn unbound_adapter_cannot_tempo_map() {
        let adapter = MusicalContextAdapter::new();
        assert!(!adapter.can_tempo_map());
        assert!(adapter.content().is_none());
        assert!(adapter.chord_at_quarter(0.0).is_none());
    }

    #[test]
    fn falls_back_to_first_context() {
        let doc = document_with_contexts();
        let mut adapter = MusicalContextAdapter::new();
        assert!(adapter.handle_event(&doc, &DocumentEvent::DidEndEditing));
        assert_eq!(adapter.current_context_id(), Some(MusicalContextId(1)));
        assert!(adapter.can_tempo_map());
        assert_eq!(adapter.quarter_for_time(1.0), 2.0);
    }

    #[test]
    fn selection_picks_its_sequence_context() {
        let mut doc = document_with_contexts();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        doc.set_selection(ViewSelection {
            region_sequences: vec![RegionSequenceId(1)],
            ..Default::default()
        });
        for event in doc.drain_events() {
            adapter.handle_event(&doc, &event);
        }
        assert_eq!(adapter.current_context_id(), Some(MusicalContextId(2)));
        assert_eq!(adapter.time_for_quarter(2.0), 2.0);

        // an empty selection keeps the current binding
        doc.set_selection(ViewSelection::default());
        assert!(!adapter.handle_event(&doc, &DocumentEvent::NewSelection));
        assert_eq!(adapter.current_context_id(), Some(MusicalContextId(2)));
    }

    #[test]
    fn reorder_detaches_when_no_longer_first() {
        let mut doc = document_with_contexts();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        doc.begin_editing();
        doc.move_musical_context(MusicalContextId(2), 0);
        assert!(adapter.handle_event(&doc, &DocumentEvent::DidReorderMusicalContexts));
        assert!(!adapter.is_bound());
        doc.end_editing();
        adapter.handle_event(&doc, &DocumentEvent::DidEndEditing);
        assert_eq!(adapter.current_context_id(), Some(MusicalContextId(2)));
    }

    #[test]
    fn scenario_e_removed_context_without_replacement() {
        let mut doc = Document::new("test");
        doc.add_musical_context(context(1, 120.0));
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        assert!(adapter.can_tempo_map());

        doc.begin_editing();
        doc.remove_musical_context(MusicalContextId(1));
        doc.end_editing();
        for event in doc.drain_events() {
            adapter.handle_event(&doc, &event);
        }
        assert!(!adapter.can_tempo_map());
        assert!(adapter.musical_map().is_none());
    }

    #[test]
    fn dropped_context_is_not_queried() {
        let mut doc = Document::new("test");
        doc.add_musical_context(context(1, 120.0));
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        // host dropped it without notifying
        let _ = doc.remove_musical_context(MusicalContextId(1));
        assert!(adapter.is_bound());
        assert!(!adapter.can_tempo_map());
    }

    #[test]
    fn snapshot_is_not_used_after_context_dropped() {
        let mut doc = Document::new("test");
        doc.add_musical_context(context(1, 120.0));
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        assert_eq!(adapter.quarter_for_time(1.0), 2.0);
        assert!(adapter.can_tempo_map());

        let _ = doc.remove_musical_context(MusicalContextId(1));
        doc.drain_events();
        assert!(adapter.is_bound());
        assert!(!adapter.can_tempo_map());
        assert!(adapter.content().is_none());
        assert!(adapter.chord_at_quarter(0.0).is_none());
    }

    #[test]
    fn content_update_refreshes_snapshot() {
        let mut doc = Document::new("test");
        doc.add_musical_context(context(1, 120.0));
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        assert_eq!(adapter.time_for_quarter(4.0), 2.0);

        doc.update_musical_context_content(
            MusicalContextId(1),
            MusicalContent::constant(60.0, 3, 4),
            ContentUpdateScopes::timing(),
        );
        // the old snapshot stays until the notification arrives
        assert_eq!(adapter.time_for_quarter(4.0), 2.0);
        for event in doc.drain_events() {
            adapter.handle_event(&doc, &event);
        }
        assert_eq!(adapter.time_for_quarter(4.0), 4.0);
        assert_eq!(adapter.bar_signature_for_quarter(0.0).numerator, 3);
    }

    #[test]
    fn destroyed_document_stays_detached() {
        let doc = document_with_contexts();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        adapter.handle_event(&doc, &DocumentEvent::WillDestroyDocument);
        assert!(!adapter.is_bound());
        adapter.handle_event(&doc, &DocumentEvent::DidEndEditing);
        assert!(!adapter.is_bound());
    }

    #[test]
    fn chords_and_pixels() {
        let doc = Document::demo();
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        assert_eq!(
            adapter.chord_at_quarter(5.0).map(|c| c.name()),
            Some("Am".to_string())
        );
        assert!(adapter.chord_at_quarter(-1.0).is_none());

        let mut mapper = SecondsPixelMapper::new();
        mapper.set_timeline_range(crate::timeline::TimeRange::new(0.0, 60.0));
        mapper.set_zoom_factor(10.0);
        // 120 bpm until quarter 32
        assert_eq!(adapter.pixel_for_quarter(&mapper, 4.0), 20);
        assert_eq!(adapter.quarter_for_pixel(&mapper, 20), 4.0);
        assert_eq!(adapter.bar_index_for_quarter(33.0), 8);
    }

    #[test]
    fn musical_map_needs_two_tempo_entries() {
        let mut doc = Document::new("test");
        let mut content = MusicalContent::constant(120.0, 4, 4);
        content.tempo_entries = vec![TempoEntry {
            time_position: 0.0,
            quarter_position: 0.0,
        }];
        doc.add_musical_context(MusicalContext::new(MusicalContextId(1), None, content));
        let mut adapter = MusicalContextAdapter::new();
        adapter.find_musical_context(&doc);
        assert!(adapter.is_bound());
        assert!(adapter.content().is_some());
        assert!(!adapter.can_tempo_map());
    }
}
