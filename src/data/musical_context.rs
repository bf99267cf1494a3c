use super::MusicalContextId;
use crate::error::{Error, Result};
use crate::musical::{BarSignature, Chord, TempoEntry};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Tempo, bar signature and chord data of one musical context.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct MusicalContent {
    pub tempo_entries: Vec<TempoEntry>,
    pub bar_signatures: Vec<BarSignature>,
    #[serde(default)]
    pub chords: Vec<Chord>,
}

impl MusicalContent {
    /// Constant tempo and a single signature from zero.
    pub fn constant(bpm: f64, numerator: u32, denominator: u32) -> Self {
        Self {
            tempo_entries: vec![
                TempoEntry {
                    time_position: 0.0,
                    quarter_position: 0.0,
                },
                TempoEntry {
                    time_position: 60.0 / bpm,
                    quarter_position: 1.0,
                },
            ],
            bar_signatures: vec![BarSignature {
                position: 0.0,
                numerator,
                denominator,
            }],
            chords: vec![],
        }
    }

    pub fn validate(&self) -> Result<()> {
        let strictly_increasing = self.tempo_entries.windows(2).all(|w| {
            w[1].time_position > w[0].time_position
                && w[1].quarter_position > w[0].quarter_position
        });
        if !strictly_increasing {
            return Err(Error::InvalidDocument(
                "tempo entries must be strictly increasing".to_string(),
            ));
        }
        if let Some(s) = self
            .bar_signatures
            .iter()
            .find(|s| s.numerator == 0 || s.denominator == 0)
        {
            return Err(Error::InvalidDocument(format!(
                "bar signature {}/{} at quarter {} is not valid",
                s.numerator, s.denominator, s.position
            )));
        }
        if !self
            .bar_signatures
            .windows(2)
            .all(|w| w[1].position > w[0].position)
        {
            return Err(Error::InvalidDocument(
                "bar signatures must be ordered by position".to_string(),
            ));
        }
        if !self.chords.windows(2).all(|w| w[1].position >= w[0].position) {
            return Err(Error::InvalidDocument(
                "chords must be ordered by position".to_string(),
            ));
        }
        Ok(())
    }
}

/// Host-owned musical context. The content is swapped as a whole so readers holding an
/// older snapshot are never affected by an update.
#[derive(Serialize, Deserialize, Debug)]
pub struct MusicalContext {
    pub id: MusicalContextId,
    pub name: Option<String>,
    content: Mutex<Arc<MusicalContent>>,
}

impl MusicalContext {
    pub fn new(id: MusicalContextId, name: Option<String>, content: MusicalContent) -> Self {
        Self {
            id,
            name,
            content: Mutex::new(Arc::new(content)),
        }
    }

    pub fn content(&self) -> Arc<MusicalContent> {
        match self.content.lock() {
            Ok(content) => Arc::clone(&content),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn replace_content(&self, content: MusicalContent) {
        let content = Arc::new(content);
        match self.content.lock() {
            Ok(mut current) => *current = content,
            Err(poisoned) => *poisoned.into_inner() = content,
        }
    }
}
