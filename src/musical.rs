//! Musical time: tempo maps, bar signatures, chords, and the adapter that tracks which
//! musical context of the document is in use.

pub mod adapter;
pub mod chord;
pub mod converter;

pub use adapter::{MusicalContextAdapter, MusicalMap};
pub use chord::{chord_index_at, note_name, Chord};
pub use converter::{BarSignature, BarSignatureConverter, TempoConverter, TempoEntry};
