use serde::{Deserialize, Serialize};

/// A sheet chord starting at `position` (quarters) and lasting until the next one.
///
/// `root` and `bass` are steps on the circle of fifths relative to C (G = 1, F = -1).
/// `intervals` marks which semitones above the root are used; all zero means "no chord".
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Chord {
    pub position: f64,
    pub intervals: [u8; 12],
    pub bass: i8,
    #[serde(default)]
    pub root: i8,
}

const NATURALS_IN_FIFTHS: [&str; 7] = ["F", "C", "G", "D", "A", "E", "B"];

/// Spells a circle-of-fifths step, e.g. 6 -> "F#", -2 -> "Bb".
pub fn note_name(fifths: i8) -> String {
    let shifted = fifths as i32 + 1;
    let letter = NATURALS_IN_FIFTHS[shifted.rem_euclid(7) as usize];
    let accidentals = shifted.div_euclid(7);
    let accidental = if accidentals >= 0 { "#" } else { "b" };
    format!("{letter}{}", accidental.repeat(accidentals.unsigned_abs() as usize))
}

/// Semitones of a circle-of-fifths step above C.
fn semitone(fifths: i8) -> i32 {
    (fifths as i32 * 7).rem_euclid(12)
}

impl Chord {
    pub fn no_chord(position: f64) -> Self {
        Self {
            position,
            intervals: [0; 12],
            bass: 0,
            root: 0,
        }
    }

    /// Builds a chord from semitones above the root.
    pub fn from_semitones(position: f64, root: i8, semitones: &[u8]) -> Self {
        let mut intervals = [0; 12];
        for (degree, &s) in semitones.iter().enumerate() {
            intervals[s as usize % 12] = degree as u8 + 1;
        }
        Self {
            position,
            intervals,
            bass: root,
            root,
        }
    }

    pub fn with_bass(mut self, bass: i8) -> Self {
        self.bass = bass;
        self
    }

    pub fn is_no_chord(&self) -> bool {
        self.intervals.iter().all(|&i| i == 0)
    }

    fn uses(&self, semitone: usize) -> bool {
        self.intervals[semitone] != 0
    }

    fn quality(&self) -> &'static str {
        let third_major = self.uses(4);
        let third_minor = self.uses(3);
        let fifth = self.uses(7);
        let fifth_dim = self.uses(6);
        let fifth_aug = self.uses(8);
        let sixth = self.uses(9);
        let seventh_minor = self.uses(10);
        let seventh_major = self.uses(11);
        match (third_major, third_minor) {
            (true, false) if fifth_aug && !fifth => "aug",
            (true, false) if seventh_major => "maj7",
            (true, false) if seventh_minor => "7",
            (true, false) if sixth => "6",
            (true, false) => "",
            (false, true) if fifth_dim && !fifth && sixth => "dim7",
            (false, true) if fifth_dim && !fifth && seventh_minor => "m7b5",
            (false, true) if fifth_dim && !fifth => "dim",
            (false, true) if seventh_major => "mMaj7",
            (false, true) if seventh_minor => "m7",
            (false, true) if sixth => "m6",
            (false, true) => "m",
            (false, false) if self.uses(5) => "sus4",
            (false, false) if self.uses(2) => "sus2",
            (false, false) if fifth => "5",
            _ => "(?)",
        }
    }

    /// Display name such as "Am7" or "C/E". "N.C." for no chord.
    pub fn name(&self) -> String {
        if self.is_no_chord() {
            return "N.C.".to_string();
        }
        let mut name = note_name(self.root) + self.quality();
        if semitone(self.bass) != semitone(self.root) {
            name.push('/');
            name.push_str(&note_name(self.bass));
        }
        name
    }

    /// A stable color per chord: the same name and bass always give the same RGB,
    /// across runs and builds.
    pub fn color(&self) -> [u8; 3] {
        let mut hash = FNV_OFFSET_BASIS;
        for byte in self.name().bytes().chain([self.bass as u8]) {
            hash = (hash ^ byte as u64).wrapping_mul(FNV_PRIME);
        }
        let mixed = mix64(hash);
        [mixed as u8, (mixed >> 8) as u8, (mixed >> 16) as u8]
    }
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

// splitmix64 finalizer, spreads nearby hashes over all bits
fn mix64(v: u64) -> u64 {
    let mut z = v.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Index of the chord in effect at `quarter` in a list ordered by position.
pub fn chord_index_at(chords: &[Chord], quarter: f64) -> Option<usize> {
    chords
        .partition_point(|c| c.position <= quarter)
        .checked_sub(1)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn note_names_follow_circle_of_fifths() {
        assert_eq!(note_name(0), "C");
        assert_eq!(note_name(1), "G");
        assert_eq!(note_name(-1), "F");
        assert_eq!(note_name(6), "F#");
        assert_eq!(note_name(-2), "Bb");
        assert_eq!(note_name(-6), "Gb");
        assert_eq!(note_name(12), "B#");
        assert_eq!(note_name(13), "F##");
    }

    #[test]
    fn chord_names() {
        assert_eq!(Chord::from_semitones(0.0, 0, &[0, 4, 7]).name(), "C");
        assert_eq!(Chord::from_semitones(0.0, 3, &[0, 3, 7, 10]).name(), "Am7");
        assert_eq!(Chord::from_semitones(0.0, 1, &[0, 4, 7, 10]).name(), "G7");
        assert_eq!(Chord::from_semitones(0.0, 5, &[0, 3, 6]).name(), "Bdim");
        assert_eq!(
            Chord::from_semitones(0.0, 0, &[0, 4, 7]).with_bass(4).name(),
            "C/E"
        );
        assert_eq!(Chord::no_chord(0.0).name(), "N.C.");
        assert!(Chord::no_chord(0.0).is_no_chord());
    }

    #[test]
    fn chord_color_is_stable() {
        let c = Chord::from_semitones(0.0, 0, &[0, 4, 7]);
        let moved = Chord { position: 8.0, ..c };
        assert_eq!(c.color(), moved.color());
        assert_ne!(c.color(), c.with_bass(4).color());
        // fixed values, these must not drift between toolchains
        assert_eq!(c.color(), [250, 58, 185]);
        assert_eq!(c.with_bass(4).color(), [129, 125, 224]);
        assert_eq!(Chord::from_semitones(0.0, 3, &[0, 3, 7]).color(), [207, 19, 56]);
    }

    #[test]
    fn chord_lookup() {
        let chords = [
            Chord::from_semitones(0.0, 0, &[0, 4, 7]),
            Chord::from_semitones(4.0, 1, &[0, 4, 7]),
        ];
        assert_eq!(chord_index_at(&chords, -1.0), None);
        assert_eq!(chord_index_at(&chords, 0.0), Some(0));
        assert_eq!(chord_index_at(&chords, 5.0), Some(1));
    }

    #[test]
    fn root_defaults_when_missing() {
        let json = r#"{"position":0.0,"intervals":[1,0,0,0,2,0,0,3,0,0,0,0],"bass":0}"#;
        let chord: Chord = serde_json::from_str(json).unwrap();
        assert_eq!(chord.root, 0);
        assert_eq!(chord.name(), "C");
    }
}
