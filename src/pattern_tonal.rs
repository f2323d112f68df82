//! Tonal helpers: note names, scale tables and chord descriptors.
//!
//! Scale state is carried on the event payload, never in a global context:
//! `scale` tags events and `scale_transpose` reads the tag back off each
//! event it transforms.

use crate::controls::IntoStringPattern;
use crate::pattern::Pattern;
use crate::voice::{Value, VoiceData};
use std::collections::HashMap;
use tracing::debug;

/// MIDI note number type.
pub type MidiNote = u8;

lazy_static::lazy_static! {
    static ref NOTE_TO_MIDI: HashMap<String, MidiNote> = {
        let mut m = HashMap::new();
        for octave in 0..=9 {
            let base = ((octave + 1) * 12) as MidiNote;
            m.insert(format!("c{octave}"), base);
            m.insert(format!("cs{octave}"), base + 1);
            m.insert(format!("df{octave}"), base + 1);
            m.insert(format!("d{octave}"), base + 2);
            m.insert(format!("ds{octave}"), base + 3);
            m.insert(format!("ef{octave}"), base + 3);
            m.insert(format!("e{octave}"), base + 4);
            m.insert(format!("f{octave}"), base + 5);
            m.insert(format!("fs{octave}"), base + 6);
            m.insert(format!("gf{octave}"), base + 6);
            m.insert(format!("g{octave}"), base + 7);
            m.insert(format!("gs{octave}"), base + 8);
            m.insert(format!("af{octave}"), base + 8);
            m.insert(format!("a{octave}"), base + 9);
            m.insert(format!("as{octave}"), base + 10);
            m.insert(format!("bf{octave}"), base + 10);
            m.insert(format!("b{octave}"), base + 11);
        }
        m
    };

    static ref SCALES: HashMap<&'static str, Vec<i32>> = {
        let mut m = HashMap::new();
        m.insert("major", vec![0, 2, 4, 5, 7, 9, 11]);
        m.insert("ionian", vec![0, 2, 4, 5, 7, 9, 11]);
        m.insert("minor", vec![0, 2, 3, 5, 7, 8, 10]);
        m.insert("aeolian", vec![0, 2, 3, 5, 7, 8, 10]);
        m.insert("harmonic", vec![0, 2, 3, 5, 7, 8, 11]);
        m.insert("melodic", vec![0, 2, 3, 5, 7, 9, 11]);
        m.insert("dorian", vec![0, 2, 3, 5, 7, 9, 10]);
        m.insert("phrygian", vec![0, 1, 3, 5, 7, 8, 10]);
        m.insert("lydian", vec![0, 2, 4, 6, 7, 9, 11]);
        m.insert("mixolydian", vec![0, 2, 4, 5, 7, 9, 10]);
        m.insert("locrian", vec![0, 1, 3, 5, 6, 8, 10]);
        m.insert("pentatonic", vec![0, 2, 4, 7, 9]);
        m.insert("penta", vec![0, 2, 4, 7, 9]);
        m.insert("blues", vec![0, 3, 5, 6, 7, 10]);
        m.insert("chromatic", vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        m.insert("whole", vec![0, 2, 4, 6, 8, 10]);
        m.insert("wholetone", vec![0, 2, 4, 6, 8, 10]);
        m.insert("augmented", vec![0, 3, 4, 7, 8, 11]);
        m.insert("diminished", vec![0, 2, 3, 5, 6, 8, 9, 11]);
        m.insert("iwato", vec![0, 1, 5, 6, 10]);
        m.insert("hirajoshi", vec![0, 2, 3, 7, 8]);
        m.insert("kumoi", vec![0, 2, 3, 7, 9]);
        m.insert("pelog", vec![0, 1, 3, 7, 8]);
        m.insert("egyptian", vec![0, 2, 5, 7, 10]);
        m
    };

    static ref CHORD_INTERVALS: HashMap<&'static str, Vec<i32>> = {
        let mut m = HashMap::new();
        m.insert("major", vec![0, 4, 7]);
        m.insert("maj", vec![0, 4, 7]);
        m.insert("minor", vec![0, 3, 7]);
        m.insert("min", vec![0, 3, 7]);
        m.insert("m", vec![0, 3, 7]);
        m.insert("dim", vec![0, 3, 6]);
        m.insert("aug", vec![0, 4, 8]);
        m.insert("sus2", vec![0, 2, 7]);
        m.insert("sus4", vec![0, 5, 7]);
        m.insert("maj7", vec![0, 4, 7, 11]);
        m.insert("m7", vec![0, 3, 7, 10]);
        m.insert("min7", vec![0, 3, 7, 10]);
        m.insert("7", vec![0, 4, 7, 10]);
        m.insert("dim7", vec![0, 3, 6, 9]);
        m.insert("m7b5", vec![0, 3, 6, 10]);
        m.insert("maj9", vec![0, 4, 7, 11, 14]);
        m.insert("min9", vec![0, 3, 7, 10, 14]);
        m.insert("9", vec![0, 4, 7, 10, 14]);
        m.insert("6", vec![0, 4, 7, 9]);
        m.insert("m6", vec![0, 3, 7, 9]);
        m.insert("5", vec![0, 7]);
        m
    };
}

/// Pitch class of a note letter with optional accidental, e.g. `F#` -> 6.
fn pitch_class(root: &str) -> Option<i32> {
    let mut chars = root.chars();
    let letter = chars.next()?;
    let base: i32 = match letter.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };
    let accidental = match chars.next() {
        Some('#') | Some('s') => 1,
        Some('b') | Some('f') => -1,
        Some(_) | None => 0,
    };
    Some((base + accidental).rem_euclid(12))
}

/// Convert a note name like `c4` or `f#3` to a MIDI note number. Plain
/// digits pass through; a bare letter defaults to octave 4.
pub fn note_to_midi(note: &str) -> Option<MidiNote> {
    if let Ok(n) = note.parse::<MidiNote>() {
        return Some(n);
    }
    let lower = note.to_lowercase().replace('#', "s");
    // A 'b' in second position is a flat accidental, not the note B.
    let bytes = lower.as_bytes();
    let normalized = if bytes.len() >= 2 && bytes[1] == b'b' && bytes[0].is_ascii_alphabetic() {
        format!("{}f{}", &lower[..1], &lower[2..])
    } else {
        lower
    };
    if let Some(&midi) = NOTE_TO_MIDI.get(&normalized) {
        return Some(midi);
    }
    NOTE_TO_MIDI.get(&format!("{normalized}4")).copied()
}

pub fn midi_to_freq(midi: MidiNote) -> f64 {
    440.0 * 2.0_f64.powf((midi as f64 - 69.0) / 12.0)
}

pub fn freq_to_midi(freq: f64) -> MidiNote {
    (69.0 + 12.0 * (freq / 440.0).log2()).round() as MidiNote
}

/// Resolve a `"C:major"`-style descriptor into a root pitch class and
/// interval table. A bare mode name roots at C.
pub fn parse_scale(descriptor: &str) -> Option<(i32, &'static [i32])> {
    let (root, mode) = match descriptor.split_once(':') {
        Some((root, mode)) => (pitch_class(root)?, mode),
        None => (0, descriptor),
    };
    let intervals = SCALES.get(mode.trim().to_lowercase().as_str())?;
    Some((root, intervals.as_slice()))
}

/// Map a scale degree to semitones above the root, wrapping octaves.
pub fn scale_degree(intervals: &[i32], degree: i32) -> i32 {
    let len = intervals.len() as i32;
    let octave = degree.div_euclid(len);
    let index = degree.rem_euclid(len) as usize;
    intervals[index] + 12 * octave
}

/// Move a resolved note by `steps` scale degrees, snapping to the scale.
fn transpose_in_scale(intervals: &[i32], root: i32, note: f64, steps: i32) -> f64 {
    let len = intervals.len() as i32;
    let rel = note - root as f64;
    let octave = (rel / 12.0).floor() as i32;
    let pc = rel - (octave * 12) as f64;
    let mut index = 0i32;
    for (i, &interval) in intervals.iter().enumerate() {
        if (interval as f64) <= pc + 1e-9 {
            index = i as i32;
        }
    }
    let position = octave * len + index + steps;
    let new_octave = position.div_euclid(len);
    let new_index = position.rem_euclid(len) as usize;
    (root + intervals[new_index] + 12 * new_octave) as f64
}

/// Pull the root letter (with accidental) off a chord token; slash chords
/// take the letter before the slash.
fn chord_root(token: &str) -> Option<String> {
    let head = token.split('/').next().unwrap_or(token);
    let mut chars = head.chars();
    let letter = chars.next()?;
    if !letter.is_ascii_alphabetic() {
        return None;
    }
    let mut root = letter.to_ascii_uppercase().to_string();
    if let Some(accidental) = chars.next() {
        if accidental == '#' || accidental == 'b' {
            root.push(accidental);
        }
    }
    Some(root)
}

/// Resolve a chord token like `Cm7` to MIDI notes at the given octave.
/// Unknown qualities fall back to a major triad.
pub fn resolve_chord(token: &str, octave: i32) -> Option<Vec<MidiNote>> {
    let root = chord_root(token)?;
    let head = token.split('/').next().unwrap_or(token);
    let quality = &head[root.len().min(head.len())..];
    let intervals = CHORD_INTERVALS
        .get(quality)
        .or_else(|| CHORD_INTERVALS.get("major"))?;
    let base = pitch_class(&root)? + (octave + 1) * 12;
    Some(
        intervals
            .iter()
            .map(|&i| (base + i).clamp(0, 127) as MidiNote)
            .collect(),
    )
}

/// Chord-name pattern; each event carries the chord descriptor.
pub fn chord(names: impl IntoStringPattern) -> Pattern<VoiceData> {
    names.into_string_pattern().fmap(|token| VoiceData {
        chord: Some(token),
        ..Default::default()
    })
}

impl Pattern<VoiceData> {
    /// Resolve numeric notes as degrees of the named scale and tag events
    /// with it so `scale_transpose` can walk degrees later. Unknown scale
    /// names leave values untouched.
    pub fn scale(self, descriptor: &str) -> Pattern<VoiceData> {
        let descriptor = descriptor.to_string();
        self.data_transform(move |mut data| {
            match parse_scale(&descriptor) {
                Some((root, intervals)) => {
                    if let Some(Value::Num(degree)) = data.note {
                        let resolved =
                            root + scale_degree(intervals, degree.round() as i32);
                        data.note = Some(Value::Num(resolved as f64));
                    }
                    data.scale = Some(descriptor.clone());
                }
                None => {
                    debug!(scale = %descriptor, "unknown scale name, passing through");
                }
            }
            data
        })
    }

    /// Shift notes by `steps` scale degrees when a scale tag is present,
    /// falling back to a chromatic semitone shift without one.
    pub fn scale_transpose(self, steps: i32) -> Pattern<VoiceData> {
        self.data_transform(move |mut data| {
            let Some(Value::Num(note)) = data.note else {
                return data;
            };
            let transposed = match data.scale.as_deref().and_then(parse_scale) {
                Some((root, intervals)) => transpose_in_scale(intervals, root, note, steps),
                None => note + steps as f64,
            };
            data.note = Some(Value::Num(transposed));
            data
        })
    }

    pub fn chord(self, names: impl IntoStringPattern) -> Pattern<VoiceData> {
        self.with_ctrl(chord(names))
    }

    /// Collapse chord events to their root note at octave 4.
    pub fn root_notes(self) -> Pattern<VoiceData> {
        self.root_notes_at(4)
    }

    /// Collapse chord events to their root note at the given octave.
    pub fn root_notes_at(self, octave: i32) -> Pattern<VoiceData> {
        self.data_transform(move |mut data| {
            let Some(token) = data.chord.take() else {
                return data;
            };
            match chord_root(&token) {
                Some(root) => {
                    data.note = Some(Value::Text(format!("{root}{octave}")));
                }
                None => {
                    debug!(chord = %token, "unresolvable chord root, passing through");
                    data.chord = Some(token);
                }
            }
            data
        })
    }
}
