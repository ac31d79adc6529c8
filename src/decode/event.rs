//! Event snapshots of the active-note set
//!
//! Walking a canonicalized track produces one `Event` per note mutation, each
//! capturing the full keyboard state at its grid offset. A second pass removes
//! zero-length duplicates, back-fills event lengths and, in rich mode,
//! materializes per-note `SeparateNote` values (which copy the finalized
//! length, so ordering matters).

use super::Mode;
use crate::midi::{GridAccuracy, MessageKind, Track, NOTE_RANGE};
use serde::Serialize;
use std::collections::BTreeMap;

/// Pitch class derived from a note height, `[1, 12]`
pub fn tone_of(height: u8) -> u8 {
    height % 12 + 1
}

/// Octave number derived from a note height, `[-1, 9]`
pub fn octave_of(height: u8) -> i8 {
    (height / 12) as i8 - 1
}

/// A sounding note inside an event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventNote {
    /// Raw `[0, 127]` until normalization, `[0, 1]` after
    pub velocity: f64,
    pub height: u8,
}

impl EventNote {
    pub fn new(velocity: u8, height: u8) -> Self {
        Self {
            velocity: velocity as f64,
            height,
        }
    }

    pub fn tone(&self) -> u8 {
        tone_of(self.height)
    }

    pub fn octave(&self) -> i8 {
        octave_of(self.height)
    }
}

/// An event-scoped note carrying its own timing and track metadata,
/// derived from an event only after that event's length is final
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeparateNote {
    pub velocity: f64,
    /// Note length in grid units
    pub length: u64,
    /// Absolute grid position
    pub offset: u64,
    /// Note track index, not counting the meta track
    pub track: usize,
    /// Microseconds per quarter note at `offset`
    pub tempo: u32,
    pub height: u8,
}

impl SeparateNote {
    pub fn tone(&self) -> u8 {
        tone_of(self.height)
    }

    pub fn octave(&self) -> i8 {
        octave_of(self.height)
    }
}

/// Per-note payload, depending on the representation mode
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NoteValue {
    Presence,
    Velocity(f64),
    Note(EventNote),
}

/// A (pitch, value) pair inside an event's active set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveElement {
    pub height: u8,
    pub value: NoteValue,
}

/// Dense 128-slot row mirroring the active set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DenseRow {
    Presence(Vec<bool>),
    Velocities(Vec<f64>),
    Rich(Vec<Option<SeparateNote>>),
}

/// Snapshot of all sounding notes at one grid offset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Grid units since the previous event
    pub time: u64,
    /// Grid units until the next event, back-filled once it is known
    pub length: u64,
    /// Absolute grid position
    pub offset: u64,
    /// Note track index, not counting the meta track
    pub track: usize,
    /// Microseconds per quarter note at `offset`
    pub tempo: u32,
    /// Sorted by height; the ordered map this is built from keeps it so
    pub active_notes: Vec<ActiveElement>,
    pub all_notes: DenseRow,
}

impl Event {
    /// Snapshot the current pitch→note mapping. The map iterates in pitch
    /// order, which keeps `active_notes` sorted without re-sorting.
    fn new(
        time: u64,
        offset: u64,
        track: usize,
        tempo: u32,
        notes: &BTreeMap<u8, EventNote>,
        mode: Mode,
    ) -> Self {
        let active_notes = notes
            .values()
            .map(|note| ActiveElement {
                height: note.height,
                value: match mode {
                    Mode::Presence => NoteValue::Presence,
                    Mode::Velocity => NoteValue::Velocity(note.velocity),
                    Mode::Rich => NoteValue::Note(note.clone()),
                },
            })
            .collect();

        let all_notes = match mode {
            Mode::Presence => {
                let mut row = vec![false; NOTE_RANGE];
                for note in notes.values() {
                    row[note.height as usize] = true;
                }
                DenseRow::Presence(row)
            }
            Mode::Velocity => {
                let mut row = vec![0f64; NOTE_RANGE];
                for note in notes.values() {
                    row[note.height as usize] = note.velocity;
                }
                DenseRow::Velocities(row)
            }
            // filled by `materialize_rich_row` once the length is final
            Mode::Rich => DenseRow::Rich(vec![None; NOTE_RANGE]),
        };

        Self {
            time,
            length: 0,
            offset,
            track,
            tempo,
            active_notes,
            all_notes,
        }
    }

    /// Build the rich dense row; requires the finalized event length
    fn materialize_rich_row(&mut self) {
        let mut row = vec![None; NOTE_RANGE];
        for element in &self.active_notes {
            if let NoteValue::Note(note) = &element.value {
                row[note.height as usize] = Some(SeparateNote {
                    velocity: note.velocity,
                    length: self.length,
                    offset: self.offset,
                    track: self.track,
                    tempo: self.tempo,
                    height: note.height,
                });
            }
        }
        self.all_notes = DenseRow::Rich(row);
    }

    /// Divide every velocity by `divisor`
    pub fn normalise(&mut self, divisor: f64) {
        for element in &mut self.active_notes {
            match &mut element.value {
                NoteValue::Presence => {}
                NoteValue::Velocity(value) => *value /= divisor,
                NoteValue::Note(note) => note.velocity /= divisor,
            }
        }
        match &mut self.all_notes {
            DenseRow::Presence(_) => {}
            DenseRow::Velocities(row) => {
                for value in row.iter_mut() {
                    *value /= divisor;
                }
            }
            DenseRow::Rich(row) => {
                for slot in row.iter_mut().flatten() {
                    slot.velocity /= divisor;
                }
            }
        }
    }
}

/// Translate one canonicalized track into a finalized event sequence
pub fn events_for_track(
    track: &Track,
    track_index: usize,
    accuracy: GridAccuracy,
    tempos: &[u32],
    mode: Mode,
) -> Vec<Event> {
    let mut events = Vec::with_capacity(track.len() + 1);
    let mut notes: BTreeMap<u8, EventNote> = BTreeMap::new();
    let mut ticks = 0i64;
    let mut offset = 0u64;
    let mut carried_increment = 0u64;

    events.push(Event::new(0, 0, track_index, tempos[0], &notes, mode));

    for msg in track {
        let increment = accuracy.increment(msg.delta, ticks).max(0) as u64;

        match msg.kind {
            MessageKind::NoteOn { key, velocity, .. } => {
                notes.insert(key, EventNote::new(velocity, key));
            }
            MessageKind::NoteOff { key, .. } => {
                if notes.remove(&key).is_none() {
                    // stray note-off: no snapshot, but its ticks still count
                    ticks += msg.delta as i64;
                    offset += increment;
                    carried_increment += increment;
                    continue;
                }
            }
            _ => {
                ticks += msg.delta as i64;
                offset += increment;
                carried_increment += increment;
                continue;
            }
        }

        ticks += msg.delta as i64;
        offset += increment;
        let time = increment + carried_increment;
        carried_increment = 0;

        let tempo = tempos[offset as usize];
        events.push(Event::new(time, offset, track_index, tempo, &notes, mode));
    }

    finalize_events(events, mode)
}

/// Second pass: drop true duplicates (zero time-delta to the next event),
/// back-fill lengths, re-link times and materialize rich rows.
fn finalize_events(events: Vec<Event>, mode: Mode) -> Vec<Event> {
    let mut nonzero: Vec<Event> = Vec::with_capacity(events.len());
    let last_index = events.len() - 1;

    let mut iter = events.into_iter().peekable();
    let mut index = 0;
    while let Some(mut event) = iter.next() {
        if index == last_index {
            nonzero.push(event);
        } else if let Some(next) = iter.peek() {
            if next.time > 0 {
                event.length = next.time;
                nonzero.push(event);
            }
        }
        index += 1;
    }

    for i in 1..nonzero.len() {
        nonzero[i].time = nonzero[i - 1].length;
    }

    if mode == Mode::Rich {
        for event in &mut nonzero {
            event.materialize_rich_row();
        }
    }

    nonzero
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::TrackMessage;

    fn accuracy() -> GridAccuracy {
        GridAccuracy::from_file(192, 8, 64)
    }

    #[test]
    fn tone_and_octave_are_pure_functions_of_height() {
        assert_eq!(tone_of(60), 1);
        assert_eq!(octave_of(60), 4);
        assert_eq!(tone_of(0), 1);
        assert_eq!(octave_of(0), -1);
        assert_eq!(tone_of(127), 8);
        assert_eq!(octave_of(127), 9);
    }

    #[test]
    fn single_note_produces_offset_zero_length_eight() {
        // 192 PPQ, grid 64, note on at tick 0, off at tick 96
        let track = vec![
            TrackMessage::note_on(0, 0, 80, 64),
            TrackMessage::note_off(96, 0, 80, 0),
        ];
        let tempos = vec![500_000; 9];
        let events = events_for_track(&track, 0, accuracy(), &tempos, Mode::Presence);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].offset, 0);
        assert_eq!(events[0].length, 8);
        assert_eq!(events[0].active_notes.len(), 1);
        assert_eq!(events[0].active_notes[0].height, 80);
        assert_eq!(events[1].offset, 8);
        assert_eq!(events[1].time, 8);
        assert!(events[1].active_notes.is_empty());
    }

    #[test]
    fn active_notes_stay_sorted_by_height() {
        let track = vec![
            TrackMessage::note_on(0, 0, 72, 64),
            TrackMessage::note_on(0, 0, 60, 64),
            TrackMessage::note_on(0, 0, 67, 64),
            TrackMessage::note_off(96, 0, 60, 0),
            TrackMessage::note_off(0, 0, 67, 0),
            TrackMessage::note_off(0, 0, 72, 0),
        ];
        let tempos = vec![500_000; 9];
        let events = events_for_track(&track, 0, accuracy(), &tempos, Mode::Velocity);

        let chord = &events[0];
        let heights: Vec<u8> = chord.active_notes.iter().map(|e| e.height).collect();
        assert_eq!(heights, vec![60, 67, 72]);
    }

    #[test]
    fn zero_length_duplicates_are_dropped() {
        // both mutations at tick 0 collapse into the surviving snapshot
        let track = vec![
            TrackMessage::note_on(0, 0, 60, 64),
            TrackMessage::note_on(0, 0, 64, 64),
            TrackMessage::note_off(48, 0, 60, 0),
            TrackMessage::note_off(0, 0, 64, 0),
        ];
        let tempos = vec![500_000; 5];
        let events = events_for_track(&track, 0, accuracy(), &tempos, Mode::Presence);

        // snapshot {60}, snapshot {60,64} at the same offset, then the end:
        // only the complete chord and the final sentinel survive
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].active_notes.len(), 2);
        assert_eq!(events[0].length, 4);
        assert_eq!(events[1].time, 4);
    }

    #[test]
    fn stray_note_off_accumulates_into_next_event_time() {
        let track = vec![
            TrackMessage::note_off(24, 0, 60, 0),
            TrackMessage::note_on(24, 0, 60, 64),
            TrackMessage::note_off(48, 0, 60, 0),
        ];
        let tempos = vec![500_000; 9];
        let events = events_for_track(&track, 0, accuracy(), &tempos, Mode::Presence);

        // the stray off at unit 2 emits nothing; its increment carries into
        // the note-on event's time
        assert_eq!(events[0].time, 0);
        assert_eq!(events[1].offset, 4);
        assert_eq!(events[1].time, 4);
    }

    #[test]
    fn rich_rows_copy_the_finalized_length() {
        let track = vec![
            TrackMessage::note_on(0, 0, 80, 100),
            TrackMessage::note_off(96, 0, 80, 0),
        ];
        let tempos = vec![500_000; 9];
        let events = events_for_track(&track, 3, accuracy(), &tempos, Mode::Rich);

        let row = match &events[0].all_notes {
            DenseRow::Rich(row) => row,
            _ => panic!("expected a rich row"),
        };
        let note = row[80].as_ref().expect("note 80 should be present");
        assert_eq!(note.length, 8);
        assert_eq!(note.offset, 0);
        assert_eq!(note.track, 3);
        assert_eq!(note.tempo, 500_000);
        assert_eq!(note.velocity, 100.0);
    }

    #[test]
    fn normalise_divides_all_velocities() {
        let track = vec![
            TrackMessage::note_on(0, 0, 60, 64),
            TrackMessage::note_off(96, 0, 60, 0),
        ];
        let tempos = vec![500_000; 9];
        let mut events = events_for_track(&track, 0, accuracy(), &tempos, Mode::Velocity);
        for event in &mut events {
            event.normalise(128.0);
        }

        match &events[0].active_notes[0].value {
            NoteValue::Velocity(value) => assert_eq!(*value, 0.5),
            _ => panic!("expected a velocity value"),
        }
        match &events[0].all_notes {
            DenseRow::Velocities(row) => assert_eq!(row[60], 0.5),
            _ => panic!("expected a velocity row"),
        }
    }
}
