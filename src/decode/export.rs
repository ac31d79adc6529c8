//! Output shapes: sparse per-event sequences and dense time-grid arrays

use super::event::{DenseRow, Event, EventNote, NoteValue, SeparateNote};
use super::Mode;
use crate::midi::{MessageKind, Track, NOTE_RANGE};
use serde::Serialize;

/// Highest NoteOn velocity across the given tracks
pub fn max_note_velocity(tracks: &[Track]) -> u8 {
    tracks
        .iter()
        .flatten()
        .filter_map(|msg| match msg.kind {
            MessageKind::NoteOn { velocity, .. } => Some(velocity),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// Notes of one exported event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EventNotes {
    /// Active heights (presence mode)
    Heights(Vec<u8>),
    /// Active (height, velocity) pairs
    Velocities(Vec<(u8, f64)>),
    /// Active notes with metadata
    Rich(Vec<EventNote>),
    /// Dense 128-slot presence row
    DensePresence(Vec<bool>),
    /// Dense 128-slot velocity row
    DenseVelocities(Vec<f64>),
    /// Dense 128-slot rich row
    DenseRich(Vec<Option<SeparateNote>>),
}

/// One exported event: its length in grid units plus its notes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceEvent {
    pub length: u64,
    pub notes: EventNotes,
}

/// Sparse output: per track, an ordered event list.
/// A single entry when tracks were joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceOutput {
    pub tracks: Vec<Vec<SequenceEvent>>,
}

/// Dense output of shape `[track][grid unit][128]`.
/// A single track entry when tracks were joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum NoteArray {
    Presence(Vec<Vec<Vec<bool>>>),
    Velocities(Vec<Vec<Vec<f64>>>),
    Rich(Vec<Vec<Vec<Option<SeparateNote>>>>),
}

impl NoteArray {
    pub fn track_count(&self) -> usize {
        match self {
            NoteArray::Presence(tracks) => tracks.len(),
            NoteArray::Velocities(tracks) => tracks.len(),
            NoteArray::Rich(tracks) => tracks.len(),
        }
    }

    pub fn grid_length(&self) -> usize {
        match self {
            NoteArray::Presence(tracks) => tracks.first().map_or(0, Vec::len),
            NoteArray::Velocities(tracks) => tracks.first().map_or(0, Vec::len),
            NoteArray::Rich(tracks) => tracks.first().map_or(0, Vec::len),
        }
    }

    /// `[0, 1]` activations for the encode side: presence becomes 1.0,
    /// rich notes their normalized velocity.
    pub fn to_activations(&self) -> Vec<Vec<Vec<f64>>> {
        match self {
            NoteArray::Presence(tracks) => tracks
                .iter()
                .map(|rows| {
                    rows.iter()
                        .map(|row| row.iter().map(|&on| if on { 1.0 } else { 0.0 }).collect())
                        .collect()
                })
                .collect(),
            NoteArray::Velocities(tracks) => tracks.clone(),
            NoteArray::Rich(tracks) => tracks
                .iter()
                .map(|rows| {
                    rows.iter()
                        .map(|row| {
                            row.iter()
                                .map(|slot| slot.as_ref().map_or(0.0, |note| note.velocity))
                                .collect()
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

/// Flatten event sequences into the sparse per-event output shape
pub fn sequence_output(sequences: &[Vec<Event>], mode: Mode, only_active_notes: bool) -> SequenceOutput {
    let tracks = sequences
        .iter()
        .map(|sequence| {
            sequence
                .iter()
                .map(|event| SequenceEvent {
                    length: event.length,
                    notes: event_notes(event, mode, only_active_notes),
                })
                .collect()
        })
        .collect();

    SequenceOutput { tracks }
}

fn event_notes(event: &Event, mode: Mode, only_active_notes: bool) -> EventNotes {
    if only_active_notes {
        match mode {
            Mode::Presence => {
                EventNotes::Heights(event.active_notes.iter().map(|e| e.height).collect())
            }
            Mode::Velocity => EventNotes::Velocities(
                event
                    .active_notes
                    .iter()
                    .map(|e| match e.value {
                        NoteValue::Velocity(value) => (e.height, value),
                        _ => (e.height, 0.0),
                    })
                    .collect(),
            ),
            Mode::Rich => EventNotes::Rich(
                event
                    .active_notes
                    .iter()
                    .filter_map(|e| match &e.value {
                        NoteValue::Note(note) => Some(note.clone()),
                        _ => None,
                    })
                    .collect(),
            ),
        }
    } else {
        match &event.all_notes {
            DenseRow::Presence(row) => EventNotes::DensePresence(row.clone()),
            DenseRow::Velocities(row) => EventNotes::DenseVelocities(row.clone()),
            DenseRow::Rich(row) => EventNotes::DenseRich(row.clone()),
        }
    }
}

/// Write each event's dense row into every grid slot it spans
pub fn array_output(sequences: &[Vec<Event>], grid_len: u64, mode: Mode) -> NoteArray {
    let grid_len = grid_len as usize;

    match mode {
        Mode::Presence => {
            let mut tracks = vec![vec![vec![false; NOTE_RANGE]; grid_len]; sequences.len()];
            for (track, sequence) in tracks.iter_mut().zip(sequences) {
                for event in sequence {
                    if let DenseRow::Presence(row) = &event.all_notes {
                        fill_span(track, event, row);
                    }
                }
            }
            NoteArray::Presence(tracks)
        }
        Mode::Velocity => {
            let mut tracks = vec![vec![vec![0f64; NOTE_RANGE]; grid_len]; sequences.len()];
            for (track, sequence) in tracks.iter_mut().zip(sequences) {
                for event in sequence {
                    if let DenseRow::Velocities(row) = &event.all_notes {
                        fill_span(track, event, row);
                    }
                }
            }
            NoteArray::Velocities(tracks)
        }
        Mode::Rich => {
            let mut tracks: Vec<Vec<Vec<Option<SeparateNote>>>> =
                vec![vec![vec![None; NOTE_RANGE]; grid_len]; sequences.len()];
            for (track, sequence) in tracks.iter_mut().zip(sequences) {
                for event in sequence {
                    if let DenseRow::Rich(row) = &event.all_notes {
                        fill_span(track, event, row);
                    }
                }
            }
            NoteArray::Rich(tracks)
        }
    }
}

fn fill_span<T: Clone>(track: &mut [Vec<T>], event: &Event, row: &[T]) {
    let len = track.len();
    let begin = (event.offset as usize).min(len);
    let end = ((event.offset + event.length) as usize).min(len);
    for slot in &mut track[begin..end] {
        slot.clone_from_slice(row);
    }
}
