//! MIDI → note-grid decoding pipeline
//!
//! A file flows through accuracy resolution, tempo lookup construction, track
//! canonicalization and event building before being flattened into one of the
//! two output shapes. Every stage owns its data; nothing here blocks beyond
//! the initial read, so callers may decode many files in parallel.

pub mod clean;
pub mod event;
pub mod export;
pub mod tempo;

pub use event::{octave_of, tone_of, ActiveElement, Event, EventNote, NoteValue, SeparateNote};
pub use export::{EventNotes, NoteArray, SequenceEvent, SequenceOutput};

use crate::error::Result;
use crate::midi::{grid_length, GridAccuracy, MidiSource, Track, DEFAULT_GRID_RESOLUTION};
use std::path::Path;

/// Note representation of the decoded output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Active pitches as booleans
    Presence,
    /// Active pitches with normalized velocities
    Velocity,
    /// Active pitches as notes with timing and track metadata
    Rich,
}

/// Velocity normalization strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Divide by the full MIDI range (128)
    Fixed,
    /// Divide by the highest NoteOn velocity observed in the file
    ObservedMax,
}

/// Decode-side configuration; the pipeline keeps no module-level state
#[derive(Debug, Clone)]
pub struct DecodeConfig {
    pub mode: Mode,
    /// Merge all note tracks into one before building events
    pub join_tracks: bool,
    /// Export only sounding pitches instead of dense 128-slot rows
    pub only_active_notes: bool,
    /// Grid units per measure
    pub grid_resolution: u32,
    pub normalization: Normalization,
    /// Note tracks with at most this many messages are dropped up front
    pub track_length_threshold: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Presence,
            join_tracks: false,
            only_active_notes: true,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            normalization: Normalization::Fixed,
            track_length_threshold: 10,
        }
    }
}

/// A file after canonicalization, ready for event building
struct PreparedFile {
    accuracy: GridAccuracy,
    grid_len: u64,
    tempos: Vec<u32>,
    note_tracks: Vec<Track>,
}

fn prepare_file(path: &Path, config: &DecodeConfig) -> Result<PreparedFile> {
    let mut source = MidiSource::open(path)?;
    let accuracy = source.accuracy(config.grid_resolution);
    clean::remove_short_tracks(&mut source.tracks, config.track_length_threshold);

    let tempo_track = source.tracks.first().cloned().unwrap_or_default();
    let raw_note_tracks = if source.tracks.len() > 1 {
        &source.tracks[1..]
    } else {
        &[]
    };

    let mut note_tracks: Vec<Track> = if config.join_tracks {
        vec![clean::combine_and_clean_tracks(raw_note_tracks)]
    } else {
        raw_note_tracks
            .iter()
            .map(|track| clean::combine_and_clean_tracks(std::slice::from_ref(track)))
            .collect()
    };
    note_tracks.retain(|track| !track.is_empty());

    if note_tracks.is_empty() {
        return Err(crate::error::Error::EmptyFile);
    }

    let trimmed_ticks = clean::trim_leading_silence(&mut note_tracks);
    let grid_len = grid_length(&note_tracks, accuracy);
    let tempos = tempo::tempo_array(&tempo_track, grid_len, accuracy, trimmed_ticks);

    log::debug!(
        "prepared {}: {} note tracks, {} grid units, trimmed {} ticks",
        path.display(),
        note_tracks.len(),
        grid_len,
        trimmed_ticks
    );

    Ok(PreparedFile {
        accuracy,
        grid_len,
        tempos,
        note_tracks,
    })
}

/// Build normalized event sequences, one per note track
fn initialise_sequences(path: &Path, config: &DecodeConfig) -> Result<(PreparedFile, Vec<Vec<Event>>)> {
    let prepared = prepare_file(path, config)?;

    let mut sequences: Vec<Vec<Event>> = prepared
        .note_tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            event::events_for_track(track, index, prepared.accuracy, &prepared.tempos, config.mode)
        })
        .collect();

    let divisor = match config.normalization {
        Normalization::Fixed => 128.0,
        Normalization::ObservedMax => {
            f64::from(export::max_note_velocity(&prepared.note_tracks)).max(1.0)
        }
    };
    for sequence in &mut sequences {
        for event in sequence.iter_mut() {
            event.normalise(divisor);
        }
    }

    Ok((prepared, sequences))
}

/// Decode a file into the sparse per-event shape
pub fn sequence_of_notes(path: &Path, config: &DecodeConfig) -> Result<SequenceOutput> {
    let (_, sequences) = initialise_sequences(path, config)?;
    Ok(export::sequence_output(
        &sequences,
        config.mode,
        config.only_active_notes,
    ))
}

/// Decode a file into the dense `[track][grid unit][128]` shape
pub fn array_of_notes(path: &Path, config: &DecodeConfig) -> Result<NoteArray> {
    let (prepared, sequences) = initialise_sequences(path, config)?;
    Ok(export::array_output(&sequences, prepared.grid_len, config.mode))
}

/// Per-grid-unit tempo array of a file, optionally after the same cleaning
/// and trimming the note pipeline applies. The closing sentinel slot is
/// stripped.
pub fn tempo_array_of_file(path: &Path, trim: bool, grid_resolution: u32) -> Result<Vec<u32>> {
    let mut tempos = if trim {
        let config = DecodeConfig {
            grid_resolution,
            ..DecodeConfig::default()
        };
        prepare_file(path, &config)?.tempos
    } else {
        let source = MidiSource::open(path)?;
        let accuracy = source.accuracy(grid_resolution);
        let grid_len = if source.tracks.len() > 1 {
            grid_length(&source.tracks[1..], accuracy)
        } else {
            0
        };
        let tempo_track = source.tracks.first().cloned().unwrap_or_default();
        tempo::tempo_array(&tempo_track, grid_len, accuracy, 0)
    };
    tempos.pop();
    Ok(tempos)
}
