//! Note-grid → MIDI encoding pipeline, the mirror of [`crate::decode`]

pub mod tempo;
pub mod track;

use crate::error::{Error, Result};
use crate::midi::{save_file, GridAccuracy, DEFAULT_GRID_RESOLUTION, NOTE_RANGE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Activation data to encode: `[time][128]` for a single track or
/// `[track][time][128]`. Values are `[0, 1]`; anything above zero sounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteTensor {
    Single(Vec<Vec<f64>>),
    Multi(Vec<Vec<Vec<f64>>>),
}

impl NoteTensor {
    fn tracks(&self) -> Vec<&Vec<Vec<f64>>> {
        match self {
            NoteTensor::Single(rows) => vec![rows],
            NoteTensor::Multi(tracks) => tracks.iter().collect(),
        }
    }

    /// Rows per track; all tracks must agree
    fn row_count(&self) -> Result<usize> {
        let tracks = self.tracks();
        let rows = tracks.first().map_or(0, |rows| rows.len());
        if tracks.iter().any(|track| track.len() != rows) {
            return Err(Error::ShapeMismatch(
                "all tracks must span the same number of grid units".into(),
            ));
        }
        for track in tracks {
            if let Some(row) = track.iter().find(|row| row.len() != NOTE_RANGE) {
                return Err(Error::ShapeMismatch(format!(
                    "grid rows must have {} slots, found {}",
                    NOTE_RANGE,
                    row.len()
                )));
            }
        }
        Ok(rows)
    }
}

/// Tempo input: one value for the whole file or one per grid row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tempos {
    Constant(u32),
    PerUnit(Vec<u32>),
}

/// Encode-side configuration
#[derive(Debug, Clone)]
pub struct EncodeConfig {
    /// Emit only changes between runs instead of restriking held notes
    pub join_notes: bool,
    /// Scale activations back to per-note velocities; otherwise every NoteOn
    /// uses `default_velocity`
    pub use_velocities: bool,
    /// Grid units per measure
    pub grid_resolution: u32,
    pub ticks_per_beat: u16,
    /// Clamped to 127 when the file is written
    pub default_velocity: u8,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            join_notes: false,
            use_velocities: false,
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            ticks_per_beat: 240,
            default_velocity: 64,
        }
    }
}

/// Assemble and save a complete MIDI file from grid data.
///
/// `event_lengths: Some(..)` marks the rows as pre-segmented event runs with
/// explicit per-run lengths; `None` means dense per-grid-unit rows that get
/// diffed into runs here. One note track is generated per input track, with
/// MIDI channels wrapped modulo 16, after the tempo meta-track.
pub fn write_midi(
    data: &NoteTensor,
    tempos: &Tempos,
    path: &Path,
    event_lengths: Option<&[u64]>,
    config: &EncodeConfig,
) -> Result<()> {
    let rows = data.row_count()?;

    let per_row_tempos: Vec<u32> = match tempos {
        Tempos::Constant(tempo) => vec![*tempo; rows],
        Tempos::PerUnit(values) => {
            let expected = match event_lengths {
                Some(lengths) => lengths.len(),
                None => rows,
            };
            if values.len() != expected {
                return Err(Error::ShapeMismatch(format!(
                    "tempo array length must match the data's time dimension ({} vs {})",
                    values.len(),
                    expected
                )));
            }
            values.clone()
        }
    };

    let accuracy = GridAccuracy::from_ticks_per_beat(config.ticks_per_beat, config.grid_resolution);
    let ticks_per_unit = accuracy.ticks_per_unit();

    let per_unit_tempos = match event_lengths {
        Some(lengths) => {
            if lengths.len() != rows {
                return Err(Error::ShapeMismatch(format!(
                    "event length array and data event dimension must be of equal length ({} vs {})",
                    lengths.len(),
                    rows
                )));
            }
            tempo::expand_tempos(&per_row_tempos, lengths)?
        }
        None => per_row_tempos,
    };

    let mut tracks = vec![tempo::tempo_track(&per_unit_tempos, ticks_per_unit)];
    let fixed_velocity = (!config.use_velocities).then_some(config.default_velocity.min(127));

    for (index, rows) in data.tracks().into_iter().enumerate() {
        let (runs, lengths) = match event_lengths {
            Some(lengths) => (track::active_pairs(rows), lengths.to_vec()),
            None => {
                let (run_rows, lengths) = track::runs_from_grid(rows);
                (track::active_pairs(&run_rows), lengths)
            }
        };
        // channels are limited to 16 in MIDI 1.0
        let channel = (index % 16) as u8;
        tracks.push(track::track_from_runs(
            &runs,
            &lengths,
            channel,
            ticks_per_unit,
            config.join_notes,
            fixed_velocity,
        )?);
    }

    log::debug!(
        "encoding {} note tracks across {} grid units to {}",
        tracks.len() - 1,
        per_unit_tempos.len(),
        path.display()
    );
    save_file(path, config.ticks_per_beat, &tracks)
}
