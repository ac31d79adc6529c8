//! Note-track generation from grid rows

use crate::error::{Error, Result};
use crate::midi::{Track, TrackMessage};

/// Diff consecutive grid rows into run boundaries: returns the distinct rows
/// and how many grid units each one spans.
pub fn runs_from_grid(rows: &[Vec<f64>]) -> (Vec<Vec<f64>>, Vec<u64>) {
    let mut runs = Vec::new();
    let mut lengths = Vec::new();

    let Some(first) = rows.first() else {
        return (runs, lengths);
    };

    let mut current = first;
    let mut length = 0u64;
    for row in rows {
        if row != current {
            runs.push(current.clone());
            lengths.push(length);
            current = row;
            length = 0;
        }
        length += 1;
    }
    runs.push(current.clone());
    lengths.push(length);

    (runs, lengths)
}

/// Convert activation rows into `(pitch, velocity)` pairs: anything above
/// zero sounds, velocities scale from `[0, 1]` back to MIDI's range, clamped.
pub fn active_pairs(rows: &[Vec<f64>]) -> Vec<Vec<(u8, u8)>> {
    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter(|(_, &value)| value > 0.0)
                .map(|(pitch, &value)| {
                    let velocity = ((value * 128.0).round() as i64).min(127) as u8;
                    (pitch as u8, velocity)
                })
                .collect()
        })
        .collect()
}

/// Thread NoteOn/NoteOff messages across consecutive runs.
///
/// With `join_notes`, only the symmetric difference of the active sets emits
/// messages, so held notes produce nothing; otherwise every run closes all
/// previous notes and reopens all current ones. `fixed_velocity` overrides
/// per-note velocities on every NoteOn.
pub fn track_from_runs(
    runs: &[Vec<(u8, u8)>],
    run_lengths: &[u64],
    channel: u8,
    ticks_per_unit: f64,
    join_notes: bool,
    fixed_velocity: Option<u8>,
) -> Result<Track> {
    if runs.len() != run_lengths.len() {
        return Err(Error::ShapeMismatch(format!(
            "event length array and data event dimension must be of equal length ({} vs {})",
            run_lengths.len(),
            runs.len()
        )));
    }

    let mut messages = Track::new();
    let mut last_run: Vec<(u8, u8)> = Vec::new();
    let mut time = 0u64;

    for (run, &length) in runs.iter().zip(run_lengths) {
        let (closed, opened): (Vec<(u8, u8)>, Vec<(u8, u8)>) = if join_notes {
            (
                last_run.iter().filter(|e| !run.contains(e)).copied().collect(),
                run.iter().filter(|e| !last_run.contains(e)).copied().collect(),
            )
        } else {
            (last_run.clone(), run.clone())
        };

        for (pitch, _) in closed {
            messages.push(TrackMessage::note_off(
                delta_ticks(&mut time, ticks_per_unit),
                channel,
                pitch,
                0,
            ));
        }
        for (pitch, velocity) in opened {
            messages.push(TrackMessage::note_on(
                delta_ticks(&mut time, ticks_per_unit),
                channel,
                pitch,
                fixed_velocity.unwrap_or(velocity),
            ));
        }

        last_run = run.clone();
        time += length;
    }

    for (pitch, _) in last_run {
        messages.push(TrackMessage::note_off(
            delta_ticks(&mut time, ticks_per_unit),
            channel,
            pitch,
            0,
        ));
    }

    messages.push(TrackMessage::end_of_track(0));
    Ok(messages)
}

/// Consume the accumulated grid units into a rounded tick delta
fn delta_ticks(time: &mut u64, ticks_per_unit: f64) -> u32 {
    let delta = (*time as f64 * ticks_per_unit).round() as u32;
    *time = 0;
    delta
}
