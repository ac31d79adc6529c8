//! Tempo meta-track generation

use crate::error::{Error, Result};
use crate::midi::{Track, TrackMessage};

/// Translate a per-grid-unit tempo array into a meta-message track.
///
/// Emits `set_tempo` on every value change; a fractional-tick carry keeps the
/// rounded deltas from drifting against the true grid positions.
pub fn tempo_track(tempos: &[u32], ticks_per_unit: f64) -> Track {
    let mut messages = vec![TrackMessage::time_signature(0, 4, 2)];

    let mut time = 0f64;
    let mut last_tempo = 0u32;
    for &tempo in tempos {
        if tempo != last_tempo {
            let delta = time.round();
            messages.push(TrackMessage::tempo(delta as u32, tempo));
            last_tempo = tempo;
            time -= delta;
        }
        time += ticks_per_unit;
    }
    messages.push(TrackMessage::end_of_track(time.round() as u32));

    messages
}

/// Repeat per-run tempos into per-grid-unit tempos using the run lengths
pub fn expand_tempos(tempos: &[u32], run_lengths: &[u64]) -> Result<Vec<u32>> {
    if tempos.len() != run_lengths.len() {
        return Err(Error::ShapeMismatch(format!(
            "tempo and event length arrays must be of equal length ({} vs {})",
            tempos.len(),
            run_lengths.len()
        )));
    }

    let mut expanded = Vec::new();
    for (&tempo, &length) in tempos.iter().zip(run_lengths) {
        expanded.extend(std::iter::repeat(tempo).take(length as usize));
    }
    Ok(expanded)
}
