//! Grid quantization
//!
//! Every timestamp in a file is mapped onto a fixed time grid through a single
//! scale factor. Offsets are always derived from cumulative tick counts, never
//! from a lone delta, so rounding error cannot drift across many short
//! messages.

use super::message::Track;

/// Number of MIDI note heights
pub const NOTE_RANGE: usize = 128;

/// Default grid resolution: 1/64 of a measure per grid unit
pub const DEFAULT_GRID_RESOLUTION: u32 = 64;

/// Ticks-per-grid-unit scale factor, computed once per file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridAccuracy {
    ticks_per_unit: f64,
}

impl GridAccuracy {
    /// Decode-side accuracy from the file's pulses per quarter note and the
    /// notated 32nd-note subdivision of its time signature.
    pub fn from_file(ticks_per_beat: u16, notated_32nds: u8, grid_resolution: u32) -> Self {
        let ticks_per_unit = (ticks_per_beat as f64 * 32.0)
            / (grid_resolution as f64 * notated_32nds as f64);
        Self { ticks_per_unit }
    }

    /// Encode-side accuracy: one measure is four quarter notes
    pub fn from_ticks_per_beat(ticks_per_beat: u16, grid_resolution: u32) -> Self {
        Self {
            ticks_per_unit: 4.0 * ticks_per_beat as f64 / grid_resolution as f64,
        }
    }

    pub fn ticks_per_unit(&self) -> f64 {
        self.ticks_per_unit
    }

    /// Nearest grid unit for an absolute tick count
    pub fn units(&self, ticks: i64) -> i64 {
        (ticks as f64 / self.ticks_per_unit).round() as i64
    }

    /// Grid increment contributed by a message `delta` ticks after an absolute
    /// position of `ticks`.
    ///
    /// Rounds both cumulative positions and subtracts, never the delta alone.
    pub fn increment(&self, delta: u32, ticks: i64) -> i64 {
        self.units(ticks + delta as i64) - self.units(ticks)
    }
}

/// Length of the longest track, in grid units
pub fn grid_length(tracks: &[Track], accuracy: GridAccuracy) -> u64 {
    let mut longest = 0i64;
    for track in tracks {
        let mut ticks = 0i64;
        let mut value = 0i64;
        for msg in track {
            value += accuracy.increment(msg.delta, ticks);
            ticks += msg.delta as i64;
        }
        longest = longest.max(value);
    }
    longest.max(0) as u64
}
