//! Dense per-grid-unit tempo lookup built from the meta track

use crate::midi::{GridAccuracy, MessageKind, TrackMessage};

/// Default MIDI tempo in microseconds per quarter note
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Translate the meta track into one tempo value per grid unit, with one
/// extra slot for the closing event.
///
/// `initial_ticks` shifts the reference point backwards when leading silence
/// was trimmed from the note tracks. Offsets always come from cumulative tick
/// counts (two rounds, then subtract); all indices are clamped to
/// `[0, length + 1]` and any remaining tail is filled with the last tempo.
pub fn tempo_array(
    tempo_track: &[TrackMessage],
    length: u64,
    accuracy: GridAccuracy,
    initial_ticks: u32,
) -> Vec<u32> {
    let slots = length as usize + 1;
    let mut tempos = vec![0u32; slots];

    let mut ticks = -(initial_ticks as i64);
    let mut offset = -accuracy.units(initial_ticks as i64);
    let mut tempo = DEFAULT_TEMPO;

    for msg in tempo_track {
        let increment = accuracy.increment(msg.delta, ticks);
        let begin = offset.clamp(0, slots as i64) as usize;
        let end = (offset + increment).clamp(0, slots as i64) as usize;
        for slot in &mut tempos[begin..end] {
            *slot = tempo;
        }
        ticks += msg.delta as i64;
        offset += increment;

        if let MessageKind::Tempo(value) = msg.kind {
            tempo = value;
        }

        if offset > slots as i64 {
            break;
        }
    }

    let tail = offset.clamp(0, slots as i64) as usize;
    for slot in &mut tempos[tail..] {
        *slot = tempo;
    }

    tempos
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::TrackMessage;

    fn accuracy() -> GridAccuracy {
        // 12 ticks per grid unit
        GridAccuracy::from_file(192, 8, 64)
    }

    #[test]
    fn default_tempo_fills_everything_without_messages() {
        let tempos = tempo_array(&[], 8, accuracy(), 0);
        assert_eq!(tempos, vec![DEFAULT_TEMPO; 9]);
    }

    #[test]
    fn set_tempo_switches_at_its_grid_offset() {
        let track = vec![
            TrackMessage::time_signature(0, 4, 2),
            TrackMessage::tempo(0, 500_000),
            TrackMessage::tempo(48, 250_000),
            TrackMessage::end_of_track(24),
        ];
        let tempos = tempo_array(&track, 8, accuracy(), 0);
        // 48 ticks = 4 grid units: default up to there, then the new tempo
        assert_eq!(&tempos[..4], &[500_000; 4]);
        assert_eq!(&tempos[4..], &[250_000; 5]);
    }

    #[test]
    fn tail_is_filled_with_last_known_tempo() {
        let track = vec![
            TrackMessage::tempo(0, 400_000),
            TrackMessage::end_of_track(12),
        ];
        let tempos = tempo_array(&track, 6, accuracy(), 0);
        assert_eq!(tempos, vec![400_000; 7]);
    }

    #[test]
    fn initial_ticks_shift_the_reference_point() {
        let track = vec![
            TrackMessage::tempo(0, 500_000),
            TrackMessage::tempo(48, 250_000),
            TrackMessage::end_of_track(48),
        ];
        // trimming 24 ticks of leading silence moves the change 2 units earlier
        let tempos = tempo_array(&track, 8, accuracy(), 24);
        assert_eq!(&tempos[..2], &[500_000; 2]);
        assert_eq!(&tempos[2..], &[250_000; 7]);
    }
}
