//! Integration tests for the note-grid → MIDI encode pipeline
//!
//! Generated files are read back through the container layer and checked
//! message by message.

use gridmidi::encode::{self, EncodeConfig, NoteTensor, Tempos};
use gridmidi::midi::{MessageKind, MidiSource, TrackMessage, NOTE_RANGE};
use gridmidi::Error;
use tempfile::tempdir;

fn row_with(pitches: &[(usize, f64)]) -> Vec<f64> {
    let mut row = vec![0.0; NOTE_RANGE];
    for &(pitch, value) in pitches {
        row[pitch] = value;
    }
    row
}

fn note_messages(track: &[TrackMessage]) -> Vec<&TrackMessage> {
    track.iter().filter(|msg| msg.is_note()).collect()
}

#[test]
fn single_track_grid_becomes_tempo_plus_note_track() {
    // 240 PPQ at grid 64 gives 15 ticks per grid unit
    let dir = tempdir().unwrap();
    let path = dir.path().join("single.mid");
    let data = NoteTensor::Single(vec![
        row_with(&[]),
        row_with(&[(60, 1.0)]),
        row_with(&[(60, 1.0)]),
    ]);

    encode::write_midi(
        &data,
        &Tempos::Constant(500_000),
        &path,
        None,
        &EncodeConfig::default(),
    )
    .unwrap();

    let source = MidiSource::open(&path).unwrap();
    assert_eq!(source.ticks_per_beat, 240);
    assert_eq!(source.tracks.len(), 2);

    // the meta track opens with a time signature and one tempo
    assert!(matches!(
        source.tracks[0][0].kind,
        MessageKind::TimeSignature { numerator: 4, denominator: 2, .. }
    ));
    assert_eq!(source.tracks[0][1], TrackMessage::tempo(0, 500_000));
    assert_eq!(source.tracks[0][2], TrackMessage::end_of_track(45));

    // the silent leading unit becomes the NoteOn delta, the two sounding
    // units the trailing NoteOff delta
    let notes = note_messages(&source.tracks[1]);
    assert_eq!(notes.len(), 2);
    assert_eq!(*notes[0], TrackMessage::note_on(15, 0, 60, 64));
    assert_eq!(*notes[1], TrackMessage::note_off(30, 0, 60, 0));
    assert_eq!(source.tracks[1].last(), Some(&TrackMessage::end_of_track(0)));
}

#[test]
fn multi_track_input_assigns_sequential_channels() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("multi.mid");
    let data = NoteTensor::Multi(vec![
        vec![row_with(&[(60, 1.0)]); 2],
        vec![row_with(&[(72, 1.0)]); 2],
    ]);

    encode::write_midi(
        &data,
        &Tempos::Constant(500_000),
        &path,
        None,
        &EncodeConfig::default(),
    )
    .unwrap();

    let source = MidiSource::open(&path).unwrap();
    assert_eq!(source.tracks.len(), 3);
    assert_eq!(*note_messages(&source.tracks[1])[0], TrackMessage::note_on(0, 0, 60, 64));
    assert_eq!(*note_messages(&source.tracks[2])[0], TrackMessage::note_on(0, 1, 72, 64));
}

#[test]
fn velocities_scale_activations_back_to_midi_range() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("velocities.mid");
    let data = NoteTensor::Single(vec![row_with(&[(60, 0.5), (64, 0.25)])]);

    let config = EncodeConfig {
        use_velocities: true,
        ..EncodeConfig::default()
    };
    encode::write_midi(&data, &Tempos::Constant(500_000), &path, None, &config).unwrap();

    let source = MidiSource::open(&path).unwrap();
    let notes = note_messages(&source.tracks[1]);
    assert_eq!(*notes[0], TrackMessage::note_on(0, 0, 60, 64));
    assert_eq!(*notes[1], TrackMessage::note_on(0, 0, 64, 32));
}

#[test]
fn default_velocity_overrides_activation_strength() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flat.mid");
    let data = NoteTensor::Single(vec![row_with(&[(60, 0.3)])]);

    let config = EncodeConfig {
        default_velocity: 100,
        ..EncodeConfig::default()
    };
    encode::write_midi(&data, &Tempos::Constant(500_000), &path, None, &config).unwrap();

    let source = MidiSource::open(&path).unwrap();
    let notes = note_messages(&source.tracks[1]);
    assert_eq!(*notes[0], TrackMessage::note_on(0, 0, 60, 100));
}

#[test]
fn default_velocity_is_clamped_to_the_midi_range() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("loud.mid");
    let data = NoteTensor::Single(vec![row_with(&[(60, 1.0)])]);

    let config = EncodeConfig {
        default_velocity: 200,
        ..EncodeConfig::default()
    };
    encode::write_midi(&data, &Tempos::Constant(500_000), &path, None, &config).unwrap();

    let source = MidiSource::open(&path).unwrap();
    let notes = note_messages(&source.tracks[1]);
    assert_eq!(*notes[0], TrackMessage::note_on(0, 0, 60, 127));
}

#[test]
fn presegmented_runs_use_explicit_lengths_and_per_run_tempos() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("runs.mid");
    // two runs: pitch 60 for 2 units, then pitch 62 for 3 units
    let data = NoteTensor::Single(vec![row_with(&[(60, 1.0)]), row_with(&[(62, 1.0)])]);
    let tempos = Tempos::PerUnit(vec![500_000, 250_000]);

    encode::write_midi(
        &data,
        &tempos,
        &path,
        Some(&[2, 3]),
        &EncodeConfig::default(),
    )
    .unwrap();

    let source = MidiSource::open(&path).unwrap();

    // the tempo change lands where the first run ends
    assert_eq!(source.tracks[0][1], TrackMessage::tempo(0, 500_000));
    assert_eq!(source.tracks[0][2], TrackMessage::tempo(30, 250_000));
    assert_eq!(source.tracks[0][3], TrackMessage::end_of_track(45));

    let notes = note_messages(&source.tracks[1]);
    assert_eq!(*notes[0], TrackMessage::note_on(0, 0, 60, 64));
    assert_eq!(*notes[1], TrackMessage::note_off(30, 0, 60, 0));
    assert_eq!(*notes[2], TrackMessage::note_on(0, 0, 62, 64));
    assert_eq!(*notes[3], TrackMessage::note_off(45, 0, 62, 0));
}

#[test]
fn narrow_rows_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("narrow.mid");
    let data = NoteTensor::Single(vec![vec![0.0; 100]]);

    let result = encode::write_midi(
        &data,
        &Tempos::Constant(500_000),
        &path,
        None,
        &EncodeConfig::default(),
    );
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn ragged_track_lengths_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ragged.mid");
    let data = NoteTensor::Multi(vec![
        vec![row_with(&[]); 2],
        vec![row_with(&[]); 3],
    ]);

    let result = encode::write_midi(
        &data,
        &Tempos::Constant(500_000),
        &path,
        None,
        &EncodeConfig::default(),
    );
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn tempo_array_must_match_the_time_dimension() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tempos.mid");
    let data = NoteTensor::Single(vec![row_with(&[(60, 1.0)]); 3]);

    let result = encode::write_midi(
        &data,
        &Tempos::PerUnit(vec![500_000]),
        &path,
        None,
        &EncodeConfig::default(),
    );
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}

#[test]
fn event_lengths_must_match_the_run_count() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("lengths.mid");
    let data = NoteTensor::Single(vec![row_with(&[(60, 1.0)]); 2]);

    let result = encode::write_midi(
        &data,
        &Tempos::PerUnit(vec![500_000]),
        &path,
        Some(&[4]),
        &EncodeConfig::default(),
    );
    assert!(matches!(result, Err(Error::ShapeMismatch(_))));
}
