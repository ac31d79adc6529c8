//! Track canonicalization
//!
//! MIDI exported from notation software frequently carries duplicate or
//! overlapping NoteOn events for one pitch (multi-voice encoding). A per-pitch
//! overlap counter reduces them to a clean alternating on/off stream: NoteOn
//! is emitted on the 0→1 transition only, NoteOff on 1→0. Ticks of suppressed
//! messages are not dropped; they accumulate into a carried delta added to the
//! next emitted timestamp, so overall timing is preserved.

use crate::midi::{MessageKind, Track, TrackMessage, NOTE_RANGE};

/// Combine one or more raw tracks into a single canonical note track
pub fn combine_and_clean_tracks(tracks: &[Track]) -> Track {
    let tracks: Vec<Track> = tracks.iter().map(|t| synthesize_note_offs(t)).collect();

    // flatten to absolute (offset, message) pairs, note messages only;
    // tracks are concatenated in order, not interleaved
    let mut raw_messages: Vec<(i64, TrackMessage)> = Vec::new();
    for track in &tracks {
        let mut offset = 0i64;
        for msg in track {
            offset += msg.delta as i64;
            if msg.is_note() {
                raw_messages.push((offset, msg.clone()));
            }
        }
    }

    let mut note_grid = [0i32; NOTE_RANGE];
    let mut filtered: Vec<(i64, TrackMessage)> = Vec::new();
    let mut last_message_time = 0i64;
    let mut delta_error = 0i64;

    for (time, msg) in raw_messages {
        match msg.kind {
            MessageKind::NoteOn { key, .. } => {
                if note_grid[key as usize] == 0 {
                    filtered.push((time + delta_error, msg));
                    delta_error = 0;
                    note_grid[key as usize] = 1;
                } else {
                    // overlapping voices: the later note's metadata is lost
                    note_grid[key as usize] += 1;
                    delta_error += time - last_message_time;
                }
                last_message_time = time;
            }
            MessageKind::NoteOff { key, .. } => {
                if note_grid[key as usize] == 1 {
                    filtered.push((time + delta_error, msg));
                    delta_error = 0;
                    note_grid[key as usize] = 0;
                } else {
                    if note_grid[key as usize] > 1 {
                        note_grid[key as usize] -= 1;
                    }
                    delta_error += time - last_message_time;
                }
                last_message_time = time;
            }
            _ => {
                delta_error += time - last_message_time;
                last_message_time = time;
            }
        }
    }

    filtered.sort_by_key(|(time, _)| *time);

    // re-derive relative deltas from consecutive absolute offsets
    let mut messages = Track::with_capacity(filtered.len());
    let mut offset = 0i64;
    for (time, mut msg) in filtered {
        msg.delta = (time - offset).max(0) as u32;
        offset += msg.delta as i64;
        messages.push(msg);
    }

    messages
}

/// Rewrite zero-velocity NoteOn into NoteOff, but only for a track that has
/// no explicit NoteOff at all (files encoding note-off solely via velocity 0).
/// Tracks mixing both conventions are deliberately left alone.
fn synthesize_note_offs(track: &Track) -> Track {
    let has_note_off = track
        .iter()
        .any(|msg| matches!(msg.kind, MessageKind::NoteOff { .. }));
    if has_note_off {
        return track.clone();
    }

    track
        .iter()
        .map(|msg| match msg.kind {
            MessageKind::NoteOn {
                channel,
                key,
                velocity: 0,
            } => TrackMessage::note_off(msg.delta, channel, key, 0),
            _ => msg.clone(),
        })
        .collect()
}

/// Drop note tracks with at most `threshold` messages; track 0 stays
pub fn remove_short_tracks(tracks: &mut Vec<Track>, threshold: usize) {
    let mut index = tracks.len();
    while index > 1 {
        index -= 1;
        if tracks[index].len() <= threshold {
            tracks.remove(index);
        }
    }
}

/// Subtract the minimum leading silence across note tracks from each track's
/// first message, returning the trimmed tick count for the tempo builder.
pub fn trim_leading_silence(note_tracks: &mut [Track]) -> u32 {
    let min_time = note_tracks
        .iter()
        .filter_map(|track| track.first().map(|msg| msg.delta))
        .min()
        .unwrap_or(0);

    if min_time > 0 {
        for track in note_tracks.iter_mut() {
            if let Some(first) = track.first_mut() {
                first.delta -= min_time;
            }
        }
    }

    min_time
}
