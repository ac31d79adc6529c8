//! Owned MIDI message model
//!
//! Parsed `midly` events are converted into these owned values immediately
//! after parsing, so no borrowed file data crosses pipeline stages and tracks
//! can be cloned and rewritten freely.

use midly::num::{u15, u24, u28, u4, u7};
use midly::{MetaMessage, MidiMessage, TrackEvent, TrackEventKind};

/// A single track message with its relative delta time in MIDI ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMessage {
    /// Ticks since the previous message on the same track
    pub delta: u32,
    pub kind: MessageKind,
}

/// The subset of MIDI messages the codec understands
///
/// Anything else parses into `Other` so deltas keep accumulating correctly,
/// but is never re-emitted when a file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    Tempo(u32),
    TimeSignature {
        numerator: u8,
        /// Power-of-two exponent, as stored in the file
        denominator: u8,
        clocks_per_click: u8,
        notated_32nds: u8,
    },
    EndOfTrack,
    Other,
}

/// An ordered message list with relative deltas
pub type Track = Vec<TrackMessage>;

impl TrackMessage {
    pub fn note_on(delta: u32, channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            delta,
            kind: MessageKind::NoteOn {
                channel,
                key,
                velocity,
            },
        }
    }

    pub fn note_off(delta: u32, channel: u8, key: u8, velocity: u8) -> Self {
        Self {
            delta,
            kind: MessageKind::NoteOff {
                channel,
                key,
                velocity,
            },
        }
    }

    pub fn tempo(delta: u32, tempo: u32) -> Self {
        Self {
            delta,
            kind: MessageKind::Tempo(tempo),
        }
    }

    /// `denominator` is the raw SMF byte, a power-of-two exponent (2 = 4/4)
    pub fn time_signature(delta: u32, numerator: u8, denominator: u8) -> Self {
        Self {
            delta,
            kind: MessageKind::TimeSignature {
                numerator,
                denominator,
                clocks_per_click: 24,
                notated_32nds: 8,
            },
        }
    }

    pub fn end_of_track(delta: u32) -> Self {
        Self {
            delta,
            kind: MessageKind::EndOfTrack,
        }
    }

    /// True for NoteOn/NoteOff
    pub fn is_note(&self) -> bool {
        matches!(
            self.kind,
            MessageKind::NoteOn { .. } | MessageKind::NoteOff { .. }
        )
    }
}

impl From<&TrackEvent<'_>> for TrackMessage {
    fn from(event: &TrackEvent<'_>) -> Self {
        let delta = event.delta.as_int();
        let kind = match event.kind {
            TrackEventKind::Midi { channel, message } => match message {
                MidiMessage::NoteOn { key, vel } => MessageKind::NoteOn {
                    channel: channel.as_int(),
                    key: key.as_int(),
                    velocity: vel.as_int(),
                },
                MidiMessage::NoteOff { key, vel } => MessageKind::NoteOff {
                    channel: channel.as_int(),
                    key: key.as_int(),
                    velocity: vel.as_int(),
                },
                _ => MessageKind::Other,
            },
            TrackEventKind::Meta(meta) => match meta {
                MetaMessage::Tempo(tempo) => MessageKind::Tempo(tempo.as_int()),
                MetaMessage::TimeSignature(numerator, denominator, clocks_per_click, notated) => {
                    MessageKind::TimeSignature {
                        numerator,
                        denominator,
                        clocks_per_click,
                        notated_32nds: notated,
                    }
                }
                MetaMessage::EndOfTrack => MessageKind::EndOfTrack,
                _ => MessageKind::Other,
            },
            _ => MessageKind::Other,
        };
        Self { delta, kind }
    }
}

impl TrackMessage {
    /// Translate back into a `midly` event; `Other` carries no payload and
    /// returns `None`.
    pub fn to_event(&self) -> Option<TrackEvent<'static>> {
        let delta = u28::new(self.delta);
        let kind = match self.kind {
            MessageKind::NoteOn {
                channel,
                key,
                velocity,
            } => TrackEventKind::Midi {
                channel: u4::new(channel),
                message: MidiMessage::NoteOn {
                    key: u7::new(key),
                    vel: u7::new(velocity),
                },
            },
            MessageKind::NoteOff {
                channel,
                key,
                velocity,
            } => TrackEventKind::Midi {
                channel: u4::new(channel),
                message: MidiMessage::NoteOff {
                    key: u7::new(key),
                    vel: u7::new(velocity),
                },
            },
            MessageKind::Tempo(tempo) => TrackEventKind::Meta(MetaMessage::Tempo(u24::new(tempo))),
            MessageKind::TimeSignature {
                numerator,
                denominator,
                clocks_per_click,
                notated_32nds,
            } => TrackEventKind::Meta(MetaMessage::TimeSignature(
                numerator,
                denominator,
                clocks_per_click,
                notated_32nds,
            )),
            MessageKind::EndOfTrack => TrackEventKind::Meta(MetaMessage::EndOfTrack),
            MessageKind::Other => return None,
        };
        Some(TrackEvent { delta, kind })
    }
}

/// Timing division helper for assembled files
pub fn metrical(ticks_per_beat: u16) -> midly::Timing {
    midly::Timing::Metrical(u15::new(ticks_per_beat))
}
