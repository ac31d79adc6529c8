//! MIDI container layer: owned message model, grid quantization and file I/O

pub mod file;
pub mod grid;
pub mod message;

pub use file::{save_file, MidiSource};
pub use grid::{grid_length, GridAccuracy, DEFAULT_GRID_RESOLUTION, NOTE_RANGE};
pub use message::{MessageKind, Track, TrackMessage};
