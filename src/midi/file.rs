//! MIDI file open/validate and assembly

use super::grid::GridAccuracy;
use super::message::{metrical, MessageKind, Track, TrackMessage};
use crate::error::{Error, Result};
use midly::{Format, Header, Smf, Timing, TrackEvent};
use std::fs;
use std::path::Path;

/// Default beat subdivision when the file carries no time signature
const DEFAULT_NOTATED_32NDS: u8 = 8;

/// An opened MIDI file with all tracks converted to the owned message model
///
/// Track 0 is the meta/tempo track; every following track is a note track.
#[derive(Debug, Clone)]
pub struct MidiSource {
    pub ticks_per_beat: u16,
    pub tracks: Vec<Track>,
}

impl MidiSource {
    /// Open and validate a `.mid` file.
    ///
    /// Rejects non-`.mid` paths, unreadable or unparsable containers, files
    /// without metrical timing, and type 2 (asynchronous) files, which have no
    /// global timeline to quantize against.
    pub fn open(path: &Path) -> Result<Self> {
        match path.extension() {
            Some(ext) if ext == "mid" => {}
            _ => return Err(Error::InvalidExtension(path.to_path_buf())),
        }

        let bytes = fs::read(path).map_err(|e| Error::CorruptFile(e.to_string()))?;
        let smf = Smf::parse(&bytes).map_err(|e| Error::CorruptFile(e.to_string()))?;

        if smf.header.format == Format::Sequential {
            return Err(Error::UnsupportedFileOrganization);
        }

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(ticks) => ticks.as_int(),
            Timing::Timecode(..) => {
                return Err(Error::CorruptFile(
                    "SMPTE timecode division is not supported".into(),
                ))
            }
        };

        let tracks: Vec<Track> = smf
            .tracks
            .iter()
            .map(|track| track.iter().map(TrackMessage::from).collect())
            .collect();

        log::debug!(
            "opened {}: {} tracks, {} ticks per beat",
            path.display(),
            tracks.len(),
            ticks_per_beat
        );

        Ok(Self {
            ticks_per_beat,
            tracks,
        })
    }

    /// Notated 32nd notes per beat from the first time signature of the meta
    /// track, defaulting to 8 when absent.
    pub fn notated_32nds(&self) -> u8 {
        self.tracks
            .first()
            .and_then(|track| {
                track.iter().find_map(|msg| match msg.kind {
                    MessageKind::TimeSignature { notated_32nds, .. } => Some(notated_32nds),
                    _ => None,
                })
            })
            .unwrap_or(DEFAULT_NOTATED_32NDS)
    }

    /// Tick-to-grid scale factor for this file
    pub fn accuracy(&self, grid_resolution: u32) -> GridAccuracy {
        GridAccuracy::from_file(self.ticks_per_beat, self.notated_32nds(), grid_resolution)
    }
}

/// Assemble a type 1 file from a meta/tempo track plus note tracks and save it
pub fn save_file(path: &Path, ticks_per_beat: u16, tracks: &[Track]) -> Result<()> {
    let header = Header::new(Format::Parallel, metrical(ticks_per_beat));
    let mut smf = Smf::new(header);

    for track in tracks {
        let events: Vec<TrackEvent> = track.iter().filter_map(TrackMessage::to_event).collect();
        smf.tracks.push(events);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    smf.save(path).map_err(Error::Io)?;
    log::debug!("saved {} ({} tracks)", path.display(), tracks.len());
    Ok(())
}
