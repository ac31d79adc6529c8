use clap::{Parser, Subcommand, ValueEnum};
use gridmidi::decode::{self, DecodeConfig, Mode, Normalization};
use gridmidi::encode::{self, EncodeConfig, NoteTensor, Tempos};
use gridmidi::midi::DEFAULT_GRID_RESOLUTION;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gridmidi")]
#[command(version = "0.1.0")]
#[command(about = "MIDI <-> time-quantized note grid codec", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a MIDI file into JSON note sequences or arrays
    Decode {
        /// Input MIDI file
        input: PathBuf,

        /// Output JSON file (writes to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Note representation
        #[arg(short, long, value_enum, default_value_t = CliMode::Presence)]
        mode: CliMode,

        /// Emit a dense time-grid array instead of per-event sequences
        #[arg(long)]
        array: bool,

        /// Merge all note tracks into one
        #[arg(long)]
        join_tracks: bool,

        /// Emit dense 128-slot rows instead of only active notes
        #[arg(long)]
        all_notes: bool,

        /// Grid units per measure
        #[arg(long, default_value_t = DEFAULT_GRID_RESOLUTION)]
        grid_resolution: u32,

        /// Normalize velocities by the file's observed maximum instead of 128
        #[arg(long)]
        normalize_observed: bool,

        /// Drop note tracks with at most this many messages
        #[arg(long, default_value_t = 10)]
        track_threshold: usize,
    },

    /// Encode a JSON grid document into a MIDI file
    Encode {
        /// Input JSON document: { "data": .., "tempos": .., "event_lengths": .. }
        input: PathBuf,

        /// Output MIDI file
        output: PathBuf,

        /// Emit only changes between runs instead of restriking held notes
        #[arg(long)]
        join_notes: bool,

        /// Scale activations to per-note velocities
        #[arg(long)]
        velocities: bool,

        /// Grid units per measure
        #[arg(long, default_value_t = DEFAULT_GRID_RESOLUTION)]
        grid_resolution: u32,

        /// Pulses per quarter note of the generated file
        #[arg(long, default_value_t = 240)]
        ticks_per_beat: u16,

        /// NoteOn velocity when --velocities is not given
        #[arg(long, default_value_t = 64, value_parser = clap::value_parser!(u8).range(..=127))]
        default_velocity: u8,
    },

    /// Print a file's per-grid-unit tempo array as JSON
    Tempos {
        /// Input MIDI file
        input: PathBuf,

        /// Apply the note pipeline's track cleaning and silence trimming first
        #[arg(long)]
        trim: bool,

        /// Grid units per measure
        #[arg(long, default_value_t = DEFAULT_GRID_RESOLUTION)]
        grid_resolution: u32,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliMode {
    Presence,
    Velocity,
    Rich,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Presence => Mode::Presence,
            CliMode::Velocity => Mode::Velocity,
            CliMode::Rich => Mode::Rich,
        }
    }
}

/// Encode-side JSON input document
#[derive(Debug, Deserialize)]
struct GridDocument {
    data: NoteTensor,
    tempos: Tempos,
    #[serde(default)]
    event_lengths: Option<Vec<u64>>,
}

fn main() -> Result<(), gridmidi::Error> {
    env_logger::init();
    let args = Args::parse();

    match args.command {
        Command::Decode {
            input,
            output,
            mode,
            array,
            join_tracks,
            all_notes,
            grid_resolution,
            normalize_observed,
            track_threshold,
        } => {
            let config = DecodeConfig {
                mode: mode.into(),
                join_tracks,
                only_active_notes: !all_notes,
                grid_resolution,
                normalization: if normalize_observed {
                    Normalization::ObservedMax
                } else {
                    Normalization::Fixed
                },
                track_length_threshold: track_threshold,
            };

            if array {
                emit_json(&decode::array_of_notes(&input, &config)?, output.as_deref())
            } else {
                emit_json(
                    &decode::sequence_of_notes(&input, &config)?,
                    output.as_deref(),
                )
            }
        }

        Command::Encode {
            input,
            output,
            join_notes,
            velocities,
            grid_resolution,
            ticks_per_beat,
            default_velocity,
        } => {
            let document: GridDocument = serde_json::from_str(&fs::read_to_string(&input)?)?;
            let config = EncodeConfig {
                join_notes,
                use_velocities: velocities,
                grid_resolution,
                ticks_per_beat,
                default_velocity,
            };
            encode::write_midi(
                &document.data,
                &document.tempos,
                &output,
                document.event_lengths.as_deref(),
                &config,
            )
        }

        Command::Tempos {
            input,
            trim,
            grid_resolution,
        } => {
            let tempos = decode::tempo_array_of_file(&input, trim, grid_resolution)?;
            emit_json(&tempos, None)
        }
    }
}

fn emit_json<T: Serialize>(value: &T, output: Option<&std::path::Path>) -> Result<(), gridmidi::Error> {
    match output {
        Some(path) => fs::write(path, serde_json::to_string(value)?)?,
        None => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}
