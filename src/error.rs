use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file must be of \".mid\" format: {}", .0.display())]
    InvalidExtension(PathBuf),

    #[error("corrupted MIDI file: {0}")]
    CorruptFile(String),

    #[error("impossible to perform calculations for a type 2 (asynchronous) file")]
    UnsupportedFileOrganization,

    #[error("empty file - no note messages found")]
    EmptyFile,

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
