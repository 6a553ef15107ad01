// Storage module
// Numeric table files, batch input discovery and per-stem output writing

pub mod files;
pub mod table;

pub use files::{
    calculate_sha256, discover_melody_files, file_sha256, note_path_for, stem_of, OutputSet,
    WrittenFile, MELODY_SUFFIX, NOTE_SUFFIX,
};
pub use table::{format_table, parse_table, read_contour, read_intervals, read_notes, read_table};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed table {path} at line {line}: {message}")]
    Malformed {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

pub type StorageResult<T> = Result<T, StorageError>;
