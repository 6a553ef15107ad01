// Pipeline execution and monitoring module
// Orchestrates the per-stem detection pipeline over a batch of melody files

pub mod report;
pub mod runner;
pub mod trace;

pub use report::{BatchSummary, DetectionCounts, StemRecord, StemStatus};
pub use runner::{
    detect_stem, run_batch, BatchRunner, ClassificationStage, DetectOptions, DirectionResult,
    StemDetection, SUMMARY_FILE_NAME, TRACE_FILE_NAME,
};
pub use trace::{read_trace_file, PipelineStage, TraceBuilder, TraceEntry, TraceError, TraceWriter};

use thiserror::Error;

use crate::audio::AudioError;
use crate::classify::ClassifierError;
use crate::config::ConfigError;
use crate::error::ExpressionError;
use crate::storage::StorageError;

/// Anything that can stop a stem (or the whole batch)
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
