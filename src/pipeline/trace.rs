// Pipeline progress tracing
// Append-only JSONL trace of every detection stage run on every input stem

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Stages of the per-stem detection pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Load,
    WideVibrato,
    LongSlide,
    CadScan,
    CandidateSelection,
    Classification,
    Write,
    Skipped,
}

impl PipelineStage {
    pub fn to_string(&self) -> &'static str {
        match self {
            PipelineStage::Load => "load",
            PipelineStage::WideVibrato => "wide_vibrato",
            PipelineStage::LongSlide => "long_slide",
            PipelineStage::CadScan => "cad_scan",
            PipelineStage::CandidateSelection => "candidate_selection",
            PipelineStage::Classification => "classification",
            PipelineStage::Write => "write",
            PipelineStage::Skipped => "skipped",
        }
    }
}

/// A single trace entry in the pipeline execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 timestamp of when this entry was created
    pub timestamp: String,

    /// Batch run this entry belongs to
    pub run_id: Uuid,

    /// Input stem being processed
    pub stem: String,

    pub stage: PipelineStage,

    /// Human-readable message describing the stage result
    pub message: String,

    /// Optional structured data (e.g., detection counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    /// Create a new trace entry with current timestamp
    pub fn new(run_id: Uuid, stem: String, stage: PipelineStage, message: String) -> Self {
        TraceEntry {
            timestamp: Utc::now().to_rfc3339(),
            run_id,
            stem,
            stage,
            message,
            data: None,
        }
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Pipeline trace writer
/// Manages append-only JSONL trace file
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append a trace entry to the file
    /// Creates file if it doesn't exist
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    /// Write multiple entries at once
    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            file.write_all(entry.to_json_line()?.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Builds trace entries for one stem of one run
#[derive(Debug, Clone)]
pub struct TraceBuilder {
    run_id: Uuid,
    stem: String,
}

impl TraceBuilder {
    pub fn new(run_id: Uuid, stem: impl Into<String>) -> Self {
        TraceBuilder {
            run_id,
            stem: stem.into(),
        }
    }

    pub fn entry(&self, stage: PipelineStage, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stem.clone(), stage, message.into())
    }

    /// Create an entry with data
    pub fn with_data(
        &self,
        stage: PipelineStage,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> TraceEntry {
        let mut entry = self.entry(stage, message);
        entry.data = Some(data);
        entry
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;

    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<TraceEntry>(line).map_err(TraceError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_trace_builder_entries() {
        let run_id = Uuid::new_v4();
        let builder = TraceBuilder::new(run_id, "solo_01");

        let entry = builder.entry(PipelineStage::WideVibrato, "2 runs merged");
        assert_eq!(entry.run_id, run_id);
        assert_eq!(entry.stem, "solo_01");
        assert_eq!(entry.stage, PipelineStage::WideVibrato);
        assert!(entry.data.is_none());

        let entry = builder.with_data(
            PipelineStage::CadScan,
            "scanned",
            serde_json::json!({ "ascending": 3 }),
        );
        assert_eq!(entry.data.unwrap()["ascending"], 3);
    }

    #[test]
    fn test_trace_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("fretsense.trace.jsonl");
        let writer = TraceWriter::new(trace_path.clone());
        let builder = TraceBuilder::new(Uuid::new_v4(), "a");

        writer.write(&builder.entry(PipelineStage::Load, "loaded")).unwrap();
        writer
            .write_batch(&[
                builder.entry(PipelineStage::LongSlide, "1 ladder"),
                builder.entry(PipelineStage::Write, "12 files"),
            ])
            .unwrap();

        let entries = read_trace_file(&trace_path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].stage, PipelineStage::Load);
        assert_eq!(entries[2].message, "12 files");
    }

    #[test]
    fn test_json_line_format() {
        let entry = TraceBuilder::new(Uuid::new_v4(), "x").entry(PipelineStage::Skipped, "missing");
        let json_line = entry.to_json_line().unwrap();

        assert!(json_line.ends_with('\n'));
        assert!(json_line.contains("\"stage\":\"skipped\""));

        let parsed: TraceEntry = serde_json::from_str(json_line.trim()).unwrap();
        assert_eq!(parsed.stem, "x");
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(PipelineStage::CandidateSelection.to_string(), "candidate_selection");
        assert_eq!(PipelineStage::WideVibrato.to_string(), "wide_vibrato");
    }
}
