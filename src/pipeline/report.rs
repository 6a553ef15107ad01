// Batch summary report
// One record per input stem: whether it was processed, why it was skipped,
// input checksums and detection counts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::PipelineError;

/// Outcome of one stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StemStatus {
    Processed,
    Skipped,
}

/// Detection counts of a processed stem
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionCounts {
    pub input_notes: usize,
    pub annotated_notes: usize,
    pub vibrato_notes: usize,
    pub long_slides: usize,
    pub ascending_patterns: usize,
    pub descending_patterns: usize,
    pub long_candidates: usize,
    pub short_candidates: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemRecord {
    pub stem: String,
    pub status: StemStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub melody_sha256: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_sha256: Option<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<DetectionCounts>,
}

impl StemRecord {
    pub fn skipped(stem: impl Into<String>, reason: impl Into<String>) -> Self {
        StemRecord {
            stem: stem.into(),
            status: StemStatus::Skipped,
            reason: Some(reason.into()),
            melody_sha256: None,
            notes_sha256: None,
            outputs: Vec::new(),
            counts: None,
        }
    }
}

/// Summary of one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    pub stems: Vec<StemRecord>,
}

impl BatchSummary {
    pub fn new(run_id: Uuid) -> Self {
        BatchSummary {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            stems: Vec::new(),
        }
    }

    pub fn record(&mut self, record: StemRecord) {
        self.stems.push(record);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn processed_count(&self) -> usize {
        self.count(StemStatus::Processed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(StemStatus::Skipped)
    }

    fn count(&self, status: StemStatus) -> usize {
        self.stems.iter().filter(|s| s.status == status).count()
    }

    pub fn write(&self, path: &Path) -> Result<(), PipelineError> {
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self, PipelineError> {
        let data = std::fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }
}
