// Wide vibrato detection
// Recognizes serrated note runs (alternating steps of a fixed extent) and
// collapses each run into one vibrato note

use serde::{Deserialize, Serialize};

use super::annotate::update;
use crate::config::VibratoConfig;
use crate::error::ExpressionResult;
use crate::notes::types::PITCH_EPSILON;
use crate::notes::{annotate_plain, is_step_of, ExpressionStyleNote, Note, Technique};

/// Result of one serrated-run merge pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VibratoMerge {
    /// The note table with each qualifying run collapsed into one note
    pub merged: Vec<Note>,

    /// The collapsed notes, i.e. the vibrato detections of this pass
    pub detections: Vec<Note>,
}

/// Vibrato detections of one extent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VibratoDetections {
    pub extent: u8,
    pub notes: Vec<Note>,
}

/// Result of the full wide-vibrato stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WideVibratoOutcome {
    /// Note table after all merge passes
    pub merged_notes: Vec<Note>,

    /// Annotated table created from the merged notes, with vibrato tags
    pub annotated: Vec<ExpressionStyleNote>,

    /// Detections per extent, in application order
    pub detections: Vec<VibratoDetections>,
}

/// Merge serrated runs of `extent` semitones in one left-to-right pass
///
/// A run starts at a note whose successor is `extent` semitones higher and
/// follows within `max_gap`. It extends while each step keeps that
/// magnitude, flips direction, and stays within `max_gap`. Runs of at least
/// `min_notes` notes collapse into one note with the first note's pitch and
/// the run's full time span; shorter runs pass through unchanged.
pub fn merge_wide_vibrato(notes: &[Note], extent: u8, config: &VibratoConfig) -> VibratoMerge {
    let mut merged = Vec::with_capacity(notes.len());
    let mut detections = Vec::new();
    let mut index = 0;

    while index < notes.len() {
        let Some(end) = trace_serrated_run(notes, index, extent as f64, config.max_gap) else {
            merged.push(notes[index]);
            index += 1;
            continue;
        };

        if end - index + 1 >= config.min_notes {
            let first = notes[index];
            let collapsed = Note::new(first.pitch, first.onset, notes[end].offset() - first.onset);
            merged.push(collapsed);
            detections.push(collapsed);
        } else {
            merged.extend_from_slice(&notes[index..=end]);
        }

        index = end + 1;
    }

    VibratoMerge { merged, detections }
}

/// Index of the last note of the serrated run starting at `start`, if any
fn trace_serrated_run(notes: &[Note], start: usize, extent: f64, max_gap: f64) -> Option<usize> {
    let next = notes.get(start + 1)?;
    let first_step = notes[start].step_to(next);
    // Runs open on an upward step only
    if (first_step - extent).abs() >= PITCH_EPSILON || notes[start].gap_to(next) >= max_gap {
        return None;
    }

    let mut sign = first_step.signum();
    let mut end = start + 1;

    while end + 1 < notes.len() {
        let step = notes[end].step_to(&notes[end + 1]);
        if !is_step_of(step, extent)
            || step.signum() == sign
            || notes[end].gap_to(&notes[end + 1]) >= max_gap
        {
            break;
        }
        sign = step.signum();
        end += 1;
    }

    Some(end)
}

/// Run the merge for every configured extent (widest first) on the
/// cumulative result, then stamp each detection list onto a fresh
/// annotated table in the same order
pub fn detect_wide_vibrato(
    notes: &[Note],
    config: &VibratoConfig,
) -> ExpressionResult<WideVibratoOutcome> {
    let mut current = notes.to_vec();
    let mut detections = Vec::with_capacity(config.extents.len());

    for &extent in &config.extents {
        let pass = merge_wide_vibrato(&current, extent, config);
        log::debug!(
            "Wide vibrato pass (extent {}): {} runs merged, {} -> {} notes",
            extent,
            pass.detections.len(),
            current.len(),
            pass.merged.len()
        );
        current = pass.merged;
        detections.push(VibratoDetections {
            extent,
            notes: pass.detections,
        });
    }

    let mut annotated = annotate_plain(&current);
    for detection in &detections {
        update(
            &mut annotated,
            &detection.notes,
            Technique::Vibrato,
            detection.extent,
        )?;
    }

    Ok(WideVibratoOutcome {
        merged_notes: current,
        annotated,
        detections,
    })
}
