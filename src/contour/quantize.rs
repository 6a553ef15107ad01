// Pitch Quantization - Snaps a continuous contour onto an integer pitch grid
// and run-length encodes the quantized frames into note events

use super::FrameClock;
use crate::config::QuantizeConfig;
use crate::notes::Note;

/// Quantize a contour onto the configured grid
///
/// Algorithm:
/// 1. Half-step = half the spacing of the first two partitions
/// 2. Each value selects the last partition `p` with `value >= p - halfstep`
/// 3. The matching codebook entry is emitted; values below the grid and
///    negative codebook entries become 0 (unvoiced)
pub fn quantize(contour: &[f64], config: &QuantizeConfig) -> Vec<f64> {
    let partitions = &config.partitions;
    let halfstep = match (partitions.first(), partitions.get(1)) {
        (Some(first), Some(second)) => (second - first) / 2.0,
        _ => 0.0,
    };

    contour
        .iter()
        .map(|&value| quantize_value(value, partitions, &config.codebook, halfstep))
        .collect()
}

fn quantize_value(value: f64, partitions: &[f64], codebook: &[f64], halfstep: f64) -> f64 {
    let passed = partitions
        .iter()
        .take_while(|&&boundary| value >= boundary - halfstep)
        .count();

    if passed == 0 {
        return 0.0;
    }

    codebook.get(passed - 1).copied().unwrap_or(0.0).max(0.0)
}

/// Convert a quantized frame sequence into notes
///
/// Consecutive equal voiced frames form one note; unvoiced (0) frames are
/// skipped. Onsets and durations are converted to seconds with `clock`.
pub fn frame_to_note(quantized: &[f64], clock: FrameClock) -> Vec<Note> {
    let mut notes = Vec::new();
    let mut frame = 0;

    while frame < quantized.len() {
        let pitch = quantized[frame];
        if pitch == 0.0 {
            frame += 1;
            continue;
        }

        let onset = frame;
        let mut offset = frame;
        while offset + 1 < quantized.len() && quantized[offset + 1] == pitch {
            offset += 1;
        }

        notes.push(Note::new(
            pitch,
            clock.frames_to_seconds(onset),
            clock.frames_to_seconds(offset - onset + 1),
        ));

        frame = offset + 1;
    }

    notes
}
