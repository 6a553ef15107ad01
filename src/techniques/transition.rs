// Transition locator
// Timestamps of pitch changes of a given size between consecutive notes

use crate::config::TransitionConfig;
use crate::notes::{Direction, Note};

/// Half-width of the accepted pitch distance window around `step`
const STEP_TOLERANCE: f64 = 0.5;

/// Locate transitions of `step` semitones between consecutive notes
///
/// A pair qualifies when its pitch distance lies strictly within
/// `step ± 0.5`, both notes last longer than `min_note_duration`, and the
/// silence between them is below `gap_tolerance`. The transition time is
/// the midpoint between the first offset and the second onset. With a
/// direction, only strictly rising (`Up`) or falling (`Down`) pairs count.
pub fn locate_transitions(
    notes: &[Note],
    step: f64,
    direction: Option<Direction>,
    config: &TransitionConfig,
) -> Vec<f64> {
    notes
        .windows(2)
        .filter(|pair| {
            let (first, second) = (&pair[0], &pair[1]);
            let distance = first.step_to(second).abs();

            distance > step - STEP_TOLERANCE
                && distance < step + STEP_TOLERANCE
                && first.duration > config.min_note_duration
                && second.duration > config.min_note_duration
                && first.gap_to(second) < config.gap_tolerance
        })
        .filter(|pair| match direction {
            None => true,
            Some(Direction::Up) => pair[0].pitch < pair[1].pitch,
            Some(Direction::Down) => pair[0].pitch > pair[1].pitch,
        })
        .map(|pair| (pair[0].offset() + pair[1].onset) / 2.0)
        .collect()
}
