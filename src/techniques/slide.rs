// Long slide detection
// Traces descending semitone ladders in the quantized contour and maps them
// back onto the annotated note table

use serde::{Deserialize, Serialize};

use super::annotate::{update, UpdateSummary};
use crate::config::{DetectorConfig, SlideConfig};
use crate::contour::{frame_to_note, quantize, FrameClock};
use crate::error::ExpressionResult;
use crate::notes::types::PITCH_EPSILON;
use crate::notes::{notes_of, ExpressionStyleNote, Interval, Note, Technique};

/// Sub-technique recorded for a detected long slide (slide out)
pub const LONG_SLIDE_OUT: u8 = 2;

/// Result of the long-slide stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongSlideOutcome {
    /// Ladder spans in seconds
    pub intervals: Vec<Interval>,

    /// Ladder spans resolved onto the annotated notes
    pub slide_notes: Vec<Note>,

    pub summary: UpdateSummary,
}

/// Whether `next` continues a ladder from `current`: exactly one semitone
/// lower and a duration inside the transition bounds
fn is_ladder_step(current: &Note, next: &Note, config: &SlideConfig) -> bool {
    (current.step_to(next) + 1.0).abs() < PITCH_EPSILON
        && next.duration >= config.min_transition_duration
        && next.duration <= config.max_transition_duration
}

/// Find long slides (descending ladders) in a quantized contour
///
/// The contour is run-length encoded into notes; from each note not yet part
/// of a chain, the chain grows while `is_ladder_step` holds. Chains of at
/// least `min_steps` notes are reported from the first onset to the last
/// offset. Every traced note is consumed whether or not the chain qualifies.
pub fn detect_long_slide(quantized: &[f64], clock: FrameClock, config: &SlideConfig) -> Vec<Interval> {
    let notes = frame_to_note(quantized, clock);
    let mut intervals = Vec::new();
    let mut start = 0;

    while start < notes.len() {
        let mut end = start;
        while end + 1 < notes.len() && is_ladder_step(&notes[end], &notes[end + 1], config) {
            end += 1;
        }

        if end - start + 1 >= config.min_steps {
            intervals.push(Interval {
                onset: notes[start].onset,
                offset: notes[end].offset(),
            });
        }

        start = end + 1;
    }

    intervals
}

/// Resolve slide intervals onto a note table
///
/// Every note strictly containing a slide's start yields one slide note with
/// that note's pitch and onset. Its offset is taken from the first later note
/// reaching the slide end: that note's offset when it starts inside the
/// slide, otherwise the slide end itself. Without such a note the slide end
/// is used.
pub fn map_slides_to_notes(slides: &[Interval], notes: &[Note]) -> Vec<Note> {
    let mut mapped = Vec::new();

    for slide in slides {
        for (index, start_note) in notes.iter().enumerate() {
            if !(start_note.onset < slide.onset && slide.onset < start_note.offset()) {
                continue;
            }

            let resolved_offset = notes[index + 1..]
                .iter()
                .find(|later| later.offset() >= slide.offset)
                .map(|later| {
                    if later.onset > slide.offset {
                        slide.offset
                    } else {
                        later.offset()
                    }
                })
                .unwrap_or(slide.offset);

            mapped.push(Note::new(
                start_note.pitch,
                start_note.onset,
                resolved_offset - start_note.onset,
            ));
        }
    }

    mapped
}

/// Long-slide stage: quantize the contour, trace ladders, map them onto the
/// annotated table and stamp them as slide-out
pub fn apply_long_slide(
    contour: &[f64],
    annotated: &mut Vec<ExpressionStyleNote>,
    config: &DetectorConfig,
) -> ExpressionResult<LongSlideOutcome> {
    let quantized = quantize(contour, &config.quantize);
    let intervals = detect_long_slide(&quantized, config.clock(), &config.slide);
    let slide_notes = map_slides_to_notes(&intervals, &notes_of(annotated));

    let summary = update(annotated, &slide_notes, Technique::Slide, LONG_SLIDE_OUT)?;

    log::debug!(
        "Long slide: {} ladders, {} mapped notes",
        intervals.len(),
        slide_notes.len()
    );

    Ok(LongSlideOutcome {
        intervals,
        slide_notes,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::annotate_plain;

    /// Frames of `pitch` repeated `frames` times
    fn hold(pitch: f64, frames: usize) -> Vec<f64> {
        vec![pitch; frames]
    }

    /// Silence, a held 65, then four 5-frame semitone steps down, then silence
    fn ladder_contour() -> Vec<f64> {
        let mut contour = hold(0.0, 2);
        contour.extend(hold(65.0, 10));
        for pitch in [64.0, 63.0, 62.0, 61.0] {
            contour.extend(hold(pitch, 5));
        }
        contour.extend(hold(0.0, 4));
        contour
    }

    #[test]
    fn test_five_note_ladder_detected() {
        let clock = FrameClock::default();

        let slides = detect_long_slide(&ladder_contour(), clock, &SlideConfig::default());

        assert_eq!(slides.len(), 1);
        assert!((slides[0].onset - clock.frames_to_seconds(2)).abs() < 1e-12);
        assert!((slides[0].offset - clock.frames_to_seconds(32)).abs() < 1e-12);
    }

    #[test]
    fn test_four_note_ladder_ignored() {
        let mut contour = hold(65.0, 10);
        for pitch in [64.0, 63.0, 62.0] {
            contour.extend(hold(pitch, 5));
        }

        let slides = detect_long_slide(&contour, FrameClock::default(), &SlideConfig::default());
        assert!(slides.is_empty());
    }

    #[test]
    fn test_long_step_breaks_ladder() {
        let mut contour = hold(65.0, 10);
        contour.extend(hold(64.0, 5));
        // 30 frames (~0.17 s) exceeds the transition bound
        contour.extend(hold(63.0, 30));
        for pitch in [62.0, 61.0, 60.0] {
            contour.extend(hold(pitch, 5));
        }

        let slides = detect_long_slide(&contour, FrameClock::default(), &SlideConfig::default());
        assert!(slides.is_empty());
    }

    #[test]
    fn test_ascending_ladder_ignored() {
        let mut contour = hold(60.0, 10);
        for pitch in [61.0, 62.0, 63.0, 64.0] {
            contour.extend(hold(pitch, 5));
        }

        let slides = detect_long_slide(&contour, FrameClock::default(), &SlideConfig::default());
        assert!(slides.is_empty());
    }

    #[test]
    fn test_ladder_reaching_contour_end() {
        let mut contour = hold(65.0, 10);
        for pitch in [64.0, 63.0, 62.0, 61.0] {
            contour.extend(hold(pitch, 5));
        }

        let slides = detect_long_slide(&contour, FrameClock::default(), &SlideConfig::default());
        assert_eq!(slides.len(), 1);
    }

    #[test]
    fn test_mapping_uses_covering_note_offset() {
        let notes = vec![
            Note::new(60.0, 0.4, 0.3),
            Note::new(59.0, 0.7, 0.2),
            Note::new(58.0, 0.9, 0.5),
        ];
        let slides = vec![Interval::new(0.5, 1.2).unwrap()];

        let mapped = map_slides_to_notes(&slides, &notes);

        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].pitch, 60.0);
        assert_eq!(mapped[0].onset, 0.4);
        assert!((mapped[0].offset() - 1.4).abs() < 1e-9);
    }

    #[test]
    fn test_mapping_clips_to_slide_end() {
        let notes = vec![Note::new(60.0, 0.4, 0.3), Note::new(58.0, 1.3, 0.5)];
        let slides = vec![Interval::new(0.5, 1.2).unwrap()];

        let mapped = map_slides_to_notes(&slides, &notes);
        assert!((mapped[0].offset() - 1.2).abs() < 1e-9);

        // No later note at all
        let mapped = map_slides_to_notes(&slides, &notes[..1]);
        assert!((mapped[0].offset() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_mapping_requires_strict_containment() {
        let notes = vec![Note::new(60.0, 0.5, 0.3)];
        let slides = vec![Interval::new(0.5, 1.2).unwrap()];

        assert!(map_slides_to_notes(&slides, &notes).is_empty());
    }

    #[test]
    fn test_stage_stamps_slide_out() {
        let clock = FrameClock::default();
        let config = DetectorConfig::default();
        let contour = ladder_contour();

        // Annotated table from the same contour, so the first note holds the ladder start
        let mut notes = frame_to_note(&contour, clock);
        notes[0].onset -= 0.01;
        notes[0].duration += 0.01;
        let mut annotated = annotate_plain(&notes);

        let outcome = apply_long_slide(&contour, &mut annotated, &config).unwrap();

        assert_eq!(outcome.intervals.len(), 1);
        assert_eq!(outcome.slide_notes.len(), 1);
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].tags.slide, LONG_SLIDE_OUT);
    }
}
