// Technique detection module
// Vibrato merging, long slides, candidate selection, transitions and the
// annotation merge that stamps their results onto the note table

pub mod annotate;
pub mod candidates;
pub mod slide;
pub mod transition;
pub mod vibrato;

pub use annotate::{classify_follower, classify_match, update, FollowerTransition, MatchKind, UpdateSummary};
pub use candidates::{
    select_candidates, select_for_direction, select_long, Candidate, DirectionSelection, Selection,
    SpanKind,
};
pub use slide::{apply_long_slide, detect_long_slide, map_slides_to_notes, LongSlideOutcome};
pub use transition::locate_transitions;
pub use vibrato::{detect_wide_vibrato, merge_wide_vibrato, VibratoMerge, WideVibratoOutcome};
