// Note model module
// Notes, intervals, directions and expression style annotations

pub mod types;

pub use types::{
    annotate_plain, is_step_of, notes_of, validate_notes, Direction, ExpressionStyleNote,
    Interval, Note, StyleTags, Technique,
};
