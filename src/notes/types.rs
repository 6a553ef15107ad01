// Note and annotation types
// Defines notes, time intervals, pattern directions and the expression style tags

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ExpressionError, ExpressionResult};

/// Tolerance for pitch step comparisons in semitones
pub const PITCH_EPSILON: f64 = 1e-9;

/// Tolerance in seconds for onsets, offsets and durations copied between tables
pub const TIME_EPSILON: f64 = 1e-9;

/// A transcribed note event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    /// Pitch in semitones (MIDI number)
    pub pitch: f64,

    /// Onset in seconds from start of audio
    pub onset: f64,

    /// Duration in seconds
    pub duration: f64,
}

impl Note {
    pub fn new(pitch: f64, onset: f64, duration: f64) -> Self {
        Note {
            pitch,
            onset,
            duration,
        }
    }

    /// Offset (end time) in seconds
    pub fn offset(&self) -> f64 {
        self.onset + self.duration
    }

    /// Closed-interval containment of a time point
    pub fn contains(&self, time: f64) -> bool {
        time >= self.onset && time <= self.offset()
    }

    /// Silence between this note's offset and the onset of `next`
    /// Negative when the notes overlap
    pub fn gap_to(&self, next: &Note) -> f64 {
        next.onset - self.offset()
    }

    /// Signed pitch step from this note to `next`
    pub fn step_to(&self, next: &Note) -> f64 {
        next.pitch - self.pitch
    }

    pub fn as_row(&self) -> Vec<f64> {
        vec![self.pitch, self.onset, self.duration]
    }
}

/// A time span in seconds, e.g. a CAD pattern or a reference annotation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub onset: f64,
    pub offset: f64,
}

impl Interval {
    /// Create an interval, rejecting reversed or non-finite bounds
    pub fn new(onset: f64, offset: f64) -> ExpressionResult<Self> {
        if !onset.is_finite() || !offset.is_finite() {
            return Err(ExpressionError::invalid(format!(
                "interval bounds must be finite, got [{}, {}]",
                onset, offset
            )));
        }
        if onset > offset {
            return Err(ExpressionError::invalid(format!(
                "interval onset {} exceeds offset {}",
                onset, offset
            )));
        }
        Ok(Interval { onset, offset })
    }

    pub fn duration(&self) -> f64 {
        self.offset - self.onset
    }

    /// Closed-interval containment
    pub fn contains(&self, time: f64) -> bool {
        time >= self.onset && time <= self.offset
    }

    /// Open-interval containment
    pub fn strictly_contains(&self, time: f64) -> bool {
        time > self.onset && time < self.offset
    }

    pub fn as_row(&self) -> Vec<f64> {
        vec![self.onset, self.offset]
    }
}

/// Direction of a continuous pitch movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Non-decreasing pitch (bend, hammer-on, slide up)
    Up,

    /// Non-increasing pitch (release, pull-off, slide down)
    Down,
}

impl Direction {
    /// Whether the step `current -> next` moves in this direction (plateaus included)
    pub fn admits(&self, current: f64, next: f64) -> bool {
        match self {
            Direction::Up => next >= current,
            Direction::Down => next <= current,
        }
    }

    /// Label used in output file names
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Up => "ascending",
            Direction::Down => "descending",
        }
    }
}

impl FromStr for Direction {
    type Err = ExpressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "up" | "ascending" | "upward" => Ok(Direction::Up),
            "down" | "descending" | "downward" => Ok(Direction::Down),
            other => Err(ExpressionError::invalid(format!(
                "direction must be either 'up' or 'down', got '{}'",
                other
            ))),
        }
    }
}

/// Playing technique recorded in the annotated note table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Technique {
    /// String bend, sub-technique = extent in semitones (1-3)
    Bend,

    /// Pull-off
    Pull,

    /// Hammer-on
    Hammer,

    /// Slide, 1 = long slide in, 2 = long slide out
    Slide,

    /// Vibrato, sub-technique = extent in semitones (1-2)
    Vibrato,
}

impl Technique {
    /// Column order of the tags in an annotated row
    pub const ALL: [Technique; 5] = [
        Technique::Bend,
        Technique::Pull,
        Technique::Hammer,
        Technique::Slide,
        Technique::Vibrato,
    ];

    /// Largest sub-technique value this technique can carry
    pub fn max_sub_technique(&self) -> u8 {
        match self {
            Technique::Bend => 3,
            Technique::Pull | Technique::Hammer => 1,
            Technique::Slide | Technique::Vibrato => 2,
        }
    }

    pub fn to_string(&self) -> &'static str {
        match self {
            Technique::Bend => "bend",
            Technique::Pull => "pull",
            Technique::Hammer => "hammer",
            Technique::Slide => "slide",
            Technique::Vibrato => "vibrato",
        }
    }
}

/// Expression style tags attached to a note
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleTags {
    pub bend: u8,
    pub pull: u8,
    pub hammer: u8,
    pub slide: u8,
    pub vibrato: u8,
}

impl StyleTags {
    /// Set the tag of one technique, replacing any previous value
    pub fn set(&mut self, technique: Technique, value: u8) -> ExpressionResult<()> {
        if value > technique.max_sub_technique() {
            return Err(ExpressionError::invalid(format!(
                "{} sub-technique must be at most {}, got {}",
                technique.to_string(),
                technique.max_sub_technique(),
                value
            )));
        }

        match technique {
            Technique::Bend => self.bend = value,
            Technique::Pull => self.pull = value,
            Technique::Hammer => self.hammer = value,
            Technique::Slide => self.slide = value,
            Technique::Vibrato => self.vibrato = value,
        }
        Ok(())
    }

    pub fn get(&self, technique: Technique) -> u8 {
        match technique {
            Technique::Bend => self.bend,
            Technique::Pull => self.pull,
            Technique::Hammer => self.hammer,
            Technique::Slide => self.slide,
            Technique::Vibrato => self.vibrato,
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == StyleTags::default()
    }
}

/// A note of the annotated table threaded through every detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStyleNote {
    pub note: Note,
    pub tags: StyleTags,
}

impl ExpressionStyleNote {
    /// Wrap a note with all tags cleared
    pub fn plain(note: Note) -> Self {
        ExpressionStyleNote {
            note,
            tags: StyleTags::default(),
        }
    }

    /// Row layout: pitch, onset, duration, bend, pull, hammer, slide, vibrato
    pub fn as_row(&self) -> Vec<f64> {
        let mut row = self.note.as_row();
        row.extend(Technique::ALL.iter().map(|&t| self.tags.get(t) as f64));
        row
    }
}

/// Extend a note table with zeroed tags
pub fn annotate_plain(notes: &[Note]) -> Vec<ExpressionStyleNote> {
    notes.iter().copied().map(ExpressionStyleNote::plain).collect()
}

/// Strip the tags from an annotated table
pub fn notes_of(annotated: &[ExpressionStyleNote]) -> Vec<Note> {
    annotated.iter().map(|n| n.note).collect()
}

/// Check the preconditions every note scan relies on:
/// finite values, non-negative durations and non-decreasing onsets
pub fn validate_notes(notes: &[Note]) -> ExpressionResult<()> {
    for (i, note) in notes.iter().enumerate() {
        if !note.pitch.is_finite() || !note.onset.is_finite() || !note.duration.is_finite() {
            return Err(ExpressionError::invalid(format!(
                "note {} has a non-finite field",
                i
            )));
        }
        if note.duration < 0.0 {
            return Err(ExpressionError::invalid(format!(
                "note {} has negative duration {}",
                i, note.duration
            )));
        }
        if i > 0 && note.onset < notes[i - 1].onset {
            return Err(ExpressionError::invalid(format!(
                "note table is not sorted by onset at row {} ({} < {})",
                i,
                note.onset,
                notes[i - 1].onset
            )));
        }
    }
    Ok(())
}

/// Whether two pitch values are `semitones` apart (absolute difference)
pub fn is_step_of(step: f64, semitones: f64) -> bool {
    (step.abs() - semitones).abs() < PITCH_EPSILON
}
