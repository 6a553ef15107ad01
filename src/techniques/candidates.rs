// Candidate selection
// Intersects CAD pattern spans with the note table to propose short (two-note)
// and long (three/four-note) technique candidates

use serde::{Deserialize, Serialize};

use crate::config::CandidateConfig;
use crate::notes::{Direction, Interval, Note};

/// How many notes a candidate's pattern spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// Pattern runs from one note into the next
    Short,

    /// Pattern runs from one note into the second or third after it
    Long,
}

impl SpanKind {
    pub fn to_string(&self) -> &'static str {
        match self {
            SpanKind::Short => "short",
            SpanKind::Long => "long",
        }
    }
}

/// A pattern paired with the notes it spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub pattern: Interval,
    pub direction: Direction,
    pub kind: SpanKind,

    /// Covered notes, in table order
    pub notes: Vec<Note>,

    /// For long candidates, the note synthesized from the first three covered notes
    pub merged: Option<Note>,
}

/// Accepted candidates plus the notes and patterns left for later stages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selection {
    pub candidates: Vec<Candidate>,
    pub remaining_notes: Vec<Note>,
    pub remaining_patterns: Vec<Interval>,
}

/// Both selection passes for one direction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionSelection {
    pub direction: Direction,
    pub long: Vec<Candidate>,
    pub short: Vec<Candidate>,

    /// Notes covered by neither pass
    pub remaining_notes: Vec<Note>,

    /// Patterns matched by neither pass
    pub remaining_patterns: Vec<Interval>,
}

impl DirectionSelection {
    pub fn long_notes(&self) -> Vec<Note> {
        self.long.iter().filter_map(|c| c.merged).collect()
    }

    pub fn short_patterns(&self) -> Vec<Interval> {
        self.short.iter().map(|c| c.pattern).collect()
    }
}

/// Split notes and patterns into the remaining (unused) parts
fn remainder(
    notes: &[Note],
    note_used: &[bool],
    patterns: &[Interval],
    pattern_used: &[bool],
) -> (Vec<Note>, Vec<Interval>) {
    let remaining_notes = notes
        .iter()
        .zip(note_used)
        .filter(|(_, &used)| !used)
        .map(|(note, _)| *note)
        .collect();
    let remaining_patterns = patterns
        .iter()
        .zip(pattern_used)
        .filter(|(_, &used)| !used)
        .map(|(pattern, _)| *pattern)
        .collect();
    (remaining_notes, remaining_patterns)
}

/// Long form: a pattern starting in note `n` and ending in `n + 2` or `n + 3`
///
/// The first of the two that contains the pattern offset and lies within
/// `max_pitch_difference` of `n` is accepted. The candidate carries a merged
/// note with `n`'s pitch and onset and the summed duration of `n..=n+2`.
/// Notes `n..=m` and the pattern are consumed.
pub fn select_long(
    notes: &[Note],
    patterns: &[Interval],
    direction: Direction,
    config: &CandidateConfig,
) -> Selection {
    let mut note_used = vec![false; notes.len()];
    let mut pattern_used = vec![false; patterns.len()];
    let mut candidates = Vec::new();

    for (p, pattern) in patterns.iter().enumerate() {
        for n in 0..notes.len() {
            if note_used[n] || !notes[n].contains(pattern.onset) {
                continue;
            }
            if n + 3 >= notes.len() {
                break;
            }

            let matched = (n + 2..=n + 3).find(|&m| {
                notes[m].contains(pattern.offset)
                    && (notes[n].pitch - notes[m].pitch).abs() <= config.max_pitch_difference
            });
            let Some(m) = matched else {
                continue;
            };
            if note_used[n..=m].iter().any(|&used| used) {
                continue;
            }

            let duration = notes[n].duration + notes[n + 1].duration + notes[n + 2].duration;
            candidates.push(Candidate {
                pattern: *pattern,
                direction,
                kind: SpanKind::Long,
                notes: notes[n..=m].to_vec(),
                merged: Some(Note::new(notes[n].pitch, notes[n].onset, duration)),
            });

            note_used[n..=m].iter_mut().for_each(|used| *used = true);
            pattern_used[p] = true;
            break;
        }
    }

    let (remaining_notes, remaining_patterns) =
        remainder(notes, &note_used, patterns, &pattern_used);

    Selection {
        candidates,
        remaining_notes,
        remaining_patterns,
    }
}

/// Short form: a pattern starting in note `n` and ending in `n + 1`
///
/// Accepted when the pitch difference is within `max_pitch_difference` and
/// `n + 1` starts less than `max_gap` after `n` ends. Every pattern is tested
/// against the whole table, so several patterns may share a note pair.
pub fn select_candidates(
    notes: &[Note],
    patterns: &[Interval],
    direction: Direction,
    config: &CandidateConfig,
) -> Selection {
    let mut note_used = vec![false; notes.len()];
    let mut pattern_used = vec![false; patterns.len()];
    let mut candidates = Vec::new();

    for (p, pattern) in patterns.iter().enumerate() {
        for n in 0..notes.len() {
            if !notes[n].contains(pattern.onset) {
                continue;
            }
            if n + 1 >= notes.len() {
                break;
            }

            let m = n + 1;
            let accepted = notes[m].contains(pattern.offset)
                && (notes[m].pitch - notes[n].pitch).abs() <= config.max_pitch_difference
                && notes[n].gap_to(&notes[m]) < config.max_gap;
            if !accepted {
                continue;
            }

            candidates.push(Candidate {
                pattern: *pattern,
                direction,
                kind: SpanKind::Short,
                notes: vec![notes[n], notes[m]],
                merged: None,
            });

            note_used[n] = true;
            note_used[m] = true;
            pattern_used[p] = true;
            break;
        }
    }

    let (remaining_notes, remaining_patterns) =
        remainder(notes, &note_used, patterns, &pattern_used);

    Selection {
        candidates,
        remaining_notes,
        remaining_patterns,
    }
}

/// Long selection, then short selection on what the long pass left
pub fn select_for_direction(
    notes: &[Note],
    patterns: &[Interval],
    direction: Direction,
    config: &CandidateConfig,
) -> DirectionSelection {
    let long = select_long(notes, patterns, direction, config);
    let short = select_candidates(
        &long.remaining_notes,
        &long.remaining_patterns,
        direction,
        config,
    );

    log::debug!(
        "Candidate selection ({}): {} long, {} short from {} patterns",
        direction.label(),
        long.candidates.len(),
        short.candidates.len(),
        patterns.len()
    );

    DirectionSelection {
        direction,
        long: long.candidates,
        short: short.candidates,
        remaining_notes: short.remaining_notes,
        remaining_patterns: short.remaining_patterns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notes(rows: &[(f64, f64, f64)]) -> Vec<Note> {
        rows.iter().map(|&(p, o, d)| Note::new(p, o, d)).collect()
    }

    fn interval(onset: f64, offset: f64) -> Interval {
        Interval::new(onset, offset).unwrap()
    }

    #[test]
    fn test_short_candidate_pairs_both_notes() {
        let notes = notes(&[(60.0, 0.0, 1.0), (62.0, 1.0, 1.0)]);
        let patterns = vec![interval(0.5, 1.5)];

        let selection =
            select_candidates(&notes, &patterns, Direction::Up, &CandidateConfig::default());

        assert_eq!(selection.candidates.len(), 1);
        assert_eq!(selection.candidates[0].notes, notes);
        assert_eq!(selection.candidates[0].kind, SpanKind::Short);
        assert!(selection.remaining_notes.is_empty());
        assert!(selection.remaining_patterns.is_empty());
    }

    #[test]
    fn test_short_patterns_may_share_a_note_pair() {
        let notes = notes(&[(60.0, 0.0, 1.0), (62.0, 1.0, 1.0)]);
        let patterns = vec![interval(0.2, 1.2), interval(0.5, 1.5)];

        let selection =
            select_candidates(&notes, &patterns, Direction::Up, &CandidateConfig::default());

        assert_eq!(selection.candidates.len(), 2);
        assert_eq!(selection.candidates[1].pattern, patterns[1]);
        assert!(selection.remaining_patterns.is_empty());
        assert!(selection.remaining_notes.is_empty());
    }

    #[test]
    fn test_short_rejects_wide_interval_and_gap() {
        let config = CandidateConfig::default();
        let patterns = vec![interval(0.5, 1.5)];

        let wide = notes(&[(60.0, 0.0, 1.0), (64.0, 1.0, 1.0)]);
        assert!(select_candidates(&wide, &patterns, Direction::Up, &config)
            .candidates
            .is_empty());

        let gapped = notes(&[(60.0, 0.0, 0.9), (62.0, 1.0, 1.0)]);
        let selection = select_candidates(&gapped, &patterns, Direction::Up, &config);
        assert!(selection.candidates.is_empty());
        assert_eq!(selection.remaining_notes.len(), 2);
        assert_eq!(selection.remaining_patterns.len(), 1);
    }

    #[test]
    fn test_short_pattern_in_last_note() {
        let notes = notes(&[(60.0, 0.0, 1.0), (62.0, 1.0, 1.0)]);
        let patterns = vec![interval(1.2, 1.8)];

        let selection =
            select_candidates(&notes, &patterns, Direction::Up, &CandidateConfig::default());
        assert!(selection.candidates.is_empty());
    }

    #[test]
    fn test_long_candidate_ending_two_notes_later() {
        let notes = notes(&[
            (60.0, 0.0, 0.1),
            (61.0, 0.1, 0.1),
            (62.0, 0.2, 0.1),
            (63.0, 0.3, 0.1),
        ]);
        let patterns = vec![interval(0.05, 0.25)];

        let selection = select_long(&notes, &patterns, Direction::Up, &CandidateConfig::default());

        assert_eq!(selection.candidates.len(), 1);
        let candidate = &selection.candidates[0];
        assert_eq!(candidate.kind, SpanKind::Long);
        assert_eq!(candidate.notes.len(), 3);
        let merged = candidate.merged.unwrap();
        assert_eq!(merged.pitch, 60.0);
        assert!((merged.duration - 0.3).abs() < 1e-9);
        assert_eq!(selection.remaining_notes, vec![notes[3]]);
    }

    #[test]
    fn test_long_candidate_ending_three_notes_later() {
        let notes = notes(&[
            (60.0, 0.0, 0.1),
            (61.0, 0.1, 0.1),
            (62.0, 0.2, 0.1),
            (63.0, 0.3, 0.1),
        ]);
        let patterns = vec![interval(0.05, 0.35)];

        let selection = select_long(&notes, &patterns, Direction::Up, &CandidateConfig::default());

        assert_eq!(selection.candidates.len(), 1);
        assert_eq!(selection.candidates[0].notes.len(), 4);
        assert!(selection.remaining_notes.is_empty());
    }

    #[test]
    fn test_long_requires_room_for_four_notes() {
        let notes = notes(&[(60.0, 0.0, 0.1), (61.0, 0.1, 0.1), (62.0, 0.2, 0.1)]);
        let patterns = vec![interval(0.05, 0.25)];

        let selection = select_long(&notes, &patterns, Direction::Up, &CandidateConfig::default());
        assert!(selection.candidates.is_empty());
        assert_eq!(selection.remaining_patterns.len(), 1);
    }

    #[test]
    fn test_long_rejects_wide_interval() {
        let notes = notes(&[
            (60.0, 0.0, 0.1),
            (62.0, 0.1, 0.1),
            (64.0, 0.2, 0.1),
            (66.0, 0.3, 0.1),
        ]);
        let patterns = vec![interval(0.05, 0.25)];

        let selection = select_long(&notes, &patterns, Direction::Up, &CandidateConfig::default());
        assert!(selection.candidates.is_empty());
    }

    #[test]
    fn test_direction_selection_runs_short_on_long_remainder() {
        let notes = notes(&[
            (60.0, 0.0, 0.1),
            (61.0, 0.1, 0.1),
            (62.0, 0.2, 0.1),
            (63.0, 0.3, 0.1),
            (70.0, 1.0, 0.5),
            (72.0, 1.5, 0.5),
        ]);
        let patterns = vec![interval(0.05, 0.25), interval(1.2, 1.7), interval(3.0, 3.5)];

        let selection =
            select_for_direction(&notes, &patterns, Direction::Up, &CandidateConfig::default());

        assert_eq!(selection.long.len(), 1);
        assert_eq!(selection.short.len(), 1);
        assert_eq!(selection.short[0].pattern, patterns[1]);
        assert_eq!(selection.long_notes().len(), 1);
        assert_eq!(selection.short_patterns(), vec![patterns[1]]);
        assert_eq!(selection.remaining_notes, vec![notes[3]]);
        assert_eq!(selection.remaining_patterns, vec![patterns[2]]);
    }
}
