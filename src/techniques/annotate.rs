// Annotation merging
// Stamps detected techniques onto the annotated note table, truncating or
// deleting annotated notes that a detection's span subsumes

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::ExpressionResult;
use crate::notes::types::TIME_EPSILON;
use crate::notes::{ExpressionStyleNote, Note, StyleTags, Technique};

/// How an annotated note relates to a styled (detected) note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Onsets differ; the styled note does not apply here
    Disjoint,

    /// Same onset and the annotated note lasts at least as long:
    /// truncate it to the styled duration, no deletions
    Covers,

    /// Same onset but the styled note extends past the annotated note:
    /// walk the following notes to resolve the overlap
    Spans,
}

/// Transition taken for each annotated note following a `Spans` target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerTransition {
    /// Ends before the styled offset: deleted, walk continues
    Subsumed,

    /// Reaches the styled offset and starts after it: kept, walk ends
    BoundaryKept,

    /// Reaches the styled offset but starts inside the styled span:
    /// deleted, walk ends
    BoundaryAbsorbed,
}

/// Outcome of one `update` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSummary {
    /// Annotated notes that received the technique tag
    pub stamped: usize,

    /// Annotated notes removed because a styled span subsumed them
    pub deleted: usize,
}

pub fn classify_match(target: &Note, styled: &Note) -> MatchKind {
    if (target.onset - styled.onset).abs() > TIME_EPSILON {
        MatchKind::Disjoint
    } else if target.duration >= styled.duration - TIME_EPSILON {
        MatchKind::Covers
    } else {
        MatchKind::Spans
    }
}

pub fn classify_follower(follower: &Note, styled_offset: f64) -> FollowerTransition {
    if follower.offset() < styled_offset - TIME_EPSILON {
        FollowerTransition::Subsumed
    } else if follower.onset > styled_offset + TIME_EPSILON {
        FollowerTransition::BoundaryKept
    } else {
        FollowerTransition::BoundaryAbsorbed
    }
}

/// Merge styled notes of one technique into the annotated table
///
/// For every annotated note sharing a styled note's onset, the annotated
/// note takes the styled duration and the technique tag. When the styled
/// note is longer, the notes it subsumes are deleted. Deletions are
/// collected and applied once at the end, so the table never grows.
pub fn update(
    annotated: &mut Vec<ExpressionStyleNote>,
    styled: &[Note],
    technique: Technique,
    sub_technique: u8,
) -> ExpressionResult<UpdateSummary> {
    // Reject an out-of-range tag before touching the table
    StyleTags::default().set(technique, sub_technique)?;

    let mut doomed = BTreeSet::new();
    let mut summary = UpdateSummary::default();

    for styled_note in styled {
        for target in 0..annotated.len() {
            match classify_match(&annotated[target].note, styled_note) {
                MatchKind::Disjoint => continue,
                MatchKind::Covers => {}
                MatchKind::Spans => {
                    let styled_offset = styled_note.offset();
                    for follower in target + 1..annotated.len() {
                        match classify_follower(&annotated[follower].note, styled_offset) {
                            FollowerTransition::Subsumed => {
                                doomed.insert(follower);
                            }
                            FollowerTransition::BoundaryKept => break,
                            FollowerTransition::BoundaryAbsorbed => {
                                doomed.insert(follower);
                                break;
                            }
                        }
                    }
                }
            }

            let entry = &mut annotated[target];
            entry.note.duration = styled_note.duration;
            entry.tags.set(technique, sub_technique)?;
            summary.stamped += 1;
        }
    }

    if !doomed.is_empty() {
        let mut index = 0;
        annotated.retain(|_| {
            let keep = !doomed.contains(&index);
            index += 1;
            keep
        });
        summary.deleted = doomed.len();
    }

    log::debug!(
        "Merged {} {} notes (sub-technique {}): {} stamped, {} deleted",
        styled.len(),
        technique.to_string(),
        sub_technique,
        summary.stamped,
        summary.deleted
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::annotate_plain;

    fn table(notes: &[(f64, f64, f64)]) -> Vec<ExpressionStyleNote> {
        let notes: Vec<Note> = notes.iter().map(|&(p, o, d)| Note::new(p, o, d)).collect();
        annotate_plain(&notes)
    }

    #[test]
    fn test_classify_match_transitions() {
        let target = Note::new(60.0, 1.0, 0.5);

        assert_eq!(
            classify_match(&target, &Note::new(60.0, 1.2, 0.1)),
            MatchKind::Disjoint
        );
        assert_eq!(
            classify_match(&target, &Note::new(60.0, 1.0, 0.3)),
            MatchKind::Covers
        );
        assert_eq!(
            classify_match(&target, &Note::new(60.0, 1.0, 0.5)),
            MatchKind::Covers
        );
        assert_eq!(
            classify_match(&target, &Note::new(60.0, 1.0, 0.9)),
            MatchKind::Spans
        );
    }

    #[test]
    fn test_classify_match_tolerates_summed_onsets() {
        // 0.1 + 0.2 differs from 0.3 in the last bits
        let target = Note::new(60.0, 0.1 + 0.2, 0.5);

        assert_eq!(
            classify_match(&target, &Note::new(60.0, 0.3, 0.5)),
            MatchKind::Covers
        );
        assert_eq!(
            classify_follower(&Note::new(60.0, 0.3, 0.2), 0.1 + 0.2),
            FollowerTransition::BoundaryAbsorbed
        );
    }

    #[test]
    fn test_classify_follower_transitions() {
        // Styled span ends at 2.0
        assert_eq!(
            classify_follower(&Note::new(60.0, 1.5, 0.3), 2.0),
            FollowerTransition::Subsumed
        );
        assert_eq!(
            classify_follower(&Note::new(60.0, 2.1, 0.3), 2.0),
            FollowerTransition::BoundaryKept
        );
        assert_eq!(
            classify_follower(&Note::new(60.0, 1.8, 0.5), 2.0),
            FollowerTransition::BoundaryAbsorbed
        );
    }

    #[test]
    fn test_covers_truncates_without_deletion() {
        let mut annotated = table(&[(60.0, 0.0, 1.0), (62.0, 1.0, 0.5)]);

        let summary = update(
            &mut annotated,
            &[Note::new(60.0, 0.0, 0.6)],
            Technique::Bend,
            2,
        )
        .unwrap();

        assert_eq!(summary, UpdateSummary { stamped: 1, deleted: 0 });
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].note.duration, 0.6);
        assert_eq!(annotated[0].tags.bend, 2);
        assert!(annotated[1].tags.is_plain());
    }

    #[test]
    fn test_spans_deletes_subsumed_and_keeps_boundary() {
        let mut annotated = table(&[
            (60.0, 0.0, 0.2),
            (61.0, 0.2, 0.2),
            (60.0, 0.4, 0.2),
            (64.0, 1.0, 0.5),
        ]);

        // Styled note covers 0.0..0.7; the note at 1.0 starts after it
        let summary = update(
            &mut annotated,
            &[Note::new(60.0, 0.0, 0.7)],
            Technique::Vibrato,
            1,
        )
        .unwrap();

        assert_eq!(summary.deleted, 2);
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].note.duration, 0.7);
        assert_eq!(annotated[0].tags.vibrato, 1);
        assert_eq!(annotated[1].note.pitch, 64.0);
        assert!(annotated[1].tags.is_plain());
    }

    #[test]
    fn test_spans_absorbs_straddling_boundary() {
        let mut annotated = table(&[(60.0, 0.0, 0.2), (59.0, 0.2, 0.5), (58.0, 0.7, 0.3)]);

        // Styled span ends at 0.5; the second note straddles it
        let summary = update(
            &mut annotated,
            &[Note::new(60.0, 0.0, 0.5)],
            Technique::Slide,
            2,
        )
        .unwrap();

        assert_eq!(summary.deleted, 1);
        assert_eq!(annotated.len(), 2);
        assert_eq!(annotated[0].tags.slide, 2);
        assert_eq!(annotated[0].note.duration, 0.5);
        assert_eq!(annotated[1].note.pitch, 58.0);
    }

    #[test]
    fn test_spans_to_table_end_still_stamps() {
        let mut annotated = table(&[(60.0, 0.0, 0.2), (61.0, 0.2, 0.2)]);

        let summary = update(
            &mut annotated,
            &[Note::new(60.0, 0.0, 1.0)],
            Technique::Slide,
            1,
        )
        .unwrap();

        assert_eq!(summary, UpdateSummary { stamped: 1, deleted: 1 });
        assert_eq!(annotated.len(), 1);
        assert_eq!(annotated[0].note.duration, 1.0);
        assert_eq!(annotated[0].tags.slide, 1);
    }

    #[test]
    fn test_empty_style_list_is_noop() {
        let mut annotated = table(&[(60.0, 0.0, 0.2), (61.0, 0.2, 0.2)]);
        let before = annotated.clone();

        let summary = update(&mut annotated, &[], Technique::Vibrato, 2).unwrap();

        assert_eq!(summary, UpdateSummary::default());
        assert_eq!(annotated, before);
    }

    #[test]
    fn test_disjoint_onsets_leave_table_untouched() {
        let mut annotated = table(&[(60.0, 0.0, 0.2), (61.0, 0.2, 0.2)]);
        let before = annotated.clone();

        update(&mut annotated, &[Note::new(60.0, 0.1, 0.5)], Technique::Bend, 1).unwrap();
        assert_eq!(annotated, before);
    }

    #[test]
    fn test_invalid_sub_technique_rejected_before_mutation() {
        let mut annotated = table(&[(60.0, 0.0, 1.0)]);
        let before = annotated.clone();

        let result = update(&mut annotated, &[Note::new(60.0, 0.0, 0.5)], Technique::Pull, 3);

        assert!(result.is_err());
        assert_eq!(annotated, before);
    }

    #[test]
    fn test_note_count_never_increases() {
        let mut annotated = table(&[
            (60.0, 0.0, 0.1),
            (61.0, 0.1, 0.1),
            (62.0, 0.2, 0.1),
            (63.0, 0.3, 0.1),
        ]);
        let styled = vec![
            Note::new(60.0, 0.0, 0.25),
            Note::new(63.0, 0.3, 0.05),
            Note::new(70.0, 5.0, 1.0),
        ];

        let before = annotated.len();
        update(&mut annotated, &styled, Technique::Hammer, 1).unwrap();
        assert!(annotated.len() <= before);
    }
}
