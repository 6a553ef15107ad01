// Candidate validity check
// Measures how many selected candidates actually hold a labelled technique

use serde::{Deserialize, Serialize};

use crate::notes::Interval;

/// Technique label of a reference annotation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceLabel {
    Bend,
    Slide,
    PullHammer,
}

impl ReferenceLabel {
    pub fn to_string(&self) -> &'static str {
        match self {
            ReferenceLabel::Bend => "bend",
            ReferenceLabel::Slide => "slide",
            ReferenceLabel::PullHammer => "pull_hammer",
        }
    }
}

/// Reference spans of one technique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelledReferences {
    pub label: ReferenceLabel,
    pub intervals: Vec<Interval>,
}

/// Reference coverage for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCoverage {
    pub label: ReferenceLabel,

    /// References falling inside at least one candidate
    pub matched: Vec<Interval>,

    /// References no candidate covers
    pub unmatched: Vec<Interval>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvaluation {
    pub valid: usize,
    pub invalid: usize,

    /// Candidates containing no reference onset
    pub invalid_candidates: Vec<Interval>,

    pub coverage: Vec<LabelCoverage>,
}

/// A candidate is valid when some reference onset of any label lies
/// strictly inside it. One reference may validate several candidates.
pub fn evaluate_candidates(
    candidates: &[Interval],
    references: &[LabelledReferences],
) -> CandidateEvaluation {
    let mut candidate_valid = vec![false; candidates.len()];
    let mut coverage = Vec::with_capacity(references.len());

    for set in references {
        let mut covered = vec![false; set.intervals.len()];

        for (c, candidate) in candidates.iter().enumerate() {
            for (r, reference) in set.intervals.iter().enumerate() {
                if candidate.strictly_contains(reference.onset) {
                    candidate_valid[c] = true;
                    covered[r] = true;
                }
            }
        }

        let (matched, unmatched): (Vec<_>, Vec<_>) = set
            .intervals
            .iter()
            .zip(&covered)
            .partition(|(_, &hit)| hit);

        coverage.push(LabelCoverage {
            label: set.label,
            matched: matched.into_iter().map(|(i, _)| *i).collect(),
            unmatched: unmatched.into_iter().map(|(i, _)| *i).collect(),
        });
    }

    let invalid_candidates: Vec<Interval> = candidates
        .iter()
        .zip(&candidate_valid)
        .filter(|(_, &valid)| !valid)
        .map(|(candidate, _)| *candidate)
        .collect();

    CandidateEvaluation {
        valid: candidates.len() - invalid_candidates.len(),
        invalid: invalid_candidates.len(),
        invalid_candidates,
        coverage,
    }
}
