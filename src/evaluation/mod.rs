// Evaluation module
// Scores detections and candidates against reference annotations

pub mod candidates;
pub mod metrics;

pub use candidates::{
    evaluate_candidates, CandidateEvaluation, LabelCoverage, LabelledReferences, ReferenceLabel,
};
pub use metrics::{evaluate, f_measure, match_intervals, precision, recall, Evaluation, MatchPartition};
