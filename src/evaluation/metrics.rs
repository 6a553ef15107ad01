// Detection scoring
// Matches estimated spans against reference onsets and computes
// precision, recall and F-measure

use serde::{Deserialize, Serialize};

use crate::error::{ExpressionError, ExpressionResult};
use crate::notes::Interval;

/// TP/FP/FN partition of one matching run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchPartition {
    /// Estimates that matched a reference
    pub true_positives: Vec<Interval>,

    /// Estimates that matched nothing
    pub false_positives: Vec<Interval>,

    /// References no estimate matched
    pub false_negatives: Vec<Interval>,
}

/// Scores of one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub partition: MatchPartition,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
}

impl Evaluation {
    pub fn true_positive_count(&self) -> usize {
        self.partition.true_positives.len()
    }

    pub fn false_positive_count(&self) -> usize {
        self.partition.false_positives.len()
    }

    pub fn false_negative_count(&self) -> usize {
        self.partition.false_negatives.len()
    }
}

/// One-to-one greedy matching in estimate order
///
/// An estimate matches the first unmatched reference whose onset lies in
/// the closed estimate span.
pub fn match_intervals(estimates: &[Interval], references: &[Interval]) -> MatchPartition {
    let mut reference_used = vec![false; references.len()];
    let mut partition = MatchPartition::default();

    for estimate in estimates {
        let hit = references
            .iter()
            .enumerate()
            .position(|(r, reference)| !reference_used[r] && estimate.contains(reference.onset));

        match hit {
            Some(r) => {
                reference_used[r] = true;
                partition.true_positives.push(*estimate);
            }
            None => partition.false_positives.push(*estimate),
        }
    }

    partition.false_negatives = references
        .iter()
        .zip(&reference_used)
        .filter(|(_, &used)| !used)
        .map(|(reference, _)| *reference)
        .collect();

    partition
}

/// TP / (TP + FP); fails when there are no estimates
pub fn precision(true_positives: usize, false_positives: usize) -> ExpressionResult<f64> {
    let total = true_positives + false_positives;
    if total == 0 {
        return Err(ExpressionError::DivisionByZero(
            "precision is undefined without estimates".to_string(),
        ));
    }
    Ok(true_positives as f64 / total as f64)
}

/// TP / (TP + FN); fails when there are no references
pub fn recall(true_positives: usize, false_negatives: usize) -> ExpressionResult<f64> {
    let total = true_positives + false_negatives;
    if total == 0 {
        return Err(ExpressionError::DivisionByZero(
            "recall is undefined without references".to_string(),
        ));
    }
    Ok(true_positives as f64 / total as f64)
}

/// Harmonic mean of precision and recall; 0 when both are 0
pub fn f_measure(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

/// Match `estimates` against `references` and score the result
pub fn evaluate(estimates: &[Interval], references: &[Interval]) -> ExpressionResult<Evaluation> {
    let partition = match_intervals(estimates, references);

    let tp = partition.true_positives.len();
    let precision = precision(tp, partition.false_positives.len())?;
    let recall = recall(tp, partition.false_negatives.len())?;

    Ok(Evaluation {
        f_measure: f_measure(precision, recall),
        precision,
        recall,
        partition,
    })
}
