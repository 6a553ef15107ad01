// Candidate classification module
// Extracts features under each candidate span and labels them with a
// pre-trained technique classifier

pub mod backend;

pub use backend::{
    ClassifierError, FeatureScaling, LinearClassifier, LinearModel, TechniqueClassifier,
};

use serde::{Deserialize, Serialize};

use crate::audio::{FeatureExtractor, MonoSignal};
use crate::notes::Interval;

/// Features and predicted labels for one candidate list
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassifiedCandidates {
    pub features: Vec<Vec<f32>>,
    pub labels: Vec<String>,
}

/// Extract one feature vector per candidate span and classify them together
pub fn classify_candidates(
    signal: &MonoSignal,
    spans: &[Interval],
    extractor: &dyn FeatureExtractor,
    classifier: &dyn TechniqueClassifier,
) -> Result<ClassifiedCandidates, ClassifierError> {
    if spans.is_empty() {
        return Ok(ClassifiedCandidates::default());
    }

    let features: Vec<Vec<f32>> = spans
        .iter()
        .map(|span| extractor.extract(signal.clip(span), signal.sample_rate))
        .collect();
    let labels = classifier.predict(&features)?;

    log::debug!(
        "Classified {} candidates with {} features",
        spans.len(),
        extractor.name()
    );

    Ok(ClassifiedCandidates { features, labels })
}
