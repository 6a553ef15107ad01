// Technique classifier backend
// Pre-trained one-vs-rest linear model that labels candidate feature vectors

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during classification
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Failed to read model file {path}: {source}")]
    ModelRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Model loading failed: {0}")]
    ModelLoadError(#[from] serde_json::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Feature vector {index} has width {actual}, model expects {expected}")]
    FeatureWidth {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Extractor '{extractor}' produces {actual} features, model expects {expected}")]
    ExtractorMismatch {
        extractor: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Labels candidate feature vectors with a technique name
pub trait TechniqueClassifier {
    /// Labels the classifier can emit
    fn labels(&self) -> &[String];

    /// Feature width the classifier expects
    fn width(&self) -> usize;

    /// One label per feature vector, in input order
    fn predict(&self, features: &[Vec<f32>]) -> Result<Vec<String>, ClassifierError>;
}

/// Per-feature standardization applied before scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaling {
    pub mean: Vec<f32>,
    pub scale: Vec<f32>,
}

/// Persisted model: one weight row and bias per label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub labels: Vec<String>,
    pub weights: Vec<Vec<f32>>,
    pub biases: Vec<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<FeatureScaling>,
}

/// One-vs-rest linear classifier; predicts the label with the highest `w·x + b`
#[derive(Debug, Clone)]
pub struct LinearClassifier {
    model: LinearModel,
    width: usize,
}

impl LinearClassifier {
    /// Validate the model's shapes and wrap it
    pub fn new(model: LinearModel) -> Result<Self, ClassifierError> {
        if model.labels.is_empty() {
            return Err(ClassifierError::InvalidModel("model has no labels".to_string()));
        }
        if model.weights.len() != model.labels.len() || model.biases.len() != model.labels.len() {
            return Err(ClassifierError::InvalidModel(format!(
                "{} labels but {} weight rows and {} biases",
                model.labels.len(),
                model.weights.len(),
                model.biases.len()
            )));
        }

        let width = model.weights[0].len();
        if model.weights.iter().any(|row| row.len() != width) {
            return Err(ClassifierError::InvalidModel(
                "weight rows differ in width".to_string(),
            ));
        }
        if let Some(scaling) = &model.scaling {
            if scaling.mean.len() != width || scaling.scale.len() != width {
                return Err(ClassifierError::InvalidModel(format!(
                    "scaling has {} means and {} scales for width {}",
                    scaling.mean.len(),
                    scaling.scale.len(),
                    width
                )));
            }
        }

        Ok(LinearClassifier { model, width })
    }

    pub fn from_json_bytes(data: &[u8]) -> Result<Self, ClassifierError> {
        Self::new(serde_json::from_slice(data)?)
    }

    /// Load a model persisted as JSON
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let data = std::fs::read(path).map_err(|source| ClassifierError::ModelRead {
            path: path.to_path_buf(),
            source,
        })?;
        let classifier = Self::from_json_bytes(&data)?;

        log::info!(
            "Loaded classifier from {} ({} labels, width {})",
            path.display(),
            classifier.model.labels.len(),
            classifier.width
        );
        Ok(classifier)
    }

    fn score(&self, row: &[f32], features: &[f32], bias: f32) -> f32 {
        let dot: f32 = match &self.model.scaling {
            Some(scaling) => row
                .iter()
                .zip(features)
                .zip(scaling.mean.iter().zip(&scaling.scale))
                .map(|((w, x), (mean, scale))| {
                    let scale = if *scale == 0.0 { 1.0 } else { *scale };
                    w * (x - mean) / scale
                })
                .sum(),
            None => row.iter().zip(features).map(|(w, x)| w * x).sum(),
        };
        dot + bias
    }
}

impl TechniqueClassifier for LinearClassifier {
    fn labels(&self) -> &[String] {
        &self.model.labels
    }

    fn width(&self) -> usize {
        self.width
    }

    fn predict(&self, features: &[Vec<f32>]) -> Result<Vec<String>, ClassifierError> {
        features
            .iter()
            .enumerate()
            .map(|(index, vector)| {
                if vector.len() != self.width {
                    return Err(ClassifierError::FeatureWidth {
                        index,
                        expected: self.width,
                        actual: vector.len(),
                    });
                }

                let best = self
                    .model
                    .weights
                    .iter()
                    .zip(&self.model.biases)
                    .map(|(row, &bias)| self.score(row, vector, bias))
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (label, score)| {
                        if score > best.1 {
                            (label, score)
                        } else {
                            best
                        }
                    })
                    .0;

                Ok(self.model.labels[best].clone())
            })
            .collect()
    }
}
