// Audio processing module
// WAV ingestion and candidate clip features

pub mod features;
pub mod ingest;

pub use features::{FeatureExtractor, SpectralFeatureExtractor, SPECTRAL_FEATURE_WIDTH};
pub use ingest::{ingest_wav, read_wav, AudioData, AudioError, MonoSignal};
