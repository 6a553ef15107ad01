// Detector configuration
// Domain thresholds for every detector, loaded from TOML with compiled defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::contour::FrameClock;
use crate::notes::Technique;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Frame timing of the melody contour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourConfig {
    /// Hop size in samples between contour frames
    pub hop: u32,

    /// Sample rate of the analysed audio in Hz
    pub sample_rate: u32,
}

impl Default for ContourConfig {
    fn default() -> Self {
        ContourConfig {
            hop: 256,
            sample_rate: 44100,
        }
    }
}

/// Continuously ascending/descending pattern thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CadConfig {
    /// Minimal run length in seconds
    pub min_duration: f64,

    /// Minimal pitch excursion of a run in semitones
    pub min_extent: f64,

    /// Maximal pitch excursion of a run in semitones
    pub max_extent: f64,

    /// Per-frame jitter limit; larger steps end the run
    pub max_step: f64,

    /// Longest plateau (equal frames) absorbed into a run
    pub max_plateau_frames: usize,
}

impl Default for CadConfig {
    fn default() -> Self {
        CadConfig {
            min_duration: 0.05,
            min_extent: 0.8,
            max_extent: 3.8,
            max_step: 0.5,
            max_plateau_frames: 16,
        }
    }
}

/// Pitch grid used to quantize the contour before ladder tracing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantizeConfig {
    /// Uniformly spaced partition boundaries
    pub partitions: Vec<f64>,

    /// Value emitted for each partition
    pub codebook: Vec<f64>,
}

impl Default for QuantizeConfig {
    fn default() -> Self {
        QuantizeConfig {
            partitions: (0..90).map(f64::from).collect(),
            codebook: (0..91).map(f64::from).collect(),
        }
    }
}

/// Long slide (ladder) thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlideConfig {
    /// Longest duration of a ladder step in seconds
    pub max_transition_duration: f64,

    /// Shortest duration of a ladder step in seconds
    pub min_transition_duration: f64,

    /// Minimal number of notes in a ladder
    pub min_steps: usize,
}

impl Default for SlideConfig {
    fn default() -> Self {
        SlideConfig {
            max_transition_duration: 0.09,
            min_transition_duration: 0.015,
            min_steps: 5,
        }
    }
}

/// Wide vibrato (serrated run) thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VibratoConfig {
    /// Largest silence between two notes of a serrated run in seconds
    pub max_gap: f64,

    /// Minimal number of notes in a serrated run
    pub min_notes: usize,

    /// Extents in semitones, applied in order
    pub extents: Vec<u8>,
}

impl Default for VibratoConfig {
    fn default() -> Self {
        VibratoConfig {
            max_gap: 0.01,
            min_notes: 5,
            extents: vec![2, 1],
        }
    }
}

/// Pattern/note intersection rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateConfig {
    /// Largest pitch difference between the covered notes in semitones
    pub max_pitch_difference: f64,

    /// Largest silence between two covered notes in seconds
    pub max_gap: f64,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        CandidateConfig {
            max_pitch_difference: 3.0,
            max_gap: 0.05,
        }
    }
}

/// Note transition locator thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Both notes of a transition must be longer than this (seconds)
    pub min_note_duration: f64,

    /// Largest silence between the two notes (seconds)
    pub gap_tolerance: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        TransitionConfig {
            min_note_duration: 0.05,
            gap_tolerance: 0.05,
        }
    }
}

/// Complete detector configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub contour: ContourConfig,
    pub cad: CadConfig,
    pub quantize: QuantizeConfig,
    pub slide: SlideConfig,
    pub vibrato: VibratoConfig,
    pub candidate: CandidateConfig,
    pub transition: TransitionConfig,
}

impl DetectorConfig {
    /// Load configuration
    ///
    /// Lookup order:
    /// 1. `config_path` when given (must exist)
    /// 2. `<config_dir>/fretsense/config.toml` when present
    /// 3. Compiled defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => user_config_path().filter(|p| p.exists()),
        };

        let config = match path {
            Some(path) => {
                log::info!("Loading detector config from {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                log::debug!("No config file found, using defaults");
                DetectorConfig::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; absent keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&contents).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| e.to_string())
    }

    /// Reject values the detectors cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contour.hop == 0 || self.contour.sample_rate == 0 {
            return Err(ConfigError::Invalid(
                "contour hop and sample_rate must be positive".to_string(),
            ));
        }
        if self.cad.min_extent > self.cad.max_extent {
            return Err(ConfigError::Invalid(format!(
                "cad min_extent {} exceeds max_extent {}",
                self.cad.min_extent, self.cad.max_extent
            )));
        }
        if self.slide.min_transition_duration > self.slide.max_transition_duration {
            return Err(ConfigError::Invalid(format!(
                "slide min_transition_duration {} exceeds max_transition_duration {}",
                self.slide.min_transition_duration, self.slide.max_transition_duration
            )));
        }
        if self.slide.min_steps == 0 {
            return Err(ConfigError::Invalid(
                "slide min_steps must be positive".to_string(),
            ));
        }
        if self.vibrato.min_notes == 0 {
            return Err(ConfigError::Invalid(
                "vibrato min_notes must be positive".to_string(),
            ));
        }
        let max_extent = Technique::Vibrato.max_sub_technique();
        if let Some(extent) = self
            .vibrato
            .extents
            .iter()
            .find(|&&extent| extent == 0 || extent > max_extent)
        {
            return Err(ConfigError::Invalid(format!(
                "vibrato extent {} outside 1..={}",
                extent, max_extent
            )));
        }
        if self.quantize.partitions.len() < 2 {
            return Err(ConfigError::Invalid(
                "quantize needs at least two partitions".to_string(),
            ));
        }
        if self.quantize.codebook.len() < self.quantize.partitions.len() {
            return Err(ConfigError::Invalid(format!(
                "quantize codebook has {} entries for {} partitions",
                self.quantize.codebook.len(),
                self.quantize.partitions.len()
            )));
        }
        Ok(())
    }

    pub fn clock(&self) -> FrameClock {
        FrameClock::new(self.contour.hop, self.contour.sample_rate)
    }
}

/// `<config_dir>/fretsense/config.toml`, if the platform has a config directory
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fretsense").join("config.toml"))
}
