// Batch detection runner
// Runs the per-stem detection pipeline over melody files, isolating failures
// so one bad stem never stops the batch or leaves partial outputs behind

use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::report::{BatchSummary, DetectionCounts, StemRecord, StemStatus};
use super::trace::{PipelineStage, TraceBuilder, TraceEntry, TraceWriter};
use super::PipelineError;
use crate::audio::{read_wav, FeatureExtractor, SpectralFeatureExtractor};
use crate::classify::{classify_candidates, ClassifierError, LinearClassifier, TechniqueClassifier};
use crate::config::DetectorConfig;
use crate::contour::{detect_cad, CadScan};
use crate::error::{ExpressionError, ExpressionResult};
use crate::notes::{notes_of, validate_notes, Direction, ExpressionStyleNote, Note};
use crate::storage::{
    discover_melody_files, file_sha256, format_table, note_path_for, read_contour, read_notes,
    stem_of, OutputSet, StorageResult,
};
use crate::techniques::{
    apply_long_slide, detect_wide_vibrato, select_for_direction, DirectionSelection,
    LongSlideOutcome, WideVibratoOutcome,
};

pub const TRACE_FILE_NAME: &str = "fretsense.trace.jsonl";
pub const SUMMARY_FILE_NAME: &str = "fretsense.summary.json";

/// Where a detection batch reads and writes
#[derive(Debug, Clone)]
pub struct DetectOptions {
    /// Directory holding `<stem>.pruned.note` files
    pub note_dir: PathBuf,

    pub output_dir: PathBuf,

    /// Directory holding `<stem>.wav` recordings for classification
    pub audio_dir: Option<PathBuf>,

    /// Persisted classifier model (JSON)
    pub model: Option<PathBuf>,
}

/// CAD scan and candidate selection of one direction
#[derive(Debug, Clone)]
pub struct DirectionResult {
    pub scan: CadScan,
    pub selection: DirectionSelection,
}

/// Everything the pipeline derives from one stem
#[derive(Debug, Clone)]
pub struct StemDetection {
    pub input_notes: usize,
    pub vibrato: WideVibratoOutcome,
    pub long_slide: LongSlideOutcome,

    /// Annotated table after the long-slide stage
    pub annotated: Vec<ExpressionStyleNote>,

    pub ascending: DirectionResult,
    pub descending: DirectionResult,
}

/// Run vibrato, long slide, CAD scans and candidate selection, in that order
pub fn detect_stem(
    contour: &[f64],
    notes: &[Note],
    config: &DetectorConfig,
) -> ExpressionResult<StemDetection> {
    validate_notes(notes)?;

    let vibrato = detect_wide_vibrato(notes, &config.vibrato)?;
    let mut annotated = vibrato.annotated.clone();
    let long_slide = apply_long_slide(contour, &mut annotated, config)?;

    let clock = config.clock();
    let candidate_notes = notes_of(&annotated);
    let scan_direction = |direction: Direction| {
        let scan = detect_cad(contour, direction, &config.cad, clock);
        let selection =
            select_for_direction(&candidate_notes, &scan.patterns, direction, &config.candidate);
        DirectionResult { scan, selection }
    };

    Ok(StemDetection {
        input_notes: notes.len(),
        ascending: scan_direction(Direction::Up),
        descending: scan_direction(Direction::Down),
        vibrato,
        long_slide,
        annotated,
    })
}

fn annotated_rows(annotated: &[ExpressionStyleNote]) -> Vec<Vec<f64>> {
    annotated.iter().map(|n| n.as_row()).collect()
}

impl StemDetection {
    pub fn direction(&self, direction: Direction) -> &DirectionResult {
        match direction {
            Direction::Up => &self.ascending,
            Direction::Down => &self.descending,
        }
    }

    pub fn counts(&self) -> DetectionCounts {
        let directions = [&self.ascending, &self.descending];
        DetectionCounts {
            input_notes: self.input_notes,
            annotated_notes: self.annotated.len(),
            vibrato_notes: self.vibrato.detections.iter().map(|d| d.notes.len()).sum(),
            long_slides: self.long_slide.intervals.len(),
            ascending_patterns: self.ascending.scan.patterns.len(),
            descending_patterns: self.descending.scan.patterns.len(),
            long_candidates: directions.iter().map(|d| d.selection.long.len()).sum(),
            short_candidates: directions.iter().map(|d| d.selection.short.len()).sum(),
        }
    }

    /// Stage the numeric output tables of this stem
    pub fn stage_outputs(&self, stem: &str, outputs: &mut OutputSet) {
        for direction in [Direction::Up, Direction::Down] {
            let label = direction.label();
            let result = self.direction(direction);

            let patterns: Vec<Vec<f64>> = result.scan.patterns.iter().map(|p| p.as_row()).collect();
            let contour: Vec<[f64; 1]> = result.scan.pattern_contour.iter().map(|&v| [v]).collect();
            let short: Vec<Vec<f64>> =
                result.selection.short_patterns().iter().map(|p| p.as_row()).collect();
            let long: Vec<Vec<f64>> =
                result.selection.long_notes().iter().map(|n| n.as_row()).collect();

            outputs.add(format!("{}.{}.pattern", stem, label), format_table(&patterns));
            outputs.add(format!("{}.{}.pitch_contour", stem, label), format_table(&contour));
            outputs.add(format!("{}.{}.candidate", stem, label), format_table(&short));
            outputs.add(format!("{}.long.{}.note", stem, label), format_table(&long));
        }

        outputs.add(
            format!("{}.after_WideVibrato.expression_style_note", stem),
            format_table(&annotated_rows(&self.vibrato.annotated)),
        );
        outputs.add(
            format!("{}.after_LongSlide.expression_style_note", stem),
            format_table(&annotated_rows(&self.annotated)),
        );
    }
}

/// Optional feature-extraction and classification of short candidates
pub struct ClassificationStage {
    audio_dir: PathBuf,
    extractor: Box<dyn FeatureExtractor>,
    classifier: Box<dyn TechniqueClassifier>,
}

impl ClassificationStage {
    /// Pair an extractor with a classifier of the same feature width
    pub fn new(
        audio_dir: PathBuf,
        extractor: Box<dyn FeatureExtractor>,
        classifier: Box<dyn TechniqueClassifier>,
    ) -> Result<Self, ClassifierError> {
        if extractor.width() != classifier.width() {
            return Err(ClassifierError::ExtractorMismatch {
                extractor: extractor.name(),
                expected: classifier.width(),
                actual: extractor.width(),
            });
        }

        Ok(ClassificationStage {
            audio_dir,
            extractor,
            classifier,
        })
    }

    /// Spectral features and a linear model loaded from `model`
    pub fn load(audio_dir: &Path, model: &Path) -> Result<Self, PipelineError> {
        let classifier = LinearClassifier::load(model)?;
        Ok(Self::new(
            audio_dir.to_path_buf(),
            Box::new(SpectralFeatureExtractor::default()),
            Box::new(classifier),
        )?)
    }

    pub fn audio_path(&self, stem: &str) -> PathBuf {
        self.audio_dir.join(format!("{}.wav", stem))
    }

    /// Classify the short candidates of both directions, staging the feature
    /// and prediction files; returns the number of classified candidates
    pub fn run(
        &self,
        stem: &str,
        detection: &StemDetection,
        outputs: &mut OutputSet,
    ) -> Result<usize, PipelineError> {
        let audio_path = self.audio_path(stem);
        if !audio_path.exists() {
            return Err(ExpressionError::MissingInput {
                stem: stem.to_string(),
                path: audio_path,
            }
            .into());
        }
        let signal = read_wav(&audio_path)?.to_mono();

        let mut classified = 0;
        for direction in [Direction::Up, Direction::Down] {
            let spans = detection.direction(direction).selection.short_patterns();
            let result = classify_candidates(
                &signal,
                &spans,
                self.extractor.as_ref(),
                self.classifier.as_ref(),
            )?;

            let feature_rows: Vec<Vec<f64>> = result
                .features
                .iter()
                .map(|row| row.iter().map(|&v| v as f64).collect())
                .collect();
            let predictions: String = result.labels.iter().map(|l| format!("{}\n", l)).collect();

            let base = format!("{}.{}.candidate.raw", stem, direction.label());
            outputs.add(format!("{}.feature", base), format_table(&feature_rows));
            outputs.add(format!("{}.prediction", base), predictions);
            classified += result.labels.len();
        }

        Ok(classified)
    }
}

/// Runs the detection pipeline over a batch of melody files
pub struct BatchRunner<'a> {
    config: &'a DetectorConfig,
    options: DetectOptions,
    classification: Option<ClassificationStage>,
    trace: TraceWriter,
    run_id: Uuid,
}

impl<'a> BatchRunner<'a> {
    /// Prepare the output directory and, when both an audio directory and a
    /// model are given, the classification stage
    pub fn new(config: &'a DetectorConfig, options: DetectOptions) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(&options.output_dir)?;

        let classification = match (&options.audio_dir, &options.model) {
            (Some(audio_dir), Some(model)) => Some(ClassificationStage::load(audio_dir, model)?),
            (None, None) => None,
            _ => {
                log::warn!("Classification needs both an audio directory and a model; skipping it");
                None
            }
        };

        let trace = TraceWriter::new(options.output_dir.join(TRACE_FILE_NAME));

        Ok(BatchRunner {
            config,
            options,
            classification,
            trace,
            run_id: Uuid::new_v4(),
        })
    }

    /// Replace the classification stage (e.g. with another extractor or model)
    pub fn with_classification(mut self, stage: ClassificationStage) -> Self {
        self.classification = Some(stage);
        self
    }

    /// Process every melody file under `melody_input` and write the summary
    pub fn run(&self, melody_input: &Path) -> Result<BatchSummary, PipelineError> {
        let files = discover_melody_files(melody_input)?;
        log::info!(
            "Processing {} melody files from {}",
            files.len(),
            melody_input.display()
        );

        let mut summary = BatchSummary::new(self.run_id);

        for melody_path in &files {
            let Some(stem) = stem_of(melody_path) else {
                log::warn!("Skipping {}: no usable file stem", melody_path.display());
                continue;
            };
            let trace = TraceBuilder::new(self.run_id, stem.as_str());

            let record = match self.process_stem(&stem, melody_path, &trace) {
                Ok(record) => record,
                Err(e) => {
                    log::warn!("Skipping '{}': {}", stem, e);
                    self.emit(trace.entry(PipelineStage::Skipped, e.to_string()));
                    StemRecord::skipped(stem.as_str(), e.to_string())
                }
            };
            summary.record(record);
        }

        summary.finish();
        summary.write(&self.options.output_dir.join(SUMMARY_FILE_NAME))?;

        log::info!(
            "Batch {} finished: {} processed, {} skipped",
            self.run_id,
            summary.processed_count(),
            summary.skipped_count()
        );

        Ok(summary)
    }

    fn process_stem(
        &self,
        stem: &str,
        melody_path: &Path,
        trace: &TraceBuilder,
    ) -> Result<StemRecord, PipelineError> {
        let note_path = note_path_for(&self.options.note_dir, stem);
        let contour = load_input(stem, melody_path, read_contour)?;
        let notes = load_input(stem, &note_path, read_notes)?;
        self.emit(trace.with_data(
            PipelineStage::Load,
            format!("{} frames, {} notes", contour.len(), notes.len()),
            serde_json::json!({ "frames": contour.len(), "notes": notes.len() }),
        ));

        let detection = detect_stem(&contour, &notes, self.config)?;
        self.trace_detection(trace, &detection);

        let mut outputs = OutputSet::new();
        detection.stage_outputs(stem, &mut outputs);

        if let Some(stage) = &self.classification {
            let classified = stage.run(stem, &detection, &mut outputs)?;
            self.emit(trace.entry(
                PipelineStage::Classification,
                format!("{} candidates classified", classified),
            ));
        }

        let melody_sha256 = file_sha256(melody_path)?;
        let notes_sha256 = file_sha256(&note_path)?;

        let outputs_written: Vec<String> = outputs.file_names().map(str::to_string).collect();
        let written = outputs.commit(&self.options.output_dir)?;
        self.emit(trace.entry(PipelineStage::Write, format!("{} files", written.len())));

        log::info!(
            "Processed '{}': {} notes -> {} annotated",
            stem,
            notes.len(),
            detection.annotated.len()
        );

        Ok(StemRecord {
            stem: stem.to_string(),
            status: StemStatus::Processed,
            reason: None,
            melody_sha256: Some(melody_sha256),
            notes_sha256: Some(notes_sha256),
            outputs: outputs_written,
            counts: Some(detection.counts()),
        })
    }

    fn trace_detection(&self, trace: &TraceBuilder, detection: &StemDetection) {
        let counts = detection.counts();
        let entries = [
            trace.with_data(
                PipelineStage::WideVibrato,
                format!("{} vibrato notes", counts.vibrato_notes),
                serde_json::json!({
                    "extents": detection.vibrato.detections.iter()
                        .map(|d| serde_json::json!({ "extent": d.extent, "notes": d.notes.len() }))
                        .collect::<Vec<_>>(),
                }),
            ),
            trace.with_data(
                PipelineStage::LongSlide,
                format!("{} long slides", counts.long_slides),
                serde_json::json!(detection.long_slide.summary),
            ),
            trace.with_data(
                PipelineStage::CadScan,
                format!(
                    "{} ascending, {} descending patterns",
                    counts.ascending_patterns, counts.descending_patterns
                ),
                serde_json::json!({
                    "ascending": counts.ascending_patterns,
                    "descending": counts.descending_patterns,
                }),
            ),
            trace.with_data(
                PipelineStage::CandidateSelection,
                format!(
                    "{} long, {} short candidates",
                    counts.long_candidates, counts.short_candidates
                ),
                serde_json::json!(counts),
            ),
        ];

        if let Err(e) = self.trace.write_batch(&entries) {
            log::warn!("Failed to write trace {}: {}", self.trace.path().display(), e);
        }
    }

    fn emit(&self, entry: TraceEntry) {
        if let Err(e) = self.trace.write(&entry) {
            log::warn!("Failed to write trace {}: {}", self.trace.path().display(), e);
        }
    }
}

/// Read one per-stem input, reporting an absent file as `MissingInput`
fn load_input<T>(
    stem: &str,
    path: &Path,
    read: impl Fn(&Path) -> StorageResult<T>,
) -> Result<T, PipelineError> {
    if !path.exists() {
        return Err(ExpressionError::MissingInput {
            stem: stem.to_string(),
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(read(path)?)
}

/// Convenience wrapper: build a runner and process `melody_input`
pub fn run_batch(
    melody_input: &Path,
    options: DetectOptions,
    config: &DetectorConfig,
) -> Result<BatchSummary, PipelineError> {
    BatchRunner::new(config, options)?.run(melody_input)
}
