// Candidate clip feature extraction
// Turns the audio under a candidate span into a fixed-width vector for the
// technique classifier

use realfft::RealFftPlanner;

/// Turns a mono audio clip into a fixed-width feature vector
pub trait FeatureExtractor {
    /// Identifier of the feature set, recorded next to the written features
    fn name(&self) -> &'static str;

    /// Number of values `extract` returns
    fn width(&self) -> usize;

    fn extract(&self, clip: &[f32], sample_rate: u32) -> Vec<f32>;
}

/// Spectral shape and level descriptors
///
/// Layout: centroid (Hz), zero-crossing rate, low/mid/high band energy
/// ratios (below 200 Hz, 200-2000 Hz, above 2000 Hz), RMS, peak amplitude.
#[derive(Debug, Clone)]
pub struct SpectralFeatureExtractor {
    /// Largest FFT window in samples; shorter clips use their own length
    pub max_window: usize,
}

impl Default for SpectralFeatureExtractor {
    fn default() -> Self {
        SpectralFeatureExtractor { max_window: 2048 }
    }
}

pub const SPECTRAL_FEATURE_WIDTH: usize = 7;

impl FeatureExtractor for SpectralFeatureExtractor {
    fn name(&self) -> &'static str {
        "spectral"
    }

    fn width(&self) -> usize {
        SPECTRAL_FEATURE_WIDTH
    }

    fn extract(&self, clip: &[f32], sample_rate: u32) -> Vec<f32> {
        if clip.is_empty() || sample_rate == 0 {
            return vec![0.0; SPECTRAL_FEATURE_WIDTH];
        }

        let window_size = clip.len().min(self.max_window);
        let (centroid, bands) = spectral_shape(&clip[..window_size], sample_rate);

        vec![
            centroid,
            calculate_zcr(clip),
            bands[0],
            bands[1],
            bands[2],
            calculate_rms(clip),
            clip.iter().fold(0.0f32, |peak, s| peak.max(s.abs())),
        ]
    }
}

/// Rate of sign changes in the signal
fn calculate_zcr(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }

    let crossings = samples
        .windows(2)
        .filter(|pair| (pair[0] >= 0.0) != (pair[1] >= 0.0))
        .count();

    crossings as f32 / (samples.len() - 1) as f32
}

fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Spectral centroid in Hz and [low, mid, high] energy ratios of one window
fn spectral_shape(window: &[f32], sample_rate: u32) -> (f32, [f32; 3]) {
    let mut windowed = window.to_vec();
    apply_hann_window(&mut windowed);

    let Some(spectrum) = compute_fft(&windowed) else {
        return (0.0, [0.0; 3]);
    };

    let bin_width = sample_rate as f32 / window.len() as f32;
    (
        calculate_spectral_centroid(&spectrum, bin_width),
        calculate_band_energies(&spectrum, bin_width),
    )
}

/// Apply Hann window function to reduce spectral leakage
fn apply_hann_window(samples: &mut [f32]) {
    let n = samples.len() as f32;
    for (i, sample) in samples.iter_mut().enumerate() {
        *sample *= 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / n).cos());
    }
}

/// Magnitude spectrum of a real signal
fn compute_fft(samples: &[f32]) -> Option<Vec<f32>> {
    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(samples.len());

    let mut input = samples.to_vec();
    let mut spectrum = fft.make_output_vec();

    if let Err(e) = fft.process(&mut input, &mut spectrum) {
        log::warn!("FFT of {} samples failed: {}", samples.len(), e);
        return None;
    }

    Some(spectrum.iter().map(|c| c.norm()).collect())
}

fn calculate_spectral_centroid(spectrum: &[f32], bin_width: f32) -> f32 {
    let (weighted_sum, total_magnitude) = spectrum
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(weighted, total), (i, &magnitude)| {
            (weighted + i as f32 * bin_width * magnitude, total + magnitude)
        });

    if total_magnitude > 0.0 {
        weighted_sum / total_magnitude
    } else {
        0.0
    }
}

fn calculate_band_energies(spectrum: &[f32], bin_width: f32) -> [f32; 3] {
    let low_max_bin = (200.0 / bin_width) as usize;
    let mid_max_bin = (2000.0 / bin_width) as usize;

    let mut energies = [0.0f32; 3];
    for (i, &magnitude) in spectrum.iter().enumerate() {
        let band = if i < low_max_bin {
            0
        } else if i < mid_max_bin {
            1
        } else {
            2
        };
        energies[band] += magnitude * magnitude;
    }

    let total: f32 = energies.iter().sum();
    if total > 0.0 {
        energies.map(|e| e / total)
    } else {
        [0.0; 3]
    }
}
