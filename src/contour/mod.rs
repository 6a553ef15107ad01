// Pitch contour module
// Frame timing, CAD pattern scanning and pitch quantization

pub mod pattern;
pub mod quantize;

pub use pattern::{detect_cad, CadScan};
pub use quantize::{frame_to_note, quantize};

use serde::{Deserialize, Serialize};

/// Converts between contour frame indices and seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameClock {
    /// Hop size in samples between frames
    pub hop: u32,

    /// Sample rate of the analysed audio in Hz
    pub sample_rate: u32,
}

impl FrameClock {
    pub fn new(hop: u32, sample_rate: u32) -> Self {
        FrameClock { hop, sample_rate }
    }

    /// Seconds covered by `frames` contour frames
    pub fn frames_to_seconds(&self, frames: usize) -> f64 {
        frames as f64 * self.hop as f64 / self.sample_rate as f64
    }

    /// Fractional number of frames covering `seconds`
    pub fn seconds_to_frames(&self, seconds: f64) -> f64 {
        seconds * self.sample_rate as f64 / self.hop as f64
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        FrameClock::new(256, 44100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_conversion() {
        let clock = FrameClock::default();

        assert!((clock.frames_to_seconds(10) - 10.0 * 256.0 / 44100.0).abs() < 1e-12);
        assert!((clock.seconds_to_frames(0.05) - 0.05 * 44100.0 / 256.0).abs() < 1e-12);
    }
}
